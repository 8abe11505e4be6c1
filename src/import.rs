//! Bulk import of cards from a text file.
//!
//! Records are separated by a line holding only the separator (`---` by
//! default). The first non-empty line of a record is the front; the rest,
//! minus leading and trailing blank lines, is the back:
//!
//! ```text
//! What is Big O?
//! An upper bound on growth.
//!
//! Ignores constant factors.
//! ---
//! Define recursion
//! A function that calls itself.
//! ```
//!
//! Files without a separator line may use the older one-card-per-line
//! `front|||back` form, where `\n` stands for a line break.

use std::path::Path;

use serde::Serialize;

use crate::apply::CardWriter;
use crate::errors::Error;
use crate::resolver::{Action, Choice, DuplicateResolver, Resolution, SimilarityMatch, decide};
use crate::sync::{CardStatus, ItemOutcome};

pub const DEFAULT_SEPARATOR: &str = "---";
const LEGACY_DELIMITER: &str = "|||";

/// A card read from an import file, not yet sent anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardDraft {
    pub front: String,
    pub back: String,
    /// 1-based line of the front.
    pub line: usize,
}

/// A record that could not be turned into a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseIssue {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedFile {
    pub drafts: Vec<CardDraft>,
    pub issues: Vec<ParseIssue>,
}

/// Read an import file.
///
/// # Errors
///
/// Returns error if the file does not exist or is not valid UTF-8.
pub fn read_file(path: &Path) -> Result<String, Error> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Split `content` into card drafts.
pub fn parse(content: &str, separator: &str) -> ParsedFile {
    let separator = separator.trim();
    let has_separator = content.lines().any(|l| l.trim() == separator);
    if !has_separator && content.contains(LEGACY_DELIMITER) {
        parse_legacy(content)
    } else {
        parse_records(content, separator)
    }
}

fn parse_records(content: &str, separator: &str) -> ParsedFile {
    let mut parsed = ParsedFile::default();
    let mut record: Vec<(usize, &str)> = Vec::new();

    for (i, line) in content.lines().enumerate() {
        if line.trim() == separator {
            flush_record(&record, &mut parsed);
            record.clear();
        } else {
            record.push((i + 1, line));
        }
    }
    flush_record(&record, &mut parsed);
    parsed
}

fn flush_record(record: &[(usize, &str)], parsed: &mut ParsedFile) {
    let is_blank = |(_, l): &&(usize, &str)| l.trim().is_empty();
    let mut lines = record.iter().skip_while(is_blank);
    let Some(&(line, front)) = lines.next() else {
        return;
    };

    let rest: Vec<&str> = lines.map(|&(_, l)| l).collect();
    let start = rest.iter().position(|l| !l.trim().is_empty());
    let end = rest.iter().rposition(|l| !l.trim().is_empty());
    let back = match (start, end) {
        (Some(s), Some(e)) => rest[s..=e].join("\n"),
        _ => String::new(),
    };

    if back.is_empty() {
        parsed.issues.push(ParseIssue {
            line,
            message: "card has a front but no back".to_string(),
        });
        return;
    }
    parsed.drafts.push(CardDraft {
        front: front.trim().to_string(),
        back,
        line,
    });
}

fn parse_legacy(content: &str) -> ParsedFile {
    let mut parsed = ParsedFile::default();
    for (i, raw) in content.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let line = i + 1;
        let Some((front, back)) = raw.split_once(LEGACY_DELIMITER) else {
            parsed.issues.push(ParseIssue {
                line,
                message: format!("expected front{LEGACY_DELIMITER}back"),
            });
            continue;
        };
        let front = unescape(front.trim());
        let back = unescape(back.trim());
        if front.trim().is_empty() || back.trim().is_empty() {
            parsed.issues.push(ParseIssue {
                line,
                message: "front and back must both be non-empty".to_string(),
            });
            continue;
        }
        parsed.drafts.push(CardDraft { front, back, line });
    }
    parsed
}

fn unescape(s: &str) -> String {
    s.replace("\\n", "\n")
}

/// One imported draft and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportItem {
    pub line: usize,
    pub front: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub deck: String,
    pub summary: ImportSummary,
    pub items: Vec<ImportItem>,
    pub issues: Vec<ParseIssue>,
    /// The user quit before the last draft.
    pub quit: bool,
    /// Set when a collaborator went away and the import stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl ImportReport {
    fn new(deck: &str, issues: Vec<ParseIssue>) -> Self {
        ImportReport {
            deck: deck.to_string(),
            summary: ImportSummary::default(),
            items: Vec::new(),
            issues,
            quit: false,
            aborted: None,
        }
    }

    fn record(&mut self, draft: &CardDraft, outcome: ItemOutcome) {
        match outcome.status {
            CardStatus::Added => self.summary.added += 1,
            CardStatus::Updated => self.summary.updated += 1,
            CardStatus::Skipped => self.summary.skipped += 1,
            CardStatus::Failed => self.summary.failed += 1,
            CardStatus::Deleted => {}
        }
        self.items.push(ImportItem {
            line: draft.line,
            front: draft.front.clone(),
            outcome,
        });
    }

    /// Whether any draft failed or could not be parsed.
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0 || !self.issues.is_empty() || self.aborted.is_some()
    }
}

/// Import `file` into `deck`, one draft at a time.
///
/// `chooser` is asked only when a draft has duplicate candidates. Quitting
/// takes effect before the next draft. A connectivity failure stops the
/// import; other per-draft failures are recorded and the import goes on.
pub fn run_import<F>(
    resolver: &DuplicateResolver<'_>,
    writer: &CardWriter<'_>,
    deck: &str,
    file: &ParsedFile,
    threshold: f64,
    mut chooser: F,
) -> ImportReport
where
    F: FnMut(&CardDraft, &[SimilarityMatch]) -> Option<Choice>,
{
    let mut report = ImportReport::new(deck, file.issues.clone());

    for draft in &file.drafts {
        let resolution = resolver.resolve(&draft.front, &draft.back, Some(deck), threshold);
        match &resolution {
            Resolution::Unavailable { reason } => {
                report.aborted = Some(reason.clone());
                break;
            }
            Resolution::Failed { reason } => {
                report.record(draft, ItemOutcome::failed("", reason.as_str()));
                continue;
            }
            _ => {}
        }
        let choice = match &resolution {
            Resolution::DuplicateCandidates(matches) => chooser(draft, matches),
            _ => None,
        };

        let action = decide(&resolution, choice);
        if action == Action::Quit {
            tracing::info!(line = draft.line, "import stopped by user");
            report.quit = true;
            break;
        }

        match writer.apply(deck, &draft.front, &draft.back, &action) {
            Ok(outcome) => report.record(draft, outcome),
            Err(e) => {
                tracing::warn!(line = draft.line, error = %e, "failed to import card");
                let fatal = e.is_connectivity();
                report.record(draft, ItemOutcome::failed("", e.to_string()));
                if fatal {
                    report.aborted = Some(e.to_string());
                    break;
                }
            }
        }
    }

    tracing::info!(
        deck,
        added = report.summary.added,
        updated = report.summary.updated,
        skipped = report.summary.skipped,
        failed = report.summary.failed,
        issues = report.issues.len(),
        "import finished"
    );
    report
}
