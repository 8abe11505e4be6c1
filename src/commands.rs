//! Command handlers for the ankivec CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use inquire::InquireError;

use crate::apply::CardWriter;
use crate::card::embedding_text;
use crate::config::{Config, validate_threshold};
use crate::errors::Error;
use crate::import::{self, ImportReport};
use crate::index::VectorStore;
use crate::output::*;
use crate::remote::CardSource;
use crate::resolver::{
    Choice, ChoiceContext, DuplicateResolver, Resolution, ResolverOptions, SimilarityMatch,
    decide, parse_choice,
};
use crate::sync::{CardStatus, DeckResults, SyncEngine, SyncMode, SyncOptions, SyncReport};

/// Exit code when the command ran but some cards failed or were held back.
const EXIT_PARTIAL: u8 = 2;

/// Commands supported by the ankivec CLI.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// List the decks in Anki
    ListDecks,
    /// Mirror a deck (or all decks) into the local index
    Sync {
        /// Deck name; prompts when omitted
        deck: Option<String>,

        /// Sync every deck
        #[arg(long, conflicts_with = "deck")]
        all: bool,

        /// Re-embed every card instead of only changed ones
        #[arg(long)]
        full: bool,
    },
    /// Add a card, checking for near-duplicates first
    Add {
        /// Deck name; prompts when omitted
        deck: Option<String>,

        #[arg(short = 'f', long)]
        front: String,

        #[arg(short = 'b', long)]
        back: String,

        /// Similarity at or above which a stored card counts as a duplicate
        #[arg(short = 't', long)]
        threshold: Option<f64>,

        /// Add even if duplicates are found
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Add many cards from a text file
    Import {
        file: PathBuf,

        /// Deck name; prompts when omitted
        deck: Option<String>,

        /// Line separating records
        #[arg(short = 's', long)]
        separator: Option<String>,

        #[arg(short = 't', long)]
        threshold: Option<f64>,
    },
    /// Show stored cards similar to the given text
    Similar {
        #[arg(short = 'f', long)]
        front: String,

        #[arg(short = 'b', long, default_value = "")]
        back: String,

        /// Only search this deck
        #[arg(short = 'd', long)]
        deck: Option<String>,

        #[arg(short = 't', long)]
        threshold: Option<f64>,
    },
    Version,
}

/// What every handler needs besides the index.
pub struct Context<'a> {
    pub config: &'a Config,
    pub source: &'a dyn CardSource,
    pub json: bool,
}

impl Context<'_> {
    fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            top_k: self.config.top_k,
            embed_back: self.config.embed_back,
        }
    }
}

/// Execute a CLI command. The index is opened only by commands that use it.
pub fn execute<S, F>(command: &Commands, ctx: &Context, open_index: F) -> Result<ExitCode, Error>
where
    S: VectorStore,
    F: FnOnce() -> Result<S, Error>,
{
    match command {
        Commands::ListDecks => handle_list_decks(ctx),
        Commands::Version => handle_version(ctx.json),
        Commands::Sync { deck, all, full } => {
            let store = open_index()?;
            handle_sync(ctx, &store, deck.as_deref(), *all, *full)
        }
        Commands::Add {
            deck,
            front,
            back,
            threshold,
            yes,
        } => {
            let store = open_index()?;
            let card = NewCard { front, back };
            handle_add(ctx, &store, deck.as_deref(), &card, *threshold, *yes)
        }
        Commands::Import {
            file,
            deck,
            separator,
            threshold,
        } => {
            let store = open_index()?;
            handle_import(ctx, &store, file, deck.as_deref(), separator.as_deref(), *threshold)
        }
        Commands::Similar {
            front,
            back,
            deck,
            threshold,
        } => {
            let store = open_index()?;
            let card = NewCard { front, back };
            handle_similar(ctx, &store, &card, deck.as_deref(), *threshold)
        }
    }
}

struct NewCard<'a> {
    front: &'a str,
    back: &'a str,
}

fn prompt_error(e: InquireError) -> Error {
    Error::InvalidInput(format!("prompt failed: {e}"))
}

/// Use the given deck, or ask for one when running interactively.
fn choose_deck(ctx: &Context, deck: Option<&str>) -> Result<String, Error> {
    if let Some(deck) = deck {
        return Ok(deck.to_string());
    }
    if ctx.json {
        return Err(Error::InvalidInput(
            "a deck name is required with --json".to_string(),
        ));
    }
    let decks = ctx.source.list_decks()?;
    if decks.is_empty() {
        return Err(Error::InvalidInput("Anki has no decks".to_string()));
    }
    inquire::Select::new("Deck:", decks)
        .prompt()
        .map_err(prompt_error)
}

fn ensure_deck(ctx: &Context, deck: &str) -> Result<(), Error> {
    if ctx.source.list_decks()?.iter().any(|d| d == deck) {
        Ok(())
    } else {
        Err(Error::DeckNotFound(deck.to_string()))
    }
}

fn print_candidates(matches: &[SimilarityMatch]) {
    for (i, m) in matches.iter().enumerate() {
        println!(
            "  {}. [{:.3}] {} (id {}, deck {})",
            i + 1,
            m.similarity(),
            m.card.front,
            m.card.remote_id,
            m.card.deck_name
        );
        if !m.card.back.is_empty() {
            println!("       {}", m.card.back.replace('\n', "\n       "));
        }
    }
}

/// Ask until the answer parses. Escape cancels a single add and quits a bulk import.
fn prompt_choice(candidates: usize, context: ChoiceContext) -> Result<Choice, Error> {
    let help = match context {
        ChoiceContext::Single => "0 = add anyway, 1-n = replace that card, C = cancel",
        ChoiceContext::Bulk => "0 = add anyway, 1-n = replace that card, S = skip, Q = quit",
    };
    loop {
        let answer = inquire::Text::new("Choice:").with_help_message(help).prompt();
        let input = match answer {
            Ok(input) => input,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                return Ok(match context {
                    ChoiceContext::Single => Choice::Skip,
                    ChoiceContext::Bulk => Choice::Quit,
                });
            }
            Err(e) => return Err(prompt_error(e)),
        };
        match parse_choice(&input, candidates, context) {
            Some(choice) => return Ok(choice),
            None => eprintln!("Invalid choice: {}", input.trim()),
        }
    }
}

fn handle_list_decks(ctx: &Context) -> Result<ExitCode, Error> {
    let decks = ctx.source.list_decks()?;
    if ctx.json {
        print_json(&DecksResponse { decks });
    } else {
        for deck in decks {
            println!("{deck}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &SyncReport) {
    let s = &report.summary;
    println!(
        "{}: {} added, {} updated, {} deleted, {} failed",
        report.deck, s.added, s.updated, s.deleted, s.failed
    );
    for item in report.with_status(CardStatus::Failed) {
        println!(
            "  failed {}: {}",
            item.remote_id,
            item.reason.as_deref().unwrap_or("unknown error")
        );
    }
}

fn handle_sync(
    ctx: &Context,
    store: &dyn VectorStore,
    deck: Option<&str>,
    all: bool,
    full: bool,
) -> Result<ExitCode, Error> {
    let mode = if full { SyncMode::Full } else { SyncMode::Incremental };
    let options = SyncOptions {
        workers: ctx.config.sync_workers,
        batch_size: ctx.config.sync_batch_size,
        embed_back: ctx.config.embed_back,
    };
    let engine = SyncEngine::new(ctx.source, store, options)?;

    let results: DeckResults = if all {
        engine.sync_all(mode)?
    } else {
        let deck = choose_deck(ctx, deck)?;
        let report = engine.sync(&deck, mode)?;
        vec![(deck, Ok(report))]
    };

    let partial = results
        .iter()
        .any(|(_, r)| r.as_ref().map_or(true, SyncReport::has_failures));

    if ctx.json {
        let decks = results
            .into_iter()
            .map(|(deck, result)| match result {
                Ok(report) => DeckSyncResponse {
                    deck,
                    report: Some(report),
                    error: None,
                },
                Err(e) => DeckSyncResponse {
                    deck,
                    report: None,
                    error: Some(e.to_string()),
                },
            })
            .collect();
        print_json(&SyncResponse { decks });
    } else {
        for (deck, result) in &results {
            match result {
                Ok(report) => print_report(report),
                Err(e) => println!("{deck}: sync failed: {e}"),
            }
        }
    }

    Ok(if partial {
        ExitCode::from(EXIT_PARTIAL)
    } else {
        ExitCode::SUCCESS
    })
}

fn handle_add(
    ctx: &Context,
    store: &dyn VectorStore,
    deck: Option<&str>,
    card: &NewCard,
    threshold: Option<f64>,
    yes: bool,
) -> Result<ExitCode, Error> {
    let threshold = threshold.unwrap_or(ctx.config.add_threshold);
    validate_threshold("threshold", threshold)?;
    let deck = choose_deck(ctx, deck)?;
    ensure_deck(ctx, &deck)?;

    let resolver = DuplicateResolver::new(store, ctx.resolver_options());
    let matches = resolver.find_similar(card.front, card.back, Some(&deck), threshold)?;

    let choice = if matches.is_empty() {
        None
    } else if yes {
        Some(Choice::AddAnyway)
    } else if ctx.json {
        print_json(&AddResponse {
            status: "duplicates".to_string(),
            id: None,
            candidates: matches.iter().map(CandidateItem::from).collect(),
        });
        return Ok(ExitCode::from(EXIT_PARTIAL));
    } else {
        println!("Similar cards already in {deck}:");
        print_candidates(&matches);
        Some(prompt_choice(matches.len(), ChoiceContext::Single)?)
    };
    let resolution = if matches.is_empty() {
        Resolution::New
    } else {
        Resolution::DuplicateCandidates(matches)
    };

    let action = decide(&resolution, choice);
    let writer = CardWriter::new(ctx.source, store, ctx.config.embed_back);
    let outcome = writer.apply(&deck, card.front, card.back, &action)?;

    let status = outcome.status.as_str().to_string();
    if ctx.json {
        print_json(&AddResponse {
            status,
            id: (!outcome.remote_id.is_empty()).then(|| outcome.remote_id.clone()),
            candidates: vec![],
        });
    } else if outcome.remote_id.is_empty() {
        println!("Skipped");
    } else {
        println!("Card {status}: {}", outcome.remote_id);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_import_report(report: &ImportReport) {
    let s = &report.summary;
    println!(
        "{}: {} added, {} updated, {} skipped, {} failed",
        report.deck, s.added, s.updated, s.skipped, s.failed
    );
    for item in &report.items {
        if let Some(reason) = &item.outcome.reason {
            println!("  line {}: {}", item.line, reason);
        }
    }
    if report.quit {
        println!("Stopped before the end of the file");
    }
    if let Some(reason) = &report.aborted {
        println!("Aborted: {reason}");
    }
}

fn handle_import(
    ctx: &Context,
    store: &dyn VectorStore,
    file: &std::path::Path,
    deck: Option<&str>,
    separator: Option<&str>,
    threshold: Option<f64>,
) -> Result<ExitCode, Error> {
    let threshold = threshold.unwrap_or(ctx.config.import_threshold);
    validate_threshold("threshold", threshold)?;
    let separator = separator.unwrap_or(&ctx.config.import_separator);
    if separator.trim().is_empty() {
        return Err(Error::InvalidInput("separator cannot be empty".to_string()));
    }

    let content = import::read_file(file)?;
    let parsed = import::parse(&content, separator);
    let deck = choose_deck(ctx, deck)?;
    ensure_deck(ctx, &deck)?;

    if !ctx.json {
        for issue in &parsed.issues {
            eprintln!("line {}: {}", issue.line, issue.message);
        }
        println!("{} cards read from {}", parsed.drafts.len(), file.display());
    }

    let resolver = DuplicateResolver::new(store, ctx.resolver_options());
    let writer = CardWriter::new(ctx.source, store, ctx.config.embed_back);
    let json = ctx.json;
    let report = import::run_import(&resolver, &writer, &deck, &parsed, threshold, |draft, matches| {
        if json {
            return None;
        }
        println!("\nLine {}: {}", draft.line, draft.front);
        print_candidates(matches);
        match prompt_choice(matches.len(), ChoiceContext::Bulk) {
            Ok(choice) => Some(choice),
            Err(e) => {
                tracing::warn!(error = %e, "prompt failed, stopping import");
                Some(Choice::Quit)
            }
        }
    });

    if ctx.json {
        print_json(&report);
    } else {
        print_import_report(&report);
    }

    Ok(if report.aborted.is_some() {
        ExitCode::FAILURE
    } else if report.has_failures() {
        ExitCode::from(EXIT_PARTIAL)
    } else {
        ExitCode::SUCCESS
    })
}

fn handle_similar(
    ctx: &Context,
    store: &dyn VectorStore,
    card: &NewCard,
    deck: Option<&str>,
    threshold: Option<f64>,
) -> Result<ExitCode, Error> {
    let threshold = threshold.unwrap_or(ctx.config.add_threshold);
    validate_threshold("threshold", threshold)?;

    let resolver = DuplicateResolver::new(store, ctx.resolver_options());
    let matches = resolver.find_similar(card.front, card.back, deck, threshold)?;

    if ctx.json {
        print_json(&SimilarResponse {
            query: embedding_text(card.front, card.back, ctx.config.embed_back),
            threshold,
            matches: matches.iter().map(CandidateItem::from).collect(),
        });
    } else if matches.is_empty() {
        println!("No similar cards at or above {threshold}");
    } else {
        print_candidates(&matches);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_version(json: bool) -> Result<ExitCode, Error> {
    if json {
        print_json(&serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "name": env!("CARGO_PKG_NAME")
        }));
    } else {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    }
    Ok(ExitCode::SUCCESS)
}
