//! Mapping from a resolution plus the user's answer to an action.

use super::Resolution;

/// A parsed answer to the duplicate prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    AddAnyway,
    /// 1-based index into the candidate list.
    Replace(usize),
    Skip,
    Quit,
}

/// Where the prompt is shown. Single adds offer cancel, bulk imports offer quit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceContext {
    Single,
    Bulk,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AddNew,
    Replace { remote_id: String },
    Skip,
    Quit,
}

/// Parse prompt input: `0` adds anyway, `1..=candidates` replaces that
/// match, `S` skips, `C` cancels a single add, `Q` quits a bulk import.
///
/// Returns `None` for anything else.
pub fn parse_choice(input: &str, candidates: usize, context: ChoiceContext) -> Option<Choice> {
    let input = input.trim();
    match (input.to_ascii_uppercase().as_str(), context) {
        ("0", _) => Some(Choice::AddAnyway),
        ("S", _) | ("C", ChoiceContext::Single) => Some(Choice::Skip),
        ("Q", ChoiceContext::Bulk) => Some(Choice::Quit),
        _ => match input.parse::<usize>() {
            Ok(n) if (1..=candidates).contains(&n) => Some(Choice::Replace(n)),
            _ => None,
        },
    }
}

pub fn decide(resolution: &Resolution, choice: Option<Choice>) -> Action {
    match resolution {
        Resolution::New => Action::AddNew,
        Resolution::Unavailable { .. } => Action::Quit,
        Resolution::Failed { .. } => Action::Skip,
        Resolution::DuplicateCandidates(matches) => match choice {
            Some(Choice::AddAnyway) => Action::AddNew,
            Some(Choice::Replace(n)) => match n.checked_sub(1).and_then(|i| matches.get(i)) {
                Some(m) => Action::Replace {
                    remote_id: m.card.remote_id.clone(),
                },
                None => Action::Skip,
            },
            Some(Choice::Quit) => Action::Quit,
            Some(Choice::Skip) | None => Action::Skip,
        },
    }
}
