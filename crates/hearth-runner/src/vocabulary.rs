//! Classification of free text into the closed action vocabulary.
//!
//! This is the only place where unstructured model output becomes a
//! control signal, so it never fails open: anything it cannot place is
//! [`Unrecognized`], and callers coerce that to `Idle`.
//!
//! Matching rules, first match wins:
//! 1. The whole reply equals a token (case-insensitive).
//! 2. The reply contains a token (case-insensitive), tokens checked in
//!    [`VOCABULARY`] order.
//! 3. A whole word of the reply is a known keyword or synonym, English or
//!    French, keyword groups checked in [`KEYWORDS`] order.

use hearth_types::{ActionKind, Decision};
use tracing::debug;

/// Tokens in the order rule 2 checks them.
pub const VOCABULARY: [ActionKind; 8] = [
    ActionKind::MoveLeft,
    ActionKind::MoveRight,
    ActionKind::MoveUp,
    ActionKind::MoveDown,
    ActionKind::Attack,
    ActionKind::Interact,
    ActionKind::Idle,
    ActionKind::Patrol,
];

/// Keyword groups for rule 3, upper-case, checked in order.
pub const KEYWORDS: [(ActionKind, &[&str]); 8] = [
    (ActionKind::MoveLeft, &["LEFT", "GAUCHE", "WEST", "OUEST"]),
    (ActionKind::MoveRight, &["RIGHT", "DROITE", "EAST"]),
    (ActionKind::MoveUp, &["UP", "UPWARD", "UPWARDS", "HAUT", "NORTH", "NORD"]),
    (
        ActionKind::MoveDown,
        &["DOWN", "DOWNWARD", "DOWNWARDS", "BAS", "SOUTH", "SUD"],
    ),
    (
        ActionKind::Attack,
        &["ATTACK", "ATTAQUE", "ATTAQUER", "STRIKE", "FIGHT"],
    ),
    (
        ActionKind::Interact,
        &["INTERACT", "INTERAGIR", "TALK", "PARLER"],
    ),
    (ActionKind::Patrol, &["PATROL", "PATROUILLE", "PATROUILLER"]),
    (
        ActionKind::Idle,
        &["IDLE", "WAIT", "RIEN", "ATTENTE", "ATTENDRE", "REPOS"],
    ),
];

/// Which rule produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// Rule 1: exact token.
    Exact,
    /// Rule 2: token contained in the reply.
    Contains,
    /// Rule 3: keyword or synonym.
    Keyword,
}

/// No action could be read from the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no action token recognized")]
pub struct Unrecognized;

/// Classify `text`, reporting which rule matched.
pub fn classify(text: &str) -> Option<(ActionKind, MatchRule)> {
    let upper = text.trim().to_uppercase();
    if upper.is_empty() {
        return None;
    }

    if let Some(action) = VOCABULARY.into_iter().find(|a| upper == a.token()) {
        return Some((action, MatchRule::Exact));
    }

    if let Some(action) = VOCABULARY.into_iter().find(|a| upper.contains(a.token())) {
        return Some((action, MatchRule::Contains));
    }

    let words: Vec<&str> = upper
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    KEYWORDS
        .iter()
        .find(|(_, keywords)| {
            words
                .iter()
                .any(|word| keywords.iter().any(|keyword| keyword == word))
        })
        .map(|(action, _)| (*action, MatchRule::Keyword))
}

/// Parse free text into an action.
pub fn parse(text: &str) -> Result<ActionKind, Unrecognized> {
    match classify(text) {
        Some((action, rule)) => {
            debug!(action = %action, rule = ?rule, "action recognized");
            Ok(action)
        }
        None => Err(Unrecognized),
    }
}

/// Parse free text, mapping anything unrecognized to `Idle`.
pub fn parse_or_idle(text: &str) -> ActionKind {
    parse(text).unwrap_or(ActionKind::Idle)
}

/// Parse a composite `ACTION|SAY:line` string into a [`Decision`].
///
/// When a line is present an unreadable action part becomes `Idle`;
/// without a line the action part must be recognized.
pub fn parse_decision(text: &str) -> Result<Decision, Unrecognized> {
    Decision::from_wire(text, parse)
}
