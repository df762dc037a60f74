//! Decisions returned by the decision step, and their composite wire form.
//!
//! A decision is an action plus an optional spoken line. On the wire the
//! two travel as a single string, `MOVE_LEFT|SAY:Good morning!`, which is
//! what the offline generator produces and what the dialogue prompt asks
//! the model to answer with.

use serde::{Deserialize, Serialize};

use crate::enums::ActionKind;

/// Separator between the action token and the spoken line.
pub const SPEECH_DELIMITER: &str = "|SAY:";

/// The outcome of one decision request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// The action to apply.
    pub action: ActionKind,
    /// A line to say, if any.
    pub line: Option<String>,
}

impl Decision {
    /// A decision with an action and nothing to say.
    pub const fn act(action: ActionKind) -> Self {
        Self { action, line: None }
    }

    /// A decision with an action and a line.
    pub fn speak(action: ActionKind, line: impl Into<String>) -> Self {
        Self {
            action,
            line: Some(line.into()),
        }
    }

    /// The `Idle` decision every failure falls back to.
    pub const fn idle() -> Self {
        Self::act(ActionKind::Idle)
    }

    /// Encode as `TOKEN` or `TOKEN|SAY:line`.
    pub fn to_wire(&self) -> String {
        match &self.line {
            Some(line) => format!("{}{SPEECH_DELIMITER}{line}", self.action.token()),
            None => self.action.token().to_owned(),
        }
    }

    /// Split a composite string into its action text and its line.
    ///
    /// The line is trimmed and dropped when empty. Text without the
    /// delimiter is returned whole as the action part.
    pub fn split_wire(text: &str) -> (&str, Option<&str>) {
        match text.split_once(SPEECH_DELIMITER) {
            Some((action, line)) => {
                let line = line.trim();
                (action.trim(), (!line.is_empty()).then_some(line))
            }
            None => (text.trim(), None),
        }
    }

    /// Decode a composite string, reading the action part with `parse`.
    ///
    /// When a line is present an unreadable action part becomes `Idle`;
    /// without one the parse error is returned.
    pub fn from_wire<E>(
        text: &str,
        parse: impl FnOnce(&str) -> Result<ActionKind, E>,
    ) -> Result<Self, E> {
        let (action_text, line) = Self::split_wire(text);
        match line {
            Some(line) => Ok(Self::speak(
                parse(action_text).unwrap_or(ActionKind::Idle),
                line,
            )),
            None => parse(action_text).map(Self::act),
        }
    }
}

impl core::fmt::Display for Decision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.to_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_encoding() {
        assert_eq!(Decision::idle().to_wire(), "IDLE");
        assert_eq!(
            Decision::speak(ActionKind::MoveLeft, "Hello there").to_wire(),
            "MOVE_LEFT|SAY:Hello there"
        );
    }

    #[test]
    fn split_composite() {
        let (action, line) = Decision::split_wire("MOVE_UP|SAY:  Stay a while. ");
        assert_eq!(action, "MOVE_UP");
        assert_eq!(line, Some("Stay a while."));
    }

    #[test]
    fn split_without_delimiter() {
        let (action, line) = Decision::split_wire("  PATROL\n");
        assert_eq!(action, "PATROL");
        assert_eq!(line, None);
    }

    #[test]
    fn from_wire_with_strict_tokens() {
        let strict = |t: &str| match t {
            "MOVE_DOWN" => Ok(ActionKind::MoveDown),
            _ => Err(()),
        };
        assert_eq!(
            Decision::from_wire("MOVE_DOWN|SAY:Coming!", strict),
            Ok(Decision::speak(ActionKind::MoveDown, "Coming!"))
        );
        assert_eq!(
            Decision::from_wire("???|SAY:Hm.", strict),
            Ok(Decision::speak(ActionKind::Idle, "Hm."))
        );
        assert_eq!(Decision::from_wire("???", strict), Err(()));
    }

    #[test]
    fn split_drops_empty_line() {
        let (action, line) = Decision::split_wire("IDLE|SAY:   ");
        assert_eq!(action, "IDLE");
        assert_eq!(line, None);
    }
}
