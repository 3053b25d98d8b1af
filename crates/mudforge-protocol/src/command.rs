//! Parsed commands and executor outcomes.

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// One command as produced by the parser.
///
/// A single line of player input can produce several records
/// (`"look, inventory"`); each keeps the slice of input it came from in
/// `original_text` so the scheduler can put unexecuted ones back on the
/// queue verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub verb: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub instrument: Option<String>,
    pub original_text: String,
}

impl CommandRecord {
    /// A bare command with no subject or instrument.
    pub fn new(verb: impl Into<String>, original_text: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            subject: None,
            instrument: None,
            original_text: original_text.into(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_instrument(mut self, instrument: impl Into<String>) -> Self {
        self.instrument = Some(instrument.into());
        self
    }

    /// Rejects records a parser should never have produced.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] when the verb is blank.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.verb.trim().is_empty() {
            return Err(ProtocolError::InvalidMessage(format!(
                "command {:?} has an empty verb",
                self.original_text
            )));
        }
        Ok(())
    }
}

/// What the executor decided after running a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Send this text back to the issuing session.
    Reply(String),

    /// Nothing to say (the handler already emitted its own notices).
    Silent,

    /// The player is leaving. The text is the farewell shown before the
    /// connection is closed.
    Quit(String),
}

impl ExecOutcome {
    /// Returns `true` for [`ExecOutcome::Quit`].
    pub fn is_quit(&self) -> bool {
        matches!(self, Self::Quit(_))
    }

    /// The text to send to the issuing session, if any.
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            Self::Reply(text) | Self::Quit(text) if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}
