//! Unified error types for the Mudforge scheduler.

use mudforge_combat::CombatError;
use mudforge_protocol::ProtocolError;
use mudforge_session::SessionError;
use mudforge_transport::TransportError;
use mudforge_world::WorldError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `mudforge` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum MudforgeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Combat(#[from] CombatError),

    #[error(transparent)]
    Command(#[from] CommandError),

    /// The scheduler configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A tick phase panicked. The rest of the tick still ran.
    #[error("{phase} panicked: {message}")]
    Panicked {
        phase: &'static str,
        message: String,
    },
}

/// A command handler failed or refused.
///
/// Refusals (see [`CommandError::is_refusal`]) reach the player as plain
/// text. Anything else is logged with full context and shown as
/// `"Error processing command: <err>"`. The tick carries on either way.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The issuing session has no player attached.
    #[error("you are not logged in")]
    NotLoggedIn,

    /// The command named something that isn't there.
    #[error("there is no {0} here")]
    NoSuchTarget(String),

    /// The command was understood but can't be carried out.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Combat(#[from] CombatError),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl CommandError {
    /// Whether this is an ordinary in-game "no" rather than a fault.
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            Self::NoSuchTarget(_) | Self::Rejected(_) | Self::Combat(_)
        )
    }
}
