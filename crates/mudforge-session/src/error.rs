//! Error types for the session layer.

use mudforge_protocol::{PlayerName, SessionId};

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists with this id. It was never opened, or it has
    /// already been torn down (quit, disconnect).
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// A session with this id is already open.
    #[error("session {0} is already connected")]
    AlreadyConnected(SessionId),

    /// Another session is already logged in as this player.
    /// A player can only be online once.
    #[error("player {0} is already online")]
    PlayerAlreadyOnline(PlayerName),

    /// The session is already logged in. Quit before logging in again.
    #[error("session {0} is already logged in")]
    AlreadyLoggedIn(SessionId),

    /// The session exists but has not logged in yet.
    #[error("session {0} has no player attached")]
    NotLoggedIn(SessionId),
}
