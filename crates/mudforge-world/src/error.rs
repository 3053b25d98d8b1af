//! Error types for the world layer.

use mudforge_protocol::{MobId, PlayerName, RoomId};

/// Errors that can occur while querying or mutating the world.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("room {0} not found")]
    UnknownRoom(RoomId),

    #[error("player {0} is not in the world")]
    UnknownPlayer(PlayerName),

    #[error("mob {0} not found")]
    UnknownMob(MobId),

    /// `spawn_mob` was asked for a template that was never loaded.
    #[error("mob template '{0}' not found")]
    UnknownTemplate(String),

    /// A template file or snapshot could not be parsed or written.
    #[error("invalid world data: {0}")]
    Json(#[from] serde_json::Error),
}
