//! Persistence: where players and the world go when they leave memory.
//!
//! The game loop only saves at the edges: when a player is defeated,
//! quits, or disconnects. Everything in between lives in the [`World`].

use crate::{Player, World, WorldError};

/// Saves game state somewhere durable.
///
/// Calls are synchronous and happen inside a tick, so implementations
/// should be quick (write a file, push to a channel), not network-bound.
pub trait Persistence: Send + Sync + 'static {
    fn save_player(&self, player: &Player) -> Result<(), WorldError>;

    fn save_world(&self, world: &World) -> Result<(), WorldError>;
}

/// Discards everything. The default for tests and throwaway servers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPersistence;

impl Persistence for NullPersistence {
    fn save_player(&self, _player: &Player) -> Result<(), WorldError> {
        Ok(())
    }

    fn save_world(&self, _world: &World) -> Result<(), WorldError> {
        Ok(())
    }
}
