//! The game world for Mudforge.
//!
//! Everything that outlives a single command lives here: rooms and the
//! items on their floors, the players who are logged in, and the mobs
//! roaming between rooms.
//!
//! # Key types
//!
//! - [`World`]: rooms, online players and live mobs, all in key order
//! - [`Player`], [`Room`], [`Item`], [`Weapon`]
//! - [`Mobile`] and its [`MobState`]: NPCs, stamped from a [`MobTemplate`]
//! - [`Persistence`]: where players and the world are saved at the edges

mod error;
mod item;
mod mobile;
mod persistence;
mod player;
mod room;
mod template;
mod world;

pub use error::WorldError;
pub use item::{Item, Weapon};
pub use mobile::{MobState, Mobile};
pub use persistence::{NullPersistence, Persistence};
pub use player::{Player, STARTING_STAT};
pub use room::Room;
pub use template::{LootEntry, MobTemplate, load_templates};
pub use world::World;
