//! Shared vocabulary for Mudforge.
//!
//! This crate defines the types every other layer speaks:
//!
//! - **Identities** ([`SessionId`], [`PlayerName`], [`MobId`], [`RoomId`],
//!   [`CombatantId`]): the keys used by the session registry, the world,
//!   and the combat registry.
//! - **Commands** ([`CommandRecord`], [`ExecOutcome`]): what the parser
//!   produces and what the executor returns.
//! - **Notices** ([`Outbound`], [`Recipient`], [`OutboundFrame`]): what the
//!   game wants to tell players, and the frame shape that goes to a client.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames become bytes.
//!
//! # Architecture
//!
//! ```text
//! Subsystems (combat, mobs, commands) → Outbound → Scheduler → OutboundFrame → Transport
//! ```

mod codec;
mod command;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use command::{CommandRecord, ExecOutcome};
pub use error::ProtocolError;
pub use types::{
    CombatantId, MobId, Outbound, OutboundFrame, PlayerName, Recipient, RoomId,
    SessionId, StatsSnapshot,
};
