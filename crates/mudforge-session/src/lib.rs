//! Player session management for Mudforge.
//!
//! This crate owns everything the server knows about a connection that is
//! NOT part of the persistent world:
//!
//! 1. **Session tracking**: which connections exist and which player each
//!    one is logged in as ([`SessionRegistry`])
//! 2. **Command queues**: the FIFO of raw input lines waiting for the
//!    scheduler to drain, one per tick
//! 3. **Ephemeral state**: sleeping, converse mode, pending prompts,
//!    afflictions and invisibility ([`SessionFlags`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Scheduler (above)  ← drains queues, reads and flips flags
//!     ↕
//! Session Layer (this crate)  ← connection → player + queue + flags
//!     ↕
//! Protocol Layer (below)  ← provides SessionId, PlayerName
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionRegistry;
pub use session::{
    Affliction, AfflictionKind, Invisibility, PendingComm, Session, SessionFlags,
};
