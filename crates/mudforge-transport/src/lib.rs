//! Transport abstraction layer for Mudforge.
//!
//! The scheduler never touches sockets. It talks to something that
//! implements [`Transport`]: send a line of text to a session, refresh a
//! session's stats panel, close a session. Every call is awaited before
//! the scheduler moves on, which is what keeps per-session output in the
//! order it was produced.
//!
//! [`ChannelTransport`] is the in-process implementation: each session
//! gets an unbounded channel of encoded frames. A socket front end (or a
//! test) owns the receiving half.

#![allow(async_fn_in_trait)]

mod channel;
mod error;

pub use channel::{ChannelTransport, FrameReceiver};
pub use error::TransportError;

use mudforge_protocol::{SessionId, StatsSnapshot};

/// Delivers output to connected sessions.
pub trait Transport: Send + Sync + 'static {
    /// Sends one line of text to a session.
    async fn send_text(
        &self,
        session: SessionId,
        text: &str,
    ) -> Result<(), TransportError>;

    /// Pushes a fresh stats snapshot to a session.
    async fn send_stats(
        &self,
        session: SessionId,
        stats: &StatsSnapshot,
    ) -> Result<(), TransportError>;

    /// Closes a session's connection.
    ///
    /// Closing an already-closed session is not an error.
    async fn disconnect(&self, session: SessionId) -> Result<(), TransportError>;
}
