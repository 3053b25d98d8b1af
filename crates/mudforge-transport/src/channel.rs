//! In-process transport backed by Tokio unbounded channels.

use std::collections::HashMap;

use mudforge_protocol::{Codec, JsonCodec, OutboundFrame, SessionId, StatsSnapshot};
use tokio::sync::{Mutex, mpsc};

use crate::{Transport, TransportError};

/// The receiving half handed to whoever owns the client side of a session.
/// Each item is one encoded [`OutboundFrame`].
pub type FrameReceiver = mpsc::UnboundedReceiver<Vec<u8>>;

/// A [`Transport`] that encodes frames with a [`Codec`] and pushes them
/// onto a per-session channel.
///
/// Channels are unbounded, so a send never waits on the reader. A reader
/// that goes away makes sends to its session fail with
/// [`TransportError::ConnectionClosed`].
pub struct ChannelTransport<C: Codec = JsonCodec> {
    codec: C,
    senders: Mutex<HashMap<SessionId, mpsc::UnboundedSender<Vec<u8>>>>,
}

impl ChannelTransport<JsonCodec> {
    /// A channel transport using JSON frames.
    pub fn new() -> Self {
        Self {
            codec: JsonCodec,
            senders: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for ChannelTransport<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> ChannelTransport<C> {
    /// Attaches a session and returns the receiver for its frames.
    ///
    /// Re-attaching replaces the previous channel; the old receiver sees
    /// its stream end.
    pub async fn attach(&self, session: SessionId) -> FrameReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        let replaced = self.senders.lock().await.insert(session, tx);
        if replaced.is_some() {
            tracing::debug!(%session, "replaced existing channel");
        }
        rx
    }

    /// Decodes a frame received from a [`FrameReceiver`].
    pub fn decode_frame(&self, data: &[u8]) -> Result<OutboundFrame, TransportError> {
        Ok(self.codec.decode(data)?)
    }

    async fn deliver(
        &self,
        session: SessionId,
        frame: &OutboundFrame,
    ) -> Result<(), TransportError> {
        let bytes = self.codec.encode(frame)?;
        let senders = self.senders.lock().await;
        let tx = senders
            .get(&session)
            .ok_or(TransportError::UnknownSession(session))?;
        tx.send(bytes)
            .map_err(|_| TransportError::ConnectionClosed(session))
    }
}

impl<C: Codec> Transport for ChannelTransport<C> {
    async fn send_text(
        &self,
        session: SessionId,
        text: &str,
    ) -> Result<(), TransportError> {
        self.deliver(
            session,
            &OutboundFrame::Text {
                text: text.to_string(),
            },
        )
        .await
    }

    async fn send_stats(
        &self,
        session: SessionId,
        stats: &StatsSnapshot,
    ) -> Result<(), TransportError> {
        self.deliver(
            session,
            &OutboundFrame::Stats {
                stats: stats.clone(),
            },
        )
        .await
    }

    async fn disconnect(&self, session: SessionId) -> Result<(), TransportError> {
        let bytes = self.codec.encode(&OutboundFrame::Disconnect {
            reason: "goodbye".into(),
        })?;
        // Removing the sender drops it, which ends the receiver's stream
        // right after the farewell frame.
        if let Some(tx) = self.senders.lock().await.remove(&session) {
            let _ = tx.send(bytes);
            tracing::debug!(%session, "channel closed");
        }
        Ok(())
    }
}
