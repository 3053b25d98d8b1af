//! The session registry: tracks every open connection.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Opening sessions when clients connect
//! - Attaching a player on login (and refusing a second login)
//! - Queueing raw input lines for the scheduler
//! - Tearing sessions down on quit or disconnect
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself. It lives inside the
//! game context, which the scheduler owns outright and lends to one
//! subsystem at a time. No locks needed.
//!
//! # Ordering
//!
//! Sessions are stored in a `BTreeMap` keyed by `SessionId`, so every
//! iteration visits them in ascending id order. The scheduler relies on
//! this to drain queues in the same order every tick.

use std::collections::BTreeMap;

use mudforge_protocol::{PlayerName, SessionId};

use crate::{Session, SessionError};

/// Manages all open sessions.
///
/// ## Lifecycle
///
/// ```text
/// open()/connect() ──→ login() ──→ enqueue()* ──→ remove()
///        │                │                          │
///        ▼                ▼                          ▼
///   [anonymous]      [logged in]                  [gone]
/// ```
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<SessionId, Session>,

    /// The next id handed out by [`open`](Self::open).
    next_id: u64,
}

impl SessionRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session with a freshly allocated id.
    pub fn open(&mut self) -> SessionId {
        // Skip ids already claimed through `connect`.
        loop {
            self.next_id += 1;
            let id = SessionId(self.next_id);
            if !self.sessions.contains_key(&id) {
                self.sessions.insert(id, Session::new(id));
                tracing::info!(session = %id, "session opened");
                return id;
            }
        }
    }

    /// Opens a session under an id chosen by the transport.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if the id is taken.
    pub fn connect(&mut self, id: SessionId) -> Result<&mut Session, SessionError> {
        if self.sessions.contains_key(&id) {
            return Err(SessionError::AlreadyConnected(id));
        }
        tracing::info!(session = %id, "session opened");
        Ok(self.sessions.entry(id).or_insert_with(|| Session::new(id)))
    }

    /// Attaches a player to a session.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`]: no such session
    /// - [`SessionError::AlreadyLoggedIn`]: this session already has a player
    /// - [`SessionError::PlayerAlreadyOnline`]: another session is logged in
    ///   under the same name, compared ignoring case
    pub fn login(
        &mut self,
        id: SessionId,
        player: PlayerName,
    ) -> Result<(), SessionError> {
        let taken = self.sessions.values().any(|s| {
            s.id != id
                && s.player
                    .as_ref()
                    .is_some_and(|p| p.as_str().eq_ignore_ascii_case(player.as_str()))
        });
        if taken {
            return Err(SessionError::PlayerAlreadyOnline(player));
        }
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(SessionError::NotFound(id))?;
        if session.player.is_some() {
            return Err(SessionError::AlreadyLoggedIn(id));
        }

        tracing::info!(session = %id, %player, "player logged in");
        session.player = Some(player);
        Ok(())
    }

    /// Queues a raw input line on a session.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if no such session exists.
    pub fn enqueue(
        &mut self,
        id: SessionId,
        text: impl Into<String>,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(SessionError::NotFound(id))?;
        session.enqueue(text);
        Ok(())
    }

    /// Removes a session, returning it if it existed.
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        let removed = self.sessions.remove(&id);
        if let Some(session) = &removed {
            tracing::info!(
                session = %id,
                player = ?session.player,
                "session closed"
            );
        }
        removed
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Returns the player a session is logged in as.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`]: no such session
    /// - [`SessionError::NotLoggedIn`]: the session is still anonymous
    pub fn player_of(&self, id: SessionId) -> Result<&PlayerName, SessionError> {
        self.sessions
            .get(&id)
            .ok_or(SessionError::NotFound(id))?
            .player
            .as_ref()
            .ok_or(SessionError::NotLoggedIn(id))
    }

    /// Finds the session logged in as `player`.
    pub fn find_by_player(&self, player: &PlayerName) -> Option<SessionId> {
        self.sessions
            .values()
            .find(|s| s.player.as_ref() == Some(player))
            .map(|s| s.id)
    }

    /// Snapshot of all session ids in ascending order.
    ///
    /// Handy when the caller needs to mutate the registry (or anything
    /// else in the game context) while walking the sessions.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    /// Iterates sessions in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.values_mut()
    }

    /// Names of every logged-in player, in session order.
    pub fn online_players(&self) -> Vec<PlayerName> {
        self.sessions
            .values()
            .filter_map(|s| s.player.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
