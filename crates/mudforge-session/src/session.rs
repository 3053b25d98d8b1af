//! Session types: the data structures that represent one connection.
//!
//! A "session" is the server's record of a connected client. It tracks:
//! - WHO is playing (`Option<PlayerName>`, `None` until login)
//! - WHAT they typed that hasn't been handled yet (the command queue)
//! - HOW the scheduler should treat their next line (the flags)
//!
//! None of this survives a disconnect. Anything that must persist lives
//! on the player record in the world crate instead.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::time::Duration;

use mudforge_protocol::{PlayerName, SessionId};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// PendingComm
// ---------------------------------------------------------------------------

/// A multi-step prompt the session is in the middle of.
///
/// While one of these is set, the next raw line the player types is NOT
/// parsed as a command. It goes straight to the pending-communication
/// handler, which decides what the line means and what (if anything)
/// to wait for next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingComm {
    /// `tell bob` with no message: the next line is the message for `to`.
    Tell { to: PlayerName },
    /// `shout` with no message: the next line is shouted.
    Shout,
    /// Password change in progress. `stage` counts prompts answered.
    PasswordChange { stage: u8 },
}

// ---------------------------------------------------------------------------
// Afflictions
// ---------------------------------------------------------------------------

/// The kinds of timed affliction a spell can place on a player.
///
/// `Ord` so afflictions live in a `BTreeMap` and expire in a stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AfflictionKind {
    Deaf,
    Blind,
    Dumb,
    Cripple,
    MagicSleep,
}

impl AfflictionKind {

    /// What the player is told when this affliction wears off.
    pub fn expiry_message(self) -> &'static str {
        match self {
            AfflictionKind::Deaf => "Your hearing returns to normal.",
            AfflictionKind::Blind => "Your vision clears.",
            AfflictionKind::Dumb => "You find your voice again.",
            AfflictionKind::Cripple => "You can move freely again.",
            AfflictionKind::MagicSleep => "You wake from your magical slumber.",
        }
    }
}

impl fmt::Display for AfflictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AfflictionKind::Deaf => "deaf",
            AfflictionKind::Blind => "blind",
            AfflictionKind::Dumb => "dumb",
            AfflictionKind::Cripple => "cripple",
            AfflictionKind::MagicSleep => "magic_sleep",
        };
        f.write_str(name)
    }
}

/// One active affliction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affliction {
    pub applied_at: Instant,
    pub expires_at: Instant,
    /// Who cast it, if anyone. Purely informational.
    pub caster: Option<PlayerName>,
}

impl Affliction {
    /// Returns `true` once `now` has reached the expiry instant.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

// ---------------------------------------------------------------------------
// Invisibility
// ---------------------------------------------------------------------------

/// How a player came to be invisible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invisibility {
    /// Granted by a spell or admin. No expiry; attacking or similar
    /// actions break it.
    Granted,
    /// Granted by an item for a fixed time.
    Item { item: String, expires_at: Instant },
}

// ---------------------------------------------------------------------------
// SessionFlags
// ---------------------------------------------------------------------------

/// Ephemeral per-session state. Every field has a meaningful default,
/// so a freshly connected session starts with `SessionFlags::default()`.
#[derive(Debug, Clone, Default)]
pub struct SessionFlags {
    pub sleeping: bool,
    /// Ticks spent asleep since the last heal.
    pub sleep_ticks: u32,
    /// Heals received during the current sleep.
    pub heal_count: u32,
    /// Plain lines are spoken (`say`) instead of parsed as commands.
    pub converse_mode: bool,
    pub pending_comm: Option<PendingComm>,
    pub afflictions: BTreeMap<AfflictionKind, Affliction>,
    pub invisibility: Option<Invisibility>,
    /// Set when the session has quit; the scheduler tears it down
    /// before the tick ends.
    pub should_disconnect: bool,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single connection to the server.
///
/// Created on connect, destroyed on disconnect or quit.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,

    /// The player this connection is logged in as.
    pub player: Option<PlayerName>,

    /// Raw input lines, oldest first. The scheduler pops at most one
    /// per tick.
    pub queue: VecDeque<String>,

    pub flags: SessionFlags,

    pub connected_at: Instant,
}

impl Session {
    /// A fresh, not-yet-logged-in session.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            player: None,
            queue: VecDeque::new(),
            flags: SessionFlags::default(),
            connected_at: Instant::now(),
        }
    }

    /// Returns `true` once a player is attached.
    pub fn is_logged_in(&self) -> bool {
        self.player.is_some()
    }

    // -- Command queue ----------------------------------------------------

    /// Appends a line to the back of the queue.
    pub fn enqueue(&mut self, text: impl Into<String>) {
        self.queue.push_back(text.into());
    }

    /// Pops the oldest queued line.
    pub fn next_command(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    /// Puts several lines back at the FRONT of the queue, keeping their
    /// relative order: `["a", "b"]` ends up as `a, b, <old queue...>`.
    pub fn requeue_front<I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: DoubleEndedIterator,
    {
        for line in lines.into_iter().rev() {
            self.queue.push_front(line);
        }
    }

    // -- Sleep ------------------------------------------------------------

    /// Puts the player to sleep and resets the healing counters.
    pub fn fall_asleep(&mut self) {
        self.flags.sleeping = true;
        self.flags.sleep_ticks = 0;
        self.flags.heal_count = 0;
    }

    /// Wakes the player. Returns `true` if they were asleep.
    pub fn wake(&mut self) -> bool {
        let was_sleeping = self.flags.sleeping;
        self.flags.sleeping = false;
        self.flags.sleep_ticks = 0;
        self.flags.heal_count = 0;
        was_sleeping
    }

    // -- Afflictions ------------------------------------------------------

    /// Applies (or refreshes) an affliction lasting `duration` from `now`.
    ///
    /// Magic sleep also puts the player to sleep.
    pub fn afflict(
        &mut self,
        kind: AfflictionKind,
        duration: Duration,
        caster: Option<PlayerName>,
        now: Instant,
    ) {
        self.flags.afflictions.insert(
            kind,
            Affliction {
                applied_at: now,
                expires_at: now + duration,
                caster,
            },
        );
        if kind == AfflictionKind::MagicSleep {
            self.fall_asleep();
        }
    }

    /// Returns `true` if the affliction is present and not yet expired.
    pub fn is_afflicted(&self, kind: AfflictionKind, now: Instant) -> bool {
        self.flags
            .afflictions
            .get(&kind)
            .is_some_and(|a| !a.is_expired(now))
    }

    /// Removes an affliction early. Returns `true` if one was present.
    pub fn cure(&mut self, kind: AfflictionKind) -> bool {
        self.flags.afflictions.remove(&kind).is_some()
    }

    /// Removes every affliction. Returns how many were removed.
    pub fn cure_all(&mut self) -> usize {
        let count = self.flags.afflictions.len();
        self.flags.afflictions.clear();
        count
    }

    /// Removes and returns every affliction that has expired by `now`,
    /// in kind order. An expiring magic sleep also wakes the player.
    pub fn take_expired_afflictions(&mut self, now: Instant) -> Vec<AfflictionKind> {
        let expired: Vec<AfflictionKind> = self
            .flags
            .afflictions
            .iter()
            .filter(|(_, a)| a.is_expired(now))
            .map(|(kind, _)| *kind)
            .collect();

        for kind in &expired {
            self.flags.afflictions.remove(kind);
            if *kind == AfflictionKind::MagicSleep {
                self.flags.sleeping = false;
                self.flags.sleep_ticks = 0;
                self.flags.heal_count = 0;
            }
        }
        expired
    }

    // -- Invisibility -----------------------------------------------------

    /// Returns `true` if the player is currently invisible.
    pub fn is_invisible(&self, now: Instant) -> bool {
        match &self.flags.invisibility {
            None => false,
            Some(Invisibility::Granted) => true,
            Some(Invisibility::Item { expires_at, .. }) => now < *expires_at,
        }
    }

    /// Grants open-ended invisibility.
    pub fn grant_invisibility(&mut self) {
        self.flags.invisibility = Some(Invisibility::Granted);
    }

    /// Grants invisibility from an item, lasting `duration` from `now`.
    pub fn grant_item_invisibility(
        &mut self,
        item: impl Into<String>,
        duration: Duration,
        now: Instant,
    ) {
        self.flags.invisibility = Some(Invisibility::Item {
            item: item.into(),
            expires_at: now + duration,
        });
    }

    /// Clears open-ended invisibility (the player did something visible).
    ///
    /// Item invisibility is untouched; it only ends by expiring. Returns
    /// `true` if anything was cleared.
    pub fn break_invisibility(&mut self) -> bool {
        if matches!(self.flags.invisibility, Some(Invisibility::Granted)) {
            self.flags.invisibility = None;
            true
        } else {
            false
        }
    }

    /// If item invisibility has expired by `now`, clears it and returns
    /// the item's name.
    pub fn take_expired_invisibility(&mut self, now: Instant) -> Option<String> {
        let expired = matches!(
            &self.flags.invisibility,
            Some(Invisibility::Item { expires_at, .. }) if now >= *expires_at
        );
        if !expired {
            return None;
        }
        match self.flags.invisibility.take() {
            Some(Invisibility::Item { item, .. }) => Some(item),
            _ => None,
        }
    }
}
