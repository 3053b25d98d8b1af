//! Core identity and notice types.
//!
//! Everything here is plain data. The session layer, the world, the
//! combat coordinator and the mob engine all key their maps with these
//! newtypes, so a `MobId` can never be passed where a `PlayerName` is
//! expected even though both wrap a `String`.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of one transport connection.
///
/// Assigned in increasing order as connections arrive. The session
/// registry iterates in `SessionId` order, which is what makes command
/// draining deterministic from one tick to the next.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// A player's unique, case-preserving name.
///
/// Player names double as combat identities, so they must stay stable for
/// as long as the player is logged in.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerName(pub String);

impl PlayerName {
    /// Creates a name from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a spawned mob (e.g. `"elder_0_village_center"`).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MobId(pub String);

impl MobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a room in the world map.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The key space of the combat registry: either a player or a mob.
///
/// Whether a side "is a mob" is read straight off the variant, so the
/// combat record never has to carry a separate flag that could disagree.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CombatantId {
    Player(PlayerName),
    Mob(MobId),
}

impl CombatantId {
    /// The player name, if this identity is a player.
    pub fn as_player(&self) -> Option<&PlayerName> {
        match self {
            Self::Player(name) => Some(name),
            Self::Mob(_) => None,
        }
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player(name) => write!(f, "player:{name}"),
            Self::Mob(id) => write!(f, "mob:{id}"),
        }
    }
}

impl From<PlayerName> for CombatantId {
    fn from(value: PlayerName) -> Self {
        Self::Player(value)
    }
}

impl From<MobId> for CombatantId {
    fn from(value: MobId) -> Self {
        Self::Mob(value)
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should see a notice?
// ---------------------------------------------------------------------------

/// Who should receive a text notice.
///
/// Recipients are resolved by the scheduler at dispatch time against the
/// session registry and the players' current rooms, so a subsystem never
/// needs to know which session a player is connected on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// One player, wherever they are.
    Player(PlayerName),

    /// Every logged-in player currently in the room.
    Room(RoomId),

    /// Every logged-in player in the room, minus the listed names.
    /// Used for "observers" of a fight: both fighters get their own text.
    RoomExcept { room: RoomId, except: Vec<PlayerName> },

    /// Every logged-in player except one (logout broadcasts).
    EveryoneExcept(PlayerName),
}

// ---------------------------------------------------------------------------
// Outbound: what subsystems produce
// ---------------------------------------------------------------------------

/// A notice produced by a subsystem during a tick.
///
/// Combat, mob AI, status sweeps and command handlers all return ordered
/// `Vec<Outbound>`; the scheduler sends them in exactly that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A line of text for one or more players.
    Text { to: Recipient, text: String },

    /// Refresh the stats display of a player.
    Stats(PlayerName),
}

impl Outbound {
    /// Text for a single player.
    pub fn to_player(name: &PlayerName, text: impl Into<String>) -> Self {
        Self::Text {
            to: Recipient::Player(name.clone()),
            text: text.into(),
        }
    }

    /// Text for everyone in a room.
    pub fn to_room(room: &RoomId, text: impl Into<String>) -> Self {
        Self::Text {
            to: Recipient::Room(room.clone()),
            text: text.into(),
        }
    }

    /// Text for a room's observers, skipping the named participants.
    pub fn to_room_except(
        room: &RoomId,
        except: Vec<PlayerName>,
        text: impl Into<String>,
    ) -> Self {
        Self::Text {
            to: Recipient::RoomExcept {
                room: room.clone(),
                except,
            },
            text: text.into(),
        }
    }

    /// The text of a `Text` notice, or `None` for a stats refresh.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            Self::Stats(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Frames: what reaches a client
// ---------------------------------------------------------------------------

/// The stats panel shown next to the text stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub name: PlayerName,
    pub room: RoomId,
    pub stamina: i32,
    pub max_stamina: i32,
    pub points: u32,
}

/// One frame sent to a client connection.
///
/// `#[serde(tag = "type")]` gives the flat shape clients expect:
/// `{ "type": "Text", "text": "You are asleep." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundFrame {
    Text { text: String },
    Stats { stats: StatsSnapshot },
    Disconnect { reason: String },
}

// =========================================================================
// Tests
// =========================================================================
