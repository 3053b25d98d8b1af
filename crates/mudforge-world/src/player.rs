//! The persistent player record.

use mudforge_protocol::{PlayerName, RoomId, StatsSnapshot};
use serde::{Deserialize, Serialize};

use crate::{Item, Weapon};

/// Starting stamina, strength and dexterity of a new character.
pub const STARTING_STAT: i32 = 45;

/// A player character.
///
/// Lives in the [`World`](crate::World) while its owner is logged in and
/// is handed to [`Persistence`](crate::Persistence) at the edges (defeat,
/// quit, disconnect).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: PlayerName,
    pub current_room: RoomId,
    pub stamina: i32,
    pub max_stamina: i32,
    pub strength: u32,
    pub dexterity: u32,
    pub points: u32,
    #[serde(default)]
    pub inventory: Vec<Item>,
    #[serde(default)]
    pub equipped: Option<Weapon>,
}

impl Player {
    /// A brand-new character standing in `room`.
    pub fn new(name: impl Into<PlayerName>, room: RoomId) -> Self {
        Self {
            name: name.into(),
            current_room: room,
            stamina: STARTING_STAT,
            max_stamina: STARTING_STAT,
            strength: STARTING_STAT as u32,
            dexterity: STARTING_STAT as u32,
            points: 0,
            inventory: Vec::new(),
            equipped: None,
        }
    }

    pub fn is_at_max_stamina(&self) -> bool {
        self.stamina >= self.max_stamina
    }

    /// Heals up to `max_stamina`. Returns the new stamina.
    pub fn heal(&mut self, amount: i32) -> i32 {
        self.stamina = (self.stamina + amount).min(self.max_stamina);
        self.stamina
    }

    /// Applies damage. Returns `true` if the player is down to zero.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        let amount = i32::try_from(amount).unwrap_or(i32::MAX);
        self.stamina = self.stamina.saturating_sub(amount).max(0);
        self.stamina == 0
    }

    /// Empties the inventory (and unwields the weapon), returning what
    /// was carried.
    pub fn drop_all_items(&mut self) -> Vec<Item> {
        self.equipped = None;
        std::mem::take(&mut self.inventory)
    }

    /// Takes `1 / denominator` of the player's points away (rounded down) and
    /// returns how many were lost.
    pub fn lose_points_fraction(&mut self, denominator: u32) -> u32 {
        let lost = if denominator == 0 { 0 } else { self.points / denominator };
        self.points -= lost;
        lost
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            name: self.name.clone(),
            room: self.current_room.clone(),
            stamina: self.stamina,
            max_stamina: self.max_stamina,
            points: self.points,
        }
    }
}
