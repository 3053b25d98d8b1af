//! Mobiles: NPCs that patrol, grow aggressive and fight.
//!
//! A mob's life is a one-way trip:
//!
//! ```text
//!   Alive ──(killed in combat)──→ Dead
//! ```
//!
//! Its aggression has three sub-states while alive:
//!
//! ```text
//!   None (unarmed) ──initialize──→ Some(n > 0) ──tick…──→ Some(0) (ready)
//! ```
//!
//! Arriving in a room with a visible player re-arms the countdown, so a
//! patrolling wolf doesn't bite the instant it walks in.

use mudforge_protocol::{MobId, PlayerName, RoomId};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Item, LootEntry, MobTemplate};

/// Life state of a mob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MobState {
    Alive,
    Dead,
}

/// A live NPC instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mobile {
    pub id: MobId,
    /// Id of the template it was spawned from.
    pub template: String,
    pub name: String,
    pub description: String,
    pub pronouns: String,

    // -- Combat stats ---------------------------------------------------
    pub strength: u32,
    pub dexterity: u32,
    pub stamina: i32,
    pub max_stamina: i32,
    pub damage: u32,
    pub instant_death: bool,
    pub point_value: u32,

    // -- Behavior -------------------------------------------------------
    pub aggressive: bool,
    pub aggro_delay_min: u32,
    pub aggro_delay_max: u32,
    pub aggro_counter: Option<u32>,
    pub target: Option<PlayerName>,
    pub state: MobState,

    // -- Movement -------------------------------------------------------
    pub current_room: RoomId,
    pub patrol_rooms: Vec<RoomId>,
    pub patrol_index: usize,
    pub movement_interval: u64,
    pub last_move_tick: u64,

    pub loot_table: Vec<LootEntry>,
}

impl Mobile {
    /// Stamps a mob out of a template. The aggro counter starts unarmed;
    /// call [`initialize_aggro_delay`](Self::initialize_aggro_delay) to arm it.
    pub fn from_template(
        id: MobId,
        template_id: impl Into<String>,
        template: &MobTemplate,
        room: RoomId,
    ) -> Self {
        let description = if template.description.is_empty() {
            format!("A {} stands here.", template.name)
        } else {
            template.description.clone()
        };
        Self {
            id,
            template: template_id.into(),
            name: template.name.clone(),
            description,
            pronouns: template.pronouns.clone(),
            strength: template.strength,
            dexterity: template.dexterity,
            stamina: template.max_stamina,
            max_stamina: template.max_stamina,
            damage: template.damage,
            instant_death: template.instant_death,
            point_value: template.point_value,
            aggressive: template.aggressive,
            aggro_delay_min: template.aggro_delay_min,
            aggro_delay_max: template.aggro_delay_max,
            aggro_counter: None,
            target: None,
            state: MobState::Alive,
            current_room: room,
            patrol_rooms: template.patrol_rooms.clone(),
            patrol_index: 0,
            movement_interval: template.movement_interval,
            last_move_tick: 0,
            loot_table: template.loot_table.clone(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state == MobState::Alive
    }

    /// Name with the first letter upper-cased and the rest lower-cased,
    /// for the start of a sentence.
    pub fn capitalized_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => String::new(),
        }
    }

    // -- Aggression -------------------------------------------------------

    /// Arms the aggro countdown with a fresh random delay.
    ///
    /// Aggressive mobs with a non-zero range draw uniformly from
    /// `aggro_delay_min..=aggro_delay_max`; everything else is ready at once.
    pub fn initialize_aggro_delay<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let delay = if self.aggressive && self.aggro_delay_max > 0 {
            let lo = self.aggro_delay_min.min(self.aggro_delay_max);
            rng.random_range(lo..=self.aggro_delay_max)
        } else {
            0
        };
        self.aggro_counter = Some(delay);
    }

    /// Counts the aggro delay down by one tick (floor 0). Returns `true`
    /// on the tick the mob becomes ready.
    pub fn tick_aggro_counter(&mut self) -> bool {
        match self.aggro_counter {
            Some(n) if n > 0 => {
                self.aggro_counter = Some(n - 1);
                if n == 1 {
                    tracing::info!(mob = %self.id, "mob is now aggressive");
                }
                n == 1
            }
            _ => false,
        }
    }

    /// Alive, aggressive, countdown finished, not already fighting.
    pub fn can_attack_player(&self) -> bool {
        self.is_alive()
            && self.aggressive
            && self.aggro_counter == Some(0)
            && self.target.is_none()
    }

    // -- Movement ---------------------------------------------------------

    /// Whether the patrol timer says it's time to move.
    pub fn should_move(&self, tick: u64) -> bool {
        self.is_alive()
            && self.patrol_rooms.len() >= 2
            && self.target.is_none()
            && tick.saturating_sub(self.last_move_tick) >= self.movement_interval
    }

    /// Advances the patrol cursor and returns the next waypoint.
    ///
    /// Without a real patrol route this is the current room.
    pub fn choose_next_room(&mut self) -> RoomId {
        if self.patrol_rooms.len() < 2 {
            return self.current_room.clone();
        }
        self.patrol_index = (self.patrol_index + 1) % self.patrol_rooms.len();
        self.patrol_rooms[self.patrol_index].clone()
    }

    pub fn move_to(&mut self, room: RoomId, tick: u64) {
        tracing::debug!(
            mob = %self.id,
            from = %self.current_room,
            to = %room,
            "mob moved"
        );
        self.current_room = room;
        self.last_move_tick = tick;
    }

    // -- Combat -----------------------------------------------------------

    /// Applies damage. Returns `true` if the mob died.
    ///
    /// Instant-death mobs die to any hit.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        if self.instant_death {
            self.mark_dead();
            return true;
        }
        let amount = i32::try_from(amount).unwrap_or(i32::MAX);
        self.stamina = self.stamina.saturating_sub(amount).max(0);
        if self.stamina == 0 {
            self.mark_dead();
            true
        } else {
            false
        }
    }

    /// Flips the mob to `Dead`. One-way.
    pub fn mark_dead(&mut self) {
        self.stamina = 0;
        self.state = MobState::Dead;
        self.target = None;
        self.description = format!("The corpse of {} lies here.", self.name);
        tracing::info!(mob = %self.id, name = %self.name, "mob slain");
    }

    /// Rolls every loot-table row independently and returns what dropped,
    /// in table order.
    pub fn drop_loot<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Item> {
        self.loot_table
            .iter()
            .filter(|entry| rng.random::<f64>() < entry.chance)
            .map(|entry| entry.item.clone())
            .collect()
    }
}
