//! The world: every room, every online player, every live mob.
//!
//! All three collections are `BTreeMap`s, so any walk over them (mob AI,
//! room broadcasts, snapshots) happens in key order and is repeatable
//! from run to run.

use std::collections::BTreeMap;

use mudforge_protocol::{MobId, PlayerName, RoomId};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Item, MobTemplate, Mobile, Player, Room, WorldError};

/// The authoritative in-memory game state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    rooms: BTreeMap<RoomId, Room>,
    /// Players currently logged in. Offline players live only in
    /// persistence.
    players: BTreeMap<PlayerName, Player>,
    mobs: BTreeMap<MobId, Mobile>,
    #[serde(skip)]
    templates: BTreeMap<String, MobTemplate>,
    /// Monotonic counter that keeps spawned mob ids unique even after
    /// earlier mobs are removed.
    #[serde(default)]
    spawn_seq: u64,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    // =====================================================================
    // Rooms
    // =====================================================================

    pub fn add_room(&mut self, room: Room) {
        self.rooms.insert(room.id.clone(), room);
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Puts items on a room's floor.
    ///
    /// # Errors
    /// Returns [`WorldError::UnknownRoom`] if the room doesn't exist; the
    /// items are lost in that case, so callers should only drop into rooms
    /// they just read from the world.
    pub fn drop_items(&mut self, room: &RoomId, items: Vec<Item>) -> Result<(), WorldError> {
        if items.is_empty() {
            return Ok(());
        }
        let target = self
            .rooms
            .get_mut(room)
            .ok_or_else(|| WorldError::UnknownRoom(room.clone()))?;
        target.add_items(items);
        Ok(())
    }

    // =====================================================================
    // Players
    // =====================================================================

    /// Adds an online player, returning any record it replaced.
    pub fn add_player(&mut self, player: Player) -> Option<Player> {
        self.players.insert(player.name.clone(), player)
    }

    pub fn remove_player(&mut self, name: &PlayerName) -> Option<Player> {
        self.players.remove(name)
    }

    pub fn player(&self, name: &PlayerName) -> Option<&Player> {
        self.players.get(name)
    }

    pub fn player_mut(&mut self, name: &PlayerName) -> Option<&mut Player> {
        self.players.get_mut(name)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Online players standing in `room`, in name order.
    pub fn players_in_room<'a>(
        &'a self,
        room: &'a RoomId,
    ) -> impl Iterator<Item = &'a Player> + 'a {
        self.players
            .values()
            .filter(move |p| &p.current_room == room)
    }

    // =====================================================================
    // Mobs
    // =====================================================================

    pub fn add_template(&mut self, id: impl Into<String>, template: MobTemplate) {
        self.templates.insert(id.into(), template);
    }

    pub fn add_templates(&mut self, templates: BTreeMap<String, MobTemplate>) {
        self.templates.extend(templates);
    }

    pub fn template(&self, id: &str) -> Option<&MobTemplate> {
        self.templates.get(id)
    }

    /// Spawns a mob from a template into `room`, with its aggro countdown
    /// armed from the template's range.
    ///
    /// Ids look like `wolf_3_forest`: template, spawn sequence, room.
    ///
    /// # Errors
    /// - [`WorldError::UnknownTemplate`]: no such template
    /// - [`WorldError::UnknownRoom`]: no such room
    pub fn spawn_mob<R: Rng + ?Sized>(
        &mut self,
        template_id: &str,
        room: &RoomId,
        rng: &mut R,
    ) -> Result<MobId, WorldError> {
        let template = self
            .templates
            .get(template_id)
            .ok_or_else(|| WorldError::UnknownTemplate(template_id.to_string()))?;
        if !self.rooms.contains_key(room) {
            return Err(WorldError::UnknownRoom(room.clone()));
        }

        self.spawn_seq += 1;
        let id = MobId::new(format!("{template_id}_{}_{room}", self.spawn_seq));
        let mut mob = Mobile::from_template(id.clone(), template_id, template, room.clone());
        mob.initialize_aggro_delay(rng);

        tracing::info!(
            mob = %id,
            name = %mob.name,
            %room,
            aggro_counter = ?mob.aggro_counter,
            "mob spawned"
        );
        self.mobs.insert(id.clone(), mob);
        Ok(id)
    }

    /// Removes a mob from the live set.
    pub fn remove_mob(&mut self, id: &MobId) -> Option<Mobile> {
        let removed = self.mobs.remove(id);
        if removed.is_some() {
            tracing::info!(mob = %id, "mob removed");
        }
        removed
    }

    pub fn mob(&self, id: &MobId) -> Option<&Mobile> {
        self.mobs.get(id)
    }

    pub fn mob_mut(&mut self, id: &MobId) -> Option<&mut Mobile> {
        self.mobs.get_mut(id)
    }

    /// Snapshot of every mob id (alive or dead) in id order.
    pub fn mob_ids(&self) -> Vec<MobId> {
        self.mobs.keys().cloned().collect()
    }

    pub fn mobs(&self) -> impl Iterator<Item = &Mobile> {
        self.mobs.values()
    }

    /// Living mobs in `room`. Corpses are never listed.
    pub fn mobs_in_room(&self, room: &RoomId) -> Vec<&Mobile> {
        self.mobs
            .values()
            .filter(|m| m.is_alive() && &m.current_room == room)
            .collect()
    }
}
