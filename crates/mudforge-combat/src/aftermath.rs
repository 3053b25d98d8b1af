//! What happens after a fight ends.
//!
//! The coordinator decides THAT someone died; an [`Aftermath`] decides
//! what that means for the world: loot, points, respawns, saves. Games
//! with different rules plug in their own implementation.

use std::sync::Arc;

use mudforge_protocol::{CombatantId, MobId, Outbound, PlayerName, RoomId};
use mudforge_world::{Persistence, World};
use rand::RngCore;

use crate::combatant_name;

/// Handles the consequences of a lethal exchange.
///
/// Called after the pairing is already gone from the registry and the
/// loser is already marked dead (mob) or at zero stamina (player).
pub trait Aftermath: Send + Sync {
    /// A mob was slain by `killer`.
    fn mob_slain(
        &self,
        world: &mut World,
        mob: &MobId,
        killer: &CombatantId,
        rng: &mut dyn RngCore,
    ) -> Vec<Outbound>;

    /// A player was beaten by `victor`.
    fn player_defeated(
        &self,
        world: &mut World,
        player: &PlayerName,
        victor: &CombatantId,
    ) -> Vec<Outbound>;
}

/// The stock rules.
///
/// - **Slain mob**: rolls its loot table onto the floor, awards its point
///   value to a player killer, and leaves the live set.
/// - **Defeated player**: drops everything, loses a tenth of their points,
///   and wakes in the spawn room at half stamina. The player and the
///   world are saved.
pub struct StandardAftermath {
    spawn_room: RoomId,
    persistence: Arc<dyn Persistence>,
}

impl StandardAftermath {
    /// Fraction of points lost on defeat is `1 / POINTS_LOSS_DIVISOR`.
    pub const POINTS_LOSS_DIVISOR: u32 = 10;

    pub fn new(spawn_room: RoomId, persistence: Arc<dyn Persistence>) -> Self {
        Self {
            spawn_room,
            persistence,
        }
    }

    pub fn spawn_room(&self) -> &RoomId {
        &self.spawn_room
    }
}

impl Aftermath for StandardAftermath {
    fn mob_slain(
        &self,
        world: &mut World,
        mob_id: &MobId,
        killer: &CombatantId,
        rng: &mut dyn RngCore,
    ) -> Vec<Outbound> {
        let mut out = Vec::new();
        let Some(mob) = world.mob(mob_id) else {
            return out;
        };
        let mob_name = mob.capitalized_name();
        let room = mob.current_room.clone();
        let points = mob.point_value;
        let loot = mob.drop_loot(rng);

        if !loot.is_empty() {
            let names: Vec<&str> = loot.iter().map(|i| i.name.as_str()).collect();
            out.push(Outbound::to_room(
                &room,
                format!("{mob_name} drops {}.", names.join(", ")),
            ));
        }
        if let Err(err) = world.drop_items(&room, loot) {
            tracing::warn!(mob = %mob_id, %room, %err, "loot lost");
        }

        if let Some(name) = killer.as_player() {
            if let Some(player) = world.player_mut(name) {
                player.points += points;
                if points > 0 {
                    out.push(Outbound::to_player(name, format!("You gain {points} points.")));
                }
                out.push(Outbound::Stats(name.clone()));
            }
            out.push(Outbound::to_room_except(
                &room,
                vec![name.clone()],
                format!("{name} has slain {mob_name}!"),
            ));
        }

        world.remove_mob(mob_id);
        out
    }

    fn player_defeated(
        &self,
        world: &mut World,
        name: &PlayerName,
        victor: &CombatantId,
    ) -> Vec<Outbound> {
        let mut out = Vec::new();
        let victor_name = combatant_name(world, victor);
        let Some(player) = world.player_mut(name) else {
            return out;
        };

        let old_room = player.current_room.clone();
        let items = player.drop_all_items();
        let lost = player.lose_points_fraction(Self::POINTS_LOSS_DIVISOR);
        player.current_room = self.spawn_room.clone();
        player.stamina = player.max_stamina / 2;

        if let Err(err) = world.drop_items(&old_room, items) {
            tracing::warn!(player = %name, room = %old_room, %err, "dropped items lost");
        }

        tracing::info!(player = %name, victor = %victor, points_lost = lost, "player defeated");

        let spawn = world
            .room(&self.spawn_room)
            .map(|r| r.render())
            .unwrap_or_default();
        out.push(Outbound::to_player(
            name,
            format!(
                "{victor_name} has defeated you! You've lost {lost} points.\n\
                 All your items have been dropped.\n\
                 You've been returned to safety.\n\n{spawn}"
            ),
        ));
        out.push(Outbound::Stats(name.clone()));

        let mut bystanders_except = vec![name.clone()];
        if let Some(victor_player) = victor.as_player() {
            bystanders_except.push(victor_player.clone());
            out.push(Outbound::to_player(
                victor_player,
                format!("You have defeated {name}!\nThey've lost {lost} points and dropped all their items."),
            ));
            out.push(Outbound::Stats(victor_player.clone()));
        }
        out.push(Outbound::to_room_except(
            &old_room,
            bystanders_except,
            format!("{victor_name} has defeated {name}!"),
        ));

        if let Some(player) = world.player(name) {
            if let Err(err) = self.persistence.save_player(player) {
                tracing::warn!(player = %name, %err, "failed to save defeated player");
            }
        }
        if let Err(err) = self.persistence.save_world(world) {
            tracing::warn!(%err, "failed to save world after defeat");
        }

        out
    }
}
