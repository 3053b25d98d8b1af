//! The per-tick mob driver.

use mudforge_combat::CombatCoordinator;
use mudforge_protocol::{CombatantId, MobId, Outbound, PlayerName, RoomId};
use mudforge_world::{Mobile, World, WorldError};
use rand::Rng;
use tokio::time::Instant;

/// Drives every mob in the world.
///
/// The engine holds no mobs itself; they live in [`World`]. It only keeps
/// the global AI tick counter that patrol timers are measured against.
#[derive(Debug, Default)]
pub struct MobAIEngine {
    tick: u64,
}

impl MobAIEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of AI ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Spawns a mob from a template and arms its aggro countdown.
    ///
    /// # Errors
    /// [`WorldError::UnknownTemplate`] or [`WorldError::UnknownRoom`].
    pub fn spawn<R: Rng + ?Sized>(
        &self,
        world: &mut World,
        template_id: &str,
        room: &RoomId,
        rng: &mut R,
    ) -> Result<MobId, WorldError> {
        world.spawn_mob(template_id, room, rng)
    }

    /// Ends the mob's fight (if any) and takes it out of the world.
    pub fn despawn(
        &self,
        world: &mut World,
        combat: &mut CombatCoordinator,
        id: &MobId,
    ) -> Option<Mobile> {
        combat.disengage(world, &CombatantId::Mob(id.clone()));
        let removed = world.remove_mob(id);
        if removed.is_some() {
            tracing::info!(mob = %id, "mob despawned");
        }
        removed
    }

    /// Runs one AI tick over every mob, in id order.
    ///
    /// `visible` answers whether a player can be seen. Invisible players
    /// are never ambushed and don't re-arm a mob's aggro delay.
    pub fn tick_all<V, R>(
        &mut self,
        world: &mut World,
        combat: &mut CombatCoordinator,
        visible: V,
        rng: &mut R,
        now: Instant,
    ) -> Vec<Outbound>
    where
        V: Fn(&PlayerName) -> bool,
        R: Rng + ?Sized,
    {
        self.tick += 1;
        let tick = self.tick;
        let mut out = Vec::new();

        for id in world.mob_ids() {
            if combat.is_in_combat(&CombatantId::Mob(id.clone())) {
                continue;
            }
            let Some(mob) = world.mob_mut(&id) else {
                continue;
            };
            if !mob.is_alive() {
                continue;
            }

            mob.tick_aggro_counter();

            if mob.should_move(tick) {
                patrol_step(world, &id, tick, &visible, rng, &mut out);
            }

            if world.mob(&id).is_some_and(Mobile::can_attack_player) {
                ambush(world, combat, &id, &visible, now, &mut out);
            }
        }

        tracing::trace!(tick, notices = out.len(), "mob AI tick");
        out
    }
}

/// Moves a mob to its next waypoint and narrates it on both ends.
fn patrol_step<V, R>(
    world: &mut World,
    id: &MobId,
    tick: u64,
    visible: &V,
    rng: &mut R,
    out: &mut Vec<Outbound>,
) where
    V: Fn(&PlayerName) -> bool,
    R: Rng + ?Sized,
{
    let Some(mob) = world.mob_mut(id) else {
        return;
    };
    let from = mob.current_room.clone();
    let to = mob.choose_next_room();
    if to == from {
        return;
    }
    let name = mob.capitalized_name();

    if world.room(&to).is_none() {
        tracing::warn!(mob = %id, room = %to, "patrol waypoint does not exist");
        return;
    }

    let watched = world
        .players_in_room(&to)
        .any(|p| visible(&p.name));

    let Some(mob) = world.mob_mut(id) else {
        return;
    };
    mob.move_to(to.clone(), tick);
    if mob.aggressive && watched {
        mob.initialize_aggro_delay(rng);
    }

    out.push(Outbound::to_room(&from, format!("{name} leaves.")));
    out.push(Outbound::to_room(&to, format!("{name} arrives.")));
}

/// Picks the first visible, unoccupied player in the mob's room and
/// starts a fight with the mob holding the initiative.
fn ambush<V>(
    world: &mut World,
    combat: &mut CombatCoordinator,
    id: &MobId,
    visible: &V,
    now: Instant,
    out: &mut Vec<Outbound>,
) where
    V: Fn(&PlayerName) -> bool,
{
    let Some(mob) = world.mob(id) else {
        return;
    };
    let room = mob.current_room.clone();
    let name = mob.capitalized_name();

    let victim = world
        .players_in_room(&room)
        .filter(|p| p.stamina > 0)
        .map(|p| p.name.clone())
        .find(|p| visible(p) && !combat.is_in_combat(&CombatantId::Player(p.clone())));
    let Some(victim) = victim else {
        return;
    };

    match combat.engage(
        world,
        CombatantId::Mob(id.clone()),
        CombatantId::Player(victim.clone()),
        None,
        true,
        now,
    ) {
        Ok(pairing) => {
            tracing::info!(mob = %id, player = %victim, %pairing, "mob ambush");
            out.push(Outbound::to_player(
                &victim,
                format!("{name} attacks you by surprise!"),
            ));
            out.push(Outbound::to_room_except(
                &room,
                vec![victim.clone()],
                format!("{name} attacks {victim}!"),
            ));
        }
        Err(err) => {
            tracing::debug!(mob = %id, player = %victim, %err, "ambush refused");
        }
    }
}
