//! The combat registry and the per-round resolver.
//!
//! # Storage
//!
//! Each pairing is stored ONCE, in an arena keyed by a monotonically
//! increasing [`PairingId`]. A second map indexes both participants to
//! that id:
//!
//! ```text
//! pairings: { P1 → CombatSession { attacker: player:Hero, defender: mob:wolf_1 } }
//! index:    { player:Hero → P1, mob:wolf_1 → P1 }
//! ```
//!
//! Insert and remove always touch both index entries together, so the two
//! sides of a fight can never disagree about who they're fighting, and a
//! round that walks the arena resolves each pairing exactly once, in the
//! order the fights started.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use mudforge_protocol::{CombatantId, Outbound, RoomId};
use mudforge_world::{Weapon, World};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::time::Instant;

use crate::{Aftermath, CombatError, CombatPolicy, dialogue};

// ---------------------------------------------------------------------------
// Pairing types
// ---------------------------------------------------------------------------

/// Arena key of one pairing. Increases with every engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairingId(pub u64);

impl fmt::Display for PairingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Which side of a pairing acts next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    pub fn flipped(self) -> Self {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }
}

/// One active fight.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatSession {
    pub id: PairingId,
    pub attacker: CombatantId,
    pub defender: CombatantId,
    pub initiative: Side,
    /// The weapon the attacker started the fight with, if any.
    pub weapon: Option<Weapon>,
    pub started_at: Instant,
    pub last_turn: Instant,
}

impl CombatSession {
    /// The other participant, or `None` if `who` isn't in this pairing.
    pub fn opponent_of(&self, who: &CombatantId) -> Option<&CombatantId> {
        if &self.attacker == who {
            Some(&self.defender)
        } else if &self.defender == who {
            Some(&self.attacker)
        } else {
            None
        }
    }

    /// `(acting, receiving)` for the current initiative.
    pub fn turn(&self) -> (&CombatantId, &CombatantId) {
        match self.initiative {
            Side::Attacker => (&self.attacker, &self.defender),
            Side::Defender => (&self.defender, &self.attacker),
        }
    }
}

// ---------------------------------------------------------------------------
// Fighter view
// ---------------------------------------------------------------------------

/// The numbers a round needs from one participant.
struct Fighter {
    name: String,
    room: RoomId,
    strength: u32,
    dexterity: u32,
    bonus: u32,
    weapon_name: Option<String>,
}

/// Display name of a combatant: the player's name, or the mob's name in
/// sentence case. Falls back to the raw id for anything missing.
pub fn combatant_name(world: &World, who: &CombatantId) -> String {
    match who {
        CombatantId::Player(name) => name.to_string(),
        CombatantId::Mob(id) => world
            .mob(id)
            .map(|m| m.capitalized_name())
            .unwrap_or_else(|| id.to_string()),
    }
}

/// Returns `true` if the combatant exists and can still fight.
fn is_fit(world: &World, who: &CombatantId) -> bool {
    match who {
        CombatantId::Player(name) => world.player(name).is_some_and(|p| p.stamina > 0),
        CombatantId::Mob(id) => world.mob(id).is_some_and(|m| m.is_alive()),
    }
}

fn room_of(world: &World, who: &CombatantId) -> Option<RoomId> {
    match who {
        CombatantId::Player(name) => world.player(name).map(|p| p.current_room.clone()),
        CombatantId::Mob(id) => world.mob(id).map(|m| m.current_room.clone()),
    }
}

// ---------------------------------------------------------------------------
// CombatCoordinator
// ---------------------------------------------------------------------------

/// Owns every active pairing and resolves one exchange per pairing per
/// combat round.
pub struct CombatCoordinator {
    pairings: BTreeMap<PairingId, CombatSession>,
    index: HashMap<CombatantId, PairingId>,
    next_id: u64,
    policy: CombatPolicy,
    rng: StdRng,
}

impl CombatCoordinator {
    /// A coordinator with an OS-seeded RNG.
    pub fn new(policy: CombatPolicy) -> Self {
        Self::with_rng(policy, StdRng::from_os_rng())
    }

    /// A coordinator with a fixed seed, for reproducible fights.
    pub fn with_seed(policy: CombatPolicy, seed: u64) -> Self {
        Self::with_rng(policy, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(policy: CombatPolicy, rng: StdRng) -> Self {
        Self {
            pairings: BTreeMap::new(),
            index: HashMap::new(),
            next_id: 0,
            policy,
            rng,
        }
    }

    pub fn policy(&self) -> &CombatPolicy {
        &self.policy
    }

    // =====================================================================
    // Queries
    // =====================================================================

    pub fn is_in_combat(&self, who: &CombatantId) -> bool {
        self.index.contains_key(who)
    }

    pub fn pairing_of(&self, who: &CombatantId) -> Option<&CombatSession> {
        self.index.get(who).and_then(|id| self.pairings.get(id))
    }

    pub fn opponent_of(&self, who: &CombatantId) -> Option<&CombatantId> {
        self.pairing_of(who).and_then(|s| s.opponent_of(who))
    }

    /// Active pairings in the order they started.
    pub fn iter(&self) -> impl Iterator<Item = &CombatSession> {
        self.pairings.values()
    }

    pub fn len(&self) -> usize {
        self.pairings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairings.is_empty()
    }

    // =====================================================================
    // Engage / disengage
    // =====================================================================

    /// Starts a fight.
    ///
    /// On success one pairing is stored and indexed from both sides. A mob
    /// participant fighting a player has its `target` set to that player.
    ///
    /// # Errors
    /// - [`CombatError::SelfTarget`]: attacker and defender are the same
    /// - [`CombatError::AlreadyFighting`]: the attacker is already paired
    /// - [`CombatError::TargetBusy`]: the defender is paired with someone else
    /// - [`CombatError::UnknownCombatant`]: either side is missing or dead
    ///
    /// Nothing changes on error.
    pub fn engage(
        &mut self,
        world: &mut World,
        attacker: CombatantId,
        defender: CombatantId,
        weapon: Option<Weapon>,
        attacker_has_initiative: bool,
        now: Instant,
    ) -> Result<PairingId, CombatError> {
        if attacker == defender {
            return Err(CombatError::SelfTarget);
        }
        if let Some(opponent) = self.opponent_of(&attacker) {
            return Err(CombatError::AlreadyFighting {
                opponent: opponent.clone(),
                opponent_name: combatant_name(world, opponent),
            });
        }
        if self.is_in_combat(&defender) {
            return Err(CombatError::TargetBusy(combatant_name(world, &defender)));
        }
        for who in [&attacker, &defender] {
            if !is_fit(world, who) {
                return Err(CombatError::UnknownCombatant(who.clone()));
            }
        }

        self.next_id += 1;
        let id = PairingId(self.next_id);
        set_mob_target(world, &attacker, &defender);
        set_mob_target(world, &defender, &attacker);

        tracing::info!(
            pairing = %id,
            %attacker,
            %defender,
            initiative = attacker_has_initiative,
            "combat engaged"
        );

        self.index.insert(attacker.clone(), id);
        self.index.insert(defender.clone(), id);
        self.pairings.insert(
            id,
            CombatSession {
                id,
                attacker,
                defender,
                initiative: if attacker_has_initiative {
                    Side::Attacker
                } else {
                    Side::Defender
                },
                weapon,
                started_at: now,
                last_turn: now,
            },
        );
        Ok(id)
    }

    /// Ends whatever fight `who` is in. Idempotent.
    ///
    /// Clears the target of any mob in the pairing and returns the removed
    /// pairing, or `None` if `who` wasn't fighting.
    pub fn disengage(&mut self, world: &mut World, who: &CombatantId) -> Option<CombatSession> {
        let id = *self.index.get(who)?;
        let session = self.remove_pairing(id)?;
        clear_mob_target(world, &session.attacker);
        clear_mob_target(world, &session.defender);
        tracing::info!(pairing = %id, combatant = %who, "combat disengaged");
        Some(session)
    }

    /// Removes a pairing and both of its index entries in one step.
    fn remove_pairing(&mut self, id: PairingId) -> Option<CombatSession> {
        let session = self.pairings.remove(&id)?;
        self.index.remove(&session.attacker);
        self.index.remove(&session.defender);
        Some(session)
    }

    // =====================================================================
    // Resolution
    // =====================================================================

    /// Runs one combat round: a single exchange for every pairing, in the
    /// order the fights started.
    ///
    /// Pairings whose participants are missing, dead, or no longer in the
    /// same room are torn down without a word. A lethal blow removes the
    /// pairing before the [`Aftermath`] runs.
    pub fn resolve_tick(
        &mut self,
        world: &mut World,
        aftermath: &dyn Aftermath,
        now: Instant,
    ) -> Vec<Outbound> {
        let mut out = Vec::new();
        let ids: Vec<PairingId> = self.pairings.keys().copied().collect();

        for id in ids {
            let Some(session) = self.pairings.get(&id).cloned() else {
                continue;
            };

            if let Some(reason) = desync_reason(world, &session) {
                tracing::debug!(pairing = %id, reason, "tearing down stale pairing");
                self.remove_pairing(id);
                clear_mob_target(world, &session.attacker);
                clear_mob_target(world, &session.defender);
                reap_dead_mob(world, &session.attacker);
                reap_dead_mob(world, &session.defender);
                continue;
            }

            self.resolve_exchange(world, aftermath, &session, now, &mut out);
        }

        out
    }

    fn resolve_exchange(
        &mut self,
        world: &mut World,
        aftermath: &dyn Aftermath,
        session: &CombatSession,
        now: Instant,
        out: &mut Vec<Outbound>,
    ) {
        let (actor_id, target_id) = session.turn();
        let (Some(actor), Some(target)) = (
            fighter(world, actor_id, session),
            fighter(world, target_id, session),
        ) else {
            return;
        };

        let hit = self
            .policy
            .roll_hit(actor.dexterity, target.dexterity, &mut self.rng);

        if !hit {
            if let Some(name) = actor_id.as_player() {
                out.push(Outbound::to_player(
                    name,
                    dialogue::player_miss(&target.name, &mut self.rng),
                ));
            }
            if let Some(name) = target_id.as_player() {
                out.push(Outbound::to_player(
                    name,
                    dialogue::opponent_miss(&actor.name, &mut self.rng),
                ));
            }
            out.push(observers(
                &actor.room,
                actor_id,
                target_id,
                dialogue::observer_miss(&actor.name, &target.name),
            ));
            self.finish_turn(session.id, now);
            push_stats(out, session);
            return;
        }

        let damage = self
            .policy
            .roll_damage(actor.strength, actor.bonus, &mut self.rng);
        let lethal = apply_damage(world, target_id, damage);
        let weapon = actor.weapon_name.as_deref();

        tracing::debug!(
            pairing = %session.id,
            actor = %actor_id,
            target = %target_id,
            damage,
            lethal,
            "combat exchange"
        );

        if let Some(name) = actor_id.as_player() {
            let line = if lethal {
                dialogue::killing_blow(&target.name, weapon, &mut self.rng)
            } else {
                dialogue::player_hit(&target.name, weapon, &mut self.rng)
            };
            out.push(Outbound::to_player(name, line));
        }
        if let Some(name) = target_id.as_player() {
            let mut line = dialogue::opponent_hit(&actor.name, weapon, &mut self.rng);
            let reeling = world
                .player(name)
                .is_some_and(|p| p.stamina > 0 && p.stamina * 4 <= p.max_stamina);
            if !lethal && reeling {
                line.push('\n');
                line.push_str(&dialogue::heavy_damage_recovery(&mut self.rng));
            }
            out.push(Outbound::to_player(name, line));
        }
        out.push(observers(
            &actor.room,
            actor_id,
            target_id,
            dialogue::observer_hit(&actor.name, &target.name),
        ));

        if !lethal {
            self.finish_turn(session.id, now);
            push_stats(out, session);
            return;
        }

        self.remove_pairing(session.id);
        clear_mob_target(world, actor_id);
        tracing::info!(
            pairing = %session.id,
            victor = %actor_id,
            loser = %target_id,
            "combat ended"
        );
        match target_id {
            CombatantId::Mob(mob) => {
                out.extend(aftermath.mob_slain(world, mob, actor_id, &mut self.rng));
            }
            CombatantId::Player(player) => {
                out.extend(aftermath.player_defeated(world, player, actor_id));
            }
        }
    }

    fn finish_turn(&mut self, id: PairingId, now: Instant) {
        if let Some(session) = self.pairings.get_mut(&id) {
            session.initiative = session.initiative.flipped();
            session.last_turn = now;
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn desync_reason(world: &World, session: &CombatSession) -> Option<&'static str> {
    if !is_fit(world, &session.attacker) {
        return Some("attacker missing or dead");
    }
    if !is_fit(world, &session.defender) {
        return Some("defender missing or dead");
    }
    if room_of(world, &session.attacker) != room_of(world, &session.defender) {
        return Some("participants in different rooms");
    }
    None
}

fn fighter(world: &World, who: &CombatantId, session: &CombatSession) -> Option<Fighter> {
    match who {
        CombatantId::Player(name) => {
            let player = world.player(name)?;
            // The initiating attacker swings the weapon they attacked with;
            // anyone else uses whatever they have equipped.
            let weapon = if &session.attacker == who {
                session.weapon.clone().or_else(|| player.equipped.clone())
            } else {
                player.equipped.clone()
            };
            Some(Fighter {
                name: name.to_string(),
                room: player.current_room.clone(),
                strength: player.strength,
                dexterity: player.dexterity,
                bonus: weapon.as_ref().map_or(0, |w| w.damage),
                weapon_name: weapon.map(|w| w.name),
            })
        }
        CombatantId::Mob(id) => {
            let mob = world.mob(id)?;
            Some(Fighter {
                name: mob.capitalized_name(),
                room: mob.current_room.clone(),
                strength: mob.strength,
                dexterity: mob.dexterity,
                bonus: mob.damage,
                weapon_name: None,
            })
        }
    }
}

/// Applies damage and returns `true` if it was lethal.
fn apply_damage(world: &mut World, who: &CombatantId, damage: u32) -> bool {
    match who {
        CombatantId::Player(name) => world
            .player_mut(name)
            .is_some_and(|p| p.take_damage(damage)),
        CombatantId::Mob(id) => world.mob_mut(id).is_some_and(|m| m.take_damage(damage)),
    }
}

fn observers(room: &RoomId, a: &CombatantId, b: &CombatantId, text: String) -> Outbound {
    let except = [a, b]
        .into_iter()
        .filter_map(|c| c.as_player().cloned())
        .collect();
    Outbound::to_room_except(room, except, text)
}

fn push_stats(out: &mut Vec<Outbound>, session: &CombatSession) {
    for who in [&session.attacker, &session.defender] {
        if let Some(name) = who.as_player() {
            out.push(Outbound::Stats(name.clone()));
        }
    }
}

fn set_mob_target(world: &mut World, who: &CombatantId, opponent: &CombatantId) {
    if let (CombatantId::Mob(id), Some(player)) = (who, opponent.as_player()) {
        if let Some(mob) = world.mob_mut(id) {
            mob.target = Some(player.clone());
        }
    }
}

fn clear_mob_target(world: &mut World, who: &CombatantId) {
    if let CombatantId::Mob(id) = who {
        if let Some(mob) = world.mob_mut(id) {
            mob.target = None;
        }
    }
}

/// A mob that is dead but still in the live set is leftover from a fight
/// that ended badly; take it out.
fn reap_dead_mob(world: &mut World, who: &CombatantId) {
    if let CombatantId::Mob(id) = who {
        if world.mob(id).is_some_and(|m| !m.is_alive()) {
            world.remove_mob(id);
        }
    }
}
