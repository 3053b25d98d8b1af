//! The single owner of all mutable game state.

use mudforge_combat::CombatCoordinator;
use mudforge_mob::MobAIEngine;
use mudforge_protocol::{Outbound, PlayerName, SessionId, StatsSnapshot};
use mudforge_session::SessionRegistry;
use mudforge_world::World;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::time::Instant;

/// Sessions, world, combat and mob AI, owned together.
///
/// The scheduler holds the only `GameContext` and lends it out by `&mut`
/// to one subsystem at a time, so nothing in here needs a lock.
pub struct GameContext {
    pub sessions: SessionRegistry,
    pub world: World,
    pub combat: CombatCoordinator,
    pub mobs: MobAIEngine,
    /// Shared RNG for everything outside combat (aggro delays, spawns).
    pub rng: StdRng,
}

impl GameContext {
    pub fn new(world: World, combat: CombatCoordinator) -> Self {
        Self::with_rng(world, combat, StdRng::from_os_rng())
    }

    pub fn with_rng(world: World, combat: CombatCoordinator, rng: StdRng) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            world,
            combat,
            mobs: MobAIEngine::new(),
            rng,
        }
    }

    /// Whether other players and mobs can see `player` at `now`.
    ///
    /// Players without a session (no connection) count as visible.
    pub fn is_visible(&self, player: &PlayerName, now: Instant) -> bool {
        player_visible(&self.sessions, player, now)
    }

    /// The session a player is connected on.
    pub fn session_of(&self, player: &PlayerName) -> Option<SessionId> {
        self.sessions.find_by_player(player)
    }

    /// The stats panel for the player logged in on `session`.
    pub fn stats_for(&self, session: SessionId) -> Option<StatsSnapshot> {
        let name = self.sessions.get(session)?.player.as_ref()?;
        self.world.player(name).map(|p| p.stats())
    }

    /// Runs one mob AI tick with visibility taken from the sessions.
    pub(crate) fn run_mob_ai(&mut self, now: Instant) -> Vec<Outbound> {
        let sessions = &self.sessions;
        self.mobs.tick_all(
            &mut self.world,
            &mut self.combat,
            |p| player_visible(sessions, p, now),
            &mut self.rng,
            now,
        )
    }
}

fn player_visible(sessions: &SessionRegistry, player: &PlayerName, now: Instant) -> bool {
    sessions
        .find_by_player(player)
        .and_then(|id| sessions.get(id))
        .is_none_or(|s| !s.is_invisible(now))
}
