//! `TickScheduler` builder and the game loop.
//!
//! This is the entry point for running a Mudforge game. It ties together
//! all the layers: transport → sessions → world → combat → mob AI.
//!
//! # One tick
//!
//! ```text
//! combat round (if the combat cadence is due)
//! mob AI
//! status sweeps (combat wake-ups, sleep healing, afflictions, invisibility)
//! for each session, in id order: pop ONE queued line and handle it
//! ```
//!
//! Every subsystem returns its notices; the scheduler sends them in order,
//! awaiting each send, before moving on.
//!
//! A panic inside a command handler is caught and reported to that player
//! alone. A panic inside a tick phase is caught too; the rest of the tick
//! still runs and [`TickScheduler::tick_once`] returns
//! [`MudforgeError::Panicked`].

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use mudforge_combat::{Aftermath, CombatCoordinator, StandardAftermath};
use mudforge_protocol::{CombatantId, Outbound, PlayerName, Recipient, RoomId, SessionId};
use mudforge_session::SessionError;
use mudforge_tick::{CombatCadence, TickClock};
use mudforge_transport::Transport;
use mudforge_world::{NullPersistence, Persistence, Player, World, WorldError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::{
    CommandExecutor, CommandParser, DiscardPending, ExecEnv, GameContext, MudforgeError,
    ParseContext, PendingCommHandler, SchedulerConfig, status,
};

const ASLEEP: &str = "You are asleep.";
const CONVERSE_OFF: &str = "Converse mode OFF.";
const NOT_UNDERSTOOD: &str = "Huh? I didn't understand that.";
const INTERNAL_ERROR: &str = "Error processing command: internal error";

/// Runs `f`, turning a panic into its message.
fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring a [`TickScheduler`].
///
/// # Example
///
/// ```rust,ignore
/// use mudforge::prelude::*;
///
/// let transport = Arc::new(ChannelTransport::new());
/// let mut scheduler = TickSchedulerBuilder::new()
///     .config(SchedulerConfig::default())
///     .world(world)
///     .build(transport, MyParser, MyExecutor)?;
/// scheduler.run_forever().await;
/// ```
pub struct TickSchedulerBuilder {
    config: SchedulerConfig,
    world: World,
    persistence: Arc<dyn Persistence>,
    aftermath: Option<Box<dyn Aftermath>>,
    pending: Box<dyn PendingCommHandler>,
    seed: Option<u64>,
}

impl TickSchedulerBuilder {
    /// Creates a new builder with default settings, an empty world and no
    /// persistence.
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
            world: World::new(),
            persistence: Arc::new(NullPersistence),
            aftermath: None,
            pending: Box::new(DiscardPending),
            seed: None,
        }
    }

    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the starting world (rooms, templates, already-spawned mobs).
    pub fn world(mut self, world: World) -> Self {
        self.world = world;
        self
    }

    /// Where players and the world are saved on defeat and quit.
    pub fn persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = persistence;
        self
    }

    /// Overrides the combat aftermath. Defaults to [`StandardAftermath`]
    /// respawning in the configured spawn room.
    pub fn aftermath(mut self, aftermath: impl Aftermath + 'static) -> Self {
        self.aftermath = Some(Box::new(aftermath));
        self
    }

    /// Sets the handler for multi-step prompts. Defaults to
    /// [`DiscardPending`].
    pub fn pending_handler(mut self, handler: impl PendingCommHandler) -> Self {
        self.pending = Box::new(handler);
        self
    }

    /// Seeds every RNG for reproducible runs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the scheduler.
    ///
    /// # Errors
    /// [`WorldError::UnknownRoom`] if the configured spawn room isn't in
    /// the world.
    pub fn build<T: Transport>(
        self,
        transport: Arc<T>,
        parser: impl CommandParser,
        executor: impl CommandExecutor,
    ) -> Result<TickScheduler<T>, MudforgeError> {
        let spawn_room = self.config.spawn_room.clone();
        if self.world.room(&spawn_room).is_none() {
            return Err(WorldError::UnknownRoom(spawn_room).into());
        }

        let policy = self.config.combat.clone();
        let (combat, rng) = match self.seed {
            Some(seed) => (
                CombatCoordinator::with_seed(policy, seed),
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (CombatCoordinator::new(policy), StdRng::from_os_rng()),
        };
        let aftermath: Box<dyn Aftermath> = match self.aftermath {
            Some(aftermath) => aftermath,
            None => Box::new(StandardAftermath::new(
                spawn_room,
                Arc::clone(&self.persistence),
            )),
        };

        let clock = TickClock::new(self.config.tick.clone());
        let cadence = CombatCadence::new(clock.config().combat_interval(), Instant::now());

        tracing::info!(
            tick_ms = clock.config().tick_interval_ms,
            combat_ms = clock.config().combat_interval_ms,
            rooms = self.world.rooms().count(),
            "tick scheduler built"
        );

        Ok(TickScheduler {
            ctx: GameContext::with_rng(self.world, combat, rng),
            config: self.config,
            clock,
            cadence,
            transport,
            parser: Box::new(parser),
            executor: Box::new(executor),
            pending: self.pending,
            aftermath,
            persistence: self.persistence,
        })
    }
}

impl Default for TickSchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// TickScheduler
// ---------------------------------------------------------------------------

/// The game loop.
///
/// Owns the [`GameContext`] and drives every subsystem from one task.
/// Call [`run_forever`](Self::run_forever) or [`run_until`](Self::run_until)
/// to start ticking, or [`tick_once`](Self::tick_once) to step manually.
pub struct TickScheduler<T: Transport> {
    ctx: GameContext,
    config: SchedulerConfig,
    clock: TickClock,
    cadence: CombatCadence,
    transport: Arc<T>,
    parser: Box<dyn CommandParser>,
    executor: Box<dyn CommandExecutor>,
    pending: Box<dyn PendingCommHandler>,
    aftermath: Box<dyn Aftermath>,
    persistence: Arc<dyn Persistence>,
}

impl<T: Transport> TickScheduler<T> {
    pub fn context(&self) -> &GameContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut GameContext {
        &mut self.ctx
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    // =====================================================================
    // Connection lifecycle
    // =====================================================================

    /// Registers a new connection under a fresh id.
    pub fn open(&mut self) -> SessionId {
        self.ctx.sessions.open()
    }

    /// Registers a connection under an id chosen by the transport.
    pub fn connect(&mut self, id: SessionId) -> Result<(), MudforgeError> {
        self.ctx.sessions.connect(id)?;
        Ok(())
    }

    /// Attaches an authenticated player to a session and brings them into
    /// the world. A player whose saved room no longer exists starts in the
    /// spawn room.
    pub async fn login(&mut self, id: SessionId, mut player: Player) -> Result<(), MudforgeError> {
        self.ctx.sessions.login(id, player.name.clone())?;
        if self.ctx.world.room(&player.current_room).is_none() {
            tracing::warn!(
                player = %player.name,
                room = %player.current_room,
                "saved room missing, using spawn room"
            );
            player.current_room = self.config.spawn_room.clone();
        }
        let name = player.name.clone();
        self.ctx.world.add_player(player);
        self.send_stats(id).await;
        tracing::debug!(session = %id, player = %name, "player entered the world");
        Ok(())
    }

    /// Queues a raw input line for a session.
    pub fn enqueue(&mut self, id: SessionId, text: impl Into<String>) -> Result<(), MudforgeError> {
        self.ctx.sessions.enqueue(id, text)?;
        Ok(())
    }

    /// Tears a session down: ends any fight, saves the player, closes the
    /// connection and tells everyone else they left.
    pub async fn disconnect(&mut self, id: SessionId) -> Result<(), MudforgeError> {
        self.close_session(id).await
    }

    // =====================================================================
    // Loop
    // =====================================================================

    /// Ticks until the process ends.
    pub async fn run_forever(&mut self) {
        let (_stop_tx, stop_rx) = watch::channel(false);
        self.run_until(stop_rx).await;
    }

    /// Ticks until `stop` turns `true` (or its sender is dropped).
    ///
    /// A failing tick is logged and followed by the configured retry
    /// delay; the loop keeps going.
    pub async fn run_until(&mut self, mut stop: watch::Receiver<bool>) {
        tracing::info!("tick scheduler running");

        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                _ = self.clock.wait_for_tick() => {}
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                    continue;
                }
            }

            if let Err(err) = self.tick_once().await {
                tracing::error!(tick = self.clock.tick_count(), error = %err, "tick failed");
                tokio::time::sleep(self.config.error_retry_delay()).await;
            }
            self.clock.record_tick_end();
        }

        tracing::info!(ticks = self.clock.tick_count(), "tick scheduler stopped");
    }

    /// Runs one tick's worth of work without waiting.
    ///
    /// Every phase runs even if an earlier one panicked; the first panic
    /// is returned once the tick is done.
    pub async fn tick_once(&mut self) -> Result<(), MudforgeError> {
        let now = Instant::now();
        let mut failure = None;

        if self.cadence.is_due(now) {
            self.cadence.mark(now);
            let ctx = &mut self.ctx;
            let aftermath = self.aftermath.as_ref();
            let out = guarded(|| ctx.combat.resolve_tick(&mut ctx.world, aftermath, now));
            self.settle("combat", out, &mut failure).await;
        }

        let out = guarded(|| self.ctx.run_mob_ai(now));
        self.settle("mob ai", out, &mut failure).await;

        let heal_interval = self.config.sleep_heal_interval;
        let out = guarded(|| status::sweep(&mut self.ctx, heal_interval, now));
        self.settle("status", out, &mut failure).await;

        for id in self.ctx.sessions.ids() {
            if let Err(err) = self.process_session(id, now).await {
                tracing::error!(session = %id, error = %err, "session processing failed");
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Dispatches a phase's notices, or records its panic.
    async fn settle(
        &self,
        phase: &'static str,
        out: Result<Vec<Outbound>, String>,
        failure: &mut Option<MudforgeError>,
    ) {
        match out {
            Ok(out) => self.dispatch(out).await,
            Err(message) => {
                tracing::error!(phase, panic = %message, "tick phase panicked");
                failure.get_or_insert(MudforgeError::Panicked { phase, message });
            }
        }
    }

    // =====================================================================
    // Per-session command handling
    // =====================================================================

    async fn process_session(&mut self, id: SessionId, now: Instant) -> Result<(), MudforgeError> {
        let Some(session) = self.ctx.sessions.get_mut(id) else {
            return Ok(());
        };
        let Some(player) = session.player.clone() else {
            return Ok(());
        };
        let Some(text) = session.next_command() else {
            return Ok(());
        };
        tracing::info!(session = %id, %player, command = %text, "processing command");

        let mut out = Vec::new();
        let quit = self.handle_line(id, &player, text, now, &mut out);
        // A command may have started a fight with someone asleep.
        match guarded(|| status::combat_wakeup(&mut self.ctx)) {
            Ok(woken) => out.extend(woken),
            Err(panic) => tracing::error!(session = %id, %panic, "combat wake-up panicked"),
        }
        self.dispatch(out).await;
        self.send_stats(id).await;

        if quit {
            self.close_session(id).await?;
        }
        Ok(())
    }

    /// Decides what one raw line means and runs it. Returns `true` if the
    /// player quit.
    fn handle_line(
        &mut self,
        id: SessionId,
        player: &PlayerName,
        mut text: String,
        now: Instant,
        out: &mut Vec<Outbound>,
    ) -> bool {
        let Some(session) = self.ctx.sessions.get_mut(id) else {
            return false;
        };

        if session.flags.sleeping {
            let verb = text.split_whitespace().next().unwrap_or_default();
            if !self.config.is_wake_word(verb) {
                out.push(Outbound::to_player(player, ASLEEP));
                return false;
            }
        }

        if let Some(pending) = session.flags.pending_comm.take() {
            let env = ExecEnv::new(&mut self.ctx, id, now, out);
            let pending_handler = &self.pending;
            match guarded(|| pending_handler.handle(pending, &text, env)) {
                Ok(resolution) => {
                    if let Some(reply) = resolution.reply {
                        out.push(Outbound::to_player(player, reply));
                    }
                    if let Some(session) = self.ctx.sessions.get_mut(id) {
                        session.flags.pending_comm = resolution.next;
                    }
                }
                Err(panic) => {
                    tracing::error!(session = %id, %player, command = %text, %panic, "pending prompt panicked");
                    out.push(Outbound::to_player(player, INTERNAL_ERROR));
                }
            }
            return false;
        }

        if session.flags.converse_mode {
            if self.config.exits_converse(&text) {
                session.flags.converse_mode = false;
                out.push(Outbound::to_player(player, CONVERSE_OFF));
                return false;
            }
            text = format!("say {text}");
        }

        let mut records = {
            let parse_ctx = ParseContext::build(&self.ctx, id);
            self.parser.parse(&text, &parse_ctx)
        };
        if records.is_empty() {
            out.push(Outbound::to_player(player, NOT_UNDERSTOOD));
            return false;
        }

        let rest = records.split_off(1);
        let command = records.remove(0);
        if rest.is_empty() {
            out.push(Outbound::to_player(player, command.original_text.clone()));
        } else {
            out.push(Outbound::to_player(player, text.clone()));
            if let Some(session) = self.ctx.sessions.get_mut(id) {
                session.requeue_front(rest.into_iter().map(|c| c.original_text));
            }
        }

        if let Err(err) = command.validate() {
            tracing::warn!(session = %id, %player, error = %err, "parser produced an invalid command");
            out.push(Outbound::to_player(player, NOT_UNDERSTOOD));
            return false;
        }

        let env = ExecEnv::new(&mut self.ctx, id, now, out);
        let executor = &self.executor;
        let result = match guarded(|| executor.execute(&command, env)) {
            Ok(result) => result,
            Err(panic) => {
                tracing::error!(
                    session = %id,
                    %player,
                    verb = %command.verb,
                    command = %command.original_text,
                    %panic,
                    "command panicked"
                );
                out.push(Outbound::to_player(player, INTERNAL_ERROR));
                return false;
            }
        };
        match result {
            Ok(outcome) => {
                if let Some(reply) = outcome.reply_text() {
                    out.push(Outbound::to_player(player, reply));
                }
                outcome.is_quit()
            }
            Err(err) if err.is_refusal() => {
                tracing::debug!(session = %id, %player, verb = %command.verb, reason = %err, "command refused");
                out.push(Outbound::to_player(player, err.to_string()));
                false
            }
            Err(err) => {
                tracing::error!(
                    session = %id,
                    %player,
                    verb = %command.verb,
                    command = %command.original_text,
                    error = %err,
                    "command failed"
                );
                out.push(Outbound::to_player(
                    player,
                    format!("Error processing command: {err}"),
                ));
                false
            }
        }
    }

    /// Ends a session within the current tick.
    async fn close_session(&mut self, id: SessionId) -> Result<(), MudforgeError> {
        let session = self
            .ctx
            .sessions
            .get_mut(id)
            .ok_or(SessionError::NotFound(id))?;
        session.flags.should_disconnect = true;
        let player = session.player.clone();

        if let Some(name) = &player {
            self.ctx
                .combat
                .disengage(&mut self.ctx.world, &CombatantId::Player(name.clone()));
            if let Some(record) = self.ctx.world.player(name) {
                if let Err(err) = self.persistence.save_player(record) {
                    tracing::warn!(player = %name, error = %err, "failed to save player on quit");
                }
            }
        }

        if let Err(err) = self.transport.disconnect(id).await {
            tracing::warn!(session = %id, error = %err, "transport disconnect failed");
        }
        self.ctx.sessions.remove(id);

        if let Some(name) = player {
            self.ctx.world.remove_player(&name);
            self.dispatch(vec![Outbound::Text {
                to: Recipient::EveryoneExcept(name.clone()),
                text: format!("{name} has left the game."),
            }])
            .await;
        }
        Ok(())
    }

    // =====================================================================
    // Dispatch
    // =====================================================================

    /// Sends notices in order. A failed send is logged and skipped.
    async fn dispatch(&self, notices: Vec<Outbound>) {
        for notice in notices {
            match notice {
                Outbound::Text { to, text } => {
                    for session in self.recipients(&to) {
                        if let Err(err) = self.transport.send_text(session, &text).await {
                            tracing::warn!(%session, error = %err, "send failed");
                        }
                    }
                }
                Outbound::Stats(name) => {
                    if let Some(session) = self.ctx.session_of(&name) {
                        self.send_stats(session).await;
                    }
                }
            }
        }
    }

    async fn send_stats(&self, session: SessionId) {
        let Some(stats) = self.ctx.stats_for(session) else {
            return;
        };
        if let Err(err) = self.transport.send_stats(session, &stats).await {
            tracing::warn!(%session, error = %err, "stats send failed");
        }
    }

    /// Resolves a recipient to sessions, in session id order.
    fn recipients(&self, to: &Recipient) -> Vec<SessionId> {
        let sessions = &self.ctx.sessions;
        let world = &self.ctx.world;
        let in_room = |name: &PlayerName, room: &RoomId| {
            world
                .player(name)
                .is_some_and(|p| &p.current_room == room)
        };

        match to {
            Recipient::Player(name) => sessions.find_by_player(name).into_iter().collect(),
            Recipient::Room(room) => sessions
                .iter()
                .filter(|s| s.player.as_ref().is_some_and(|n| in_room(n, room)))
                .map(|s| s.id)
                .collect(),
            Recipient::RoomExcept { room, except } => sessions
                .iter()
                .filter(|s| {
                    s.player
                        .as_ref()
                        .is_some_and(|n| in_room(n, room) && !except.contains(n))
                })
                .map(|s| s.id)
                .collect(),
            Recipient::EveryoneExcept(name) => sessions
                .iter()
                .filter(|s| s.player.as_ref().is_some_and(|n| n != name))
                .map(|s| s.id)
                .collect(),
        }
    }
}
