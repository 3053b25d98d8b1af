//! Integration tests for the tick scheduler: command draining, sleep,
//! converse mode, prompts, quitting, combat cadence, panic containment
//! and the run loop.

use std::sync::Mutex;
use std::time::Duration;

use mudforge::prelude::*;
use tokio::sync::watch;

// =========================================================================
// Test doubles
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
enum Frame {
    Text(String),
    Stats(StatsSnapshot),
    Disconnect,
}

/// Records every frame, per session, in send order.
#[derive(Default)]
struct RecordingTransport {
    frames: Mutex<Vec<(SessionId, Frame)>>,
}

impl RecordingTransport {
    fn frames_for(&self, session: SessionId) -> Vec<Frame> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == session)
            .map(|(_, f)| f.clone())
            .collect()
    }

    fn texts_for(&self, session: SessionId) -> Vec<String> {
        self.frames_for(session)
            .into_iter()
            .filter_map(|f| match f {
                Frame::Text(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    fn clear(&self) {
        self.frames.lock().unwrap().clear();
    }
}

impl Transport for RecordingTransport {
    async fn send_text(&self, session: SessionId, text: &str) -> Result<(), TransportError> {
        self.frames
            .lock()
            .unwrap()
            .push((session, Frame::Text(text.to_string())));
        Ok(())
    }

    async fn send_stats(
        &self,
        session: SessionId,
        stats: &StatsSnapshot,
    ) -> Result<(), TransportError> {
        self.frames
            .lock()
            .unwrap()
            .push((session, Frame::Stats(stats.clone())));
        Ok(())
    }

    async fn disconnect(&self, session: SessionId) -> Result<(), TransportError> {
        self.frames.lock().unwrap().push((session, Frame::Disconnect));
        Ok(())
    }
}

/// Splits on commas; the verb is the first word of each part.
struct CommaParser {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CommandParser for CommaParser {
    fn parse(&self, text: &str, _ctx: &ParseContext<'_>) -> Vec<CommandRecord> {
        self.calls.lock().unwrap().push(text.to_string());
        text.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty() && *part != "???")
            .map(|part| {
                let mut words = part.splitn(2, ' ');
                let verb = words.next().unwrap_or_default();
                let record = CommandRecord::new(verb, part);
                match words.next() {
                    Some(subject) => record.with_subject(subject),
                    None => record,
                }
            })
            .collect()
    }
}

/// Runs a handful of verbs and records what it ran.
struct ScriptedExecutor {
    executed: Arc<Mutex<Vec<String>>>,
}

impl CommandExecutor for ScriptedExecutor {
    fn execute(
        &self,
        command: &CommandRecord,
        mut env: ExecEnv<'_>,
    ) -> Result<ExecOutcome, CommandError> {
        self.executed
            .lock()
            .unwrap()
            .push(command.original_text.clone());
        let me = env.player_name()?;
        match command.verb.as_str() {
            "fail" => Err(CommandError::World(WorldError::UnknownRoom(RoomId::new(
                "void",
            )))),
            "refuse" => Err(CommandError::Rejected("You can't do that here.".into())),
            "boom" => panic!("executor blew up"),
            "quit" => Ok(ExecOutcome::Quit("Goodbye.".into())),
            "shout" => {
                if let Some(session) = env.ctx.sessions.get_mut(env.session) {
                    session.flags.pending_comm = Some(PendingComm::Shout);
                }
                Ok(ExecOutcome::Reply("What do you want to shout?".into()))
            }
            "converse" => {
                if let Some(session) = env.ctx.sessions.get_mut(env.session) {
                    session.flags.converse_mode = true;
                }
                Ok(ExecOutcome::Reply("Converse mode ON.".into()))
            }
            "wave" => {
                let room = env
                    .ctx
                    .world
                    .player(&me)
                    .map(|p| p.current_room.clone())
                    .ok_or(CommandError::NotLoggedIn)?;
                env.emit(Outbound::to_room_except(
                    &room,
                    vec![me.clone()],
                    format!("{me} waves."),
                ));
                Ok(ExecOutcome::Silent)
            }
            "attack" => {
                let target = command.subject.clone().unwrap_or_default();
                let ctx = &mut *env.ctx;
                let mob = ctx
                    .world
                    .mobs_in_room(&RoomId::new("hall"))
                    .into_iter()
                    .find(|m| m.name == target)
                    .map(|m| m.id.clone())
                    .ok_or(CommandError::NoSuchTarget(target))?;
                ctx.combat.engage(
                    &mut ctx.world,
                    CombatantId::Player(me),
                    CombatantId::Mob(mob),
                    None,
                    true,
                    env.now,
                )?;
                Ok(ExecOutcome::Reply("You attack!".into()))
            }
            "duel" => {
                let foe = PlayerName::new(command.subject.clone().unwrap_or_default());
                let ctx = &mut *env.ctx;
                ctx.combat.engage(
                    &mut ctx.world,
                    CombatantId::Player(me),
                    CombatantId::Player(foe),
                    None,
                    true,
                    env.now,
                )?;
                Ok(ExecOutcome::Reply("En garde!".into()))
            }
            verb => Ok(ExecOutcome::Reply(format!("ok {verb}"))),
        }
    }
}

/// Answers any prompt once and finishes it.
struct EchoPrompt;

impl PendingCommHandler for EchoPrompt {
    fn handle(&self, pending: PendingComm, text: &str, _env: ExecEnv<'_>) -> PendingResolution {
        match pending {
            PendingComm::Shout => PendingResolution::done(format!("You shout: {text}")),
            other => PendingResolution::continue_with("Again?", other),
        }
    }
}

/// Panics whenever anything is slain.
struct PanickingAftermath;

impl Aftermath for PanickingAftermath {
    fn mob_slain(
        &self,
        _world: &mut World,
        _mob: &MobId,
        _killer: &CombatantId,
        _rng: &mut dyn rand::RngCore,
    ) -> Vec<Outbound> {
        panic!("aftermath blew up")
    }

    fn player_defeated(
        &self,
        _world: &mut World,
        _player: &PlayerName,
        _victor: &CombatantId,
    ) -> Vec<Outbound> {
        panic!("aftermath blew up")
    }
}

#[derive(Default)]
struct RecordingPersistence {
    players: Mutex<Vec<PlayerName>>,
}

impl Persistence for RecordingPersistence {
    fn save_player(&self, player: &Player) -> Result<(), WorldError> {
        self.players.lock().unwrap().push(player.name.clone());
        Ok(())
    }

    fn save_world(&self, _world: &World) -> Result<(), WorldError> {
        Ok(())
    }
}

// =========================================================================
// Fixture
// =========================================================================

struct Harness {
    scheduler: TickScheduler<RecordingTransport>,
    transport: Arc<RecordingTransport>,
    parsed: Arc<Mutex<Vec<String>>>,
    executed: Arc<Mutex<Vec<String>>>,
    persistence: Arc<RecordingPersistence>,
}

fn world() -> World {
    let mut world = World::new();
    world.add_room(Room::new("spawn", "Spawn Point").with_exit("north", "hall"));
    world.add_room(Room::new("hall", "Great Hall").with_exit("south", "spawn"));
    world.add_template(
        "rat",
        MobTemplate {
            max_stamina: 1000,
            ..MobTemplate::named("rat")
        },
    );
    world.add_template(
        "wolf",
        MobTemplate {
            aggressive: true,
            ..MobTemplate::named("wolf")
        },
    );
    world
}

fn sure_hits() -> SchedulerConfig {
    SchedulerConfig {
        combat: CombatPolicy {
            min_hit: 1.0,
            max_hit: 1.0,
            variance_lo: 1.0,
            variance_hi: 1.0,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn harness_with(world: World, config: SchedulerConfig) -> Harness {
    let transport = Arc::new(RecordingTransport::default());
    let parsed = Arc::new(Mutex::new(Vec::new()));
    let executed = Arc::new(Mutex::new(Vec::new()));
    let persistence = Arc::new(RecordingPersistence::default());
    let scheduler = TickSchedulerBuilder::new()
        .config(config)
        .world(world)
        .persistence(persistence.clone())
        .pending_handler(EchoPrompt)
        .seed(7)
        .build(
            Arc::clone(&transport),
            CommaParser {
                calls: Arc::clone(&parsed),
            },
            ScriptedExecutor {
                executed: Arc::clone(&executed),
            },
        )
        .expect("scheduler should build");
    Harness {
        scheduler,
        transport,
        parsed,
        executed,
        persistence,
    }
}

fn harness() -> Harness {
    harness_with(world(), sure_hits())
}

impl Harness {
    async fn join(&mut self, name: &str) -> SessionId {
        let id = self.scheduler.open();
        self.scheduler
            .login(id, Player::new(name, RoomId::new("hall")))
            .await
            .unwrap();
        id
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn parsed(&self) -> Vec<String> {
        self.parsed.lock().unwrap().clone()
    }

    fn session(&self, id: SessionId) -> &Session {
        self.scheduler.context().sessions.get(id).unwrap()
    }
}

fn name(s: &str) -> PlayerName {
    PlayerName::new(s)
}

// =========================================================================
// Draining
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_tick_once_session_with_empty_queue_is_untouched() {
    let mut h = harness();
    let busy = h.join("Ann").await;
    let idle = h.join("Bob").await;
    h.transport.clear();
    h.scheduler.enqueue(busy, "look").unwrap();

    h.scheduler.tick_once().await.unwrap();

    assert!(h.transport.frames_for(idle).is_empty());
    assert_eq!(h.transport.texts_for(busy), vec!["look", "ok look"]);
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_pops_one_command_per_session() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    let bob = h.join("Bob").await;
    h.scheduler.enqueue(ann, "one").unwrap();
    h.scheduler.enqueue(ann, "two").unwrap();
    h.scheduler.enqueue(bob, "three").unwrap();

    h.scheduler.tick_once().await.unwrap();

    assert_eq!(h.executed(), vec!["one", "three"]);
    assert_eq!(h.session(ann).queue, ["two"]);
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_reply_then_stats_refresh() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    h.transport.clear();
    h.scheduler.enqueue(ann, "look").unwrap();

    h.scheduler.tick_once().await.unwrap();

    let frames = h.transport.frames_for(ann);
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0], Frame::Text("look".into()));
    assert_eq!(frames[1], Frame::Text("ok look".into()));
    assert!(matches!(&frames[2], Frame::Stats(s) if s.name == name("Ann")));
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_chained_line_echoes_once_and_requeues_rest() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    h.transport.clear();
    h.scheduler.enqueue(ann, "look, inventory").unwrap();
    h.scheduler.enqueue(ann, "score").unwrap();

    h.scheduler.tick_once().await.unwrap();

    assert_eq!(h.transport.texts_for(ann), vec!["look, inventory", "ok look"]);
    assert_eq!(h.executed(), vec!["look"]);
    assert_eq!(h.session(ann).queue, ["inventory", "score"]);
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_unparseable_line_says_huh() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    h.transport.clear();
    h.scheduler.enqueue(ann, "???").unwrap();

    h.scheduler.tick_once().await.unwrap();

    assert_eq!(h.transport.texts_for(ann), vec!["Huh? I didn't understand that."]);
    assert!(h.executed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_failed_command_reports_and_loop_continues() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    let bob = h.join("Bob").await;
    h.transport.clear();
    h.scheduler.enqueue(ann, "fail").unwrap();
    h.scheduler.enqueue(bob, "look").unwrap();

    h.scheduler.tick_once().await.unwrap();

    assert_eq!(
        h.transport.texts_for(ann),
        vec!["fail", "Error processing command: room void not found"]
    );
    assert_eq!(h.transport.texts_for(bob), vec!["look", "ok look"]);
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_refused_command_is_plain_text() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    h.transport.clear();
    h.scheduler.enqueue(ann, "refuse").unwrap();

    h.scheduler.tick_once().await.unwrap();

    assert_eq!(
        h.transport.texts_for(ann),
        vec!["refuse", "You can't do that here."]
    );
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_panicking_command_is_contained() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    let bob = h.join("Bob").await;
    h.transport.clear();
    h.scheduler.enqueue(ann, "boom").unwrap();
    h.scheduler.enqueue(ann, "look").unwrap();
    h.scheduler.enqueue(bob, "look").unwrap();

    h.scheduler.tick_once().await.unwrap();

    assert_eq!(
        h.transport.texts_for(ann),
        vec!["boom", "Error processing command: internal error"]
    );
    assert_eq!(h.transport.texts_for(bob), vec!["look", "ok look"]);

    h.scheduler.tick_once().await.unwrap();

    assert_eq!(h.executed(), vec!["boom", "look", "look"]);
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_executor_notices_reach_room() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    let bob = h.join("Bob").await;
    h.transport.clear();
    h.scheduler.enqueue(ann, "wave").unwrap();

    h.scheduler.tick_once().await.unwrap();

    assert_eq!(h.transport.texts_for(bob), vec!["Ann waves."]);
    assert_eq!(h.transport.texts_for(ann), vec!["wave"]);
}

// =========================================================================
// Sleep, converse, prompts
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_tick_once_sleeping_player_is_told_they_are_asleep() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    h.scheduler
        .context_mut()
        .sessions
        .get_mut(ann)
        .unwrap()
        .fall_asleep();
    h.transport.clear();
    h.scheduler.enqueue(ann, "look").unwrap();

    h.scheduler.tick_once().await.unwrap();

    assert_eq!(h.transport.texts_for(ann), vec!["You are asleep."]);
    assert!(h.parsed().is_empty());
    assert!(h.executed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_sleeping_player_may_wake() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    h.scheduler
        .context_mut()
        .sessions
        .get_mut(ann)
        .unwrap()
        .fall_asleep();
    h.scheduler.enqueue(ann, "wake").unwrap();

    h.scheduler.tick_once().await.unwrap();

    assert_eq!(h.executed(), vec!["wake"]);
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_converse_mode_turns_lines_into_say() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    h.scheduler.enqueue(ann, "converse").unwrap();
    h.scheduler.enqueue(ann, "hello").unwrap();

    h.scheduler.tick_once().await.unwrap();
    h.scheduler.tick_once().await.unwrap();

    assert_eq!(h.parsed(), vec!["converse", "say hello"]);
    assert_eq!(h.executed(), vec!["converse", "say hello"]);
    assert!(h.session(ann).flags.converse_mode);
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_converse_sentinel_turns_mode_off() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    h.scheduler
        .context_mut()
        .sessions
        .get_mut(ann)
        .unwrap()
        .flags
        .converse_mode = true;
    h.transport.clear();
    h.scheduler.enqueue(ann, "*anything").unwrap();

    h.scheduler.tick_once().await.unwrap();

    assert_eq!(h.transport.texts_for(ann), vec!["Converse mode OFF."]);
    assert!(!h.session(ann).flags.converse_mode);
    assert!(h.executed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_pending_prompt_gets_raw_line() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    h.scheduler.enqueue(ann, "shout").unwrap();
    h.scheduler.enqueue(ann, "look, no parsing").unwrap();

    h.scheduler.tick_once().await.unwrap();
    h.transport.clear();
    h.scheduler.tick_once().await.unwrap();

    assert_eq!(h.transport.texts_for(ann), vec!["You shout: look, no parsing"]);
    assert_eq!(h.parsed(), vec!["shout"]);
    assert!(h.session(ann).flags.pending_comm.is_none());
}

// =========================================================================
// Quit and disconnect
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_tick_once_quit_tears_session_down_in_same_tick() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    let bob = h.join("Bob").await;
    h.transport.clear();
    h.scheduler.enqueue(ann, "quit").unwrap();

    h.scheduler.tick_once().await.unwrap();

    let frames = h.transport.frames_for(ann);
    assert_eq!(frames[0], Frame::Text("quit".into()));
    assert_eq!(frames[1], Frame::Text("Goodbye.".into()));
    assert_eq!(frames.last(), Some(&Frame::Disconnect));
    assert!(h.scheduler.context().sessions.get(ann).is_none());
    assert!(h.scheduler.context().world.player(&name("Ann")).is_none());
    assert_eq!(h.transport.texts_for(bob), vec!["Ann has left the game."]);
    assert_eq!(*h.persistence.players.lock().unwrap(), vec![name("Ann")]);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_mid_fight_ends_the_pairing() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    let ctx = h.scheduler.context_mut();
    let rat = ctx
        .mobs
        .spawn(&mut ctx.world, "rat", &RoomId::new("hall"), &mut ctx.rng)
        .unwrap();
    h.scheduler.enqueue(ann, "attack rat").unwrap();
    h.scheduler.tick_once().await.unwrap();
    assert!(h.scheduler.context().combat.is_in_combat(&CombatantId::Mob(rat.clone())));

    h.scheduler.disconnect(ann).await.unwrap();

    let ctx = h.scheduler.context();
    assert!(ctx.combat.is_empty());
    assert!(ctx.world.mob(&rat).unwrap().target.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_unknown_session_is_an_error() {
    let mut h = harness();

    let err = h.scheduler.disconnect(SessionId(99)).await.unwrap_err();

    assert!(matches!(err, MudforgeError::Session(_)));
}

#[tokio::test(start_paused = true)]
async fn test_login_refused_leaves_world_untouched() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    let other = h.scheduler.open();

    let relog = h
        .scheduler
        .login(ann, Player::new("Zed", RoomId::new("hall")))
        .await;
    let shadow = h
        .scheduler
        .login(other, Player::new("ANN", RoomId::new("hall")))
        .await;

    assert!(matches!(
        relog,
        Err(MudforgeError::Session(SessionError::AlreadyLoggedIn(_)))
    ));
    assert!(matches!(shadow, Err(MudforgeError::Session(_))));
    let world = &h.scheduler.context().world;
    assert!(world.player(&name("Zed")).is_none());
    assert!(world.player(&name("ANN")).is_none());
    assert_eq!(h.session(ann).player, Some(name("Ann")));
}

#[tokio::test(start_paused = true)]
async fn test_login_missing_room_starts_in_spawn() {
    let mut h = harness();
    let id = h.scheduler.open();

    h.scheduler
        .login(id, Player::new("Ann", RoomId::new("nowhere")))
        .await
        .unwrap();

    let player = h.scheduler.context().world.player(&name("Ann")).unwrap();
    assert_eq!(player.current_room, RoomId::new("spawn"));
}

// =========================================================================
// Combat and mobs
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_tick_once_combat_waits_for_cadence() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    let ctx = h.scheduler.context_mut();
    let rat = ctx
        .mobs
        .spawn(&mut ctx.world, "rat", &RoomId::new("hall"), &mut ctx.rng)
        .unwrap();
    h.scheduler.enqueue(ann, "attack rat").unwrap();

    h.scheduler.tick_once().await.unwrap();
    assert_eq!(h.scheduler.context().world.mob(&rat).unwrap().stamina, 1000);

    tokio::time::advance(Duration::from_secs(3)).await;
    h.scheduler.tick_once().await.unwrap();

    // Strength 45 / 10 = 4 per landed blow.
    assert_eq!(h.scheduler.context().world.mob(&rat).unwrap().stamina, 996);
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_attack_while_fighting_reports_already_fighting() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    let ctx = h.scheduler.context_mut();
    for _ in 0..2 {
        ctx.mobs
            .spawn(&mut ctx.world, "rat", &RoomId::new("hall"), &mut ctx.rng)
            .unwrap();
    }
    h.scheduler.enqueue(ann, "attack rat").unwrap();
    h.scheduler.enqueue(ann, "attack rat").unwrap();
    h.scheduler.tick_once().await.unwrap();
    h.transport.clear();

    h.scheduler.tick_once().await.unwrap();

    assert_eq!(
        h.transport.texts_for(ann),
        vec!["attack rat", "You're already fighting Rat!"]
    );
    assert_eq!(h.scheduler.context().combat.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_aggressive_mob_skips_invisible_player() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    h.scheduler
        .context_mut()
        .sessions
        .get_mut(ann)
        .unwrap()
        .grant_invisibility();
    let ctx = h.scheduler.context_mut();
    ctx.mobs
        .spawn(&mut ctx.world, "wolf", &RoomId::new("hall"), &mut ctx.rng)
        .unwrap();

    h.scheduler.tick_once().await.unwrap();
    assert!(h.scheduler.context().combat.is_empty());

    h.scheduler
        .context_mut()
        .sessions
        .get_mut(ann)
        .unwrap()
        .break_invisibility();
    h.transport.clear();
    h.scheduler.tick_once().await.unwrap();

    assert_eq!(h.scheduler.context().combat.len(), 1);
    assert_eq!(h.transport.texts_for(ann), vec!["Wolf attacks you by surprise!"]);
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_ambushed_sleeper_wakes_and_stops_healing() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    let bob = h.join("Bob").await;
    let ctx = h.scheduler.context_mut();
    ctx.world.player_mut(&name("Ann")).unwrap().stamina = 10;
    ctx.sessions.get_mut(ann).unwrap().fall_asleep();
    // Leaves Ann as the wolf's only choice.
    ctx.sessions.get_mut(bob).unwrap().grant_invisibility();
    ctx.mobs
        .spawn(&mut ctx.world, "wolf", &RoomId::new("hall"), &mut ctx.rng)
        .unwrap();
    h.transport.clear();

    h.scheduler.tick_once().await.unwrap();

    assert!(
        h.scheduler
            .context()
            .combat
            .is_in_combat(&CombatantId::Player(name("Ann")))
    );
    assert!(!h.session(ann).flags.sleeping);
    assert_eq!(
        h.transport.texts_for(ann),
        vec!["Wolf attacks you by surprise!", "You are startled awake!"]
    );
    assert_eq!(
        h.transport.texts_for(bob),
        vec!["Wolf attacks Ann!", "Ann has woken up."]
    );
    assert_eq!(h.scheduler.context().world.player(&name("Ann")).unwrap().stamina, 10);

    h.transport.clear();
    h.scheduler.enqueue(ann, "look").unwrap();
    h.scheduler.tick_once().await.unwrap();

    assert_eq!(h.transport.texts_for(ann), vec!["look", "ok look"]);
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_attack_on_sleeper_wakes_them() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    let bob = h.join("Bob").await;
    h.scheduler
        .context_mut()
        .sessions
        .get_mut(bob)
        .unwrap()
        .fall_asleep();
    h.transport.clear();
    h.scheduler.enqueue(ann, "duel Bob").unwrap();

    h.scheduler.tick_once().await.unwrap();

    assert!(!h.session(bob).flags.sleeping);
    assert_eq!(h.transport.texts_for(bob), vec!["You are startled awake!"]);
    assert_eq!(
        h.transport.texts_for(ann),
        vec!["duel Bob", "En garde!", "Bob has woken up."]
    );
}

#[tokio::test(start_paused = true)]
async fn test_tick_once_panicking_phase_returns_err_and_serves_sessions() {
    let mut world = world();
    world.add_template(
        "mouse",
        MobTemplate {
            max_stamina: 1,
            ..MobTemplate::named("mouse")
        },
    );
    let transport = Arc::new(RecordingTransport::default());
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = TickSchedulerBuilder::new()
        .config(sure_hits())
        .world(world)
        .aftermath(PanickingAftermath)
        .build(
            Arc::clone(&transport),
            CommaParser {
                calls: Arc::default(),
            },
            ScriptedExecutor {
                executed: Arc::clone(&executed),
            },
        )
        .unwrap();
    let ann = scheduler.open();
    scheduler
        .login(ann, Player::new("Ann", RoomId::new("hall")))
        .await
        .unwrap();
    let ctx = scheduler.context_mut();
    ctx.mobs
        .spawn(&mut ctx.world, "mouse", &RoomId::new("hall"), &mut ctx.rng)
        .unwrap();
    scheduler.enqueue(ann, "attack mouse").unwrap();
    scheduler.enqueue(ann, "look").unwrap();
    scheduler.tick_once().await.unwrap();

    tokio::time::advance(Duration::from_secs(3)).await;
    let err = scheduler.tick_once().await.unwrap_err();

    assert!(matches!(err, MudforgeError::Panicked { phase: "combat", .. }));
    assert_eq!(executed.lock().unwrap().clone(), vec!["attack mouse", "look"]);
}

// =========================================================================
// Run loop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_run_until_ticks_on_interval_and_stops() {
    let mut h = harness();
    let ann = h.join("Ann").await;
    for cmd in ["a", "b", "c", "d", "e"] {
        h.scheduler.enqueue(ann, cmd).unwrap();
    }
    let (stop_tx, stop_rx) = watch::channel(false);

    tokio::join!(h.scheduler.run_until(stop_rx), async {
        tokio::time::sleep(Duration::from_millis(1_600)).await;
        stop_tx.send(true).unwrap();
    });

    assert_eq!(h.scheduler.clock().tick_count(), 3);
    assert_eq!(h.executed(), vec!["a", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn test_run_until_failed_tick_retries_and_keeps_going() {
    let mut world = world();
    world.add_template(
        "mouse",
        MobTemplate {
            max_stamina: 1,
            ..MobTemplate::named("mouse")
        },
    );
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = TickSchedulerBuilder::new()
        .config(sure_hits())
        .world(world)
        .aftermath(PanickingAftermath)
        .build(
            Arc::new(RecordingTransport::default()),
            CommaParser {
                calls: Arc::default(),
            },
            ScriptedExecutor {
                executed: Arc::clone(&executed),
            },
        )
        .unwrap();
    let ann = scheduler.open();
    scheduler
        .login(ann, Player::new("Ann", RoomId::new("hall")))
        .await
        .unwrap();
    let ctx = scheduler.context_mut();
    ctx.mobs
        .spawn(&mut ctx.world, "mouse", &RoomId::new("hall"), &mut ctx.rng)
        .unwrap();
    for cmd in ["attack mouse", "a", "b", "c", "d", "e", "f", "g", "h"] {
        scheduler.enqueue(ann, cmd).unwrap();
    }
    let (stop_tx, stop_rx) = watch::channel(false);

    tokio::join!(scheduler.run_until(stop_rx), async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        stop_tx.send(true).unwrap();
    });

    assert_eq!(executed.lock().unwrap().last().map(String::as_str), Some("h"));
}

#[tokio::test(start_paused = true)]
async fn test_build_without_spawn_room_fails() {
    let config = SchedulerConfig {
        spawn_room: RoomId::new("limbo"),
        ..Default::default()
    };

    let result = TickSchedulerBuilder::new().config(config).world(world()).build(
        Arc::new(RecordingTransport::default()),
        CommaParser {
            calls: Arc::default(),
        },
        ScriptedExecutor {
            executed: Arc::default(),
        },
    );

    assert!(matches!(result, Err(MudforgeError::World(WorldError::UnknownRoom(_)))));
}
