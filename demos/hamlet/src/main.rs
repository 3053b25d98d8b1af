use std::time::Duration;

use mudforge::prelude::*;
use mudforge::telemetry;
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

const TEMPLATES: &str = r#"{
    "goblin": {
        "name": "goblin",
        "description": "A scrawny goblin eyes your purse.",
        "strength": 30,
        "max_stamina": 30,
        "damage": 3,
        "aggressive": true,
        "aggro_delay_min": 2,
        "aggro_delay_max": 4,
        "point_value": 25,
        "loot_table": [
            { "item": { "id": "dagger", "name": "rusty dagger", "damage": 2 }, "chance": 0.5 }
        ]
    },
    "rat": {
        "name": "rat",
        "max_stamina": 3,
        "patrol_rooms": ["square", "lane"],
        "movement_interval": 4,
        "point_value": 5
    }
}"#;

const CONFIG: &str = r#"{
    "tick": { "tick_interval_ms": 250, "combat_interval_ms": 1000 },
    "spawn_room": "square"
}"#;

fn build_world() -> Result<World, WorldError> {
    let mut world = World::new();
    world.add_room(
        Room::new("square", "Village Square")
            .with_description("A muddy square. A lane runs east.")
            .with_exit("east", "lane"),
    );
    world.add_room(
        Room::new("lane", "Cobbled Lane")
            .with_description("The lane ends at a crooked gate.")
            .with_exit("west", "square"),
    );
    world.add_templates(load_templates(TEMPLATES)?);
    Ok(world)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Comma-chained `verb rest-of-line` commands.
struct HamletParser;

impl CommandParser for HamletParser {
    fn parse(&self, text: &str, _ctx: &ParseContext<'_>) -> Vec<CommandRecord> {
        text.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once(' ') {
                Some((verb, rest)) => {
                    CommandRecord::new(verb.to_lowercase(), part).with_subject(rest.trim())
                }
                None => CommandRecord::new(part.to_lowercase(), part),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

struct HamletExecutor;

impl HamletExecutor {
    fn look(env: &ExecEnv<'_>, me: &PlayerName) -> Result<ExecOutcome, CommandError> {
        let world = &env.ctx.world;
        let player = world.player(me).ok_or(CommandError::NotLoggedIn)?;
        let room = world
            .room(&player.current_room)
            .ok_or_else(|| WorldError::UnknownRoom(player.current_room.clone()))?;

        let mut lines = vec![room.render()];
        lines.extend(
            world
                .mobs_in_room(&room.id)
                .into_iter()
                .filter(|m| m.is_alive())
                .map(|m| m.description.clone()),
        );
        lines.extend(
            world
                .players_in_room(&room.id)
                .filter(|p| &p.name != me)
                .map(|p| format!("{} is here.", p.name)),
        );
        Ok(ExecOutcome::Reply(lines.join("\n")))
    }

    fn say(
        env: &mut ExecEnv<'_>,
        me: &PlayerName,
        text: Option<&str>,
    ) -> Result<ExecOutcome, CommandError> {
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            return Err(CommandError::Rejected("Say what?".into()));
        };
        let room = env
            .ctx
            .world
            .player(me)
            .map(|p| p.current_room.clone())
            .ok_or(CommandError::NotLoggedIn)?;
        env.emit(Outbound::to_room_except(
            &room,
            vec![me.clone()],
            format!("{me} says \"{text}\""),
        ));
        Ok(ExecOutcome::Reply(format!("You say \"{text}\"")))
    }

    fn attack(
        env: &mut ExecEnv<'_>,
        me: &PlayerName,
        target: Option<&str>,
    ) -> Result<ExecOutcome, CommandError> {
        let target = target.unwrap_or_default();
        let now = env.now;
        let ctx = &mut *env.ctx;
        let player = ctx.world.player(me).ok_or(CommandError::NotLoggedIn)?;
        let weapon = player.equipped.clone();
        let mob = ctx
            .world
            .mobs_in_room(&player.current_room)
            .into_iter()
            .find(|m| m.is_alive() && m.name.eq_ignore_ascii_case(target))
            .map(|m| (m.id.clone(), m.capitalized_name()))
            .ok_or_else(|| CommandError::NoSuchTarget(target.to_string()))?;

        ctx.combat.engage(
            &mut ctx.world,
            CombatantId::Player(me.clone()),
            CombatantId::Mob(mob.0),
            weapon,
            true,
            now,
        )?;
        Ok(ExecOutcome::Reply(format!("You attack {}!", mob.1)))
    }

    fn sleep(env: &mut ExecEnv<'_>, me: &PlayerName) -> Result<ExecOutcome, CommandError> {
        if env.ctx.combat.is_in_combat(&CombatantId::Player(me.clone())) {
            return Err(CommandError::Rejected("You can't sleep while fighting!".into()));
        }
        let session = env
            .ctx
            .sessions
            .get_mut(env.session)
            .ok_or(CommandError::NotLoggedIn)?;
        session.fall_asleep();
        Ok(ExecOutcome::Reply("You lie down and fall asleep.".into()))
    }

    fn wake(env: &mut ExecEnv<'_>) -> Result<ExecOutcome, CommandError> {
        let session = env
            .ctx
            .sessions
            .get_mut(env.session)
            .ok_or(CommandError::NotLoggedIn)?;
        let reply = if session.wake() {
            "You wake up."
        } else {
            "You're already awake."
        };
        Ok(ExecOutcome::Reply(reply.into()))
    }

    fn converse(env: &mut ExecEnv<'_>) -> Result<ExecOutcome, CommandError> {
        let session = env
            .ctx
            .sessions
            .get_mut(env.session)
            .ok_or(CommandError::NotLoggedIn)?;
        session.flags.converse_mode = true;
        Ok(ExecOutcome::Reply(
            "Converse mode ON. Start a line with * to leave.".into(),
        ))
    }
}

impl CommandExecutor for HamletExecutor {
    fn execute(
        &self,
        command: &CommandRecord,
        mut env: ExecEnv<'_>,
    ) -> Result<ExecOutcome, CommandError> {
        let me = env.player_name()?;
        let subject = command.subject.as_deref();
        match command.verb.as_str() {
            "look" | "l" => Self::look(&env, &me),
            "say" => Self::say(&mut env, &me, subject),
            "attack" | "kill" => Self::attack(&mut env, &me, subject),
            "sleep" => Self::sleep(&mut env, &me),
            "wake" | "awake" => Self::wake(&mut env),
            "converse" => Self::converse(&mut env),
            "quit" => Ok(ExecOutcome::Quit("Farewell, traveller.".into())),
            other => Err(CommandError::Rejected(format!("Nobody here knows how to {other}."))),
        }
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// Prints every frame a session receives, prefixed with the player's name.
fn print_frames(
    transport: Arc<ChannelTransport>,
    who: &'static str,
    mut frames: FrameReceiver,
) {
    tokio::spawn(async move {
        while let Some(bytes) = frames.recv().await {
            match transport.decode_frame(&bytes) {
                Ok(OutboundFrame::Text { text }) => {
                    for line in text.lines() {
                        println!("[{who}] {line}");
                    }
                }
                Ok(OutboundFrame::Stats { stats }) => {
                    let json = serde_json::to_string(&stats).unwrap_or_default();
                    tracing::debug!(player = who, %json, "stats");
                }
                Ok(OutboundFrame::Disconnect { reason }) => {
                    println!("[{who}] -- disconnected ({reason})");
                    break;
                }
                Err(err) => tracing::warn!(player = who, error = %err, "bad frame"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing("info");

    let transport = Arc::new(ChannelTransport::new());
    let mut scheduler = TickSchedulerBuilder::new()
        .config(SchedulerConfig::from_json(CONFIG)?)
        .world(build_world()?)
        .seed(42)
        .build(Arc::clone(&transport), HamletParser, HamletExecutor)?;

    {
        let ctx = scheduler.context_mut();
        for (template, room) in [("goblin", "lane"), ("rat", "square")] {
            ctx.mobs
                .spawn(&mut ctx.world, template, &RoomId::new(room), &mut ctx.rng)?;
        }
    }

    let ada = scheduler.open();
    let bram = scheduler.open();
    print_frames(Arc::clone(&transport), "Ada", transport.attach(ada).await);
    print_frames(Arc::clone(&transport), "Bram", transport.attach(bram).await);

    let mut ada_player = Player::new("Ada", RoomId::new("square"));
    let sword = Item::new("sword", "short sword").with_damage(3);
    ada_player.equipped = sword.as_weapon();
    ada_player.inventory.push(sword);
    scheduler.login(ada, ada_player).await?;
    scheduler
        .login(bram, Player::new("Bram", RoomId::new("square")))
        .await?;

    for line in ["look", "say Morning, Bram", "attack rat", "look"] {
        scheduler.enqueue(ada, line)?;
    }
    for line in ["converse", "morning!", "lovely mud today", "*", "sleep", "look", "wake"] {
        scheduler.enqueue(bram, line)?;
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(8)).await;
        let _ = stop_tx.send(true);
    });
    scheduler.run_until(stop_rx).await;

    scheduler.enqueue(ada, "quit")?;
    scheduler.enqueue(bram, "quit")?;
    scheduler.tick_once().await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
