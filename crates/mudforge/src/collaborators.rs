//! The pluggable pieces the scheduler drives but doesn't implement.
//!
//! A game supplies a [`CommandParser`] (text → [`CommandRecord`]s), a
//! [`CommandExecutor`] (records → game effects) and optionally a
//! [`PendingCommHandler`] for multi-step prompts. All three run
//! synchronously inside the tick with exclusive access to the
//! [`GameContext`], the same way room logic runs inside its actor.

use mudforge_protocol::{
    CombatantId, CommandRecord, ExecOutcome, Outbound, PlayerName, SessionId,
};
use mudforge_session::PendingComm;
use mudforge_world::{Player, Room};
use tokio::time::Instant;

use crate::{CommandError, GameContext};

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// What a parser may look at while resolving a line.
pub struct ParseContext<'a> {
    pub session: SessionId,
    /// The issuing player, if logged in.
    pub player: Option<&'a Player>,
    /// The room the player stands in.
    pub room: Option<&'a Room>,
    /// Other players in the same room, in name order.
    pub players_in_room: Vec<&'a PlayerName>,
}

impl<'a> ParseContext<'a> {
    pub(crate) fn build(ctx: &'a GameContext, session: SessionId) -> Self {
        let player = ctx
            .sessions
            .get(session)
            .and_then(|s| s.player.as_ref())
            .and_then(|name| ctx.world.player(name));
        let room = player.and_then(|p| ctx.world.room(&p.current_room));
        let players_in_room = match player {
            Some(me) => ctx
                .world
                .players_in_room(&me.current_room)
                .filter(|p| p.name != me.name)
                .map(|p| &p.name)
                .collect(),
            None => Vec::new(),
        };
        Self {
            session,
            player,
            room,
            players_in_room,
        }
    }
}

/// Turns one line of player input into zero or more commands.
///
/// Zero commands means "didn't understand". More than one means the line
/// was a chain (`"look, inventory"`); the scheduler runs the first and
/// queues the rest.
pub trait CommandParser: Send + Sync + 'static {
    fn parse(&self, text: &str, ctx: &ParseContext<'_>) -> Vec<CommandRecord>;
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Everything a handler gets to work with for one command.
pub struct ExecEnv<'a> {
    pub ctx: &'a mut GameContext,
    pub session: SessionId,
    pub now: Instant,
    outbox: &'a mut Vec<Outbound>,
}

impl<'a> ExecEnv<'a> {
    pub fn new(
        ctx: &'a mut GameContext,
        session: SessionId,
        now: Instant,
        outbox: &'a mut Vec<Outbound>,
    ) -> Self {
        Self {
            ctx,
            session,
            now,
            outbox,
        }
    }

    /// The issuing player's name.
    ///
    /// # Errors
    /// [`CommandError::NotLoggedIn`] if the session has no player.
    pub fn player_name(&self) -> Result<PlayerName, CommandError> {
        self.ctx
            .sessions
            .get(self.session)
            .and_then(|s| s.player.clone())
            .ok_or(CommandError::NotLoggedIn)
    }

    /// The issuing player's combat identity.
    pub fn combatant(&self) -> Result<CombatantId, CommandError> {
        self.player_name().map(CombatantId::Player)
    }

    /// Queues a notice; the scheduler sends it after the handler returns.
    pub fn emit(&mut self, notice: Outbound) {
        self.outbox.push(notice);
    }
}

/// Runs a parsed command against the game.
///
/// A refusal `Err` reaches the player as plain text. Any other `Err` is
/// logged and reported as `"Error processing command: <err>"`, and so is a
/// panic. None of them stop the tick.
pub trait CommandExecutor: Send + Sync + 'static {
    fn execute(
        &self,
        command: &CommandRecord,
        env: ExecEnv<'_>,
    ) -> Result<ExecOutcome, CommandError>;
}

// ---------------------------------------------------------------------------
// Multi-step prompts
// ---------------------------------------------------------------------------

/// The result of feeding one line to a pending prompt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingResolution {
    /// Shown to the player, if any.
    pub reply: Option<String>,
    /// The prompt to keep waiting on, or `None` when it's finished.
    pub next: Option<PendingComm>,
}

impl PendingResolution {
    /// The prompt is finished; say `reply`.
    pub fn done(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            next: None,
        }
    }

    /// Say `reply` and keep waiting on `next`.
    pub fn continue_with(reply: impl Into<String>, next: PendingComm) -> Self {
        Self {
            reply: Some(reply.into()),
            next: Some(next),
        }
    }
}

/// Consumes raw lines while a session has a [`PendingComm`].
pub trait PendingCommHandler: Send + Sync + 'static {
    fn handle(&self, pending: PendingComm, text: &str, env: ExecEnv<'_>) -> PendingResolution;
}

/// Default handler for games with no prompts: drops the pending state.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardPending;

impl PendingCommHandler for DiscardPending {
    fn handle(&self, pending: PendingComm, _text: &str, env: ExecEnv<'_>) -> PendingResolution {
        tracing::debug!(session = %env.session, ?pending, "discarding pending prompt");
        PendingResolution::default()
    }
}
