//! # Mudforge
//!
//! Tick-driven game scheduler for text MUDs.
//!
//! Mudforge runs a whole game from one cooperative loop. A game supplies
//! a [`CommandParser`] and a [`CommandExecutor`]; the [`TickScheduler`]
//! handles sessions, pacing, combat rounds, mob AI and status effects,
//! and delivers every notice through a
//! [`Transport`](mudforge_transport::Transport).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mudforge::prelude::*;
//!
//! // Implement CommandParser and CommandExecutor for your game, then:
//! // let mut scheduler = TickSchedulerBuilder::new()
//! //     .world(world)
//! //     .build(Arc::new(ChannelTransport::new()), MyParser, MyExecutor)?;
//! // scheduler.run_forever().await;
//! ```

mod collaborators;
mod config;
mod context;
mod error;
mod scheduler;
pub mod status;
pub mod telemetry;

pub use collaborators::{
    CommandExecutor, CommandParser, DiscardPending, ExecEnv, ParseContext, PendingCommHandler,
    PendingResolution,
};
pub use config::SchedulerConfig;
pub use context::GameContext;
pub use error::{CommandError, MudforgeError};
pub use scheduler::{TickScheduler, TickSchedulerBuilder};

/// Everything a game needs, in one import.
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::{
        CommandError, CommandExecutor, CommandParser, DiscardPending, ExecEnv, GameContext,
        MudforgeError, ParseContext, PendingCommHandler, PendingResolution, SchedulerConfig,
        TickScheduler, TickSchedulerBuilder,
    };
    pub use mudforge_combat::{
        Aftermath, CombatCoordinator, CombatError, CombatPolicy, StandardAftermath,
    };
    pub use mudforge_mob::MobAIEngine;
    pub use mudforge_protocol::{
        CombatantId, CommandRecord, ExecOutcome, MobId, Outbound, OutboundFrame, PlayerName,
        Recipient, RoomId, SessionId, StatsSnapshot,
    };
    pub use mudforge_session::{AfflictionKind, PendingComm, Session, SessionError, SessionFlags};
    pub use mudforge_tick::{TickConfig, TickPolicy};
    pub use mudforge_transport::{ChannelTransport, FrameReceiver, Transport, TransportError};
    pub use mudforge_world::{
        Item, MobTemplate, NullPersistence, Persistence, Player, Room,
        World, WorldError, load_templates,
    };
}
