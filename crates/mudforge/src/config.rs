//! Scheduler configuration.

use std::time::Duration;

use mudforge_combat::CombatPolicy;
use mudforge_protocol::RoomId;
use mudforge_tick::TickConfig;
use serde::{Deserialize, Serialize};

use crate::MudforgeError;

/// Everything the [`TickScheduler`](crate::TickScheduler) can be tuned
/// with. Every field has a default, so `{}` is a valid config:
///
/// ```
/// use mudforge::SchedulerConfig;
///
/// let config = SchedulerConfig::from_json(r#"{ "tick": { "tick_interval_ms": 250 } }"#).unwrap();
/// assert_eq!(config.tick.tick_interval_ms, 250);
/// assert_eq!(config.tick.combat_interval_ms, 3000);
/// assert_eq!(config.wake_words, ["wake", "awake"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick: TickConfig,
    pub combat: CombatPolicy,
    /// Prefixes that leave converse mode.
    pub converse_exit: Vec<String>,
    /// Verbs a sleeping player may still use.
    pub wake_words: Vec<String>,
    /// Ticks between heals while asleep.
    pub sleep_heal_interval: u32,
    /// Pause after a failed tick before the loop carries on.
    pub error_retry_delay_ms: u64,
    /// Where defeated players wake up.
    pub spawn_room: RoomId,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick: TickConfig::default(),
            combat: CombatPolicy::default(),
            converse_exit: vec!["*".into(), ">".into()],
            wake_words: vec!["wake".into(), "awake".into()],
            sleep_heal_interval: 2,
            error_retry_delay_ms: 1_000,
            spawn_room: RoomId::new("spawn"),
        }
    }
}

impl SchedulerConfig {
    /// Parses a JSON config, filling anything missing with defaults.
    ///
    /// # Errors
    /// Returns [`MudforgeError::Config`] on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, MudforgeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns `true` if `verb` may be used while asleep.
    pub fn is_wake_word(&self, verb: &str) -> bool {
        let verb = verb.trim();
        self.wake_words.iter().any(|w| w.eq_ignore_ascii_case(verb))
    }

    /// Returns `true` if `text` leaves converse mode.
    pub fn exits_converse(&self, text: &str) -> bool {
        self.converse_exit
            .iter()
            .any(|prefix| !prefix.is_empty() && text.starts_with(prefix.as_str()))
    }

    pub fn error_retry_delay(&self) -> Duration {
        Duration::from_millis(self.error_retry_delay_ms)
    }
}
