//! Fixed-interval tick pacing for Mudforge.
//!
//! The game runs on two clocks:
//!
//! - The **tick** (default 500 ms): every tick the scheduler drains one
//!   command per session, advances mob AI, and runs status sweeps.
//! - The **combat tick** (default 3 s): one exchange per active pairing.
//!
//! [`TickClock`] paces the first one against wall-clock time, with budget
//! monitoring and an overrun policy. [`CombatCadence`]
//! layers the slower combat pace on top without a second timer: each tick
//! asks it whether enough time has passed since the last combat round.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     let info = clock.wait_for_tick().await;
//!     let now = tokio::time::Instant::now();
//!     if cadence.is_due(now) {
//!         resolve_combat();
//!         cadence.mark(now);
//!     }
//!     run_everything_else(info.tick);
//!     clock.record_tick_end();
//! }
//! ```
//!
//! All instants are [`tokio::time::Instant`], so tests can run under a
//! paused runtime and drive the clock with `tokio::time::advance`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick fires late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickPolicy {
    /// Skip the missed tick(s) and resume from now.
    #[default]
    Skip,
    /// Run up to `max_catchup` late ticks back to back, then give up and
    /// resume from now.
    CatchUp { max_catchup: u32 },
    /// Ignore the overrun. The next tick fires at its originally
    /// scheduled time.
    Drop,
}

/// Tick timing configuration.
///
/// Deserializable so it can sit inside the scheduler's JSON config;
/// every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Milliseconds between ticks.
    pub tick_interval_ms: u64,
    /// Milliseconds between combat rounds.
    pub combat_interval_ms: u64,
    pub policy: TickPolicy,
    /// Fraction of the tick budget (0.0–1.0) above which a warning is
    /// logged.
    pub budget_warn_threshold: f64,
    /// Fraction of the tick budget (0.0–1.0) above which a critical
    /// warning is logged.
    pub budget_critical_threshold: f64,
    /// Track average and max tick time.
    pub metrics_enabled: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            combat_interval_ms: 3_000,
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
            budget_critical_threshold: 1.0,
            metrics_enabled: true,
        }
    }
}

impl TickConfig {
    /// Shortest tick the clock will run.
    pub const MIN_TICK_INTERVAL_MS: u64 = 10;

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickClock::new`]. Rules:
    /// - `tick_interval_ms` raised to at least [`Self::MIN_TICK_INTERVAL_MS`].
    /// - `combat_interval_ms` raised to at least one tick.
    /// - Thresholds clamped to `0.0..=1.0`, warn ≤ critical.
    pub fn validated(mut self) -> Self {
        if self.tick_interval_ms < Self::MIN_TICK_INTERVAL_MS {
            warn!(
                interval_ms = self.tick_interval_ms,
                min_ms = Self::MIN_TICK_INTERVAL_MS,
                "tick_interval_ms below minimum, raising"
            );
            self.tick_interval_ms = Self::MIN_TICK_INTERVAL_MS;
        }
        if self.combat_interval_ms < self.tick_interval_ms {
            self.combat_interval_ms = self.tick_interval_ms;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self.budget_critical_threshold = self.budget_critical_threshold.clamp(0.0, 1.0);
        if self.budget_warn_threshold > self.budget_critical_threshold {
            self.budget_warn_threshold = self.budget_critical_threshold;
        }
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn combat_interval(&self) -> Duration {
        Duration::from_millis(self.combat_interval_ms)
    }
}

// ---------------------------------------------------------------------------
// Tick info (returned to caller each tick)
// ---------------------------------------------------------------------------

/// Information about a tick, returned by [`TickClock::wait_for_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// When the tick actually fired.
    pub fired_at: Instant,
    /// `true` if this tick fired noticeably late.
    pub overrun: bool,
    /// How many ticks were skipped because of the overrun.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Runtime metrics for the tick clock.
///
/// Timing values refer to the work reported via
/// [`TickClock::record_tick_end`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Exponential moving average of tick work time (α = 0.1).
    pub avg_tick_time: Duration,
    pub max_tick_time: Duration,
    /// Last tick's work time as a fraction of the interval. >1.0 means
    /// the work took longer than a tick.
    pub budget_utilization: f64,
}

// ---------------------------------------------------------------------------
// TickClock
// ---------------------------------------------------------------------------

/// Fixed-interval tick clock.
pub struct TickClock {
    config: TickConfig,
    interval: Duration,
    tick_count: u64,
    next_tick: Instant,
    /// When the current tick's work started. Set by `wait_for_tick`,
    /// consumed by `record_tick_end`.
    tick_start: Option<Instant>,
    metrics: TickMetrics,
}

impl TickClock {
    /// Creates a clock whose first tick fires one interval from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let interval = config.tick_interval();

        debug!(
            interval_ms = config.tick_interval_ms,
            combat_interval_ms = config.combat_interval_ms,
            policy = ?config.policy,
            "tick clock created"
        );

        Self {
            config,
            interval,
            tick_count: 0,
            next_tick: Instant::now() + interval,
            tick_start: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Waits until the next tick is due.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let scheduled = self.next_tick;
        time::sleep_until(scheduled).await;

        let now = Instant::now();
        self.tick_count += 1;
        self.tick_start = Some(now);

        let late_by = now.saturating_duration_since(scheduled);
        let overrun = late_by > self.interval / 10;
        let behind = (late_by.as_nanos() / self.interval.as_nanos()) as u64;
        let mut ticks_skipped = 0u64;

        self.next_tick = match self.config.policy {
            TickPolicy::Skip => {
                if overrun && behind > 0 {
                    ticks_skipped = behind;
                    warn!(
                        tick = self.tick_count,
                        skipped = behind,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "tick overrun, skipping ahead"
                    );
                }
                now + self.interval
            }
            TickPolicy::CatchUp { max_catchup } => {
                let cap = u64::from(max_catchup);
                if overrun && behind > 0 {
                    ticks_skipped = behind.saturating_sub(cap);
                    warn!(
                        tick = self.tick_count,
                        behind,
                        catching_up = behind.min(cap),
                        skipping = ticks_skipped,
                        "tick overrun, catching up"
                    );
                }
                if behind <= cap {
                    scheduled + self.interval
                } else {
                    now + self.interval
                }
            }
            TickPolicy::Drop => {
                if overrun {
                    warn!(
                        tick = self.tick_count,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "tick overrun, keeping original schedule"
                    );
                }
                scheduled + self.interval
            }
        };

        if overrun {
            self.metrics.total_overruns += 1;
        }
        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_ticks += 1;

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            fired_at: now,
            overrun,
            ticks_skipped,
        }
    }

    /// Records that the work for the current tick has finished.
    ///
    /// Drives budget warnings and metrics. Calling it twice for the same
    /// tick is a no-op.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        let utilization = elapsed.as_secs_f64() / self.interval.as_secs_f64();
        self.metrics.budget_utilization = utilization;

        if utilization >= self.config.budget_critical_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = self.interval.as_secs_f64() * 1000.0,
                "CRITICAL: tick exceeded budget"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = self.interval.as_secs_f64() * 1000.0,
                "tick approaching budget limit"
            );
        }

        if self.config.metrics_enabled {
            if elapsed > self.metrics.max_tick_time {
                self.metrics.max_tick_time = elapsed;
            }
            let alpha = 0.1;
            let prev = self.metrics.avg_tick_time.as_secs_f64();
            let curr = elapsed.as_secs_f64();
            self.metrics.avg_tick_time =
                Duration::from_secs_f64(prev * (1.0 - alpha) + curr * alpha);
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn config(&self) -> &TickConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// CombatCadence
// ---------------------------------------------------------------------------

/// Decides which ticks also run a combat round.
///
/// Combat is due once at least `interval` has passed since the last round
/// (or since the cadence was created). The caller marks each round it
/// actually runs.
#[derive(Debug, Clone)]
pub struct CombatCadence {
    interval: Duration,
    last_round: Instant,
}

impl CombatCadence {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_round: now,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_round) >= self.interval
    }

    /// Records that a combat round ran at `now`.
    pub fn mark(&mut self, now: Instant) {
        self.last_round = now;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
