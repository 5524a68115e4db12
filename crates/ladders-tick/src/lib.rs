//! Fixed-period tick scheduler for the Ladders table loop.
//!
//! The table polls every participant once per tick. The scheduler only
//! decides *when* a tick fires and warns when the work done inside one
//! eats too much of the period.
//!
//! ```ignore
//! let mut ticks = TickScheduler::with_rate(20);
//! loop {
//!     ticks.wait_for_tick().await;
//!     table.poll_once().await?;
//!     ticks.record_tick_end();
//! }
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

/// What to do when a tick fires late.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickPolicy {
    /// Forget the missed ticks and schedule the next one a full period from
    /// now.
    #[default]
    Skip,
    /// Keep the original cadence; the next tick is due one period after the
    /// late one was.
    Drop,
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Ticks per second, 1..=[`TickConfig::MAX_TICK_RATE_HZ`].
    pub tick_rate_hz: u32,
    pub policy: TickPolicy,
    /// Fraction of the period (0.0–1.0) after which a tick's work is
    /// reported as slow.
    pub budget_warn_threshold: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 20,
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
        }
    }
}

impl TickConfig {
    /// Fastest supported rate.
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values. Called by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        let clamped = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
        if clamped != self.tick_rate_hz {
            warn!(
                rate = self.tick_rate_hz,
                clamped, "tick_rate_hz out of range, clamping"
            );
            self.tick_rate_hz = clamped;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }

    /// Length of one tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// `true` if the tick fired more than 10% of a period late.
    pub overrun: bool,
    /// Whole periods lost to the overrun under [`TickPolicy::Skip`].
    pub ticks_skipped: u64,
}

/// Drives the table's poll loop.
pub struct TickScheduler {
    config: TickConfig,
    tick_duration: Duration,
    tick_count: u64,
    overruns: u64,
    next_tick: TokioInstant,
    tick_start: Option<Instant>,
}

impl TickScheduler {
    /// The first tick fires one period after creation.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();
        debug!(
            rate_hz = config.tick_rate_hz,
            period_ms = tick_duration.as_secs_f64() * 1000.0,
            policy = ?config.policy,
            "tick scheduler created"
        );
        Self {
            config,
            tick_duration,
            tick_count: 0,
            overruns: 0,
            next_tick: TokioInstant::now() + tick_duration,
            tick_start: None,
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Sleeps until the next tick is due.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let due = self.next_tick;
        time::sleep_until(due).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > self.tick_duration / 10;
        let mut ticks_skipped = 0;

        self.next_tick = match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped =
                        (late_by.as_nanos() / self.tick_duration.as_nanos()) as u64;
                    if ticks_skipped > 0 {
                        warn!(
                            tick = self.tick_count,
                            skipped = ticks_skipped,
                            late_ms = late_by.as_secs_f64() * 1000.0,
                            "tick overrun, skipping ahead"
                        );
                    }
                }
                now + self.tick_duration
            }
            TickPolicy::Drop => {
                if overrun {
                    warn!(
                        tick = self.tick_count,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "tick overrun, keeping cadence"
                    );
                }
                due + self.tick_duration
            }
        };

        if overrun {
            self.overruns += 1;
        }
        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Marks the end of the work done for the current tick.
    ///
    /// Returns the fraction of the period the work took, or `None` if no
    /// tick is in progress.
    pub fn record_tick_end(&mut self) -> Option<f64> {
        let start = self.tick_start.take()?;
        let elapsed = start.elapsed();
        let utilization = elapsed.as_secs_f64() / self.tick_duration.as_secs_f64();
        if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick work approaching its period"
            );
        }
        Some(utilization)
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Ticks that fired late so far.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}
