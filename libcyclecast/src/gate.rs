//! Posting cadence control
//!
//! Two mechanisms keep the publishing rhythm from looking mechanical:
//!
//! - [`IntervalGate`] refuses to post until a randomly drawn number of minutes
//!   has passed since the last publish (for schedulers that fire more often
//!   than posts should go out).
//! - [`StartupJitter`] delays a timer-triggered run by a random number of
//!   seconds (for schedulers that fire exactly at the desired cadence).
//!
//! Manual runs bypass both.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::posted_log::PostedLog;

pub const DEFAULT_MIN_INTERVAL_MINUTES: u32 = 107;
pub const DEFAULT_MAX_INTERVAL_MINUTES: u32 = 158;

/// Result of a gate check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    pub allowed: bool,
    /// Whole minutes until the drawn interval is reached; 0 when allowed
    pub minutes_remaining: i64,
}

impl GateDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            minutes_remaining: 0,
        }
    }

    pub fn wait(minutes_remaining: i64) -> Self {
        Self {
            allowed: false,
            minutes_remaining,
        }
    }
}

/// Minimum spacing between publishes, drawn from a closed range on every check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalGate {
    min_minutes: u32,
    max_minutes: u32,
}

impl Default for IntervalGate {
    fn default() -> Self {
        Self {
            min_minutes: DEFAULT_MIN_INTERVAL_MINUTES,
            max_minutes: DEFAULT_MAX_INTERVAL_MINUTES,
        }
    }
}

impl IntervalGate {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `min_minutes > max_minutes`.
    pub fn new(min_minutes: u32, max_minutes: u32) -> Result<Self> {
        if min_minutes > max_minutes {
            return Err(ConfigError::InvalidValue {
                field: "schedule.min_interval_minutes".to_string(),
                reason: format!(
                    "minimum ({}) must not exceed maximum ({})",
                    min_minutes, max_minutes
                ),
            }
            .into());
        }
        Ok(Self {
            min_minutes,
            max_minutes,
        })
    }

    pub fn min_minutes(&self) -> u32 {
        self.min_minutes
    }

    pub fn max_minutes(&self) -> u32 {
        self.max_minutes
    }

    /// Decide whether a post may go out at `now`.
    ///
    /// `bypass` is set for manual runs. The required interval is redrawn on
    /// every call.
    pub fn should_post_now<R: Rng + ?Sized>(
        &self,
        log: &PostedLog,
        bypass: bool,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> GateDecision {
        if bypass {
            return GateDecision::allow();
        }
        let Some(last) = log.last_post_time else {
            return GateDecision::allow();
        };

        let required = i64::from(rng.gen_range(self.min_minutes..=self.max_minutes));
        // A last post in the future (clock skew) counts as just posted
        let elapsed = (now - last).num_minutes().max(0);

        debug!(
            "Gate: {} min since last post, {} min required",
            elapsed, required
        );

        if elapsed >= required {
            GateDecision::allow()
        } else {
            GateDecision::wait(required - elapsed)
        }
    }
}

/// Random pre-run delay for timer-triggered runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartupJitter {
    max_seconds: u64,
}

impl StartupJitter {
    pub fn new(max_seconds: u64) -> Self {
        Self { max_seconds }
    }

    pub fn disabled() -> Self {
        Self { max_seconds: 0 }
    }

    pub fn max_seconds(&self) -> u64 {
        self.max_seconds
    }

    /// Delay to wait before this run; zero for manual runs
    pub fn draw<R: Rng + ?Sized>(&self, bypass: bool, rng: &mut R) -> Duration {
        if bypass || self.max_seconds == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs(rng.gen_range(0..=self.max_seconds))
    }
}
