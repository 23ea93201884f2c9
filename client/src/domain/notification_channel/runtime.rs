//! Default runtime helpers for reconnect scheduling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};

use super::{BackoffJitter, ReconnectSleeper};

/// Timing seams used by the reconnect loop.
pub struct ChannelRuntime {
    /// Async sleep implementation.
    pub sleeper: Arc<dyn ReconnectSleeper>,
    /// Jitter strategy for reconnect delays.
    pub jitter: Arc<dyn BackoffJitter>,
    /// Source of wall-clock time for jitter seeding.
    pub clock: Arc<dyn Clock>,
}

impl Default for ChannelRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(AttemptJitter),
            clock: Arc::new(DefaultClock),
        }
    }
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl ReconnectSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Adds up to a quarter of the base delay, seeded from the clock so that
/// clients dropped together do not reconnect in lockstep.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptJitter;

impl BackoffJitter for AttemptJitter {
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let max_extra = (base_ms / 4).max(1);
        let seed = u64::from(now.timestamp_subsec_nanos()) ^ u64::from(attempt);
        let extra = seed % max_extra.saturating_add(1);
        Duration::from_millis(base_ms.saturating_add(extra))
    }
}
