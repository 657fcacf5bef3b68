//! Sleeps and bounded polling.
//!
//! Every wait in a run is either a plain pause (optionally jittered by up to
//! 20%) or a [`poll_until`] loop with a fixed attempt ceiling. Nothing here
//! retries: an exhausted poll is reported to the caller as `None`.

use crate::Result;
use rand::Rng;
use std::time::Duration;

/// Attempt ceiling used for page-state waits
pub const DEFAULT_POLL_ATTEMPTS: u32 = 60;

/// Bounded polling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum number of probes before giving up
    pub attempts: u32,
    /// Sleep taken before each probe
    pub interval: Duration,
    /// Randomize each sleep by up to 20%
    pub jitter: bool,
}

impl PollPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts,
            interval,
            jitter: false,
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// One probe per second for `ceiling`, rounded up to whole seconds
    pub fn per_second(ceiling: Duration) -> Self {
        let secs = ceiling.as_secs() + u64::from(ceiling.subsec_nanos() > 0);
        Self::new(secs.max(1).min(u64::from(u32::MAX)) as u32, Duration::from_secs(1))
    }

    async fn wait(&self) {
        if self.jitter {
            pause_jittered(self.interval).await;
        } else {
            pause(self.interval).await;
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_ATTEMPTS, Duration::from_secs(1)).with_jitter(true)
    }
}

/// Run `probe` until it yields a value or the policy's attempts run out.
///
/// Sleeps one interval before every probe. Returns `Ok(None)` after exactly
/// `policy.attempts` probes without a hit; probe errors end the loop.
pub async fn poll_until<T, F>(policy: &PollPolicy, mut probe: F) -> Result<Option<T>>
where
    F: AsyncFnMut(u32) -> Result<Option<T>>,
{
    for attempt in 1..=policy.attempts {
        policy.wait().await;

        if let Some(value) = probe(attempt).await? {
            tracing::debug!("Poll satisfied on attempt {}/{}", attempt, policy.attempts);
            return Ok(Some(value));
        }
    }

    tracing::debug!("Poll exhausted after {} attempts", policy.attempts);
    Ok(None)
}

/// Fixed sleep
pub async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Sleep for a lightly randomized version of `base`
pub async fn pause_jittered(base: Duration) {
    pause(jittered(base)).await;
}

/// Shift `base` by a uniformly drawn 0 to 20%: shorter one time in three,
/// longer otherwise
pub fn jittered(base: Duration) -> Duration {
    if base.is_zero() {
        return base;
    }

    let mut rng = rand::thread_rng();
    let shift = base.mul_f64(rng.gen_range(0.0..=0.2));
    if rng.gen_bool(1.0 / 3.0) {
        base.saturating_sub(shift)
    } else {
        base + shift
    }
}
