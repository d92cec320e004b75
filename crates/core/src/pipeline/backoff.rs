//! # Backoff Policy
//!
//! One policy object for everything rate-limit related: retries inside stage
//! agents (exponential backoff with jitter) and the fixed cooldown the
//! pipeline inserts between the Writer and Auditor stages.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default maximum attempts per stage call (first try included)
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default base delay between retries (doubles each attempt)
const DEFAULT_BASE_DELAY_MS: u64 = 2_000;
/// Default ceiling for a single retry delay
const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
/// Default jitter fraction applied to retry delays
const DEFAULT_JITTER: f64 = 0.2;
/// Default pause between the Writer and Auditor stages
const DEFAULT_COOLDOWN_MS: u64 = 6_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Fraction in 0.0..=1.0; each delay is scaled by a random factor in
    /// `1 ± jitter`
    pub jitter: f64,
    /// Fixed inter-stage pause protecting a shared rate limit
    pub cooldown_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter: DEFAULT_JITTER,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
        }
    }
}

impl BackoffPolicy {
    /// Policy without waiting, for tests and offline runs
    pub fn immediate() -> Self {
        Self {
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter: 0.0,
            cooldown_ms: 0,
            ..Self::default()
        }
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        let raw = self.base_delay_ms.saturating_mul(1u64 << exp);
        let capped = raw.min(self.max_delay_ms) as f64;

        let jitter = self.jitter.clamp(0.0, 1.0);
        let scaled = if jitter > 0.0 {
            capped * rand::rng().random_range((1.0 - jitter)..=(1.0 + jitter))
        } else {
            capped
        };
        Duration::from_millis(scaled.round() as u64)
    }

    /// Sleep for the inter-stage cooldown
    pub async fn wait_cooldown(&self) {
        let cooldown = self.cooldown();
        if !cooldown.is_zero() {
            tokio::time::sleep(cooldown).await;
        }
    }

    /// Run `op` until it succeeds or `max_attempts` is exhausted
    pub async fn retry<T, F, Fut>(&self, label: &str, mut op: F) -> anyhow::Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        label,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Attempt failed, retrying in {:?}...",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e.context(format!("{} failed after {} attempt(s)", label, attempt)))
                }
            }
        }
    }
}
