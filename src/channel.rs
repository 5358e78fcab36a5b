//! Simulated remote backend: every write is delayed and may be dropped.
//!
//! Reads never pass through here. A write handed to [`UnreliableChannel::execute`]
//! either runs to completion after the drawn latency or is rejected with
//! [`ChannelError::Simulated`] before its future is ever polled, so a
//! simulated failure can never leave a partial write behind.

use std::{collections::VecDeque, future::Future, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persist::PersistError;

/// Why a call through the channel did not succeed.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The roll landed under the failure rate; the backend was never called.
    #[error("simulated remote failure (rate {failure_rate:.3})")]
    Simulated { failure_rate: f64 },
    /// The roll passed but the wrapped write itself failed.
    #[error("backend write failed: {0}")]
    Backend(#[from] PersistError),
    #[error("invalid channel config: {0}")]
    InvalidConfig(String),
}

/// Latency and failure-rate bounds; each call draws fresh values inside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Inclusive lower bound of the simulated delay.
    pub latency_min_ms: u64,
    pub latency_max_ms: u64,
    /// Probabilities in `0.0..=1.0`; `min` must not exceed `max`.
    pub failure_rate_min: f64,
    pub failure_rate_max: f64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            latency_min_ms: 200,
            latency_max_ms: 1200,
            failure_rate_min: 0.05,
            failure_rate_max: 0.10,
        }
    }
}

impl ChannelConfig {
    /// Default failure rates with no delay.
    pub fn instant() -> Self {
        Self {
            latency_min_ms: 0,
            latency_max_ms: 0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ChannelError> {
        if self.latency_min_ms > self.latency_max_ms {
            return Err(ChannelError::InvalidConfig(format!(
                "latency range {}..={} ms is empty",
                self.latency_min_ms, self.latency_max_ms
            )));
        }
        let rates_ok = (0.0..=1.0).contains(&self.failure_rate_min)
            && (0.0..=1.0).contains(&self.failure_rate_max)
            && self.failure_rate_min <= self.failure_rate_max;
        if !rates_ok {
            return Err(ChannelError::InvalidConfig(format!(
                "failure rate range {}..={} must be an ordered subrange of 0..=1",
                self.failure_rate_min, self.failure_rate_max
            )));
        }
        Ok(())
    }
}

/// Randomness behind the channel. Injected so tests can pin every draw.
pub trait FaultSource: Send + Sync {
    /// Latency for one call, within `min..=max`.
    fn latency_ms(&mut self, min: u64, max: u64) -> u64;
    /// Failure probability for one call, within `min..=max`.
    fn failure_rate(&mut self, min: f64, max: f64) -> f64;
    /// The call fails when this is below the drawn rate.
    fn roll(&mut self) -> f64;
}

/// Seedable ChaCha-backed source.
pub struct SeededFaults {
    rng: ChaCha8Rng,
}

impl SeededFaults {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl FaultSource for SeededFaults {
    fn latency_ms(&mut self, min: u64, max: u64) -> u64 {
        self.rng.gen_range(min..=max)
    }

    fn failure_rate(&mut self, min: f64, max: f64) -> f64 {
        self.rng.gen_range(min..=max)
    }

    fn roll(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }
}

/// Forced outcome for one scripted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail,
}

/// Replays a fixed script of outcomes at a fixed latency; passes once exhausted.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFaults {
    script: VecDeque<Outcome>,
    latency_ms: u64,
}

impl ScriptedFaults {
    pub fn new(script: impl IntoIterator<Item = Outcome>) -> Self {
        Self {
            script: script.into_iter().collect(),
            latency_ms: 0,
        }
    }

    pub fn always_pass() -> Self {
        Self::default()
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn push(&mut self, outcome: Outcome) {
        self.script.push_back(outcome);
    }
}

impl FaultSource for ScriptedFaults {
    fn latency_ms(&mut self, _min: u64, _max: u64) -> u64 {
        self.latency_ms
    }

    fn failure_rate(&mut self, min: f64, _max: f64) -> f64 {
        min
    }

    // Scripted rolls sit outside 0..1 so they decide the call whatever the rate.
    fn roll(&mut self) -> f64 {
        match self.script.pop_front() {
            Some(Outcome::Fail) => -1.0,
            Some(Outcome::Pass) | None => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub attempts: u64,
    pub simulated_failures: u64,
    pub backend_failures: u64,
}

pub struct UnreliableChannel {
    config: ChannelConfig,
    faults: Box<dyn FaultSource>,
    stats: ChannelStats,
}

impl UnreliableChannel {
    pub fn new(config: ChannelConfig, faults: Box<dyn FaultSource>) -> Result<Self, ChannelError> {
        config.validate()?;
        Ok(Self {
            config,
            faults,
            stats: ChannelStats::default(),
        })
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// Waits the drawn latency, then either rejects `op` or runs it.
    ///
    /// On rejection `op` is dropped unpolled.
    pub async fn execute<T, Fut>(&mut self, label: &'static str, op: Fut) -> Result<T, ChannelError>
    where
        Fut: Future<Output = Result<T, PersistError>>,
    {
        let latency_ms = self
            .faults
            .latency_ms(self.config.latency_min_ms, self.config.latency_max_ms);
        let failure_rate = self
            .faults
            .failure_rate(self.config.failure_rate_min, self.config.failure_rate_max);
        let roll = self.faults.roll();
        tracing::debug!(op = label, latency_ms, failure_rate, "channel send");

        tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        self.stats.attempts += 1;

        if roll < failure_rate {
            self.stats.simulated_failures += 1;
            tracing::warn!(op = label, failure_rate, "simulated channel failure");
            return Err(ChannelError::Simulated { failure_rate });
        }

        match op.await {
            Ok(out) => Ok(out),
            Err(err) => {
                self.stats.backend_failures += 1;
                tracing::warn!(op = label, error = %err, "backend write failed");
                Err(ChannelError::Backend(err))
            }
        }
    }
}
