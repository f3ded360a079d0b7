//! Simulated link impairment.
//!
//! The relay exists to benchmark protocols under bad network conditions,
//! so the forwarding loop can consult a [`Condition`] per datagram: should
//! this one be dropped (loss), does it fit the current bandwidth budget,
//! how long to hold it back (latency), and does it exceed the current MTU.
//!
//! Each impairment is drawn uniformly from a configured range and the
//! draws refresh on a configurable interval, so a long run wanders across
//! the configured spectrum instead of pinning one value.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Largest payload a single IPv4 UDP datagram can carry.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Errors from condition configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConditionError {
    /// A min bound exceeds its max bound
    #[error("invalid {name} range: min {min} > max {max}")]
    InvalidRange {
        /// Which range is broken
        name: &'static str,
        /// Lower bound supplied
        min: u64,
        /// Upper bound supplied
        max: u64,
    },

    /// Loss is expressed per 1000 datagrams and cannot exceed that
    #[error("loss must be at most 1000 per 1k datagrams, got {0}")]
    LossOutOfRange(u32),

    /// No MTU candidates to choose from
    #[error("mtu list is empty")]
    EmptyMtus,

    /// An MTU of zero would drop everything
    #[error("mtu must be non-zero")]
    ZeroMtu,

    /// Draws must refresh at some non-zero interval
    #[error("update rate must be non-zero")]
    ZeroUpdateRate,
}

/// Ranges the link impairments are drawn from
///
/// The default is a transparent link: no latency, no loss, unlimited
/// bandwidth, maximum MTU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionConfig {
    /// Added one-way latency lower bound, milliseconds
    pub latency_ms_min: u64,
    /// Added one-way latency upper bound, milliseconds
    pub latency_ms_max: u64,
    /// Datagrams dropped per 1000, lower bound
    pub loss_per_1k_min: u32,
    /// Datagrams dropped per 1000, upper bound
    pub loss_per_1k_max: u32,
    /// Bandwidth budget lower bound, bytes per second (0 = unlimited)
    pub bandwidth_min: u64,
    /// Bandwidth budget upper bound, bytes per second (0 = unlimited)
    pub bandwidth_max: u64,
    /// Candidate MTUs; the active one is picked from this list
    pub mtus: Vec<usize>,
    /// Seconds between refreshing the active draws
    pub update_rate_secs: u64,
}

impl Default for ConditionConfig {
    fn default() -> Self {
        Self {
            latency_ms_min: 0,
            latency_ms_max: 0,
            loss_per_1k_min: 0,
            loss_per_1k_max: 0,
            bandwidth_min: 0,
            bandwidth_max: 0,
            mtus: vec![MAX_UDP_PAYLOAD],
            update_rate_secs: 1,
        }
    }
}

impl ConditionConfig {
    /// Validate all ranges.
    pub fn validate(&self) -> Result<(), ConditionError> {
        if self.latency_ms_min > self.latency_ms_max {
            return Err(ConditionError::InvalidRange {
                name: "latency",
                min: self.latency_ms_min,
                max: self.latency_ms_max,
            });
        }
        if self.loss_per_1k_min > self.loss_per_1k_max {
            return Err(ConditionError::InvalidRange {
                name: "loss",
                min: u64::from(self.loss_per_1k_min),
                max: u64::from(self.loss_per_1k_max),
            });
        }
        if self.loss_per_1k_max > 1000 {
            return Err(ConditionError::LossOutOfRange(self.loss_per_1k_max));
        }
        if self.bandwidth_min > self.bandwidth_max {
            return Err(ConditionError::InvalidRange {
                name: "bandwidth",
                min: self.bandwidth_min,
                max: self.bandwidth_max,
            });
        }
        if self.mtus.is_empty() {
            return Err(ConditionError::EmptyMtus);
        }
        if self.mtus.contains(&0) {
            return Err(ConditionError::ZeroMtu);
        }
        if self.update_rate_secs == 0 {
            return Err(ConditionError::ZeroUpdateRate);
        }
        Ok(())
    }
}

/// Active link impairment state
///
/// Holds the current draws plus a one-second token bucket for the
/// bandwidth budget. Not thread-safe by design; the forwarding loop owns
/// it the same way it owns the relay.
#[derive(Debug)]
pub struct Condition {
    config: ConditionConfig,
    rng: StdRng,
    latency: Duration,
    loss_per_1k: u32,
    bandwidth: u64,
    mtu: usize,
    drawn_at: Instant,
    window_start: Instant,
    window_spent: u64,
}

impl Condition {
    /// Build from a validated configuration and draw the initial values.
    pub fn new(config: ConditionConfig) -> Result<Self, ConditionError> {
        config.validate()?;
        let now = Instant::now();
        let mut condition = Self {
            config,
            rng: StdRng::from_entropy(),
            latency: Duration::ZERO,
            loss_per_1k: 0,
            bandwidth: 0,
            mtu: MAX_UDP_PAYLOAD,
            drawn_at: now,
            window_start: now,
            window_spent: 0,
        };
        condition.draw();
        Ok(condition)
    }

    /// Should this datagram be dropped?
    pub fn check_loss(&mut self) -> bool {
        self.check_loss_at(Instant::now())
    }

    /// Does a datagram of `size` bytes fit the current second's budget?
    ///
    /// Consumes the budget when it fits. Always true on an unlimited link.
    pub fn use_bandwidth(&mut self, size: usize) -> bool {
        self.use_bandwidth_at(size, Instant::now())
    }

    /// Delay to impose on the next forwarded datagram.
    pub fn added_latency(&mut self) -> Duration {
        self.refresh(Instant::now());
        self.latency
    }

    /// The MTU currently in effect; larger datagrams should be dropped.
    pub fn mtu(&mut self) -> usize {
        self.refresh(Instant::now());
        self.mtu
    }

    /// The configuration the draws come from.
    #[must_use]
    pub fn config(&self) -> &ConditionConfig {
        &self.config
    }

    fn check_loss_at(&mut self, now: Instant) -> bool {
        self.refresh(now);
        self.loss_per_1k > 0 && self.rng.gen_range(0..1000) < self.loss_per_1k
    }

    fn use_bandwidth_at(&mut self, size: usize, now: Instant) -> bool {
        self.refresh(now);
        if self.bandwidth == 0 {
            return true;
        }
        if now.duration_since(self.window_start) >= Duration::from_secs(1) {
            self.window_start = now;
            self.window_spent = 0;
        }
        let size = size as u64;
        if self.window_spent + size <= self.bandwidth {
            self.window_spent += size;
            true
        } else {
            false
        }
    }

    fn refresh(&mut self, now: Instant) {
        if now.duration_since(self.drawn_at).as_secs() >= self.config.update_rate_secs {
            self.draw();
            self.drawn_at = now;
        }
    }

    fn draw(&mut self) {
        let latency_ms = self
            .rng
            .gen_range(self.config.latency_ms_min..=self.config.latency_ms_max);
        self.latency = Duration::from_millis(latency_ms);
        self.loss_per_1k = self
            .rng
            .gen_range(self.config.loss_per_1k_min..=self.config.loss_per_1k_max);
        self.bandwidth = self
            .rng
            .gen_range(self.config.bandwidth_min..=self.config.bandwidth_max);
        self.mtu = self
            .config
            .mtus
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(MAX_UDP_PAYLOAD);
        tracing::trace!(
            latency_ms,
            loss_per_1k = self.loss_per_1k,
            bandwidth = self.bandwidth,
            mtu = self.mtu,
            "condition redrawn"
        );
    }
}
