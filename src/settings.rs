//! Siskin application settings
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config_error;
use crate::error::Result;
use crate::limiters::{BucketPolicy, RatePolicy, SlidingWindowPolicy, WindowPolicy};

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const STANDARD_PORT_HTTP: u16 = 8460;
pub const DEFAULT_PORT_HTTP: &str = "8460";

/// Which admission algorithm this process runs.
///
/// Names exist only at the configuration boundary; after parsing, policy
/// dispatch goes through the closed [`RatePolicy`] enum so an unrecognized
/// algorithm cannot survive past startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum AlgorithmKind {
    FixedWindow,
    SlidingWindowLog,
    SlidingWindowCounter,
    TokenBucket,
    LeakyBucket,
}

impl std::fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlgorithmKind::FixedWindow => write!(f, "fixed-window"),
            AlgorithmKind::SlidingWindowLog => write!(f, "sliding-window-log"),
            AlgorithmKind::SlidingWindowCounter => write!(f, "sliding-window-counter"),
            AlgorithmKind::TokenBucket => write!(f, "token-bucket"),
            AlgorithmKind::LeakyBucket => write!(f, "leaky-bucket"),
        }
    }
}

impl std::str::FromStr for AlgorithmKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "fixed-window" => Ok(AlgorithmKind::FixedWindow),
            "sliding-window-log" => Ok(AlgorithmKind::SlidingWindowLog),
            "sliding-window-counter" => Ok(AlgorithmKind::SlidingWindowCounter),
            "token-bucket" => Ok(AlgorithmKind::TokenBucket),
            "leaky-bucket" => Ok(AlgorithmKind::LeakyBucket),
            _ => Err(format!("Unknown rate limit algorithm: {}", s)),
        }
    }
}

/// Raw numeric rate-limit knobs as they arrive from CLI or env.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RateLimitSettings {
    pub max_calls_allowed: u32,
    pub interval_seconds: u32,
    pub sub_interval_seconds: u32,
    pub rate_per_second: f64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_calls_allowed: 10,
            interval_seconds: 60,
            sub_interval_seconds: 10,
            rate_per_second: 2.0,
        }
    }
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_seconds))
    }

    pub fn sub_window(&self) -> Duration {
        Duration::from_secs(u64::from(self.sub_interval_seconds))
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    // Server listen address
    pub listen_address: String,

    // HTTP API listen port
    pub listen_port: u16,

    // Admission algorithm for this deployment
    pub algorithm: AlgorithmKind,

    // Numeric policy knobs
    pub rate_limit: RateLimitSettings,

    // Redis URL for the shared counter store; None means in-process store
    pub store_url: Option<String>,

    // Upper bound on any single counter store round-trip
    pub store_timeout_ms: u64,
}

impl Settings {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Combine the algorithm choice with the numeric knobs into a validated
    /// policy. Invalid combinations fail here, at startup.
    pub fn rate_policy(&self) -> Result<RatePolicy> {
        let rl = &self.rate_limit;
        if rl.max_calls_allowed == 0 {
            return Err(config_error!("max-calls-allowed must be at least 1"));
        }
        let policy = match self.algorithm {
            AlgorithmKind::FixedWindow | AlgorithmKind::SlidingWindowLog => {
                if rl.interval_seconds == 0 {
                    return Err(config_error!("interval-seconds must be at least 1"));
                }
                let window = WindowPolicy {
                    limit: rl.max_calls_allowed,
                    window: rl.window(),
                };
                if self.algorithm == AlgorithmKind::FixedWindow {
                    RatePolicy::FixedWindow(window)
                } else {
                    RatePolicy::SlidingWindowLog(window)
                }
            }
            AlgorithmKind::SlidingWindowCounter => {
                if rl.sub_interval_seconds == 0 {
                    return Err(config_error!("sub-interval-seconds must be at least 1"));
                }
                if rl.sub_interval_seconds > rl.interval_seconds {
                    return Err(config_error!(
                        "sub-interval-seconds ({}) cannot exceed interval-seconds ({})",
                        rl.sub_interval_seconds,
                        rl.interval_seconds
                    ));
                }
                RatePolicy::SlidingWindowCounter(SlidingWindowPolicy {
                    limit: rl.max_calls_allowed,
                    window: rl.window(),
                    sub_window: rl.sub_window(),
                })
            }
            AlgorithmKind::TokenBucket | AlgorithmKind::LeakyBucket => {
                if !(rl.rate_per_second.is_finite() && rl.rate_per_second > 0.0) {
                    return Err(config_error!(
                        "rate-per-second must be a positive number, got {}",
                        rl.rate_per_second
                    ));
                }
                let bucket = BucketPolicy {
                    capacity: rl.max_calls_allowed,
                    rate_per_second: rl.rate_per_second,
                };
                if self.algorithm == AlgorithmKind::TokenBucket {
                    RatePolicy::TokenBucket(bucket)
                } else {
                    RatePolicy::LeakyBucket(bucket)
                }
            }
        };
        Ok(policy)
    }
}
