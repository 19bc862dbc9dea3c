//! CLI for this application
//!
use crate::settings;

#[derive(Clone, Debug, clap::Parser)]
pub struct Cli {
    // Server listen address
    #[clap(
        long,
        default_value = "0.0.0.0",
        env("SISKIN_LISTEN_ADDRESS"),
        help = "IP Address to listen on"
    )]
    pub listen_address: String,

    // HTTP API listen port
    #[clap(
        long,
        default_value = settings::DEFAULT_PORT_HTTP,
        env("SISKIN_HTTP_LISTEN_PORT"),
        help = "Port to bind Siskin HTTP API server to"
    )]
    pub listen_port: u16,

    // Admission algorithm
    #[clap(
        long,
        default_value = "fixed-window",
        env("SISKIN_ALGORITHM"),
        help = "Admission algorithm: 'fixed-window', 'sliding-window-log', 'sliding-window-counter', 'token-bucket', or 'leaky-bucket'"
    )]
    pub algorithm: settings::AlgorithmKind,

    // Rate limit settings: max calls (over interval) or bucket capacity
    #[clap(
        long,
        default_value = "10",
        env("SISKIN_MAX_CALLS_ALLOWED"),
        help = "Max calls allowed per interval (bucket capacity for token/leaky bucket)"
    )]
    pub max_calls_allowed: u32,

    // Rate limit settings: window length for the windowed algorithms
    #[clap(
        long,
        default_value = "60",
        env("SISKIN_INTERVAL_SECONDS"),
        help = "Window length in seconds for the windowed algorithms"
    )]
    pub interval_seconds: u32,

    // Rate limit settings: sub-window for sliding-window-counter
    #[clap(
        long,
        default_value = "10",
        env("SISKIN_SUB_INTERVAL_SECONDS"),
        help = "Sub-window length in seconds (sliding-window-counter only)"
    )]
    pub sub_interval_seconds: u32,

    // Rate limit settings: sustained refill rate for the bucket algorithms
    #[clap(
        long,
        default_value = "2.0",
        env("SISKIN_RATE_PER_SECOND"),
        help = "Sustained refill rate in tokens per second (token/leaky bucket only)"
    )]
    pub rate_per_second: f64,

    // Shared counter store location
    #[clap(
        long,
        env("SISKIN_STORE_URL"),
        help = "Redis URL for the shared counter store (e.g., redis://localhost:6379). If empty, counters live in process memory."
    )]
    pub store_url: Option<String>,

    // Bound on each store round-trip
    #[clap(
        long,
        default_value = "500",
        env("SISKIN_STORE_TIMEOUT_MS"),
        help = "Timeout in milliseconds for a single counter store operation"
    )]
    pub store_timeout_ms: u64,
}

impl Cli {
    pub fn into_settings(self) -> settings::Settings {
        settings::Settings {
            listen_address: self.listen_address,
            listen_port: self.listen_port,
            algorithm: self.algorithm,
            rate_limit: settings::RateLimitSettings {
                max_calls_allowed: self.max_calls_allowed,
                interval_seconds: self.interval_seconds,
                sub_interval_seconds: self.sub_interval_seconds,
                rate_per_second: self.rate_per_second,
            },
            store_url: self.store_url,
            store_timeout_ms: self.store_timeout_ms,
        }
    }
}
