use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use siskin::api;
use siskin::cli;
use siskin::limiters::RateLimiter;
use siskin::store::{CounterStore, MemoryStore, RedisStore};

/// How often the in-process store sweeps expired keys
const PURGE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "siskin=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse args and env vars
    let args = cli::Cli::parse();
    let settings = args.into_settings();

    // Socket server listen address setup
    let listen_address: IpAddr = settings
        .listen_address
        .parse::<IpAddr>()
        .expect("Invalid ip address");
    let socket_address = SocketAddr::from((listen_address, settings.listen_port));

    // Policy is validated once, here; a bad algorithm name or knob never
    // reaches a request
    let policy = settings.rate_policy()?;

    let store: Arc<dyn CounterStore> = match settings.store_url.as_deref() {
        Some(url) => Arc::new(RedisStore::connect(url, settings.store_timeout()).await?),
        None => {
            info!("No store URL configured: counters live in process memory");
            let store = Arc::new(MemoryStore::new());
            let sweeper = store.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(PURGE_INTERVAL);
                loop {
                    interval.tick().await;
                    let removed = sweeper.purge_expired();
                    if removed > 0 {
                        debug!(removed, "Purged expired rate limit keys");
                    }
                }
            });
            store
        }
    };

    // Build Axum Router
    let api = api::api(RateLimiter::new(store, policy))?;

    // Start server
    info!("Starting Siskin on {} with policy {:?}", socket_address, policy);
    let listener = tokio::net::TcpListener::bind(socket_address).await?;
    axum::serve(listener, api).await?;

    Ok(())
}
