use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use items_gateway::config::Args;
use items_gateway::rate_limit::{
    CounterStore, MemoryCounterStore, Policy, RateLimiter, RedisCounterStore,
};
use items_gateway::state::AppState;
use items_gateway::{app, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    args.validate()?;
    run(args).await
}

// Acquire the pool here so it is released on every exit path,
// including failures during the rest of initialization.
async fn run(args: Args) -> anyhow::Result<()> {
    let pool = db::connect(&args.database_url)
        .await
        .with_context(|| format!("failed to open database {}", args.database_url))?;

    let result = serve(&args, pool.clone()).await;

    pool.close().await;
    info!("database pool closed");
    result
}

async fn serve(args: &Args, pool: sqlx::SqlitePool) -> anyhow::Result<()> {
    db::run_migration(&pool)
        .await
        .context("failed to run schema migration")?;

    let store = counter_store(args).await?;
    let limiter = RateLimiter::new(
        store,
        args.on_store_error,
        Duration::from_millis(args.store_timeout_ms),
    );

    let state = Arc::new(AppState {
        db: pool,
        limiter,
        api_keys: args.allowed_keys(),
        public_policy: Policy::new("public", args.public_limit, args.public_window),
        private_policy: Policy::new("private", args.private_limit, args.private_window),
    });

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "gateway listening");
    info!(
        limit = args.public_limit,
        window = args.public_window,
        "public policy (keyed by client IP)"
    );
    info!(
        limit = args.private_limit,
        window = args.private_window,
        "private policy (keyed by API key)"
    );

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")
}

async fn counter_store(args: &Args) -> anyhow::Result<Arc<dyn CounterStore>> {
    match &args.redis_url {
        Some(url) => {
            let store = RedisCounterStore::new(url).context("failed to create redis counter store")?;
            store.ping().await.context("redis counter store unreachable")?;
            info!(%url, "using redis counter store");
            Ok(Arc::new(store))
        }
        None => {
            let store = Arc::new(MemoryCounterStore::new());

            // Background sweep keeps idle windows from accumulating
            let sweeper = Arc::clone(&store);
            let idle_for =
                Duration::from_secs(args.public_window.max(args.private_window).max(1) * 2);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(idle_for);
                loop {
                    interval.tick().await;
                    sweeper.sweep(idle_for);
                }
            });

            info!("using in-memory counter store");
            Ok(store)
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
