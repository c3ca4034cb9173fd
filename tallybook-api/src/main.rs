//! # Tallybook API Server
//!
//! Multi-tenant backend for small businesses: sales, income and expenses,
//! dashboards, CSV export, AI assistance, and Meta/Shopify ingestion.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/tallybook JWT_SECRET=... cargo run -p tallybook-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON logs and `REDIS_URL` to share rate-limit
//! counters across instances.

use std::net::SocketAddr;
use tallybook_api::{app, config::Config};
use tallybook_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    redis::{RedisClient, RedisConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "tallybook_api=debug,tallybook_shared=info,tower_http=debug".into()
    });

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Tallybook API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    let bind_address = config.bind_address();
    let mut state = app::AppState::new(pool.clone(), config);

    if let Some(redis_config) = RedisConfig::from_env() {
        match RedisClient::new(redis_config).await {
            Ok(client) => {
                tracing::info!("Rate limiting shared through Redis");
                state = state.with_redis(client);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, rate limiting per instance");
            }
        }
    }

    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}
