use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use beehouse::{
    AppState, SCHEMA, app,
    cache::{Cache, CacheStore, MemoryStore, RedisStore},
    config::Config,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    if config.session_config().dev_bypass {
        tracing::warn!("DEV_AUTH_BYPASS is on, every request runs as the development broker");
    } else if config.dev_auth_bypass {
        tracing::warn!("DEV_AUTH_BYPASS ignored in production");
    }

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::raw_sql(SCHEMA)
        .execute(&pool)
        .await
        .expect("Failed to apply schema");

    let store: Arc<dyn CacheStore> = if config.redis_url.starts_with("memory://") {
        tracing::info!("Using in-process cache store");
        Arc::new(MemoryStore::new())
    } else {
        let redis_client =
            redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
        Arc::new(
            RedisStore::connect(redis_client)
                .await
                .expect("Failed to connect to Redis"),
        )
    };
    let cache = Cache::new(store, config.cache_default_ttl());

    let state = AppState::new(pool, config.clone(), cache);
    let router = app(state);

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router,
    )
    .await
    .expect("Failed to start server");
}
