use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use assembler_api::cache::{AssemblyCache, InMemoryCache, RedisCache};
use assembler_api::config::Config;
use assembler_api::layout::find_template;
use assembler_api::routes::build_router;
use assembler_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("assembler_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Assembler API v{}", env!("CARGO_PKG_VERSION"));

    if find_template(&config.default_template).is_none() {
        anyhow::bail!(
            "DEFAULT_TEMPLATE '{}' is not a known template",
            config.default_template
        );
    }

    let cache: Arc<dyn AssemblyCache> = match &config.redis_url {
        Some(url) => {
            let cache = RedisCache::new(url, config.cache_ttl_secs)?;
            info!("Redis assembly cache initialized (ttl {}s)", config.cache_ttl_secs);
            Arc::new(cache)
        }
        None => {
            info!(
                "REDIS_URL not set, using in-memory assembly cache (capacity {})",
                config.cache_capacity
            );
            Arc::new(InMemoryCache::new(config.cache_capacity))
        }
    };

    let state = AppState {
        config: config.clone(),
        cache,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
