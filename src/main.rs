use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use pengbeats::{
    api::{create_router, AppState},
    config::Config,
    db::{create_pool, create_redis_client, run_migrations, Cache},
    middleware::SessionStore,
    services::SpotifyClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pengbeats=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let db_pool = create_pool(&config.database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    run_migrations(&db_pool).await?;

    let redis_client = create_redis_client(&config.redis_url)?;
    let cache = Cache::new(redis_client);
    let sessions = SessionStore::new(cache, config.session_ttl_secs, config.secure_cookies);

    let spotify = Arc::new(SpotifyClient::new(&config));
    let addr = config.bind_addr();

    let state = AppState::new(db_pool, sessions, spotify, config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "PengBeats listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutting down");
}
