use std::sync::Arc;

use sqlx::PgPool;

use crate::{config::Config, middleware::SessionStore, services::SpotifyApi};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub sessions: SessionStore,
    pub spotify: Arc<dyn SpotifyApi>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        db_pool: PgPool,
        sessions: SessionStore,
        spotify: Arc<dyn SpotifyApi>,
        config: Config,
    ) -> Self {
        Self {
            db_pool,
            sessions,
            spotify,
            config: Arc::new(config),
        }
    }
}
