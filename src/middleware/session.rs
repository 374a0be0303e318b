//! Server-side sessions kept in Redis.
//!
//! The browser only holds an opaque UUID in the `sessionid` cookie. The
//! session body (logged-in user and pending flash messages) lives under
//! `session:{id}` with a fixed TTL.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::AppState,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
};

pub const SESSION_COOKIE: &str = "sessionid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Info => "info",
            FlashLevel::Error => "error",
        }
    }
}

/// One-shot message shown on the next rendered page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: Option<i64>,
    #[serde(default)]
    pub flashes: Vec<Flash>,
}

/// Reads and writes sessions through the Redis cache
#[derive(Clone)]
pub struct SessionStore {
    cache: Cache,
    ttl: u64,
    secure_cookies: bool,
}

impl SessionStore {
    pub fn new(cache: Cache, ttl: u64, secure_cookies: bool) -> Self {
        Self {
            cache,
            ttl,
            secure_cookies,
        }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub async fn load(&self, id: &str) -> AppResult<Option<SessionData>> {
        self.cache
            .get_from_cache(&CacheKey::Session(id.to_string()))
            .await
    }

    /// Stores `data` under a fresh id and returns the id
    pub async fn start(&self, data: &SessionData) -> AppResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        self.save(&id, data).await?;
        Ok(id)
    }

    pub async fn save(&self, id: &str, data: &SessionData) -> AppResult<()> {
        self.cache
            .set(&CacheKey::Session(id.to_string()), data, self.ttl)
            .await
    }

    /// Rewrites an existing session. A destroyed session stays destroyed.
    pub async fn update(&self, id: &str, data: &SessionData) -> AppResult<()> {
        let live = self
            .cache
            .replace(&CacheKey::Session(id.to_string()), data, self.ttl)
            .await?;
        if !live {
            tracing::debug!(session_id = %id, "Skipped write to a session that no longer exists");
        }
        Ok(())
    }

    pub async fn destroy(&self, id: &str) -> AppResult<()> {
        self.cache.delete(&CacheKey::Session(id.to_string())).await
    }

    /// Cookie pointing the browser at session `id`
    pub fn cookie(&self, id: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookies)
            .build()
    }
}

/// The request's session, which may be anonymous and may not exist yet
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub id: Option<String>,
    pub data: SessionData,
}

impl Session {
    pub fn user_id(&self) -> Option<i64> {
        self.data.user_id
    }

    /// Drains pending flashes, persisting the emptied session
    pub async fn take_flashes(&mut self, store: &SessionStore) -> AppResult<Vec<Flash>> {
        let flashes = std::mem::take(&mut self.data.flashes);
        if let (false, Some(id)) = (flashes.is_empty(), &self.id) {
            store.update(id, &self.data).await?;
        }
        Ok(flashes)
    }
}

/// Parses the session cookie value; anything but a UUID is ignored
fn session_id_from_jar(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value())
        .and_then(|v| Uuid::parse_str(v).ok())
        .map(|id| id.simple().to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(id) = session_id_from_jar(&jar) else {
            return Ok(Session::default());
        };

        match state.sessions.load(&id).await? {
            Some(data) => Ok(Session { id: Some(id), data }),
            None => Ok(Session::default()),
        }
    }
}

/// A logged-in user. Rejects with a redirect to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i64,
    pub session_id: String,
    pub session: Session,
}

impl CurrentUser {
    /// Queues a flash for the next rendered page
    pub async fn flash(&mut self, store: &SessionStore, flash: Flash) -> AppResult<()> {
        self.session.data.flashes.push(flash);
        store.update(&self.session_id, &self.session.data).await
    }

    pub async fn take_flashes(&mut self, store: &SessionStore) -> AppResult<Vec<Flash>> {
        self.session.take_flashes(store).await
    }

    pub fn is(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }

    /// Fails with 403 unless the path's user is the logged-in one
    pub fn ensure_is(&self, user_id: i64) -> AppResult<()> {
        if self.is(user_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You can only change your own account.".to_string(),
            ))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        match (session.id.clone(), session.user_id()) {
            (Some(session_id), Some(user_id)) => Ok(CurrentUser {
                user_id,
                session_id,
                session,
            }),
            _ => Err(AppError::Unauthorized),
        }
    }
}
