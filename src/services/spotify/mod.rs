/// Spotify integration
///
/// Account linking runs the OAuth2 authorization-code flow and stores the
/// resulting tokens on the profile. Export pushes a local playlist's track
/// list to the linked account, creating the remote playlist on first use.
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

pub mod client;
pub mod export;
pub mod link;

pub use client::SpotifyClient;
pub use export::{export_playlist, ExportOutcome};
pub use link::{begin_link, complete_link};

/// Scopes requested when linking an account
pub const SCOPES: &[&str] = &[
    "playlist-modify-public",
    "playlist-modify-private",
    "user-read-private",
];

/// Spotify caps playlist item writes at 100 URIs per request
pub const MAX_ITEMS_PER_REQUEST: usize = 100;

/// Tokens are refreshed when they expire within this many seconds
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Access/refresh token pair as issued by the accounts service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyToken {
    pub access_token: String,
    /// Omitted by Spotify on some refreshes; the previous one stays valid
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds)
    pub expires_at: i64,
    pub scope: String,
}

/// Metadata for a playlist created on the user's account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRemotePlaylist {
    pub name: String,
    pub public: bool,
    pub collaborative: bool,
    pub description: String,
}

/// The Spotify Web API surface the app relies on
///
/// Implemented over the rspotify SDK by [`SpotifyClient`]; mocked in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SpotifyApi: Send + Sync {
    /// URL of the consent page the user is redirected to
    fn authorize_url(&self, state: &str) -> AppResult<String>;

    /// Exchanges an authorization code for tokens
    async fn exchange_code(&self, code: &str) -> AppResult<SpotifyToken>;

    /// Trades a refresh token for a new access token
    async fn refresh_token(&self, refresh_token: &str) -> AppResult<SpotifyToken>;

    /// Spotify user id of the token's owner (`GET /v1/me`)
    async fn current_user_id(&self, access_token: &str) -> AppResult<String>;

    /// Creates a playlist on `user_id`'s account and returns its id
    async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        playlist: &NewRemotePlaylist,
    ) -> AppResult<String>;

    /// Overwrites the playlist's items with at most 100 URIs
    async fn replace_playlist_items(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> AppResult<()>;

    /// Appends at most 100 URIs to the playlist
    async fn add_playlist_items(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> AppResult<()>;
}
