/// Spotify Web API client
///
/// API Flow:
/// 1. Link: /authorize → user consents → callback with `code`
/// 2. Token: authorization_code or refresh_token grant
/// 3. Export: create the user's playlist, then replace/add its items
///
/// Every call builds a short-lived `AuthCodeSpotify` around the token of the
/// user being served, so one client instance is shared by all sessions.
use async_trait::async_trait;
use chrono::Utc;
use rspotify::{
    model::{EpisodeId, PlayableId, PlaylistId, TrackId, UserId},
    prelude::*,
    AuthCodeSpotify, ClientError, Config as SdkConfig, Credentials, OAuth, Token,
};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    services::spotify::{NewRemotePlaylist, SpotifyApi, SpotifyToken, MAX_ITEMS_PER_REQUEST, SCOPES},
};

#[derive(Clone)]
pub struct SpotifyClient {
    creds: Credentials,
    redirect_uri: String,
    sdk_config: SdkConfig,
}

impl From<&Token> for SpotifyToken {
    fn from(token: &Token) -> Self {
        let mut scopes: Vec<&str> = token.scopes.iter().map(String::as_str).collect();
        scopes.sort_unstable();

        let expires_at = token
            .expires_at
            .map(|at| at.timestamp())
            .unwrap_or_else(|| Utc::now().timestamp() + token.expires_in.num_seconds());

        SpotifyToken {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at,
            scope: scopes.join(" "),
        }
    }
}

/// Logs a failed SDK call and turns it into an `ExternalApi` error
fn sdk_error(action: &'static str) -> impl Fn(ClientError) -> AppError {
    move |e| {
        tracing::warn!(error = %e, action = action, "Spotify request failed");
        AppError::ExternalApi(format!(
            "Spotify API error while trying to {}: {}",
            action, e
        ))
    }
}

fn playable(uri: &str) -> AppResult<PlayableId<'_>> {
    let id = if uri.starts_with("spotify:episode:") {
        EpisodeId::from_uri(uri).map(PlayableId::Episode)
    } else {
        TrackId::from_uri(uri).map(PlayableId::Track)
    };
    id.map_err(|e| AppError::InvalidInput(format!("Invalid Spotify URI {}: {}", uri, e)))
}

fn playlist_id(id: &str) -> AppResult<PlaylistId<'_>> {
    PlaylistId::from_id(id)
        .map_err(|e| AppError::InvalidInput(format!("Invalid Spotify playlist id {}: {}", id, e)))
}

impl SpotifyClient {
    pub fn new(config: &Config) -> Self {
        let sdk_config = SdkConfig {
            api_base_url: format!("{}/v1/", config.spotify_api_url.trim_end_matches('/')),
            auth_base_url: format!("{}/", config.spotify_accounts_url.trim_end_matches('/')),
            token_cached: false,
            token_refreshing: false,
            ..Default::default()
        };

        Self {
            creds: Credentials::new(&config.spotify_client_id, &config.spotify_client_secret),
            redirect_uri: config.spotify_redirect_uri.clone(),
            sdk_config,
        }
    }

    fn oauth(&self, state: &str) -> OAuth {
        OAuth {
            redirect_uri: self.redirect_uri.clone(),
            scopes: SCOPES.iter().map(|scope| scope.to_string()).collect(),
            state: state.to_string(),
            ..Default::default()
        }
    }

    fn sdk(&self, token: Token) -> AuthCodeSpotify {
        AuthCodeSpotify::from_token_with_config(
            token,
            self.creds.clone(),
            self.oauth(""),
            self.sdk_config.clone(),
        )
    }

    /// SDK client acting on behalf of the holder of `access_token`
    fn authorized(&self, access_token: &str) -> AuthCodeSpotify {
        self.sdk(Token {
            access_token: access_token.to_string(),
            ..Default::default()
        })
    }

    /// Reads back the token the SDK stored after a grant
    async fn issued_token(spotify: &AuthCodeSpotify) -> AppResult<SpotifyToken> {
        let token = spotify.get_token();
        let guard = token
            .lock()
            .await
            .map_err(|_| AppError::Internal("Spotify token lock is poisoned".to_string()))?;

        guard
            .as_ref()
            .map(SpotifyToken::from)
            .ok_or_else(|| AppError::ExternalApi("Spotify did not issue a token".to_string()))
    }

    fn ensure_chunk(uris: &[String]) -> AppResult<()> {
        if uris.len() > MAX_ITEMS_PER_REQUEST {
            return Err(AppError::InvalidInput(format!(
                "At most {} tracks can be sent per request",
                MAX_ITEMS_PER_REQUEST
            )));
        }
        Ok(())
    }

    fn playables(uris: &[String]) -> AppResult<Vec<PlayableId<'_>>> {
        Self::ensure_chunk(uris)?;
        uris.iter().map(|uri| playable(uri)).collect()
    }
}

#[async_trait]
impl SpotifyApi for SpotifyClient {
    fn authorize_url(&self, state: &str) -> AppResult<String> {
        let spotify = AuthCodeSpotify::with_config(
            self.creds.clone(),
            self.oauth(state),
            self.sdk_config.clone(),
        );
        spotify
            .get_authorize_url(false)
            .map_err(sdk_error("build the authorization URL"))
    }

    async fn exchange_code(&self, code: &str) -> AppResult<SpotifyToken> {
        let spotify = AuthCodeSpotify::with_config(
            self.creds.clone(),
            self.oauth(""),
            self.sdk_config.clone(),
        );
        spotify
            .request_token(code)
            .await
            .map_err(sdk_error("exchange the authorization code"))?;
        Self::issued_token(&spotify).await
    }

    async fn refresh_token(&self, refresh_token: &str) -> AppResult<SpotifyToken> {
        let spotify = self.sdk(Token {
            refresh_token: Some(refresh_token.to_string()),
            ..Default::default()
        });
        spotify
            .refresh_token()
            .await
            .map_err(sdk_error("refresh the access token"))?;
        Self::issued_token(&spotify).await
    }

    async fn current_user_id(&self, access_token: &str) -> AppResult<String> {
        let me = self
            .authorized(access_token)
            .current_user()
            .await
            .map_err(sdk_error("read the current user"))?;
        Ok(me.id.id().to_string())
    }

    async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        playlist: &NewRemotePlaylist,
    ) -> AppResult<String> {
        let owner = UserId::from_id(user_id)
            .map_err(|e| AppError::InvalidInput(format!("Invalid Spotify user id {}: {}", user_id, e)))?;

        let created = self
            .authorized(access_token)
            .user_playlist_create(
                owner,
                &playlist.name,
                Some(playlist.public),
                Some(playlist.collaborative),
                Some(&playlist.description),
            )
            .await
            .map_err(sdk_error("create a playlist"))?;

        let created_id = created.id.id().to_string();
        tracing::info!(
            spotify_user_id = %user_id,
            spotify_playlist_id = %created_id,
            "Created Spotify playlist"
        );

        Ok(created_id)
    }

    async fn replace_playlist_items(
        &self,
        access_token: &str,
        remote_id: &str,
        uris: &[String],
    ) -> AppResult<()> {
        let items = Self::playables(uris)?;
        self.authorized(access_token)
            .playlist_replace_items(playlist_id(remote_id)?, items)
            .await
            .map_err(sdk_error("replace playlist items"))
    }

    async fn add_playlist_items(
        &self,
        access_token: &str,
        remote_id: &str,
        uris: &[String],
    ) -> AppResult<()> {
        let items = Self::playables(uris)?;
        self.authorized(access_token)
            .playlist_add_items(playlist_id(remote_id)?, items, None)
            .await
            .map_err(sdk_error("add playlist items"))?;
        Ok(())
    }
}
