use chrono::Utc;
use sqlx::PgPool;

use crate::{
    error::AppResult,
    models::{track_uri, Playlist, SpotifyLink},
    services::{playlists, profiles},
};

use super::{NewRemotePlaylist, SpotifyApi, SpotifyToken, MAX_ITEMS_PER_REQUEST, TOKEN_REFRESH_MARGIN_SECS};

/// Result of exporting a playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The profile has no Spotify account linked yet
    NotLinked,
    /// The existing remote playlist now mirrors the local one
    Replaced {
        spotify_playlist_id: String,
        tracks: usize,
    },
    /// A remote playlist was created and filled
    Created {
        spotify_playlist_id: String,
        tracks: usize,
    },
}

/// Refreshes the access token if it expires within the safety margin
///
/// Returns `None` when the stored token is still good. When Spotify omits a
/// new refresh token, the stored one is carried over.
pub async fn ensure_fresh_token(
    api: &dyn SpotifyApi,
    link: &SpotifyLink,
    now: i64,
) -> AppResult<Option<SpotifyToken>> {
    if link.expires_at - now > TOKEN_REFRESH_MARGIN_SECS {
        return Ok(None);
    }

    let mut token = api.refresh_token(&link.refresh_token).await?;
    if token.refresh_token.is_none() {
        token.refresh_token = Some(link.refresh_token.clone());
    }
    Ok(Some(token))
}

/// Overwrites the remote items with `uris`, in chunks the API accepts
///
/// The first chunk replaces, later chunks append. An empty list clears the
/// remote playlist.
pub async fn push_tracks(
    api: &dyn SpotifyApi,
    access_token: &str,
    remote_id: &str,
    uris: &[String],
) -> AppResult<()> {
    let mut chunks = uris.chunks(MAX_ITEMS_PER_REQUEST);
    let first = chunks.next().unwrap_or(&[]);
    api.replace_playlist_items(access_token, remote_id, first).await?;

    for chunk in chunks {
        api.add_playlist_items(access_token, remote_id, chunk).await?;
    }
    Ok(())
}

/// Makes the remote copy of `playlist` match `uris`
pub async fn sync_playlist(
    api: &dyn SpotifyApi,
    access_token: &str,
    spotify_user_id: &str,
    playlist: &Playlist,
    uris: &[String],
) -> AppResult<ExportOutcome> {
    if let Some(remote_id) = playlist.remote_id() {
        push_tracks(api, access_token, remote_id, uris).await?;
        return Ok(ExportOutcome::Replaced {
            spotify_playlist_id: remote_id.to_string(),
            tracks: uris.len(),
        });
    }

    let details = NewRemotePlaylist {
        name: playlist.name.clone(),
        public: !playlist.is_private,
        collaborative: false,
        description: playlist.description.clone(),
    };
    let remote_id = api
        .create_playlist(access_token, spotify_user_id, &details)
        .await?;

    if !uris.is_empty() {
        push_tracks(api, access_token, &remote_id, uris).await?;
    }

    Ok(ExportOutcome::Created {
        spotify_playlist_id: remote_id,
        tracks: uris.len(),
    })
}

/// Exports `playlist` to its owner's linked Spotify account
///
/// Refreshes and persists the token when needed. Records the remote id
/// the first time the playlist is created on Spotify.
pub async fn export_playlist(
    pool: &PgPool,
    api: &dyn SpotifyApi,
    user_id: i64,
    playlist: &Playlist,
) -> AppResult<ExportOutcome> {
    let profile = profiles::get_profile(pool, user_id).await?;
    let Some(mut link) = profile.spotify_link() else {
        return Ok(ExportOutcome::NotLinked);
    };

    if let Some(token) = ensure_fresh_token(api, &link, Utc::now().timestamp()).await? {
        profiles::update_spotify_token(pool, user_id, &token).await?;
        tracing::info!(user_id = user_id, "Refreshed Spotify access token");
        link.access_token = token.access_token;
        link.expires_at = token.expires_at;
    }

    let songs = playlists::songs(pool, playlist.id).await?;
    let uris: Vec<String> = songs.iter().map(|s| track_uri(&s.spotify_id)).collect();

    let outcome = sync_playlist(
        api,
        &link.access_token,
        &link.spotify_user_id,
        playlist,
        &uris,
    )
    .await?;

    if let ExportOutcome::Created {
        spotify_playlist_id,
        ..
    } = &outcome
    {
        playlists::mark_exported(pool, playlist.id, spotify_playlist_id).await?;
    }

    tracing::info!(
        user_id = user_id,
        playlist_id = playlist.id,
        outcome = ?outcome,
        "Exported playlist to Spotify"
    );

    Ok(outcome)
}
