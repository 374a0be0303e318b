use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    middleware::{CurrentUser, Flash},
    services::{self, spotify::ExportOutcome},
};

pub async fn link(State(state): State<AppState>, user: CurrentUser) -> AppResult<Redirect> {
    let url = services::spotify::begin_link(
        state.sessions.cache(),
        state.spotify.as_ref(),
        user.user_id,
    )
    .await?;
    Ok(Redirect::to(&url))
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

pub async fn callback(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Query(query): Query<CallbackQuery>,
) -> AppResult<Redirect> {
    let (code, oauth_state) = match (query.error, query.code, query.state) {
        (None, Some(code), Some(oauth_state)) => (code, oauth_state),
        (error, _, _) => {
            let reason = error.unwrap_or_else(|| "missing authorization code".to_string());
            tracing::warn!(user_id = user.user_id, reason = %reason, "Spotify authorization refused");
            user.flash(
                &state.sessions,
                Flash::error(format!("Spotify authorization failed: {}", reason)),
            )
            .await?;
            return Ok(Redirect::to("/"));
        }
    };

    let linked = services::spotify::complete_link(
        &state.db_pool,
        state.sessions.cache(),
        state.spotify.as_ref(),
        user.user_id,
        &code,
        &oauth_state,
    )
    .await;

    let flash = match linked {
        Ok(spotify_user_id) => {
            Flash::success(format!("Linked Spotify account {}", spotify_user_id))
        }
        Err(AppError::Forbidden(msg)) | Err(AppError::ExternalApi(msg)) => Flash::error(msg),
        Err(e) => return Err(e),
    };
    user.flash(&state.sessions, flash).await?;
    Ok(Redirect::to("/"))
}

pub async fn export(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Path(playlist_id): Path<i64>,
) -> AppResult<Redirect> {
    let playlist =
        services::playlists::get_owned(&state.db_pool, user.user_id, playlist_id).await?;

    let outcome = services::spotify::export_playlist(
        &state.db_pool,
        state.spotify.as_ref(),
        user.user_id,
        &playlist,
    )
    .await?;

    let tracks = match outcome {
        ExportOutcome::NotLinked => return Ok(Redirect::to("/spotify/link/")),
        ExportOutcome::Replaced { tracks, .. } | ExportOutcome::Created { tracks, .. } => tracks,
    };

    user.flash(
        &state.sessions,
        Flash::success(format!(
            "Exported \"{}\" to Spotify ({} tracks)",
            playlist.name, tracks
        )),
    )
    .await?;
    Ok(Redirect::to(&format!("/user/playlists/{}", user.user_id)))
}
