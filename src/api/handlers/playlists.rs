use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;

use super::nav_for;
use crate::{
    api::AppState,
    error::{AppError, AppResult},
    middleware::CurrentUser,
    models::forms::{AddSongForm, EditPlaylistForm, PlaylistForm},
    services,
    views::{
        playlist_views, render, song_views, AddSongTemplate, EditPlaylistTemplate,
        OtherPlaylistsTemplate, OtherSinglePlaylistTemplate, PlaylistView, PlaylistsTemplate,
        SinglePlaylistTemplate, UserRow,
    },
};

fn own_playlists_url(user_id: i64) -> String {
    format!("/user/playlists/{}", user_id)
}

fn playlist_url(playlist_id: i64) -> String {
    format!("/user/playlist/{}", playlist_id)
}

async fn own_playlists_page(
    state: &AppState,
    user: &mut CurrentUser,
    errors: Vec<String>,
) -> AppResult<Html<String>> {
    let playlists = services::playlists::list_for_owner(&state.db_pool, user.user_id).await?;
    render(&PlaylistsTemplate {
        nav: nav_for(state, user).await?,
        link_prefix: "/user/playlist/".to_string(),
        playlists: playlist_views(playlists),
        errors,
    })
}

pub async fn own_playlists(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Path(user_id): Path<i64>,
) -> AppResult<Response> {
    if !user.is(user_id) {
        return Ok(Redirect::to(&format!("/user/otherplaylists/{}", user_id)).into_response());
    }
    Ok(own_playlists_page(&state, &mut user, Vec::new()).await?.into_response())
}

pub async fn other_playlists(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Path(user_id): Path<i64>,
) -> AppResult<Response> {
    if user.is(user_id) {
        return Ok(Redirect::to(&own_playlists_url(user_id)).into_response());
    }

    let owner = services::profiles::get_summary(&state.db_pool, user_id).await?;
    let playlists = services::playlists::list_visible(&state.db_pool, user_id).await?;

    let page = render(&OtherPlaylistsTemplate {
        nav: nav_for(&state, &mut user).await?,
        link_prefix: format!("/user/otherplaylist/{}/", user_id),
        owner: UserRow::new(owner, false),
        playlists: playlist_views(playlists),
    })?;
    Ok(page.into_response())
}

pub async fn single_playlist(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Path(playlist_id): Path<i64>,
) -> AppResult<Response> {
    let playlist = match services::playlists::get(&state.db_pool, playlist_id).await? {
        Some(playlist) if playlist.is_owned_by(user.user_id) => playlist,
        _ => return Ok(Redirect::to(&own_playlists_url(user.user_id)).into_response()),
    };

    let songs = services::playlists::songs(&state.db_pool, playlist.id).await?;
    let profile = services::profiles::get_profile(&state.db_pool, user.user_id).await?;

    let page = render(&SinglePlaylistTemplate {
        nav: nav_for(&state, &mut user).await?,
        playlist: PlaylistView::from(playlist),
        songs: song_views(songs),
        linked_to_spotify: profile.linked_to_spotify,
    })?;
    Ok(page.into_response())
}

pub async fn other_single_playlist(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Path((user_id, playlist_id)): Path<(i64, i64)>,
) -> AppResult<Response> {
    if user.is(user_id) {
        return Ok(Redirect::to(&playlist_url(playlist_id)).into_response());
    }

    let playlist = services::playlists::get(&state.db_pool, playlist_id)
        .await?
        .filter(|p| p.is_owned_by(user_id))
        .ok_or_else(|| AppError::NotFound(format!("Playlist {} does not exist", playlist_id)))?;

    let owner_hides_all = services::settings::settings_or_default(&state.db_pool, user_id)
        .await?
        .private_playlists;
    if !playlist.is_visible_to_others(owner_hides_all) {
        return Ok(Redirect::to(&own_playlists_url(user_id)).into_response());
    }

    let owner = services::profiles::get_summary(&state.db_pool, user_id).await?;
    let songs = services::playlists::songs(&state.db_pool, playlist.id).await?;

    let page = render(&OtherSinglePlaylistTemplate {
        nav: nav_for(&state, &mut user).await?,
        owner: UserRow::new(owner, false),
        playlist: PlaylistView::from(playlist),
        songs: song_views(songs),
    })?;
    Ok(page.into_response())
}

pub async fn create_playlist(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Form(form): Form<PlaylistForm>,
) -> AppResult<Response> {
    match form.validate() {
        Ok(playlist) => {
            services::playlists::create(&state.db_pool, user.user_id, &playlist).await?;
            Ok(Redirect::to(&own_playlists_url(user.user_id)).into_response())
        }
        Err(errors) => Ok(own_playlists_page(&state, &mut user, errors.messages())
            .await?
            .into_response()),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AddSongQuery {
    track_id: Option<String>,
}

async fn add_song_popup(
    state: &AppState,
    user: &mut CurrentUser,
    track_id: String,
    errors: Vec<String>,
) -> AppResult<Html<String>> {
    let playlists = services::playlists::list_for_owner(&state.db_pool, user.user_id).await?;
    render(&AddSongTemplate {
        nav: nav_for(state, user).await?,
        track_id,
        playlists: playlist_views(playlists),
        errors,
    })
}

pub async fn add_song_page(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Query(query): Query<AddSongQuery>,
) -> AppResult<Html<String>> {
    add_song_popup(&state, &mut user, query.track_id.unwrap_or_default(), Vec::new()).await
}

pub async fn add_song(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Form(form): Form<AddSongForm>,
) -> AppResult<Response> {
    match form.validate() {
        Ok((playlist_id, track_id)) => {
            services::playlists::add_song(&state.db_pool, user.user_id, playlist_id, &track_id)
                .await?;
            Ok(Redirect::to(&playlist_url(playlist_id)).into_response())
        }
        Err(errors) => {
            let track_id = form.track_id.clone().unwrap_or_default();
            Ok(add_song_popup(&state, &mut user, track_id, errors.messages())
                .await?
                .into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EditPlaylistQuery {
    playlist_id: i64,
}

fn privacy_field(is_private: bool) -> &'static str {
    if is_private {
        "is_private_t"
    } else {
        "is_private_f"
    }
}

pub async fn edit_playlist_page(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Query(query): Query<EditPlaylistQuery>,
) -> AppResult<Html<String>> {
    let playlist =
        services::playlists::get_owned(&state.db_pool, user.user_id, query.playlist_id).await?;
    render(&EditPlaylistTemplate {
        nav: nav_for(&state, &mut user).await?,
        privacy_field: privacy_field(playlist.is_private).to_string(),
        playlist: PlaylistView::from(playlist),
        errors: Vec::new(),
    })
}

pub async fn edit_playlist(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Form(form): Form<EditPlaylistForm>,
) -> AppResult<Response> {
    let playlist_id = form
        .playlist_id()
        .ok_or_else(|| AppError::InvalidInput("Missing playlist id.".to_string()))?;
    let playlist = services::playlists::get_owned(&state.db_pool, user.user_id, playlist_id).await?;

    match form.validate(playlist.is_private) {
        Ok(Some(edit)) => {
            services::playlists::edit(&state.db_pool, user.user_id, playlist_id, &edit).await?;
        }
        Ok(None) => {}
        Err(errors) => {
            let page = render(&EditPlaylistTemplate {
                nav: nav_for(&state, &mut user).await?,
                privacy_field: privacy_field(playlist.is_private).to_string(),
                playlist: PlaylistView::from(playlist),
                errors: errors.messages(),
            })?;
            return Ok(page.into_response());
        }
    }
    Ok(Redirect::to(&playlist_url(playlist_id)).into_response())
}

pub async fn delete_playlist(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(playlist_id): Path<i64>,
) -> AppResult<Redirect> {
    services::playlists::delete(&state.db_pool, user.user_id, playlist_id).await?;
    Ok(Redirect::to(&own_playlists_url(user.user_id)))
}

pub async fn delete_song(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((playlist_id, song_id)): Path<(i64, i64)>,
) -> AppResult<Redirect> {
    services::playlists::delete_song(&state.db_pool, user.user_id, playlist_id, song_id).await?;
    Ok(Redirect::to(&playlist_url(playlist_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_field_follows_current_state() {
        assert_eq!(privacy_field(true), "is_private_t");
        assert_eq!(privacy_field(false), "is_private_f");
    }
}
