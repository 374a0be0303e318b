use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{
        forms::{NewPlaylist, PlaylistEdit},
        Playlist, SongOnPlaylist,
    },
    services::settings,
};

fn missing(playlist_id: i64) -> AppError {
    AppError::NotFound(format!("Playlist {} does not exist", playlist_id))
}

fn not_owner() -> AppError {
    AppError::Forbidden("You can only change your own playlists.".to_string())
}

pub async fn list_for_owner(pool: &PgPool, user_id: i64) -> AppResult<Vec<Playlist>> {
    let playlists = sqlx::query_as::<_, Playlist>(
        "SELECT * FROM playlists WHERE user_profile_fk = $1 ORDER BY date_created, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(playlists)
}

/// Playlists of `owner` that other users may see
///
/// Empty when the owner hides all playlists through their settings.
pub async fn list_visible(pool: &PgPool, owner: i64) -> AppResult<Vec<Playlist>> {
    let hides_all = settings::settings_or_default(pool, owner)
        .await?
        .private_playlists;

    let playlists = list_for_owner(pool, owner)
        .await?
        .into_iter()
        .filter(|p| p.is_visible_to_others(hides_all))
        .collect();
    Ok(playlists)
}

pub async fn get(pool: &PgPool, playlist_id: i64) -> AppResult<Option<Playlist>> {
    let playlist = sqlx::query_as::<_, Playlist>("SELECT * FROM playlists WHERE id = $1")
        .bind(playlist_id)
        .fetch_optional(pool)
        .await?;
    Ok(playlist)
}

/// Loads a playlist the caller must own
pub async fn get_owned(pool: &PgPool, owner: i64, playlist_id: i64) -> AppResult<Playlist> {
    let playlist = get(pool, playlist_id).await?.ok_or_else(|| missing(playlist_id))?;
    if !playlist.is_owned_by(owner) {
        return Err(not_owner());
    }
    Ok(playlist)
}

/// Songs in insertion order
pub async fn songs(pool: &PgPool, playlist_id: i64) -> AppResult<Vec<SongOnPlaylist>> {
    let songs = sqlx::query_as::<_, SongOnPlaylist>(
        "SELECT * FROM songs_on_playlist WHERE playlist_from = $1 ORDER BY id",
    )
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;
    Ok(songs)
}

pub async fn create(pool: &PgPool, owner: i64, playlist: &NewPlaylist) -> AppResult<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO playlists (user_profile_fk, name, description, image, is_private)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(owner)
    .bind(&playlist.name)
    .bind(&playlist.description)
    .bind(&playlist.image)
    .bind(playlist.is_private)
    .fetch_one(pool)
    .await?;

    tracing::info!(user_id = owner, playlist_id = id, "Created playlist");
    Ok(id)
}

/// Appends a track; the same track may appear more than once
pub async fn add_song(pool: &PgPool, owner: i64, playlist_id: i64, spotify_id: &str) -> AppResult<i64> {
    get_owned(pool, owner, playlist_id).await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO songs_on_playlist (playlist_from, spotify_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(playlist_id)
    .bind(spotify_id)
    .fetch_one(pool)
    .await?;

    sqlx::query("UPDATE playlists SET date_last_updated = now() WHERE id = $1")
        .bind(playlist_id)
        .execute(pool)
        .await?;

    tracing::info!(user_id = owner, playlist_id = playlist_id, song_id = id, "Added song");
    Ok(id)
}

/// Applies an edit; description and image keep their value when `None`
pub async fn edit(pool: &PgPool, owner: i64, playlist_id: i64, edit: &PlaylistEdit) -> AppResult<()> {
    get_owned(pool, owner, playlist_id).await?;

    sqlx::query(
        r#"
        UPDATE playlists
        SET name = $2,
            description = COALESCE($3, description),
            image = COALESCE($4, image),
            is_private = $5,
            date_last_updated = now()
        WHERE id = $1
        "#,
    )
    .bind(playlist_id)
    .bind(&edit.name)
    .bind(&edit.description)
    .bind(&edit.image)
    .bind(edit.is_private)
    .execute(pool)
    .await?;

    tracing::info!(user_id = owner, playlist_id = playlist_id, "Edited playlist");
    Ok(())
}

/// Deletes the playlist; its songs go with it
pub async fn delete(pool: &PgPool, owner: i64, playlist_id: i64) -> AppResult<()> {
    get_owned(pool, owner, playlist_id).await?;

    sqlx::query("DELETE FROM playlists WHERE id = $1")
        .bind(playlist_id)
        .execute(pool)
        .await?;

    tracing::info!(user_id = owner, playlist_id = playlist_id, "Deleted playlist");
    Ok(())
}

/// Removes exactly one song row, leaving duplicates of the track in place
pub async fn delete_song(pool: &PgPool, owner: i64, playlist_id: i64, song_id: i64) -> AppResult<()> {
    get_owned(pool, owner, playlist_id).await?;

    let deleted = sqlx::query("DELETE FROM songs_on_playlist WHERE id = $1 AND playlist_from = $2")
        .bind(song_id)
        .bind(playlist_id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::NotFound(format!(
            "Song {} is not on playlist {}",
            song_id, playlist_id
        )));
    }

    tracing::info!(user_id = owner, playlist_id = playlist_id, song_id = song_id, "Removed song");
    Ok(())
}

/// Records the remote copy created by an export
pub async fn mark_exported(pool: &PgPool, playlist_id: i64, spotify_playlist_id: &str) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE playlists
        SET is_imported = TRUE, spotify_playlist_id = $2, date_last_updated = now()
        WHERE id = $1
        "#,
    )
    .bind(playlist_id)
    .bind(spotify_playlist_id)
    .execute(pool)
    .await?;
    Ok(())
}
