use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{forms::ProfileUpdate, ProfileDetails, ProfileSummary, UserProfile},
    services::{settings, spotify::SpotifyToken},
};

/// How many followed users a profile page previews
pub const FOLLOWING_PREVIEW: i64 = 5;

const SUMMARY_COLUMNS: &str = r#"
    u.id AS user_id, u.username, u.first_name, u.last_name,
    p.profilepic, p.num_followers, p.num_following
"#;

pub async fn get_profile(pool: &PgPool, user_id: i64) -> AppResult<UserProfile> {
    sqlx::query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} does not exist", user_id)))
}

pub async fn get_details(pool: &PgPool, user_id: i64) -> AppResult<ProfileDetails> {
    sqlx::query_as::<_, ProfileDetails>(
        r#"
        SELECT u.id AS user_id, u.username, u.email, u.first_name, u.last_name,
               p.birthdate, p.description, p.likes, p.dislikes, p.profilepic,
               p.num_followers, p.num_following, p.linked_to_spotify
        FROM users u
        JOIN user_profiles p ON p.user_id = u.id
        WHERE u.id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {} does not exist", user_id)))
}

pub async fn get_summary(pool: &PgPool, user_id: i64) -> AppResult<ProfileSummary> {
    sqlx::query_as::<_, ProfileSummary>(&format!(
        "SELECT {} FROM users u JOIN user_profiles p ON p.user_id = u.id WHERE u.id = $1",
        SUMMARY_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {} does not exist", user_id)))
}

/// Every profile except `viewer`, alphabetically
pub async fn list_except(pool: &PgPool, viewer: i64) -> AppResult<Vec<ProfileSummary>> {
    let users = sqlx::query_as::<_, ProfileSummary>(&format!(
        "SELECT {} FROM users u JOIN user_profiles p ON p.user_id = u.id \
         WHERE u.id <> $1 ORDER BY u.username",
        SUMMARY_COLUMNS
    ))
    .bind(viewer)
    .fetch_all(pool)
    .await?;
    Ok(users)
}

/// Applies a validated profile edit and stamps `date_last_updated`
pub async fn update_profile(pool: &PgPool, user_id: i64, update: &ProfileUpdate) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE users SET first_name = $2, last_name = $3, email = $4 WHERE id = $1")
        .bind(user_id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.email)
        .execute(&mut *tx)
        .await?;

    let profile = &update.profile;
    let updated = sqlx::query(
        r#"
        UPDATE user_profiles
        SET birthdate = $2, description = $3, likes = $4, dislikes = $5,
            profilepic = $6, date_last_updated = now()
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(profile.birthdate)
    .bind(&profile.description)
    .bind(&profile.likes)
    .bind(&profile.dislikes)
    .bind(&profile.profilepic)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {} does not exist", user_id)));
    }

    tx.commit().await?;
    tracing::info!(user_id = user_id, "Updated profile");
    Ok(())
}

// Follows

/// Profiles `user_id` follows, oldest follow first
pub async fn following(
    pool: &PgPool,
    user_id: i64,
    limit: Option<i64>,
) -> AppResult<Vec<ProfileSummary>> {
    let users = sqlx::query_as::<_, ProfileSummary>(&format!(
        "SELECT {} FROM followed_users f \
         JOIN users u ON u.id = f.user_to \
         JOIN user_profiles p ON p.user_id = f.user_to \
         WHERE f.user_from = $1 \
         ORDER BY f.date_created, f.id \
         LIMIT $2",
        SUMMARY_COLUMNS
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(users)
}

/// Profiles following `user_id`, oldest follow first
pub async fn followers(pool: &PgPool, user_id: i64) -> AppResult<Vec<ProfileSummary>> {
    let users = sqlx::query_as::<_, ProfileSummary>(&format!(
        "SELECT {} FROM followed_users f \
         JOIN users u ON u.id = f.user_from \
         JOIN user_profiles p ON p.user_id = f.user_from \
         WHERE f.user_to = $1 \
         ORDER BY f.date_created, f.id",
        SUMMARY_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(users)
}

pub async fn is_following(pool: &PgPool, user_from: i64, user_to: i64) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM followed_users WHERE user_from = $1 AND user_to = $2)",
    )
    .bind(user_from)
    .bind(user_to)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Whether `viewer` may read `owner`'s posts under the owner's privacy setting
pub async fn posts_visible_to(pool: &PgPool, owner: i64, viewer: i64) -> AppResult<bool> {
    if owner == viewer {
        return Ok(true);
    }
    let private = settings::settings_or_default(pool, owner).await?.private_profile;
    Ok(!private || is_following(pool, viewer, owner).await?)
}

async fn ensure_profile_exists(tx: &mut Transaction<'_, Postgres>, user_id: i64) -> AppResult<()> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM user_profiles WHERE user_id = $1)")
            .bind(user_id)
            .fetch_one(&mut **tx)
            .await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("User {} does not exist", user_id)))
    }
}

/// Moves both denormalized counters by `delta`
async fn shift_follow_counters(
    tx: &mut Transaction<'_, Postgres>,
    user_from: i64,
    user_to: i64,
    delta: i32,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE user_profiles SET num_following = GREATEST(num_following + $2, 0) WHERE user_id = $1",
    )
    .bind(user_from)
    .bind(delta)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        "UPDATE user_profiles SET num_followers = GREATEST(num_followers + $2, 0) WHERE user_id = $1",
    )
    .bind(user_to)
    .bind(delta)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn reject_self_follow(user_from: i64, user_to: i64) -> AppResult<()> {
    if user_from == user_to {
        return Err(AppError::InvalidInput("You cannot follow yourself.".to_string()));
    }
    Ok(())
}

/// Records that `user_from` follows `user_to`
///
/// Returns `false` when the follow already existed; counters only move
/// when a row is inserted.
pub async fn follow(pool: &PgPool, user_from: i64, user_to: i64) -> AppResult<bool> {
    reject_self_follow(user_from, user_to)?;

    let mut tx = pool.begin().await?;
    ensure_profile_exists(&mut tx, user_to).await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO followed_users (user_from, user_to)
        VALUES ($1, $2)
        ON CONFLICT (user_from, user_to) DO NOTHING
        "#,
    )
    .bind(user_from)
    .bind(user_to)
    .execute(&mut *tx)
    .await?
    .rows_affected()
        == 1;

    if inserted {
        shift_follow_counters(&mut tx, user_from, user_to, 1).await?;
    }
    tx.commit().await?;

    tracing::info!(user_from = user_from, user_to = user_to, changed = inserted, "Follow");
    Ok(inserted)
}

/// Removes the follow from `user_from` to `user_to`
///
/// Returns `false` when there was nothing to remove.
pub async fn unfollow(pool: &PgPool, user_from: i64, user_to: i64) -> AppResult<bool> {
    reject_self_follow(user_from, user_to)?;

    let mut tx = pool.begin().await?;
    ensure_profile_exists(&mut tx, user_to).await?;

    let deleted = sqlx::query("DELETE FROM followed_users WHERE user_from = $1 AND user_to = $2")
        .bind(user_from)
        .bind(user_to)
        .execute(&mut *tx)
        .await?
        .rows_affected()
        == 1;

    if deleted {
        shift_follow_counters(&mut tx, user_from, user_to, -1).await?;
    }
    tx.commit().await?;

    tracing::info!(user_from = user_from, user_to = user_to, changed = deleted, "Unfollow");
    Ok(deleted)
}

// Spotify credentials

/// Stores a freshly linked Spotify account on the profile
pub async fn save_spotify_link(
    pool: &PgPool,
    user_id: i64,
    spotify_user_id: &str,
    token: &SpotifyToken,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE user_profiles
        SET spotify_user_id = $2, access_token = $3, refresh_token = $4,
            expires_at = $5, scope = $6, linked_to_spotify = TRUE
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(spotify_user_id)
    .bind(&token.access_token)
    .bind(&token.refresh_token)
    .bind(token.expires_at)
    .bind(&token.scope)
    .execute(pool)
    .await?;
    Ok(())
}

/// Persists a refreshed token, keeping the stored refresh token if none came back
pub async fn update_spotify_token(pool: &PgPool, user_id: i64, token: &SpotifyToken) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE user_profiles
        SET access_token = $2, refresh_token = COALESCE($3, refresh_token),
            expires_at = $4, scope = COALESCE(NULLIF($5, ''), scope)
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(&token.access_token)
    .bind(&token.refresh_token)
    .bind(token.expires_at)
    .bind(&token.scope)
    .execute(pool)
    .await?;
    Ok(())
}
