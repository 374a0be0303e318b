use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::Settings,
};

pub async fn get_settings(pool: &PgPool, user_id: i64) -> AppResult<Settings> {
    sqlx::query_as::<_, Settings>("SELECT * FROM settings WHERE user_profile_fk = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No settings for user {}", user_id)))
}

/// Settings of `user_id`, or the defaults when the record is missing
///
/// Used where settings only tweak presentation, such as the theme.
pub async fn settings_or_default(pool: &PgPool, user_id: i64) -> AppResult<Settings> {
    match get_settings(pool, user_id).await {
        Err(AppError::NotFound(_)) => Ok(Settings::defaults_for(user_id)),
        other => other,
    }
}

pub async fn save_settings(pool: &PgPool, settings: &Settings) -> AppResult<()> {
    let updated = sqlx::query(
        r#"
        UPDATE settings
        SET private_profile = $2, private_playlists = $3, light_mode = $4,
            explicit_music = $5, live_music = $6
        WHERE user_profile_fk = $1
        "#,
    )
    .bind(settings.user_profile_fk)
    .bind(settings.private_profile)
    .bind(settings.private_playlists)
    .bind(settings.light_mode)
    .bind(settings.explicit_music)
    .bind(settings.live_music)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "No settings for user {}",
            settings.user_profile_fk
        )));
    }

    tracing::info!(user_id = settings.user_profile_fk, "Saved settings");
    Ok(())
}
