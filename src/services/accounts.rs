use std::sync::LazyLock;

use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{forms::NewAccount, Settings, User},
    services::password,
};

pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

/// Verified when the username is unknown, keeping that path as slow as a wrong password
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| password::hash_password(&uuid::Uuid::new_v4().to_string()));

fn hash_to_check(stored: Option<&str>) -> &str {
    stored.unwrap_or(DUMMY_HASH.as_str())
}

/// Runs the password hash off the async executor
async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))
}

/// Creates the user, their profile and default settings in one transaction
///
/// Returns the new user id. A taken username is reported as
/// [`AppError::InvalidInput`] with [`DUPLICATE_USERNAME`].
pub async fn create_account(pool: &PgPool, account: &NewAccount) -> AppResult<i64> {
    let password_hash = hash_password(account.password.clone()).await?;

    let mut tx = pool.begin().await?;

    let inserted: Result<i64, sqlx::Error> = sqlx::query_scalar(
        r#"
        INSERT INTO users (username, email, first_name, last_name, password_hash)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(&account.username)
    .bind(&account.email)
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(&password_hash)
    .fetch_one(&mut *tx)
    .await;

    let user_id = match inserted {
        Ok(id) => id,
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            return Err(AppError::InvalidInput(DUPLICATE_USERNAME.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let profile = &account.profile;
    sqlx::query(
        r#"
        INSERT INTO user_profiles (user_id, birthdate, description, likes, dislikes, profilepic)
        VALUES ($1, $2, $3, $4, $5, $6)
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

    let settings = Settings::defaults_for(user_id);
    sqlx::query(
        r#"
        INSERT INTO settings
            (user_profile_fk, private_profile, private_playlists, light_mode, explicit_music, live_music)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(settings.user_profile_fk)
    .bind(settings.private_profile)
    .bind(settings.private_playlists)
    .bind(settings.light_mode)
    .bind(settings.explicit_music)
    .bind(settings.live_music)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(user_id = user_id, username = %account.username, "Created account");
    Ok(user_id)
}

pub async fn find_user(pool: &PgPool, user_id: i64) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Checks credentials and stamps `last_login` on success
pub async fn authenticate(pool: &PgPool, username: &str, password: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    let stored = user.as_ref().map(|u| u.password_hash.clone());
    let candidate = password.to_string();
    let valid = tokio::task::spawn_blocking(move || {
        password::verify_password(&candidate, hash_to_check(stored.as_deref()))
    })
        .await
        .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?;

    let user = match user {
        Some(user) if valid => user,
        _ => {
            tracing::info!(username = %username, "Rejected login");
            return Ok(None);
        }
    };

    sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
        .bind(user.id)
        .execute(pool)
        .await?;

    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::forms::ProfileFields;
    use chrono::NaiveDate;

    fn account(username: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            first_name: "Peng".to_string(),
            last_name: "Uin".to_string(),
            email: "peng@example.com".to_string(),
            password: "icefloe-42".to_string(),
            profile: ProfileFields {
                birthdate: NaiveDate::from_ymd_opt(2001, 2, 3).unwrap(),
                description: String::new(),
                likes: String::new(),
                dislikes: String::new(),
                profilepic: None,
            },
        }
    }

    async fn pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_hash_password_runs_off_executor() {
        let hash = hash_password("icefloe-42".to_string()).await.unwrap();
        assert!(password::verify_password("icefloe-42", &hash));
    }

    #[test]
    fn test_unknown_user_is_checked_against_full_strength_hash() {
        let stored = hash_to_check(None);
        assert!(stored.starts_with(&format!("sha256${}$", password::DEFAULT_ITERATIONS)));
        assert!(!password::verify_password("", stored));
        assert_eq!(stored, hash_to_check(None));
        assert_eq!(hash_to_check(Some("sha256$1$00$00")), "sha256$1$00$00");
    }

    #[tokio::test]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn test_unknown_username_is_rejected() {
        let pool = pool().await;
        let username = format!("ghost_{}", uuid::Uuid::new_v4().simple());
        assert!(authenticate(&pool, &username, "icefloe-42").await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn test_create_account_and_authenticate() {
        let pool = pool().await;
        let username = format!("peng_{}", uuid::Uuid::new_v4().simple());

        let user_id = create_account(&pool, &account(&username)).await.unwrap();

        let settings = crate::services::settings::get_settings(&pool, user_id).await.unwrap();
        assert_eq!(settings, Settings::defaults_for(user_id));

        let user = authenticate(&pool, &username, "icefloe-42").await.unwrap().unwrap();
        assert_eq!(user.id, user_id);
        assert!(authenticate(&pool, &username, "wrong-pass").await.unwrap().is_none());

        let duplicate = create_account(&pool, &account(&username)).await;
        assert!(matches!(duplicate, Err(AppError::InvalidInput(msg)) if msg == DUPLICATE_USERNAME));
    }
}
