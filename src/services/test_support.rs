//! Postgres fixtures shared by the service tests.

use sqlx::PgPool;

use crate::models::forms::SignUpForm;

pub async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&url).await.unwrap();
    crate::db::run_migrations(&pool).await.unwrap();
    pool
}

/// Signs up `count` fresh users and returns their ids
pub async fn users(pool: &PgPool, count: usize) -> Vec<i64> {
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let account = SignUpForm {
            username: Some(format!("peng_{}", uuid::Uuid::new_v4().simple())),
            first_name: Some("Peng".to_string()),
            last_name: Some("Uin".to_string()),
            email: Some("peng@example.com".to_string()),
            password1: Some("icefloe-42".to_string()),
            password2: Some("icefloe-42".to_string()),
            birthdate: Some("1990-01-01".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        ids.push(
            crate::services::accounts::create_account(pool, &account)
                .await
                .unwrap(),
        );
    }
    ids
}

/// Turns `private_profile` on for `user_id`
pub async fn make_profile_private(pool: &PgPool, user_id: i64) {
    let mut settings = crate::services::settings::get_settings(pool, user_id).await.unwrap();
    settings.private_profile = true;
    crate::services::settings::save_settings(pool, &settings).await.unwrap();
}
