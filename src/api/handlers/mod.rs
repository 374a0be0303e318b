//! Request handlers, one module per area of the site.
//!
//! Handlers stay thin: extract, call into `services`, then render a page
//! or redirect. Errors bubble up as [`AppError`](crate::error::AppError).

use std::collections::HashSet;

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    middleware::{CurrentUser, Flash, Session},
    models::forms::FormErrors,
    services,
    views::NavContext,
};

pub mod accounts;
pub mod feed;
pub mod playlists;
pub mod profile;
pub mod settings;
pub mod spotify;

/// Nav bar for a logged-in user; drains their pending flashes
pub(crate) async fn nav_for(state: &AppState, user: &mut CurrentUser) -> AppResult<NavContext> {
    let account = services::accounts::find_user(&state.db_pool, user.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let prefs = services::settings::settings_or_default(&state.db_pool, user.user_id).await?;

    Ok(NavContext {
        logged_in: true,
        user_id: user.user_id,
        username: account.username,
        flashes: user.take_flashes(&state.sessions).await?,
        light_mode: prefs.light_mode,
    })
}

/// Nav bar for pages reachable without logging in
pub(crate) async fn anonymous_nav(state: &AppState, session: &mut Session) -> AppResult<NavContext> {
    Ok(NavContext::anonymous(session.take_flashes(&state.sessions).await?))
}

/// Ids of the users `viewer` follows
pub(crate) async fn followed_ids(state: &AppState, viewer: i64) -> AppResult<HashSet<i64>> {
    let followed = services::profiles::following(&state.db_pool, viewer, None).await?;
    Ok(followed.into_iter().map(|u| u.user_id).collect())
}

/// Queues every form error as an error flash
pub(crate) async fn flash_errors(
    state: &AppState,
    user: &mut CurrentUser,
    errors: FormErrors,
) -> AppResult<()> {
    for message in errors.messages() {
        user.flash(&state.sessions, Flash::error(message)).await?;
    }
    Ok(())
}
