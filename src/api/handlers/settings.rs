use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    Form,
};

use super::nav_for;
use crate::{
    api::AppState,
    error::AppResult,
    middleware::{CurrentUser, Flash},
    models::forms::SettingsForm,
    services,
    views::{render, SettingsTemplate},
};

pub async fn settings(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Path(user_id): Path<i64>,
) -> AppResult<Html<String>> {
    user.ensure_is(user_id)?;
    let settings = services::settings::get_settings(&state.db_pool, user_id).await?;
    render(&SettingsTemplate {
        nav: nav_for(&state, &mut user).await?,
        settings,
    })
}

pub async fn save_settings(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Path(user_id): Path<i64>,
    Form(form): Form<SettingsForm>,
) -> AppResult<Redirect> {
    user.ensure_is(user_id)?;
    services::settings::save_settings(&state.db_pool, &form.into_settings(user_id)).await?;
    user.flash(&state.sessions, Flash::success("Settings have been updated!"))
        .await?;
    Ok(Redirect::to(&format!("/user/settings/{}", user_id)))
}
