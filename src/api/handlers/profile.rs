use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};

use super::{followed_ids, nav_for};
use crate::{
    api::AppState,
    error::AppResult,
    middleware::{CurrentUser, Flash},
    models::{forms::UpdateProfileForm, ProfileSummary},
    services::{self, profiles::FOLLOWING_PREVIEW},
    views::{
        post_views, render, ProfileTemplate, ProfileValues, ProfileView, UpdateProfileTemplate,
        UserListTemplate, UserRow,
    },
};

pub async fn profile(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Path(user_id): Path<i64>,
) -> AppResult<Html<String>> {
    let pool = &state.db_pool;
    let details = services::profiles::get_details(pool, user_id).await?;

    let is_own = user.is(user_id);
    let is_following = !is_own && services::profiles::is_following(pool, user.user_id, user_id).await?;
    let posts_hidden = !services::profiles::posts_visible_to(pool, user_id, user.user_id).await?;

    let posts = if posts_hidden {
        Vec::new()
    } else {
        let posts = services::feed::posts_by_profile(pool, user_id).await?;
        post_views(services::feed::annotate(pool, user.user_id, posts).await?)
    };

    let follower_list = services::profiles::following(pool, user_id, Some(FOLLOWING_PREVIEW))
        .await?
        .into_iter()
        .map(|summary| UserRow::new(summary, false))
        .collect();

    render(&ProfileTemplate {
        nav: nav_for(&state, &mut user).await?,
        profile: ProfileView::from(details),
        is_own,
        is_following,
        posts_hidden,
        posts,
        follower_list,
        next: format!("/user/profile/{}", user_id),
    })
}

pub async fn update_profile_page(
    State(state): State<AppState>,
    mut user: CurrentUser,
) -> AppResult<Html<String>> {
    let details = services::profiles::get_details(&state.db_pool, user.user_id).await?;
    render(&UpdateProfileTemplate {
        nav: nav_for(&state, &mut user).await?,
        errors: Vec::new(),
        values: ProfileValues::from_details(&details),
    })
}

pub async fn update_profile(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Form(form): Form<UpdateProfileForm>,
) -> AppResult<Response> {
    match form.validate() {
        Ok(update) => {
            services::profiles::update_profile(&state.db_pool, user.user_id, &update).await?;
            user.flash(&state.sessions, Flash::success("Profile has been updated!"))
                .await?;
            Ok(Redirect::to("/user/update_profile/").into_response())
        }
        Err(errors) => {
            let page = render(&UpdateProfileTemplate {
                nav: nav_for(&state, &mut user).await?,
                errors: errors.messages(),
                values: ProfileValues::from(&form),
            })?;
            Ok(page.into_response())
        }
    }
}

/// Renders a list of users, marking the ones the viewer follows
async fn user_list_page(
    state: &AppState,
    user: &mut CurrentUser,
    heading: String,
    empty_message: &str,
    users: Vec<ProfileSummary>,
) -> AppResult<Html<String>> {
    let followed = followed_ids(state, user.user_id).await?;
    let users = users
        .into_iter()
        .map(|summary| {
            let is_followed = followed.contains(&summary.user_id);
            UserRow::new(summary, is_followed)
        })
        .collect();

    render(&UserListTemplate {
        nav: nav_for(state, user).await?,
        heading,
        empty_message: empty_message.to_string(),
        users,
    })
}

pub async fn following(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Path(user_id): Path<i64>,
) -> AppResult<Html<String>> {
    let owner = services::profiles::get_summary(&state.db_pool, user_id).await?;
    let users = services::profiles::following(&state.db_pool, user_id, None).await?;
    user_list_page(
        &state,
        &mut user,
        format!("{} is following", owner.username),
        "Not following anyone yet.",
        users,
    )
    .await
}

pub async fn followers(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Path(user_id): Path<i64>,
) -> AppResult<Html<String>> {
    let owner = services::profiles::get_summary(&state.db_pool, user_id).await?;
    let users = services::profiles::followers(&state.db_pool, user_id).await?;
    user_list_page(
        &state,
        &mut user,
        format!("Followers of {}", owner.username),
        "No followers yet.",
        users,
    )
    .await
}

pub async fn user_list(State(state): State<AppState>, mut user: CurrentUser) -> AppResult<Html<String>> {
    let users = services::profiles::list_except(&state.db_pool, user.user_id).await?;
    user_list_page(&state, &mut user, "People".to_string(), "Nobody else is here yet.", users).await
}

pub async fn follow(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((user_id, who)): Path<(i64, i64)>,
) -> AppResult<Redirect> {
    user.ensure_is(user_id)?;
    services::profiles::follow(&state.db_pool, user_id, who).await?;
    Ok(Redirect::to(&format!("/user/following/{}", user_id)))
}

pub async fn unfollow(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((user_id, who)): Path<(i64, i64)>,
) -> AppResult<Redirect> {
    user.ensure_is(user_id)?;
    services::profiles::unfollow(&state.db_pool, user_id, who).await?;
    Ok(Redirect::to(&format!("/user/following/{}", user_id)))
}
