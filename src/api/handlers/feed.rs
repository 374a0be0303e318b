use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
    Form,
};
use serde::Deserialize;

use super::{flash_errors, nav_for};
use crate::{
    api::AppState,
    error::AppResult,
    middleware::CurrentUser,
    models::{
        forms::{CommentForm, PostForm, VoteForm},
        FeedScope, VoteKind,
    },
    services,
    views::{post_views, render, FeedTemplate},
};

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    scope: Option<String>,
}

pub async fn feed(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Query(query): Query<FeedQuery>,
) -> AppResult<Html<String>> {
    let scope = FeedScope::from_query(query.scope.as_deref());
    let posts = services::feed::list_posts(&state.db_pool, scope, user.user_id).await?;
    let entries = services::feed::annotate(&state.db_pool, user.user_id, posts).await?;

    let next = match scope {
        FeedScope::All => "/feed/",
        FeedScope::Following => "/feed/?scope=following",
    };

    render(&FeedTemplate {
        nav: nav_for(&state, &mut user).await?,
        following_only: scope == FeedScope::Following,
        posts: post_views(entries),
        next: next.to_string(),
    })
}

pub async fn create_post(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Form(form): Form<PostForm>,
) -> AppResult<Redirect> {
    match form.validate() {
        Ok(text) => {
            services::feed::create_post(&state.db_pool, user.user_id, &text).await?;
        }
        Err(errors) => flash_errors(&state, &mut user, errors).await?,
    }
    Ok(Redirect::to("/feed/"))
}

pub async fn create_comment(
    State(state): State<AppState>,
    mut user: CurrentUser,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> AppResult<Redirect> {
    match form.validate() {
        Ok(text) => {
            services::feed::create_comment(&state.db_pool, user.user_id, post_id, &text).await?;
        }
        Err(errors) => flash_errors(&state, &mut user, errors).await?,
    }
    Ok(Redirect::to("/feed/"))
}

async fn vote(
    state: &AppState,
    user: &CurrentUser,
    post_id: i64,
    kind: VoteKind,
    form: &VoteForm,
) -> AppResult<Redirect> {
    services::feed::toggle_vote(&state.db_pool, user.user_id, post_id, kind).await?;
    Ok(Redirect::to(&form.redirect_target()))
}

pub async fn upvote(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    Form(form): Form<VoteForm>,
) -> AppResult<Redirect> {
    vote(&state, &user, post_id, VoteKind::Up, &form).await
}

pub async fn downvote(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    Form(form): Form<VoteForm>,
) -> AppResult<Redirect> {
    vote(&state, &user, post_id, VoteKind::Down, &form).await
}
