use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use super::handlers::{accounts, feed, playlists, profile, settings, spotify};
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(account_routes())
        .merge(feed_routes())
        .merge(user_routes())
        .merge(playlist_routes())
        .merge(spotify_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        // Outermost, so the trace span already sees the id
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(accounts::index))
        .route("/signup/", get(accounts::sign_up_page).post(accounts::sign_up))
        .route("/login/", get(accounts::login_page).post(accounts::login))
        .route("/logout/", get(accounts::logout))
}

fn feed_routes() -> Router<AppState> {
    Router::new()
        .route("/feed/", get(feed::feed))
        .route("/feed/post/", post(feed::create_post))
        .route("/feed/post/:post_id/comment/", post(feed::create_comment))
        .route("/feed/post/:post_id/upvote/", post(feed::upvote))
        .route("/feed/post/:post_id/downvote/", post(feed::downvote))
}

/// Profiles, follows and settings
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/profile/:user_id", get(profile::profile))
        .route(
            "/user/update_profile/",
            get(profile::update_profile_page).post(profile::update_profile),
        )
        .route("/user/following/:user_id", get(profile::following))
        .route("/user/followers/:user_id", get(profile::followers))
        .route("/user/follow/:user_id/:who", post(profile::follow))
        .route("/user/unfollow/:user_id/:who", post(profile::unfollow))
        .route("/user/list/", get(profile::user_list))
        .route("/user/settings/:user_id", get(settings::settings))
        .route("/user/settings/:user_id/save/", post(settings::save_settings))
}

fn playlist_routes() -> Router<AppState> {
    Router::new()
        .route("/user/playlists/:user_id", get(playlists::own_playlists))
        .route("/user/playlists/create/", post(playlists::create_playlist))
        .route("/user/otherplaylists/:user_id", get(playlists::other_playlists))
        .route("/user/playlist/:playlist_id", get(playlists::single_playlist))
        .route(
            "/user/otherplaylist/:user_id/:playlist_id",
            get(playlists::other_single_playlist),
        )
        .route(
            "/user/playlist/add_song/",
            get(playlists::add_song_page).post(playlists::add_song),
        )
        .route(
            "/user/playlist/edit/",
            get(playlists::edit_playlist_page).post(playlists::edit_playlist),
        )
        .route("/user/playlist/:playlist_id/delete/", post(playlists::delete_playlist))
        .route(
            "/user/playlist/:playlist_id/song/:song_id/delete/",
            post(playlists::delete_song),
        )
}

fn spotify_routes() -> Router<AppState> {
    Router::new()
        .route("/spotify/link/", get(spotify::link))
        .route("/spotify/callback/", get(spotify::callback))
        .route("/user/playlist/:playlist_id/export/", post(spotify::export))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
