use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;

use super::anonymous_nav;
use crate::{
    api::AppState,
    error::{AppError, AppResult},
    middleware::{Flash, Session, SessionData, SessionStore},
    models::forms::{LoginForm, SignUpForm},
    services::{self, accounts::DUPLICATE_USERNAME},
    views::{render, LoginTemplate, ProfileValues, SignUpTemplate},
};

const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Replaces whatever session the browser had with a fresh one for `data`
async fn rotate_session(
    sessions: &SessionStore,
    session: &Session,
    jar: CookieJar,
    data: SessionData,
) -> AppResult<CookieJar> {
    if let Some(old) = &session.id {
        sessions.destroy(old).await?;
    }
    let id = sessions.start(&data).await?;
    Ok(jar.add(sessions.cookie(id)))
}

fn logged_in_session(user_id: i64, username: &str) -> SessionData {
    SessionData {
        user_id: Some(user_id),
        flashes: vec![Flash::success(format!("You are now logged in as {}", username))],
    }
}

pub async fn index(session: Session) -> Redirect {
    if session.user_id().is_some() {
        Redirect::to("/feed/")
    } else {
        Redirect::to("/login/")
    }
}

pub async fn sign_up_page(State(state): State<AppState>, mut session: Session) -> AppResult<Response> {
    let page = SignUpTemplate {
        nav: anonymous_nav(&state, &mut session).await?,
        errors: Vec::new(),
        values: ProfileValues::default(),
    };
    Ok(render(&page)?.into_response())
}

pub async fn sign_up(
    State(state): State<AppState>,
    mut session: Session,
    jar: CookieJar,
    Form(form): Form<SignUpForm>,
) -> AppResult<Response> {
    let errors = match form.validate() {
        Ok(account) => match services::accounts::create_account(&state.db_pool, &account).await {
            Ok(user_id) => {
                let data = SessionData {
                    user_id: Some(user_id),
                    flashes: vec![Flash::success("Successfully signed up!")],
                };
                let jar = rotate_session(&state.sessions, &session, jar, data).await?;
                return Ok((jar, Redirect::to("/")).into_response());
            }
            Err(AppError::InvalidInput(msg)) if msg == DUPLICATE_USERNAME => vec![msg],
            Err(e) => return Err(e),
        },
        Err(errors) => errors.messages(),
    };

    let page = SignUpTemplate {
        nav: anonymous_nav(&state, &mut session).await?,
        errors,
        values: ProfileValues::from(&form),
    };
    Ok(render(&page)?.into_response())
}

pub async fn login_page(State(state): State<AppState>, mut session: Session) -> AppResult<Response> {
    let page = LoginTemplate {
        nav: anonymous_nav(&state, &mut session).await?,
        errors: Vec::new(),
        username: String::new(),
    };
    Ok(render(&page)?.into_response())
}

pub async fn login(
    State(state): State<AppState>,
    mut session: Session,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let errors = match form.validate() {
        Ok((username, password)) => {
            match services::accounts::authenticate(&state.db_pool, &username, &password).await? {
                Some(user) => {
                    tracing::info!(user_id = user.id, "Logged in");
                    let data = logged_in_session(user.id, &user.username);
                    let jar = rotate_session(&state.sessions, &session, jar, data).await?;
                    return Ok((jar, Redirect::to("/")).into_response());
                }
                None => vec![BAD_CREDENTIALS.to_string()],
            }
        }
        Err(errors) => errors.messages(),
    };

    let page = LoginTemplate {
        nav: anonymous_nav(&state, &mut session).await?,
        errors,
        username: form.username.unwrap_or_default(),
    };
    Ok(render(&page)?.into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
) -> AppResult<(CookieJar, Redirect)> {
    if let Some(user_id) = session.user_id() {
        tracing::info!(user_id = user_id, "Logged out");
    }

    let data = SessionData {
        user_id: None,
        flashes: vec![Flash::info("Logged out successfully!")],
    };
    let jar = rotate_session(&state.sessions, &session, jar, data).await?;
    Ok((jar, Redirect::to("/")))
}
