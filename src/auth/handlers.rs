use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::service::{self, LoginParams, RegisterParams};
use crate::auth::session;
use crate::db::models::UserProfile;
use crate::error::{AppError, AppResult, FieldError};
use crate::extractors::{get_cookie_value, AuthUser};
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// -- Cookie helpers --

fn access_token_cookie(token: &str, max_age_minutes: u64) -> String {
    format!(
        "accessToken={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        token,
        max_age_minutes * 60
    )
}

/// Path-scoped so the refresh token is only ever sent to the refresh route.
fn refresh_token_cookie(token: &str, max_age_days: u64) -> String {
    format!(
        "refreshToken={}; HttpOnly; SameSite=Lax; Path=/auth/refresh; Max-Age={}",
        token,
        max_age_days * 86400
    )
}

fn clear_access_token_cookie() -> String {
    "accessToken=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0".to_string()
}

fn clear_refresh_token_cookie() -> String {
    "refreshToken=; HttpOnly; SameSite=Lax; Path=/auth/refresh; Max-Age=0".to_string()
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

// -- Handlers --

/// POST /auth/register — create an account, a session, and both cookies.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Response> {
    // Checked up front so a mismatch never reaches the hashing path
    if req.password != req.confirm_password {
        return Err(AppError::Validation(vec![FieldError::new(
            "confirmPassword",
            "Passwords do not match",
        )]));
    }

    let outcome = service::register(
        &state.db,
        &state.tokens,
        state.config.auth.refresh_token_days,
        RegisterParams {
            username: req.username,
            email: req.email,
            password: req.password,
            confirm_password: req.confirm_password,
            user_agent: user_agent(&headers),
        },
    )?;

    tracing::info!(user_id = %outcome.user.id, "user registered");

    let body = json!({
        "user": UserProfile::from(&outcome.user),
        "accessToken": outcome.access_token,
    });

    Ok((
        StatusCode::CREATED,
        AppendHeaders([
            (
                header::SET_COOKIE,
                access_token_cookie(&outcome.access_token, state.config.auth.access_token_minutes),
            ),
            (
                header::SET_COOKIE,
                refresh_token_cookie(&outcome.refresh_token, state.config.auth.refresh_token_days),
            ),
        ]),
        Json(body),
    )
        .into_response())
}

/// POST /auth/login — verify credentials, mint a new session + token pair.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> AppResult<Response> {
    let outcome = service::login(
        &state.db,
        &state.tokens,
        state.config.auth.refresh_token_days,
        LoginParams {
            email: req.email,
            password: req.password,
            user_agent: user_agent(&headers),
        },
    )?;

    tracing::info!(user_id = %outcome.user.id, "user logged in");

    let body = json!({
        "message": "Login successful",
        "accessToken": outcome.access_token,
    });

    Ok((
        StatusCode::OK,
        AppendHeaders([
            (
                header::SET_COOKIE,
                access_token_cookie(&outcome.access_token, state.config.auth.access_token_minutes),
            ),
            (
                header::SET_COOKIE,
                refresh_token_cookie(&outcome.refresh_token, state.config.auth.refresh_token_days),
            ),
        ]),
        Json(body),
    )
        .into_response())
}

/// POST /auth/refresh — exchange the refresh cookie for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    request: axum::http::Request<axum::body::Body>,
) -> AppResult<Response> {
    let (parts, _) = request.into_parts();
    let refresh_token = get_cookie_value(&parts, "refreshToken").ok_or(AppError::Unauthorized)?;

    let access_token = service::refresh(&state.db, &state.tokens, refresh_token)?;

    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            access_token_cookie(&access_token, state.config.auth.access_token_minutes),
        )],
        Json(json!({ "accessToken": access_token })),
    )
        .into_response())
}

/// POST /auth/logout — delete the session and clear both cookies.
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    service::logout(&state.db, &user.session_id)?;

    Ok((
        StatusCode::OK,
        AppendHeaders([
            (header::SET_COOKIE, clear_access_token_cookie()),
            (header::SET_COOKIE, clear_refresh_token_cookie()),
        ]),
        Json(json!({ "message": "Logout successful" })),
    )
        .into_response())
}

/// GET /auth/me — the authenticated user's public profile.
pub async fn me(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    let record = service::fetch_user(&state.db, &user.user_id)?;
    // Session must still exist; a logged-out token is no longer valid here
    session::get_active_session(&state.db, &user.session_id)?;

    Ok(Json(json!({ "user": UserProfile::from(&record) })).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_cookie_is_scoped_to_root() {
        let cookie = access_token_cookie("tok", 15);
        assert!(cookie.starts_with("accessToken=tok;"));
        assert!(cookie.contains("Path=/;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=900"));
    }

    #[test]
    fn refresh_cookie_is_scoped_to_refresh_route() {
        let cookie = refresh_token_cookie("tok", 30);
        assert!(cookie.contains("Path=/auth/refresh;"));
        assert!(cookie.contains("Max-Age=2592000"));
    }

    #[test]
    fn clear_cookies_expire_immediately() {
        assert!(clear_access_token_cookie().contains("Max-Age=0"));
        assert!(clear_refresh_token_cookie().contains("Max-Age=0"));
    }
}
