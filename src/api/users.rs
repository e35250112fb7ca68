// User handlers - registration, sessions and account maintenance

use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::api::cookies::{clear_session_cookies, session_cookies};
use crate::api::extract::{AppJson, AppPath};
use crate::api::uploads::MultipartForm;
use crate::api::ApiResponse;
use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::infrastructure::middleware::{bearer_token, read_cookie, OptionalVc, Vc, REFRESH_TOKEN_COOKIE};
use crate::models::AccountChanges;
use crate::services::{Registration, Session};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub dob: Option<NaiveDate>,
}

fn session_response(state: &AppState, session: Session, message: &str) -> impl IntoResponse {
    let cookies = session_cookies(&session.tokens, state.auth.tokens(), state.config.auth.cookie_secure);
    let body = ApiResponse::ok(
        json!({
            "user": session.user,
            "accessToken": session.tokens.access_token,
            "refreshToken": session.tokens.refresh_token,
        }),
        message,
    );
    (cookies, body)
}

pub async fn register(State(state): State<AppState>, form: MultipartForm) -> AppResult<impl IntoResponse> {
    let field = |name: &str| form.text(name).unwrap_or_default().to_string();

    let registration = Registration {
        username: field("username"),
        email: field("email"),
        password: field("password"),
        full_name: field("fullName"),
    };
    let session = state
        .auth
        .register(registration, form.file("avatar"), form.file("coverImage"))
        .await?;

    Ok(session_response(&state, session, "User created successfully"))
}

pub async fn login(State(state): State<AppState>, AppJson(req): AppJson<LoginRequest>) -> AppResult<impl IntoResponse> {
    let session = state
        .auth
        .login(
            req.username.as_deref(),
            req.email.as_deref(),
            req.password.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(session_response(&state, session, "Logged in successfully"))
}

pub async fn logout(State(state): State<AppState>, vc: Vc) -> AppResult<impl IntoResponse> {
    state.auth.logout(vc.user_id).await?;
    Ok((
        clear_session_cookies(state.config.auth.cookie_secure),
        ApiResponse::ok(json!({}), "Logged out successfully"),
    ))
}

/// Refresh token from the cookie, or from `Authorization: Bearer`
pub async fn refresh_tokens(State(state): State<AppState>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    let presented = read_cookie(&headers, REFRESH_TOKEN_COOKIE).or_else(|| bearer_token(&headers));
    let session = state.auth.refresh(presented.as_deref()).await?;
    Ok(session_response(&state, session, "Tokens refreshed"))
}

pub async fn change_password(
    State(state): State<AppState>,
    vc: Vc,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> AppResult<ApiResponse<serde_json::Value>> {
    state
        .auth
        .change_password(
            vc.user_id,
            req.current_password.as_deref().unwrap_or_default(),
            req.new_password.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(ApiResponse::ok(json!({}), "Password updated successfully"))
}

pub async fn update_account(
    State(state): State<AppState>,
    vc: Vc,
    AppJson(req): AppJson<UpdateAccountRequest>,
) -> AppResult<impl IntoResponse> {
    let user = state
        .users
        .update_account(
            vc.user_id,
            AccountChanges {
                username: req.username,
                email: req.email,
                full_name: req.full_name,
                bio: req.bio,
                dob: req.dob,
            },
        )
        .await?;
    Ok(ApiResponse::ok(user, "Account details updated"))
}

pub async fn update_avatar(
    State(state): State<AppState>,
    vc: Vc,
    form: MultipartForm,
) -> AppResult<impl IntoResponse> {
    let outcome = state.users.update_avatar(vc.user_id, form.file("avatar")).await?;
    Ok(ApiResponse::ok(outcome.value, "Avatar updated").with_warnings(outcome.warnings))
}

pub async fn update_cover_image(
    State(state): State<AppState>,
    vc: Vc,
    form: MultipartForm,
) -> AppResult<impl IntoResponse> {
    let outcome = state
        .users
        .update_cover_image(vc.user_id, form.file("coverImage"))
        .await?;
    Ok(ApiResponse::ok(outcome.value, "Cover image updated").with_warnings(outcome.warnings))
}

pub async fn get_user_profile(
    State(state): State<AppState>,
    vc: OptionalVc,
    AppPath(username): AppPath<String>,
) -> AppResult<impl IntoResponse> {
    if username.trim().is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    let profile = state.feed.get_user_profile(&username, vc.user_id()).await?;
    Ok(ApiResponse::ok(profile, "User details fetched successfully"))
}
