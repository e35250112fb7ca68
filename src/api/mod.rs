// HTTP surface - routes under /api/v1, envelopes, cookies and multipart staging

pub mod cookies;
pub mod extract;
pub mod followers;
pub mod likes;
pub mod posts;
pub mod replies;
pub mod response;
pub mod uploads;
pub mod users;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::app_state::AppState;
use crate::config::MediaProvider;
use crate::core::EntityId;
use crate::error::{AppError, AppResult};
use crate::infrastructure::middleware::viewer_context_middleware;

pub use response::ApiResponse;

const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let users = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        .route("/change-password", post(users::change_password))
        .route("/refreshtokens", post(users::refresh_tokens))
        .route("/update-avatar", patch(users::update_avatar))
        .route("/update-coverImage", patch(users::update_cover_image))
        .route("/update-user", patch(users::update_account))
        .route("/{username}", get(users::get_user_profile));

    let posts = Router::new()
        .route("/add", post(posts::add_post))
        .route("/update", patch(posts::update_post))
        .route("/delete", delete(posts::delete_post))
        .route("/{username}", get(posts::list_posts));

    let replies = Router::new()
        .route("/add", post(replies::add_reply))
        .route("/update", patch(replies::update_reply))
        .route("/delete", delete(replies::delete_reply))
        .route("/{post_id}", get(replies::list_replies));

    let likes = Router::new().route("/toggle-like", post(likes::toggle_like));

    let followers = Router::new()
        .route("/toggle-follow", post(followers::toggle_follow))
        .route("/get-followers", get(followers::get_followers))
        .route("/get-following", get(followers::get_following));

    let api = Router::new()
        .nest("/users", users)
        .nest("/posts", posts)
        .nest("/replies", replies)
        .nest("/likes", likes)
        .nest("/followers", followers)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            viewer_context_middleware::<AppState>,
        ));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api);

    if state.config.media.provider == MediaProvider::Local {
        app = app.nest_service("/media", ServeDir::new(&state.config.media.local_dir));
    }

    app.layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(state.config.server.cors_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Cookies need credentialed CORS, which requires an explicit origin
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => CorsLayer::very_permissive()
            .allow_origin(origin)
            .allow_credentials(true),
        Some(Err(_)) => {
            warn!("CORS_ORIGIN is not a valid header value, allowing any origin");
            CorsLayer::permissive()
        }
        None => CorsLayer::permissive(),
    }
}

async fn health_check(State(state): State<AppState>) -> AppResult<ApiResponse<Value>> {
    state.db.health_check().await?;
    Ok(ApiResponse::ok(json!({ "status": "healthy" }), "OK"))
}

/// Ids arrive as JSON strings, JSON numbers or form text
pub(crate) fn parse_id(raw: Option<&Value>, field: &str) -> AppResult<EntityId> {
    let invalid = || AppError::Validation(format!("{} is required and must be a valid id", field));
    match raw {
        Some(Value::String(text)) => text.parse().map_err(|_| invalid()),
        Some(Value::Number(number)) => number
            .as_i64()
            .filter(|id| *id > 0)
            .map(EntityId)
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

pub(crate) fn parse_id_text(raw: Option<&str>, field: &str) -> AppResult<EntityId> {
    parse_id(raw.map(|text| Value::String(text.to_string())).as_ref(), field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_accepts_strings_and_numbers() {
        assert_eq!(parse_id(Some(&json!("42")), "postId").unwrap(), EntityId(42));
        assert_eq!(parse_id(Some(&json!(42)), "postId").unwrap(), EntityId(42));
        assert!(parse_id(Some(&json!("abc")), "postId").is_err());
        assert!(parse_id(Some(&json!(-1)), "postId").is_err());
        assert!(parse_id(None, "postId").is_err());
        assert_eq!(parse_id_text(Some("7"), "replyId").unwrap(), EntityId(7));
    }
}
