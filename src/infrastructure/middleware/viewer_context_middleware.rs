// ViewerContext Middleware - Resolves the caller from the access token
// Injects Arc<ViewerContext> into request extensions when the token is valid

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::infrastructure::viewer::ViewerContext;
use crate::services::auth_service::AuthService;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Application state that can authenticate access tokens
pub trait HasAuthService {
    fn auth_service(&self) -> &AuthService;
}

/// Anonymous requests pass through untouched; handlers decide whether they need a viewer
pub async fn viewer_context_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> Response
where
    T: HasAuthService + Clone + Send + Sync + 'static,
{
    if let Some(token) = extract_access_token(request.headers()) {
        match app_state.auth_service().authenticate(&token).await {
            Ok(user) => {
                let request_id = format!("req-{}", Uuid::new_v4());
                let viewer = ViewerContext::new(user.id, user.username, request_id);
                request.extensions_mut().insert(Arc::new(viewer));
            }
            Err(err) => debug!("Ignoring access token: {}", err),
        }
    }

    next.run(request).await
}

/// Cookie first, then `Authorization: Bearer`
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    read_cookie(headers, ACCESS_TOKEN_COOKIE).or_else(|| bearer_token(headers))
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
