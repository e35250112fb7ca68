// ViewerContext Extractors - `Vc` for protected handlers, `OptionalVc` for public ones

use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use crate::core::EntityId;
use crate::error::AppError;
use crate::infrastructure::viewer::ViewerContext;

/// Authenticated viewer. Extraction fails with 401 when the request carries no valid access token.
///
/// Derefs to `ViewerContext`, so handlers read `vc.user_id` directly.
#[derive(Debug, Clone)]
pub struct Vc(Arc<ViewerContext>);

impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let vc = parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .map(|vc| Vc(vc.clone()))
            .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()));

        async move { vc }
    }
}

/// Viewer if one was resolved, anonymous otherwise. Never rejects.
#[derive(Debug, Clone, Default)]
pub struct OptionalVc(pub Option<Arc<ViewerContext>>);

impl OptionalVc {
    pub fn user_id(&self) -> Option<EntityId> {
        self.0.as_ref().map(|vc| vc.user_id)
    }
}

impl<S> FromRequestParts<S> for OptionalVc
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let vc = OptionalVc(parts.extensions.get::<Arc<ViewerContext>>().cloned());
        async move { Ok(vc) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_vc_extraction() {
        let viewer = Arc::new(ViewerContext::new(EntityId(7), "alice", "req-1"));
        let (mut parts, _) = Request::builder()
            .extension(viewer.clone())
            .body(())
            .unwrap()
            .into_parts();

        let vc = Vc::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(vc.user_id, EntityId(7));
        assert_eq!(vc.username, "alice");

        let optional = OptionalVc::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(optional.user_id(), Some(EntityId(7)));
    }

    #[tokio::test]
    async fn test_missing_viewer_is_unauthorized() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();

        let rejection = Vc::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(rejection, AppError::Unauthorized(_)));

        let optional = OptionalVc::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(optional.user_id(), None);
    }
}
