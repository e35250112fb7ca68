// Like handler - body names exactly one of postId / replyId

use axum::{extract::State, response::IntoResponse};
use serde_json::Value;

use crate::api::extract::AppJson;
use crate::api::{parse_id, ApiResponse};
use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::infrastructure::middleware::Vc;
use crate::models::LikeTarget;

fn like_target(body: &Value) -> AppResult<LikeTarget> {
    match (body.get("postId"), body.get("replyId")) {
        (Some(post), None) => Ok(LikeTarget::Post(parse_id(Some(post), "postId")?)),
        (None, Some(reply)) => Ok(LikeTarget::Reply(parse_id(Some(reply), "replyId")?)),
        _ => Err(AppError::Validation(
            "Exactly one of postId or replyId is required".to_string(),
        )),
    }
}

pub async fn toggle_like(
    State(state): State<AppState>,
    vc: Vc,
    AppJson(body): AppJson<Value>,
) -> AppResult<impl IntoResponse> {
    let target = like_target(&body)?;
    let like = state.likes.toggle_like(vc.user_id, target).await?;
    let message = if like.liked { "Liked" } else { "Like removed" };
    Ok(ApiResponse::ok(like, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EntityId;
    use serde_json::json;

    #[test]
    fn test_like_target_selection() {
        assert_eq!(like_target(&json!({"postId": "5"})).unwrap(), LikeTarget::Post(EntityId(5)));
        assert_eq!(like_target(&json!({"replyId": 6})).unwrap(), LikeTarget::Reply(EntityId(6)));
        assert!(like_target(&json!({"postId": "5", "replyId": "6"})).is_err());
        assert!(like_target(&json!({})).is_err());
    }
}
