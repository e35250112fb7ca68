// Reply handlers

use axum::{extract::State, response::IntoResponse};
use serde_json::{json, Value};

use crate::api::extract::{AppJson, AppPath, AppQuery};
use crate::api::uploads::MultipartForm;
use crate::api::{parse_id, parse_id_text, ApiResponse};
use crate::app_state::AppState;
use crate::error::AppResult;
use crate::infrastructure::middleware::{OptionalVc, Vc};
use crate::models::PageRequest;
use crate::services::post_service::ContentUpdate;

pub async fn add_reply(State(state): State<AppState>, vc: Vc, form: MultipartForm) -> AppResult<impl IntoResponse> {
    let post_id = parse_id_text(form.text("postId"), "postId")?;
    let reply = state
        .replies
        .create_reply(
            vc.user_id,
            post_id,
            form.text("content").unwrap_or_default(),
            &form.files("media"),
        )
        .await?;
    Ok(ApiResponse::created(reply, "Reply added successfully"))
}

pub async fn update_reply(State(state): State<AppState>, vc: Vc, form: MultipartForm) -> AppResult<impl IntoResponse> {
    let reply_id = parse_id_text(form.text("replyId"), "replyId")?;
    let update = ContentUpdate {
        content: form.text("content").map(str::to_string),
        remove_media: form.texts("removeMedia"),
    };

    let outcome = state
        .replies
        .update_reply(vc.user_id, reply_id, update, &form.files("media"))
        .await?;
    Ok(ApiResponse::ok(outcome.value, "Reply updated successfully").with_warnings(outcome.warnings))
}

pub async fn delete_reply(
    State(state): State<AppState>,
    vc: Vc,
    AppJson(body): AppJson<Value>,
) -> AppResult<impl IntoResponse> {
    let reply_id = parse_id(body.get("replyId"), "replyId")?;
    let outcome = state.replies.delete_reply(vc.user_id, reply_id).await?;
    Ok(ApiResponse::ok(json!({}), "Reply deleted successfully").with_warnings(outcome.warnings))
}

pub async fn list_replies(
    State(state): State<AppState>,
    vc: OptionalVc,
    AppPath(post_id): AppPath<String>,
    AppQuery(page): AppQuery<PageRequest>,
) -> AppResult<impl IntoResponse> {
    let post_id = parse_id_text(Some(&post_id), "postId")?;
    let replies = state.feed.list_replies(post_id, vc.user_id(), page).await?;
    Ok(ApiResponse::ok(replies, "Replies fetched successfully"))
}
