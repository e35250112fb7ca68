// Post handlers

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

pub async fn add_post(State(state): State<AppState>, vc: Vc, form: MultipartForm) -> AppResult<impl IntoResponse> {
    let post = state
        .posts
        .create_post(
            vc.user_id,
            form.text("content").unwrap_or_default(),
            &form.files("media"),
        )
        .await?;
    Ok(ApiResponse::created(post, "Post created successfully"))
}

pub async fn update_post(State(state): State<AppState>, vc: Vc, form: MultipartForm) -> AppResult<impl IntoResponse> {
    let post_id = parse_id_text(form.text("postId"), "postId")?;
    let update = ContentUpdate {
        content: form.text("content").map(str::to_string),
        remove_media: form.texts("removeMedia"),
    };

    let outcome = state
        .posts
        .update_post(vc.user_id, post_id, update, &form.files("media"))
        .await?;
    Ok(ApiResponse::ok(outcome.value, "Post updated successfully").with_warnings(outcome.warnings))
}

pub async fn delete_post(
    State(state): State<AppState>,
    vc: Vc,
    AppJson(body): AppJson<Value>,
) -> AppResult<impl IntoResponse> {
    let post_id = parse_id(body.get("postId"), "postId")?;
    let outcome = state.posts.delete_post(vc.user_id, post_id).await?;
    Ok(ApiResponse::ok(json!({}), "Post deleted successfully").with_warnings(outcome.warnings))
}

pub async fn list_posts(
    State(state): State<AppState>,
    vc: OptionalVc,
    AppPath(username): AppPath<String>,
    AppQuery(page): AppQuery<PageRequest>,
) -> AppResult<impl IntoResponse> {
    let posts = state
        .feed
        .list_posts_by_user(&username, vc.user_id(), page)
        .await?;
    Ok(ApiResponse::ok(posts, "Posts fetched successfully"))
}
