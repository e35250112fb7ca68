// Follow handlers

use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::Value;

use crate::api::extract::{AppJson, AppQuery};
use crate::api::{parse_id, parse_id_text, ApiResponse};
use crate::app_state::AppState;
use crate::error::AppResult;
use crate::infrastructure::middleware::Vc;
use crate::models::pagination::{DEFAULT_LIMIT, DEFAULT_PAGE};
use crate::models::PageRequest;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowListQuery {
    pub user_id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl FollowListQuery {
    fn page_request(&self) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(DEFAULT_PAGE),
            self.limit.unwrap_or(DEFAULT_LIMIT),
        )
    }
}

/// `isFollowing` in the body is accepted and ignored; the stored edge decides
pub async fn toggle_follow(
    State(state): State<AppState>,
    vc: Vc,
    AppJson(body): AppJson<Value>,
) -> AppResult<impl IntoResponse> {
    let target = parse_id(body.get("userId"), "userId")?;
    let follow = state.relationships.toggle_follow(vc.user_id, target).await?;
    let message = if follow.is_following { "Followed" } else { "Unfollowed" };
    Ok(ApiResponse::ok(follow, message))
}

pub async fn get_followers(
    State(state): State<AppState>,
    vc: Vc,
    AppQuery(query): AppQuery<FollowListQuery>,
) -> AppResult<impl IntoResponse> {
    let user = parse_id_text(query.user_id.as_deref(), "userId")?;
    let followers = state
        .relationships
        .list_followers(user, vc.user_id, query.page_request())
        .await?;
    Ok(ApiResponse::ok(followers, "Followers fetched successfully"))
}

pub async fn get_following(
    State(state): State<AppState>,
    vc: Vc,
    AppQuery(query): AppQuery<FollowListQuery>,
) -> AppResult<impl IntoResponse> {
    let user = parse_id_text(query.user_id.as_deref(), "userId")?;
    let following = state
        .relationships
        .list_following(user, vc.user_id, query.page_request())
        .await?;
    Ok(ApiResponse::ok(following, "Following fetched successfully"))
}
