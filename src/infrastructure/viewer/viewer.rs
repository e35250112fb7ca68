use crate::core::EntityId;

/// Identity of the authenticated caller for the lifetime of one request
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerContext {
    pub user_id: EntityId,
    pub username: String,
    pub request_id: String,
}

impl ViewerContext {
    pub fn new(user_id: EntityId, username: impl Into<String>, request_id: impl Into<String>) -> Self {
        ViewerContext {
            user_id,
            username: username.into(),
            request_id: request_id.into(),
        }
    }
}
