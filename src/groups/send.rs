use std::sync::Arc;

use axum::{
    debug_handler,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::directory::GroupDirectory;
use crate::groups::log::Draft;
use crate::groups::topic::TopicStore;
use crate::groups::GroupRegistry;
use crate::{AppResult, Decline};

#[derive(Deserialize)]
pub(crate) struct SendMessage {
    user_id: i64,
    message: String,
}

/// Accepts a message for the author's group. The reply goes out only after
/// the broker write is durable; delivery itself is the group consumer's
/// job.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn send_message(
    State(directory): State<Arc<GroupDirectory>>,
    State(registry): State<Arc<GroupRegistry>>,
    State(topic): State<TopicStore>,
    Json(SendMessage { user_id, message }): Json<SendMessage>,
) -> AppResult<Response> {
    let Some(user) = directory.resolve(user_id) else {
        return Ok(Decline::InvalidUser.into_response());
    };

    let draft = Draft {
        user_id: user.user_id,
        name: user.name.clone(),
        group_id: user.group_id,
        message,
        can_edit: user.can_edit,
        can_delete: user.can_delete,
    };
    let seq = topic.publish(&draft).await?;
    registry.group(user.group_id).await.topic_signal.notify_one();
    debug!(group_id = user.group_id, seq, "message accepted");

    Ok(Json(json!({ "status": "Message sent", "group_id": user.group_id })).into_response())
}
