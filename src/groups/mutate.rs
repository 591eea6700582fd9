use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::groups::log::Message;
use crate::groups::GroupRegistry;
use crate::Decline;

/// Mutations are an explicit two-step protocol: the log changes first,
/// under the group's lock, and only a successful change is broadcast. They
/// bypass the broker entirely, so an edit can overtake a not-yet-consumed
/// append for the same group.
///
/// The message is located by id across all groups, as ids are only unique
/// per group: finding the id somewhere without an author match is a
/// permission decline, never finding it at all is not-found.
pub async fn edit(
    registry: &GroupRegistry,
    message_id: i64,
    user_id: i64,
    new_text: &str,
) -> Result<Message, Decline> {
    let mut id_seen = false;
    for (group_id, group) in registry.snapshot().await {
        let outcome = group.log.lock().await.edit(message_id, user_id, new_text);
        match outcome {
            Ok(msg) => {
                group
                    .subscribers
                    .broadcast(serde_json::to_string(&msg).expect("message serializes"));
                debug!(group_id, id = msg.id, "message edited");
                return Ok(msg);
            }
            Err(Decline::NotFound) => {}
            Err(_) => id_seen = true,
        }
    }
    Err(if id_seen { Decline::NotPermitted } else { Decline::NotFound })
}

pub async fn delete(
    registry: &GroupRegistry,
    message_id: i64,
    user_id: i64,
) -> Result<Message, Decline> {
    let mut id_seen = false;
    for (group_id, group) in registry.snapshot().await {
        let outcome = group.log.lock().await.delete(message_id, user_id);
        match outcome {
            Ok(msg) => {
                group
                    .subscribers
                    .broadcast(json!({ "id": msg.id, "deleted": true }).to_string());
                debug!(group_id, id = msg.id, "message deleted");
                return Ok(msg);
            }
            Err(Decline::NotFound) => {}
            Err(_) => id_seen = true,
        }
    }
    Err(if id_seen { Decline::NotPermitted } else { Decline::NotFound })
}

#[derive(Deserialize)]
pub(crate) struct EditQuery {
    user_id: i64,
    new_text: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn edit_message(
    Path(message_id): Path<i64>,
    State(registry): State<Arc<GroupRegistry>>,
    Query(EditQuery { user_id, new_text }): Query<EditQuery>,
) -> Response {
    match edit(&registry, message_id, user_id, &new_text).await {
        Ok(_) => Json(json!({ "status": "Message edited" })).into_response(),
        Err(decline) => decline.into_response(),
    }
}

#[derive(Deserialize)]
pub(crate) struct DeleteQuery {
    user_id: i64,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_message(
    Path(message_id): Path<i64>,
    State(registry): State<Arc<GroupRegistry>>,
    Query(DeleteQuery { user_id }): Query<DeleteQuery>,
) -> Response {
    match delete(&registry, message_id, user_id).await {
        Ok(_) => Json(json!({ "status": "Message deleted" })).into_response(),
        Err(decline) => decline.into_response(),
    }
}
