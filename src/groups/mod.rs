pub mod log;
pub mod mutate;
pub mod send;
pub mod subscribers;
pub mod topic;
mod ws;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use tokio::sync::{Mutex, Notify, RwLock};

use crate::directory::{GroupDirectory, User};
use crate::groups::log::{Message, MessageLog};
use crate::groups::subscribers::SubscriberRegistry;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send-message/", post(send::send_message))
        .route("/messages/{group_id}", get(list_messages))
        .route("/edit-message/{message_id}", put(mutate::edit_message))
        .route("/delete-message/{message_id}", delete(mutate::delete_message))
        .route("/subscribe/{group_id}", get(ws::subscribe))
        .route("/users/", get(list_users))
}

/// Everything one group owns: its ordered log, its live subscribers, and
/// the signal its publisher uses to wake the group's consumer task.
///
/// The log mutex is the serialization point for all per-group mutation:
/// appends come from the consumer task, edits and deletes from
/// [`mutate`]. Nothing here is ever shared across groups.
pub struct GroupState {
    pub log: Mutex<MessageLog>,
    pub subscribers: SubscriberRegistry,
    pub topic_signal: Notify,
}

impl GroupState {
    fn new() -> Self {
        Self {
            log: Mutex::new(MessageLog::new()),
            subscribers: SubscriberRegistry::new(),
            topic_signal: Notify::new(),
        }
    }
}

/// Process-wide map of live groups. A group springs into existence the
/// first time anything references its id and is never torn down.
pub struct GroupRegistry {
    groups: RwLock<HashMap<i64, Arc<GroupState>>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self { groups: RwLock::new(HashMap::new()) }
    }

    /// Group-scoped handle, creating the group on first reference.
    pub async fn group(&self, group_id: i64) -> Arc<GroupState> {
        if let Some(state) = self.groups.read().await.get(&group_id) {
            return state.clone();
        }
        self.groups
            .write()
            .await
            .entry(group_id)
            .or_insert_with(|| Arc::new(GroupState::new()))
            .clone()
    }

    pub async fn get(&self, group_id: i64) -> Option<Arc<GroupState>> {
        self.groups.read().await.get(&group_id).cloned()
    }

    pub async fn snapshot(&self) -> Vec<(i64, Arc<GroupState>)> {
        self.groups
            .read()
            .await
            .iter()
            .map(|(id, state)| (*id, state.clone()))
            .collect()
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[debug_handler(state = crate::AppState)]
async fn list_messages(
    Path(group_id): Path<i64>,
    State(registry): State<Arc<GroupRegistry>>,
) -> Json<Vec<Message>> {
    match registry.get(group_id).await {
        Some(group) => Json(group.log.lock().await.messages().to_vec()),
        None => Json(Vec::new()),
    }
}

#[debug_handler(state = crate::AppState)]
async fn list_users(State(directory): State<Arc<GroupDirectory>>) -> Json<Vec<User>> {
    Json(directory.users().to_vec())
}
