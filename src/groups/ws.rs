use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::groups::GroupRegistry;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn subscribe(
    Path(group_id): Path<i64>,
    State(registry): State<Arc<GroupRegistry>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |stream| subscriber_loop(registry, group_id, stream))
}

/// One task per live subscription. The receiver registered here is the
/// subscription: dropping it on any exit path below is what unsubscribes,
/// so a disconnect racing a broadcast needs no extra handling.
async fn subscriber_loop(registry: Arc<GroupRegistry>, group_id: i64, stream: WebSocket) {
    let group = registry.group(group_id).await;
    let mut rx = group.subscribers.subscribe();
    let (mut sender, mut receiver) = stream.split();
    debug!(group_id, "subscriber connected");

    let mut forward = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(payload) => {
                    if sender.send(Message::from(payload)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(group_id, skipped, "slow subscriber missed broadcasts");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Inbound frames only keep the connection alive.
    loop {
        tokio::select! {
            frame = receiver.next() => {
                if !matches!(frame, Some(Ok(_))) {
                    break;
                }
            }
            _ = &mut forward => break,
        }
    }

    forward.abort();
    debug!(group_id, "subscriber disconnected");
}
