use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use crate::groups::log::Draft;
use crate::groups::GroupState;

/// The durable per-group topics, all living in one SQLite store.
///
/// A row's autoincrement `seq` is the broker's ordering; the insert
/// completing is the broker acknowledgment the caller waits for before
/// reporting "sent". The pool doubles as the long-lived publisher handle,
/// so no connection is opened per publish.
#[derive(Clone)]
pub struct TopicStore {
    pool: SqlitePool,
}

impl TopicStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS topic_messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id INTEGER NOT NULL,
                payload TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS topic_messages_group
             ON topic_messages (group_id, seq)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS consumer_offsets (
                group_id INTEGER PRIMARY KEY,
                last_seq INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Appends an accepted draft to its group's topic, returning the
    /// broker-assigned sequence number once the write is durable.
    pub async fn publish(&self, draft: &Draft) -> anyhow::Result<i64> {
        let payload = serde_json::to_string(draft)?;
        let result = sqlx::query("INSERT INTO topic_messages (group_id, payload) VALUES (?, ?)")
            .bind(draft.group_id)
            .bind(&payload)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn fetch_after(&self, group_id: i64, seq: i64) -> Result<Vec<(i64, String)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT seq, payload FROM topic_messages
             WHERE group_id = ? AND seq > ? ORDER BY seq",
        )
        .bind(group_id)
        .bind(seq)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn committed(&self, group_id: i64) -> Result<i64, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT last_seq FROM consumer_offsets WHERE group_id = ?")
                .bind(group_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(seq,)| seq).unwrap_or(0))
    }

    async fn commit(&self, group_id: i64, seq: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO consumer_offsets (group_id, last_seq) VALUES (?, ?)
             ON CONFLICT (group_id) DO UPDATE SET last_seq = excluded.last_seq",
        )
        .bind(group_id)
        .bind(seq)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// One group's consumer: drains the topic in broker order, appends each
/// message to the group log, fans it out, then commits the offset. Runs for
/// the life of the process; a broker I/O error ends delivery for this group
/// until the process is restarted.
pub async fn run_consumer(store: TopicStore, group_id: i64, group: Arc<GroupState>) {
    let mut last_seq = match store.committed(group_id).await {
        Ok(seq) => seq,
        Err(err) => {
            error!(group_id, %err, "consumer failed to read committed offset");
            return;
        }
    };
    info!(group_id, last_seq, "group consumer started");

    loop {
        let rows = match store.fetch_after(group_id, last_seq).await {
            Ok(rows) => rows,
            Err(err) => {
                error!(group_id, %err, "consumer read failed, group delivery stopped");
                return;
            }
        };

        if rows.is_empty() {
            group.topic_signal.notified().await;
            continue;
        }

        for (seq, payload) in rows {
            match serde_json::from_str::<Draft>(&payload) {
                Ok(draft) => {
                    let msg = group.log.lock().await.append(draft);
                    let reached = group
                        .subscribers
                        .broadcast(serde_json::to_string(&msg).expect("message serializes"));
                    debug!(group_id, id = msg.id, reached, "delivered message");
                }
                Err(err) => {
                    // Skip the row rather than wedge the whole topic on it.
                    warn!(group_id, seq, %err, "unreadable topic payload");
                }
            }
            if let Err(err) = store.commit(group_id, seq).await {
                error!(group_id, seq, %err, "offset commit failed, group delivery stopped");
                return;
            }
            last_seq = seq;
        }
    }
}
