use serde::{Deserialize, Serialize};

use crate::Decline;

/// An accepted message as it sits on a group's topic, before the group
/// consumer has assigned it an id. Author name and permission flags are
/// denormalized here at accept time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Draft {
    pub user_id: i64,
    pub name: String,
    pub group_id: i64,
    pub message: String,
    pub can_edit: bool,
    pub can_delete: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub group_id: i64,
    pub message: String,
    pub can_edit: bool,
    pub can_delete: bool,
}

/// Append-only ordered log of one group's messages.
///
/// Ids come from a per-group counter that only ever moves forward, so a
/// deleted message's id is never reissued to a later append. Assignment
/// happens here, under the log's lock, which is also what keeps two
/// concurrent appends from racing on the same id.
pub struct MessageLog {
    next_id: i64,
    entries: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self { next_id: 1, entries: Vec::new() }
    }

    pub fn append(&mut self, draft: Draft) -> Message {
        let msg = Message {
            id: self.next_id,
            user_id: draft.user_id,
            name: draft.name,
            group_id: draft.group_id,
            message: draft.message,
            can_edit: draft.can_edit,
            can_delete: draft.can_delete,
        };
        self.next_id += 1;
        self.entries.push(msg.clone());
        msg
    }

    /// Only the author may edit, and only when the message carries
    /// `can_edit`. Returns the updated message for broadcast.
    pub fn edit(&mut self, message_id: i64, user_id: i64, new_text: &str) -> Result<Message, Decline> {
        let msg = self
            .entries
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(Decline::NotFound)?;
        if msg.user_id != user_id || !msg.can_edit {
            return Err(Decline::NotPermitted);
        }
        msg.message = new_text.to_owned();
        Ok(msg.clone())
    }

    /// Removes the entry entirely; the log keeps no tombstone, so the
    /// sequence may have id gaps afterwards.
    pub fn delete(&mut self, message_id: i64, user_id: i64) -> Result<Message, Decline> {
        let idx = self
            .entries
            .iter()
            .position(|m| m.id == message_id)
            .ok_or(Decline::NotFound)?;
        if self.entries[idx].user_id != user_id || !self.entries[idx].can_delete {
            return Err(Decline::NotPermitted);
        }
        Ok(self.entries.remove(idx))
    }

    pub fn messages(&self) -> &[Message] {
        &self.entries
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}
