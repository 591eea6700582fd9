use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One row of the fixed user table. Permission flags travel with every
/// message the user posts (denormalized at accept time, never re-derived).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub name: String,
    pub group_id: i64,
    pub can_edit: bool,
    pub can_delete: bool,
}

/// Static user/group/permission table, defined once at process start.
pub struct GroupDirectory {
    users: Vec<User>,
}

impl GroupDirectory {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let users: Vec<User> = serde_json::from_str(raw)?;
        Ok(Self { users })
    }

    /// Loads the table from `USERS_FILE` if set, else the embedded default.
    pub fn load() -> anyhow::Result<Self> {
        match dotenv::var("USERS_FILE") {
            Ok(path) => Self::from_json(&std::fs::read_to_string(path)?),
            Err(_) => Self::from_json(include_str!("../users.json")),
        }
    }

    pub fn resolve(&self, user_id: i64) -> Option<&User> {
        self.users.iter().find(|u| u.user_id == user_id)
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Distinct groups in the table; consumers are started for exactly these.
    pub fn group_ids(&self) -> BTreeSet<i64> {
        self.users.iter().map(|u| u.group_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> GroupDirectory {
        GroupDirectory::from_json(include_str!("../users.json")).unwrap()
    }

    #[test]
    fn resolves_known_users() {
        let dir = directory();
        let alice = dir.resolve(1).unwrap();
        assert_eq!(alice.name, "Alice");
        assert_eq!(alice.group_id, 1);
        assert!(alice.can_edit);
        assert!(!alice.can_delete);
    }

    #[test]
    fn unknown_user_is_none() {
        assert!(directory().resolve(99).is_none());
    }

    #[test]
    fn group_ids_are_distinct() {
        let ids: Vec<i64> = directory().group_ids().into_iter().collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn rejects_malformed_table() {
        assert!(GroupDirectory::from_json("{\"nope\":1}").is_err());
    }
}
