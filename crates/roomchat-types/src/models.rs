use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Integer user id, assigned by the server at registration.
pub type UserId = u64;

/// Full users snapshot as returned by `GET /users`.
pub type UsersSnapshot = HashMap<UserId, User>;

/// Full rooms snapshot as returned by `GET /rooms`, keyed by room name.
pub type RoomsSnapshot = HashMap<String, Room>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// A named room. The name is unique and doubles as the id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
    #[serde(rename = "user_set", alias = "users", default)]
    pub participant_ids: BTreeSet<UserId>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Room {
    /// Empty room with no participants, used when an event names a room
    /// this session has not seen yet.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            participant_ids: BTreeSet::new(),
            messages: Vec::new(),
        }
    }
}

/// One chat line. `user_id` is `None` when the push frame carried a
/// sender id that is not an integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub user_id: Option<UserId>,
    #[serde(rename = "message")]
    pub text: String,
}
