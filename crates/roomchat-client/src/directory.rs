//! The session's local copy of users and rooms.

use roomchat_types::models::{Message, Room, RoomsSnapshot, User, UserId, UsersSnapshot};

/// Shown in place of an author whose user record has not arrived yet.
pub const UNKNOWN_USER: &str = "Unknown user";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    users: UsersSnapshot,
    rooms: RoomsSnapshot,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every user with `batch`. Users missing from the batch are gone.
    pub fn upsert_users(&mut self, batch: UsersSnapshot) {
        self.users = batch;
    }

    /// Replace every room with `batch`, message logs included. Only safe
    /// before any pushed message has been appended.
    pub fn upsert_rooms(&mut self, batch: RoomsSnapshot) {
        self.rooms = batch;
    }

    /// Append to the end of a room's log, creating the room if unknown.
    pub fn append_message(&mut self, room_name: &str, message: Message) {
        self.rooms
            .entry(room_name.to_string())
            .or_insert_with(|| Room::empty(room_name))
            .messages
            .push(message);
    }

    pub fn has_user(&self, id: UserId) -> bool {
        self.users.contains_key(&id)
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn get_room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn users(&self) -> &UsersSnapshot {
        &self.users
    }

    pub fn rooms(&self) -> &RoomsSnapshot {
        &self.rooms
    }

    pub fn room_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rooms.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Display name for a message's author, or [`UNKNOWN_USER`].
    pub fn author_name(&self, message: &Message) -> &str {
        message
            .user_id
            .and_then(|id| self.user(id))
            .map_or(UNKNOWN_USER, |user| user.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn user(id: UserId, name: &str) -> (UserId, User) {
        (id, User { id, name: name.into() })
    }

    fn msg(user_id: UserId, text: &str) -> Message {
        Message { user_id: Some(user_id), text: text.into() }
    }

    #[test]
    fn upsert_users_replaces_instead_of_merging() {
        let mut dir = Directory::new();
        dir.upsert_users(HashMap::from([user(1, "a"), user(2, "b"), user(3, "c")]));
        dir.upsert_users(HashMap::from([user(2, "b")]));

        assert!(!dir.has_user(1));
        assert!(dir.has_user(2));
        assert!(!dir.has_user(3));
        assert_eq!(dir.users().len(), 1);
    }

    #[test]
    fn upsert_rooms_replaces_instead_of_merging() {
        let mut dir = Directory::new();
        dir.upsert_rooms(HashMap::from([
            ("a".to_string(), Room::empty("a")),
            ("b".to_string(), Room::empty("b")),
        ]));
        dir.upsert_rooms(HashMap::from([("b".to_string(), Room::empty("b"))]));

        assert_eq!(dir.room_names(), vec!["b"]);
    }

    #[test]
    fn append_creates_unknown_room() {
        let mut dir = Directory::new();
        dir.append_message("new", msg(4, "first"));

        let room = dir.get_room("new").unwrap();
        assert_eq!(room.name, "new");
        assert!(room.participant_ids.is_empty());
        assert_eq!(room.messages, vec![msg(4, "first")]);
    }

    #[test]
    fn append_keeps_arrival_order() {
        let mut dir = Directory::new();
        dir.append_message("lobby", msg(1, "one"));
        dir.append_message("other", msg(2, "x"));
        dir.append_message("lobby", msg(2, "two"));
        dir.append_message("lobby", msg(1, "three"));

        let texts: Vec<&str> = dir
            .get_room("lobby")
            .unwrap()
            .messages
            .iter()
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn author_name_falls_back_to_placeholder() {
        let mut dir = Directory::new();
        dir.upsert_users(HashMap::from([user(7, "Ada")]));

        assert_eq!(dir.author_name(&msg(7, "hi")), "Ada");
        assert_eq!(dir.author_name(&msg(9, "hi")), UNKNOWN_USER);
        let unparsed = Message { user_id: None, text: "hi".into() };
        assert_eq!(dir.author_name(&unparsed), UNKNOWN_USER);
    }
}
