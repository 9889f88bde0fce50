//! Text wire format of the push channel.
//!
//! Server → client (push):  `<sender_user_id>\n<room_name>\n<message_text>`
//! Client → server (send):  `<room_name>\n<message_text>`
//!
//! The message text is whatever follows the last field separator, so text
//! containing further line breaks survives verbatim.

use thiserror::Error;

use crate::models::{Message, UserId};

pub const SEPARATOR: char = '\n';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame is not text")]
    NotText,

    #[error("malformed frame: expected {expected} separators")]
    MissingSeparator { expected: usize },
}

/// Sender field of a push frame. Only a bare decimal id parses; anything
/// else, including a numeric prefix or padding, is kept as `Unparsed` so
/// the message still lands in its room without a wrong author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sender {
    Id(UserId),
    Unparsed(String),
}

impl Sender {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<UserId>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Unparsed(raw.to_string()),
        }
    }

    pub fn id(&self) -> Option<UserId> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Unparsed(_) => None,
        }
    }
}

/// A decoded push frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub sender: Sender,
    pub room_name: String,
    pub text: String,
}

impl PushEvent {
    pub fn decode(payload: &str) -> Result<Self, FrameError> {
        let mut fields = payload.splitn(3, SEPARATOR);
        let (Some(sender), Some(room_name), Some(text)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(FrameError::MissingSeparator { expected: 2 });
        };

        Ok(Self {
            sender: Sender::parse(sender),
            room_name: room_name.to_string(),
            text: text.to_string(),
        })
    }

    /// Server side: prefix a client's send frame with its author.
    pub fn encode(sender_id: UserId, room_name: &str, text: &str) -> String {
        format!("{sender_id}{SEPARATOR}{room_name}{SEPARATOR}{text}")
    }

    pub fn into_message(self) -> (String, Message) {
        let message = Message {
            user_id: self.sender.id(),
            text: self.text,
        };
        (self.room_name, message)
    }
}

/// A frame a client sends to post into a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFrame {
    pub room_name: String,
    pub text: String,
}

impl SendFrame {
    pub fn encode(room_name: &str, text: &str) -> String {
        format!("{room_name}{SEPARATOR}{text}")
    }

    /// Server side: split on the first separator only.
    pub fn decode(payload: &str) -> Result<Self, FrameError> {
        let (room_name, text) = payload
            .split_once(SEPARATOR)
            .ok_or(FrameError::MissingSeparator { expected: 1 })?;

        Ok(Self {
            room_name: room_name.to_string(),
            text: text.to_string(),
        })
    }
}
