//! Client error types.

use thiserror::Error;

use crate::session::SessionState;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{path} returned {status}")]
    Status { path: String, status: u16 },

    /// Sends are rejected, not queued, unless the channel is open.
    #[error("push channel is not open (state: {state:?})")]
    ChannelNotOpen { state: SessionState },

    #[error("invalid config: {reason}")]
    Config { reason: String },

    /// Names must be non-empty and free of the frame separator.
    #[error("invalid user name: {name:?}")]
    InvalidName { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ClientError::Status { path: "/users".into(), status: 401 };
        assert_eq!(err.to_string(), "/users returned 401");

        let err = ClientError::ChannelNotOpen { state: SessionState::Closed };
        assert_eq!(err.to_string(), "push channel is not open (state: Closed)");

        let err = ClientError::InvalidName { name: "a\nb".into() };
        assert_eq!(err.to_string(), "invalid user name: \"a\\nb\"");
    }
}
