use tokio::sync::{mpsc, watch};
use tracing::trace;

use roomchat_types::frame::SendFrame;

use crate::error::ClientError;
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the channel writer. Nothing confirms delivery.
    Sent,
    /// Empty text or no room: nothing was transmitted.
    Skipped,
}

/// Handle for posting into rooms over the push channel.
///
/// Sends are never echoed into the local directory; a message shows up
/// only once the server pushes it back.
#[derive(Debug, Clone)]
pub struct OutboundSender {
    tx: mpsc::UnboundedSender<String>,
    state: watch::Receiver<SessionState>,
}

impl OutboundSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<String>, state: watch::Receiver<SessionState>) -> Self {
        Self { tx, state }
    }

    pub fn send(&self, room_name: Option<&str>, text: &str) -> Result<SendOutcome, ClientError> {
        let Some(room_name) = room_name else {
            return Ok(SendOutcome::Skipped);
        };
        if text.is_empty() {
            return Ok(SendOutcome::Skipped);
        }

        let state = *self.state.borrow();
        if state != SessionState::Open {
            return Err(ClientError::ChannelNotOpen { state });
        }

        self.tx
            .send(SendFrame::encode(room_name, text))
            .map_err(|_| ClientError::ChannelNotOpen {
                state: SessionState::Closed,
            })?;

        trace!("queued send to {}", room_name);
        Ok(SendOutcome::Sent)
    }
}
