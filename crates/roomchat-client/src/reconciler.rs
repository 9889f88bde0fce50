//! Per-event policy: a pushed message is always appended; an unknown sender
//! additionally asks for a user repair.
//!
//! Appending never waits on the repair. A renderer may therefore see a
//! message whose author is not in the directory yet and must show
//! [`crate::directory::UNKNOWN_USER`] until the repair lands.

use roomchat_types::frame::PushEvent;

use crate::directory::Directory;

/// Outcome of applying one pushed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub room_name: String,
    pub needs_repair: bool,
}

/// Apply a decoded push event to the directory.
///
/// Unparsed sender ids never ask for a repair since no user can match them.
pub fn reconcile(directory: &mut Directory, event: PushEvent) -> Reconciled {
    let needs_repair = event
        .sender
        .id()
        .is_some_and(|id| !directory.has_user(id));

    let (room_name, message) = event.into_message();
    directory.append_message(&room_name, message);

    Reconciled {
        room_name,
        needs_repair,
    }
}

/// Bookkeeping for user repairs.
///
/// Without coalescing every miss issues its own fetch. With coalescing a
/// miss during an in-flight fetch only marks the gate dirty, and the
/// in-flight fetch is followed by exactly one more; that follow-up covers
/// users registered after the first request left.
#[derive(Debug, Clone, Default)]
pub struct RepairGate {
    coalesce: bool,
    in_flight: bool,
    dirty: bool,
}

impl RepairGate {
    pub fn new(coalesce: bool) -> Self {
        Self {
            coalesce,
            ..Self::default()
        }
    }

    /// Record a miss. Returns true if the caller must start a fetch.
    pub fn request(&mut self) -> bool {
        if !self.coalesce {
            return true;
        }
        if self.in_flight {
            self.dirty = true;
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Record that a fetch finished, successfully or not. Returns true if
    /// the same task must fetch again.
    pub fn complete(&mut self) -> bool {
        if !self.coalesce {
            return false;
        }
        if self.dirty {
            self.dirty = false;
            return true;
        }
        self.in_flight = false;
        false
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }
}
