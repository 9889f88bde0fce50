//! Client-side state synchronization for roomchat.
//!
//! [`SyncEngine`] bootstraps a [`Directory`] from snapshot queries, keeps it
//! current from the push channel and posts messages back over it.

pub mod config;
pub mod directory;
pub mod error;
pub mod reconciler;
pub mod sender;
pub mod session;
pub mod snapshot;

pub use config::{ClientConfig, Identity};
pub use directory::Directory;
pub use error::ClientError;
pub use sender::{OutboundSender, SendOutcome};
pub use session::{SessionState, SyncEngine};
pub use snapshot::{HttpSnapshotLoader, SnapshotSource, register};
