//! Push-channel lifecycle and the engine that owns the directory.
//!
//! `Idle → Connecting → Open → Closed`, with no way back from `Closed`.
//! The snapshot bootstrap runs while still `Idle` and the channel is only
//! dialled afterwards, so anything pushed between the end of the bootstrap
//! and `Open` is never seen by this session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, RwLock, RwLockReadGuard, mpsc, watch};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use roomchat_types::frame::{FrameError, PushEvent};
use roomchat_types::models::UserId;

use crate::config::ClientConfig;
use crate::directory::Directory;
use crate::error::ClientError;
use crate::reconciler::{RepairGate, reconcile};
use crate::sender::{OutboundSender, SendOutcome};
use crate::snapshot::SnapshotSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

/// Everything mutated under the engine's single write lock.
struct EngineState {
    directory: Directory,
    repairs: RepairGate,
}

/// Client-side synchronization engine.
///
/// Cheap to clone; clones share one directory. All directory writes go
/// through one lock: inbound frames from the channel's reader task in
/// delivery order, and user repairs from their own tasks whenever they
/// finish.
pub struct SyncEngine<S: SnapshotSource> {
    inner: Arc<EngineInner<S>>,
}

impl<S: SnapshotSource> Clone for SyncEngine<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct EngineInner<S> {
    config: ClientConfig,
    snapshots: S,
    state: RwLock<EngineState>,
    /// Bumped after every directory mutation.
    revision: watch::Sender<u64>,
    session: watch::Sender<SessionState>,
    /// Claimed by the first `start`; the bootstrap runs while still `Idle`.
    started: AtomicBool,
    outbound_tx: mpsc::UnboundedSender<String>,
    /// Taken by the writer task when the channel opens.
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

impl<S: SnapshotSource> SyncEngine<S> {
    pub fn new(config: ClientConfig, snapshots: S) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let repairs = RepairGate::new(config.coalesce_repairs);

        Self {
            inner: Arc::new(EngineInner {
                config,
                snapshots,
                state: RwLock::new(EngineState {
                    directory: Directory::new(),
                    repairs,
                }),
                revision: watch::channel(0).0,
                session: watch::channel(SessionState::Idle).0,
                started: AtomicBool::new(false),
                outbound_tx,
                outbound_rx: Mutex::new(Some(outbound_rx)),
            }),
        }
    }

    pub fn session_id(&self) -> UserId {
        self.inner.config.session_id
    }

    pub fn state(&self) -> SessionState {
        *self.inner.session.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.inner.session.subscribe()
    }

    /// Changes whenever the directory does.
    pub fn watch_revision(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Read-only view of the directory. Holding it blocks inbound frames.
    pub async fn directory(&self) -> RwLockReadGuard<'_, Directory> {
        RwLockReadGuard::map(self.inner.state.read().await, |s| &s.directory)
    }

    /// Resolve once `pred` holds for the directory.
    pub async fn wait_for<F>(&self, mut pred: F)
    where
        F: FnMut(&Directory) -> bool,
    {
        let mut revision = self.watch_revision();
        loop {
            if pred(&*self.directory().await) {
                return;
            }
            if revision.changed().await.is_err() {
                return;
            }
        }
    }

    pub async fn repair_in_flight(&self) -> bool {
        self.inner.state.read().await.repairs.in_flight()
    }

    pub fn sender(&self) -> OutboundSender {
        OutboundSender::new(self.inner.outbound_tx.clone(), self.watch_state())
    }

    /// Post `text` into `room_name`. See [`OutboundSender::send`].
    pub fn send(&self, room_name: Option<&str>, text: &str) -> Result<SendOutcome, ClientError> {
        self.sender().send(room_name, text)
    }

    /// Load rooms, then users. Failures leave that half of the directory as it was.
    pub async fn bootstrap(&self) {
        match self.inner.snapshots.fetch_rooms().await {
            Ok(rooms) => {
                info!("bootstrap: {} rooms", rooms.len());
                self.inner.state.write().await.directory.upsert_rooms(rooms);
                self.bump_revision();
            }
            Err(e) => warn!("bootstrap: room snapshot failed: {}", e),
        }

        match self.inner.snapshots.fetch_users().await {
            Ok(users) => {
                info!("bootstrap: {} users", users.len());
                self.inner.state.write().await.directory.upsert_users(users);
                self.bump_revision();
            }
            Err(e) => warn!("bootstrap: user snapshot failed: {}", e),
        }
    }

    /// Bootstrap, then dial the push channel. Returns the state reached,
    /// `Open` or `Closed`. Only the first call on an engine does anything;
    /// later calls return the current state, which may still be `Idle`.
    pub async fn start(&self) -> SessionState {
        let state = self.state();
        if state != SessionState::Idle || self.inner.started.swap(true, Ordering::AcqRel) {
            warn!("session {} already started ({:?})", self.session_id(), state);
            return state;
        }

        self.bootstrap().await;

        self.set_state(SessionState::Connecting);
        let url = self.inner.config.channel_url();
        match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((ws, _)) => self.attach(ws).await,
            Err(e) => {
                warn!("push channel {} failed to open: {}", url, e);
                self.set_state(SessionState::Closed);
            }
        }

        self.state()
    }

    /// Run the session over an already-connected transport.
    pub async fn attach<T>(&self, ws: WebSocketStream<T>)
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        if self.state() == SessionState::Closed {
            warn!("session {} is closed, not reattaching", self.session_id());
            return;
        }
        let Some(mut outbound_rx) = self.inner.outbound_rx.lock().await.take() else {
            warn!("session {} already had a channel", self.session_id());
            return;
        };

        let (mut sink, mut stream) = ws.split();
        self.set_state(SessionState::Open);

        let mut send_task = tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = sink.send(Message::text(frame)).await {
                    warn!("push channel write failed: {}", e);
                    break;
                }
            }
        });

        let engine = self.clone();
        let mut recv_task = tokio::spawn(async move {
            while let Some(result) = stream.next().await {
                let frame = match result {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("push channel read failed: {}", e);
                        break;
                    }
                };
                match frame {
                    Message::Text(_) | Message::Binary(_) => {
                        if let Err(e) = engine.ingest(&frame).await {
                            debug!("dropped frame: {}", e);
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });

        let engine = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = &mut send_task => recv_task.abort(),
                _ = &mut recv_task => send_task.abort(),
            }
            engine.set_state(SessionState::Closed);
        });
    }

    /// Apply one inbound frame. Rejected frames leave the directory untouched.
    pub async fn ingest(&self, frame: &Message) -> Result<(), FrameError> {
        let Message::Text(payload) = frame else {
            return Err(FrameError::NotText);
        };
        let event = PushEvent::decode(payload.as_str())?;

        let start_repair = {
            let mut state = self.inner.state.write().await;
            let reconciled = reconcile(&mut state.directory, event);
            if reconciled.needs_repair {
                debug!("unknown sender in {}, repairing users", reconciled.room_name);
            }
            reconciled.needs_repair && state.repairs.request()
        };
        self.bump_revision();

        if start_repair {
            self.spawn_repair();
        }
        Ok(())
    }

    /// Fire-and-forget user refresh. Failures are logged and not retried.
    fn spawn_repair(&self) {
        let engine = self.clone();
        tokio::spawn(async move {
            loop {
                let result = engine.inner.snapshots.fetch_users().await;
                let again = {
                    let mut state = engine.inner.state.write().await;
                    match result {
                        Ok(users) => {
                            debug!("user repair: {} users", users.len());
                            state.directory.upsert_users(users);
                        }
                        Err(e) => warn!("user repair failed: {}", e),
                    }
                    state.repairs.complete()
                };
                engine.bump_revision();

                if !again {
                    break;
                }
            }
        });
    }

    fn bump_revision(&self) {
        self.inner.revision.send_modify(|r| *r += 1);
    }

    fn set_state(&self, next: SessionState) {
        let prev = self.inner.session.send_replace(next);
        if prev != next {
            info!("session {}: {:?} -> {:?}", self.session_id(), prev, next);
        }
    }
}
