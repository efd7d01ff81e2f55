//! Reconciles local edits with the remote shared drawing.
//!
//! An editing surface debounces outbound writes: every mutation replaces the
//! pending write and pushes its deadline [`DEBOUNCE_SECS`] into the future, so
//! only the latest state inside a window is ever sent. A read-only surface
//! subscribes once and hands every received drawing back through [`SyncCoordinator::pump`].
//!
//! Nothing here spawns threads. In-flight backend futures run on a
//! single-threaded pool that the UI loop drives by calling `pump` each frame.

mod backend;
mod relay;

pub use backend::{RemoteDrawing, Subscription, SyncBackend, SyncWrite, UpdateCallback};
pub use relay::{LocalRelay, StoredDrawing};

use futures::channel::mpsc::{self, UnboundedReceiver};
use futures::executor::LocalPool;
use futures::future::BoxFuture;
use futures::task::LocalSpawnExt;
use log::{debug, warn};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use crate::document::DrawingState;
use crate::error::{CanvasError, CanvasResult};
use crate::snapshot;
use crate::util::time;

/// Quiet period after the last mutation before a write is sent
pub const DEBOUNCE_SECS: f64 = 0.5;

/// Source of "now" in seconds
pub type Clock = Box<dyn Fn() -> f64>;

/// Whether a surface writes the shared drawing or only follows it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Editor,
    Viewer,
}

impl Role {
    pub fn from_editable(editable: bool) -> Self {
        if editable { Role::Editor } else { Role::Viewer }
    }
}

struct PendingWrite {
    due: f64,
    write: SyncWrite,
}

enum Channel {
    Outbound {
        pending: Option<PendingWrite>,
    },
    Inbound {
        inbox: UnboundedReceiver<RemoteDrawing>,
        _subscription: Subscription,
    },
}

pub struct SyncCoordinator {
    session_id: String,
    participant_id: String,
    backend: Arc<dyn SyncBackend>,
    channel: Channel,
    clock: Clock,
    pool: LocalPool,
    in_flight: Rc<Cell<usize>>,
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("session_id", &self.session_id)
            .field("role", &self.role())
            .field("in_flight", &self.in_flight.get())
            .finish()
    }
}

impl SyncCoordinator {
    /// Create the coordinator for one surface. Viewers subscribe immediately.
    pub fn new(
        session_id: impl Into<String>,
        participant_id: impl Into<String>,
        role: Role,
        backend: Arc<dyn SyncBackend>,
    ) -> Self {
        let session_id = session_id.into();
        let channel = match role {
            Role::Editor => Channel::Outbound { pending: None },
            Role::Viewer => {
                let (tx, inbox) = mpsc::unbounded();
                let subscription = backend.subscribe_to_updates(
                    &session_id,
                    Box::new(move |update| {
                        // Receiver gone means the surface was torn down
                        let _ = tx.unbounded_send(update);
                    }),
                );
                Channel::Inbound {
                    inbox,
                    _subscription: subscription,
                }
            }
        };

        Self {
            session_id,
            participant_id: participant_id.into(),
            backend,
            channel,
            clock: Box::new(time::current_time_secs),
            pool: LocalPool::new(),
            in_flight: Rc::new(Cell::new(0)),
        }
    }

    /// Replace the time source used for debouncing
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn role(&self) -> Role {
        match self.channel {
            Channel::Outbound { .. } => Role::Editor,
            Channel::Inbound { .. } => Role::Viewer,
        }
    }

    /// Replace any pending write with the current state and restart the window
    pub fn schedule(&mut self, state: &DrawingState) -> CanvasResult<()> {
        let Channel::Outbound { pending } = &mut self.channel else {
            return Err(CanvasError::ReadOnly);
        };

        let write = SyncWrite {
            session_id: self.session_id.clone(),
            serialized_state: snapshot::encode(state.paths())?,
            editor_id: self.participant_id.clone(),
            background_color: state.background().hex(),
            width: state.width(),
            height: state.height(),
        };
        let due = (self.clock)() + DEBOUNCE_SECS;
        if pending.replace(PendingWrite { due, write }).is_some() {
            debug!("Coalesced pending write for session {}", self.session_id);
        }
        Ok(())
    }

    /// Fire-and-forget activity notification
    pub fn record_activity(&mut self) {
        let future = self.backend.record_activity(&self.session_id);
        let session_id = self.session_id.clone();
        self.spawn(async move {
            if let Err(e) = future.await {
                warn!("Failed to record activity for session {}: {}", session_id, e);
            }
        });
    }

    /// Drive the coordinator from the UI loop.
    ///
    /// Dispatches a write whose window has elapsed, advances in-flight
    /// futures and returns drawings received since the last call.
    pub fn pump(&mut self) -> Vec<RemoteDrawing> {
        let now = (self.clock)();
        let mut received = Vec::new();

        let due = match &mut self.channel {
            Channel::Outbound { pending } => match pending.take() {
                Some(p) if p.due <= now => Some(p.write),
                waiting => {
                    *pending = waiting;
                    None
                }
            },
            Channel::Inbound { inbox, .. } => {
                while let Ok(update) = inbox.try_recv() {
                    received.push(update);
                }
                None
            }
        };
        if let Some(write) = due {
            self.dispatch(write);
        }

        self.pool.run_until_stalled();
        received
    }

    /// Send the pending write now instead of waiting out the window
    pub fn flush(&mut self) {
        let pending = match &mut self.channel {
            Channel::Outbound { pending } => pending.take(),
            Channel::Inbound { .. } => None,
        };
        if let Some(PendingWrite { write, .. }) = pending {
            self.dispatch(write);
        }
        self.pool.run_until_stalled();
    }

    fn dispatch(&mut self, write: SyncWrite) {
        debug!(
            "Syncing session {} ({} bytes)",
            write.session_id,
            write.serialized_state.len()
        );
        let session_id = write.session_id.clone();
        let future = self.backend.sync_drawing(write);
        let in_flight = self.in_flight.clone();
        in_flight.set(in_flight.get() + 1);

        self.spawn(async move {
            let result = future.await;
            in_flight.set(in_flight.get() - 1);
            if let Err(e) = result {
                // Local state stays authoritative; the next write carries everything
                warn!("Sync of session {} failed: {}", session_id, e);
            }
        });
    }

    fn spawn(&mut self, task: impl std::future::Future<Output = ()> + 'static) {
        if let Err(e) = self.pool.spawner().spawn_local(task) {
            warn!("Failed to spawn sync task: {}", e);
        }
    }

    /// A write is on its way to the backend
    pub fn is_syncing(&self) -> bool {
        self.in_flight.get() > 0
    }

    pub fn has_pending_write(&self) -> bool {
        matches!(self.channel, Channel::Outbound { pending: Some(_) })
    }

    /// Seconds until the pending write is due, for scheduling a repaint
    pub fn time_until_due(&self) -> Option<f64> {
        match &self.channel {
            Channel::Outbound { pending: Some(p) } => Some((p.due - (self.clock)()).max(0.0)),
            _ => None,
        }
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        if self.has_pending_write() {
            debug!("Dropping surface with an unsent write for session {}", self.session_id);
        }
    }
}

/// Box a backend future the way [`SyncBackend`] expects
pub fn boxed<F>(future: F) -> BoxFuture<'static, CanvasResult<()>>
where
    F: std::future::Future<Output = CanvasResult<()>> + Send + 'static,
{
    Box::pin(future)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathRecord;
    use crate::tool::BackgroundColor;
    use egui::Color32;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        writes: Mutex<Vec<SyncWrite>>,
        activity: Mutex<u32>,
        listener: Mutex<Option<UpdateCallback>>,
    }

    impl SyncBackend for RecordingBackend {
        fn sync_drawing(&self, write: SyncWrite) -> BoxFuture<'static, CanvasResult<()>> {
            self.writes.lock().push(write);
            boxed(async { Ok(()) })
        }

        fn subscribe_to_updates(&self, _session_id: &str, on_update: UpdateCallback) -> Subscription {
            *self.listener.lock() = Some(on_update);
            Subscription::detached()
        }

        fn record_activity(&self, _session_id: &str) -> BoxFuture<'static, CanvasResult<()>> {
            *self.activity.lock() += 1;
            boxed(async { Ok(()) })
        }
    }

    fn manual_clock() -> (Rc<Cell<f64>>, Clock) {
        let now = Rc::new(Cell::new(100.0));
        let reader = now.clone();
        (now, Box::new(move || reader.get()))
    }

    #[test]
    fn test_writes_are_debounced_to_latest_state() {
        let backend = Arc::new(RecordingBackend::default());
        let (now, clock) = manual_clock();
        let mut sync = SyncCoordinator::new("s1", "alice", Role::Editor, backend.clone())
            .with_clock(clock);

        let mut state = DrawingState::new(BackgroundColor::Black, 300, 300);
        for i in 0..3 {
            state.add_path(PathRecord::new(Color32::RED, 2.0, format!("M{i} {i}")));
            sync.schedule(&state).unwrap();
            now.set(now.get() + 0.1);
            sync.pump();
        }
        assert!(backend.writes.lock().is_empty());

        now.set(now.get() + DEBOUNCE_SECS);
        sync.pump();

        let writes = backend.writes.lock();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].serialized_state, snapshot::encode(state.paths()).unwrap());
        assert_eq!(writes[0].background_color, "#000000");
        assert_eq!((writes[0].width, writes[0].height), (300, 300));
        assert_eq!(writes[0].editor_id, "alice");
    }

    #[test]
    fn test_viewer_cannot_schedule() {
        let backend = Arc::new(RecordingBackend::default());
        let mut sync = SyncCoordinator::new("s1", "bob", Role::Viewer, backend.clone());
        let state = DrawingState::new(BackgroundColor::White, 10, 10);

        assert!(matches!(sync.schedule(&state), Err(CanvasError::ReadOnly)));
        sync.flush();
        assert!(backend.writes.lock().is_empty());
    }

    #[test]
    fn test_viewer_drains_every_update_per_pump() {
        let backend = Arc::new(RecordingBackend::default());
        let mut sync = SyncCoordinator::new("s1", "bob", Role::Viewer, backend.clone());
        assert!(sync.pump().is_empty());

        for i in 0..3 {
            let listener = backend.listener.lock();
            let deliver = listener.as_ref().unwrap();
            deliver(RemoteDrawing {
                serialized_state: format!("update {i}"),
                background_color: None,
            });
        }

        let received = sync.pump();
        assert_eq!(received.len(), 3);
        assert_eq!(received[2].serialized_state, "update 2");
        assert!(sync.pump().is_empty());
    }

    #[test]
    fn test_record_activity_runs_on_pump() {
        let backend = Arc::new(RecordingBackend::default());
        let mut sync = SyncCoordinator::new("s1", "alice", Role::Editor, backend.clone());
        sync.record_activity();
        sync.pump();
        assert_eq!(*backend.activity.lock(), 1);
    }
}
