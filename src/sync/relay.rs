use futures::future::BoxFuture;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::backend::{RemoteDrawing, Subscription, SyncBackend, SyncWrite, UpdateCallback};
use super::boxed;
use crate::error::{CanvasError, CanvasResult};

/// Latest version of a shared drawing held by the relay
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDrawing {
    pub serialized_state: String,
    pub editor_id: String,
    pub background_color: String,
    pub width: u32,
    pub height: u32,
    pub revision: u64,
}

#[derive(Default)]
struct RelayInner {
    documents: HashMap<String, StoredDrawing>,
    subscribers: HashMap<Uuid, (String, Arc<dyn Fn(RemoteDrawing) + Send + Sync>)>,
    activity: HashMap<String, u32>,
    offline: bool,
}

/// In-process shared document store.
///
/// Pairs an editing surface with read-only surfaces in the same process;
/// writes are delivered to subscribers synchronously. Can be switched
/// offline to exercise transport failures.
#[derive(Clone, Default)]
pub struct LocalRelay {
    inner: Arc<Mutex<RelayInner>>,
}

impl std::fmt::Debug for LocalRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("LocalRelay")
            .field("documents", &inner.documents.len())
            .field("subscribers", &inner.subscribers.len())
            .field("offline", &inner.offline)
            .finish()
    }
}

impl LocalRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    pub fn is_offline(&self) -> bool {
        self.inner.lock().offline
    }

    pub fn document(&self, session_id: &str) -> Option<StoredDrawing> {
        self.inner.lock().documents.get(session_id).cloned()
    }

    pub fn activity_count(&self, session_id: &str) -> u32 {
        self.inner.lock().activity.get(session_id).copied().unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

impl SyncBackend for LocalRelay {
    fn sync_drawing(&self, write: SyncWrite) -> BoxFuture<'static, CanvasResult<()>> {
        let listeners = {
            let mut inner = self.inner.lock();
            if inner.offline {
                return boxed(async { Err(CanvasError::Transport("relay is offline".to_string())) });
            }

            let revision = inner
                .documents
                .get(&write.session_id)
                .map_or(1, |doc| doc.revision + 1);
            inner.documents.insert(
                write.session_id.clone(),
                StoredDrawing {
                    serialized_state: write.serialized_state.clone(),
                    editor_id: write.editor_id,
                    background_color: write.background_color.clone(),
                    width: write.width,
                    height: write.height,
                    revision,
                },
            );
            inner
                .subscribers
                .values()
                .filter(|(session, _)| *session == write.session_id)
                .map(|(_, callback)| callback.clone())
                .collect::<Vec<_>>()
        };

        debug!(
            "Relay stored session {}, notifying {} subscribers",
            write.session_id,
            listeners.len()
        );
        for listener in listeners {
            listener(RemoteDrawing {
                serialized_state: write.serialized_state.clone(),
                background_color: Some(write.background_color.clone()),
            });
        }
        boxed(async { Ok(()) })
    }

    fn subscribe_to_updates(&self, session_id: &str, on_update: UpdateCallback) -> Subscription {
        let id = Uuid::new_v4();
        let callback: Arc<dyn Fn(RemoteDrawing) + Send + Sync> = Arc::from(on_update);

        let current = {
            let mut inner = self.inner.lock();
            inner
                .subscribers
                .insert(id, (session_id.to_string(), callback.clone()));
            inner.documents.get(session_id).cloned()
        };

        // New subscribers see the current drawing right away
        if let Some(doc) = current {
            callback(RemoteDrawing {
                serialized_state: doc.serialized_state,
                background_color: Some(doc.background_color),
            });
        }

        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.lock().subscribers.remove(&id);
            }
        })
    }

    fn record_activity(&self, session_id: &str) -> BoxFuture<'static, CanvasResult<()>> {
        let mut inner = self.inner.lock();
        if inner.offline {
            return boxed(async { Err(CanvasError::Transport("relay is offline".to_string())) });
        }
        *inner.activity.entry(session_id.to_string()).or_insert(0) += 1;
        boxed(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn write(session: &str, state: &str) -> SyncWrite {
        SyncWrite {
            session_id: session.to_string(),
            serialized_state: state.to_string(),
            editor_id: "alice".to_string(),
            background_color: "#ffffff".to_string(),
            width: 10,
            height: 10,
        }
    }

    #[test]
    fn test_subscribers_receive_writes_for_their_session() {
        let relay = LocalRelay::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = relay.subscribe_to_updates(
            "s1",
            Box::new(move |update| sink.lock().push(update.serialized_state)),
        );

        block_on(relay.sync_drawing(write("s1", "first"))).unwrap();
        block_on(relay.sync_drawing(write("s2", "other"))).unwrap();

        assert_eq!(*seen.lock(), vec!["first".to_string()]);
        assert_eq!(relay.document("s1").unwrap().revision, 1);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let relay = LocalRelay::new();
        let subscription = relay.subscribe_to_updates("s1", Box::new(|_| {}));
        assert_eq!(relay.subscriber_count(), 1);
        drop(subscription);
        assert_eq!(relay.subscriber_count(), 0);
    }

    #[test]
    fn test_offline_relay_rejects_writes() {
        let relay = LocalRelay::new();
        relay.set_offline(true);
        assert!(block_on(relay.sync_drawing(write("s1", "lost"))).is_err());
        assert!(relay.document("s1").is_none());
        assert!(block_on(relay.record_activity("s1")).is_err());
    }
}
