use futures::future::BoxFuture;

use crate::error::CanvasResult;

/// One outbound write of the shared drawing
#[derive(Debug, Clone, PartialEq)]
pub struct SyncWrite {
    pub session_id: String,
    pub serialized_state: String,
    pub editor_id: String,
    pub background_color: String,
    pub width: u32,
    pub height: u32,
}

/// A drawing pushed by the remote document to read-only surfaces
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDrawing {
    pub serialized_state: String,
    /// Partner's background as `#rrggbb`, when the backend carries it
    pub background_color: Option<String>,
}

pub type UpdateCallback = Box<dyn Fn(RemoteDrawing) + Send + Sync>;

/// Handle for an inbound subscription; unsubscribes when dropped
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// A subscription with nothing to tear down
    pub fn detached() -> Self {
        Self { unsubscribe: None }
    }

    pub fn unsubscribe(mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

/// Remote document store shared by the two participants.
///
/// Implemented by the embedding application; the surface never retries
/// failed calls itself.
pub trait SyncBackend {
    /// Overwrite the shared drawing of `write.session_id`
    fn sync_drawing(&self, write: SyncWrite) -> BoxFuture<'static, CanvasResult<()>>;

    /// Receive every new version of the shared drawing
    fn subscribe_to_updates(&self, session_id: &str, on_update: UpdateCallback) -> Subscription;

    /// Note sustained drawing activity in the session
    fn record_activity(&self, session_id: &str) -> BoxFuture<'static, CanvasResult<()>>;
}
