use duet_canvas::sync::{
    Clock, RemoteDrawing, Subscription, SyncBackend, SyncWrite, UpdateCallback, boxed,
};
use duet_canvas::{
    BackgroundColor, CanvasError, CanvasResult, DrawingSurface, LocalRelay, SurfaceConfig,
    DEBOUNCE_SECS,
};
use egui::{Color32, Pos2};
use futures::channel::oneshot;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

fn manual_clock() -> (Rc<Cell<f64>>, Clock) {
    let now = Rc::new(Cell::new(0.0));
    let reader = now.clone();
    (now, Box::new(move || reader.get()))
}

fn config(editable: bool) -> SurfaceConfig {
    SurfaceConfig {
        session_id: "pair-7".to_string(),
        participant_id: if editable { "alice" } else { "bob" }.to_string(),
        editable,
        ..Default::default()
    }
}

fn draw_stroke(surface: &mut DrawingSurface, x: f32) {
    surface.drag_start(Pos2::new(x, 10.0));
    surface.drag_update(Pos2::new(x, 40.0));
    surface.drag_end();
}

/// Backend whose writes stay in flight until the test resolves them
#[derive(Default)]
struct ManualBackend {
    writes: Mutex<Vec<(SyncWrite, oneshot::Sender<CanvasResult<()>>)>>,
    listener: Mutex<Option<UpdateCallback>>,
}

impl ManualBackend {
    fn resolve_all(&self, result: fn() -> CanvasResult<()>) -> Vec<SyncWrite> {
        self.writes
            .lock()
            .drain(..)
            .map(|(write, done)| {
                let _ = done.send(result());
                write
            })
            .collect()
    }

    fn push(&self, update: RemoteDrawing) {
        if let Some(listener) = self.listener.lock().as_ref() {
            listener(update);
        }
    }
}

impl SyncBackend for ManualBackend {
    fn sync_drawing(&self, write: SyncWrite) -> BoxFuture<'static, CanvasResult<()>> {
        let (done, wait) = oneshot::channel();
        self.writes.lock().push((write, done));
        boxed(async move {
            wait.await
                .unwrap_or_else(|_| Err(CanvasError::Transport("write abandoned".to_string())))
        })
    }

    fn subscribe_to_updates(&self, _session_id: &str, on_update: UpdateCallback) -> Subscription {
        *self.listener.lock() = Some(on_update);
        Subscription::detached()
    }

    fn record_activity(&self, _session_id: &str) -> BoxFuture<'static, CanvasResult<()>> {
        boxed(async { Ok(()) })
    }
}

#[test]
fn test_burst_of_strokes_produces_one_write() {
    let relay = LocalRelay::new();
    let (now, clock) = manual_clock();
    let mut editor = DrawingSurface::new(config(true), Arc::new(relay.clone())).with_clock(clock);

    for i in 0..4 {
        draw_stroke(&mut editor, 10.0 * i as f32);
        now.set(now.get() + DEBOUNCE_SECS / 2.0);
        editor.pump();
    }
    assert!(relay.document("pair-7").is_none());
    assert!(editor.has_pending_write());

    now.set(now.get() + DEBOUNCE_SECS);
    editor.pump();

    let stored = relay.document("pair-7").unwrap();
    assert_eq!(stored.revision, 1);
    assert_eq!(stored.editor_id, "alice");
    assert_eq!(Some(stored.serialized_state), editor.serialized());
    assert!(!editor.has_pending_write());
}

#[test]
fn test_viewer_follows_editor() {
    let relay = LocalRelay::new();
    let mut editor = DrawingSurface::new(config(true), Arc::new(relay.clone()));
    let mut viewer = DrawingSurface::new(config(false), Arc::new(relay.clone()));

    editor.set_color(Color32::GREEN);
    draw_stroke(&mut editor, 20.0);
    editor.set_background(BackgroundColor::Black);
    editor.flush();
    viewer.pump();

    assert_eq!(viewer.paths(), editor.paths());
    assert_eq!(viewer.state().background(), BackgroundColor::Black);

    editor.undo();
    editor.flush();
    viewer.pump();
    assert!(viewer.paths().is_empty());
}

#[test]
fn test_late_viewer_sees_current_drawing() {
    let relay = LocalRelay::new();
    let mut editor = DrawingSurface::new(config(true), Arc::new(relay.clone()));
    draw_stroke(&mut editor, 5.0);
    draw_stroke(&mut editor, 15.0);
    editor.flush();

    let mut viewer = DrawingSurface::new(config(false), Arc::new(relay.clone()));
    viewer.pump();
    assert_eq!(viewer.paths().len(), 2);
}

#[test]
fn test_dropped_viewer_unsubscribes() {
    let relay = LocalRelay::new();
    let viewer = DrawingSurface::new(config(false), Arc::new(relay.clone()));
    assert_eq!(relay.subscriber_count(), 1);
    drop(viewer);
    assert_eq!(relay.subscriber_count(), 0);
}

#[test]
fn test_malformed_inbound_drawing_clears_viewer() {
    let backend = Arc::new(ManualBackend::default());
    let mut viewer = DrawingSurface::new(config(false), backend.clone());

    backend.push(RemoteDrawing {
        serialized_state: r##"{"pathSequence":[{"color":"#ff0000","strokeWidth":5,"path":"M0 0 L9 9"}]}"##
            .to_string(),
        background_color: None,
    });
    viewer.pump();
    assert_eq!(viewer.paths().len(), 1);
    assert_eq!(viewer.state().background(), BackgroundColor::White);

    backend.push(RemoteDrawing {
        serialized_state: "{not json".to_string(),
        background_color: Some("not a color".to_string()),
    });
    viewer.pump();
    assert!(viewer.paths().is_empty());
    assert_eq!(viewer.state().background(), BackgroundColor::White);
}

#[test]
fn test_syncing_indicator_tracks_in_flight_write() {
    let backend = Arc::new(ManualBackend::default());
    let mut editor = DrawingSurface::new(config(true), backend.clone());

    draw_stroke(&mut editor, 1.0);
    editor.flush();
    assert!(editor.is_syncing());

    let writes = backend.resolve_all(|| Ok(()));
    assert_eq!(writes.len(), 1);
    editor.pump();
    assert!(!editor.is_syncing());
}

#[test]
fn test_failed_write_keeps_local_state() {
    let backend = Arc::new(ManualBackend::default());
    let mut editor = DrawingSurface::new(config(true), backend.clone());

    draw_stroke(&mut editor, 1.0);
    editor.flush();
    backend.resolve_all(|| Err(CanvasError::Transport("network down".to_string())));
    editor.pump();
    assert!(!editor.is_syncing());
    assert_eq!(editor.paths().len(), 1);

    // The next write carries everything drawn so far
    draw_stroke(&mut editor, 2.0);
    editor.flush();
    let writes = backend.resolve_all(|| Ok(()));
    assert_eq!(Some(writes[0].serialized_state.clone()), editor.serialized());
    assert!(writes[0].serialized_state.contains("M1 10"));
}

#[test]
fn test_offline_relay_recovers_on_next_write() {
    let relay = LocalRelay::new();
    let mut editor = DrawingSurface::new(config(true), Arc::new(relay.clone()));

    relay.set_offline(true);
    draw_stroke(&mut editor, 3.0);
    editor.flush();
    assert!(relay.document("pair-7").is_none());
    assert_eq!(editor.paths().len(), 1);

    relay.set_offline(false);
    draw_stroke(&mut editor, 6.0);
    editor.flush();
    let stored = relay.document("pair-7").unwrap();
    assert_eq!(Some(stored.serialized_state), editor.serialized());
}
