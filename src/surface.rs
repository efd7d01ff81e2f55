use egui::{Color32, Pos2};
use log::{debug, info, warn};
use std::sync::Arc;

use crate::config::SurfaceConfig;
use crate::document::DrawingState;
use crate::error::CanvasError;
use crate::fill::RegionFill;
use crate::history::History;
use crate::input::PointerTranslator;
use crate::path::{InProgressPath, PathRef};
use crate::snapshot;
use crate::sync::{Clock, RemoteDrawing, Role, SyncBackend, SyncCoordinator};
use crate::tool::{BackgroundColor, BrushWidth, Tool, ToolState};

/// Every this many completed strokes, activity is reported to the backend
pub const ACTIVITY_EVERY: u64 = 5;

/// Called with the serialized drawing after every local mutation
pub type SaveCallback = Box<dyn FnMut(&str)>;

/// One participant's drawing surface.
///
/// Owns the drawing, its history and the sync coordinator. An editable
/// surface turns gestures into mutations; a read-only surface only mirrors
/// what arrives from the shared document. All methods are meant to be called
/// from the UI loop.
pub struct DrawingSurface {
    session_id: String,
    state: DrawingState,
    tools: ToolState,
    history: History,
    translator: PointerTranslator,
    sync: SyncCoordinator,
    region_fill: RegionFill,
    stroke_count: u64,
    on_save: Option<SaveCallback>,
}

impl std::fmt::Debug for DrawingSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawingSurface")
            .field("session_id", &self.session_id)
            .field("paths", &self.state.paths().len())
            .field("history_index", &self.history.index())
            .field("stroke_count", &self.stroke_count)
            .field("sync", &self.sync)
            .finish()
    }
}

impl DrawingSurface {
    pub fn new(config: SurfaceConfig, backend: Arc<dyn SyncBackend>) -> Self {
        let (width, height) = config.canvas.dimensions();
        let mut state = DrawingState::new(config.background, width, height);
        if let Some(initial) = &config.initial_state {
            state.replace_paths(snapshot::decode_or_empty(initial, "hydrated"));
        }

        let role = Role::from_editable(config.editable);
        info!(
            "Opening {:?} surface for session {} ({}x{}, {} paths)",
            role,
            config.session_id,
            width,
            height,
            state.paths().len()
        );

        Self {
            history: History::new(state.snapshot()),
            translator: PointerTranslator::new(width, height),
            sync: SyncCoordinator::new(config.session_id.clone(), config.participant_id, role, backend),
            tools: ToolState {
                background: config.background,
                ..Default::default()
            },
            session_id: config.session_id,
            state,
            region_fill: RegionFill::default(),
            stroke_count: 0,
            on_save: None,
        }
    }

    /// Replace the time source used to debounce writes
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.sync = self.sync.with_clock(clock);
        self
    }

    pub fn with_region_fill(mut self, region_fill: RegionFill) -> Self {
        self.region_fill = region_fill;
        self
    }

    pub fn with_on_save(mut self, on_save: SaveCallback) -> Self {
        self.on_save = Some(on_save);
        self
    }

    pub fn is_editable(&self) -> bool {
        self.sync.role() == Role::Editor
    }

    fn ensure_editable(&self, action: &str) -> bool {
        if !self.is_editable() {
            debug!("{} ignored: {}", action, CanvasError::ReadOnly);
            return false;
        }
        true
    }

    // Tool state

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tools.active_tool = tool;
    }

    pub fn set_color(&mut self, color: Color32) {
        self.tools.color = color;
    }

    pub fn set_brush_width(&mut self, width: BrushWidth) {
        self.tools.brush_width = width;
    }

    /// Change the background; existing eraser strokes keep their color
    pub fn set_background(&mut self, background: BackgroundColor) {
        if !self.ensure_editable("Background change") || background == self.state.background() {
            return;
        }
        self.tools.background = background;
        self.state.set_background(background);
        self.publish();
    }

    pub fn toggle_background(&mut self) {
        self.set_background(self.state.background().next());
    }

    // Gestures, in logical canvas coordinates

    pub fn drag_start(&mut self, pos: Pos2) {
        if self.ensure_editable("Stroke") {
            self.translator.drag_start(pos, &self.tools);
        }
    }

    pub fn drag_update(&mut self, pos: Pos2) {
        self.translator.drag_update(pos);
    }

    pub fn drag_end(&mut self) {
        let Some(record) = self.translator.drag_end() else {
            return;
        };
        self.state.add_path(record);
        self.commit();

        self.stroke_count += 1;
        if self.stroke_count % ACTIVITY_EVERY == 0 {
            debug!("Stroke {} completed, recording activity", self.stroke_count);
            self.sync.record_activity();
        }
    }

    pub fn tap(&mut self, pos: Pos2) {
        if !self.ensure_editable("Fill") {
            return;
        }
        if let Some(point) = self.translator.tap(pos, &self.tools) {
            self.fill_at(point);
            self.translator.fill_done();
        }
    }

    fn fill_at(&mut self, point: Pos2) {
        match self.region_fill.compute(&self.state, point, self.tools.color) {
            Ok(Some(record)) => {
                self.state.add_path(record);
                self.commit();
            }
            Ok(None) => {}
            Err(e) => warn!("Fill at {:?} aborted: {}", point, e),
        }
    }

    // History

    /// Remove everything; undoable like any other edit
    pub fn clear(&mut self) {
        if !self.ensure_editable("Clear") {
            return;
        }
        self.translator.cancel();
        self.state.replace_paths(Vec::new());
        self.commit();
    }

    pub fn undo(&mut self) {
        if !self.ensure_editable("Undo") {
            return;
        }
        if let Some(snapshot) = self.history.undo() {
            self.state.replace_paths(snapshot.clone());
            self.publish();
        }
    }

    pub fn redo(&mut self) {
        if !self.ensure_editable("Redo") {
            return;
        }
        if let Some(snapshot) = self.history.redo() {
            self.state.replace_paths(snapshot.clone());
            self.publish();
        }
    }

    pub fn can_undo(&self) -> bool {
        self.is_editable() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.is_editable() && self.history.can_redo()
    }

    fn commit(&mut self) {
        self.history.push(self.state.snapshot());
        self.publish();
    }

    /// Schedule a sync write and report the new drawing to the embedder
    fn publish(&mut self) {
        if let Err(e) = self.sync.schedule(&self.state) {
            warn!("Failed to schedule sync for session {}: {}", self.session_id, e);
        }
        if let Some(on_save) = self.on_save.as_mut() {
            match snapshot::encode(self.state.paths()) {
                Ok(serialized) => on_save(&serialized),
                Err(e) => warn!("Failed to serialize drawing for save: {}", e),
            }
        }
    }

    // Event loop

    /// Drive sync from the UI loop and apply any received drawings
    pub fn pump(&mut self) {
        for update in self.sync.pump() {
            self.apply_remote(update);
        }
    }

    /// Send any pending write immediately, e.g. before shutdown
    pub fn flush(&mut self) {
        self.sync.flush();
    }

    fn apply_remote(&mut self, update: RemoteDrawing) {
        let paths = snapshot::decode_or_empty(&update.serialized_state, "remote");
        debug!("Applying remote drawing with {} paths", paths.len());
        self.state.replace_paths(paths);

        if let Some(hex) = update.background_color {
            match BackgroundColor::from_hex(&hex) {
                Ok(background) => {
                    self.state.set_background(background);
                    self.tools.background = background;
                }
                Err(e) => warn!("Ignoring remote background: {}", e),
            }
        }
    }

    // Queries

    pub fn state(&self) -> &DrawingState {
        &self.state
    }

    pub fn paths(&self) -> &[PathRef] {
        self.state.paths()
    }

    pub fn in_progress(&self) -> Option<&InProgressPath> {
        self.translator.in_progress()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn stroke_count(&self) -> u64 {
        self.stroke_count
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.is_syncing()
    }

    pub fn has_pending_write(&self) -> bool {
        self.sync.has_pending_write()
    }

    /// Seconds until the pending write goes out, if one is waiting
    pub fn time_until_sync(&self) -> Option<f64> {
        self.sync.time_until_due()
    }

    pub fn serialized(&self) -> Option<String> {
        snapshot::encode(self.state.paths()).ok()
    }
}
