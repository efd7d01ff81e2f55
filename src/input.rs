use egui::{Pos2, Rect};
use log::debug;

use crate::path::{InProgressPath, PathRecord};
use crate::tool::{Tool, ToolState};

/// Gesture state of the translator.
///
/// ```text
/// Idle ──drag start──► Drawing ──drag end──► Idle
/// Idle ──tap────────► Filling ──fill done──► Idle
/// ```
///
/// Whichever gesture starts first owns the interaction; the other is ignored
/// until the translator is idle again.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Drawing(InProgressPath),
    Filling,
}

/// Turns pointer gestures in logical canvas coordinates into path records
#[derive(Debug, Clone)]
pub struct PointerTranslator {
    state: GestureState,
    bounds: Rect,
}

impl PointerTranslator {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: GestureState::Idle,
            bounds: Rect::from_min_max(Pos2::ZERO, Pos2::new(width as f32, height as f32)),
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// The stroke being drawn, for live rendering
    pub fn in_progress(&self) -> Option<&InProgressPath> {
        match &self.state {
            GestureState::Drawing(path) => Some(path),
            _ => None,
        }
    }

    fn clamp(&self, pos: Pos2) -> Pos2 {
        pos.clamp(self.bounds.min, self.bounds.max)
    }

    /// Begin a stroke. Returns false when the gesture is not claimed.
    pub fn drag_start(&mut self, pos: Pos2, tools: &ToolState) -> bool {
        if self.state != GestureState::Idle {
            debug!("Ignoring drag start while {}", self.state_name());
            return false;
        }
        match tools.active_tool {
            Tool::PaintBucket => false,
            Tool::Brush | Tool::Eraser => {
                let start = self.clamp(pos);
                self.state = GestureState::Drawing(InProgressPath::new(
                    tools.effective_color(),
                    tools.brush_width.pixels(),
                    start,
                ));
                true
            }
        }
    }

    pub fn drag_update(&mut self, pos: Pos2) {
        let point = self.clamp(pos);
        if let GestureState::Drawing(path) = &mut self.state {
            path.add_point(point);
        }
    }

    /// Finish the current stroke, if one is being drawn
    pub fn drag_end(&mut self) -> Option<PathRecord> {
        match std::mem::take(&mut self.state) {
            GestureState::Drawing(path) => Some(path.finish()),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// A tap claims the interaction for a fill when the bucket is active.
    ///
    /// Returns the clamped tap point; call [`Self::fill_done`] once the fill
    /// has been applied.
    pub fn tap(&mut self, pos: Pos2, tools: &ToolState) -> Option<Pos2> {
        if self.state != GestureState::Idle {
            return None;
        }
        match tools.active_tool {
            Tool::PaintBucket => {
                self.state = GestureState::Filling;
                Some(self.clamp(pos))
            }
            Tool::Brush | Tool::Eraser => None,
        }
    }

    pub fn fill_done(&mut self) {
        if self.state == GestureState::Filling {
            self.state = GestureState::Idle;
        }
    }

    /// Drop any gesture in progress without producing a record
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }

    fn state_name(&self) -> &'static str {
        match self.state {
            GestureState::Idle => "Idle",
            GestureState::Drawing(_) => "Drawing",
            GestureState::Filling => "Filling",
        }
    }
}
