use serde::{Deserialize, Serialize};

use crate::error::CanvasResult;
use crate::tool::BackgroundColor;

/// Named canvas sizes, in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizePreset {
    Small,
    Medium,
    Large,
}

impl SizePreset {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            SizePreset::Small => (300, 300),
            SizePreset::Medium => (360, 480),
            SizePreset::Large => (480, 640),
        }
    }
}

/// Largest accepted side of an explicit canvas, in logical pixels
pub const MAX_CANVAS_SIDE: u32 = 4096;

/// Logical size of the drawing, either a preset or explicit pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CanvasSize {
    Preset(SizePreset),
    Explicit { width: u32, height: u32 },
}

impl Default for CanvasSize {
    fn default() -> Self {
        CanvasSize::Preset(SizePreset::Medium)
    }
}

impl CanvasSize {
    pub fn dimensions(&self) -> (u32, u32) {
        let (width, height) = match self {
            CanvasSize::Preset(preset) => preset.dimensions(),
            CanvasSize::Explicit { width, height } => (*width, *height),
        };
        (width.clamp(1, MAX_CANVAS_SIDE), height.clamp(1, MAX_CANVAS_SIDE))
    }
}

/// Properties an embedding UI hands to a drawing surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)] // missing fields fall back to defaults when loading older configs
pub struct SurfaceConfig {
    pub session_id: String,
    pub participant_id: String,
    /// Serialized drawing to hydrate from
    pub initial_state: Option<String>,
    pub background: BackgroundColor,
    /// Editing participant; otherwise a read-only partner view
    pub editable: bool,
    pub canvas: CanvasSize,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            session_id: "local".to_string(),
            participant_id: "me".to_string(),
            initial_state: None,
            background: BackgroundColor::default(),
            editable: true,
            canvas: CanvasSize::default(),
        }
    }
}

impl SurfaceConfig {
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
