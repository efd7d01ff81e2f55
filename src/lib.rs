#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod config;
pub mod document;
pub mod error;
pub mod fill;
pub mod history;
pub mod input;
pub mod path;
pub mod renderer;
pub mod snapshot;
pub mod surface;
pub mod sync;
pub mod tool;
pub mod util;

pub use app::CanvasApp;
pub use config::{CanvasSize, MAX_CANVAS_SIDE, SizePreset, SurfaceConfig};
pub use document::DrawingState;
pub use error::{CanvasError, CanvasResult};
pub use history::{History, MAX_HISTORY};
pub use path::{PathRecord, PathRef};
pub use renderer::{CanvasView, Renderer};
pub use surface::{DrawingSurface, ACTIVITY_EVERY};
pub use sync::{LocalRelay, SyncBackend, SyncCoordinator, DEBOUNCE_SECS};
pub use tool::{BackgroundColor, BrushWidth, Tool, ToolState};
