use thiserror::Error;

/// Errors raised by the drawing and synchronization core
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("Invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),

    #[error("Invalid path description: {0}")]
    InvalidPath(String),

    #[error("Failed to (de)serialize drawing: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to allocate {width}x{height} offscreen bitmap")]
    BitmapAllocation { width: u32, height: u32 },

    #[error("Failed to read back offscreen bitmap")]
    BitmapReadback,

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Surface is read-only")]
    ReadOnly,
}

/// Result type for canvas operations
pub type CanvasResult<T> = Result<T, CanvasError>;
