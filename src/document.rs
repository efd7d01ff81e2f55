use crate::path::{PathRecord, PathRef};
use crate::tool::BackgroundColor;
use std::sync::Arc;

/// Ordered list of paths; index order is paint order
pub type PathSequence = Vec<PathRef>;

/// Everything needed to reproduce the rendered image
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingState {
    paths: PathSequence,
    background: BackgroundColor,
    width: u32,
    height: u32,
}

impl DrawingState {
    pub fn new(background: BackgroundColor, width: u32, height: u32) -> Self {
        Self {
            paths: Vec::new(),
            background,
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn add_path(&mut self, path: PathRecord) {
        self.paths.push(Arc::new(path));
    }

    pub fn paths(&self) -> &[PathRef] {
        &self.paths
    }

    /// Copy of the path sequence for history snapshots
    pub fn snapshot(&self) -> PathSequence {
        self.paths.clone()
    }

    pub fn replace_paths(&mut self, paths: PathSequence) {
        self.paths = paths;
    }

    pub fn background(&self) -> BackgroundColor {
        self.background
    }

    pub fn set_background(&mut self, background: BackgroundColor) {
        self.background = background;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
