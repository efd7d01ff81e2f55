use egui::{Color32, Pos2, Rect};
use image::{Rgba, RgbaImage};
use log::{debug, warn};
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::config::MAX_CANVAS_SIDE;
use crate::document::DrawingState;
use crate::error::{CanvasError, CanvasResult};
use crate::path::PathRecord;

/// Per-channel difference below which a pixel counts as the target color
pub const FILL_TOLERANCE: u8 = 10;

/// Offscreen raster snapshot of a drawing.
///
/// The pixmap is owned, so it is released on every exit path of a fill.
pub struct Raster {
    pixmap: Pixmap,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> CanvasResult<Self> {
        let pixmap = Pixmap::new(width, height).ok_or(CanvasError::BitmapAllocation { width, height })?;
        Ok(Self { pixmap })
    }

    /// Clear to the background and paint every record in order.
    ///
    /// Geometry matches the on-screen renderer: round caps and joins, dots
    /// for single points, interiors only for closed convex outlines.
    pub fn paint(&mut self, state: &DrawingState) {
        let bg = state.background().color();
        self.pixmap.fill(tiny_skia::Color::from_rgba8(bg.r(), bg.g(), bg.b(), 255));

        for (index, record) in state.paths().iter().enumerate() {
            if let Err(e) = self.paint_record(record) {
                warn!("Skipping path {} while rasterizing: {}", index, e);
            }
        }
    }

    fn paint_record(&mut self, record: &PathRecord) -> CanvasResult<()> {
        let (color, geometry) = record.resolve()?;
        let width = record.stroke_width();

        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r(), color.g(), color.b(), 255);
        paint.anti_alias = true;

        let stroke = Stroke {
            width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Default::default()
        };

        for subpath in &geometry.subpaths {
            let mut pb = PathBuilder::new();
            match subpath.points.as_slice() {
                [dot] => {
                    pb.push_circle(dot.x, dot.y, width / 2.0);
                    if let Some(path) = pb.finish() {
                        self.pixmap
                            .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
                    }
                    continue;
                }
                [first, rest @ ..] => {
                    pb.move_to(first.x, first.y);
                    for point in rest {
                        pb.line_to(point.x, point.y);
                    }
                    if subpath.closed {
                        pb.close();
                    }
                }
                [] => continue,
            }

            let Some(path) = pb.finish() else {
                continue;
            };
            if subpath.is_filled() {
                self.pixmap
                    .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            }
            self.pixmap
                .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
        Ok(())
    }

    /// Copy the pixels out as straight (non-premultiplied) RGBA
    pub fn read_back(self) -> CanvasResult<RgbaImage> {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        let data: Vec<u8> = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|pixel| {
                let c = pixel.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        RgbaImage::from_raw(width, height, data).ok_or(CanvasError::BitmapReadback)
    }
}

/// Pixels reached by a flood fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilledRegion {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub pixel_count: usize,
}

impl FilledRegion {
    /// Rectangle covering every matched pixel
    pub fn bounds(&self) -> Rect {
        Rect::from_min_max(
            Pos2::new(self.min_x as f32, self.min_y as f32),
            Pos2::new((self.max_x + 1) as f32, (self.max_y + 1) as f32),
        )
    }
}

fn matches(pixel: &Rgba<u8>, target: &Rgba<u8>, tolerance: u8) -> bool {
    (0..3).all(|c| (pixel.0[c] as i16 - target.0[c] as i16).abs() < tolerance as i16)
}

/// 4-connected flood fill from `start` using an explicit stack
pub fn flood_region(image: &RgbaImage, start: (u32, u32), tolerance: u8) -> FilledRegion {
    let (width, height) = image.dimensions();
    let target = *image.get_pixel(start.0, start.1);
    let mut visited = vec![false; width as usize * height as usize];
    let mut stack = vec![start];
    visited[(start.1 * width + start.0) as usize] = true;

    let mut region = FilledRegion {
        min_x: start.0,
        min_y: start.1,
        max_x: start.0,
        max_y: start.1,
        pixel_count: 0,
    };

    while let Some((x, y)) = stack.pop() {
        region.pixel_count += 1;
        region.min_x = region.min_x.min(x);
        region.min_y = region.min_y.min(y);
        region.max_x = region.max_x.max(x);
        region.max_y = region.max_y.max(y);

        let neighbors = [
            (x.checked_sub(1), Some(y)),
            (x.checked_add(1).filter(|nx| *nx < width), Some(y)),
            (Some(x), y.checked_sub(1)),
            (Some(x), y.checked_add(1).filter(|ny| *ny < height)),
        ];
        for (nx, ny) in neighbors {
            let (Some(nx), Some(ny)) = (nx, ny) else {
                continue;
            };
            let slot = (ny * width + nx) as usize;
            if visited[slot] {
                continue;
            }
            if matches(image.get_pixel(nx, ny), &target, tolerance) {
                visited[slot] = true;
                stack.push((nx, ny));
            }
        }
    }
    region
}

/// Largest drawing, in pixels, a fill will rasterize
pub const MAX_FILL_PIXELS: u64 = MAX_CANVAS_SIDE as u64 * MAX_CANVAS_SIDE as u64;

/// Region fill over a drawing stored as vectors.
///
/// Rasterizes the current drawing, floods from the tap point and returns a
/// record approximating the flooded area by its bounding rectangle.
#[derive(Debug, Clone)]
pub struct RegionFill {
    tolerance: u8,
    max_pixels: u64,
}

impl Default for RegionFill {
    fn default() -> Self {
        Self {
            tolerance: FILL_TOLERANCE,
            max_pixels: MAX_FILL_PIXELS,
        }
    }
}

impl RegionFill {
    /// Refuse drawings larger than `max_pixels` instead of allocating for them
    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    /// Returns `Ok(None)` when the tapped pixel already has the fill color.
    pub fn compute(&self, state: &DrawingState, tap: Pos2, fill: Color32) -> CanvasResult<Option<PathRecord>> {
        let (width, height) = (state.width(), state.height());
        if u64::from(width) * u64::from(height) > self.max_pixels {
            return Err(CanvasError::BitmapAllocation { width, height });
        }

        let mut raster = Raster::new(width, height)?;
        raster.paint(state);
        let image = raster.read_back()?;

        let x = clamp_coord(tap.x, width);
        let y = clamp_coord(tap.y, height);
        let target = image.get_pixel(x, y);
        if target.0[..3] == [fill.r(), fill.g(), fill.b()] {
            debug!("Fill at ({}, {}) skipped: region already has the fill color", x, y);
            return Ok(None);
        }

        let region = flood_region(&image, (x, y), self.tolerance);
        debug!(
            "Filled {} pixels around ({}, {}), bounds {:?}",
            region.pixel_count,
            x,
            y,
            region.bounds()
        );
        Ok(Some(PathRecord::filled_rect(fill, region.bounds())))
    }
}

fn clamp_coord(value: f32, extent: u32) -> u32 {
    if value.is_finite() {
        (value.floor().max(0.0) as u32).min(extent - 1)
    } else {
        0
    }
}
