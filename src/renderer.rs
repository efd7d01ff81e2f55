// src/renderer.rs
use egui::{Color32, Painter, Pos2, Rect, Shape, Stroke, Vec2};
use log::warn;
use std::collections::HashSet;

use crate::document::DrawingState;
use crate::path::{InProgressPath, PathGeometry, SubPath};

/// Placement of the logical canvas inside a screen rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasView {
    /// Screen rectangle the canvas occupies
    pub rect: Rect,
    /// Screen points per logical pixel
    pub scale: f32,
}

impl CanvasView {
    /// Largest uniform fit of a `width` x `height` canvas, centered in `available`
    pub fn fit(available: Rect, width: u32, height: u32) -> Self {
        let logical = Vec2::new(width as f32, height as f32);
        let scale = (available.width() / logical.x)
            .min(available.height() / logical.y)
            .max(f32::EPSILON);
        let rect = Rect::from_center_size(available.center(), logical * scale);
        Self { rect, scale }
    }

    pub fn to_screen(&self, canvas: Pos2) -> Pos2 {
        self.rect.min + canvas.to_vec2() * self.scale
    }

    pub fn to_canvas(&self, screen: Pos2) -> Pos2 {
        ((screen - self.rect.min) / self.scale).to_pos2()
    }
}

/// Draws a drawing onto an egui painter.
///
/// Each record is painted independently; a record that fails to parse is
/// skipped and reported once.
#[derive(Debug, Default)]
pub struct Renderer {
    reported: HashSet<String>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders the background, every completed path in order, then the live stroke
    pub fn render(
        &mut self,
        painter: &Painter,
        view: &CanvasView,
        state: &DrawingState,
        in_progress: Option<&InProgressPath>,
    ) {
        let painter = painter.with_clip_rect(view.rect);
        painter.rect_filled(view.rect, 0.0, state.background().color());

        for record in state.paths() {
            match record.resolve() {
                Ok((color, geometry)) => {
                    paint_geometry(&painter, view, color, record.stroke_width(), &geometry);
                }
                Err(e) => {
                    if self.reported.insert(record.path().to_string()) {
                        warn!("Skipping unrenderable path: {}", e);
                    }
                }
            }
        }

        if let Some(live) = in_progress {
            let subpath = SubPath {
                points: live.points().to_vec(),
                closed: false,
            };
            paint_subpath(&painter, view, live.color(), live.stroke_width(), &subpath);
        }
    }

    /// Number of distinct malformed records seen so far
    pub fn skipped_count(&self) -> usize {
        self.reported.len()
    }
}

fn paint_geometry(painter: &Painter, view: &CanvasView, color: Color32, width: f32, geometry: &PathGeometry) {
    for subpath in &geometry.subpaths {
        paint_subpath(painter, view, color, width, subpath);
    }
}

fn paint_subpath(painter: &Painter, view: &CanvasView, color: Color32, width: f32, subpath: &SubPath) {
    painter.extend(subpath_shapes(view, color, width, subpath));
}

/// Screen shapes for one subpath.
///
/// Outlines are butt-ended segments with a disc on every vertex, which gives
/// the same round caps and joins the fill raster uses.
fn subpath_shapes(view: &CanvasView, color: Color32, width: f32, subpath: &SubPath) -> Vec<Shape> {
    let width = width * view.scale;
    let radius = width / 2.0;
    let points: Vec<Pos2> = subpath.points.iter().map(|p| view.to_screen(*p)).collect();

    if let [dot] = points.as_slice() {
        return vec![Shape::circle_filled(*dot, radius, color)];
    }

    let mut shapes = Vec::with_capacity(points.len() * 2 + 1);
    if subpath.is_filled() {
        shapes.push(Shape::convex_polygon(points.clone(), color, Stroke::NONE));
    }

    let stroke = Stroke::new(width, color);
    for pair in points.windows(2) {
        shapes.push(Shape::line_segment([pair[0], pair[1]], stroke));
    }
    if subpath.closed {
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            shapes.push(Shape::line_segment([*last, *first], stroke));
        }
    }
    shapes.extend(points.iter().map(|p| Shape::circle_filled(*p, radius, color)));
    shapes
}
