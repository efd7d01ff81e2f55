use egui::{Color32, Pos2, Rect};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;

use crate::error::{CanvasError, CanvasResult};
use crate::tool::{hex_color, parse_hex_color};

/// A completed stroke or fill shape.
///
/// Records are immutable once finished; the drawing shares them between
/// history snapshots through [`PathRef`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRecord {
    color: String,
    stroke_width: f32,
    path: String,
}

// Define a reference-counted type alias for PathRecord
pub type PathRef = Arc<PathRecord>;

impl PathRecord {
    pub fn new(color: Color32, stroke_width: f32, path: String) -> Self {
        Self {
            color: hex_color(color),
            stroke_width,
            path,
        }
    }

    /// Build a record from its stored fields without validating them.
    ///
    /// Stored records may come from a partner or an old save; they are
    /// validated lazily when rendered.
    pub fn from_parts(color: impl Into<String>, stroke_width: f32, path: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            stroke_width,
            path: path.into(),
        }
    }

    /// A closed rectangle covering `rect`, as produced by region fills
    pub fn filled_rect(color: Color32, rect: Rect) -> Self {
        let mut path = String::new();
        let _ = write!(
            path,
            "M{} {} L{} {} L{} {} L{} {} Z",
            rect.min.x, rect.min.y, rect.max.x, rect.min.y, rect.max.x, rect.max.y, rect.min.x, rect.max.y
        );
        Self::new(color, 1.0, path)
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn stroke_width(&self) -> f32 {
        self.stroke_width
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bounding box of the stored geometry, if it parses
    pub fn bounds(&self) -> Option<Rect> {
        PathGeometry::parse(&self.path).ok().map(|g| g.bounds())
    }

    /// Parse the stored color and geometry into something paintable
    pub fn resolve(&self) -> CanvasResult<(Color32, PathGeometry)> {
        let color = parse_hex_color(&self.color)?;
        if !self.stroke_width.is_finite() || self.stroke_width <= 0.0 {
            return Err(CanvasError::InvalidPath(format!(
                "stroke width {} out of range",
                self.stroke_width
            )));
        }
        let geometry = PathGeometry::parse(&self.path)?;
        Ok((color, geometry))
    }
}

/// One connected run of points
#[derive(Debug, Clone, PartialEq)]
pub struct SubPath {
    pub points: Vec<Pos2>,
    pub closed: bool,
}

impl SubPath {
    /// Whether the interior is painted as well as the outline.
    ///
    /// Only closed convex outlines are filled. Every painter of a drawing
    /// (screen and offscreen raster) applies this same rule.
    pub fn is_filled(&self) -> bool {
        self.closed && self.is_convex()
    }

    /// Simple convex polygon: every turn goes the same way and the turns add
    /// up to exactly one revolution
    pub fn is_convex(&self) -> bool {
        let mut points: Vec<Pos2> = Vec::with_capacity(self.points.len());
        for point in &self.points {
            if points.last() != Some(point) {
                points.push(*point);
            }
        }
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        let n = points.len();
        if n < 3 {
            return false;
        }

        let mut sign = 0.0_f32;
        let mut turning = 0.0_f32;
        for i in 0..n {
            let a = points[(i + 1) % n] - points[i];
            let b = points[(i + 2) % n] - points[(i + 1) % n];
            let cross = a.x * b.y - a.y * b.x;
            turning += cross.atan2(a.dot(b));
            if cross.abs() > f32::EPSILON {
                if sign != 0.0 && sign != cross.signum() {
                    return false;
                }
                sign = cross.signum();
            }
        }
        sign != 0.0 && (turning.abs() - std::f32::consts::TAU).abs() < 1e-3
    }
}

/// Parsed form of a path description (`M x y L x y ... Z`)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathGeometry {
    pub subpaths: Vec<SubPath>,
}

impl PathGeometry {
    pub fn parse(description: &str) -> CanvasResult<Self> {
        let mut tokens = Tokens::new(description);
        let mut subpaths: Vec<SubPath> = Vec::new();

        while let Some(token) = tokens.next_token() {
            match token {
                "M" => {
                    let point = tokens.point()?;
                    subpaths.push(SubPath {
                        points: vec![point],
                        closed: false,
                    });
                }
                "L" => {
                    let point = tokens.point()?;
                    match subpaths.last_mut() {
                        Some(current) if !current.closed => current.points.push(point),
                        _ => {
                            return Err(CanvasError::InvalidPath(
                                "line segment without a current point".to_string(),
                            ))
                        }
                    }
                }
                "Z" => match subpaths.last_mut() {
                    Some(current) => current.closed = true,
                    None => return Err(CanvasError::InvalidPath("close without a subpath".to_string())),
                },
                other => {
                    return Err(CanvasError::InvalidPath(format!("unexpected token {other:?}")));
                }
            }
        }

        if subpaths.is_empty() {
            return Err(CanvasError::InvalidPath("empty path".to_string()));
        }
        Ok(Self { subpaths })
    }

    pub fn bounds(&self) -> Rect {
        let mut rect = Rect::NOTHING;
        for point in self.subpaths.iter().flat_map(|sub| sub.points.iter()) {
            rect.extend_with(*point);
        }
        rect
    }
}

/// Splits a description into command letters and numbers.
///
/// Command letters may be glued to the following number (`M10 20`).
struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Tokens<'a> {
    fn new(description: &'a str) -> Self {
        Self { rest: description }
    }

    fn next_token(&mut self) -> Option<&'a str> {
        self.rest = self.rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        let first = self.rest.chars().next()?;
        let len = if first.is_ascii_alphabetic() {
            1
        } else {
            self.rest
                .find(|c: char| c.is_whitespace() || c == ',' || (c.is_ascii_alphabetic() && c != 'e'))
                .unwrap_or(self.rest.len())
        };
        let (token, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(token)
    }

    fn number(&mut self) -> CanvasResult<f32> {
        let token = self
            .next_token()
            .ok_or_else(|| CanvasError::InvalidPath("missing coordinate".to_string()))?;
        let value: f32 = token
            .parse()
            .map_err(|_| CanvasError::InvalidPath(format!("bad coordinate {token:?}")))?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(CanvasError::InvalidPath(format!("non-finite coordinate {token:?}")))
        }
    }

    fn point(&mut self) -> CanvasResult<Pos2> {
        Ok(Pos2::new(self.number()?, self.number()?))
    }
}

/// The stroke currently being drawn.
///
/// Points are kept as-is while dragging and encoded into a path description
/// only when the stroke is finished.
#[derive(Debug, Clone, PartialEq)]
pub struct InProgressPath {
    points: Vec<Pos2>,
    color: Color32,
    stroke_width: f32,
}

impl InProgressPath {
    pub fn new(color: Color32, stroke_width: f32, start: Pos2) -> Self {
        Self {
            points: vec![start],
            color,
            stroke_width,
        }
    }

    pub fn add_point(&mut self, point: Pos2) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    pub fn color(&self) -> Color32 {
        self.color
    }

    pub fn stroke_width(&self) -> f32 {
        self.stroke_width
    }

    pub fn finish(self) -> PathRecord {
        let mut path = String::with_capacity(self.points.len() * 12);
        for (i, point) in self.points.iter().enumerate() {
            let command = if i == 0 { 'M' } else { 'L' };
            if i > 0 {
                path.push(' ');
            }
            let _ = write!(path, "{command}{} {}", point.x, point.y);
        }
        PathRecord::new(self.color, self.stroke_width, path)
    }
}
