use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::error::{CanvasError, CanvasResult};

/// The tools available on the drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tool {
    Brush,
    Eraser,
    PaintBucket,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Brush, Tool::Eraser, Tool::PaintBucket];

    pub fn label(&self) -> &'static str {
        match self {
            Tool::Brush => "🖌 Brush",
            Tool::Eraser => "⌫ Eraser",
            Tool::PaintBucket => "🪣 Fill",
        }
    }
}

/// Brush widths offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrushWidth {
    Thin,
    Medium,
    Thick,
}

impl BrushWidth {
    pub const ALL: [BrushWidth; 3] = [BrushWidth::Thin, BrushWidth::Medium, BrushWidth::Thick];

    pub fn pixels(&self) -> f32 {
        match self {
            BrushWidth::Thin => 2.0,
            BrushWidth::Medium => 5.0,
            BrushWidth::Thick => 10.0,
        }
    }
}

/// Canvas background colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundColor {
    Black,
    #[default]
    White,
    Beige,
}

impl BackgroundColor {
    pub fn color(&self) -> Color32 {
        match self {
            BackgroundColor::Black => Color32::from_rgb(0x00, 0x00, 0x00),
            BackgroundColor::White => Color32::from_rgb(0xff, 0xff, 0xff),
            BackgroundColor::Beige => Color32::from_rgb(0xf5, 0xf5, 0xdc),
        }
    }

    pub fn hex(&self) -> String {
        hex_color(self.color())
    }

    /// Next background in the toggle cycle
    pub fn next(&self) -> Self {
        match self {
            BackgroundColor::Black => BackgroundColor::White,
            BackgroundColor::White => BackgroundColor::Beige,
            BackgroundColor::Beige => BackgroundColor::Black,
        }
    }

    /// Resolve a background from its hex form as carried in sync metadata
    pub fn from_hex(hex: &str) -> CanvasResult<Self> {
        let color = parse_hex_color(hex)?;
        [BackgroundColor::Black, BackgroundColor::White, BackgroundColor::Beige]
            .into_iter()
            .find(|bg| bg.color() == color)
            .ok_or_else(|| CanvasError::InvalidColor(hex.to_string()))
    }
}

/// Tool settings of the editing participant.
///
/// The eraser has no color of its own: it always paints with the current
/// background, resolved when the stroke starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolState {
    pub active_tool: Tool,
    pub color: Color32,
    pub brush_width: BrushWidth,
    pub background: BackgroundColor,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            active_tool: Tool::Brush,
            color: Color32::BLACK,
            brush_width: BrushWidth::Medium,
            background: BackgroundColor::default(),
        }
    }
}

impl ToolState {
    /// Color a new record is painted with under the active tool
    pub fn effective_color(&self) -> Color32 {
        match self.active_tool {
            Tool::Brush | Tool::PaintBucket => self.color,
            Tool::Eraser => self.background.color(),
        }
    }
}

/// Parse `#rrggbb` (or `#rgb`) into an opaque color
pub fn parse_hex_color(hex: &str) -> CanvasResult<Color32> {
    let invalid = || CanvasError::InvalidColor(hex.to_string());
    let digits = hex.trim().strip_prefix('#').ok_or_else(invalid)?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
    match digits.len() {
        6 => Ok(Color32::from_rgb(
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        )),
        3 => {
            let short = |s: &str| channel(s).map(|v| v * 17);
            Ok(Color32::from_rgb(
                short(&digits[0..1])?,
                short(&digits[1..2])?,
                short(&digits[2..3])?,
            ))
        }
        _ => Err(invalid()),
    }
}

/// Format a color as lower-case `#rrggbb`, dropping alpha
pub fn hex_color(color: Color32) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
}
