use egui::{Color32, Pos2, Sense, Stroke};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::{CanvasSize, SizePreset, SurfaceConfig};
use crate::renderer::{CanvasView, Renderer};
use crate::surface::DrawingSurface;
use crate::sync::LocalRelay;
use crate::tool::{BackgroundColor, BrushWidth, Tool};

const PALETTE: [Color32; 8] = [
    Color32::BLACK,
    Color32::WHITE,
    Color32::from_rgb(0xe5, 0x39, 0x35),
    Color32::from_rgb(0xfb, 0x8c, 0x00),
    Color32::from_rgb(0xfd, 0xd8, 0x35),
    Color32::from_rgb(0x43, 0xa0, 0x47),
    Color32::from_rgb(0x1e, 0x88, 0xe5),
    Color32::from_rgb(0x8e, 0x24, 0xaa),
];

/// What survives a restart: the editor's drawing and background.
/// We derive Deserialize/Serialize so we can persist it on shutdown.
#[derive(serde::Deserialize, serde::Serialize, Debug, Default, Clone, PartialEq)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct PersistedDrawing {
    pub serialized_state: Option<String>,
    pub background: BackgroundColor,
}

/// Demo host: an editing surface and its partner's read-only view,
/// paired through an in-process relay.
pub struct CanvasApp {
    relay: LocalRelay,
    editor: DrawingSurface,
    partner: DrawingSurface,
    editor_renderer: Renderer,
    partner_renderer: Renderer,
}

impl CanvasApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let persisted: PersistedDrawing = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        Self::with_relay(LocalRelay::new(), persisted)
    }

    pub fn with_relay(relay: LocalRelay, persisted: PersistedDrawing) -> Self {
        let session_id = Uuid::new_v4().to_string();
        let base = SurfaceConfig {
            session_id,
            initial_state: persisted.serialized_state,
            background: persisted.background,
            canvas: CanvasSize::Preset(SizePreset::Medium),
            ..Default::default()
        };

        let editor = DrawingSurface::new(
            SurfaceConfig {
                participant_id: format!("editor-{}", Uuid::new_v4()),
                editable: true,
                ..base.clone()
            },
            Arc::new(relay.clone()),
        );
        let partner = DrawingSurface::new(
            SurfaceConfig {
                participant_id: format!("partner-{}", Uuid::new_v4()),
                editable: false,
                ..base
            },
            Arc::new(relay.clone()),
        );

        Self {
            relay,
            editor,
            partner,
            editor_renderer: Renderer::new(),
            partner_renderer: Renderer::new(),
        }
    }

    pub fn editor(&self) -> &DrawingSurface {
        &self.editor
    }

    pub fn partner(&self) -> &DrawingSurface {
        &self.partner
    }

    pub fn editor_mut(&mut self) -> &mut DrawingSurface {
        &mut self.editor
    }

    /// Advance both surfaces by one loop iteration
    pub fn pump(&mut self) {
        self.editor.pump();
        self.partner.pump();
    }

    pub fn persisted(&self) -> PersistedDrawing {
        PersistedDrawing {
            serialized_state: self.editor.serialized(),
            background: self.editor.state().background(),
        }
    }

    fn tools_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("tools_panel")
            .resizable(true)
            .default_width(180.0)
            .show(ctx, |ui| {
                ui.heading("Tools");
                let active = self.editor.tools().active_tool;
                for tool in Tool::ALL {
                    if ui.selectable_label(active == tool, tool.label()).clicked() {
                        log::info!("Tool selected from UI: {:?}", tool);
                        self.editor.set_tool(tool);
                    }
                }
                ui.separator();

                ui.label("Color:");
                ui.horizontal_wrapped(|ui| {
                    let current = self.editor.tools().color;
                    for color in PALETTE {
                        if color_swatch(ui, color, color == current).clicked() {
                            self.editor.set_color(color);
                        }
                    }
                });

                ui.label("Width:");
                ui.horizontal(|ui| {
                    let current = self.editor.tools().brush_width;
                    for width in BrushWidth::ALL {
                        let label = format!("{} px", width.pixels());
                        if ui.selectable_label(current == width, label).clicked() {
                            self.editor.set_brush_width(width);
                        }
                    }
                });

                let background = self.editor.state().background();
                if ui.button(format!("Background: {:?}", background)).clicked() {
                    self.editor.toggle_background();
                }
                ui.separator();

                ui.horizontal(|ui| {
                    if ui.add_enabled(self.editor.can_undo(), egui::Button::new("Undo")).clicked() {
                        self.editor.undo();
                    }
                    if ui.add_enabled(self.editor.can_redo(), egui::Button::new("Redo")).clicked() {
                        self.editor.redo();
                    }
                    if ui.button("Clear").clicked() {
                        self.editor.clear();
                    }
                });
                ui.separator();

                let status = if self.editor.is_syncing() {
                    "Syncing…"
                } else if self.editor.has_pending_write() {
                    "Waiting to sync"
                } else {
                    "Synced"
                };
                ui.label(status);

                let mut offline = self.relay.is_offline();
                if ui.checkbox(&mut offline, "Simulate offline").changed() {
                    self.relay.set_offline(offline);
                }

                let history = self.editor.history();
                ui.label(format!("Paths: {}", self.editor.paths().len()));
                ui.label(format!("History: {}/{}", history.index() + 1, history.len()));
                ui.label(format!("Strokes: {}", self.editor.stroke_count()));
            });
    }
}

impl eframe::App for CanvasApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        self.editor.flush();
        eframe::set_value(storage, eframe::APP_KEY, &self.persisted());
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump();
        self.tools_panel(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.columns(2, |columns| {
                columns[0].heading("You");
                canvas_ui(&mut columns[0], &mut self.editor, &mut self.editor_renderer);
                columns[1].heading("Partner");
                canvas_ui(&mut columns[1], &mut self.partner, &mut self.partner_renderer);
            });
        });

        // Wake up for the debounced write even when the pointer is idle
        if let Some(secs) = self.editor.time_until_sync() {
            ctx.request_repaint_after(Duration::from_secs_f64(secs));
        }
    }
}

/// Allocate the canvas, route pointer gestures to the surface and paint it
fn canvas_ui(ui: &mut egui::Ui, surface: &mut DrawingSurface, renderer: &mut Renderer) {
    let sense = if surface.is_editable() {
        Sense::click_and_drag()
    } else {
        Sense::hover()
    };
    let (response, painter) = ui.allocate_painter(ui.available_size(), sense);
    let view = CanvasView::fit(response.rect, surface.state().width(), surface.state().height());

    if let Some(pos) = response.interact_pointer_pos() {
        let canvas_pos = view.to_canvas(pos);
        if response.drag_started() {
            // egui reports the drag once the pointer has left the press point
            let origin = ui.input(|i| i.pointer.press_origin()).map(|p| view.to_canvas(p));
            begin_stroke(surface, origin, canvas_pos);
        } else if response.dragged() {
            surface.drag_update(canvas_pos);
        }
        if response.clicked() {
            surface.tap(canvas_pos);
        }
    }
    if response.drag_stopped() {
        surface.drag_end();
    }

    renderer.render(&painter, &view, surface.state(), surface.in_progress());
}

/// Start a stroke where the press began and catch up to the pointer
fn begin_stroke(surface: &mut DrawingSurface, press_origin: Option<Pos2>, current: Pos2) {
    match press_origin {
        Some(origin) if origin != current => {
            surface.drag_start(origin);
            surface.drag_update(current);
        }
        _ => surface.drag_start(current),
    }
}

fn color_swatch(ui: &mut egui::Ui, color: Color32, selected: bool) -> egui::Response {
    let (rect, response) = ui.allocate_exact_size(egui::vec2(20.0, 20.0), Sense::click());
    if ui.is_rect_visible(rect) {
        ui.painter().rect_filled(rect, 4.0, color);
        let border = if selected {
            Stroke::new(2.0, Color32::from_rgb(33, 150, 243)) // Light blue when selected
        } else {
            Stroke::new(1.0, Color32::from_gray(90))
        };
        ui.painter().rect_stroke(rect, 4.0, border);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partner_mirrors_editor() {
        let mut app = CanvasApp::with_relay(LocalRelay::new(), PersistedDrawing::default());
        let editor = app.editor_mut();
        editor.drag_start(Pos2::new(10.0, 10.0));
        editor.drag_update(Pos2::new(20.0, 20.0));
        editor.drag_end();
        editor.flush();
        app.pump();

        assert_eq!(app.partner().paths(), app.editor().paths());
        assert!(!app.partner().is_editable());
    }

    #[test]
    fn test_stroke_starts_at_press_origin() {
        let mut app = CanvasApp::with_relay(LocalRelay::new(), PersistedDrawing::default());
        let editor = app.editor_mut();
        begin_stroke(editor, Some(Pos2::new(10.0, 10.0)), Pos2::new(16.0, 10.0));
        editor.drag_update(Pos2::new(20.0, 12.0));
        editor.drag_end();
        assert_eq!(editor.paths()[0].path(), "M10 10 L16 10 L20 12");

        begin_stroke(editor, None, Pos2::new(30.0, 30.0));
        editor.drag_end();
        assert_eq!(editor.paths()[1].path(), "M30 30");
    }

    #[test]
    fn test_persisted_drawing_round_trips() {
        let mut app = CanvasApp::with_relay(LocalRelay::new(), PersistedDrawing::default());
        app.editor_mut().set_background(BackgroundColor::Black);
        app.editor_mut().drag_start(Pos2::new(1.0, 1.0));
        app.editor_mut().drag_end();
        let persisted = app.persisted();

        let restored = CanvasApp::with_relay(LocalRelay::new(), persisted);
        assert_eq!(restored.editor().paths().len(), 1);
        assert_eq!(restored.editor().state().background(), BackgroundColor::Black);
        assert_eq!(restored.partner().paths().len(), 1);
    }
}
