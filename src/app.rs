use std::path::{Path, PathBuf};

use anyhow::Context as _;
use eframe::egui;
use egui_extras::{Column, TableBuilder};
use serde::Serialize;

use crate::canvas::{CanvasEvent, ImageCanvas, Mode};
use crate::markers::{BoxMarker, PointMarker};

const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"];

const SHORTCUTS: &[(&str, &str)] = &[
    ("Ctrl+O", "Load an image"),
    ("P", "Cycle mode (Hand / Point / Box)"),
    ("Ctrl+R", "Clear all marks"),
    ("Ctrl+Shift+R", "Fit image to window"),
    ("Ctrl+S", "Export marks as JSON"),
    ("Ctrl+/", "Toggle this guide"),
    ("Left click", "Pan (Hand), place point (Point), box corner (Box)"),
    ("Right click", "Cancel box draft, otherwise undo last mark"),
    ("Middle drag / Ctrl+drag", "Pan in any mode"),
    ("Double click", "Fit image to window (Hand mode)"),
    ("Mouse wheel", "Zoom about the cursor"),
    ("Drag & drop", "Load the dropped image"),
];

/// Sidecar written by Export JSON.
#[derive(Serialize)]
struct MarkerExport {
    image: String,
    points: Vec<PointMarker>,
    boxes: Vec<BoxMarker>,
}

pub struct NavigatorApp {
    canvas: ImageCanvas,
    image_path: Option<PathBuf>,
    pending_title: Option<String>,
    coord_text: String,
    point_count: usize,
    box_count: usize,
    show_shortcuts: bool,
}

impl NavigatorApp {
    pub fn new(initial_image: Option<PathBuf>) -> Self {
        let mut app = Self {
            canvas: ImageCanvas::new(),
            image_path: None,
            pending_title: None,
            coord_text: String::from("Ready. Load an image or drop one onto the window."),
            point_count: 0,
            box_count: 0,
            show_shortcuts: false,
        };
        if let Some(path) = initial_image {
            // The CLI argument loads directly; anything decodable works
            // there regardless of extension.
            app.load_image(&path);
        }
        app
    }

    /// Entry point for dropped files, which are the only loads filtered
    /// by extension. Toolbar loads go through
    /// [`Self::open_image_dialog`], which confirms replacement before
    /// the picker opens.
    fn request_load(&mut self, path: &Path) {
        if !is_supported_image(path) {
            log::warn!("unsupported file: {}", path.display());
            rfd::MessageDialog::new()
                .set_level(rfd::MessageLevel::Warning)
                .set_title("Load Image")
                .set_description(format!("Unsupported file type:\n{}", path.display()))
                .set_buttons(rfd::MessageButtons::Ok)
                .show();
            return;
        }
        self.load_image(path);
    }

    fn load_image(&mut self, path: &Path) {
        if self.canvas.load_image(path) {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            self.pending_title = Some(format!("Image Navigator - {name}"));
            self.image_path = Some(path.to_path_buf());
        } else {
            rfd::MessageDialog::new()
                .set_level(rfd::MessageLevel::Warning)
                .set_title("Load Image")
                .set_description(format!("Could not load:\n{}", path.display()))
                .set_buttons(rfd::MessageButtons::Ok)
                .show();
        }
    }

    fn open_image_dialog(&mut self) {
        if self.canvas.has_image() && !self.confirm_replace() {
            return;
        }
        let picked = rfd::FileDialog::new()
            .add_filter("Images", SUPPORTED_EXTENSIONS)
            .pick_file();
        if let Some(path) = picked {
            self.load_image(&path);
        }
    }

    fn confirm_replace(&self) -> bool {
        let answer = rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Warning)
            .set_title("Replace Image")
            .set_description("Load a new image? Existing marks will be removed.")
            .set_buttons(rfd::MessageButtons::YesNo)
            .show();
        matches!(answer, rfd::MessageDialogResult::Yes)
    }

    fn export_markers(&self) {
        let Some(image_path) = &self.image_path else {
            log::warn!("export requested with no image loaded");
            return;
        };
        match self.write_sidecar(image_path) {
            Ok(out) => log::info!("marks exported to {}", out.display()),
            Err(err) => {
                log::warn!("export failed: {err:#}");
                rfd::MessageDialog::new()
                    .set_level(rfd::MessageLevel::Error)
                    .set_title("Export JSON")
                    .set_description(format!("Export failed:\n{err:#}"))
                    .set_buttons(rfd::MessageButtons::Ok)
                    .show();
            }
        }
    }

    fn write_sidecar(&self, image_path: &Path) -> anyhow::Result<PathBuf> {
        let out = markers_sidecar_path(image_path);
        let export = MarkerExport {
            image: image_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            points: self.canvas.points(),
            boxes: self.canvas.boxes(),
        };
        let json = serde_json::to_string_pretty(&export).context("serializing marks")?;
        std::fs::write(&out, json).with_context(|| format!("writing {}", out.display()))?;
        Ok(out)
    }

    fn handle_events(&mut self) {
        for event in self.canvas.take_events() {
            match event {
                CanvasEvent::CoordChanged { x, y } => {
                    self.coord_text = format!("x: {x}  y: {y}");
                }
                CanvasEvent::MarkerAdded(_)
                | CanvasEvent::MarkerUndone(_)
                | CanvasEvent::AnnotationsCleared => {
                    let (points, boxes) = self.canvas.marker_counts();
                    self.point_count = points;
                    self.box_count = boxes;
                }
                CanvasEvent::ModeChanged(mode) => {
                    log::debug!("mode set to {}", mode.label());
                }
                CanvasEvent::ImageDropped(path) => {
                    self.request_load(&path);
                }
            }
        }
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        let (open, toggle, clear, fit, export, guide) = ctx.input(|i| {
            (
                i.modifiers.ctrl && i.key_pressed(egui::Key::O),
                i.modifiers.is_none() && i.key_pressed(egui::Key::P),
                i.modifiers.ctrl && !i.modifiers.shift && i.key_pressed(egui::Key::R),
                i.modifiers.ctrl && i.modifiers.shift && i.key_pressed(egui::Key::R),
                i.modifiers.ctrl && i.key_pressed(egui::Key::S),
                i.modifiers.ctrl && i.key_pressed(egui::Key::Slash),
            )
        });
        if open {
            self.open_image_dialog();
        }
        if toggle {
            self.canvas.toggle_mode();
        }
        if clear {
            self.canvas.clear_annotations();
        }
        if fit {
            self.canvas.fit_view();
        }
        if export {
            self.export_markers();
        }
        if guide {
            self.show_shortcuts = !self.show_shortcuts;
        }
    }

    fn toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Load Image").clicked() {
                    self.open_image_dialog();
                }
                ui.separator();
                for mode in [Mode::Hand, Mode::Point, Mode::Box] {
                    if ui
                        .selectable_label(self.canvas.mode() == mode, mode.label())
                        .clicked()
                    {
                        self.canvas.set_mode(mode);
                    }
                }
                ui.separator();
                if ui.button("Undo").clicked() {
                    self.canvas.undo_last_marker();
                }
                if ui.button("Clear Marks").clicked() {
                    self.canvas.clear_annotations();
                }
                if ui.button("Fit View").clicked() {
                    self.canvas.fit_view();
                }
                if ui.button("Export JSON").clicked() {
                    self.export_markers();
                }
                ui.separator();
                ui.label(format!(
                    "Points: {} | Boxes: {}",
                    self.point_count, self.box_count
                ));
                ui.separator();
                ui.label(format!("Zoom: {:.0}%", self.canvas.zoom() * 100.0));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Shortcuts").clicked() {
                        self.show_shortcuts = !self.show_shortcuts;
                    }
                    ui.colored_label(mode_tint(self.canvas.mode()), self.canvas.mode().label());
                    ui.label("Mode:");
                });
            });
        });
    }

    fn status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let path_text = match &self.image_path {
                    Some(path) => path.display().to_string(),
                    None => String::from("No image"),
                };
                ui.label(path_text);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.monospace(&self.coord_text);
                });
            });
        });
    }

    fn shortcuts_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_shortcuts;
        egui::Window::new("Shortcuts")
            .open(&mut open)
            .resizable(false)
            .default_width(420.0)
            .show(ctx, |ui| {
                TableBuilder::new(ui)
                    .striped(true)
                    .column(Column::auto().at_least(170.0))
                    .column(Column::remainder())
                    .header(18.0, |mut header| {
                        header.col(|ui| {
                            ui.strong("Binding");
                        });
                        header.col(|ui| {
                            ui.strong("Action");
                        });
                    })
                    .body(|mut body| {
                        for (binding, action) in SHORTCUTS {
                            body.row(18.0, |mut row| {
                                row.col(|ui| {
                                    ui.monospace(*binding);
                                });
                                row.col(|ui| {
                                    ui.label(*action);
                                });
                            });
                        }
                    });
            });
        self.show_shortcuts = open;
    }
}

impl eframe::App for NavigatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_events();
        if let Some(title) = self.pending_title.take() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title));
        }
        self.handle_keyboard(ctx);
        self.toolbar(ctx);
        self.status_bar(ctx);
        self.shortcuts_window(ctx);
        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas.ui(ui);
        });
    }
}

fn mode_tint(mode: Mode) -> egui::Color32 {
    match mode {
        Mode::Hand => egui::Color32::from_rgb(140, 180, 230),
        Mode::Point => egui::Color32::from_rgb(235, 110, 110),
        Mode::Box => egui::Color32::from_rgb(110, 210, 140),
    }
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// `photo.png` exports next to itself as `photo.png.markers.json`.
fn markers_sidecar_path(image_path: &Path) -> PathBuf {
    let mut name = image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("image"));
    name.push_str(".markers.json");
    image_path.with_file_name(name)
}
