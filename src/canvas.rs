use std::path::{Path, PathBuf};

use eframe::egui;
use image::DynamicImage;

use crate::markers::{BoxMarker, Marker, MarkerKind, MarkerStore, PointMarker};
use crate::viewport::ViewportTransform;

/// Screen-space radius of a point glyph, independent of zoom.
const POINT_RADIUS: f32 = 4.0;

const BACKGROUND: egui::Color32 = egui::Color32::from_gray(40);
const POINT_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 50, 50);
const BOX_COLOR: egui::Color32 = egui::Color32::from_rgb(80, 200, 120);

/// Interaction mode. Exactly one is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Pan and inspect only.
    Hand,
    /// Primary clicks place point markers.
    Point,
    /// Primary clicks drive the two-click box protocol.
    Box,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Hand => "Hand",
            Mode::Point => "Point",
            Mode::Box => "Box",
        }
    }

    /// Guide-line tint for the marking modes; `None` disables the guide.
    fn crosshair_tint(self) -> Option<egui::Color32> {
        match self {
            Mode::Hand => None,
            Mode::Point => Some(POINT_COLOR),
            Mode::Box => Some(BOX_COLOR),
        }
    }
}

/// Notifications queued for the host and drained once per frame.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasEvent {
    /// Cursor moved over a valid image pixel.
    CoordChanged { x: u32, y: u32 },
    MarkerAdded(Marker),
    MarkerUndone(MarkerKind),
    AnnotationsCleared,
    /// Emitted on every `set_mode`, including sets to the current mode.
    ModeChanged(Mode),
    /// A file was dropped onto the canvas; decoding is the host's job.
    ImageDropped(PathBuf),
}

/// First corner of an in-progress box, in image pixels.
#[derive(Clone, Copy, Debug)]
struct BoxDraft {
    anchor: (u32, u32),
}

struct LoadedImage {
    rgba: image::RgbaImage,
    /// Uploaded lazily on the first painted frame.
    texture: Option<egui::TextureHandle>,
}

/// The annotation surface: a pannable, zoomable image viewport that
/// records point and box markers and reports what happens through
/// [`CanvasEvent`]s.
pub struct ImageCanvas {
    image: Option<LoadedImage>,
    transform: ViewportTransform,
    markers: MarkerStore,
    mode: Mode,
    draft: Option<BoxDraft>,
    /// Last pointer position over the canvas, screen space.
    cursor: Option<egui::Pos2>,
    panning: bool,
    /// Fits need the canvas rect, which is only known inside a frame, so
    /// load and `fit_view` latch this and `ui` applies it.
    pending_fit: bool,
    events: Vec<CanvasEvent>,
}

impl Default for ImageCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCanvas {
    pub fn new() -> Self {
        Self {
            image: None,
            transform: ViewportTransform::new(),
            markers: MarkerStore::new(),
            mode: Mode::Hand,
            draft: None,
            cursor: None,
            panning: false,
            pending_fit: false,
            events: Vec::new(),
        }
    }

    /// Decodes and installs a new image, dropping the previous session
    /// (markers, transform, draft). On failure returns `false` and leaves
    /// every part of the current session untouched.
    pub fn load_image(&mut self, path: &Path) -> bool {
        let decoded = match image::open(path) {
            Ok(decoded) => decoded,
            Err(err) => {
                log::warn!("could not load {}: {err}", path.display());
                return false;
            }
        };
        self.clear_all();
        self.install_image(decoded);
        true
    }

    fn install_image(&mut self, decoded: DynamicImage) {
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        log::info!("image installed: {width}x{height}");
        self.transform.set_image(width, height);
        self.image = Some(LoadedImage { rgba, texture: None });
        self.pending_fit = true;
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|loaded| loaded.rgba.dimensions())
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn zoom(&self) -> f32 {
        self.transform.zoom()
    }

    /// Switches mode and notifies the host. Leaving `Box` abandons any
    /// half-finished draft.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode == Mode::Box && mode != Mode::Box {
            self.draft = None;
        }
        self.mode = mode;
        self.events.push(CanvasEvent::ModeChanged(mode));
    }

    /// Cycles Hand, Point, Box.
    pub fn toggle_mode(&mut self) {
        let next = match self.mode {
            Mode::Hand => Mode::Point,
            Mode::Point => Mode::Box,
            Mode::Box => Mode::Hand,
        };
        self.set_mode(next);
    }

    /// Schedules a fit-to-view for the next frame.
    pub fn fit_view(&mut self) {
        if self.image.is_some() {
            self.pending_fit = true;
        }
    }

    /// Removes all markers and any draft, keeping the image and view.
    pub fn clear_annotations(&mut self) {
        self.draft = None;
        self.markers.clear();
        self.events.push(CanvasEvent::AnnotationsCleared);
    }

    /// Drops the image and every piece of session state.
    pub fn clear_all(&mut self) {
        self.image = None;
        self.transform.reset();
        self.markers.clear();
        self.draft = None;
        self.cursor = None;
        self.panning = false;
        self.pending_fit = false;
        self.events.push(CanvasEvent::AnnotationsCleared);
    }

    /// Removes the most recently committed marker of either kind and
    /// reports which kind it was.
    pub fn undo_last_marker(&mut self) -> Option<MarkerKind> {
        let kind = self.markers.undo_last()?.kind();
        self.events.push(CanvasEvent::MarkerUndone(kind));
        Some(kind)
    }

    pub fn points(&self) -> Vec<PointMarker> {
        self.markers.points()
    }

    pub fn boxes(&self) -> Vec<BoxMarker> {
        self.markers.boxes()
    }

    /// `(points, boxes)` committed so far.
    pub fn marker_counts(&self) -> (usize, usize) {
        self.markers.counts()
    }

    /// Hands the host everything that happened since the last drain.
    pub fn take_events(&mut self) -> Vec<CanvasEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Gestures ────────────────────────────────────────────────────────────

    fn primary_click(&mut self, rect: egui::Rect, screen: egui::Pos2, ctrl: bool) {
        // A Ctrl-chorded press belongs to the pan gesture; it must not
        // commit a point or touch the draft.
        if ctrl {
            return;
        }
        match self.mode {
            Mode::Hand => {}
            Mode::Point => {
                if let Some((x, y)) = self.transform.pixel_at(rect, screen) {
                    let point = self.markers.add_point(x, y);
                    self.events.push(CanvasEvent::MarkerAdded(Marker::Point(point)));
                }
            }
            Mode::Box => {
                let Some(pixel) = self.transform.pixel_at(rect, screen) else {
                    // Out-of-bounds clicks neither start nor advance a draft.
                    return;
                };
                match self.draft.take() {
                    None => self.draft = Some(BoxDraft { anchor: pixel }),
                    Some(draft) => {
                        // Degenerate corners end the draft without a commit.
                        if let Some(boxed) = self.markers.add_box(draft.anchor, pixel) {
                            self.events.push(CanvasEvent::MarkerAdded(Marker::Box(boxed)));
                        }
                    }
                }
            }
        }
    }

    /// Cancel an active draft, otherwise undo. The draft always absorbs
    /// the click so committed markers survive a stray cancel.
    fn secondary_click(&mut self) {
        if self.draft.take().is_some() {
            return;
        }
        self.undo_last_marker();
    }

    fn double_click(&mut self, rect: egui::Rect) {
        // Marking modes swallow double-clicks so the pair of presses
        // cannot commit twice.
        if self.mode == Mode::Hand && self.image.is_some() {
            self.apply_fit(rect);
        }
    }

    fn pan_by(&mut self, delta: egui::Vec2) {
        self.transform.pan_by(delta);
    }

    fn wheel_step(&mut self, rect: egui::Rect, anchor: egui::Pos2, zoom_in: bool) {
        if self.image.is_none() {
            return;
        }
        self.transform.zoom_step(rect, anchor, zoom_in);
    }

    fn cursor_moved(&mut self, rect: egui::Rect, screen: egui::Pos2) {
        let moved = self.cursor != Some(screen);
        self.cursor = Some(screen);
        if !moved || self.panning {
            return;
        }
        if let Some((x, y)) = self.transform.pixel_at(rect, screen) {
            self.events.push(CanvasEvent::CoordChanged { x, y });
        }
    }

    fn cursor_left(&mut self) {
        self.cursor = None;
    }

    fn apply_fit(&mut self, rect: egui::Rect) {
        self.transform.fit_to(rect);
        self.pending_fit = false;
    }

    // ── Frame integration ───────────────────────────────────────────────────

    /// Embeds the canvas and runs one frame: pending fit, input routing,
    /// then painting.
    pub fn ui(&mut self, ui: &mut egui::Ui) -> egui::Response {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;

        if self.pending_fit {
            self.apply_fit(rect);
        }
        self.route_input(ui.ctx(), &response, rect);
        self.ensure_texture(ui.ctx());
        self.paint(&painter, rect);
        self.paint_drop_hint(ui.ctx(), &painter, rect);
        self.set_cursor_icon(ui.ctx(), &response);
        self.collect_dropped_files(ui.ctx());

        response
    }

    fn route_input(&mut self, ctx: &egui::Context, response: &egui::Response, rect: egui::Rect) {
        let (modifiers, middle_down, pointer_delta) =
            ctx.input(|i| (i.modifiers, i.pointer.middle_down(), i.pointer.delta()));

        if response.secondary_clicked() {
            self.secondary_click();
        }

        // Middle button pans in any mode, as does a Ctrl-chorded or
        // Hand-mode primary drag.
        let primary_pan = response.dragged_by(egui::PointerButton::Primary)
            && (modifiers.ctrl || self.mode == Mode::Hand);
        if middle_down && (response.hovered() || self.panning) {
            self.pan_by(pointer_delta);
            self.panning = true;
        } else if primary_pan {
            self.pan_by(response.drag_delta());
            self.panning = true;
        } else {
            self.panning = false;
        }

        if response.double_clicked() {
            self.double_click(rect);
        } else if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.primary_click(rect, pos, modifiers.ctrl);
            }
        }

        if let Some(hover) = response.hover_pos() {
            for zoom_in in wheel_steps(ctx) {
                self.wheel_step(rect, hover, zoom_in);
            }
            self.cursor_moved(rect, hover);
        } else {
            self.cursor_left();
        }
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        let Some(loaded) = &mut self.image else { return };
        if loaded.texture.is_some() {
            return;
        }
        let size = [loaded.rgba.width() as usize, loaded.rgba.height() as usize];
        let pixels = loaded.rgba.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        loaded.texture =
            Some(ctx.load_texture("navigator-image", color_image, egui::TextureOptions::NEAREST));
    }

    fn paint(&self, painter: &egui::Painter, rect: egui::Rect) {
        painter.rect_filled(rect, 0.0, BACKGROUND);
        let Some(loaded) = &self.image else {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "Load an image or drop one here",
                egui::FontId::proportional(16.0),
                egui::Color32::from_gray(110),
            );
            return;
        };
        if let Some(texture) = &loaded.texture {
            let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
            painter.image(texture.id(), self.transform.image_rect(rect), uv, egui::Color32::WHITE);
        }
        for marker in self.markers.markers() {
            match marker {
                Marker::Point(point) => self.paint_point(painter, rect, *point),
                Marker::Box(boxed) => self.paint_box(painter, rect, *boxed),
            }
        }
        self.paint_draft(painter, rect);
        self.paint_cursor_overlays(painter, rect);
    }

    fn paint_point(&self, painter: &egui::Painter, rect: egui::Rect, point: PointMarker) {
        let center = self
            .transform
            .to_screen(rect, egui::pos2(point.x as f32 + 0.5, point.y as f32 + 0.5));
        let fill = egui::Color32::from_rgba_unmultiplied(255, 50, 50, 200);
        painter.circle(center, POINT_RADIUS, fill, egui::Stroke::new(1.5, POINT_COLOR));

        let galley = painter.layout_no_wrap(
            format!("({}, {})", point.x, point.y),
            egui::FontId::monospace(10.0),
            egui::Color32::WHITE,
        );
        let text_pos = center + egui::vec2(POINT_RADIUS + 4.0, -galley.size().y - 4.0);
        let plate = egui::Rect::from_min_size(text_pos, galley.size()).expand(2.0);
        painter.rect_filled(plate, 2.0, egui::Color32::from_rgba_unmultiplied(200, 50, 50, 200));
        painter.galley(text_pos, galley, egui::Color32::WHITE);
    }

    fn paint_box(&self, painter: &egui::Painter, rect: egui::Rect, boxed: BoxMarker) {
        let shown = egui::Rect::from_min_max(
            self.transform.to_screen(rect, egui::pos2(boxed.x1 as f32, boxed.y1 as f32)),
            self.transform.to_screen(rect, egui::pos2(boxed.x2 as f32, boxed.y2 as f32)),
        );
        painter.rect_stroke(
            shown,
            0.0,
            egui::Stroke::new(self.box_stroke_width(), BOX_COLOR),
            egui::StrokeKind::Middle,
        );

        let galley = painter.layout_no_wrap(
            format!("{}x{}", boxed.width(), boxed.height()),
            egui::FontId::monospace(10.0),
            egui::Color32::WHITE,
        );
        let text_pos = shown.min + egui::vec2(0.0, -galley.size().y - 4.0);
        let plate = egui::Rect::from_min_size(text_pos, galley.size()).expand(2.0);
        painter.rect_filled(plate, 2.0, egui::Color32::from_rgba_unmultiplied(30, 120, 60, 200));
        painter.galley(text_pos, galley, egui::Color32::WHITE);
    }

    /// Box outlines scale with the view, with a floor so they never
    /// vanish when zoomed far out.
    fn box_stroke_width(&self) -> f32 {
        (2.0 * self.transform.scale()).max(1.0)
    }

    fn paint_draft(&self, painter: &egui::Painter, rect: egui::Rect) {
        let Some(draft) = self.draft else { return };
        let anchor = egui::pos2(draft.anchor.0 as f32, draft.anchor.1 as f32);
        let anchor_center = self.transform.to_screen(rect, anchor + egui::vec2(0.5, 0.5));
        let tint = egui::Color32::from_rgba_unmultiplied(80, 200, 120, 160);
        painter.circle(anchor_center, POINT_RADIUS, tint, egui::Stroke::new(1.5, BOX_COLOR));

        // The preview tracks the raw pointer even outside the image;
        // bounds are enforced at commit time.
        let Some(cursor) = self.cursor else { return };
        let hover = self.transform.to_image(rect, cursor);
        let corner = egui::pos2(hover.x.trunc(), hover.y.trunc());
        let preview = egui::Rect::from_two_pos(
            self.transform.to_screen(rect, anchor),
            self.transform.to_screen(rect, corner),
        );
        painter.rect_stroke(
            preview,
            0.0,
            egui::Stroke::new(self.box_stroke_width(), tint),
            egui::StrokeKind::Middle,
        );
    }

    fn paint_cursor_overlays(&self, painter: &egui::Painter, rect: egui::Rect) {
        let Some(cursor) = self.cursor else { return };
        let Some((x, y)) = self.transform.pixel_at(rect, cursor) else { return };

        // Full-span guide lines through the hovered pixel, marking modes
        // only. They live in image space but keep a 1 px screen stroke.
        if let (Some(tint), Some((width, height))) =
            (self.mode.crosshair_tint(), self.image_size())
        {
            let cx = x as f32 + 0.5;
            let cy = y as f32 + 0.5;
            let stroke = egui::Stroke::new(1.0, tint);
            painter.line_segment(
                [
                    self.transform.to_screen(rect, egui::pos2(0.0, cy)),
                    self.transform.to_screen(rect, egui::pos2(width as f32, cy)),
                ],
                stroke,
            );
            painter.line_segment(
                [
                    self.transform.to_screen(rect, egui::pos2(cx, 0.0)),
                    self.transform.to_screen(rect, egui::pos2(cx, height as f32)),
                ],
                stroke,
            );
        }

        let galley = painter.layout_no_wrap(
            format!("({x}, {y})"),
            egui::FontId::monospace(12.0),
            egui::Color32::WHITE,
        );
        let text_pos = cursor + egui::vec2(15.0, -10.0);
        let plate = egui::Rect::from_min_size(text_pos, galley.size()).expand(3.0);
        painter.rect_filled(plate, 2.0, egui::Color32::from_rgba_unmultiplied(0, 0, 0, 180));
        painter.galley(text_pos, galley, egui::Color32::WHITE);
    }

    fn paint_drop_hint(&self, ctx: &egui::Context, painter: &egui::Painter, rect: egui::Rect) {
        let hovering = ctx.input(|i| !i.raw.hovered_files.is_empty());
        if !hovering {
            return;
        }
        painter.rect_filled(rect, 0.0, egui::Color32::from_rgba_unmultiplied(15, 45, 25, 140));
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "Drop image to load",
            egui::FontId::proportional(22.0),
            egui::Color32::WHITE,
        );
    }

    fn set_cursor_icon(&self, ctx: &egui::Context, response: &egui::Response) {
        if self.panning {
            ctx.set_cursor_icon(egui::CursorIcon::Grabbing);
        } else if response.hovered() {
            let icon = match self.mode {
                Mode::Hand => egui::CursorIcon::Default,
                Mode::Point | Mode::Box => egui::CursorIcon::Crosshair,
            };
            ctx.set_cursor_icon(icon);
        }
    }

    fn collect_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            if let Some(path) = file.path {
                self.events.push(CanvasEvent::ImageDropped(path));
            }
        }
    }
}

/// Discrete zoom notches carried by this frame's wheel events. Mouse
/// wheels report whole lines per event; trackpads report a stream of
/// point deltas which collapse to at most one notch per frame.
fn wheel_steps(ctx: &egui::Context) -> Vec<bool> {
    ctx.input(|i| {
        let mut steps = Vec::new();
        let mut trackpad = 0.0;
        for event in &i.events {
            if let egui::Event::MouseWheel { unit, delta, .. } = event {
                match unit {
                    egui::MouseWheelUnit::Line | egui::MouseWheelUnit::Page => {
                        if delta.y != 0.0 {
                            steps.push(delta.y > 0.0);
                        }
                    }
                    egui::MouseWheelUnit::Point => trackpad += delta.y,
                }
            }
        }
        if trackpad != 0.0 {
            steps.push(trackpad > 0.0);
        }
        steps
    })
}
