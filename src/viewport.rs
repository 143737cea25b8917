use egui::{pos2, Pos2, Rect, Vec2};

/// Multiplier applied per wheel notch.
pub const ZOOM_FACTOR: f32 = 1.15;
/// Smallest accepted zoom factor, relative to the fitted size.
pub const MIN_ZOOM: f32 = 0.05;
/// Largest accepted zoom factor, relative to the fitted size.
pub const MAX_ZOOM: f32 = 50.0;

/// Maps between screen positions inside the canvas rect and image pixel
/// coordinates (origin at the image's top-left corner).
///
/// The effective on-screen scale is `fit_scale * zoom`. `fit_scale` is
/// whatever scale the last fit-to-view picked so the whole image shows,
/// and is not clamped. `zoom` is the wheel-driven factor on top of it,
/// kept within [`MIN_ZOOM`, `MAX_ZOOM`]; fitting resets it to 1.0, so the
/// zoom limits are always relative to the fitted size.
#[derive(Clone, Debug)]
pub struct ViewportTransform {
    zoom: f32,
    fit_scale: f32,
    /// Offset of the image center from the canvas rect center, in screen
    /// pixels.
    pan: Vec2,
    image_size: Vec2,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportTransform {
    pub fn new() -> Self {
        Self {
            zoom: 1.0,
            fit_scale: 1.0,
            pan: Vec2::ZERO,
            image_size: Vec2::ZERO,
        }
    }

    /// Forgets the image and returns to the identity mapping.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn set_image(&mut self, width: u32, height: u32) {
        self.image_size = egui::vec2(width as f32, height as f32);
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Screen pixels per image pixel.
    pub fn scale(&self) -> f32 {
        self.fit_scale * self.zoom
    }

    /// Rescales so the whole image fits inside `rect` and centers it.
    pub fn fit_to(&mut self, rect: Rect) {
        if self.image_size.x > 0.0
            && self.image_size.y > 0.0
            && rect.width() > 0.0
            && rect.height() > 0.0
        {
            self.fit_scale =
                (rect.width() / self.image_size.x).min(rect.height() / self.image_size.y);
        } else {
            self.fit_scale = 1.0;
        }
        self.zoom = 1.0;
        self.pan = Vec2::ZERO;
    }

    pub fn to_screen(&self, rect: Rect, image_pos: Pos2) -> Pos2 {
        rect.center() + self.pan + (image_pos.to_vec2() - self.image_size * 0.5) * self.scale()
    }

    pub fn to_image(&self, rect: Rect, screen_pos: Pos2) -> Pos2 {
        let rel = (screen_pos - rect.center() - self.pan) / self.scale();
        (rel + self.image_size * 0.5).to_pos2()
    }

    /// The image's on-screen footprint.
    pub fn image_rect(&self, rect: Rect) -> Rect {
        Rect::from_min_max(
            self.to_screen(rect, pos2(0.0, 0.0)),
            self.to_screen(rect, self.image_size.to_pos2()),
        )
    }

    /// Integer pixel under a screen position, or `None` when it falls
    /// outside the image. Fractional coordinates truncate toward zero, so
    /// positions marginally left or above the image still land on pixel 0.
    pub fn pixel_at(&self, rect: Rect, screen_pos: Pos2) -> Option<(u32, u32)> {
        let image_pos = self.to_image(rect, screen_pos);
        let x = image_pos.x as i64;
        let y = image_pos.y as i64;
        if x >= 0 && y >= 0 && x < self.image_size.x as i64 && y < self.image_size.y as i64 {
            Some((x as u32, y as u32))
        } else {
            None
        }
    }

    /// Moves the view by a screen-space delta. Never constrained, the
    /// image may leave the rect entirely.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// One zoom notch about `anchor` (a screen position). Steps whose
    /// result would leave [`MIN_ZOOM`, `MAX_ZOOM`] are rejected outright
    /// rather than clamped, so the zoom level is always an exact power of
    /// [`ZOOM_FACTOR`]. Returns whether the step was applied.
    pub fn zoom_step(&mut self, rect: Rect, anchor: Pos2, zoom_in: bool) -> bool {
        let factor = if zoom_in { ZOOM_FACTOR } else { 1.0 / ZOOM_FACTOR };
        let next = self.zoom * factor;
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&next) {
            return false;
        }
        // Re-derive pan so the image point under the anchor stays put.
        let anchor_rel = anchor - rect.center() - self.pan;
        self.pan -= anchor_rel * (factor - 1.0);
        self.zoom = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::vec2;

    fn rect() -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(1200.0, 800.0))
    }

    fn fitted(width: u32, height: u32) -> ViewportTransform {
        let mut transform = ViewportTransform::new();
        transform.set_image(width, height);
        transform.fit_to(rect());
        transform
    }

    #[test]
    fn fit_centers_image_and_resets_zoom() {
        let transform = fitted(800, 600);
        assert_eq!(transform.zoom(), 1.0);
        // 1200/800 = 1.5 vs 800/600 = 1.333..; the smaller ratio wins.
        assert!((transform.scale() - 800.0 / 600.0).abs() < 1e-4);
        let image_center = transform.to_screen(rect(), pos2(400.0, 300.0));
        assert!((image_center - rect().center()).length() < 1e-3);
        let shown = transform.image_rect(rect());
        assert!(rect().expand(0.01).contains_rect(shown));
    }

    #[test]
    fn screen_image_round_trip_stays_within_half_pixel() {
        let mut transform = fitted(1920, 1080);
        for _ in 0..5 {
            transform.zoom_step(rect(), pos2(321.0, 456.0), true);
        }
        transform.pan_by(vec2(-87.0, 33.5));
        for screen in [pos2(0.0, 0.0), pos2(600.0, 400.0), pos2(1199.0, 799.0)] {
            let back = transform.to_screen(rect(), transform.to_image(rect(), screen));
            assert!((back - screen).length() < 0.5, "{screen:?} -> {back:?}");
        }
    }

    #[test]
    fn zoom_keeps_anchor_point_fixed() {
        let mut transform = fitted(640, 480);
        let anchor = pos2(250.0, 310.0);
        let under_anchor = transform.to_image(rect(), anchor);
        for zoom_in in [true, true, true, false] {
            transform.zoom_step(rect(), anchor, zoom_in);
            let now = transform.to_screen(rect(), under_anchor);
            assert!((now - anchor).length() < 0.5);
        }
    }

    #[test]
    fn zoom_in_stops_at_last_step_below_max() {
        let mut transform = fitted(640, 480);
        let anchor = rect().center();
        for _ in 0..100 {
            transform.zoom_step(rect(), anchor, true);
            assert!(transform.zoom() <= MAX_ZOOM);
        }
        // Saturated: one more accepted step would overshoot the limit.
        assert!(!transform.zoom_step(rect(), anchor, true));
        assert!(transform.zoom() * ZOOM_FACTOR > MAX_ZOOM);
    }

    #[test]
    fn zoom_out_stops_at_last_step_above_min() {
        let mut transform = fitted(640, 480);
        let anchor = rect().center();
        for _ in 0..100 {
            transform.zoom_step(rect(), anchor, false);
            assert!(transform.zoom() >= MIN_ZOOM);
        }
        assert!(!transform.zoom_step(rect(), anchor, false));
        assert!(transform.zoom() / ZOOM_FACTOR < MIN_ZOOM);
    }

    #[test]
    fn pan_shifts_mapping_by_exact_delta() {
        let mut transform = fitted(800, 600);
        let before = transform.to_screen(rect(), pos2(100.0, 100.0));
        transform.pan_by(vec2(40.0, -25.0));
        let after = transform.to_screen(rect(), pos2(100.0, 100.0));
        assert!((after - before - vec2(40.0, -25.0)).length() < 1e-3);
    }

    #[test]
    fn pan_is_unconstrained() {
        let mut transform = fitted(800, 600);
        transform.pan_by(vec2(100_000.0, -100_000.0));
        let shown = transform.image_rect(rect());
        assert!(!rect().intersects(shown));
        // The mapping itself stays consistent even far off screen.
        let back = transform.to_screen(rect(), transform.to_image(rect(), pos2(10.0, 10.0)));
        assert!((back - pos2(10.0, 10.0)).length() < 0.5);
    }

    #[test]
    fn pixel_lookup_truncates_toward_zero() {
        // 100x100 image in a 1200x800 rect fits at 8x.
        let transform = fitted(100, 100);
        let at = |ix: f32, iy: f32| {
            transform.pixel_at(rect(), transform.to_screen(rect(), pos2(ix, iy)))
        };
        assert_eq!(at(10.7, 5.2), Some((10, 5)));
        // Slightly outside the top-left still truncates onto pixel 0.
        assert_eq!(at(-0.4, 3.0), Some((0, 3)));
        assert_eq!(at(-1.2, 3.0), None);
        assert_eq!(at(99.9, 99.9), Some((99, 99)));
        assert_eq!(at(100.0, 50.0), None);
    }

    #[test]
    fn pixel_lookup_without_image_is_none() {
        let transform = ViewportTransform::new();
        assert_eq!(transform.pixel_at(rect(), rect().center()), None);
    }
}
