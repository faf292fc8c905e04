use crate::backend::ScreenPoint;
use crate::error::{Result, ShellError};
use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Stroke, Vec2};

/// display-info and enigo speak physical pixels everywhere except macOS.
const DESKTOP_IS_PHYSICAL: bool = !cfg!(target_os = "macos");

/// Where the overlay sits on the desktop and how capture pixels map onto it.
///
/// `origin` and `size` are egui points. Cursor positions and forwarded
/// clicks live in desktop units, `desktop_scale` of them per point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenGeometry {
    pub origin: Pos2,
    pub size: Vec2,
    /// Screenshot pixels per overlay point.
    pub pixels_per_point: f32,
    /// Desktop units (cursor, display rects) per overlay point.
    pub desktop_scale: f32,
}

impl ScreenGeometry {
    pub fn new(origin: Pos2, size: Vec2, pixels_per_point: f32) -> Self {
        Self {
            origin,
            size,
            pixels_per_point: pixels_per_point.max(f32::EPSILON),
            desktop_scale: 1.0,
        }
    }

    /// Geometry for a display rect given in desktop units.
    pub fn from_desktop(x: i32, y: i32, width: u32, height: u32, desktop_scale: f32) -> Self {
        let scale = if desktop_scale > 0.0 { desktop_scale } else { 1.0 };
        Self {
            origin: Pos2::new(x as f32 / scale, y as f32 / scale),
            size: Vec2::new(width as f32 / scale, height as f32 / scale),
            pixels_per_point: scale,
            desktop_scale: scale,
        }
    }

    pub fn primary_display() -> Result<Self> {
        let displays = display_info::DisplayInfo::all()
            .map_err(|e| ShellError::Display(e.to_string()))?;
        let display = displays
            .iter()
            .find(|d| d.is_primary)
            .or_else(|| displays.first())
            .ok_or_else(|| ShellError::Display("no display found".to_string()))?;
        let scale = if DESKTOP_IS_PHYSICAL { display.scale_factor } else { 1.0 };
        let mut geometry =
            Self::from_desktop(display.x, display.y, display.width, display.height, scale);
        geometry.pixels_per_point = display.scale_factor.max(f32::EPSILON);
        Ok(geometry)
    }

    /// Re-derive the pixel ratio from the width of the last screenshot.
    pub fn calibrate(&mut self, capture_width: u32) {
        if capture_width > 0 && self.size.x > 0.0 {
            self.pixels_per_point = capture_width as f32 / self.size.x;
        }
    }

    pub fn to_local(&self, point: ScreenPoint) -> Pos2 {
        Pos2::new(
            point.x as f32 / self.pixels_per_point,
            point.y as f32 / self.pixels_per_point,
        )
    }

    /// Desktop-unit position (e.g. the polled cursor) to overlay points.
    pub fn global_to_local(&self, global: Pos2) -> Pos2 {
        Pos2::new(global.x / self.desktop_scale, global.y / self.desktop_scale)
            - self.origin.to_vec2()
    }

    /// Overlay points back to desktop units.
    pub fn local_to_global(&self, local: Pos2) -> Pos2 {
        let global = local + self.origin.to_vec2();
        Pos2::new(global.x * self.desktop_scale, global.y * self.desktop_scale)
    }

    /// Desktop position for a click on the backend point `point`, kept on the display.
    pub fn click_target(&self, point: ScreenPoint) -> (i32, i32) {
        let local = self.to_local(point).clamp(Pos2::ZERO, self.size.to_pos2());
        let global = self.local_to_global(local);
        (global.x.round() as i32, global.y.round() as i32)
    }
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        Self::new(Pos2::ZERO, Vec2::new(1920.0, 1080.0), 1.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hotspot {
    pub point: ScreenPoint,
    pub label: String,
    /// Marker center in overlay-local points.
    pub center: Pos2,
}

pub struct HotspotPresenter {
    size: f32,
    geometry: ScreenGeometry,
    current: Option<Hotspot>,
}

const ACCENT: Color32 = Color32::from_rgb(0, 150, 255);

impl HotspotPresenter {
    pub fn new(size: f32, geometry: ScreenGeometry) -> Self {
        Self { size, geometry, current: None }
    }

    pub fn geometry(&self) -> &ScreenGeometry {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut ScreenGeometry {
        &mut self.geometry
    }

    /// Replaces whatever marker is showing.
    pub fn show(&mut self, point: ScreenPoint, label: &str) -> &Hotspot {
        let center = self.geometry.to_local(point);
        self.current.insert(Hotspot { point, label: label.to_string(), center })
    }

    pub fn hide(&mut self) -> Option<Hotspot> {
        self.current.take()
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&Hotspot> {
        self.current.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.current.is_some()
    }

    pub fn marker_rect(&self) -> Option<Rect> {
        self.current
            .as_ref()
            .map(|h| Rect::from_center_size(h.center, Vec2::splat(self.size)))
    }

    pub fn contains(&self, local: Pos2) -> bool {
        self.marker_rect().is_some_and(|r| r.contains(local))
    }

    pub fn paint(&self, painter: &egui::Painter, time: f64) {
        let Some(hotspot) = &self.current else { return };
        let radius = self.size / 2.0;
        let bob = (time * std::f64::consts::TAU / 3.0).sin() as f32 * 3.0;
        let center = hotspot.center - Vec2::new(0.0, bob.max(0.0));

        // Ripple: grows from 0.8 to 1.4 of the radius every two seconds while fading.
        let phase = ((time % 2.0) / 2.0) as f32;
        let ripple_alpha = ((1.0 - phase) * 150.0) as u8;
        painter.circle_stroke(
            center,
            radius * (0.8 + 0.6 * phase),
            Stroke::new(2.0, Color32::from_rgba_unmultiplied(0, 150, 255, ripple_alpha)),
        );

        painter.circle(
            center,
            radius * 0.7,
            Color32::from_rgba_unmultiplied(0, 150, 255, 76),
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(0, 150, 255, 153)),
        );
        painter.circle_filled(center, radius * 0.15, Color32::from_rgb(0, 191, 255));

        if !hotspot.label.is_empty() {
            let galley = painter.layout_no_wrap(
                hotspot.label.clone(),
                FontId::proportional(14.0),
                Color32::WHITE,
            );
            let anchor = center + Vec2::new(0.0, radius + 8.0);
            let text_rect = Align2::CENTER_TOP.anchor_size(anchor, galley.size());
            painter.rect_filled(text_rect.expand(6.0), 6.0, Color32::from_black_alpha(200));
            painter.rect_stroke(text_rect.expand(6.0), 6.0, Stroke::new(1.0, ACCENT));
            painter.galley(text_rect.min, galley, Color32::WHITE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presenter() -> HotspotPresenter {
        HotspotPresenter::new(60.0, ScreenGeometry::default())
    }

    #[test]
    fn test_show_then_hide_leaves_nothing() {
        let mut p = presenter();
        for (x, y) in [(0, 0), (500, 300), (1919, 1079), (-20, 40)] {
            p.show(ScreenPoint::new(x, y), "label");
            assert!(p.is_visible());
            assert!(p.hide().is_some());
            assert!(p.current().is_none());
            assert!(p.marker_rect().is_none());
        }
        assert!(p.hide().is_none());
    }

    #[test]
    fn test_repeated_show_keeps_single_marker() {
        let mut p = presenter();
        p.show(ScreenPoint::new(10, 10), "first");
        p.show(ScreenPoint::new(20, 20), "second");
        p.show(ScreenPoint::new(500, 300), "Click inbox");
        let current = p.current().unwrap();
        assert_eq!(current.point, ScreenPoint::new(500, 300));
        assert_eq!(current.label, "Click inbox");
        p.hide();
        assert!(!p.is_visible());
    }

    #[test]
    fn test_marker_is_centered_on_point() {
        let mut p = presenter();
        p.show(ScreenPoint::new(500, 300), "x");
        let rect = p.marker_rect().unwrap();
        assert_eq!(rect.center(), Pos2::new(500.0, 300.0));
        assert_eq!(rect.width(), 60.0);
        assert!(p.contains(Pos2::new(520.0, 310.0)));
        assert!(!p.contains(Pos2::new(531.0, 300.0)));
    }

    #[test]
    fn test_geometry_scales_capture_pixels() {
        let mut geometry =
            ScreenGeometry::new(Pos2::new(100.0, 0.0), Vec2::new(1440.0, 900.0), 1.0);
        geometry.calibrate(2880);
        assert_eq!(geometry.pixels_per_point, 2.0);
        assert_eq!(geometry.to_local(ScreenPoint::new(1000, 600)), Pos2::new(500.0, 300.0));
        assert_eq!(geometry.global_to_local(Pos2::new(600.0, 300.0)), Pos2::new(500.0, 300.0));
        assert_eq!(geometry.local_to_global(Pos2::new(500.0, 300.0)), Pos2::new(600.0, 300.0));

        geometry.calibrate(0);
        assert_eq!(geometry.pixels_per_point, 2.0);
    }

    #[test]
    fn test_scaled_desktop_maps_cursor_and_marker_alike() {
        // A 2880x1620 display at 150% reported in physical pixels.
        let mut geometry = ScreenGeometry::from_desktop(0, 0, 2880, 1620, 1.5);
        assert_eq!(geometry.size, Vec2::new(1920.0, 1080.0));
        geometry.calibrate(2880);
        assert_eq!(geometry.pixels_per_point, 1.5);

        let marker = geometry.to_local(ScreenPoint::new(750, 450));
        assert_eq!(marker, Pos2::new(500.0, 300.0));
        // The physical cursor resting on that pixel lands on the marker.
        assert_eq!(geometry.global_to_local(Pos2::new(750.0, 450.0)), marker);
        assert_eq!(geometry.local_to_global(marker), Pos2::new(750.0, 450.0));
        assert_eq!(geometry.click_target(ScreenPoint::new(750, 450)), (750, 450));
    }

    #[test]
    fn test_scaled_secondary_origin() {
        let geometry = ScreenGeometry::from_desktop(-2880, 300, 2880, 1620, 1.5);
        assert_eq!(geometry.origin, Pos2::new(-1920.0, 200.0));
        assert_eq!(geometry.global_to_local(Pos2::new(-2130.0, 750.0)), Pos2::new(500.0, 300.0));
        assert_eq!(geometry.local_to_global(Pos2::new(100.0, 100.0)), Pos2::new(-2730.0, 450.0));
    }

    #[test]
    fn test_click_target_stays_on_display() {
        let geometry = ScreenGeometry::new(Pos2::new(100.0, 50.0), Vec2::new(1920.0, 1080.0), 1.0);
        assert_eq!(geometry.click_target(ScreenPoint::new(500, 300)), (600, 350));
        assert_eq!(geometry.click_target(ScreenPoint::new(i32::MAX, i32::MIN)), (2020, 50));
        assert_eq!(geometry.click_target(ScreenPoint::new(-40, 5000)), (100, 1130));
    }
}
