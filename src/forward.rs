//! Cursor polling and click forwarding to whatever sits under the overlay.

use eframe::egui::Pos2;
use enigo::{Enigo, MouseButton, MouseControllable};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rand::Rng;
use std::{thread, time::Duration};
use tracing::{debug, info};

static ENIGO: Lazy<Mutex<Enigo>> = Lazy::new(|| Mutex::new(Enigo::new()));

/// Global cursor position, or `None` while a forwarded click owns the mouse.
pub fn cursor_location() -> Option<Pos2> {
    let en = ENIGO.try_lock()?;
    let (x, y) = en.mouse_location();
    Some(Pos2::new(x as f32, y as f32))
}

/// Points along a cubic Bézier from `start` to `end` with jittered control points.
pub fn glide_path(start: (i32, i32), end: (i32, i32), rng: &mut impl Rng) -> Vec<(i32, i32)> {
    let (sx, sy) = (start.0 as f64, start.1 as f64);
    let (ex, ey) = (end.0 as f64, end.1 as f64);
    let mut jitter = || rng.gen_range(-20..=20) as f64;
    let c1 = (sx + (ex - sx) / 3.0 + jitter(), sy + (ey - sy) / 3.0 + jitter());
    let c2 = (sx + 2.0 * (ex - sx) / 3.0 + jitter(), sy + 2.0 * (ey - sy) / 3.0 + jitter());

    let dist = (ex - sx).hypot(ey - sy);
    let steps = (dist / 2.0).clamp(10.0, 50.0) as u32;

    let bezier = |p0: f64, p1: f64, p2: f64, p3: f64, t: f64| {
        (1.0 - t).powi(3) * p0
            + 3.0 * (1.0 - t).powi(2) * t * p1
            + 3.0 * (1.0 - t) * t.powi(2) * p2
            + t.powi(3) * p3
    };

    (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            (
                bezier(sx, c1.0, c2.0, ex, t).round() as i32,
                bezier(sy, c1.1, c2.1, ey, t).round() as i32,
            )
        })
        .collect()
}

/// Glides to `target` (global desktop coordinates) and left-clicks there.
/// Waits first so the overlay is back in click-through mode.
pub fn forward_click(target: (i32, i32)) {
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(120));
        let mut rng = rand::thread_rng();
        let mut en = ENIGO.lock();
        let start = en.mouse_location();
        for (x, y) in glide_path(start, target, &mut rng) {
            en.mouse_move_to(x, y);
            thread::sleep(Duration::from_millis(rng.gen_range(5..=15)));
        }
        en.mouse_click(MouseButton::Left);
        info!("forwarded click to {:?}", target);
        debug!("glide started at {:?}", start);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_glide_path_hits_both_ends() {
        let mut rng = StdRng::seed_from_u64(7);
        let path = glide_path((10, 20), (500, 300), &mut rng);
        assert_eq!(path.first(), Some(&(10, 20)));
        assert_eq!(path.last(), Some(&(500, 300)));
    }

    #[test]
    fn test_glide_step_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        // Tiny hop still gets the minimum number of steps.
        assert_eq!(glide_path((0, 0), (3, 4), &mut rng).len(), 11);
        // Long jumps are capped.
        assert_eq!(glide_path((0, 0), (3000, 2000), &mut rng).len(), 51);
    }

    #[test]
    fn test_glide_to_far_target_does_not_overflow() {
        let mut rng = StdRng::seed_from_u64(3);
        let path = glide_path((0, 0), (2_000_000_000, 0), &mut rng);
        assert_eq!(path.len(), 51);
        assert_eq!(path.last(), Some(&(2_000_000_000, 0)));

        let path = glide_path((i32::MAX, i32::MIN), (i32::MIN, i32::MAX), &mut rng);
        assert_eq!(path.first(), Some(&(i32::MAX, i32::MIN)));
        assert_eq!(path.last(), Some(&(i32::MIN, i32::MAX)));
    }
}
