//! Full-screen transparent overlay that stays click-through everywhere except
//! over the hotspot marker.

use crate::backend::ScreenPoint;
use crate::error::Result;
use crate::hotspot::HotspotPresenter;
use crate::messenger::{Messenger, ShellMessage};
use eframe::egui::{self, Pos2};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickMode {
    ClickThrough,
    Interactive,
}

pub struct OverlayController {
    mode: ClickMode,
    hovering: bool,
    presenter: HotspotPresenter,
    messenger: Messenger,
}

impl OverlayController {
    pub fn new(presenter: HotspotPresenter, messenger: Messenger) -> Self {
        Self {
            mode: ClickMode::ClickThrough,
            hovering: false,
            presenter,
            messenger,
        }
    }

    #[cfg(test)]
    pub fn mode(&self) -> ClickMode {
        self.mode
    }

    pub fn presenter(&self) -> &HotspotPresenter {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut HotspotPresenter {
        &mut self.presenter
    }

    pub fn apply(&mut self, message: &ShellMessage) {
        match message {
            ShellMessage::CreateHotspot { coords, label, action } => {
                let hotspot = self.presenter.show(*coords, label);
                info!(
                    "hotspot '{}' ({}) at {:?} -> local {:?}",
                    hotspot.label, action, coords, hotspot.center
                );
                // The new marker may not be under the cursor any more.
                self.hovering = false;
                self.mode = ClickMode::ClickThrough;
            }
            ShellMessage::HideHotspot => {
                if self.presenter.hide().is_some() {
                    debug!("hotspot hidden");
                }
                self.hovering = false;
                self.mode = ClickMode::ClickThrough;
            }
            ShellMessage::EnableClick => self.mode = ClickMode::Interactive,
            ShellMessage::DisableClick => self.mode = ClickMode::ClickThrough,
            ShellMessage::ResizeWindow { .. } | ShellMessage::HotspotClicked { .. } => {}
        }
    }

    /// Feeds the latest cursor position (overlay-local). Crossing the marker
    /// boundary asks for interactivity to be switched on or off.
    pub fn pointer_moved(&mut self, local: Option<Pos2>) -> Result<()> {
        let inside = local.is_some_and(|p| self.presenter.contains(p));
        if inside != self.hovering {
            self.hovering = inside;
            let message =
                if inside { ShellMessage::EnableClick } else { ShellMessage::DisableClick };
            self.messenger.send(message)?;
        }
        Ok(())
    }

    /// A primary click at `local`. Only a click on the marker while the
    /// overlay is interactive counts; it dismisses the hotspot.
    pub fn click(&mut self, local: Pos2) -> Result<Option<ScreenPoint>> {
        if self.mode != ClickMode::Interactive || !self.presenter.contains(local) {
            return Ok(None);
        }
        let Some(hotspot) = self.presenter.hide() else { return Ok(None) };
        info!("hotspot clicked at {:?}", hotspot.point);
        self.hovering = false;
        self.mode = ClickMode::ClickThrough;
        self.messenger.send(ShellMessage::DisableClick)?;
        self.messenger.send(ShellMessage::HotspotClicked { coords: hotspot.point })?;
        Ok(Some(hotspot.point))
    }

    pub fn viewport_builder(&self) -> egui::ViewportBuilder {
        let geometry = self.presenter.geometry();
        egui::ViewportBuilder::default()
            .with_title("Hotspot Overlay")
            .with_position(geometry.origin)
            .with_inner_size(geometry.size)
            .with_transparent(true)
            .with_decorations(false)
            .with_resizable(false)
            .with_always_on_top()
            .with_mouse_passthrough(self.mode == ClickMode::ClickThrough)
            .with_taskbar(false)
    }

    /// Draws one overlay frame. `cursor` is the global cursor position, which
    /// has to be polled because a click-through window receives no pointer events.
    pub fn ui(&mut self, ctx: &egui::Context, cursor: Option<Pos2>) -> Result<()> {
        let local = cursor.map(|c| self.presenter.geometry().global_to_local(c));
        self.pointer_moved(local)?;

        if self.mode == ClickMode::Interactive {
            let clicked_at = ctx.input(|i| {
                i.pointer
                    .primary_clicked()
                    .then(|| i.pointer.interact_pos())
                    .flatten()
            });
            if let Some(pos) = clicked_at {
                self.click(pos)?;
            }
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |_ui| {});

        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("hotspot_layer"),
        ));
        self.presenter.paint(&painter, ctx.input(|i| i.time));

        if self.presenter.is_visible() {
            ctx.request_repaint_after(Duration::from_millis(33));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotspot::ScreenGeometry;
    use crate::messenger::{self, Mailbox};

    fn overlay() -> (OverlayController, Mailbox) {
        let (messenger, mailbox) = messenger::channel();
        let presenter = HotspotPresenter::new(60.0, ScreenGeometry::default());
        (OverlayController::new(presenter, messenger), mailbox)
    }

    fn pump(overlay: &mut OverlayController, mailbox: &Mailbox) -> Vec<ShellMessage> {
        let messages = mailbox.drain();
        for m in &messages {
            overlay.apply(m);
        }
        messages
    }

    #[test]
    fn test_starts_click_through() {
        let (overlay, _mb) = overlay();
        assert_eq!(overlay.mode(), ClickMode::ClickThrough);
        assert!(!overlay.presenter().is_visible());
    }

    #[test]
    fn test_hover_enter_and_leave_toggle_once_each() {
        let (mut overlay, mailbox) = overlay();
        overlay.apply(&ShellMessage::create_hotspot(ScreenPoint::new(500, 300), "Click inbox"));

        overlay.pointer_moved(Some(Pos2::new(100.0, 100.0))).unwrap();
        assert!(pump(&mut overlay, &mailbox).is_empty());

        overlay.pointer_moved(Some(Pos2::new(505.0, 295.0))).unwrap();
        overlay.pointer_moved(Some(Pos2::new(510.0, 300.0))).unwrap();
        assert_eq!(pump(&mut overlay, &mailbox), vec![ShellMessage::EnableClick]);
        assert_eq!(overlay.mode(), ClickMode::Interactive);

        overlay.pointer_moved(Some(Pos2::new(700.0, 300.0))).unwrap();
        overlay.pointer_moved(None).unwrap();
        assert_eq!(pump(&mut overlay, &mailbox), vec![ShellMessage::DisableClick]);
        assert_eq!(overlay.mode(), ClickMode::ClickThrough);
    }

    #[test]
    fn test_click_ignored_while_click_through() {
        let (mut overlay, mailbox) = overlay();
        overlay.apply(&ShellMessage::create_hotspot(ScreenPoint::new(500, 300), "x"));
        assert_eq!(overlay.click(Pos2::new(500.0, 300.0)).unwrap(), None);
        assert!(overlay.presenter().is_visible());
        assert!(mailbox.drain().is_empty());
    }

    #[test]
    fn test_click_on_marker_dismisses_and_reports() {
        let (mut overlay, mailbox) = overlay();
        overlay.apply(&ShellMessage::create_hotspot(ScreenPoint::new(500, 300), "x"));
        overlay.pointer_moved(Some(Pos2::new(500.0, 300.0))).unwrap();
        pump(&mut overlay, &mailbox);

        assert_eq!(overlay.click(Pos2::new(400.0, 300.0)).unwrap(), None);
        let clicked = overlay.click(Pos2::new(500.0, 300.0)).unwrap();
        assert_eq!(clicked, Some(ScreenPoint::new(500, 300)));
        assert!(!overlay.presenter().is_visible());
        assert_eq!(overlay.mode(), ClickMode::ClickThrough);
        assert_eq!(
            mailbox.drain(),
            vec![
                ShellMessage::DisableClick,
                ShellMessage::HotspotClicked { coords: ScreenPoint::new(500, 300) },
            ]
        );
    }

    #[test]
    fn test_hide_restores_click_through() {
        let (mut overlay, _mb) = overlay();
        overlay.apply(&ShellMessage::create_hotspot(ScreenPoint::new(500, 300), "x"));
        overlay.apply(&ShellMessage::EnableClick);
        overlay.apply(&ShellMessage::HideHotspot);
        assert_eq!(overlay.mode(), ClickMode::ClickThrough);
        assert!(!overlay.presenter().is_visible());
    }
}
