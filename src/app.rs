use crate::config::ShellConfig;
use crate::forward;
use crate::hotspot::{HotspotPresenter, ScreenGeometry};
use crate::messenger::{self, Mailbox, ShellMessage};
use crate::narration;
use crate::overlay::OverlayController;
use crate::panel::{InputPanel, PanelAction};
use crate::worker::RequestWorker;
use eframe::egui::{self, Color32, Sense};
use std::time::Duration;
use tracing::{debug, warn};

/// Hosts both windows: the panel in the root viewport and the overlay in an
/// immediate child viewport. All cross-window traffic goes through the mailbox.
pub struct ShellApp {
    config: ShellConfig,
    panel: InputPanel,
    overlay: OverlayController,
    mailbox: Mailbox,
    worker: RequestWorker,
}

impl ShellApp {
    pub fn new(config: ShellConfig, worker: RequestWorker, geometry: ScreenGeometry) -> Self {
        let (messenger, mailbox) = messenger::channel();
        let panel = InputPanel::new(messenger.clone(), config.advance_on_click);
        let presenter = HotspotPresenter::new(config.hotspot_size, geometry);
        let overlay = OverlayController::new(presenter, messenger);
        Self { config, panel, overlay, mailbox, worker }
    }

    fn run_actions(&mut self, actions: Vec<PanelAction>) {
        for action in actions {
            match action {
                PanelAction::Dispatch { token, kind } => {
                    self.worker.dispatch(token, kind);
                    self.panel.mark_dispatched(token);
                }
                PanelAction::ResetBackend => self.worker.reset_session(),
                PanelAction::FetchStatus => {
                    if !self.worker.fetch_status() {
                        debug!("status fetch already running");
                    }
                }
            }
        }
    }

    /// Worker replies first so a new hotspot is mapped with the fresh capture size.
    fn pump(&mut self, ctx: &egui::Context) {
        for reply in self.worker.poll() {
            if let Some(width) = self.panel.on_reply(reply) {
                self.overlay.presenter_mut().geometry_mut().calibrate(width);
            }
        }
        if let Some(audio) = self.panel.take_narration() {
            if !self.config.mute {
                narration::play(audio);
            }
        }

        let mut actions = Vec::new();
        for message in self.mailbox.drain() {
            match &message {
                ShellMessage::CreateHotspot { .. }
                | ShellMessage::HideHotspot
                | ShellMessage::EnableClick
                | ShellMessage::DisableClick => self.overlay.apply(&message),
                ShellMessage::ResizeWindow { width, height } => {
                    let size = egui::vec2(*width, *height);
                    ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(size));
                }
                ShellMessage::HotspotClicked { coords } => {
                    if self.config.forward_clicks {
                        let target = self.overlay.presenter().geometry().click_target(*coords);
                        forward::forward_click(target);
                    }
                }
            }
            actions.extend(self.panel.on_message(&message));
        }
        self.run_actions(actions);
    }
}

impl eframe::App for ShellApp {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        [0.0; 4]
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump(ctx);

        let status = self.worker.status().text();
        let status_loading = self.worker.status().is_loading();
        let frame = egui::Frame::none()
            .fill(Color32::from_rgba_unmultiplied(20, 22, 28, 235))
            .rounding(12.0)
            .inner_margin(10.0);
        let mut actions = Vec::new();
        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            // Borderless window: drag from any empty spot.
            let drag = ui.interact(ui.max_rect(), egui::Id::new("panel_drag"), Sense::drag());
            if drag.drag_started() {
                ctx.send_viewport_cmd(egui::ViewportCommand::StartDrag);
            }
            actions = self.panel.ui(ui, status, status_loading);
        });
        self.run_actions(actions);

        let builder = self.overlay.viewport_builder();
        let overlay = &mut self.overlay;
        ctx.show_viewport_immediate(
            egui::ViewportId::from_hash_of("hotspot_overlay"),
            builder,
            |ctx, _class| {
                if let Err(e) = overlay.ui(ctx, forward::cursor_location()) {
                    warn!("overlay: {}", e);
                }
            },
        );

        // Keep draining worker replies while nothing else triggers a frame.
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
