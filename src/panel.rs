//! The always-on-top instruction panel and the request/response cycle it drives.

use crate::backend::ScreenPoint;
use crate::messenger::{Messenger, ShellMessage};
use crate::worker::{RequestKind, RequestToken, RoundOutcome, WorkerReply};
use eframe::egui::{self, Color32, RichText};
use tracing::{debug, info, warn};

pub const COMPLETED_TEXT: &str = "All tasks completed successfully!";
pub const ERROR_TEXT: &str = "Sorry, there was an error processing your request.";
pub const PROCESSING_TEXT: &str = "Processing your request...";

pub const INPUT_SIZE: (f32, f32) = (320.0, 70.0);
const CONVERSATION_MIN: (f32, f32) = (350.0, 120.0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelPhase {
    Idle,
    Submitting,
    AwaitingResponse,
    Completed,
}

/// Per-panel session data. Lives exactly as long as the panel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Set once `/initialize` has succeeded; later rounds use `/update_screenshot`.
    pub initialized: bool,
    pub instruction: Option<String>,
    pub last_instruction: Option<String>,
    pub rounds: u32,
}

impl SessionState {
    fn reset(&mut self) {
        let last = self.last_instruction.take();
        *self = SessionState { last_instruction: last, ..Default::default() };
    }

    fn next_kind(&self) -> RequestKind {
        match (&self.instruction, self.initialized) {
            (Some(query), false) => RequestKind::Initialize { query: query.clone() },
            _ => RequestKind::Update,
        }
    }
}

/// Work the panel wants the host to carry out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanelAction {
    Dispatch { token: RequestToken, kind: RequestKind },
    ResetBackend,
    FetchStatus,
}

pub struct InputPanel {
    phase: PanelPhase,
    /// Phase to fall back to if the outstanding request fails.
    resume_phase: PanelPhase,
    session: SessionState,
    draft: String,
    message: String,
    detail: Option<String>,
    error: Option<String>,
    token: RequestToken,
    outstanding: Option<RequestToken>,
    /// Hotspot last requested on the overlay, kept so a failed round can restore it.
    shown: Option<(ScreenPoint, String)>,
    parked: Option<(ScreenPoint, String)>,
    narration: Option<String>,
    advance_on_click: bool,
    messenger: Messenger,
}

impl InputPanel {
    pub fn new(messenger: Messenger, advance_on_click: bool) -> Self {
        Self {
            phase: PanelPhase::Idle,
            resume_phase: PanelPhase::Idle,
            session: SessionState::default(),
            draft: String::new(),
            message: String::new(),
            detail: None,
            error: None,
            token: RequestToken(0),
            outstanding: None,
            shown: None,
            parked: None,
            narration: None,
            advance_on_click,
            messenger,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> PanelPhase {
        self.phase
    }

    #[cfg(test)]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    #[cfg(test)]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[cfg(test)]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[cfg(test)]
    pub fn outstanding(&self) -> Option<RequestToken> {
        self.outstanding
    }

    #[cfg(test)]
    pub fn set_draft(&mut self, text: &str) {
        self.draft = text.to_string();
    }

    #[cfg(test)]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn take_narration(&mut self) -> Option<String> {
        self.narration.take()
    }

    fn in_conversation(&self) -> bool {
        self.session.instruction.is_some()
    }

    /// Starts a session with the drafted instruction. Blank drafts are ignored.
    pub fn submit(&mut self) -> Option<PanelAction> {
        if self.phase != PanelPhase::Idle || self.in_conversation() {
            return None;
        }
        let text = self.draft.trim();
        if text.is_empty() {
            return None;
        }
        let text = text.to_string();
        info!("instruction submitted: {}", text);
        self.session.instruction = Some(text.clone());
        self.session.last_instruction = Some(text);
        self.draft.clear();
        self.begin_request()
    }

    /// Asks for the next step of an ongoing session.
    pub fn next(&mut self) -> Option<PanelAction> {
        if self.phase != PanelPhase::Idle || !self.session.initialized {
            return None;
        }
        // Keep the marker out of the screenshot.
        if let Some(shown) = self.shown.take() {
            self.send(ShellMessage::HideHotspot);
            self.parked = Some(shown);
        }
        self.begin_request()
    }

    fn begin_request(&mut self) -> Option<PanelAction> {
        self.token = self.token.next();
        self.outstanding = Some(self.token);
        self.resume_phase = self.phase;
        self.phase = PanelPhase::Submitting;
        self.error = None;
        self.detail = None;
        self.message = PROCESSING_TEXT.to_string();
        self.request_resize();
        Some(PanelAction::Dispatch { token: self.token, kind: self.session.next_kind() })
    }

    /// The host handed the request to a worker.
    pub fn mark_dispatched(&mut self, token: RequestToken) {
        if self.outstanding == Some(token) && self.phase == PanelPhase::Submitting {
            self.phase = PanelPhase::AwaitingResponse;
        }
    }

    /// Applies a worker reply. Returns the capture width of a fresh response so
    /// the overlay can recalibrate before the hotspot arrives.
    pub fn on_reply(&mut self, reply: WorkerReply) -> Option<u32> {
        if self.outstanding != Some(reply.token) {
            debug!("discarding stale reply {:?} (outstanding {:?})", reply.token, self.outstanding);
            return None;
        }
        self.outstanding = None;
        match reply.outcome {
            Ok(outcome) => Some(self.apply_outcome(outcome)),
            Err(e) => {
                warn!("round failed: {}", e);
                self.phase = self.resume_phase;
                self.message = ERROR_TEXT.to_string();
                self.error = Some(e.to_string());
                if let Some((point, label)) = self.parked.take() {
                    self.show_hotspot(point, label);
                }
                self.request_resize();
                None
            }
        }
    }

    fn apply_outcome(&mut self, outcome: RoundOutcome) -> u32 {
        let response = outcome.response;
        self.session.initialized = true;
        self.session.rounds += 1;
        self.parked = None;
        self.narration = response.audio_base64.clone();

        if response.is_completed {
            info!("session completed after {} rounds", self.session.rounds);
            self.phase = PanelPhase::Completed;
            self.message = COMPLETED_TEXT.to_string();
            if self.shown.take().is_some() {
                self.send(ShellMessage::HideHotspot);
            }
        } else {
            self.phase = PanelPhase::Idle;
            self.detail = response.task_description.clone().filter(|d| *d != response.task);
            self.message = if response.task.is_empty() {
                "Request completed".to_string()
            } else {
                response.task.clone()
            };
            let label = if response.task.is_empty() {
                "Click here".to_string()
            } else {
                response.task.clone()
            };
            self.show_hotspot(response.point(), label);
        }
        self.request_resize();
        outcome.capture_width
    }

    /// Back to a fresh session. Any reply still in flight becomes stale.
    pub fn reset(&mut self) -> PanelAction {
        info!("session reset");
        self.send(ShellMessage::HideHotspot);
        self.shown = None;
        self.parked = None;
        self.outstanding = None;
        self.session.reset();
        self.phase = PanelPhase::Idle;
        self.resume_phase = PanelPhase::Idle;
        self.message.clear();
        self.detail = None;
        self.error = None;
        self.narration = None;
        self.draft = self.session.last_instruction.clone().unwrap_or_default();
        self.send(ShellMessage::ResizeWindow { width: INPUT_SIZE.0, height: INPUT_SIZE.1 });
        PanelAction::ResetBackend
    }

    /// Messages addressed to the panel side of the messenger.
    pub fn on_message(&mut self, message: &ShellMessage) -> Option<PanelAction> {
        match message {
            ShellMessage::HotspotClicked { coords } => {
                debug!("hotspot at {:?} clicked", coords);
                self.shown = None;
                if self.advance_on_click {
                    self.next()
                } else {
                    None
                }
            }
            ShellMessage::CreateHotspot { .. }
            | ShellMessage::HideHotspot
            | ShellMessage::ResizeWindow { .. }
            | ShellMessage::EnableClick
            | ShellMessage::DisableClick => None,
        }
    }

    fn show_hotspot(&mut self, point: ScreenPoint, label: String) {
        self.send(ShellMessage::create_hotspot(point, label.clone()));
        self.shown = Some((point, label));
    }

    fn request_resize(&mut self) {
        let (width, height) = conversation_size(&self.message, self.error.as_deref());
        self.send(ShellMessage::ResizeWindow { width, height });
    }

    fn send(&self, message: ShellMessage) {
        if let Err(e) = self.messenger.send(message) {
            warn!("{}", e);
        }
    }

    pub fn ui(
        &mut self,
        ui: &mut egui::Ui,
        status: Option<String>,
        status_loading: bool,
    ) -> Vec<PanelAction> {
        let mut actions = Vec::new();
        if !self.in_conversation() {
            self.input_ui(ui, &mut actions);
        } else {
            self.conversation_ui(ui, status, status_loading, &mut actions);
        }
        actions
    }

    fn input_ui(&mut self, ui: &mut egui::Ui, actions: &mut Vec<PanelAction>) {
        ui.horizontal(|ui| {
            let edit = ui.add(
                egui::TextEdit::singleline(&mut self.draft)
                    .hint_text("Ask me anything...")
                    .desired_width(ui.available_width() - 70.0),
            );
            let entered = edit.lost_focus()
                && ui.input(|i| i.key_pressed(egui::Key::Enter) && !i.modifiers.shift);
            let can_send = !self.draft.trim().is_empty() && self.phase == PanelPhase::Idle;
            let clicked = ui
                .add_enabled(can_send, egui::Button::new("➤"))
                .on_hover_text("Send")
                .clicked();
            if entered || clicked {
                actions.extend(self.submit());
            }
            if ui.button("⟳").on_hover_text("Reset and reload").clicked() {
                actions.push(self.reset());
            }
        });
        if let Some(err) = &self.error {
            ui.label(RichText::new(err).color(Color32::LIGHT_RED).small());
        }
    }

    fn conversation_ui(
        &mut self,
        ui: &mut egui::Ui,
        status: Option<String>,
        status_loading: bool,
        actions: &mut Vec<PanelAction>,
    ) {
        ui.horizontal(|ui| {
            if let Some(instruction) = &self.session.instruction {
                ui.label(RichText::new(instruction).weak().italics());
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("⟳").on_hover_text("Reset").clicked() {
                    actions.push(self.reset());
                }
                if ui
                    .add_enabled(!status_loading, egui::Button::new("ℹ").small())
                    .on_hover_text("Backend status")
                    .clicked()
                {
                    actions.push(PanelAction::FetchStatus);
                }
            });
        });
        ui.separator();

        ui.label(RichText::new(&self.message).size(15.0));
        if let Some(detail) = &self.detail {
            ui.label(RichText::new(detail).weak().small());
        }
        if let Some(err) = &self.error {
            ui.label(RichText::new(err).color(Color32::LIGHT_RED).small());
        }

        ui.add_space(6.0);
        ui.vertical_centered(|ui| match self.phase {
            PanelPhase::Submitting | PanelPhase::AwaitingResponse => {
                ui.add_enabled(false, egui::Button::new("Loading..."));
            }
            PanelPhase::Completed => {
                if ui.button("Start New Task").clicked() {
                    actions.push(self.reset());
                }
            }
            PanelPhase::Idle => {
                let label = if self.session.initialized { "Next" } else { "Retry" };
                if ui.button(label).clicked() {
                    let action = if self.session.initialized { self.next() } else { self.retry() };
                    actions.extend(action);
                }
            }
        });

        if let Some(line) = status {
            ui.label(RichText::new(line).monospace().small());
        }
    }

    /// Re-sends the initial request after it failed.
    fn retry(&mut self) -> Option<PanelAction> {
        if self.phase != PanelPhase::Idle || self.session.initialized || !self.in_conversation() {
            return None;
        }
        self.begin_request()
    }
}

/// Panel size that fits `message` (and the optional error line).
pub fn conversation_size(message: &str, error: Option<&str>) -> (f32, f32) {
    const CHARS_PER_LINE: usize = 40;
    const LINE_HEIGHT: f32 = 20.0;
    let lines = |text: &str| text.chars().count().div_ceil(CHARS_PER_LINE).max(1);
    let mut text_lines = lines(message);
    if let Some(err) = error {
        text_lines += lines(err);
    }
    let height = text_lines as f32 * LINE_HEIGHT + 50.0 + 60.0;
    (CONVERSATION_MIN.0, height.max(CONVERSATION_MIN.1))
}
