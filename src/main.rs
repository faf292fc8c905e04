mod app;
mod backend;
mod capture;
mod config;
mod error;
mod forward;
mod hotspot;
mod messenger;
mod narration;
mod overlay;
mod panel;
mod worker;

use clap::Parser;
use eframe::egui;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::ShellApp;
use crate::backend::BackendClient;
use crate::capture::PrimaryMonitorCapture;
use crate::config::{Cli, ShellConfig};
use crate::hotspot::ScreenGeometry;
use crate::worker::RequestWorker;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    let config = ShellConfig::from(&cli);
    info!("starting hotspot-guide v{}", env!("CARGO_PKG_VERSION"));
    info!("backend: {}", config.backend_url);

    let backend = Arc::new(BackendClient::new(&config.backend_url, config.request_timeout)?);
    let worker = RequestWorker::new(backend, Arc::new(PrimaryMonitorCapture));
    worker.check_health();

    let geometry = ScreenGeometry::primary_display().unwrap_or_else(|e| {
        warn!("{}; assuming a 1920x1080 display at the origin", e);
        ScreenGeometry::default()
    });
    info!("overlay geometry: {:?}", geometry);

    let (panel_w, panel_h) = panel::INPUT_SIZE;
    let mut opts = eframe::NativeOptions::default();
    opts.viewport = egui::ViewportBuilder::default()
        .with_title("Hotspot Guide")
        .with_inner_size(egui::vec2(panel_w, panel_h))
        .with_position(egui::pos2(config.panel_pos.0, config.panel_pos.1))
        .with_transparent(true)
        .with_decorations(false)
        .with_resizable(false)
        .with_always_on_top()
        .with_taskbar(false);

    eframe::run_native(
        "Hotspot Guide",
        opts,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Box::new(ShellApp::new(config, worker, geometry))
        }),
    )?;
    Ok(())
}
