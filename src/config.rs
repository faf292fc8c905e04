use clap::Parser;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

#[derive(Parser, Debug, Clone)]
#[command(name = "hotspot-guide")]
#[command(about = "Points at what to click next, as decided by a local planning backend")]
pub struct Cli {
    /// Base URL of the planning backend
    #[arg(long, default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    /// Per-request timeout in seconds (0 disables it)
    #[arg(long, default_value_t = 120)]
    pub request_timeout_secs: u64,

    /// Initial panel position (screen points)
    #[arg(long, default_value_t = 50.0)]
    pub panel_x: f32,
    #[arg(long, default_value_t = 50.0)]
    pub panel_y: f32,

    /// Hotspot marker diameter in points
    #[arg(long, default_value_t = 60.0)]
    pub hotspot_size: f32,

    /// Re-issue the hotspot click on the application underneath
    #[arg(long)]
    pub forward_clicks: bool,

    /// Start the next round as soon as the hotspot is clicked
    #[arg(long)]
    pub advance_on_click: bool,

    /// Do not play narration audio
    #[arg(long)]
    pub mute: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub backend_url: String,
    pub request_timeout: Option<Duration>,
    pub panel_pos: (f32, f32),
    pub hotspot_size: f32,
    pub forward_clicks: bool,
    pub advance_on_click: bool,
    pub mute: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout: Some(Duration::from_secs(120)),
            panel_pos: (50.0, 50.0),
            hotspot_size: 60.0,
            forward_clicks: false,
            advance_on_click: false,
            mute: false,
        }
    }
}

impl From<&Cli> for ShellConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            backend_url: cli.backend_url.trim_end_matches('/').to_string(),
            request_timeout: (cli.request_timeout_secs > 0)
                .then(|| Duration::from_secs(cli.request_timeout_secs)),
            panel_pos: (cli.panel_x, cli.panel_y),
            hotspot_size: cli.hotspot_size.max(8.0),
            forward_clicks: cli.forward_clicks,
            advance_on_click: cli.advance_on_click,
            mute: cli.mute,
        }
    }
}
