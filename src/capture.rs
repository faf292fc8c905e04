use crate::error::{Result, ShellError};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// An encoded full-screen image plus the pixel size it was taken at.
#[derive(Clone, Debug)]
pub struct CapturedScreen {
    pub png_base64: String,
    pub width: u32,
    pub height: u32,
}

pub trait ScreenshotProvider: Send + Sync {
    fn capture(&self) -> Result<CapturedScreen>;
}

/// Captures the primary monitor.
#[derive(Default)]
pub struct PrimaryMonitorCapture;

impl ScreenshotProvider for PrimaryMonitorCapture {
    fn capture(&self) -> Result<CapturedScreen> {
        let monitors = xcap::Monitor::all()
            .map_err(|e| ShellError::Capture(format!("failed to list monitors: {e}")))?;
        let monitor = monitors
            .iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .or_else(|| monitors.first())
            .ok_or_else(|| ShellError::Capture("no monitor found".to_string()))?;

        let image = monitor
            .capture_image()
            .map_err(|e| ShellError::Capture(format!("screen capture failed: {e}")))?;
        debug!("captured {}x{} screenshot", image.width(), image.height());
        encode_png(&image)
    }
}

pub fn encode_png(image: &RgbaImage) -> Result<CapturedScreen> {
    let mut bytes: Vec<u8> = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| ShellError::Capture(format!("failed to encode screenshot: {e}")))?;
    Ok(CapturedScreen {
        png_base64: BASE64_STANDARD.encode(&bytes),
        width: image.width(),
        height: image.height(),
    })
}
