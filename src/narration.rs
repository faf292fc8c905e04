use crate::error::{Result, ShellError};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use rodio::{Decoder, OutputStream, Sink};
use std::io::Cursor;
use std::thread;
use tracing::{debug, warn};

pub fn decode_audio(audio_base64: &str) -> Result<Vec<u8>> {
    let bytes = BASE64_STANDARD
        .decode(audio_base64.trim())
        .map_err(|e| ShellError::Audio(format!("invalid base64 audio: {e}")))?;
    if bytes.is_empty() {
        return Err(ShellError::Audio("empty audio payload".to_string()));
    }
    Ok(bytes)
}

/// Plays backend narration (MP3) on a detached thread.
pub fn play(audio_base64: String) {
    thread::spawn(move || {
        if let Err(e) = play_blocking(&audio_base64) {
            warn!("{}", e);
        }
    });
}

fn play_blocking(audio_base64: &str) -> Result<()> {
    let bytes = decode_audio(audio_base64)?;
    let (_stream, handle) = OutputStream::try_default()
        .map_err(|e| ShellError::Audio(format!("no output device: {e}")))?;
    let sink = Sink::try_new(&handle).map_err(|e| ShellError::Audio(e.to_string()))?;
    let source = Decoder::new(Cursor::new(bytes)).map_err(|e| ShellError::Audio(e.to_string()))?;
    sink.append(source);
    debug!("narration started");
    sink.sleep_until_end();
    debug!("narration finished");
    Ok(())
}
