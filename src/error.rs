use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Backend request failed: {0}")]
    Transport(String),

    #[error("Backend {endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("Screenshot capture failed: {0}")]
    Capture(String),

    #[error("Window channel unavailable: {0}")]
    Messaging(String),

    #[error("Audio playback failed: {0}")]
    Audio(String),

    #[error("Display query failed: {0}")]
    Display(String),
}

impl ShellError {
    /// Transport-class failures: anything the backend round trip produced.
    pub fn is_transport(&self) -> bool {
        matches!(self, ShellError::Transport(_) | ShellError::Status { .. })
    }
}

impl From<reqwest::Error> for ShellError {
    fn from(err: reqwest::Error) -> Self {
        ShellError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShellError>;
