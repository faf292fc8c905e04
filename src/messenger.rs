//! Message passing between the instruction panel and the overlay.
//!
//! Delivery is fire-and-forget and FIFO per channel. Messages are never
//! acknowledged.

use crate::backend::ScreenPoint;
use crate::error::{Result, ShellError};
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ShellMessage {
    CreateHotspot {
        coords: ScreenPoint,
        label: String,
        action: String,
    },
    HideHotspot,
    ResizeWindow {
        width: f32,
        height: f32,
    },
    EnableClick,
    DisableClick,
    HotspotClicked {
        coords: ScreenPoint,
    },
}

impl ShellMessage {
    pub fn create_hotspot(coords: ScreenPoint, label: impl Into<String>) -> Self {
        ShellMessage::CreateHotspot {
            coords,
            label: label.into(),
            action: "click".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Messenger {
    tx: Sender<ShellMessage>,
}

pub struct Mailbox {
    rx: Receiver<ShellMessage>,
}

pub fn channel() -> (Messenger, Mailbox) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (Messenger { tx }, Mailbox { rx })
}

impl Messenger {
    pub fn send(&self, message: ShellMessage) -> Result<()> {
        trace!(?message, "send");
        self.tx
            .send(message)
            .map_err(|e| ShellError::Messaging(format!("receiver gone, dropped {:?}", e.0)))
    }
}

impl Mailbox {
    /// Everything queued so far, oldest first. Never blocks.
    pub fn drain(&self) -> Vec<ShellMessage> {
        self.rx.try_iter().collect()
    }
}
