use serde::{Deserialize, Serialize};
use tokio::sync::watch;

pub const DEFAULT_VIDEO_TRANSFORM: &str = "none";
pub const DEFAULT_AUDIO_EFFECT: &str = "normal";

/// The two processing modes requested from the remote endpoint. Their values
/// are opaque here and forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformSelection {
    pub video: String,
    pub audio: String,
}

impl TransformSelection {
    pub fn new(video: impl Into<String>, audio: impl Into<String>) -> Self {
        Self {
            video: video.into(),
            audio: audio.into(),
        }
    }
}

impl Default for TransformSelection {
    fn default() -> Self {
        Self::new(DEFAULT_VIDEO_TRANSFORM, DEFAULT_AUDIO_EFFECT)
    }
}

/// SelectionSource is read once per negotiation, at the time the offer is sent
pub trait SelectionSource: Send + Sync {
    fn current(&self) -> TransformSelection;
}

impl SelectionSource for TransformSelection {
    fn current(&self) -> TransformSelection {
        self.clone()
    }
}

/// a selection driven by UI state
impl SelectionSource for watch::Receiver<TransformSelection> {
    fn current(&self) -> TransformSelection {
        self.borrow().clone()
    }
}
