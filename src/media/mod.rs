use crate::error::Result;
use async_trait::async_trait;
use rand::random;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

pub mod file;
pub mod sink;

/// Media kind of a captured or received track
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

impl From<RTPCodecType> for TrackKind {
    fn from(codec_type: RTPCodecType) -> Self {
        match codec_type {
            RTPCodecType::Video => TrackKind::Video,
            _ => TrackKind::Audio,
        }
    }
}

/// Which sources a capture must provide
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// A local capture source bound to a sample track.
///
/// Stopping the track cancels whatever task is producing samples for it.
#[derive(Clone)]
pub struct CaptureTrack {
    kind: TrackKind,
    track: Arc<TrackLocalStaticSample>,
    stop: CancellationToken,
}

impl CaptureTrack {
    pub fn new(kind: TrackKind, stream_id: &str) -> Self {
        let mime_type = match kind {
            TrackKind::Audio => MIME_TYPE_OPUS,
            TrackKind::Video => MIME_TYPE_VP8,
        };
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            format!("{kind}-{:08x}", random::<u32>()),
            stream_id.to_owned(),
        ));

        Self {
            kind,
            track,
            stop: CancellationToken::new(),
        }
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        self.track.id()
    }

    pub fn stream_id(&self) -> &str {
        self.track.stream_id()
    }

    pub fn local(&self) -> &Arc<TrackLocalStaticSample> {
        &self.track
    }

    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// resolves once the track is stopped
    pub fn stopped(&self) -> WaitForCancellationFuture<'_> {
        self.stop.cancelled()
    }
}

impl fmt::Debug for CaptureTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureTrack")
            .field("kind", &self.kind)
            .field("id", &self.id())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Tracks acquired by one capture, sharing a stream id
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<CaptureTrack>,
}

impl MediaStream {
    pub fn new(id: String, tracks: Vec<CaptureTrack>) -> Self {
        Self { id, tracks }
    }

    pub fn new_stream_id() -> String {
        format!("capture-{:016x}", random::<u64>())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[CaptureTrack] {
        &self.tracks
    }

    pub fn into_tracks(self) -> Vec<CaptureTrack> {
        self.tracks
    }

    pub fn stop(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

/// MediaCapture acquires local capture tracks under the given constraints
#[async_trait]
pub trait MediaCapture: Send + Sync {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<MediaStream>;
}

/// An inbound track reported by the session
#[derive(Clone)]
pub struct RemoteTrack {
    kind: TrackKind,
    id: String,
    stream_id: String,
    track: Option<Arc<TrackRemote>>,
}

impl RemoteTrack {
    /// a track description with no media attached
    pub fn new(kind: TrackKind, id: String, stream_id: String) -> Self {
        Self {
            kind,
            id,
            stream_id,
            track: None,
        }
    }

    pub(crate) fn from_rtc(track: Arc<TrackRemote>) -> Self {
        Self {
            kind: TrackKind::from(track.kind()),
            id: track.id(),
            stream_id: track.stream_id(),
            track: Some(track),
        }
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// the underlying RTP track, if this came from a peer connection
    pub fn rtc(&self) -> Option<&Arc<TrackRemote>> {
        self.track.as_ref()
    }
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .finish()
    }
}
