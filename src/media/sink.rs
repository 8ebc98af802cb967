use crate::media::{RemoteTrack, TrackKind};
use log::{debug, info};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// TrackSink renders inbound tracks of one role ("video" or "audio").
pub trait TrackSink: Send + Sync {
    /// replaces whatever the sink was rendering with `track`
    fn attach(&self, track: RemoteTrack);

    /// renders nothing until the next attach
    fn clear(&self);
}

/// The pair of rendering surfaces inbound tracks are routed to by media kind.
#[derive(Clone)]
pub struct MediaSinks {
    video: Arc<dyn TrackSink>,
    audio: Arc<dyn TrackSink>,
}

impl MediaSinks {
    pub fn new(video: Arc<dyn TrackSink>, audio: Arc<dyn TrackSink>) -> Self {
        Self { video, audio }
    }

    /// routes video tracks to the video sink, everything else to the audio sink
    pub fn route(&self, track: RemoteTrack) {
        match track.kind() {
            TrackKind::Video => {
                debug!("attach track {} to video sink", track.id());
                self.video.attach(track);
            }
            TrackKind::Audio => {
                debug!("attach track {} to audio sink", track.id());
                self.audio.attach(track);
            }
        }
    }

    pub fn clear(&self) {
        self.video.clear();
        self.audio.clear();
    }
}

impl Default for MediaSinks {
    fn default() -> Self {
        Self::new(
            Arc::new(RtpCounterSink::new("video")),
            Arc::new(RtpCounterSink::new("audio")),
        )
    }
}

const REPORT_EVERY: u64 = 500;

/// RtpCounterSink drains the RTP packets of the attached track and logs
/// packet and byte counts.
pub struct RtpCounterSink {
    role: &'static str,
    current: Mutex<Option<JoinHandle<()>>>,
}

impl RtpCounterSink {
    pub fn new(role: &'static str) -> Self {
        Self {
            role,
            current: Mutex::new(None),
        }
    }

    fn replace(&self, next: Option<JoinHandle<()>>) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(previous) = std::mem::replace(&mut *current, next) {
                previous.abort();
            }
        }
    }
}

impl TrackSink for RtpCounterSink {
    fn attach(&self, track: RemoteTrack) {
        let Some(rtc) = track.rtc().cloned() else {
            self.replace(None);
            return;
        };

        let role = self.role;
        info!("{} sink renders track {} of stream {}", role, track.id(), track.stream_id());
        let handle = tokio::spawn(async move {
            let (mut packets, mut bytes) = (0u64, 0usize);
            while let Ok((packet, _)) = rtc.read_rtp().await {
                packets += 1;
                bytes += packet.payload.len();
                if packets % REPORT_EVERY == 0 {
                    info!("{} sink: {} packets, {} payload bytes", role, packets, bytes);
                }
            }
            debug!("{} sink: track ended after {} packets", role, packets);
        });
        self.replace(Some(handle));
    }

    fn clear(&self) {
        self.replace(None);
    }
}

impl Drop for RtpCounterSink {
    fn drop(&mut self) {
        self.replace(None);
    }
}
