use crate::error::{Error, Result};
use crate::media::{CaptureTrack, MediaCapture, MediaConstraints, MediaStream, TrackKind};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use webrtc::media::io::ivf_reader::{IVFFileHeader, IVFReader};
use webrtc::media::io::ogg_reader::OggReader;
use webrtc::media::Sample;

const OGG_PAGE_DURATION: Duration = Duration::from_millis(20);
const OPUS_CLOCK_RATE: u64 = 48000;
// pacing floor for IVF files whose timebase is finer than a millisecond
const MIN_FRAME_DURATION: Duration = Duration::from_millis(1);

/// FileCapture plays an IVF (VP8) file as the video source and an Ogg (Opus)
/// file as the audio source.
#[derive(Debug, Default, Clone)]
pub struct FileCapture {
    video: Option<PathBuf>,
    audio: Option<PathBuf>,
}

impl FileCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, path: impl Into<PathBuf>) -> Self {
        self.video = Some(path.into());
        self
    }

    pub fn with_audio(mut self, path: impl Into<PathBuf>) -> Self {
        self.audio = Some(path.into());
        self
    }
}

fn open(kind: TrackKind, path: Option<&Path>) -> Result<BufReader<File>> {
    let path = path.ok_or_else(|| Error::ErrCapture(format!("no {kind} source available")))?;
    let file = File::open(path)
        .map_err(|err| Error::ErrCapture(format!("{kind} source {}: {err}", path.display())))?;
    Ok(BufReader::new(file))
}

/// duration of one IVF timebase tick, never below MIN_FRAME_DURATION
fn frame_duration(header: &IVFFileHeader) -> Result<Duration> {
    if header.timebase_denominator == 0 {
        return Err(Error::ErrCapture("video source: zero timebase denominator".to_owned()));
    }
    let nanos = 1_000_000_000 * u64::from(header.timebase_numerator)
        / u64::from(header.timebase_denominator);
    Ok(Duration::from_nanos(nanos).max(MIN_FRAME_DURATION))
}

#[async_trait]
impl MediaCapture for FileCapture {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<MediaStream> {
        // parse every source first so a bad one fails without starting any pump
        let audio = if constraints.audio {
            let reader = open(TrackKind::Audio, self.audio.as_deref())?;
            let (ogg, _) = OggReader::new(reader, true)
                .map_err(|err| Error::ErrCapture(format!("audio source: {err}")))?;
            Some(ogg)
        } else {
            None
        };
        let video = if constraints.video {
            let reader = open(TrackKind::Video, self.video.as_deref())?;
            let (ivf, header) = IVFReader::new(reader)
                .map_err(|err| Error::ErrCapture(format!("video source: {err}")))?;
            Some((ivf, frame_duration(&header)?))
        } else {
            None
        };

        let stream_id = MediaStream::new_stream_id();
        let mut tracks = vec![];

        if let Some(ogg) = audio {
            let track = CaptureTrack::new(TrackKind::Audio, &stream_id);
            tokio::spawn(pump_ogg(ogg, track.clone()));
            tracks.push(track);
        }

        if let Some((ivf, frame_duration)) = video {
            let track = CaptureTrack::new(TrackKind::Video, &stream_id);
            tokio::spawn(pump_ivf(ivf, frame_duration, track.clone()));
            tracks.push(track);
        }

        info!("acquired {} capture tracks on {}", tracks.len(), stream_id);
        Ok(MediaStream::new(stream_id, tracks))
    }
}

/// writes one IVF frame per `frame_duration` until EOF or the track is stopped,
/// returns the number of frames written
async fn pump_ivf(
    mut ivf: IVFReader<BufReader<File>>,
    frame_duration: Duration,
    track: CaptureTrack,
) -> usize {
    let mut ticker = tokio::time::interval(frame_duration);
    let mut sent = 0;
    loop {
        tokio::select! {
            biased;
            _ = track.stopped() => break,
            _ = ticker.tick() => {}
        }

        let frame = match ivf.parse_next_frame() {
            Ok((frame, _)) => frame,
            Err(err) => {
                debug!("{}: all video frames sent: {}", track.id(), err);
                break;
            }
        };

        if let Err(err) = track
            .local()
            .write_sample(&Sample {
                data: frame.freeze(),
                duration: frame_duration,
                ..Default::default()
            })
            .await
        {
            warn!("{}: write_sample error {}", track.id(), err);
            break;
        }
        sent += 1;
    }
    sent
}

/// writes one Ogg page per OGG_PAGE_DURATION until EOF or the track is stopped,
/// returns the number of pages written
async fn pump_ogg(mut ogg: OggReader<BufReader<File>>, track: CaptureTrack) -> usize {
    let mut ticker = tokio::time::interval(OGG_PAGE_DURATION);
    let mut last_granule: u64 = 0;
    let mut sent = 0;
    loop {
        tokio::select! {
            biased;
            _ = track.stopped() => break,
            _ = ticker.tick() => {}
        }

        let (page_data, page_header) = match ogg.parse_next_page() {
            Ok(page) => page,
            Err(err) => {
                debug!("{}: all audio pages sent: {}", track.id(), err);
                break;
            }
        };

        let sample_count = page_header.granule_position.saturating_sub(last_granule);
        last_granule = page_header.granule_position;

        if let Err(err) = track
            .local()
            .write_sample(&Sample {
                data: page_data.freeze(),
                duration: Duration::from_millis(sample_count * 1000 / OPUS_CLOCK_RATE),
                ..Default::default()
            })
            .await
        {
            warn!("{}: write_sample error {}", track.id(), err);
            break;
        }
        sent += 1;
    }
    sent
}
