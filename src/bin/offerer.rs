use clap::Parser;
use log::info;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use webrtc::ice_transport::ice_server::RTCIceServer;

use offerer::{ClientConfig, FileCapture, SessionManager, TransformSelection};

#[derive(Parser)]
#[command(name = "Offerer")]
#[command(version = "0.1.0")]
#[command(about = "Sends local media to a transform server over one WebRTC session", long_about = None)]
struct Cli {
    #[arg(short, long)]
    debug: bool,
    #[arg(long, default_value_t = format!("127.0.0.1"))]
    host: String,
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
    /// video transform requested from the server (none, edges, cartoon, rotate)
    #[arg(long, default_value_t = format!("none"))]
    video_transform: String,
    /// audio effect requested from the server (normal, robot_voice, alien_voice, chipmunk)
    #[arg(long, default_value_t = format!("normal"))]
    audio_effect: String,
    /// IVF (VP8) file used as the video capture
    #[arg(long)]
    video_file: Option<PathBuf>,
    /// Ogg (Opus) file used as the audio capture
    #[arg(long)]
    audio_file: Option<PathBuf>,
    /// STUN server url, e.g. stun:stun.l.google.com:19302
    #[arg(long)]
    stun: Vec<String>,
    #[arg(long)]
    gathering_timeout_ms: Option<u64>,
    #[arg(long)]
    exchange_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.debug {
        log::LevelFilter::Trace
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} [{}] {} - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                chrono::Local::now().format("%H:%M:%S.%6f"),
                record.args()
            )
        })
        .filter(None, level)
        .init();

    let mut config = ClientConfig::from_host_port(&cli.host, cli.port)?;
    if !cli.stun.is_empty() {
        config = config.with_ice_servers(vec![RTCIceServer {
            urls: cli.stun,
            ..Default::default()
        }]);
    }
    if let Some(ms) = cli.gathering_timeout_ms {
        config = config.with_gathering_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = cli.exchange_timeout_ms {
        config = config.with_exchange_timeout(Duration::from_millis(ms));
    }

    let mut capture = FileCapture::new();
    if let Some(path) = cli.video_file {
        capture = capture.with_video(path);
    }
    if let Some(path) = cli.audio_file {
        capture = capture.with_audio(path);
    }

    info!("offering to {}...", config.endpoint());

    let selection = TransformSelection::new(cli.video_transform, cli.audio_effect);
    let mut manager =
        SessionManager::new(config, Arc::new(capture))?.with_selection(Arc::new(selection));

    // failures were already surfaced by the notifier
    if manager.start().await.is_err() {
        if manager.transport().is_some() {
            manager.stop().await?.await?;
        }
        std::process::exit(1);
    }

    info!("Press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    let release = manager.stop().await?;
    release.await?;

    Ok(())
}
