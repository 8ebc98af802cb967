use crate::config::ClientConfig;
use crate::description::SessionDescription;
use crate::error::Result;
use crate::media::{CaptureTrack, RemoteTrack};
use crate::transport::{
    GatheringState, GatheringStateHandler, PeerTransport, TrackHandler, TransportFactory,
};
use async_trait::async_trait;
use log::{debug, trace, warn};
use std::sync::Arc;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_gathering_state::RTCIceGatheringState;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::track::track_local::TrackLocal;

impl From<RTCIceGathererState> for GatheringState {
    fn from(state: RTCIceGathererState) -> Self {
        match state {
            RTCIceGathererState::Gathering => GatheringState::Gathering,
            RTCIceGathererState::Complete => GatheringState::Complete,
            RTCIceGathererState::Closed => GatheringState::Closed,
            _ => GatheringState::New,
        }
    }
}

impl From<RTCIceGatheringState> for GatheringState {
    fn from(state: RTCIceGatheringState) -> Self {
        match state {
            RTCIceGatheringState::Gathering => GatheringState::Gathering,
            RTCIceGatheringState::Complete => GatheringState::Complete,
            _ => GatheringState::New,
        }
    }
}

/// PeerTransport over a webrtc-rs peer connection
pub struct PeerConnectionTransport {
    peer_connection: Arc<RTCPeerConnection>,
}

impl PeerConnectionTransport {
    pub async fn new(config: &ClientConfig) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        // interceptors keep RTCP (NACK, reports) flowing for the sample tracks
        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let peer_connection = Arc::new(
            api.new_peer_connection(RTCConfiguration {
                ice_servers: config.ice_servers.clone(),
                ..Default::default()
            })
            .await?,
        );

        Ok(Self { peer_connection })
    }

    pub fn peer_connection(&self) -> &Arc<RTCPeerConnection> {
        &self.peer_connection
    }
}

#[async_trait]
impl PeerTransport for PeerConnectionTransport {
    async fn add_track(&self, track: &CaptureTrack) -> Result<()> {
        let rtp_sender = self
            .peer_connection
            .add_track(Arc::clone(track.local()) as Arc<dyn TrackLocal + Send + Sync>)
            .await?;

        // Read incoming RTCP packets
        // Before these packets are returned they are processed by interceptors. For things
        // like NACK this needs to be called.
        let track_id = track.id().to_owned();
        tokio::spawn(async move {
            while let Ok((rtcp_packets, _)) = rtp_sender.read_rtcp().await {
                trace!("{}: received {} RTCP packets", track_id, rtcp_packets.len());
            }
        });

        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        Ok(offer.into())
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(desc.to_rtc()?)
            .await?;
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.peer_connection
            .local_description()
            .await
            .map(SessionDescription::from)
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(desc.to_rtc()?)
            .await?;
        Ok(())
    }

    fn ice_gathering_state(&self) -> GatheringState {
        self.peer_connection.ice_gathering_state().into()
    }

    fn on_gathering_state_change(&self, handler: Option<GatheringStateHandler>) {
        match handler {
            Some(mut handler) => self.peer_connection.on_ice_gathering_state_change(Box::new(
                move |state: RTCIceGathererState| {
                    handler(state.into());
                    Box::pin(async {})
                },
            )),
            None => self
                .peer_connection
                .on_ice_gathering_state_change(Box::new(|_| Box::pin(async {}))),
        }
    }

    fn on_track(&self, handler: Option<TrackHandler>) {
        match handler {
            Some(mut handler) => {
                self.peer_connection
                    .on_track(Box::new(move |track, _receiver, _transceiver| {
                        handler(RemoteTrack::from_rtc(track));
                        Box::pin(async {})
                    }))
            }
            None => self
                .peer_connection
                .on_track(Box::new(|_, _, _| Box::pin(async {}))),
        }
    }

    async fn stop_transceivers(&self) -> Result<usize> {
        let transceivers = self.peer_connection.get_transceivers().await;
        let mut stopped = 0;
        for transceiver in transceivers {
            match transceiver.stop().await {
                Ok(()) => stopped += 1,
                Err(err) => warn!("transceiver stop: {}", err),
            }
        }
        debug!("stopped {} transceivers", stopped);
        Ok(stopped)
    }

    async fn sender_track_ids(&self) -> Vec<String> {
        let mut ids = vec![];
        for sender in self.peer_connection.get_senders().await {
            if let Some(track) = sender.track().await {
                ids.push(track.id().to_owned());
            }
        }
        ids
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Allocates one PeerConnectionTransport per session
#[derive(Debug, Default, Clone, Copy)]
pub struct PeerConnectionFactory;

#[async_trait]
impl TransportFactory for PeerConnectionFactory {
    async fn create(&self, config: &ClientConfig) -> Result<Arc<dyn PeerTransport>> {
        Ok(Arc::new(PeerConnectionTransport::new(config).await?))
    }
}
