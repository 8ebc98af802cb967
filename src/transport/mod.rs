use crate::config::ClientConfig;
use crate::description::SessionDescription;
use crate::error::Result;
use crate::media::{CaptureTrack, RemoteTrack};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

pub mod peer_connection;

pub use peer_connection::{PeerConnectionFactory, PeerConnectionTransport};

/// ICE candidate gathering progress of a session
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GatheringState {
    #[default]
    New,
    Gathering,
    Complete,
    Closed,
}

impl fmt::Display for GatheringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            GatheringState::New => "new",
            GatheringState::Gathering => "gathering",
            GatheringState::Complete => "complete",
            GatheringState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

pub type GatheringStateHandler = Box<dyn FnMut(GatheringState) + Send + Sync>;
pub type TrackHandler = Box<dyn FnMut(RemoteTrack) + Send + Sync>;

/// PeerTransport is the session handle: the real-time transport one session
/// negotiates over and sends its captured tracks on.
///
/// Handlers are single-slot: installing one replaces the previous one and
/// `None` removes it.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn add_track(&self, track: &CaptureTrack) -> Result<()>;

    async fn create_offer(&self) -> Result<SessionDescription>;
    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;
    async fn local_description(&self) -> Option<SessionDescription>;
    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    fn ice_gathering_state(&self) -> GatheringState;
    fn on_gathering_state_change(&self, handler: Option<GatheringStateHandler>);

    /// inbound media notifications, delivered independently of negotiation
    fn on_track(&self, handler: Option<TrackHandler>);

    /// stops every transceiver that supports stopping, returns how many stopped
    async fn stop_transceivers(&self) -> Result<usize>;
    /// ids of the local tracks currently bound to outbound senders
    async fn sender_track_ids(&self) -> Vec<String>;

    async fn close(&self) -> Result<()>;
}

/// TransportFactory allocates a fresh session handle for every start
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(&self, config: &ClientConfig) -> Result<Arc<dyn PeerTransport>>;
}
