#![warn(rust_2018_idioms)]

pub mod config;
pub mod description;
pub mod error;
pub mod exchange;
pub mod media;
pub mod negotiation;
pub mod notify;
pub mod selection;
pub mod session;
pub mod transport;

pub use config::ClientConfig;
pub use description::SessionDescription;
pub use error::{Error, Result};
pub use exchange::{HttpExchange, OfferExchange, OfferRequest};
pub use media::{
    file::FileCapture,
    sink::{MediaSinks, RtpCounterSink, TrackSink},
    CaptureTrack, MediaCapture, MediaConstraints, MediaStream, RemoteTrack, TrackKind,
};
pub use negotiation::{wait_for_gathering_complete, Negotiator};
pub use notify::{LogNotifier, Notifier};
pub use selection::{SelectionSource, TransformSelection};
pub use session::{SessionManager, SessionState};
pub use transport::{
    GatheringState, GatheringStateHandler, PeerConnectionFactory, PeerConnectionTransport,
    PeerTransport, TrackHandler, TransportFactory,
};
