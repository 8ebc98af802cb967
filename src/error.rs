use thiserror::Error;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("a session is already held, stop it before starting again")]
    ErrSessionActive,
    #[error("no session to stop")]
    ErrNoSession,
    #[error("{0}")]
    ErrCapture(String),
    #[error("local description is not set")]
    ErrNoLocalDescription,
    #[error("timed out waiting for ICE gathering to complete")]
    ErrGatheringTimeout,
    #[error("ICE gathering subscription dropped before completion")]
    ErrGatheringAborted,
    #[error("timed out waiting for the offer exchange")]
    ErrExchangeTimeout,
    #[error("offer exchange failed with HTTP status {0}")]
    ErrExchangeStatus(u16),
    #[error("malformed answer: {0}")]
    ErrMalformedAnswer(String),
    #[error("unsupported sdp type {0}")]
    ErrUnsupportedSdpType(RTCSdpType),
    #[error("unsupported endpoint scheme {0}, only http is supported")]
    ErrUnsupportedScheme(String),

    #[error("{0}")]
    Webrtc(#[from] webrtc::Error),
    #[error("{0}")]
    Hyper(#[from] hyper::Error),
    #[error("{0}")]
    Http(#[from] hyper::http::Error),
    #[error("{0}")]
    InvalidUri(#[from] hyper::http::uri::InvalidUri),
    #[error("{0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}
