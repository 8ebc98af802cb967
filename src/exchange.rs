use crate::description::SessionDescription;
use crate::error::{Error, Result};
use crate::selection::TransformSelection;
use async_trait::async_trait;
use bytes::Bytes;
use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Method, Request, Uri};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;

/// Body of the offer exchange: the local description plus the requested modes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRequest {
    pub sdp: String,
    #[serde(rename = "type")]
    pub sdp_type: RTCSdpType,
    pub video: String,
    pub audio: String,
}

impl OfferRequest {
    pub fn new(local: &SessionDescription, selection: &TransformSelection) -> Self {
        Self {
            sdp: local.sdp.clone(),
            sdp_type: local.sdp_type,
            video: selection.video.clone(),
            audio: selection.audio.clone(),
        }
    }
}

/// OfferExchange sends one offer to the remote endpoint and returns its answer
#[async_trait]
pub trait OfferExchange: Send + Sync {
    async fn exchange(&self, request: &OfferRequest) -> Result<SessionDescription>;
}

/// OfferExchange over a single HTTP `POST` with a JSON body
#[derive(Debug, Clone)]
pub struct HttpExchange {
    client: Client<HttpConnector>,
    endpoint: Uri,
    timeout: Option<Duration>,
}

impl HttpExchange {
    pub fn new(endpoint: &Url) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            endpoint: endpoint.as_str().parse::<Uri>()?,
            timeout: None,
        })
    }

    /// bound the whole round trip, `None` waits forever
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    async fn round_trip(&self, body: Vec<u8>) -> Result<Bytes> {
        let req = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))?;

        let resp = self.client.request(req).await?;
        let status = resp.status();
        let body = hyper::body::to_bytes(resp.into_body()).await?;
        debug!("{} answered {} with {} bytes", self.endpoint, status, body.len());

        if !status.is_success() {
            return Err(Error::ErrExchangeStatus(status.as_u16()));
        }
        Ok(body)
    }
}

#[async_trait]
impl OfferExchange for HttpExchange {
    async fn exchange(&self, request: &OfferRequest) -> Result<SessionDescription> {
        let body = serde_json::to_vec(request)?;
        info!(
            "POST {} (video={}, audio={})",
            self.endpoint, request.video, request.audio
        );

        let body = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.round_trip(body))
                .await
                .map_err(|_| Error::ErrExchangeTimeout)??,
            None => self.round_trip(body).await?,
        };

        serde_json::from_slice::<SessionDescription>(&body)
            .map_err(|err| Error::ErrMalformedAnswer(err.to_string()))
    }
}
