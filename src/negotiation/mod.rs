use crate::description::SessionDescription;
use crate::error::{Error, Result};
use crate::exchange::{OfferExchange, OfferRequest};
use crate::selection::TransformSelection;
use crate::transport::PeerTransport;
use log::debug;
use std::sync::Arc;
use std::time::Duration;

pub mod gathering;

pub use gathering::wait_for_gathering_complete;

/// Negotiator runs the one-shot offer/answer sequence against a session handle.
///
/// The steps run strictly in order and the first failure ends the sequence;
/// nothing is retried and the transport is left as the failing step left it.
#[derive(Clone)]
pub struct Negotiator {
    exchange: Arc<dyn OfferExchange>,
    gathering_timeout: Option<Duration>,
}

impl Negotiator {
    pub fn new(exchange: Arc<dyn OfferExchange>) -> Self {
        Self {
            exchange,
            gathering_timeout: None,
        }
    }

    pub fn with_gathering_timeout(mut self, gathering_timeout: Option<Duration>) -> Self {
        self.gathering_timeout = gathering_timeout;
        self
    }

    /// Negotiates `transport` with the remote endpoint and returns the applied answer
    pub async fn negotiate(
        &self,
        transport: &dyn PeerTransport,
        selection: &TransformSelection,
    ) -> Result<SessionDescription> {
        let offer = transport.create_offer().await?;
        debug!("created local offer");

        transport.set_local_description(offer).await?;
        debug!("local description set");

        wait_for_gathering_complete(transport, self.gathering_timeout).await?;

        // re-read: the description now carries the gathered candidates
        let local = transport
            .local_description()
            .await
            .ok_or(Error::ErrNoLocalDescription)?;
        let request = OfferRequest::new(&local, selection);
        let answer = self.exchange.exchange(&request).await?;
        debug!("received remote {}", answer.sdp_type);

        transport.set_remote_description(answer.clone()).await?;
        debug!("remote description set");

        Ok(answer)
    }
}
