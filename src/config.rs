use crate::error::{Error, Result};
use crate::media::MediaConstraints;
use std::time::Duration;
use url::Url;
use webrtc::ice_transport::ice_server::RTCIceServer;

pub(crate) const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/offer";
pub(crate) const DEFAULT_CLOSE_DELAY: Duration = Duration::from_millis(500);

/// ClientConfig provides customized parameters for the offer client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub(crate) endpoint: Url,
    pub(crate) ice_servers: Vec<RTCIceServer>,
    pub(crate) constraints: MediaConstraints,
    pub(crate) close_delay: Duration,
    pub(crate) gathering_timeout: Option<Duration>,
    pub(crate) exchange_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let endpoint = Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid url");
        Self::with_defaults(endpoint)
    }
}

impl ClientConfig {
    /// create new client config exchanging offers with `endpoint`
    pub fn new(endpoint: Url) -> Result<Self> {
        if endpoint.scheme() != "http" {
            return Err(Error::ErrUnsupportedScheme(endpoint.scheme().to_owned()));
        }
        Ok(Self::with_defaults(endpoint))
    }

    /// create new client config for the `/offer` route of `host:port`
    pub fn from_host_port(host: &str, port: u16) -> Result<Self> {
        let endpoint = Url::parse(&format!("http://{host}:{port}/offer"))?;
        Self::new(endpoint)
    }

    fn with_defaults(endpoint: Url) -> Self {
        Self {
            endpoint,
            ice_servers: vec![],
            constraints: MediaConstraints::default(),
            close_delay: DEFAULT_CLOSE_DELAY,
            gathering_timeout: None,
            exchange_timeout: None,
        }
    }

    /// build with provided ICE servers
    pub fn with_ice_servers(mut self, ice_servers: Vec<RTCIceServer>) -> Self {
        self.ice_servers = ice_servers;
        self
    }

    /// build with provided capture constraints
    pub fn with_constraints(mut self, constraints: MediaConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// build with the delay between stop and releasing the peer connection
    pub fn with_close_delay(mut self, close_delay: Duration) -> Self {
        self.close_delay = close_delay;
        self
    }

    /// build with a bound on the wait for ICE gathering completion
    pub fn with_gathering_timeout(mut self, gathering_timeout: Duration) -> Self {
        self.gathering_timeout = Some(gathering_timeout);
        self
    }

    /// build with a bound on the offer exchange round trip
    pub fn with_exchange_timeout(mut self, exchange_timeout: Duration) -> Self {
        self.exchange_timeout = Some(exchange_timeout);
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn ice_servers(&self) -> &[RTCIceServer] {
        &self.ice_servers
    }

    pub fn constraints(&self) -> MediaConstraints {
        self.constraints
    }

    pub fn close_delay(&self) -> Duration {
        self.close_delay
    }

    pub fn gathering_timeout(&self) -> Option<Duration> {
        self.gathering_timeout
    }

    pub fn exchange_timeout(&self) -> Option<Duration> {
        self.exchange_timeout
    }
}
