use crate::config::ClientConfig;
use crate::description::SessionDescription;
use crate::error::{Error, Result};
use crate::exchange::{HttpExchange, OfferExchange};
use crate::media::sink::MediaSinks;
use crate::media::{CaptureTrack, MediaCapture, MediaStream, RemoteTrack};
use crate::negotiation::Negotiator;
use crate::notify::{LogNotifier, Notifier};
use crate::selection::{SelectionSource, TransformSelection};
use crate::transport::{PeerConnectionFactory, PeerTransport, TransportFactory};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Lifecycle of the session owned by a SessionManager
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Starting,
    Negotiating,
    Active,
    Stopping,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Negotiating => "negotiating",
            SessionState::Active => "active",
            SessionState::Stopping => "stopping",
        };
        write!(f, "{s}")
    }
}

struct Session {
    transport: Arc<dyn PeerTransport>,
    tracks: HashMap<String, CaptureTrack>,
    remote: Option<SessionDescription>,
}

impl Session {
    fn new(transport: Arc<dyn PeerTransport>, stream: &MediaStream) -> Self {
        let tracks = stream
            .tracks()
            .iter()
            .map(|track| (track.id().to_owned(), track.clone()))
            .collect();
        Self {
            transport,
            tracks,
            remote: None,
        }
    }
}

/// SessionManager owns at most one session handle at a time.
///
/// `start` needs `&mut self`, so a second negotiation can't be started while one
/// is in flight, and it is rejected while a handle is held: a session, including
/// one whose negotiation failed, must be stopped before the next start.
pub struct SessionManager {
    config: ClientConfig,
    factory: Arc<dyn TransportFactory>,
    capture: Arc<dyn MediaCapture>,
    negotiator: Negotiator,
    sinks: MediaSinks,
    selection: Arc<dyn SelectionSource>,
    notifier: Arc<dyn Notifier>,
    state: Arc<watch::Sender<SessionState>>,
    session: Option<Session>,
}

impl SessionManager {
    /// create a manager negotiating over webrtc-rs peer connections with the
    /// configured HTTP endpoint
    pub fn new(config: ClientConfig, capture: Arc<dyn MediaCapture>) -> Result<Self> {
        let exchange = HttpExchange::new(&config.endpoint)?.with_timeout(config.exchange_timeout);
        let negotiator =
            Negotiator::new(Arc::new(exchange)).with_gathering_timeout(config.gathering_timeout);
        let (state, _) = watch::channel(SessionState::Idle);

        Ok(Self {
            config,
            factory: Arc::new(PeerConnectionFactory),
            capture,
            negotiator,
            sinks: MediaSinks::default(),
            selection: Arc::new(TransformSelection::default()),
            notifier: Arc::new(LogNotifier),
            state: Arc::new(state),
            session: None,
        })
    }

    /// build with provided TransportFactory
    pub fn with_transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// build with provided OfferExchange
    pub fn with_exchange(mut self, exchange: Arc<dyn OfferExchange>) -> Self {
        self.negotiator =
            Negotiator::new(exchange).with_gathering_timeout(self.config.gathering_timeout);
        self
    }

    /// build with provided rendering sinks
    pub fn with_sinks(mut self, sinks: MediaSinks) -> Self {
        self.sinks = sinks;
        self
    }

    /// build with provided SelectionSource
    pub fn with_selection(mut self, selection: Arc<dyn SelectionSource>) -> Self {
        self.selection = selection;
        self
    }

    /// build with provided Notifier
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// the current session handle, if one is held
    pub fn transport(&self) -> Option<&Arc<dyn PeerTransport>> {
        self.session.as_ref().map(|session| &session.transport)
    }

    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.session
            .as_ref()
            .and_then(|session| session.remote.as_ref())
    }

    pub async fn local_description(&self) -> Option<SessionDescription> {
        match &self.session {
            Some(session) => session.transport.local_description().await,
            None => None,
        }
    }

    /// Acquires capture, allocates a fresh session handle, attaches every
    /// captured track and negotiates it with the remote endpoint.
    ///
    /// Failures are surfaced once through the notifier and returned. When
    /// negotiation fails the handle stays held until `stop`.
    pub async fn start(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Err(Error::ErrSessionActive);
        }
        self.set_state(SessionState::Starting);
        self.sinks.clear();

        let stream = match self.capture.acquire(&self.config.constraints).await {
            Ok(stream) => stream,
            Err(err) => {
                self.fail(&format!("Could not acquire media: {err}"));
                return Err(err);
            }
        };

        let transport = match self.factory.create(&self.config).await {
            Ok(transport) => transport,
            Err(err) => {
                stream.stop();
                self.fail(&err.to_string());
                return Err(err);
            }
        };

        let sinks = self.sinks.clone();
        transport.on_track(Some(Box::new(move |track: RemoteTrack| sinks.route(track))));

        self.session = Some(Session::new(Arc::clone(&transport), &stream));

        match self.attach_and_negotiate(transport.as_ref(), &stream).await {
            Ok(answer) => {
                if let Some(session) = self.session.as_mut() {
                    session.remote = Some(answer);
                }
                self.set_state(SessionState::Active);
                info!("session active with {} local tracks", stream.tracks().len());
                Ok(())
            }
            Err(err) => {
                self.fail(&err.to_string());
                Err(err)
            }
        }
    }

    async fn attach_and_negotiate(
        &self,
        transport: &dyn PeerTransport,
        stream: &MediaStream,
    ) -> Result<SessionDescription> {
        for track in stream.tracks() {
            transport.add_track(track).await?;
            debug!("attached {} track {}", track.kind(), track.id());
        }

        self.set_state(SessionState::Negotiating);
        let selection = self.selection.current();
        self.negotiator.negotiate(transport, &selection).await
    }

    /// Stops every transceiver and the capture behind every sender, then
    /// releases the session handle after the configured close delay.
    ///
    /// The returned task completes once the handle is closed.
    pub async fn stop(&mut self) -> Result<JoinHandle<()>> {
        let mut session = self.session.take().ok_or(Error::ErrNoSession)?;
        self.set_state(SessionState::Stopping);

        if let Err(err) = session.transport.stop_transceivers().await {
            warn!("stop transceivers: {}", err);
        }

        for id in session.transport.sender_track_ids().await {
            if let Some(track) = session.tracks.remove(&id) {
                debug!("stop {} track {}", track.kind(), id);
                track.stop();
            }
        }
        // tracks that never made it onto a sender
        for track in session.tracks.values() {
            track.stop();
        }

        let close_delay = self.config.close_delay;
        let state = Arc::clone(&self.state);
        let transport = session.transport;
        Ok(tokio::spawn(async move {
            tokio::time::sleep(close_delay).await;
            if let Err(err) = transport.close().await {
                warn!("close session: {}", err);
            }
            state.send_if_modified(|state| {
                if *state == SessionState::Stopping {
                    *state = SessionState::Idle;
                    true
                } else {
                    false
                }
            });
            info!("session released");
        }))
    }

    fn fail(&self, message: &str) {
        self.notifier.notify(message);
        self.set_state(SessionState::Idle);
    }

    fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!("session state {} -> {}", previous, next);
        }
    }
}
