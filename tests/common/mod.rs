#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use log::LevelFilter::Debug;
use log::{error, info};
use offerer::{
    CaptureTrack, ClientConfig, Error, GatheringState, GatheringStateHandler, MediaCapture,
    MediaConstraints, MediaStream, Notifier, OfferExchange, OfferRequest, PeerTransport,
    RemoteTrack, Result, SessionDescription, TrackHandler, TrackKind, TrackSink,
    TransportFactory,
};
use std::future::Future;
use std::io::Write;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;

pub const OFFER_SDP: &str = "v=0\r\no=- 1 1 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\n";
pub const CANDIDATE_LINE: &str = "a=candidate:1 1 udp 2130706431 192.0.2.1 50000 typ host\r\n";
pub const ANSWER_SDP: &str = "v=0\r\no=- 2 2 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\n";

pub fn setup() {
    let _ = env_logger::Builder::new()
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
        .filter(None, Debug)
        .is_test(true)
        .try_init();
}

pub type Trace = Arc<Mutex<Vec<String>>>;

pub fn new_trace() -> Trace {
    Arc::new(Mutex::new(vec![]))
}

pub fn record(trace: &Trace, step: &str) {
    trace.lock().unwrap().push(step.to_owned());
}

pub fn steps(trace: &Trace) -> Vec<String> {
    trace.lock().unwrap().clone()
}

/// How the mock reports candidate gathering once the local description is set
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Gathering {
    /// complete as soon as the local description is applied
    AlreadyComplete,
    /// reports gathering, complete, complete again on subscription
    CompleteOnSubscribe,
    /// the test drives state changes through `emit_gathering`
    Manual,
}

pub struct MockTransport {
    trace: Trace,
    gathering: Gathering,
    fail_at: Option<&'static str>,
    state: Mutex<GatheringState>,
    gathering_handler: Mutex<Option<GatheringStateHandler>>,
    track_handler: Mutex<Option<TrackHandler>>,
    subscriptions: AtomicUsize,
    unsubscriptions: AtomicUsize,
    local: Mutex<Option<SessionDescription>>,
    remote: Mutex<Option<SessionDescription>>,
    tracks: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl MockTransport {
    pub fn new(trace: Trace, gathering: Gathering) -> Self {
        Self {
            trace,
            gathering,
            fail_at: None,
            state: Mutex::new(GatheringState::New),
            gathering_handler: Mutex::new(None),
            track_handler: Mutex::new(None),
            subscriptions: AtomicUsize::new(0),
            unsubscriptions: AtomicUsize::new(0),
            local: Mutex::new(None),
            remote: Mutex::new(None),
            tracks: Mutex::new(vec![]),
            closed: AtomicBool::new(false),
        }
    }

    pub fn failing_at(mut self, step: &'static str) -> Self {
        self.fail_at = Some(step);
        self
    }

    fn step(&self, step: &'static str) -> Result<()> {
        record(&self.trace, step);
        if self.fail_at == Some(step) {
            return Err(Error::Other(format!("{step} rejected")));
        }
        Ok(())
    }

    /// changes the gathering state and notifies the subscribed handler, if any
    pub fn emit_gathering(&self, state: GatheringState) {
        *self.state.lock().unwrap() = state;
        if state == GatheringState::Complete {
            if let Some(local) = self.local.lock().unwrap().as_mut() {
                if !local.sdp.contains(CANDIDATE_LINE) {
                    local.sdp.push_str(CANDIDATE_LINE);
                }
            }
        }
        if let Some(handler) = self.gathering_handler.lock().unwrap().as_mut() {
            record(&self.trace, &format!("gathering:{state}"));
            handler(state);
        }
    }

    /// delivers an inbound track notification
    pub fn emit_track(&self, track: RemoteTrack) {
        if let Some(handler) = self.track_handler.lock().unwrap().as_mut() {
            handler(track);
        }
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    pub fn unsubscriptions(&self) -> usize {
        self.unsubscriptions.load(Ordering::SeqCst)
    }

    pub fn has_gathering_handler(&self) -> bool {
        self.gathering_handler.lock().unwrap().is_some()
    }

    pub fn attached_tracks(&self) -> Vec<String> {
        self.tracks.lock().unwrap().clone()
    }

    pub fn remote(&self) -> Option<SessionDescription> {
        self.remote.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn add_track(&self, track: &CaptureTrack) -> Result<()> {
        self.step("add_track")?;
        self.tracks.lock().unwrap().push(track.id().to_owned());
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        self.step("create_offer")?;
        Ok(SessionDescription::offer(OFFER_SDP.to_owned()))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.step("set_local_description")?;
        *self.local.lock().unwrap() = Some(desc);
        if self.gathering == Gathering::AlreadyComplete {
            self.emit_gathering(GatheringState::Complete);
        } else {
            *self.state.lock().unwrap() = GatheringState::Gathering;
        }
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().unwrap().clone()
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.step("set_remote_description")?;
        *self.remote.lock().unwrap() = Some(desc);
        Ok(())
    }

    fn ice_gathering_state(&self) -> GatheringState {
        *self.state.lock().unwrap()
    }

    fn on_gathering_state_change(&self, handler: Option<GatheringStateHandler>) {
        let subscribed = handler.is_some();
        if subscribed {
            self.subscriptions.fetch_add(1, Ordering::SeqCst);
            record(&self.trace, "subscribe");
        } else {
            self.unsubscriptions.fetch_add(1, Ordering::SeqCst);
            record(&self.trace, "unsubscribe");
        }
        *self.gathering_handler.lock().unwrap() = handler;

        if subscribed && self.gathering == Gathering::CompleteOnSubscribe {
            self.emit_gathering(GatheringState::Gathering);
            self.emit_gathering(GatheringState::Complete);
            self.emit_gathering(GatheringState::Complete);
        }
    }

    fn on_track(&self, handler: Option<TrackHandler>) {
        *self.track_handler.lock().unwrap() = handler;
    }

    async fn stop_transceivers(&self) -> Result<usize> {
        record(&self.trace, "stop_transceivers");
        Ok(self.tracks.lock().unwrap().len())
    }

    async fn sender_track_ids(&self) -> Vec<String> {
        self.tracks.lock().unwrap().clone()
    }

    async fn close(&self) -> Result<()> {
        record(&self.trace, "close");
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out MockTransports and keeps them for inspection
pub struct MockFactory {
    trace: Trace,
    gathering: Gathering,
    fail_at: Option<&'static str>,
    created: Mutex<Vec<Arc<MockTransport>>>,
}

impl MockFactory {
    pub fn new(trace: Trace, gathering: Gathering) -> Self {
        Self {
            trace,
            gathering,
            fail_at: None,
            created: Mutex::new(vec![]),
        }
    }

    pub fn failing_at(mut self, step: &'static str) -> Self {
        self.fail_at = Some(step);
        self
    }

    pub fn created(&self) -> Vec<Arc<MockTransport>> {
        self.created.lock().unwrap().clone()
    }

    pub fn last(&self) -> Arc<MockTransport> {
        self.created.lock().unwrap().last().cloned().expect("no transport created")
    }
}

#[async_trait]
impl TransportFactory for MockFactory {
    async fn create(&self, _config: &ClientConfig) -> Result<Arc<dyn PeerTransport>> {
        record(&self.trace, "create_transport");
        let mut transport = MockTransport::new(Arc::clone(&self.trace), self.gathering);
        if let Some(step) = self.fail_at {
            transport = transport.failing_at(step);
        }
        let transport = Arc::new(transport);
        self.created.lock().unwrap().push(Arc::clone(&transport));
        Ok(transport)
    }
}

type Reply = Box<dyn Fn(&OfferRequest) -> Result<SessionDescription> + Send + Sync>;

/// Records offers and answers them with a canned reply
pub struct MockExchange {
    trace: Trace,
    reply: Reply,
    requests: Mutex<Vec<OfferRequest>>,
}

impl MockExchange {
    pub fn new(trace: Trace, reply: Reply) -> Self {
        Self {
            trace,
            reply,
            requests: Mutex::new(vec![]),
        }
    }

    pub fn answering(trace: Trace) -> Self {
        Self::new(
            trace,
            Box::new(|_| Ok(SessionDescription::answer(ANSWER_SDP.to_owned()))),
        )
    }

    pub fn requests(&self) -> Vec<OfferRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl OfferExchange for MockExchange {
    async fn exchange(&self, request: &OfferRequest) -> Result<SessionDescription> {
        record(&self.trace, "exchange");
        self.requests.lock().unwrap().push(request.clone());
        (self.reply)(request)
    }
}

/// Capture returning fresh sample tracks without any producer behind them
pub struct StaticCapture {
    denied: Option<String>,
    acquired: Mutex<Vec<CaptureTrack>>,
}

impl StaticCapture {
    pub fn new() -> Self {
        Self {
            denied: None,
            acquired: Mutex::new(vec![]),
        }
    }

    pub fn denied(reason: &str) -> Self {
        Self {
            denied: Some(reason.to_owned()),
            acquired: Mutex::new(vec![]),
        }
    }

    pub fn acquired(&self) -> Vec<CaptureTrack> {
        self.acquired.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaCapture for StaticCapture {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<MediaStream> {
        if let Some(reason) = &self.denied {
            return Err(Error::ErrCapture(reason.clone()));
        }

        let stream_id = MediaStream::new_stream_id();
        let mut tracks = vec![];
        if constraints.audio {
            tracks.push(CaptureTrack::new(TrackKind::Audio, &stream_id));
        }
        if constraints.video {
            tracks.push(CaptureTrack::new(TrackKind::Video, &stream_id));
        }
        self.acquired.lock().unwrap().extend(tracks.iter().cloned());
        Ok(MediaStream::new(stream_id, tracks))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_owned());
    }
}

#[derive(Default)]
pub struct RecordingSink {
    attached: Mutex<Vec<String>>,
    clears: AtomicUsize,
}

impl RecordingSink {
    pub fn attached(&self) -> Vec<String> {
        self.attached.lock().unwrap().clone()
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl TrackSink for RecordingSink {
    fn attach(&self, track: RemoteTrack) {
        self.attached.lock().unwrap().push(track.id().to_owned());
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

pub type Responder = Arc<
    dyn Fn(Option<String>, Bytes) -> Pin<Box<dyn Future<Output = (StatusCode, String)> + Send>>
        + Send
        + Sync,
>;

/// starts an HTTP signaling server on an ephemeral local port serving `POST /offer`
pub async fn serve(responder: Responder) -> anyhow::Result<SocketAddr> {
    let service = make_service_fn(move |_| {
        let responder = Arc::clone(&responder);
        async move {
            Ok::<_, hyper::Error>(service_fn(move |req| {
                let responder = Arc::clone(&responder);
                async move { remote_handler(req, responder).await }
            }))
        }
    });

    let server = Server::try_bind(&SocketAddr::from(([127, 0, 0, 1], 0)))?.serve(service);
    let addr = server.local_addr();
    tokio::spawn(async move {
        if let Err(err) = server.await {
            error!("signaling server error: {}", err);
        }
    });

    info!("signaling server listening on {}", addr);
    Ok(addr)
}

async fn remote_handler(
    req: Request<Body>,
    responder: Responder,
) -> std::result::Result<Response<Body>, hyper::Error> {
    match (req.method(), req.uri().path()) {
        (&Method::POST, "/offer") => {
            let content_type = req
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let body = hyper::body::to_bytes(req.into_body()).await?;
            let (status, body) = responder(content_type, body).await;

            let mut response = Response::new(Body::from(body));
            *response.status_mut() = status;
            Ok(response)
        }
        // Return the 404 Not Found for other routes.
        _ => {
            let mut not_found = Response::default();
            *not_found.status_mut() = StatusCode::NOT_FOUND;
            Ok(not_found)
        }
    }
}

/// answers every offer with a webrtc-rs peer connection, kept alive in `peers`
pub fn answering_responder(
    peers: Arc<tokio::sync::Mutex<Vec<Arc<RTCPeerConnection>>>>,
) -> Responder {
    Arc::new(move |_content_type, body| {
        let peers = Arc::clone(&peers);
        Box::pin(async move {
            match answer_offer(&body).await {
                Ok((answer, peer_connection)) => {
                    peers.lock().await.push(peer_connection);
                    (StatusCode::OK, answer)
                }
                Err(err) => {
                    error!("answer_offer: {}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                }
            }
        })
    })
}

async fn answer_offer(body: &[u8]) -> anyhow::Result<(String, Arc<RTCPeerConnection>)> {
    let offer: OfferRequest = serde_json::from_slice(body)?;

    let mut media_engine = MediaEngine::default();
    media_engine.register_default_codecs()?;
    let mut registry = Registry::new();
    registry = register_default_interceptors(registry, &mut media_engine)?;
    let api = APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build();
    let peer_connection = Arc::new(api.new_peer_connection(RTCConfiguration::default()).await?);

    peer_connection
        .set_remote_description(RTCSessionDescription::offer(offer.sdp)?)
        .await?;
    let answer = peer_connection.create_answer(None).await?;
    let mut gather_complete = peer_connection.gathering_complete_promise().await;
    peer_connection.set_local_description(answer).await?;
    let _ = tokio::time::timeout(Duration::from_secs(10), gather_complete.recv()).await;

    let local = peer_connection
        .local_description()
        .await
        .ok_or_else(|| anyhow::anyhow!("answer has no local description"))?;
    let answer = SessionDescription::from(local);
    Ok((serde_json::to_string(&answer)?, peer_connection))
}

/// a responder with a fixed reply that hands every request to `requests`
pub fn static_responder(
    status: StatusCode,
    body: &'static str,
    requests: tokio::sync::mpsc::UnboundedSender<(Option<String>, Bytes)>,
) -> Responder {
    Arc::new(move |content_type, request| {
        let _ = requests.send((content_type, request));
        Box::pin(async move { (status, body.to_owned()) })
    })
}

/// a responder that never answers within the test
pub fn stalled_responder() -> Responder {
    Arc::new(|_, _| {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            (StatusCode::OK, String::new())
        })
    })
}
