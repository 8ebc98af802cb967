use crate::error::{Error, Result};
use crate::transport::{GatheringState, PeerTransport};
use log::{debug, trace};
use std::time::Duration;
use tokio::sync::oneshot;

/// Removes the gathering state handler when dropped, so the wait unsubscribes
/// on completion, on timeout, and when the waiting future itself is dropped.
struct Subscription<'a> {
    transport: &'a dyn PeerTransport,
}

impl<'a> Subscription<'a> {
    fn register(transport: &'a dyn PeerTransport, done_tx: oneshot::Sender<Result<()>>) -> Self {
        let mut done_tx = Some(done_tx);
        transport.on_gathering_state_change(Some(Box::new(move |state: GatheringState| {
            trace!("ICE gathering state changed to {}", state);
            let outcome = match state {
                GatheringState::Complete => Ok(()),
                GatheringState::Closed => Err(Error::ErrGatheringAborted),
                _ => return,
            };
            if let Some(done_tx) = done_tx.take() {
                let _ = done_tx.send(outcome);
            }
        })));
        Self { transport }
    }
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        self.transport.on_gathering_state_change(None);
    }
}

/// Waits until ICE candidate gathering on `transport` reaches `complete`.
///
/// Returns immediately, without subscribing, when gathering is already complete.
/// Otherwise exactly one state-change subscription is held until the first
/// `complete` is observed or `wait` elapses. A gatherer that closes first
/// fails the wait with `ErrGatheringAborted`.
pub async fn wait_for_gathering_complete(
    transport: &dyn PeerTransport,
    wait: Option<Duration>,
) -> Result<()> {
    match transport.ice_gathering_state() {
        GatheringState::Complete => {
            debug!("ICE gathering already complete");
            return Ok(());
        }
        GatheringState::Closed => return Err(Error::ErrGatheringAborted),
        _ => {}
    }

    let (done_tx, done_rx) = oneshot::channel();
    let _subscription = Subscription::register(transport, done_tx);

    // gathering may have finished between the first check and the registration
    if transport.ice_gathering_state() == GatheringState::Complete {
        debug!("ICE gathering completed while subscribing");
        return Ok(());
    }

    let done = match wait {
        Some(wait) => tokio::time::timeout(wait, done_rx)
            .await
            .map_err(|_| Error::ErrGatheringTimeout)?,
        None => done_rx.await,
    };
    done.map_err(|_| Error::ErrGatheringAborted)??;

    debug!("ICE gathering complete");
    Ok(())
}
