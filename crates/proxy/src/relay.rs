//! The duplex relay: two concurrently running copy loops over a pair of
//! connections, one shared termination signal, and a single teardown.
//!
//! Session lifecycle:
//!
//! 1. RELAYING -- each direction runs as its own tokio task, receiving one
//!    frame and sending it on before receiving the next.
//! 2. CLOSING -- the first direction to hit end-of-stream or an error trips
//!    the [`Termination`] signal. The other direction stops at its next await
//!    point. The coordinator joins both tasks.
//! 3. CLOSED -- the coordinator, now the sole owner of both sending halves,
//!    closes each connection once. Close errors are discarded.
//!
//! A direction that panics trips the signal while unwinding and still hands
//! its halves back, so teardown is the same as for a transport error.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;

use crate::transport::{DuplexTransport, FrameSink, FrameSource};

/// Which way frames flow in a relay direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client connection to upstream connection.
    InboundToOutbound,
    /// Upstream connection to client connection.
    OutboundToInbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::InboundToOutbound => f.write_str("inbound->outbound"),
            Direction::OutboundToInbound => f.write_str("outbound->inbound"),
        }
    }
}

/// One-shot stop flag shared by both relay directions.
///
/// Setting it is idempotent; [`trigger`](Self::trigger) reports whether the
/// caller was the one that set it.
#[derive(Debug)]
pub struct Termination {
    stopped: watch::Sender<bool>,
}

impl Default for Termination {
    fn default() -> Self {
        Self::new()
    }
}

impl Termination {
    pub fn new() -> Self {
        Self {
            stopped: watch::Sender::new(false),
        }
    }

    /// Set the signal. Returns `true` only for the first caller.
    pub fn trigger(&self) -> bool {
        self.stopped.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        })
    }

    pub fn is_triggered(&self) -> bool {
        *self.stopped.borrow()
    }

    /// Resolve once the signal is set. Cancel-safe.
    pub async fn wait(&self) {
        let mut rx = self.stopped.subscribe();
        // The sender lives in `self`, so `wait_for` cannot observe it dropped.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    /// Frames delivered from the client to upstream.
    pub inbound_to_outbound: u64,
    /// Frames delivered from upstream to the client.
    pub outbound_to_inbound: u64,
    /// The direction whose failure or end-of-stream ended the session.
    pub initiator: Direction,
}

/// What a relay direction hands back to the coordinator when it exits.
struct DirectionOutcome<S, K> {
    // Held until teardown so the receiving half is released only after close.
    _source: S,
    sink: K,
    frames: u64,
    initiated: bool,
}

/// Sets the termination signal when dropped, so a direction that unwinds
/// still stops the session.
struct TripOnExit {
    termination: Option<Arc<Termination>>,
}

impl TripOnExit {
    fn new(termination: Arc<Termination>) -> Self {
        Self {
            termination: Some(termination),
        }
    }

    /// Set the signal now. Returns `true` if this direction set it first.
    fn trip(mut self) -> bool {
        self.termination
            .take()
            .map(|termination| termination.trigger())
            .unwrap_or(false)
    }
}

impl Drop for TripOnExit {
    fn drop(&mut self) {
        if let Some(termination) = self.termination.take() {
            termination.trigger();
        }
    }
}

/// Relay frames between `inbound` and `outbound` until either side ends,
/// then close both.
///
/// Returns after both relay tasks have exited and both connections have been
/// closed exactly once. Transport errors end the session and are not
/// reported; they are part of normal session termination. A direction that
/// panics ends the session the same way.
pub async fn relay<A, B>(inbound: A, outbound: B) -> SessionReport
where
    A: DuplexTransport,
    B: DuplexTransport,
{
    let termination = Arc::new(Termination::new());

    let (inbound_sink, inbound_source) = inbound.split();
    let (outbound_sink, outbound_source) = outbound.split();

    let upstream = tokio::spawn(pipe(
        Direction::InboundToOutbound,
        inbound_source,
        outbound_sink,
        termination.clone(),
    ));
    let downstream = tokio::spawn(pipe(
        Direction::OutboundToInbound,
        outbound_source,
        inbound_sink,
        termination.clone(),
    ));

    termination.wait().await;

    let mut report = SessionReport {
        inbound_to_outbound: 0,
        outbound_to_inbound: 0,
        initiator: Direction::InboundToOutbound,
    };

    match upstream.await {
        Ok(outcome) => {
            report.inbound_to_outbound = outcome.frames;
            if outcome.initiated {
                report.initiator = Direction::InboundToOutbound;
            }
            close_quietly("outbound", outcome.sink).await;
        }
        Err(e) => tracing::warn!(error = %e, "inbound->outbound relay task failed"),
    }

    match downstream.await {
        Ok(outcome) => {
            report.outbound_to_inbound = outcome.frames;
            if outcome.initiated {
                report.initiator = Direction::OutboundToInbound;
            }
            close_quietly("inbound", outcome.sink).await;
        }
        Err(e) => tracing::warn!(error = %e, "outbound->inbound relay task failed"),
    }

    report
}

/// One relay direction. The copy loop only borrows the halves, so they come
/// back to the coordinator even if a transport call panics.
async fn pipe<S, K>(
    direction: Direction,
    mut source: S,
    mut sink: K,
    termination: Arc<Termination>,
) -> DirectionOutcome<S, K>
where
    S: FrameSource,
    K: FrameSink,
{
    let trip = TripOnExit::new(termination.clone());
    let mut frames = 0u64;

    let copied = AssertUnwindSafe(copy_frames(
        direction,
        &mut source,
        &mut sink,
        &termination,
        &mut frames,
    ))
    .catch_unwind()
    .await;

    if copied.is_err() {
        tracing::warn!(%direction, "relay direction panicked");
    }
    let initiated = trip.trip();

    DirectionOutcome {
        _source: source,
        sink,
        frames,
        initiated,
    }
}

/// Forward frames from `source` to `sink` until the stream ends, a transport
/// call fails, or the session is terminated.
async fn copy_frames<S, K>(
    direction: Direction,
    source: &mut S,
    sink: &mut K,
    termination: &Termination,
    frames: &mut u64,
) where
    S: FrameSource,
    K: FrameSink,
{
    loop {
        let received = tokio::select! {
            biased;
            _ = termination.wait() => return,
            received = source.recv() => received,
        };

        let frame = match received {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!(%direction, "peer closed");
                return;
            }
            Err(e) => {
                tracing::debug!(%direction, error = %e, "receive failed");
                return;
            }
        };

        let sent = tokio::select! {
            biased;
            _ = termination.wait() => return,
            sent = sink.send(frame) => sent,
        };

        if let Err(e) = sent {
            tracing::debug!(%direction, error = %e, "send failed");
            return;
        }
        *frames += 1;
    }
}

async fn close_quietly<K: FrameSink>(side: &'static str, sink: K) {
    if let Err(e) = sink.close().await {
        tracing::debug!(side, error = %e, "close failed");
    }
}
