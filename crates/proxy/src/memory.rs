//! In-process duplex connections over bounded channels.
//!
//! Closing either end closes the whole connection: pending frames already
//! queued are still delivered, after which both ends read end-of-stream and
//! sends fail. Every end counts how many times it was closed, which makes
//! the relay's exactly-once teardown observable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use url::Url;

use crate::transport::{Connector, DuplexTransport, Frame, FrameSink, FrameSource, TransportError};

/// Frames buffered per direction by [`pair`].
pub const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug)]
struct Link {
    closed: watch::Sender<bool>,
    close_calls: [AtomicUsize; 2],
}

impl Link {
    fn close(&self, end: usize) {
        self.close_calls[end].fetch_add(1, Ordering::SeqCst);
        self.closed.send_replace(true);
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// One end of an in-memory connection.
#[derive(Debug)]
pub struct MemoryTransport {
    outgoing: mpsc::Sender<Frame>,
    incoming: mpsc::Receiver<Frame>,
    link: Arc<Link>,
    end: usize,
}

/// Observes an end after it has been moved into a session.
#[derive(Debug, Clone)]
pub struct MemoryProbe {
    link: Arc<Link>,
    end: usize,
}

impl MemoryProbe {
    /// How many times this end was closed.
    pub fn close_calls(&self) -> usize {
        self.link.close_calls[self.end].load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.link.is_closed()
    }

    /// Resolve once the connection is closed from either end.
    pub async fn closed(&self) {
        let mut rx = self.link.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

/// Two connected ends with [`DEFAULT_CAPACITY`] frames of buffering each way.
pub fn pair() -> (MemoryTransport, MemoryTransport) {
    pair_with_capacity(DEFAULT_CAPACITY)
}

pub fn pair_with_capacity(capacity: usize) -> (MemoryTransport, MemoryTransport) {
    let (a_tx, b_rx) = mpsc::channel(capacity);
    let (b_tx, a_rx) = mpsc::channel(capacity);
    let link = Arc::new(Link {
        closed: watch::Sender::new(false),
        close_calls: [AtomicUsize::new(0), AtomicUsize::new(0)],
    });
    (
        MemoryTransport {
            outgoing: a_tx,
            incoming: a_rx,
            link: link.clone(),
            end: 0,
        },
        MemoryTransport {
            outgoing: b_tx,
            incoming: b_rx,
            link,
            end: 1,
        },
    )
}

impl MemoryTransport {
    pub fn probe(&self) -> MemoryProbe {
        MemoryProbe {
            link: self.link.clone(),
            end: self.end,
        }
    }

    pub async fn send(&mut self, frame: impl Into<Frame>) -> Result<(), TransportError> {
        send_on(&self.outgoing, &self.link, frame.into()).await
    }

    pub async fn recv(&mut self) -> Result<Option<Frame>, TransportError> {
        recv_on(&mut self.incoming, &self.link).await
    }

    pub fn close(&self) {
        self.link.close(self.end);
    }
}

async fn send_on(
    outgoing: &mpsc::Sender<Frame>,
    link: &Link,
    frame: Frame,
) -> Result<(), TransportError> {
    if link.is_closed() {
        return Err(TransportError::Closed);
    }
    let mut closed = link.closed.subscribe();
    tokio::select! {
        biased;
        _ = closed.wait_for(|closed| *closed) => Err(TransportError::Closed),
        sent = outgoing.send(frame) => sent.map_err(|_| TransportError::Closed),
    }
}

async fn recv_on(
    incoming: &mut mpsc::Receiver<Frame>,
    link: &Link,
) -> Result<Option<Frame>, TransportError> {
    let mut closed = link.closed.subscribe();
    tokio::select! {
        biased;
        frame = incoming.recv() => Ok(frame),
        _ = closed.wait_for(|closed| *closed) => Ok(None),
    }
}

pub struct MemorySink {
    outgoing: mpsc::Sender<Frame>,
    link: Arc<Link>,
    end: usize,
}

pub struct MemorySource {
    incoming: mpsc::Receiver<Frame>,
    link: Arc<Link>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        send_on(&self.outgoing, &self.link, frame).await
    }

    async fn close(self) -> Result<(), TransportError> {
        self.link.close(self.end);
        Ok(())
    }
}

#[async_trait]
impl FrameSource for MemorySource {
    async fn recv(&mut self) -> Result<Option<Frame>, TransportError> {
        recv_on(&mut self.incoming, &self.link).await
    }
}

impl DuplexTransport for MemoryTransport {
    type Sink = MemorySink;
    type Source = MemorySource;

    fn split(self) -> (MemorySink, MemorySource) {
        (
            MemorySink {
                outgoing: self.outgoing,
                link: self.link.clone(),
                end: self.end,
            },
            MemorySource {
                incoming: self.incoming,
                link: self.link,
            },
        )
    }
}

/// A [`Connector`] that hands the far end of every new connection to a
/// [`MemoryListener`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    accepted: mpsc::UnboundedSender<(Url, MemoryTransport)>,
}

/// Receives the upstream ends opened by a [`MemoryConnector`].
#[derive(Debug)]
pub struct MemoryListener {
    accepted: mpsc::UnboundedReceiver<(Url, MemoryTransport)>,
}

impl MemoryConnector {
    pub fn new() -> (Self, MemoryListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { accepted: tx }, MemoryListener { accepted: rx })
    }
}

impl MemoryListener {
    pub async fn accept(&mut self) -> Option<(Url, MemoryTransport)> {
        self.accepted.recv().await
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    /// Fails with "connection refused" once the listener is dropped.
    async fn connect(&self, url: &Url) -> Result<MemoryTransport, TransportError> {
        let (near, far) = pair();
        self.accepted.send((url.clone(), far)).map_err(|_| {
            TransportError::other(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("nothing listening at {url}"),
            ))
        })?;
        Ok(near)
    }
}
