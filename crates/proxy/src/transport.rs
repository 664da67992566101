//! The message-stream seam the relay is written against.
//!
//! A duplex connection is split into a [`FrameSink`] and a [`FrameSource`]
//! so that each relay direction can own exactly the halves it uses.

use async_trait::async_trait;
use url::Url;

/// One application message. Relayed opaquely, never inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl From<&str> for Frame {
    fn from(text: &str) -> Self {
        Frame::Text(text.to_owned())
    }
}

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Frame::Text(text)
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Frame::Binary(bytes)
    }
}

/// Errors raised by a transport half.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection is already closed.
    #[error("connection closed")]
    Closed,

    /// Any other transport failure (I/O, protocol violation, handshake).
    #[error("transport error: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        TransportError::Other(err.into())
    }
}

/// The receiving half of a duplex connection.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Receive the next data frame.
    ///
    /// Returns `Ok(None)` once the peer has closed the connection. Must be
    /// cancel-safe: dropping the returned future before it completes must not
    /// lose a frame.
    async fn recv(&mut self) -> Result<Option<Frame>, TransportError>;
}

/// The sending half of a duplex connection. Closing consumes it, so a half
/// can be closed at most once.
#[async_trait]
pub trait FrameSink: Send + Sized + 'static {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Close the connection this half belongs to.
    async fn close(self) -> Result<(), TransportError>;
}

/// A full-duplex message connection.
pub trait DuplexTransport: Send + 'static {
    type Sink: FrameSink;
    type Source: FrameSource;

    fn split(self) -> (Self::Sink, Self::Source);
}

/// Opens outbound duplex connections.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: DuplexTransport;

    async fn connect(&self, url: &Url) -> Result<Self::Transport, TransportError>;
}
