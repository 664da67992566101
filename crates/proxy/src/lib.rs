//! lambda-inspector-proxy: relays a live duplex message stream between an
//! inbound client connection and an upstream connection the proxy opens.
//!
//! - [`DuplexProxy`] -- resolves the upstream URL, connects, and runs a session
//! - [`relay()`] -- the two-direction relay with exactly-once teardown
//! - [`transport`] -- the sink/source seam both sides are adapted to
//! - [`websocket`] -- `tokio-tungstenite` client transport for the upstream
//! - [`memory`] -- in-process connections, used to test sessions

pub mod memory;
mod proxy;
mod relay;
pub mod transport;
pub mod websocket;

pub use proxy::{release, DuplexProxy, ProxyError};
pub use relay::{relay, Direction, SessionReport, Termination};
pub use transport::{Connector, DuplexTransport, Frame, FrameSink, FrameSource, TransportError};
pub use websocket::{WebSocketConnector, WebSocketTransport};
