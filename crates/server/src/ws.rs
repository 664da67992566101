//! WebSocket proxy route and the axum side of the relay transport.
//!
//! The upstream connection is opened before the client's upgrade is
//! accepted, so an unreachable upstream turns into a plain HTTP error and
//! the client never gets a half-working socket.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use lambda_inspector_proxy::{
    release, DuplexTransport, Frame, FrameSink, FrameSource, ProxyError, TransportError,
};

use super::json_error;
use super::state::AppState;

/// GET /ws/{*path}
pub(crate) async fn handle_ws_proxy(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Response {
    proxy_upgrade(ws, state, path).await
}

/// GET /ws
pub(crate) async fn handle_ws_proxy_root(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    proxy_upgrade(ws, state, String::new()).await
}

async fn proxy_upgrade(ws: WebSocketUpgrade, state: Arc<AppState>, path: String) -> Response {
    let outbound = match state.proxy.connect(&path).await {
        Ok(outbound) => outbound,
        Err(e @ ProxyError::InvalidPath { .. }) => {
            return json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response()
        }
        Err(e) => {
            tracing::warn!(%path, error = %e, "rejecting websocket session");
            return json_error(StatusCode::BAD_GATEWAY, &e.to_string()).into_response();
        }
    };

    let pending = PendingUpstream::new(outbound);
    let on_failure = pending.clone();
    ws.on_failed_upgrade(move |e| {
        tracing::debug!(error = %e, "websocket upgrade failed");
        on_failure.discard();
    })
    .on_upgrade(move |socket| async move {
        let Some(outbound) = pending.take() else {
            return;
        };
        state
            .proxy
            .session(InboundSocket { socket }, outbound, &path)
            .await;
    })
}

/// An upstream connection opened before the client's upgrade completed.
///
/// Exactly one of the upgrade outcomes takes it: a successful upgrade
/// relays it, a failed one closes it.
pub(crate) struct PendingUpstream<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for PendingUpstream<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T: DuplexTransport> PendingUpstream<T> {
    pub(crate) fn new(connection: T) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(connection))),
        }
    }

    pub(crate) fn take(&self) -> Option<T> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Close the connection in the background if nothing has taken it.
    pub(crate) fn discard(&self) {
        if let Some(connection) = self.take() {
            tokio::spawn(release(connection));
        }
    }
}

/// A client WebSocket accepted by axum.
pub(crate) struct InboundSocket {
    socket: WebSocket,
}

pub(crate) struct InboundSink {
    sink: SplitSink<WebSocket, Message>,
}

pub(crate) struct InboundSource {
    stream: SplitStream<WebSocket>,
}

impl DuplexTransport for InboundSocket {
    type Sink = InboundSink;
    type Source = InboundSource;

    fn split(self) -> (InboundSink, InboundSource) {
        let (sink, stream) = self.socket.split();
        (InboundSink { sink }, InboundSource { stream })
    }
}

#[async_trait]
impl FrameSink for InboundSink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.sink
            .send(frame_to_message(frame))
            .await
            .map_err(TransportError::other)
    }

    async fn close(mut self) -> Result<(), TransportError> {
        self.sink.close().await.map_err(TransportError::other)
    }
}

#[async_trait]
impl FrameSource for InboundSource {
    async fn recv(&mut self) -> Result<Option<Frame>, TransportError> {
        loop {
            match self.stream.next().await {
                None | Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Err(e)) => return Err(TransportError::other(e)),
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(Frame::Text(text.as_str().to_owned())))
                }
                Some(Ok(Message::Binary(bytes))) => {
                    return Ok(Some(Frame::Binary(bytes.to_vec())))
                }
                // axum answers pings itself.
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            }
        }
    }
}

fn frame_to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(bytes) => Message::Binary(bytes.into()),
    }
}
