//! WebSocket client transport for the upstream side, built on
//! `tokio-tungstenite`.
//!
//! Text and binary messages map to [`Frame`]s. A close message reads as
//! end-of-stream. Ping and pong are answered by tungstenite and are not
//! surfaced.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::transport::{Connector, DuplexTransport, Frame, FrameSink, FrameSource, TransportError};

type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens upstream connections with a WebSocket handshake.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

/// An established upstream WebSocket connection.
pub struct WebSocketTransport {
    stream: ClientStream,
}

pub struct WebSocketSink {
    sink: SplitSink<ClientStream, Message>,
}

pub struct WebSocketSource {
    stream: SplitStream<ClientStream>,
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, url: &Url) -> Result<WebSocketTransport, TransportError> {
        let (stream, response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(TransportError::other)?;
        tracing::debug!(%url, status = %response.status(), "upstream handshake complete");
        Ok(WebSocketTransport { stream })
    }
}

impl DuplexTransport for WebSocketTransport {
    type Sink = WebSocketSink;
    type Source = WebSocketSource;

    fn split(self) -> (WebSocketSink, WebSocketSource) {
        let (sink, stream) = self.stream.split();
        (WebSocketSink { sink }, WebSocketSource { stream })
    }
}

#[async_trait]
impl FrameSink for WebSocketSink {
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
impl FrameSource for WebSocketSource {
    async fn recv(&mut self) -> Result<Option<Frame>, TransportError> {
        loop {
            match self.stream.next().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(TransportError::other(e)),
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(message)) => {
                    if let Some(frame) = message_to_frame(message) {
                        return Ok(Some(frame));
                    }
                }
            }
        }
    }
}

fn frame_to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::text(text),
        Frame::Binary(bytes) => Message::binary(bytes),
    }
}

fn message_to_frame(message: Message) -> Option<Frame> {
    match message {
        Message::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
        Message::Binary(bytes) => Some(Frame::Binary(bytes.to_vec())),
        Message::Close(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_messages_map_to_frames() {
        assert_eq!(
            message_to_frame(Message::text("hi".to_string())),
            Some(Frame::Text("hi".to_string()))
        );
        assert_eq!(
            message_to_frame(Message::binary(vec![7u8, 8])),
            Some(Frame::Binary(vec![7, 8]))
        );
    }

    #[test]
    fn control_messages_are_not_relayed() {
        assert_eq!(message_to_frame(Message::Ping(vec![1u8].into())), None);
        assert_eq!(message_to_frame(Message::Pong(Vec::<u8>::new().into())), None);
        assert_eq!(message_to_frame(Message::Close(None)), None);
    }

    #[test]
    fn frames_map_back_to_messages() {
        assert_eq!(
            frame_to_message(Frame::Text("x".to_string())),
            Message::text("x".to_string())
        );
        assert_eq!(
            frame_to_message(Frame::Binary(vec![0])),
            Message::binary(vec![0u8])
        );
    }
}
