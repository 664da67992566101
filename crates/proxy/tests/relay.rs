//! Session-level tests for the duplex relay over in-memory connections.

use std::time::Duration;

use async_trait::async_trait;
use lambda_inspector_proxy::memory::{
    pair, pair_with_capacity, MemoryConnector, MemorySink, MemoryTransport,
};
use lambda_inspector_proxy::{
    relay, Direction, DuplexProxy, DuplexTransport, Frame, FrameSource, ProxyError, TransportError,
};
use tokio::time::timeout;
use url::Url;

const BOUND: Duration = Duration::from_secs(5);

/// Client end, proxy-side inbound end, proxy-side outbound end, upstream end.
fn session_ends() -> (MemoryTransport, MemoryTransport, MemoryTransport, MemoryTransport) {
    let (client, inbound) = pair();
    let (outbound, upstream) = pair();
    (client, inbound, outbound, upstream)
}

#[tokio::test]
async fn frames_keep_order_in_both_directions() {
    let (mut client, inbound, outbound, mut upstream) = session_ends();
    let session = tokio::spawn(relay(inbound, outbound));

    // Interleaved so neither direction outgrows its channel buffers.
    for i in 0..100 {
        client.send(format!("up-{i}")).await.unwrap();
        upstream.send(format!("down-{i}")).await.unwrap();
        assert_eq!(
            upstream.recv().await.unwrap(),
            Some(Frame::Text(format!("up-{i}")))
        );
        assert_eq!(
            client.recv().await.unwrap(),
            Some(Frame::Text(format!("down-{i}")))
        );
    }

    client.close();
    let report = timeout(BOUND, session).await.unwrap().unwrap();
    assert_eq!(report.inbound_to_outbound, 100);
    assert_eq!(report.outbound_to_inbound, 100);
}

#[tokio::test]
async fn binary_frames_are_relayed_verbatim() {
    let (mut client, inbound, outbound, mut upstream) = session_ends();
    let session = tokio::spawn(relay(inbound, outbound));

    let payload: Vec<u8> = (0..=255).collect();
    client.send(payload.clone()).await.unwrap();
    assert_eq!(upstream.recv().await.unwrap(), Some(Frame::Binary(payload)));

    upstream.close();
    timeout(BOUND, session).await.unwrap().unwrap();
}

#[tokio::test]
async fn inbound_close_closes_outbound_once() {
    let (client, inbound, outbound, mut upstream) = session_ends();
    let (inbound_probe, outbound_probe) = (inbound.probe(), outbound.probe());
    let session = tokio::spawn(relay(inbound, outbound));

    client.close();

    let report = timeout(BOUND, session).await.unwrap().unwrap();
    assert_eq!(report.initiator, Direction::InboundToOutbound);
    assert_eq!(inbound_probe.close_calls(), 1);
    assert_eq!(outbound_probe.close_calls(), 1);
    assert_eq!(timeout(BOUND, upstream.recv()).await.unwrap().unwrap(), None);
}

#[tokio::test]
async fn upstream_close_closes_inbound_once() {
    let (mut client, inbound, outbound, upstream) = session_ends();
    let (inbound_probe, outbound_probe) = (inbound.probe(), outbound.probe());
    let session = tokio::spawn(relay(inbound, outbound));

    upstream.close();

    let report = timeout(BOUND, session).await.unwrap().unwrap();
    assert_eq!(report.initiator, Direction::OutboundToInbound);
    assert_eq!(inbound_probe.close_calls(), 1);
    assert_eq!(outbound_probe.close_calls(), 1);
    assert_eq!(timeout(BOUND, client.recv()).await.unwrap().unwrap(), None);
}

#[tokio::test]
async fn simultaneous_close_still_closes_each_side_once() {
    for _ in 0..50 {
        let (client, inbound, outbound, upstream) = session_ends();
        let (inbound_probe, outbound_probe) = (inbound.probe(), outbound.probe());
        let session = tokio::spawn(relay(inbound, outbound));

        let a = tokio::spawn(async move { client.close() });
        let b = tokio::spawn(async move { upstream.close() });
        a.await.unwrap();
        b.await.unwrap();

        timeout(BOUND, session).await.unwrap().unwrap();
        assert_eq!(inbound_probe.close_calls(), 1);
        assert_eq!(outbound_probe.close_calls(), 1);
    }
}

#[tokio::test]
async fn parked_send_fails_when_upstream_goes_away() {
    // Upstream never reads; once its one-frame buffer is full the
    // inbound->outbound direction is parked in send until upstream closes.
    let (mut client, inbound) = pair();
    let (outbound, upstream) = pair_with_capacity(1);
    let (inbound_probe, outbound_probe) = (inbound.probe(), outbound.probe());
    let session = tokio::spawn(relay(inbound, outbound));

    for i in 0..4 {
        client.send(format!("{i}")).await.unwrap();
    }
    tokio::task::yield_now().await;
    upstream.close();

    timeout(BOUND, session).await.unwrap().unwrap();
    assert_eq!(inbound_probe.close_calls(), 1);
    assert_eq!(outbound_probe.close_calls(), 1);
}

#[tokio::test]
async fn echo_of_a_thousand_messages_arrives_in_order() {
    let (connector, mut listener) = MemoryConnector::new();
    let proxy = DuplexProxy::new(Url::parse("ws://ui-backend:8501/").unwrap(), connector);

    // Upstream: echo every frame until the connection closes.
    let upstream_task = tokio::spawn(async move {
        let (url, mut upstream) = listener.accept().await.expect("upstream connection");
        let probe = upstream.probe();
        while let Ok(Some(frame)) = upstream.recv().await {
            if upstream.send(frame).await.is_err() {
                break;
            }
        }
        (url, probe)
    });

    let (mut client, inbound) = pair();
    let inbound_probe = inbound.probe();
    let session = tokio::spawn(async move { proxy.handle(inbound, "_stcore/stream").await });

    for i in 0..1000 {
        client.send(format!("msg-{i}")).await.unwrap();
        assert_eq!(
            timeout(BOUND, client.recv()).await.unwrap().unwrap(),
            Some(Frame::Text(format!("msg-{i}")))
        );
    }
    client.close();

    let report = timeout(BOUND, session).await.unwrap().unwrap().unwrap();
    assert_eq!(report.inbound_to_outbound, 1000);
    assert_eq!(report.outbound_to_inbound, 1000);
    assert_eq!(report.initiator, Direction::InboundToOutbound);
    assert_eq!(inbound_probe.close_calls(), 1);

    let (url, upstream_probe) = timeout(BOUND, upstream_task).await.unwrap().unwrap();
    assert_eq!(url.as_str(), "ws://ui-backend:8501/_stcore/stream");
    assert!(upstream_probe.is_closed());
}

#[tokio::test]
async fn unreachable_upstream_rejects_inbound_without_relaying() {
    let (connector, listener) = MemoryConnector::new();
    drop(listener);
    let proxy = DuplexProxy::new(Url::parse("ws://ui-backend:8501/").unwrap(), connector);

    let (mut client, inbound) = pair();
    let inbound_probe = inbound.probe();

    let err = proxy.handle(inbound, "stream").await.unwrap_err();
    assert!(matches!(err, ProxyError::Connect { .. }));
    assert!(err.to_string().contains("ws://ui-backend:8501/stream"));
    assert_eq!(inbound_probe.close_calls(), 1);
    assert_eq!(client.recv().await.unwrap(), None);
}

#[tokio::test]
async fn escaping_path_is_rejected_before_connecting() {
    let (connector, mut listener) = MemoryConnector::new();
    let proxy = DuplexProxy::new(Url::parse("ws://ui-backend:8501/").unwrap(), connector);
    let (_client, inbound) = pair();

    let err = proxy.handle(inbound, "//elsewhere:9000/x").await.unwrap_err();
    assert!(matches!(err, ProxyError::InvalidPath { .. }));

    drop(proxy);
    assert!(listener.accept().await.is_none());
}

/// A connection whose receiving half panics on first use.
struct FaultyInbound {
    sink: MemorySink,
}

struct PanickingSource;

#[async_trait]
impl FrameSource for PanickingSource {
    async fn recv(&mut self) -> Result<Option<Frame>, TransportError> {
        panic!("source blew up");
    }
}

impl DuplexTransport for FaultyInbound {
    type Sink = MemorySink;
    type Source = PanickingSource;

    fn split(self) -> (MemorySink, PanickingSource) {
        (self.sink, PanickingSource)
    }
}

#[tokio::test]
async fn panicking_direction_still_tears_down_both_sides() {
    let (mut client, inbound_end) = pair();
    let inbound_probe = inbound_end.probe();
    let (inbound_sink, _inbound_source) = inbound_end.split();
    let (outbound, mut upstream) = pair();
    let outbound_probe = outbound.probe();

    let report = timeout(BOUND, relay(FaultyInbound { sink: inbound_sink }, outbound))
        .await
        .expect("relay finished after a direction panicked");

    assert_eq!(report.initiator, Direction::InboundToOutbound);
    assert_eq!(report.inbound_to_outbound, 0);
    assert_eq!(outbound_probe.close_calls(), 1);
    assert_eq!(inbound_probe.close_calls(), 1);
    assert_eq!(timeout(BOUND, upstream.recv()).await.unwrap().unwrap(), None);
    assert_eq!(timeout(BOUND, client.recv()).await.unwrap().unwrap(), None);
}
