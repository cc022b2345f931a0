use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use cclink_transport::{FrameSink, Transport, TransportError, TransportEvent, WsTransport};

/// Local echo server: binary frames come straight back, everything else is
/// answered by tungstenite's own protocol handling.
async fn spawn_echo_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        // Greet with a text frame the client must ignore.
        ws.send(WsMessage::Text("hello".into())).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            match msg {
                WsMessage::Binary(data) => ws.send(WsMessage::Binary(data)).await.unwrap(),
                // Keep polling after a Close frame so tungstenite flushes the
                // close-handshake reply; the stream ends once the handshake
                // completes.
                _ => {}
            }
        }
    });
    format!("ws://{addr}")
}

#[tokio::test]
async fn binary_frames_roundtrip_and_text_is_ignored() {
    let url = spawn_echo_server().await;
    let (mut sink, mut events) = WsTransport.connect(&url).await.unwrap();

    sink.send(Bytes::from_static(&[0x01, 0x02, 0x03]))
        .await
        .unwrap();

    // The first event must be the echoed binary frame, not the greeting text.
    match events.recv().await.unwrap() {
        TransportEvent::Frame(data) => assert_eq!(data.as_ref(), &[0x01, 0x02, 0x03]),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn orderly_close_is_reported() {
    let url = spawn_echo_server().await;
    let (mut sink, mut events) = WsTransport.connect(&url).await.unwrap();

    sink.close().await.unwrap();

    loop {
        match events.recv().await {
            Some(TransportEvent::Closed { .. }) | None => break,
            Some(TransportEvent::Frame(_)) => continue,
            Some(TransportEvent::Error(err)) => panic!("unexpected error: {err}"),
        }
    }
}

#[tokio::test]
async fn connect_refused_is_a_connect_error() {
    // Nothing listens on the discard port.
    let err = WsTransport.connect("ws://127.0.0.1:1").await.unwrap_err();
    assert!(matches!(err, TransportError::Connect { .. }));
}
