use std::future::Future;

use bytes::Bytes;
use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{Result, TransportError};
use crate::event::TransportEvent;
use crate::traits::{FrameSink, Transport, EVENT_BUFFER};

/// WebSocket close code meaning "no status received" (RFC 6455 §7.4.1).
const CLOSE_NO_STATUS: u16 = 1005;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production transport over `tokio-tungstenite`.
///
/// Each successful dial spawns a read task that forwards binary frames and
/// close/error notifications onto the event channel. Ping/pong is answered
/// by tungstenite itself; text frames are not part of this protocol and are
/// dropped with a debug log.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsTransport;

/// Write half of a live WebSocket connection.
#[derive(Debug)]
pub struct WsSink {
    inner: SplitSink<WsStream, WsMessage>,
}

impl Transport for WsTransport {
    type Sink = WsSink;

    fn connect(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<(Self::Sink, mpsc::Receiver<TransportEvent>)>> + Send {
        let url = url.to_string();
        async move {
            let (stream, _response) =
                connect_async(&url)
                    .await
                    .map_err(|err| TransportError::Connect {
                        url: url.clone(),
                        source: Box::new(err),
                    })?;
            tracing::debug!(%url, "websocket established");

            let (sink, read) = stream.split();
            let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
            tokio::spawn(read_loop(read, event_tx));

            Ok((WsSink { inner: sink }, event_rx))
        }
    }
}

async fn read_loop(
    mut read: futures_util::stream::SplitStream<WsStream>,
    events: mpsc::Sender<TransportEvent>,
) {
    while let Some(item) = read.next().await {
        let event = match item {
            Ok(WsMessage::Binary(data)) => TransportEvent::Frame(data),
            Ok(WsMessage::Close(frame)) => {
                let (code, reason) = frame
                    .map(|f| (u16::from(f.code), f.reason.to_string()))
                    .unwrap_or((CLOSE_NO_STATUS, String::new()));
                let _ = events.send(TransportEvent::Closed { code, reason }).await;
                return;
            }
            Ok(WsMessage::Text(text)) => {
                tracing::debug!(len = text.len(), "ignoring unexpected text frame");
                continue;
            }
            Ok(_) => continue, // ping/pong/raw frames
            Err(err) => {
                let _ = events
                    .send(TransportEvent::Error(TransportError::Read(Box::new(err))))
                    .await;
                return;
            }
        };
        if events.send(event).await.is_err() {
            // Receiver gone: the connection manager dropped this link.
            return;
        }
    }
    // EOF without a close frame.
    let _ = events
        .send(TransportEvent::Closed {
            code: CLOSE_NO_STATUS,
            reason: String::new(),
        })
        .await;
}

impl FrameSink for WsSink {
    fn send(&mut self, frame: Bytes) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.inner
                .send(WsMessage::Binary(frame))
                .await
                .map_err(|err| TransportError::Send(Box::new(err)))
        }
    }

    fn close(&mut self) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.inner
                .close()
                .await
                .map_err(|err| TransportError::Send(Box::new(err)))
        }
    }
}
