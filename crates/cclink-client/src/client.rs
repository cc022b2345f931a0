use std::sync::Arc;
use std::time::Duration;

use cclink_codec::{Message, RouteKey};
use cclink_transport::{Transport, WsTransport};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::middleware::{Middleware, MiddlewareFuture, Next};
use crate::worker::Worker;

/// Capacity of the command channel between handles and the worker.
const COMMAND_BUFFER: usize = 32;

/// Capacity of the lifecycle broadcast channel.
const LIFECYCLE_BUFFER: usize = 64;

/// Connection lifecycle notifications.
///
/// Delivered to every subscriber of [`CCLink::events`]. There is no polling
/// API: subscription is the only way to observe the lifecycle.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The transport is established.
    Connected,
    /// The remote closed the connection.
    Closed { code: u16, reason: String },
    /// The transport failed; auto-reconnect may follow.
    TransportError(String),
}

/// Outcome of a fire-and-forget send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The frame was written to the transport.
    Sent,
    /// No connection was up; the frame was discarded. The protocol has no
    /// outbound queue, so this is the contractual behavior — made explicit
    /// here instead of silent.
    Dropped,
}

pub(crate) enum Command {
    Connect,
    Close,
    Send {
        message: Message,
        reply: oneshot::Sender<Result<SendStatus>>,
    },
    Request {
        message: Message,
        timeout: Duration,
        responder: oneshot::Sender<Result<Arc<Message>>>,
        ack: oneshot::Sender<Result<SendStatus>>,
    },
    Subscribe {
        key: RouteKey,
        reply: oneshot::Sender<mpsc::UnboundedReceiver<Arc<Message>>>,
    },
}

/// Handle to one logical CCLink connection.
///
/// Cheap to clone; all clones talk to the same worker task. The worker shuts
/// down when the last handle is dropped.
#[derive(Clone)]
pub struct CCLink {
    commands: mpsc::Sender<Command>,
    lifecycle: broadcast::Sender<ClientEvent>,
    request_timeout: Duration,
}

impl CCLink {
    /// Start building a client.
    pub fn builder() -> CCLinkBuilder {
        CCLinkBuilder::new()
    }

    /// Open the connection. Idempotent: a no-op while a connection or dial
    /// attempt is already active.
    pub async fn connect(&self) -> Result<()> {
        self.command(Command::Connect).await
    }

    /// Request an orderly close of the current connection, if any.
    ///
    /// Does not disable a reconnect cycle started by an earlier transport
    /// error.
    pub async fn close(&self) -> Result<()> {
        self.command(Command::Close).await
    }

    /// Send a message without waiting for a response.
    ///
    /// Fails fast with [`ClientError::MissingIdentifiers`] unless both
    /// identifiers are nonzero. Returns [`SendStatus::Dropped`] when no
    /// connection is up.
    pub async fn send(&self, message: Message) -> Result<SendStatus> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Send { message, reply: tx }).await?;
        rx.await.map_err(|_| ClientError::WorkerGone)?
    }

    /// Send a message and await the first inbound message carrying the same
    /// route key, using the configured default timeout.
    pub async fn request(&self, message: Message) -> Result<Arc<Message>> {
        self.request_with_timeout(message, self.request_timeout)
            .await
    }

    /// Send a message and await its correlated response within `timeout`.
    ///
    /// The pending table keys on the route alone: a second request on the
    /// same key supersedes the first, which then fails with
    /// [`ClientError::Superseded`]. The deadline is tracked by the worker
    /// alongside the pending entry, so an expiring request can only ever
    /// remove its own entry.
    pub async fn request_with_timeout(
        &self,
        message: Message,
        timeout: Duration,
    ) -> Result<Arc<Message>> {
        let (responder, response) = oneshot::channel();
        let (ack_tx, ack_rx) = oneshot::channel();
        self.command(Command::Request {
            message,
            timeout,
            responder,
            ack: ack_tx,
        })
        .await?;
        // Validation happens in the worker; a dropped send still waits for
        // the window (the response may ride an existing server push).
        ack_rx.await.map_err(|_| ClientError::WorkerGone)??;

        match response.await {
            Ok(outcome) => outcome,
            Err(_replaced) => Err(ClientError::Superseded),
        }
    }

    /// Subscribe to every inbound message on a route key. Repeatable:
    /// multiple subscribers each receive every message.
    pub async fn subscribe(&self, key: RouteKey) -> Result<mpsc::UnboundedReceiver<Arc<Message>>> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Subscribe { key, reply: tx }).await?;
        rx.await.map_err(|_| ClientError::WorkerGone)
    }

    /// Subscribe to connection lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.lifecycle.subscribe()
    }

    async fn command(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::WorkerGone)
    }
}

/// Builder for [`CCLink`]: configuration plus the ordered middleware chain.
pub struct CCLinkBuilder {
    config: ClientConfig,
    middleware: Vec<Middleware>,
}

impl CCLinkBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            middleware: Vec::new(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a middleware stage. Stages run in registration order on every
    /// inbound message.
    pub fn middleware<F>(mut self, stage: F) -> Self
    where
        F: Fn(Arc<Message>, Next) -> MiddlewareFuture + Send + Sync + 'static,
    {
        self.middleware.push(Arc::new(stage));
        self
    }

    /// Spawn the worker over the production WebSocket transport.
    ///
    /// The returned handle is not yet connected; call
    /// [`CCLink::connect`] to dial.
    pub fn build(self) -> CCLink {
        self.build_with_transport(WsTransport)
    }

    /// Spawn the worker over a custom transport (used by tests to inject a
    /// scripted one).
    pub fn build_with_transport<T: Transport>(self, transport: T) -> CCLink {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (lifecycle_tx, _) = broadcast::channel(LIFECYCLE_BUFFER);
        let request_timeout = self.config.request_timeout;

        let worker = Worker::new(
            self.config,
            transport,
            Arc::from(self.middleware),
            command_rx,
            lifecycle_tx.clone(),
        );
        tokio::spawn(worker.run());

        CCLink {
            commands: command_tx,
            lifecycle: lifecycle_tx,
            request_timeout,
        }
    }
}

impl Default for CCLinkBuilder {
    fn default() -> Self {
        Self::new()
    }
}
