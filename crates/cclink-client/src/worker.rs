use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use cclink_codec::{decode_message, encode_message, FrameBody, Message, RouteKey};
use cclink_transport::{FrameSink, Transport, TransportError, TransportEvent};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval_at, sleep, sleep_until, Duration, Instant, Interval, Sleep};

use crate::client::{ClientEvent, Command, SendStatus};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::middleware::{self, Middleware};

/// Reserved route for keep-alive messages.
pub const HEARTBEAT_ROUTE: RouteKey = RouteKey::new(6144, 5);

/// Delay between entering the connected state and the first heartbeat.
const HEARTBEAT_GRACE: Duration = Duration::from_secs(1);

/// Capacity of the internal dial-outcome channel.
const DIAL_BUFFER: usize = 4;

enum ConnState<S> {
    Disconnected,
    Connecting,
    Connected { sink: S },
}

impl<S> ConnState<S> {
    fn name(&self) -> &'static str {
        match self {
            ConnState::Disconnected => "disconnected",
            ConnState::Connecting => "connecting",
            ConnState::Connected { .. } => "connected",
        }
    }
}

enum DialOutcome<S> {
    Connected {
        sink: S,
        events: mpsc::Receiver<TransportEvent>,
    },
    Failed(TransportError),
}

/// Heartbeat timer: off, waiting out the post-connect grace delay, or
/// beating at the configured interval. Replaced wholesale on every state
/// transition so a stale timer can never fire.
enum Heartbeat {
    Off,
    Grace(Pin<Box<Sleep>>),
    Beating(Interval),
}

impl Heartbeat {
    async fn due(&mut self) {
        match self {
            Heartbeat::Off => std::future::pending().await,
            Heartbeat::Grace(delay) => delay.as_mut().await,
            Heartbeat::Beating(interval) => {
                interval.tick().await;
            }
        }
    }
}

/// Reconnect timer plus the attempt counter it gates.
struct Reconnect {
    ticker: Option<Interval>,
    attempts: u32,
}

impl Reconnect {
    async fn due(&mut self) {
        match &mut self.ticker {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }
}

enum Tick<S> {
    Command(Option<Command>),
    Dial(DialOutcome<S>),
    Transport(Option<TransportEvent>),
    HeartbeatDue,
    ReconnectDue,
    RequestExpired,
}

/// One entry in the correlation table. The deadline lives next to the
/// responder, so expiry can only ever remove the entry it belongs to; a
/// request superseded by a newer one takes its deadline out of the table
/// with it.
struct PendingRequest {
    responder: oneshot::Sender<Result<Arc<Message>>>,
    deadline: Instant,
    window: Duration,
}

/// The task behind a [`CCLink`](crate::CCLink) handle.
///
/// Owns the transport sink, both timers, the middleware chain, the pending
/// request table, and the subscriber registry. Everything is mutated from
/// this one task; handles only pass commands over the channel.
pub(crate) struct Worker<T: Transport> {
    config: ClientConfig,
    transport: Arc<T>,
    commands: mpsc::Receiver<Command>,
    dial_tx: mpsc::Sender<DialOutcome<T::Sink>>,
    dial_rx: mpsc::Receiver<DialOutcome<T::Sink>>,
    state: ConnState<T::Sink>,
    transport_events: Option<mpsc::Receiver<TransportEvent>>,
    heartbeat: Heartbeat,
    reconnect: Reconnect,
    middleware: Arc<[Middleware]>,
    pending: HashMap<RouteKey, PendingRequest>,
    subscribers: HashMap<RouteKey, Vec<mpsc::UnboundedSender<Arc<Message>>>>,
    lifecycle: broadcast::Sender<ClientEvent>,
}

impl<T: Transport> Worker<T> {
    pub(crate) fn new(
        config: ClientConfig,
        transport: T,
        middleware: Arc<[Middleware]>,
        commands: mpsc::Receiver<Command>,
        lifecycle: broadcast::Sender<ClientEvent>,
    ) -> Self {
        let (dial_tx, dial_rx) = mpsc::channel(DIAL_BUFFER);
        Self {
            config,
            transport: Arc::new(transport),
            commands,
            dial_tx,
            dial_rx,
            state: ConnState::Disconnected,
            transport_events: None,
            heartbeat: Heartbeat::Off,
            reconnect: Reconnect {
                ticker: None,
                attempts: 0,
            },
            middleware,
            pending: HashMap::new(),
            subscribers: HashMap::new(),
            lifecycle,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            match self.next_tick().await {
                Tick::Command(None) => break, // last handle dropped
                Tick::Command(Some(command)) => self.handle_command(command).await,
                Tick::Dial(outcome) => self.handle_dial(outcome),
                Tick::Transport(Some(event)) => self.handle_transport_event(event),
                Tick::Transport(None) => {
                    // Read task ended without a close or error event.
                    self.handle_transport_event(TransportEvent::Closed {
                        code: 1006,
                        reason: String::new(),
                    });
                }
                Tick::HeartbeatDue => self.beat().await,
                Tick::ReconnectDue => self.reconnect_tick(),
                Tick::RequestExpired => self.expire_requests(),
            }
        }
        tracing::debug!("client worker stopped");
    }

    async fn next_tick(&mut self) -> Tick<T::Sink> {
        async fn recv_transport(
            rx: &mut Option<mpsc::Receiver<TransportEvent>>,
        ) -> Option<TransportEvent> {
            match rx {
                Some(rx) => rx.recv().await,
                None => std::future::pending().await,
            }
        }

        async fn next_deadline(pending: &HashMap<RouteKey, PendingRequest>) {
            match pending.values().map(|entry| entry.deadline).min() {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        }

        tokio::select! {
            command = self.commands.recv() => Tick::Command(command),
            Some(outcome) = self.dial_rx.recv() => Tick::Dial(outcome),
            event = recv_transport(&mut self.transport_events),
                if self.transport_events.is_some() => Tick::Transport(event),
            () = self.heartbeat.due() => Tick::HeartbeatDue,
            () = self.reconnect.due() => Tick::ReconnectDue,
            () = next_deadline(&self.pending) => Tick::RequestExpired,
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => self.start_dial(),
            Command::Close => self.close().await,
            Command::Send { message, reply } => {
                let _ = reply.send(self.send_now(&message).await);
            }
            Command::Request {
                message,
                timeout,
                responder,
                ack,
            } => {
                let result = self.send_now(&message).await;
                if result.is_ok() {
                    let key = message.route();
                    let entry = PendingRequest {
                        responder,
                        deadline: Instant::now() + timeout,
                        window: timeout,
                    };
                    if self.pending.insert(key, entry).is_some() {
                        // The earlier caller's channel just dropped; they
                        // observe ClientError::Superseded.
                        tracing::warn!(route = %key, "pending request superseded");
                    }
                }
                let _ = ack.send(result);
            }
            Command::Subscribe { key, reply } => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.subscribers.entry(key).or_default().push(tx);
                let _ = reply.send(rx);
            }
        }
    }

    /// Dial unless a connection or attempt is already active.
    fn start_dial(&mut self) {
        if !matches!(self.state, ConnState::Disconnected) {
            tracing::debug!(state = self.state.name(), "connect ignored");
            return;
        }
        self.state = ConnState::Connecting;

        let url = self.config.url();
        let transport = Arc::clone(&self.transport);
        let dial_tx = self.dial_tx.clone();
        tokio::spawn(async move {
            let outcome = match transport.connect(&url).await {
                Ok((sink, events)) => DialOutcome::Connected { sink, events },
                Err(err) => DialOutcome::Failed(err),
            };
            let _ = dial_tx.send(outcome).await;
        });
    }

    fn handle_dial(&mut self, outcome: DialOutcome<T::Sink>) {
        match outcome {
            DialOutcome::Connected { sink, events } => {
                tracing::info!(url = %self.config.url(), "connected");
                self.state = ConnState::Connected { sink };
                self.transport_events = Some(events);
                self.heartbeat = Heartbeat::Grace(Box::pin(sleep(HEARTBEAT_GRACE)));
                if self.reconnect.ticker.is_some() {
                    self.reconnect.ticker = None;
                    self.reconnect.attempts = 0;
                }
                let _ = self.lifecycle.send(ClientEvent::Connected);
            }
            DialOutcome::Failed(err) => {
                self.state = ConnState::Disconnected;
                self.on_transport_error(err);
            }
        }
    }

    async fn close(&mut self) {
        if let ConnState::Connected { sink } = &mut self.state {
            if let Err(err) = sink.close().await {
                tracing::warn!(error = %err, "close request failed");
            }
        }
        // Not connected: nothing to do. A running reconnect cycle is
        // deliberately left alone.
    }

    async fn send_now(&mut self, message: &Message) -> Result<SendStatus> {
        if message.service_id == 0 || message.command_id == 0 {
            return Err(ClientError::MissingIdentifiers);
        }
        let frame = encode_message(message)?;

        let attempted = match &mut self.state {
            ConnState::Connected { sink } => Some(sink.send(frame).await),
            _ => None,
        };
        match attempted {
            Some(Ok(())) => Ok(SendStatus::Sent),
            Some(Err(err)) => {
                self.on_transport_error(err);
                Ok(SendStatus::Dropped)
            }
            None => {
                tracing::debug!(route = %message.route(), "send while disconnected, frame dropped");
                Ok(SendStatus::Dropped)
            }
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Frame(frame) => self.dispatch_frame(&frame),
            TransportEvent::Closed { code, reason } => {
                tracing::info!(code, reason = %reason, "connection closed");
                self.state = ConnState::Disconnected;
                self.transport_events = None;
                self.heartbeat = Heartbeat::Off;
                let _ = self.lifecycle.send(ClientEvent::Closed { code, reason });
            }
            TransportEvent::Error(err) => {
                self.state = ConnState::Disconnected;
                self.transport_events = None;
                self.on_transport_error(err);
            }
        }
    }

    /// Error path: notify, stop the heartbeat, arm the reconnect ticker.
    fn on_transport_error(&mut self, err: TransportError) {
        tracing::warn!(error = %err, "transport error");
        let _ = self
            .lifecycle
            .send(ClientEvent::TransportError(err.to_string()));
        self.heartbeat = Heartbeat::Off;
        if let ConnState::Connected { .. } = self.state {
            self.state = ConnState::Disconnected;
            self.transport_events = None;
        }
        if self.config.auto_reconnect && self.reconnect.ticker.is_none() {
            let period = self.config.reconnect_interval;
            self.reconnect.ticker = Some(interval_at(Instant::now() + period, period));
        }
    }

    fn reconnect_tick(&mut self) {
        if self.reconnect.attempts < self.config.max_reconnect_attempts {
            self.reconnect.attempts += 1;
            tracing::info!(
                attempt = self.reconnect.attempts,
                max = self.config.max_reconnect_attempts,
                "reconnecting"
            );
            self.start_dial();
        } else {
            // Documented gap: exhaustion is not surfaced as an event, only
            // logged. The counter resets so a later error starts fresh.
            tracing::warn!(
                attempts = self.reconnect.attempts,
                "reconnect attempts exhausted, giving up"
            );
            self.reconnect.attempts = 0;
            self.reconnect.ticker = None;
        }
    }

    async fn beat(&mut self) {
        if matches!(self.heartbeat, Heartbeat::Grace(_)) {
            let period = self.config.heartbeat_interval;
            self.heartbeat = Heartbeat::Beating(interval_at(Instant::now() + period, period));
        }
        tracing::trace!(route = %HEARTBEAT_ROUTE, "heartbeat");
        let keep_alive = Message::new(HEARTBEAT_ROUTE.service_id, HEARTBEAT_ROUTE.command_id);
        // Sink failures route through the transport-error path inside.
        if let Err(err) = self.send_now(&keep_alive).await {
            tracing::warn!(error = %err, "heartbeat send failed");
        }
    }

    /// Inbound path: decode, run middleware, fan out, settle any pending
    /// request. Decode failures are logged and the frame dropped; the loop
    /// is never torn down by a bad frame.
    fn dispatch_frame(&mut self, frame: &[u8]) {
        let decoded = match decode_message(frame) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::error!(error = %err, len = frame.len(), "dropping undecodable frame");
                return;
            }
        };
        if let FrameBody::LengthMismatch { declared, actual } = decoded.body {
            tracing::warn!(declared, actual, "compressed length mismatch, body empty");
        }

        let message = Arc::new(decoded.message);
        let key = message.route();
        tracing::trace!(route = %key, "inbound message");

        if !self.middleware.is_empty() {
            // The chain is started but not awaited before fan-out; a stage
            // that suspends overlaps with later dispatches.
            let chain = Arc::clone(&self.middleware);
            let chained = Arc::clone(&message);
            tokio::spawn(async move {
                if let Err(err) = middleware::run(chain, chained).await {
                    tracing::error!(error = %err, "middleware chain failed");
                }
            });
        }

        if let Some(listeners) = self.subscribers.get_mut(&key) {
            listeners.retain(|tx| tx.send(Arc::clone(&message)).is_ok());
            if listeners.is_empty() {
                self.subscribers.remove(&key);
            }
        }

        if let Some(entry) = self.pending.remove(&key) {
            let _ = entry.responder.send(Ok(message));
        }
    }

    /// Fail every pending request whose window has elapsed. Only the expired
    /// entries are touched; a live request on the same key is left alone.
    fn expire_requests(&mut self) {
        let now = Instant::now();
        let expired: Vec<RouteKey> = self
            .pending
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(key, _)| *key)
            .collect();
        for key in expired {
            if let Some(entry) = self.pending.remove(&key) {
                tracing::debug!(route = %key, window = ?entry.window, "request timed out");
                let _ = entry
                    .responder
                    .send(Err(ClientError::RequestTimeout(entry.window)));
            }
        }
    }
}
