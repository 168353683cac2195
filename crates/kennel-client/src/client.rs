//! Realtime chat client.
//!
//! [`ChatClient`] is the handle; a background task owns the socket and the
//! [`Connection`] state machine. The task waits on four sources at once:
//! handle commands, the pending open, the live socket, and the backoff timer.
//! Each wakeup feeds one notification into the state machine and executes
//! the returned actions in order.
//!
//! # Invariants
//!
//! - The task holds at most one pending open or live socket, never both.
//! - Listener callbacks run on the task, in frame arrival order, with the
//!   registry lock released.
//! - Intents are never queued: a send while the link is not open fails with
//!   [`ConnectionError::NotConnected`].

use std::{
    collections::VecDeque,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use kennel_core::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionError, Environment, LinkState,
    Listener, ListenerId, ListenerRegistry,
};
use kennel_proto::{AuthToken, ClientIntent, EventKind, ServerEvent, ThreadId, UserId, realtime_url};
use tokio::sync::{mpsc, oneshot, watch};
use url::Url;

use crate::{
    error::ClientError,
    transport::{OpenFuture, Socket, Transport, TransportError},
};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST base URL; the realtime URL is derived from it.
    pub api_base: String,
    /// Bearer token for the session.
    pub token: AuthToken,
    /// Reconnect policy.
    pub connection: ConnectionConfig,
}

impl ClientConfig {
    /// Configuration with the default reconnect policy.
    pub fn new(api_base: impl Into<String>, token: AuthToken) -> Self {
        Self { api_base: api_base.into(), token, connection: ConnectionConfig::default() }
    }
}

type Reply = oneshot::Sender<Result<(), ClientError>>;

enum Command {
    Connect(Reply),
    Send(ClientIntent),
    Disconnect,
}

/// Handle to the realtime link.
///
/// Dropping the handle stops the background task and closes the socket.
pub struct ChatClient {
    commands: mpsc::UnboundedSender<Command>,
    listeners: Arc<Mutex<ListenerRegistry>>,
    link: watch::Receiver<LinkState>,
}

impl ChatClient {
    /// Start the link task. No socket is opened until [`ChatClient::connect`].
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - `ClientError::Config` if the realtime URL cannot be derived from
    ///   `config.api_base`
    pub fn spawn<T, E>(transport: T, env: E, config: ClientConfig) -> Result<Self, ClientError>
    where
        T: Transport,
        E: Environment,
    {
        let url = realtime_url(&config.api_base, &config.token)?;
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (link_tx, link) = watch::channel(LinkState::Idle);
        let listeners = Arc::new(Mutex::new(ListenerRegistry::new()));

        let task = LinkTask {
            transport,
            env,
            url,
            conn: Connection::new(config.connection),
            listeners: Arc::clone(&listeners),
            link: link_tx,
            opening: None,
            socket: None,
            backoff: None,
            waiters: Vec::new(),
        };
        tokio::spawn(task.run(command_rx));

        Ok(Self { commands, listeners, link })
    }

    /// Open the link.
    ///
    /// Resolves once the socket is open. If the link is already open this
    /// returns immediately; if an open is in flight the call joins it and
    /// shares its outcome. A second socket is never opened.
    ///
    /// # Errors
    ///
    /// - `ClientError::Link` with `Transport` if the socket fails to open.
    ///   The link returns to [`LinkState::Idle`] without retrying.
    /// - `ClientError::Link` with `Closed` if [`ChatClient::disconnect`] runs
    ///   first, or `GaveUp` if the call joined a reconnect loop that ran out.
    /// - `ClientError::Stopped` if the link task is gone
    pub async fn connect(&self) -> Result<(), ClientError> {
        let (reply, outcome) = oneshot::channel();
        self.commands.send(Command::Connect(reply)).map_err(|_| ClientError::Stopped)?;
        outcome.await.map_err(|_| ClientError::Stopped)?
    }

    /// Register `listener` for events of `kind`.
    pub fn on(&self, kind: EventKind, listener: Listener) -> ListenerId {
        self.registry().on(kind, listener)
    }

    /// Unregister a listener. Returns false if it was not registered.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.registry().off(kind, id)
    }

    /// Transmit an intent.
    ///
    /// # Errors
    ///
    /// - `ClientError::Link(NotConnected)` unless the link is open. Nothing
    ///   is queued.
    /// - `ClientError::Stopped` if the link task is gone
    pub fn send(&self, intent: ClientIntent) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ConnectionError::NotConnected.into());
        }
        self.commands.send(Command::Send(intent)).map_err(|_| ClientError::Stopped)
    }

    /// Send a chat message. `client_ref` is echoed by servers that support
    /// correlation.
    ///
    /// # Errors
    ///
    /// See [`ChatClient::send`].
    pub fn send_message(
        &self,
        thread_id: ThreadId,
        receiver_id: UserId,
        body: impl Into<String>,
        client_ref: Option<u64>,
    ) -> Result<(), ClientError> {
        self.send(ClientIntent::SendMessage { thread_id, receiver_id, body: body.into(), client_ref })
    }

    /// Announce that the local user started or stopped typing.
    ///
    /// # Errors
    ///
    /// See [`ChatClient::send`].
    pub fn send_typing(
        &self,
        thread_id: ThreadId,
        receiver_id: UserId,
        is_typing: bool,
    ) -> Result<(), ClientError> {
        self.send(ClientIntent::Typing { thread_id, receiver_id, is_typing })
    }

    /// Mark a thread read.
    ///
    /// # Errors
    ///
    /// See [`ChatClient::send`].
    pub fn mark_read(&self, thread_id: ThreadId) -> Result<(), ClientError> {
        self.send(ClientIntent::MarkRead { thread_id })
    }

    /// Close the link and drop every listener. Idempotent.
    ///
    /// No reconnect follows. A pending [`ChatClient::connect`] fails with
    /// `Closed`.
    pub fn disconnect(&self) {
        self.registry().clear();
        // A closed channel means the task already stopped and dropped the
        // socket, which is the requested outcome.
        let _ = self.commands.send(Command::Disconnect);
    }

    /// True while the socket is open.
    pub fn is_connected(&self) -> bool {
        *self.link.borrow() == LinkState::Open
    }

    /// Current link state.
    pub fn link_state(&self) -> LinkState {
        *self.link.borrow()
    }

    /// Receiver that observes every link state change, including
    /// [`LinkState::GaveUp`].
    pub fn watch_link(&self) -> watch::Receiver<LinkState> {
        self.link.clone()
    }

    fn registry(&self) -> MutexGuard<'_, ListenerRegistry> {
        // Listener panics poison nothing the registry relies on.
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient").field("link", &*self.link.borrow()).finish_non_exhaustive()
    }
}

type Backoff = (u32, Pin<Box<dyn Future<Output = ()> + Send>>);

struct LinkTask<T: Transport, E: Environment> {
    transport: T,
    env: E,
    url: Url,
    conn: Connection,
    listeners: Arc<Mutex<ListenerRegistry>>,
    link: watch::Sender<LinkState>,
    opening: Option<OpenFuture<T::Socket>>,
    socket: Option<T::Socket>,
    backoff: Option<Backoff>,
    waiters: Vec<Reply>,
}

impl<T: Transport, E: Environment> LinkTask<T, E> {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        tracing::debug!(host = self.url.host_str(), "link task started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                result = open_outcome(&mut self.opening), if self.opening.is_some() => {
                    self.opening = None;
                    self.handle_open_outcome(result).await;
                },
                frame = next_frame(&mut self.socket), if self.socket.is_some() => {
                    self.handle_frame(frame).await;
                },
                attempt = backoff_elapsed(&mut self.backoff), if self.backoff.is_some() => {
                    self.backoff = None;
                    let actions = self.conn.reconnect_due(attempt);
                    self.execute(actions).await;
                },
            }
            self.publish_state();
        }

        let actions = self.conn.disconnect();
        self.execute(actions).await;
        tracing::debug!("link task stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect(reply) => {
                if self.conn.is_open() {
                    let _ = reply.send(Ok(()));
                    return;
                }
                self.waiters.push(reply);
                let actions = self.conn.connect();
                self.execute(actions).await;
            },
            Command::Send(intent) => match self.conn.send(&intent) {
                Ok(actions) => self.execute(actions).await,
                // The link dropped between the handle's check and now.
                Err(e) => tracing::warn!(error = %e, thread = %intent.thread_id(), "intent dropped"),
            },
            Command::Disconnect => {
                self.backoff = None;
                let actions = self.conn.disconnect();
                self.execute(actions).await;
                self.resolve_waiters(|| Err(ConnectionError::Closed.into()));
                tracing::info!("disconnected");
            },
        }
    }

    async fn handle_open_outcome(&mut self, result: Result<T::Socket, TransportError>) {
        match result {
            Ok(socket) => {
                self.socket = Some(socket);
                let actions = self.conn.transport_opened();
                self.execute(actions).await;
                if self.conn.is_open() {
                    tracing::info!("link open");
                    self.resolve_waiters(|| Ok(()));
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, state = ?self.conn.state(), "open failed");
                let reason = e.to_string();
                let actions = self.conn.transport_failed();
                self.execute(actions).await;
                if self.conn.state() == LinkState::Idle {
                    self.resolve_waiters(|| Err(ConnectionError::Transport(reason.clone()).into()));
                }
            },
        }
    }

    async fn handle_frame(&mut self, frame: Option<Result<String, TransportError>>) {
        match frame {
            Some(Ok(text)) => match self.conn.handle_text(&text) {
                Ok(actions) => self.execute(actions).await,
                Err(e) => tracing::warn!(error = %e, "discarding malformed frame"),
            },
            Some(Err(e)) => {
                tracing::warn!(error = %e, "socket failed");
                self.socket_lost().await;
            },
            None => {
                tracing::info!("socket closed by peer");
                self.socket_lost().await;
            },
        }
    }

    async fn socket_lost(&mut self) {
        self.socket = None;
        let actions = self.conn.transport_closed();
        self.execute(actions).await;
    }

    async fn execute(&mut self, actions: Vec<ConnectionAction>) {
        let mut queue = VecDeque::from(actions);
        while let Some(action) = queue.pop_front() {
            match action {
                ConnectionAction::OpenTransport => {
                    self.backoff = None;
                    self.opening = Some(self.transport.open(&self.url));
                },
                ConnectionAction::Transmit(text) => {
                    let Some(socket) = self.socket.as_mut() else {
                        continue;
                    };
                    tracing::debug!(bytes = text.len(), "transmit");
                    if let Err(e) = socket.send(text).await {
                        tracing::warn!(error = %e, "write failed");
                        self.socket = None;
                        queue.extend(self.conn.transport_closed());
                    }
                },
                ConnectionAction::CloseTransport => {
                    self.opening = None;
                    if let Some(mut socket) = self.socket.take() {
                        socket.close().await;
                    }
                },
                ConnectionAction::ScheduleReconnect { attempt, delay } => {
                    tracing::info!(attempt, ?delay, "reconnecting");
                    let env = self.env.clone();
                    self.backoff = Some((attempt, Box::pin(async move { env.sleep(delay).await })));
                },
                ConnectionAction::Deliver(event) => self.deliver(&event),
                ConnectionAction::GaveUp { attempts } => {
                    tracing::warn!(attempts, "giving up on realtime link");
                    self.resolve_waiters(|| Err(ConnectionError::GaveUp { attempts }.into()));
                },
            }
        }
        self.publish_state();
    }

    fn deliver(&self, event: &ServerEvent) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot(event.kind());
        tracing::debug!(kind = %event.kind(), listeners = listeners.len(), "dispatch");
        for listener in listeners {
            listener(event);
        }
    }

    fn resolve_waiters(&mut self, outcome: impl Fn() -> Result<(), ClientError>) {
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(outcome());
        }
    }

    fn publish_state(&self) {
        let state = self.conn.state();
        self.link.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }
}

async fn open_outcome<S>(opening: &mut Option<OpenFuture<S>>) -> Result<S, TransportError> {
    match opening {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

async fn next_frame<S: Socket>(socket: &mut Option<S>) -> Option<Result<String, TransportError>> {
    match socket {
        Some(socket) => socket.recv().await,
        None => std::future::pending().await,
    }
}

async fn backoff_elapsed(backoff: &mut Option<Backoff>) -> u32 {
    match backoff {
        Some((attempt, sleep)) => {
            sleep.await;
            *attempt
        },
        None => std::future::pending().await,
    }
}
