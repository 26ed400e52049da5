#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt as _, StreamExt as _};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::config::ConnectionConfig;
use crate::envelope::Envelope;
use crate::error::{ClosedByPeer, Error, Kind, NotConnected, OpenTimedOut, ReadTimedOut};
use crate::handler::ConnectionHandler;
use crate::heartbeat::Heartbeat;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Connection lifecycle states.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no attempt in progress
    Disconnected,
    /// Opening the transport
    Connecting,
    /// Transport open, sending control envelopes
    Handshaking,
    /// Handshake complete, connection usable for sending
    Ready,
    /// Delivering inbound payloads
    Receiving,
    /// Waiting out the backoff interval before the next attempt
    Reconnecting {
        /// Failed attempts so far
        attempt: u32,
    },
    /// Shut down by [`ConnectionManager::close`]
    Closed,
}

impl ConnectionState {
    /// Whether a transport is currently usable for sending.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Ready | Self::Receiving)
    }
}

/// How one connection session ended.
enum SessionEnd {
    /// [`ConnectionManager::close`] was called
    Shutdown,
    Failed(Error),
}

/// Drives the connect → handshake → receive → reconnect cycle against a
/// Conveyor server and dispatches inbound payloads to a
/// [`ConnectionHandler`].
///
/// The manager owns at most one transport at a time; it is replaced, never
/// shared, on each (re)connect. All writes — handshake envelopes,
/// application sends, heartbeat pings — go through one lock, so frames
/// never interleave on the wire.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use async_trait::async_trait;
/// use conveyor_client::{ConnectionConfig, ConnectionHandler, ConnectionManager};
///
/// struct Echo;
///
/// #[async_trait]
/// impl ConnectionHandler for Echo {
///     async fn on_message(&self, connection: &ConnectionManager, payload: &str) {
///         let _ = connection.send(payload).await;
///     }
/// }
///
/// # async fn example() -> conveyor_client::Result<()> {
/// let config = ConnectionConfig::builder()
///     .channel("logs")
///     .reconnect(true)
///     .build();
/// let manager = ConnectionManager::new(config, Arc::new(Echo))?;
/// manager.connect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConnectionManager {
    config: ConnectionConfig,
    handler: Arc<dyn ConnectionHandler>,
    /// Write half of the current transport. Taken, not merely closed, on
    /// every teardown so a stale handle is unreachable.
    writer: Arc<Mutex<Option<WsSink>>>,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    shutdown: CancellationToken,
    /// Guards against a second `connect` while one is in flight
    connecting: Arc<AtomicBool>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("config", &self.config)
            .field("state", &*self.state_rx.borrow())
            .field("connecting", &self.connecting.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Validate the configuration and build the manager. No connection is
    /// opened until [`connect`](Self::connect).
    pub fn new(config: ConnectionConfig, handler: Arc<dyn ConnectionHandler>) -> Result<Self> {
        config.url()?;
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        Ok(Self {
            config,
            handler,
            writer: Arc::new(Mutex::new(None)),
            state_tx,
            state_rx,
            shutdown: CancellationToken::new(),
            connecting: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Run the connection until it ends.
    ///
    /// Opens the transport, performs the handshake (user association, then
    /// channel join, then one listener registration per configured action,
    /// in that order), invokes `on_ready`, then delivers inbound payloads to
    /// `on_message` until the session ends.
    ///
    /// Returns `Ok` on a graceful end: a read timeout while a timeout is
    /// configured, or [`close`](Self::close). Any other failure invokes
    /// `on_disconnect` and either retries per the reconnection policy or
    /// returns the error once retries are disabled or exhausted.
    ///
    /// At most one call may be in flight per manager; a concurrent call
    /// fails with a `Config` error.
    pub async fn connect(&self) -> Result<()> {
        if self.connecting.swap(true, Ordering::SeqCst) {
            return Err(Error::config("a connect call is already in flight"));
        }
        let result = self.run().await;
        self.connecting.store(false, Ordering::SeqCst);
        result
    }

    async fn run(&self) -> Result<()> {
        let url = self.config.url()?;
        let mut attempts: u32 = 0;

        loop {
            if self.shutdown.is_cancelled() {
                _ = self.state_tx.send(ConnectionState::Closed);
                return Ok(());
            }

            // A transport left over from a previous session is closed before
            // a new one is opened.
            self.teardown_transport().await;
            _ = self.state_tx.send(ConnectionState::Connecting);
            tracing::debug!(url = %url, attempt = attempts, "connecting");

            let failure = match self.run_session(url.as_str(), &mut attempts).await {
                SessionEnd::Shutdown => None,
                SessionEnd::Failed(error) => Some(error),
            };

            // close() racing the receive loop can surface as a transport
            // failure; a cancelled token always means deliberate shutdown.
            let Some(error) = failure.filter(|_failure| !self.shutdown.is_cancelled()) else {
                self.teardown_transport().await;
                _ = self.state_tx.send(ConnectionState::Closed);
                return Ok(());
            };

            self.handler.on_disconnect(self, attempts).await;
            self.teardown_transport().await;

            if error.is_timeout() && self.config.timeout.is_some() {
                tracing::debug!("read timed out, ending session");
                _ = self.state_tx.send(ConnectionState::Disconnected);
                return Ok(());
            }

            if !(self.config.reconnect && self.config.reconnect_attempts.allows(attempts)) {
                _ = self.state_tx.send(ConnectionState::Disconnected);
                return Err(error);
            }

            tracing::warn!(%error, attempt = attempts, "connection lost, retrying");
            _ = self
                .state_tx
                .send(ConnectionState::Reconnecting { attempt: attempts });
            attempts = attempts.saturating_add(1);

            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    _ = self.state_tx.send(ConnectionState::Closed);
                    return Ok(());
                }
                () = sleep(self.config.reconnect_interval) => {}
            }
        }
    }

    /// One full connect → handshake → receive pass over a fresh transport.
    async fn run_session(&self, url: &str, attempts: &mut u32) -> SessionEnd {
        let stream = match self.open_transport(url).await {
            Ok(stream) => stream,
            Err(error) => return SessionEnd::Failed(error),
        };
        let (sink, mut source) = stream.split();
        *self.writer.lock().await = Some(sink);

        _ = self.state_tx.send(ConnectionState::Handshaking);
        if let Err(error) = self.handshake().await {
            return SessionEnd::Failed(error);
        }

        _ = self.state_tx.send(ConnectionState::Ready);
        let heartbeat = Heartbeat::spawn(
            Arc::clone(&self.writer),
            self.config.heartbeat_interval,
            &self.shutdown,
        );
        self.handler.on_ready(self).await;
        *attempts = 0;

        _ = self.state_tx.send(ConnectionState::Receiving);
        let end = self.receive_loop(&mut source).await;

        // The heartbeat must stop before the transport it writes to is torn
        // down or replaced.
        heartbeat.cancel();
        end
    }

    async fn open_transport(&self, url: &str) -> Result<WsStream> {
        let connected = match self.config.timeout {
            Some(limit) => timeout(limit, connect_async(url))
                .await
                .map_err(|_elapsed| Error::from(OpenTimedOut))?,
            None => connect_async(url).await,
        };
        match connected {
            Ok((stream, _response)) => Ok(stream),
            Err(e) => Err(Error::with_source(Kind::Connect, e)),
        }
    }

    /// Send the control envelopes in the server's expected order: user
    /// association, channel join, one add-listener per action. No responses
    /// are read; the server is free to ignore envelopes it cannot resolve.
    async fn handshake(&self) -> Result<()> {
        if let Some(user_id) = self.config.user_id {
            self.send_raw(&Envelope::AssocUser { user_id }.to_json()?)
                .await?;
        }
        if let Some(channel) = self.config.channel.as_deref() {
            tracing::debug!(channel, "joining channel");
            self.send_raw(&Envelope::ChannelConnect { channel }.to_json()?)
                .await?;
        }
        for listen in &self.config.listen {
            self.send_raw(&Envelope::AddListener { listen }.to_json()?)
                .await?;
        }
        Ok(())
    }

    async fn receive_loop(&self, source: &mut WsSource) -> SessionEnd {
        loop {
            let frame = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return SessionEnd::Shutdown,
                frame = self.next_frame(source) => frame,
            };
            match frame {
                Ok(Message::Text(text)) => {
                    tracing::trace!(payload = %text, "received payload");
                    self.handler.on_message(self, text.as_str()).await;
                }
                Ok(Message::Close(_)) => return SessionEnd::Failed(ClosedByPeer.into()),
                Ok(_) => {
                    // Binary frames and ping/pong replies carry no Conveyor
                    // payloads.
                }
                Err(error) => return SessionEnd::Failed(error),
            }
        }
    }

    async fn next_frame(&self, source: &mut WsSource) -> Result<Message> {
        let item = match self.config.timeout {
            Some(limit) => timeout(limit, source.next())
                .await
                .map_err(|_elapsed| Error::from(ReadTimedOut))?,
            None => source.next().await,
        };
        match item {
            Some(Ok(message)) => Ok(message),
            Some(Err(e)) => Err(Error::with_source(Kind::Transport, e)),
            None => Err(ClosedByPeer.into()),
        }
    }

    /// Wrap `payload` in the broadcast envelope and send it.
    pub async fn send(&self, payload: &str) -> Result<()> {
        self.send_raw(&Envelope::Broadcast { data: payload }.to_json()?)
            .await
    }

    /// Send `payload` to the server verbatim.
    pub async fn send_raw(&self, payload: &str) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let sink = guard.as_mut().ok_or(NotConnected)?;
        sink.send(Message::Text(payload.into()))
            .await
            .map_err(|e| Error::with_source(Kind::Transport, e))
    }

    /// Shut the connection down.
    ///
    /// Stops the heartbeat, unblocks a blocked receive, closes and clears
    /// the transport, and leaves the manager [`ConnectionState::Closed`].
    /// Calling it again is a no-op. A closed manager stays closed; a later
    /// [`connect`](Self::connect) returns immediately without connecting.
    pub async fn close(&self) {
        // Cancelling first stops the heartbeat and the receive loop before
        // the transport goes away.
        self.shutdown.cancel();
        self.teardown_transport().await;
        _ = self.state_tx.send(ConnectionState::Closed);
    }

    async fn teardown_transport(&self) {
        let sink = self.writer.lock().await.take();
        if let Some(mut sink) = sink {
            _ = sink.close().await;
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Subscribe to lifecycle state changes.
    ///
    /// Useful for observing reconnection progress without registering a
    /// handler.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// The configuration this manager was built from.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}
