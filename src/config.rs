#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use bon::Builder;
use url::Url;

use crate::Result;
use crate::error::Error;

const DEFAULT_PROTOCOL: &str = "ws";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// How many times a lost connection is retried before the error is handed
/// back to the caller.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectLimit {
    /// Give up after this many failed attempts. `Attempts(0)` retries never.
    Attempts(u32),
    /// Keep retrying forever.
    Unlimited,
}

impl Default for ReconnectLimit {
    fn default() -> Self {
        Self::Attempts(0)
    }
}

impl From<u32> for ReconnectLimit {
    fn from(max: u32) -> Self {
        Self::Attempts(max)
    }
}

impl ReconnectLimit {
    /// Whether another attempt is allowed after `attempted` failures.
    #[must_use]
    pub fn allows(self, attempted: u32) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Attempts(max) => attempted < max,
        }
    }
}

/// Connection settings for a [`ConnectionManager`](crate::ConnectionManager).
///
/// Immutable once built. All fields have server-friendly defaults, so the
/// minimal client is `ConnectionConfig::default()` against
/// `ws://127.0.0.1:8000/`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use conveyor_client::ConnectionConfig;
///
/// let config = ConnectionConfig::builder()
///     .host("broker.internal")
///     .port(8181)
///     .channel("orders")
///     .listen(vec!["order-created".to_owned()])
///     .reconnect(true)
///     .reconnect_attempts(5)
///     .reconnect_interval(Duration::from_secs(1))
///     .build();
/// assert_eq!(config.channel.as_deref(), Some("orders"));
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct ConnectionConfig {
    /// URL scheme, `"ws"` or `"wss"`
    #[builder(default = DEFAULT_PROTOCOL.to_owned())]
    pub protocol: String,
    /// Server host
    #[builder(default = DEFAULT_HOST.to_owned())]
    pub host: String,
    /// Server port
    #[builder(default = DEFAULT_PORT)]
    pub port: u16,
    /// Path and query string appended after the authority
    #[builder(default)]
    pub query: String,
    /// Channel to join during the handshake
    pub channel: Option<String>,
    /// Action names to subscribe to, registered in the order given
    #[builder(default)]
    pub listen: Vec<String>,
    /// User identifier associated with this connection on the server
    pub user_id: Option<i64>,
    /// Read timeout. `None` waits forever; when set, a read timeout ends
    /// the session gracefully instead of triggering reconnection.
    pub timeout: Option<Duration>,
    /// Whether a lost connection is retried at all
    #[builder(default)]
    pub reconnect: bool,
    /// Retry budget, only consulted when `reconnect` is `true`
    #[builder(default, into)]
    pub reconnect_attempts: ReconnectLimit,
    /// Pause between reconnection attempts
    #[builder(default = DEFAULT_RECONNECT_INTERVAL)]
    pub reconnect_interval: Duration,
    /// Interval between transport-level pings while connected
    #[builder(default = DEFAULT_HEARTBEAT_INTERVAL)]
    pub heartbeat_interval: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConnectionConfig {
    /// Render and validate the server URL.
    ///
    /// The query is appended after a single `/`, matching the server's
    /// routing expectations, so an empty query yields `ws://host:port/`.
    pub fn url(&self) -> Result<Url> {
        let raw = format!(
            "{}://{}:{}/{}",
            self.protocol, self.host, self.port, self.query
        );
        let url = Url::parse(&raw)?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(Error::config(format!("unsupported protocol: {other}"))),
        }
    }
}
