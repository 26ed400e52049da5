//! Caller-supplied connection event handlers.

use async_trait::async_trait;

use crate::connection::ConnectionManager;

/// Receives connection lifecycle events and inbound payloads.
///
/// Every method defaults to a no-op, so implementors supply only the subset
/// they care about. Each method receives the manager itself, which may be
/// used to send messages or close the connection from within a callback.
///
/// Callbacks are not guarded by the client: a panicking callback unwinds
/// through [`ConnectionManager::connect`].
///
/// # Example
///
/// ```no_run
/// use async_trait::async_trait;
/// use conveyor_client::{ConnectionHandler, ConnectionManager};
///
/// struct Greeter;
///
/// #[async_trait]
/// impl ConnectionHandler for Greeter {
///     async fn on_ready(&self, connection: &ConnectionManager) {
///         let _ = connection.send("hello").await;
///     }
/// }
/// ```
#[async_trait]
pub trait ConnectionHandler: Send + Sync {
    /// The handshake is complete and the connection is usable for sending.
    async fn on_ready(&self, _connection: &ConnectionManager) {}

    /// An inbound payload arrived. Payloads are delivered verbatim,
    /// unparsed.
    async fn on_message(&self, _connection: &ConnectionManager, _payload: &str) {}

    /// A connection attempt failed. `attempt` is the number of failed
    /// attempts so far in the current reconnection run; it resets to zero
    /// after every successful handshake.
    async fn on_disconnect(&self, _connection: &ConnectionManager, _attempt: u32) {}
}

/// Handler that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

#[async_trait]
impl ConnectionHandler for NoopHandler {}
