//! Periodic transport-level pings for an active connection.

use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt as _;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tokio_util::sync::CancellationToken;

use crate::connection::WsSink;

/// Ping task tied to one connection session.
///
/// The task shares the writer lock with application sends, so a ping can
/// never interleave with another frame. It ends on its own when the
/// transport has been taken away or a ping write fails.
pub(crate) struct Heartbeat {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Spawn the ping task. Its token is a child of `parent`, so cancelling
    /// the manager's shutdown token also stops the heartbeat.
    pub(crate) fn spawn(
        writer: Arc<Mutex<Option<WsSink>>>,
        interval: Duration,
        parent: &CancellationToken,
    ) -> Self {
        let token = parent.child_token();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // interval's first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = task_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let mut guard = writer.lock().await;
                let Some(sink) = guard.as_mut() else { break };
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        });
        Self { token, handle }
    }

    /// Stop the ping task. Must run before the transport it writes to is
    /// closed or replaced.
    pub(crate) fn cancel(self) {
        self.token.cancel();
        self.handle.abort();
    }
}
