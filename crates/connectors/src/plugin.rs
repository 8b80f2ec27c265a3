use {async_trait::async_trait, tokio::sync::mpsc};

use crate::{error::ConnectorError, event::Event};

/// Lifecycle state of a connector.
///
/// A connector moves `Created → Started → Closed` exactly once per process
/// run. Re-entrant transitions are rejected (start) or no-ops (close),
/// never silent restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Created,
    Started,
    Closed,
}

/// A realtime event source.
///
/// `start` establishes the connection and begins pushing [`Event`]s into
/// the supplied sender from a background task, preserving source order.
/// The sequence is lazy, unbounded, and non-restartable: when the
/// underlying connection terminates the connector drops its sender and
/// does not reconnect — reconnect policy belongs to the concrete backend,
/// not the orchestrator.
#[async_trait]
pub trait InboundConnector: Send + Sync {
    /// Connector identifier (e.g. "irc", "pubsub"). Must be unique among
    /// registered connectors.
    fn name(&self) -> &str;

    /// Connect and start emitting events. Fails with
    /// [`ConnectorError::AlreadyStarted`] on a second call.
    async fn start(&mut self, events: mpsc::Sender<Event>) -> Result<(), ConnectorError>;

    /// Stop emitting and release the connection. Idempotent: a second
    /// close is a no-op. Must never panic.
    async fn close(&mut self) -> Result<(), ConnectorError>;
}

/// Send messages back to the chat channel.
///
/// Usable concurrently with the owning connector's receive loop; shared
/// across behavior modules as an `Arc<dyn ChatSender>`.
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), ConnectorError>;
}
