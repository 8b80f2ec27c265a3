use {async_trait::async_trait, herald_connectors::Event, tracing::info};

/// A behavior module consuming dispatched events.
///
/// Handlers run on the orchestrator's dispatch loop, one invocation at a
/// time, in registration order. They must not block: a handler that never
/// returns stalls dispatch for every subsequent event. Errors are logged
/// and isolated by the orchestrator — returning `Err` never halts dispatch.
#[async_trait]
pub trait Module: Send + Sync {
    /// Module identifier used in logs.
    fn name(&self) -> &str;

    /// Handle one event. Called for every event from every connector;
    /// modules ignore variants they have no interest in.
    async fn handle(&mut self, event: &Event) -> anyhow::Result<()>;
}

/// Logs every inbound event. Registered first so the raw stream is visible
/// before any module acts on it.
pub struct ReadLogger;

#[async_trait]
impl Module for ReadLogger {
    fn name(&self) -> &str {
        "read-logger"
    }

    async fn handle(&mut self, event: &Event) -> anyhow::Result<()> {
        info!(?event, "inbound event");
        Ok(())
    }
}
