use std::panic::AssertUnwindSafe;

use {
    futures::FutureExt,
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use herald_connectors::{ConnectorState, Event, InboundConnector};

use crate::{error::BotError, module::Module};

/// Capacity of the merge channel. Bounded so a stalled module applies
/// backpressure to connectors instead of growing an unbounded queue.
const EVENT_BUFFER: usize = 256;

struct Registered {
    name: String,
    connector: Box<dyn InboundConnector>,
    state: ConnectorState,
}

/// The plugin orchestrator.
///
/// Owns the registered connectors and the ordered module list. Connectors
/// push events into a single merge channel from their own tasks; [`run`]
/// consumes it and invokes every module per event, in registration order.
/// Per-connector event order is preserved end to end; events from
/// different connectors interleave in arrival order only.
///
/// [`run`]: Bot::run
pub struct Bot {
    connectors: Vec<Registered>,
    modules: Vec<Box<dyn Module>>,
    events_tx: Option<mpsc::Sender<Event>>,
    events_rx: Option<mpsc::Receiver<Event>>,
    cancel: CancellationToken,
}

impl Bot {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        Self {
            connectors: Vec::new(),
            modules: Vec::new(),
            events_tx: Some(events_tx),
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Token observed by connectors and the dispatch loop. Cancelling it
    /// begins cooperative shutdown: in-flight handler invocations finish,
    /// no further events are dispatched.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn started(&self) -> bool {
        self.connectors
            .iter()
            .any(|reg| reg.state != ConnectorState::Created)
    }

    /// Register an inbound event source. Fails if another connector with
    /// the same name is already registered, or after the bot started.
    pub fn register_inbound(
        &mut self,
        connector: Box<dyn InboundConnector>,
    ) -> Result<(), BotError> {
        if self.started() {
            return Err(BotError::AlreadyStarted);
        }
        let name = connector.name().to_string();
        if self.connectors.iter().any(|reg| reg.name == name) {
            return Err(BotError::DuplicateRegistration(name));
        }
        info!(connector = %name, "registered inbound connector");
        self.connectors.push(Registered {
            name,
            connector,
            state: ConnectorState::Created,
        });
        Ok(())
    }

    /// Append a behavior module. Modules are invoked in registration order
    /// for every event; the list is fixed once [`start`] is called, so
    /// registration after start is rejected.
    ///
    /// [`start`]: Bot::start
    pub fn register_module(&mut self, module: Box<dyn Module>) -> Result<(), BotError> {
        if self.started() {
            return Err(BotError::AlreadyStarted);
        }
        info!(module = module.name(), "registered module");
        self.modules.push(module);
        Ok(())
    }

    /// Start every registered connector in registration order.
    ///
    /// Fails fast on the first connector error; connectors started before
    /// the failure are left running, and the caller is responsible for
    /// invoking [`close`] afterwards.
    ///
    /// [`close`]: Bot::close
    pub async fn start(&mut self) -> Result<(), BotError> {
        let Some(tx) = self.events_tx.clone() else {
            return Err(BotError::AlreadyStarted);
        };
        for reg in self.connectors.iter_mut() {
            if reg.state != ConnectorState::Created {
                return Err(BotError::AlreadyStarted);
            }
            reg.connector
                .start(tx.clone())
                .await
                .map_err(|source| BotError::Start {
                    name: reg.name.clone(),
                    source,
                })?;
            reg.state = ConnectorState::Started;
            info!(connector = %reg.name, "connector started");
        }
        Ok(())
    }

    /// The dispatch loop. Runs until every connector's event stream has
    /// terminated or the cancellation token fires.
    ///
    /// This is the single serialization point: one event at a time is
    /// delivered to every module before the next event is consumed. A
    /// connector whose stream ends simply stops contributing; the loop
    /// keeps draining the others.
    pub async fn run(&mut self) {
        // Drop our own sender so the channel closes once every connector
        // task has finished.
        self.events_tx = None;
        let Some(mut rx) = self.events_rx.take() else {
            return;
        };

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("dispatch loop cancelled");
                    break;
                }
                next = rx.recv() => match next {
                    Some(event) => self.dispatch(event).await,
                    None => {
                        info!("all connector streams terminated");
                        break;
                    }
                },
            }
        }
    }

    /// Deliver one event to every module in registration order. A module
    /// error or panic is logged and does not stop delivery to the
    /// remaining modules, nor dispatch of subsequent events.
    async fn dispatch(&mut self, event: Event) {
        for module in self.modules.iter_mut() {
            let name = module.name().to_string();
            match AssertUnwindSafe(module.handle(&event)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    warn!(module = %name, %error, "module handler failed");
                }
                Err(_) => {
                    warn!(module = %name, "module handler panicked");
                }
            }
        }
    }

    /// Close every connector in reverse registration order.
    ///
    /// Each connector's close is attempted exactly once, even when an
    /// earlier close fails; all failures are aggregated into
    /// [`BotError::Close`] rather than returned one at a time. Safe to
    /// call again after a partial failure — already-closed connectors are
    /// skipped.
    pub async fn close(&mut self) -> Result<(), BotError> {
        self.cancel.cancel();
        self.events_tx = None;

        let mut failures = Vec::new();
        for reg in self.connectors.iter_mut().rev() {
            if reg.state == ConnectorState::Closed {
                continue;
            }
            // Mark closed before the attempt so a failing close is never
            // retried.
            reg.state = ConnectorState::Closed;
            info!(connector = %reg.name, "closing connector");
            if let Err(error) = reg.connector.close().await {
                warn!(connector = %reg.name, %error, "connector close failed");
                failures.push((reg.name.clone(), error));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(BotError::Close { failures })
        }
    }
}

impl Default for Bot {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use {async_trait::async_trait, chrono::Utc, tokio::sync::mpsc};

    use herald_connectors::ConnectorError;

    use super::*;

    fn presence(identity: &str) -> Event {
        Event::Presence {
            at: Utc::now(),
            channel: "#testchan".into(),
            identity: identity.into(),
        }
    }

    /// Connector that plays a fixed script of events from a background
    /// task, then drops its sender (stream termination).
    struct ScriptConnector {
        name: String,
        script: Vec<Event>,
        fail_start: bool,
        fail_close: bool,
        close_log: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptConnector {
        fn new(name: &str, script: Vec<Event>, close_log: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name: name.into(),
                script,
                fail_start: false,
                fail_close: false,
                close_log,
            }
        }
    }

    #[async_trait]
    impl InboundConnector for ScriptConnector {
        fn name(&self) -> &str {
            &self.name
        }

        async fn start(&mut self, events: mpsc::Sender<Event>) -> Result<(), ConnectorError> {
            if self.fail_start {
                return Err(ConnectorError::Connection("scripted start failure".into()));
            }
            let script = std::mem::take(&mut self.script);
            tokio::spawn(async move {
                for event in script {
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
            });
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ConnectorError> {
            self.close_log.lock().unwrap().push(self.name.clone());
            if self.fail_close {
                return Err(ConnectorError::Send("scripted close failure".into()));
            }
            Ok(())
        }
    }

    /// Records `(module, identity)` pairs in invocation order.
    struct RecordingModule {
        name: String,
        log: Arc<Mutex<Vec<(String, String)>>>,
    }

    #[async_trait]
    impl Module for RecordingModule {
        fn name(&self) -> &str {
            &self.name
        }

        async fn handle(&mut self, event: &Event) -> anyhow::Result<()> {
            let identity = event.identity().unwrap_or_default().to_string();
            self.log.lock().unwrap().push((self.name.clone(), identity));
            Ok(())
        }
    }

    struct FailingModule;

    #[async_trait]
    impl Module for FailingModule {
        fn name(&self) -> &str {
            "failing"
        }

        async fn handle(&mut self, _event: &Event) -> anyhow::Result<()> {
            anyhow::bail!("scripted module failure")
        }
    }

    struct PanickingModule;

    #[async_trait]
    impl Module for PanickingModule {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn handle(&mut self, _event: &Event) -> anyhow::Result<()> {
            panic!("scripted module panic")
        }
    }

    #[tokio::test]
    async fn duplicate_connector_name_is_rejected() {
        let close_log = Arc::new(Mutex::new(Vec::new()));
        let mut bot = Bot::new();
        bot.register_inbound(Box::new(ScriptConnector::new(
            "irc",
            vec![],
            Arc::clone(&close_log),
        )))
        .unwrap();
        let err = bot
            .register_inbound(Box::new(ScriptConnector::new("irc", vec![], close_log)))
            .unwrap_err();
        assert!(matches!(err, BotError::DuplicateRegistration(name) if name == "irc"));
    }

    #[tokio::test]
    async fn modules_run_in_registration_order_for_every_event() {
        let close_log = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut bot = Bot::new();
        bot.register_inbound(Box::new(ScriptConnector::new(
            "irc",
            vec![presence("alice"), presence("bob")],
            close_log,
        )))
        .unwrap();
        bot.register_module(Box::new(RecordingModule {
            name: "first".into(),
            log: Arc::clone(&log),
        })).unwrap();
        bot.register_module(Box::new(RecordingModule {
            name: "second".into(),
            log: Arc::clone(&log),
        })).unwrap();

        bot.start().await.unwrap();
        bot.run().await;

        let recorded = log.lock().unwrap().clone();
        assert_eq!(
            recorded,
            vec![
                ("first".to_string(), "alice".to_string()),
                ("second".to_string(), "alice".to_string()),
                ("first".to_string(), "bob".to_string()),
                ("second".to_string(), "bob".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn module_error_does_not_block_later_modules_or_events() {
        let close_log = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut bot = Bot::new();
        bot.register_inbound(Box::new(ScriptConnector::new(
            "irc",
            vec![presence("alice"), presence("bob")],
            close_log,
        )))
        .unwrap();
        bot.register_module(Box::new(FailingModule)).unwrap();
        bot.register_module(Box::new(RecordingModule {
            name: "recorder".into(),
            log: Arc::clone(&log),
        })).unwrap();

        bot.start().await.unwrap();
        bot.run().await;

        let recorded = log.lock().unwrap().clone();
        assert_eq!(
            recorded,
            vec![
                ("recorder".to_string(), "alice".to_string()),
                ("recorder".to_string(), "bob".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn module_panic_does_not_block_later_modules_or_events() {
        let close_log = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut bot = Bot::new();
        bot.register_inbound(Box::new(ScriptConnector::new(
            "irc",
            vec![presence("alice"), presence("bob")],
            close_log,
        )))
        .unwrap();
        bot.register_module(Box::new(PanickingModule)).unwrap();
        bot.register_module(Box::new(RecordingModule {
            name: "recorder".into(),
            log: Arc::clone(&log),
        })).unwrap();

        bot.start().await.unwrap();
        bot.run().await;

        let recorded = log.lock().unwrap().clone();
        assert_eq!(recorded.len(), 2, "both events must reach the second module");
    }

    #[tokio::test]
    async fn per_connector_event_order_is_preserved() {
        let close_log = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::new(Mutex::new(Vec::new()));

        let chat: Vec<Event> = (0..10).map(|i| presence(&format!("chat-{i}"))).collect();
        let pubsub: Vec<Event> = (0..10).map(|i| presence(&format!("ps-{i}"))).collect();

        let mut bot = Bot::new();
        bot.register_inbound(Box::new(ScriptConnector::new(
            "chat",
            chat,
            Arc::clone(&close_log),
        )))
        .unwrap();
        bot.register_inbound(Box::new(ScriptConnector::new("pubsub", pubsub, close_log)))
            .unwrap();
        bot.register_module(Box::new(RecordingModule {
            name: "recorder".into(),
            log: Arc::clone(&log),
        })).unwrap();

        bot.start().await.unwrap();
        bot.run().await;

        let recorded = log.lock().unwrap().clone();
        assert_eq!(recorded.len(), 20);

        // No global ordering across connectors, but each connector's
        // events must arrive in emission order.
        let chat_seen: Vec<String> = recorded
            .iter()
            .filter(|(_, id)| id.starts_with("chat-"))
            .map(|(_, id)| id.clone())
            .collect();
        let pubsub_seen: Vec<String> = recorded
            .iter()
            .filter(|(_, id)| id.starts_with("ps-"))
            .map(|(_, id)| id.clone())
            .collect();
        let chat_expected: Vec<String> = (0..10).map(|i| format!("chat-{i}")).collect();
        let pubsub_expected: Vec<String> = (0..10).map(|i| format!("ps-{i}")).collect();
        assert_eq!(chat_seen, chat_expected);
        assert_eq!(pubsub_seen, pubsub_expected);
    }

    #[tokio::test]
    async fn start_fails_fast_and_close_still_reaches_every_connector() {
        let close_log = Arc::new(Mutex::new(Vec::new()));

        let mut bot = Bot::new();
        bot.register_inbound(Box::new(ScriptConnector::new(
            "first",
            vec![],
            Arc::clone(&close_log),
        )))
        .unwrap();
        let mut broken = ScriptConnector::new("broken", vec![], Arc::clone(&close_log));
        broken.fail_start = true;
        bot.register_inbound(Box::new(broken)).unwrap();
        bot.register_inbound(Box::new(ScriptConnector::new(
            "last",
            vec![],
            Arc::clone(&close_log),
        )))
        .unwrap();

        let err = bot.start().await.unwrap_err();
        assert!(matches!(err, BotError::Start { ref name, .. } if name == "broken"));

        // Startup failure still requires ordered cleanup of everything
        // registered, in reverse order.
        bot.close().await.unwrap();
        let closed = close_log.lock().unwrap().clone();
        assert_eq!(closed, vec!["last", "broken", "first"]);
    }

    #[tokio::test]
    async fn close_aggregates_errors_and_attempts_each_connector_once() {
        let close_log = Arc::new(Mutex::new(Vec::new()));

        let mut bot = Bot::new();
        bot.register_inbound(Box::new(ScriptConnector::new(
            "a",
            vec![],
            Arc::clone(&close_log),
        )))
        .unwrap();
        let mut flaky = ScriptConnector::new("b", vec![], Arc::clone(&close_log));
        flaky.fail_close = true;
        bot.register_inbound(Box::new(flaky)).unwrap();
        bot.register_inbound(Box::new(ScriptConnector::new(
            "c",
            vec![],
            Arc::clone(&close_log),
        )))
        .unwrap();

        bot.start().await.unwrap();
        let err = bot.close().await.unwrap_err();
        match err {
            BotError::Close { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].0, "b");
            }
            other => panic!("unexpected error: {other}"),
        }

        let closed = close_log.lock().unwrap().clone();
        assert_eq!(closed, vec!["c", "b", "a"]);

        // A second close is a no-op: no connector is attempted twice.
        bot.close().await.unwrap();
        assert_eq!(close_log.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn cancelled_bot_stops_dispatching() {
        let close_log = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut bot = Bot::new();
        bot.register_inbound(Box::new(ScriptConnector::new(
            "irc",
            vec![presence("alice")],
            close_log,
        )))
        .unwrap();
        bot.register_module(Box::new(RecordingModule {
            name: "recorder".into(),
            log: Arc::clone(&log),
        })).unwrap();

        bot.start().await.unwrap();
        bot.cancel_token().cancel();
        bot.run().await;

        // Cancellation fired before dispatch began, so nothing was
        // delivered.
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn registration_after_start_is_rejected() {
        let close_log = Arc::new(Mutex::new(Vec::new()));
        let mut bot = Bot::new();
        bot.register_inbound(Box::new(ScriptConnector::new(
            "irc",
            vec![],
            Arc::clone(&close_log),
        )))
        .unwrap();
        bot.start().await.unwrap();

        let err = bot
            .register_inbound(Box::new(ScriptConnector::new("late", vec![], close_log)))
            .unwrap_err();
        assert!(matches!(err, BotError::AlreadyStarted));
    }

    #[tokio::test]
    async fn module_registration_after_start_is_rejected() {
        let close_log = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut bot = Bot::new();
        bot.register_inbound(Box::new(ScriptConnector::new(
            "irc",
            vec![presence("alice")],
            close_log,
        )))
        .unwrap();
        bot.start().await.unwrap();

        let err = bot
            .register_module(Box::new(RecordingModule {
                name: "late".into(),
                log: Arc::clone(&log),
            }))
            .unwrap_err();
        assert!(matches!(err, BotError::AlreadyStarted));

        // The rejected module must never see the event stream.
        bot.run().await;
        assert!(log.lock().unwrap().is_empty());
    }
}
