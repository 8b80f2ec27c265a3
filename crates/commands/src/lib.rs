//! Chat command processing.
//!
//! Watches chat-message events for a `!`-prefixed command and dispatches
//! it to a handler registered at setup. Non-command messages and unknown
//! commands are ignored without error; a failing handler is logged and
//! never halts dispatch of later events.

use std::{collections::HashMap, sync::Arc};

use {
    async_trait::async_trait,
    tracing::{debug, warn},
};

use {
    herald_bot::Module,
    herald_connectors::{ChatSender, Event},
};

/// Prefix marking a chat message as a command.
pub const COMMAND_PREFIX: char = '!';

/// One chat command. `run` returns the reply text to post.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn run(&self, sender: &str, args: &[&str]) -> anyhow::Result<String>;
}

/// Adapter turning a plain closure into a [`CommandHandler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&str, &[&str]) -> String + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&str, &[&str]) -> String + Send + Sync,
{
    async fn run(&self, sender: &str, args: &[&str]) -> anyhow::Result<String> {
        Ok((self.f)(sender, args))
    }
}

/// Dispatches `!command` chat messages to registered handlers.
pub struct CommandProcessor {
    handlers: HashMap<String, Box<dyn CommandHandler>>,
    sender: Arc<dyn ChatSender>,
}

impl CommandProcessor {
    pub fn new(sender: Arc<dyn ChatSender>) -> Self {
        Self {
            handlers: HashMap::new(),
            sender,
        }
    }

    /// Register a handler for `!name`. Registration happens at setup,
    /// before the processor sees its first event.
    pub fn register(&mut self, name: impl Into<String>, handler: Box<dyn CommandHandler>) {
        self.handlers.insert(name.into(), handler);
    }
}

#[async_trait]
impl Module for CommandProcessor {
    fn name(&self) -> &str {
        "commands"
    }

    async fn handle(&mut self, event: &Event) -> anyhow::Result<()> {
        let Event::ChatMessage {
            sender: from, text, ..
        } = event
        else {
            return Ok(());
        };
        let Some(body) = text.strip_prefix(COMMAND_PREFIX) else {
            return Ok(());
        };

        let mut parts = body.split_whitespace();
        let Some(command) = parts.next() else {
            return Ok(());
        };
        let args: Vec<&str> = parts.collect();

        let Some(handler) = self.handlers.get(command) else {
            debug!(command, "unrecognized command");
            return Ok(());
        };

        match handler.run(from, &args).await {
            Ok(reply) => self.sender.send(&reply).await?,
            Err(error) => warn!(command, %error, "command handler failed"),
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use {chrono::Utc, herald_connectors::ConnectorError};

    use super::*;

    fn chat(text: &str) -> Event {
        Event::ChatMessage {
            at: Utc::now(),
            channel: "#mychan".into(),
            sender: "alice".into(),
            text: text.into(),
        }
    }

    #[derive(Default)]
    struct FakeSender {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatSender for FakeSender {
        async fn send(&self, text: &str) -> Result<(), ConnectorError> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn processor_with_ping(sender: Arc<FakeSender>) -> CommandProcessor {
        let mut processor = CommandProcessor::new(sender);
        processor.register("ping", Box::new(FnHandler::new(|_, _| "pong".to_string())));
        processor
    }

    #[tokio::test]
    async fn ping_yields_exactly_one_reply() {
        let sender = Arc::new(FakeSender::default());
        let mut processor = processor_with_ping(sender.clone());

        processor.handle(&chat("!ping")).await.unwrap();
        assert_eq!(*sender.sent.lock().unwrap(), vec!["pong"]);
    }

    #[tokio::test]
    async fn plain_chat_yields_no_reply() {
        let sender = Arc::new(FakeSender::default());
        let mut processor = processor_with_ping(sender.clone());

        processor.handle(&chat("hello")).await.unwrap();
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_command_is_ignored_without_error() {
        let sender = Arc::new(FakeSender::default());
        let mut processor = processor_with_ping(sender.clone());

        processor.handle(&chat("!unknown")).await.unwrap();
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bare_prefix_is_ignored() {
        let sender = Arc::new(FakeSender::default());
        let mut processor = processor_with_ping(sender.clone());

        processor.handle(&chat("!")).await.unwrap();
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn handler_receives_sender_and_args() {
        let sender = Arc::new(FakeSender::default());
        let mut processor = CommandProcessor::new(sender.clone());
        processor.register(
            "echo",
            Box::new(FnHandler::new(|from, args| {
                format!("{from}: {}", args.join(" "))
            })),
        );

        processor.handle(&chat("!echo one two")).await.unwrap();
        assert_eq!(*sender.sent.lock().unwrap(), vec!["alice: one two"]);
    }

    #[tokio::test]
    async fn failing_handler_is_absorbed() {
        struct Broken;

        #[async_trait]
        impl CommandHandler for Broken {
            async fn run(&self, _sender: &str, _args: &[&str]) -> anyhow::Result<String> {
                anyhow::bail!("scripted handler failure")
            }
        }

        let sender = Arc::new(FakeSender::default());
        let mut processor = CommandProcessor::new(sender.clone());
        processor.register("broken", Box::new(Broken));
        processor.register("ping", Box::new(FnHandler::new(|_, _| "pong".to_string())));

        // The failure is reported, not propagated.
        processor.handle(&chat("!broken")).await.unwrap();
        assert!(sender.sent.lock().unwrap().is_empty());

        // Subsequent events keep flowing.
        processor.handle(&chat("!ping")).await.unwrap();
        assert_eq!(*sender.sent.lock().unwrap(), vec!["pong"]);
    }

    #[tokio::test]
    async fn presence_events_are_ignored() {
        let sender = Arc::new(FakeSender::default());
        let mut processor = processor_with_ping(sender.clone());

        processor
            .handle(&Event::Presence {
                at: Utc::now(),
                channel: "#mychan".into(),
                identity: "bob".into(),
            })
            .await
            .unwrap();
        assert!(sender.sent.lock().unwrap().is_empty());
    }
}
