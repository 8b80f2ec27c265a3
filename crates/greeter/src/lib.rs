//! Auto-greeter module.
//!
//! Greets an identity the first time it shows up in the channel, and never
//! again for the process lifetime. The dedup ledger is the source of
//! truth; the exclusion list in [`exclusions`] is pre-seeded into it
//! before any event is processed so the bot never greets itself, the
//! broadcaster, or known service bots.

pub mod exclusions;

use std::sync::Arc;

use {async_trait::async_trait, tracing::warn};

use {
    herald_bot::Module,
    herald_connectors::{ChatSender, Event},
    herald_ledger::Ledger,
};

pub use exclusions::{KNOWN_BOTS, seed_exclusions};

/// Placeholder in the greeting template replaced with the identity.
pub const USER_PLACEHOLDER: &str = "{user}";

/// Greets each unseen identity exactly once.
///
/// Per identity the transition is one-shot: unseen → greeted (send +
/// ledger add) or unseen → suppressed (already in the ledger). There is
/// no path back to unseen within a process run.
pub struct Greeter {
    message_format: String,
    ledger: Arc<dyn Ledger>,
    sender: Arc<dyn ChatSender>,
}

impl Greeter {
    pub fn new(
        message_format: impl Into<String>,
        ledger: Arc<dyn Ledger>,
        sender: Arc<dyn ChatSender>,
    ) -> Self {
        Self {
            message_format: message_format.into(),
            ledger,
            sender,
        }
    }

    fn render(&self, identity: &str) -> String {
        self.message_format.replace(USER_PLACEHOLDER, identity)
    }
}

#[async_trait]
impl Module for Greeter {
    fn name(&self) -> &str {
        "greeter"
    }

    async fn handle(&mut self, event: &Event) -> anyhow::Result<()> {
        let Event::Presence { identity, .. } = event else {
            return Ok(());
        };

        let seen = match self.ledger.contains(identity).await {
            Ok(seen) => seen,
            Err(error) => {
                // Fail safe: with the ledger unreachable we cannot rule out
                // an earlier greeting, so treat the identity as seen. A
                // missed greeting beats a duplicate one.
                warn!(%identity, %error, "ledger unavailable, suppressing greeting");
                return Ok(());
            }
        };
        if seen {
            return Ok(());
        }

        self.sender.send(&self.render(identity)).await?;
        if let Err(error) = self.ledger.add(identity).await {
            warn!(%identity, %error, "ledger add failed, identity may be greeted again");
        }
        Ok(())
    }
}
