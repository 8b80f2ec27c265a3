use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, ValueEnum},
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    herald_bot::{Bot, ReadLogger},
    herald_commands::{CommandProcessor, FnHandler},
    herald_connectors::ChatSender,
    herald_greeter::{Greeter, seed_exclusions},
    herald_irc::{IrcConfig, IrcConnector, TWITCH_CHAT_URL},
    herald_ledger::{FileLedger, Ledger, MemLedger, SqliteLedger},
    herald_pubsub::{PubSubConfig, PubSubConnector, TWITCH_PUBSUB_URL},
    herald_secret::{EnvSecretStore, SecretStore, VaultSecretStore},
};

#[derive(Parser)]
#[command(name = "herald", about = "herald — channel auto-greeter and command bot")]
struct Cli {
    /// Channel name to join, without the leading '#'.
    #[arg(long)]
    channel: String,

    /// Nickname to join chat with.
    #[arg(long)]
    nick: String,

    /// Ledger backend for greeter dedup state.
    #[arg(long, value_enum, default_value_t = LedgerKind::Sqlite)]
    ledger: LedgerKind,

    /// Path of the file or sqlite ledger.
    #[arg(long, default_value = "herald-ledger.db")]
    ledger_path: PathBuf,

    /// Secret store backend for the chat token.
    #[arg(long, value_enum, default_value_t = StoreKind::Vault)]
    store: StoreKind,

    /// Config file path (defaults to herald.{toml,yaml,yml,json} discovery).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable all features.
    #[arg(long)]
    all: bool,

    /// Enable the auto-greeter.
    #[arg(long)]
    greeter: bool,

    /// Enable command processing.
    #[arg(long)]
    commands: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum LedgerKind {
    Mem,
    File,
    Sqlite,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreKind {
    Env,
    Vault,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);
    info!(version = env!("CARGO_PKG_VERSION"), "herald starting");

    anyhow::ensure!(
        !cli.channel.starts_with('#'),
        "channel must not start with '#'"
    );
    anyhow::ensure!(!cli.nick.is_empty(), "nick must not be empty");
    let channel = format!("#{}", cli.channel);

    let config = match &cli.config {
        Some(path) => herald_config::load_config(path)?,
        None => herald_config::discover_and_load()?,
    };
    let channel_config = config
        .channel(&cli.channel)
        .with_context(|| format!("channel `{}` not found in config", cli.channel))?
        .clone();

    // Resolving the credential is a hard precondition: no connector is
    // constructed without it.
    let store: Box<dyn SecretStore> = match cli.store {
        StoreKind::Env => Box::new(EnvSecretStore::new()),
        StoreKind::Vault => Box::new(VaultSecretStore::from_env()?),
    };
    let token = store.chat_token().await.context("resolve chat token")?;

    let mut bot = Bot::new();
    bot.register_module(Box::new(ReadLogger))?;

    let irc = IrcConnector::new(IrcConfig {
        url: TWITCH_CHAT_URL.into(),
        nick: cli.nick.clone(),
        channel: channel.clone(),
        token: token.clone(),
    });
    let chat_sender: Arc<dyn ChatSender> = Arc::new(irc.sender());
    bot.register_inbound(Box::new(irc))?;

    let pubsub = PubSubConnector::new(PubSubConfig {
        url: TWITCH_PUBSUB_URL.into(),
        channel_id: channel_config.channel_id.clone(),
        token,
    });
    bot.register_inbound(Box::new(pubsub))?;

    if cli.commands || cli.all {
        let mut processor = CommandProcessor::new(Arc::clone(&chat_sender));
        processor.register("ping", Box::new(FnHandler::new(|_, _| "pong".to_string())));
        bot.register_module(Box::new(processor))?;
    }

    if cli.greeter || cli.all {
        let ledger: Arc<dyn Ledger> = match cli.ledger {
            LedgerKind::Mem => Arc::new(MemLedger::new()),
            LedgerKind::File => Arc::new(FileLedger::open(&cli.ledger_path)?),
            LedgerKind::Sqlite => {
                let url = format!("sqlite:{}", cli.ledger_path.display());
                Arc::new(SqliteLedger::connect(&url).await?)
            }
        };
        seed_exclusions(ledger.as_ref(), &cli.nick, &channel)
            .await
            .context("seed greeter exclusions")?;

        let greeter_config = channel_config.greeter.clone().with_context(|| {
            format!(
                "greeter enabled but `channels.{}.greeter` missing from config",
                cli.channel
            )
        })?;
        bot.register_module(Box::new(Greeter::new(
            greeter_config.message_format,
            ledger,
            Arc::clone(&chat_sender),
        )))?;
    }

    if let Err(e) = bot.start().await {
        // Partial startups still get ordered cleanup.
        if let Err(close_err) = bot.close().await {
            warn!(error = %close_err, "cleanup after failed start");
        }
        return Err(e.into());
    }

    let cancel = bot.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            cancel.cancel();
        }
    });

    // The dispatch loop is the process keep-alive: it blocks until every
    // connector stream terminates or shutdown is signaled.
    bot.run().await;

    if let Err(e) = bot.close().await {
        error!(error = %e, "shutdown incomplete");
    }
    info!("herald stopped");
    Ok(())
}
