use herald_ledger::{Ledger, LedgerError};

/// Service identities that must never be greeted.
pub const KNOWN_BOTS: &[&str] = &[
    "tmi.twitch.tv",
    "streamlabs",
    "nightbot",
    "ranaebot",
    "soundalerts",
];

/// Pre-seed the ledger with every identity greeting must never target:
/// the known service bots, the bot's own nick in each form the chat
/// protocol reports it, and the broadcaster. Must run before the greeter
/// processes its first event.
///
/// The suffixed nick forms are enumerated rather than derived from a
/// normalization rule — identity matching is exact, so every observed
/// spelling needs its own entry.
pub async fn seed_exclusions(
    ledger: &dyn Ledger,
    nick: &str,
    channel: &str,
) -> Result<(), LedgerError> {
    for bot in KNOWN_BOTS {
        ledger.add(bot).await?;
    }
    ledger.add(nick).await?;
    // The broadcaster shares the channel's name.
    ledger.add(channel.trim_start_matches('#')).await?;
    ledger.add(&format!("{nick}.tmi.twitch.tv")).await?;
    ledger.add(&format!("{nick}@tmi.twitch.tv")).await?;
    Ok(())
}
