//! Chat command responder.
//!
//! One command: `!hype`. The bot reacts to the triggering message with
//! a random emoji and posts a random hype line back to the same channel.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tokio_stream::StreamExt;

use chimeclaw_channels::discord::DiscordGatewayStream;
use chimeclaw_channels::DiscordChannel;
use chimeclaw_core::types::IncomingMessage;

const HYPE_EMOJI: &[&str] = &["🎉", "🔥", "🚀", "💯", "⚡", "🙌"];

const HYPE_LINES: &[&str] = &[
    "LET'S GOOO! 🚀",
    "Big energy in this channel today! 🔥",
    "You heard it here first: we are SO back. 💯",
    "Hype levels: critical. 📈",
    "Somebody say demo day? 🎉",
];

/// Whether a message invokes the hype command.
pub fn is_hype_command(content: &str) -> bool {
    content.trim().eq_ignore_ascii_case("!hype")
}

fn pick_emoji() -> &'static str {
    HYPE_EMOJI
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("🎉")
}

fn pick_line() -> &'static str {
    HYPE_LINES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("LET'S GOOO! 🚀")
}

/// Consume the gateway stream and answer commands. Runs until the
/// stream ends (which only happens on shutdown).
pub async fn run_responder(mut stream: DiscordGatewayStream, discord: Arc<DiscordChannel>) {
    tracing::info!("💬 Command responder listening");
    while let Some(msg) = stream.next().await {
        handle_message(&msg, &discord).await;
    }
    tracing::info!("Command responder stream ended");
}

async fn handle_message(msg: &IncomingMessage, discord: &DiscordChannel) {
    if !is_hype_command(&msg.content) {
        return;
    }

    tracing::info!(
        "💬 !hype from {} in {}",
        msg.sender_name.as_deref().unwrap_or(&msg.sender_id),
        msg.thread_id
    );

    if let Err(e) = discord
        .add_reaction(&msg.thread_id, &msg.message_id, pick_emoji())
        .await
    {
        tracing::warn!("⚠️ Reaction failed: {e}");
    }
    if let Err(e) = discord.send_message(&msg.thread_id, pick_line()).await {
        tracing::warn!("⚠️ Hype reply failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_hype_command() {
        assert!(is_hype_command("!hype"));
        assert!(is_hype_command("!HYPE"));
        assert!(is_hype_command("  !hype  "));
        assert!(!is_hype_command("!hyped"));
        assert!(!is_hype_command("hype"));
        assert!(!is_hype_command(""));
    }

    #[test]
    fn test_random_picks_come_from_pools() {
        for _ in 0..20 {
            assert!(HYPE_EMOJI.contains(&pick_emoji()));
            assert!(HYPE_LINES.contains(&pick_line()));
        }
    }
}
