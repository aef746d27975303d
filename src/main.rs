//! # ChimeClaw CLI
//!
//! Event reminder and daily digest bot for Discord, driven by a
//! published spreadsheet.
//!
//! Usage:
//!   chimeclaw run                      # Start all bot tasks
//!   chimeclaw events                   # Fetch the sheet and print rows
//!   chimeclaw digest                   # Fire one digest immediately
//!   chimeclaw digest --print           # Only print the generated text
//!   chimeclaw config show              # Show configuration
//!   chimeclaw config init              # Write a default config file

mod commands;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chimeclaw_channels::discord::{DiscordChannel, DiscordConfig};
use chimeclaw_core::ChimeClawConfig;
use chimeclaw_core::traits::{Channel, Provider};
use chimeclaw_scheduler::sheet::EventSource;
use chimeclaw_scheduler::{DigestScheduler, EventRow, ReminderScheduler, SheetSource, clock};

#[derive(Parser)]
#[command(
    name = "chimeclaw",
    version,
    about = "🔔 ChimeClaw — event reminders and daily digests for Discord"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the reminder, digest, and command-responder tasks
    Run,

    /// Fetch the event sheet and print how every row parses
    Events,

    /// Fire one digest immediately
    Digest {
        /// Print the generated post instead of sending it
        #[arg(long)]
        print: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write a default config file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "chimeclaw=debug,chimeclaw_core=debug,chimeclaw_channels=debug,chimeclaw_scheduler=debug"
    } else {
        "chimeclaw=info,chimeclaw_channels=info,chimeclaw_scheduler=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = if let Some(path) = &cli.config {
        ChimeClawConfig::load_from(std::path::Path::new(path))?
    } else {
        ChimeClawConfig::load()?
    };

    match cli.command {
        Commands::Run => run_bot(config).await?,
        Commands::Events => print_events(config).await?,
        Commands::Digest { print } => run_digest(config, print).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let path = cli
                    .config
                    .map(std::path::PathBuf::from)
                    .unwrap_or_else(ChimeClawConfig::default_path);
                println!("📄 Config file: {}", path.display());
                println!("{}", toml::to_string_pretty(&config)?);
            }
            ConfigAction::Init => {
                let config = ChimeClawConfig::default();
                config.save()?;
                println!("✅ Default config written to {}", ChimeClawConfig::default_path().display());
                println!("   Fill in sheet_url, discord.bot_token, discord.reminder_channel_id, digest.api_key.");
            }
        },
    }

    Ok(())
}

/// Start all three long-lived tasks and block until ctrl-c.
async fn run_bot(config: ChimeClawConfig) -> Result<()> {
    config.validate()?;
    let tz = config.tz()?;

    println!("🔔 ChimeClaw v{}", env!("CARGO_PKG_VERSION"));

    // Startup credential check; a bad token fails here, not mid-loop.
    let mut discord = DiscordChannel::new(DiscordConfig::new(config.discord.bot_token.clone()));
    discord.connect().await?;
    let discord = Arc::new(discord);

    let source: Arc<dyn EventSource> = Arc::new(SheetSource::new(config.sheet_url.clone()));
    let provider: Arc<dyn Provider> = Arc::from(chimeclaw_providers::create_provider(&config)?);

    let reminder = ReminderScheduler::new(
        source.clone(),
        discord.clone(),
        config.discord.reminder_channel_id.clone(),
        tz,
        config.poll_interval_secs,
    );
    tokio::spawn(reminder.run());

    let digest = DigestScheduler::new(
        source,
        discord.clone(),
        provider,
        config.discord.digest_channel().to_string(),
        tz,
        config.digest.hour,
    );
    tokio::spawn(digest.run());

    let gateway = DiscordChannel::new(DiscordConfig::new(config.discord.bot_token.clone()))
        .start_gateway();
    tokio::spawn(commands::run_responder(gateway, discord));

    println!("Bot is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    println!("\n👋 ChimeClaw stopped.");
    Ok(())
}

/// Operator diagnostic: fetch the sheet once and show how each row parses.
async fn print_events(config: ChimeClawConfig) -> Result<()> {
    if config.sheet_url.is_empty() {
        anyhow::bail!("sheet_url is not configured (CHIMECLAW_SHEET_URL)");
    }
    let tz = config.tz()?;

    let source = SheetSource::new(config.sheet_url.clone());
    let rows = source.fetch().await?;
    println!("📋 {} rows fetched (1 header, {} data)", rows.len(), rows.len().saturating_sub(1));

    for (i, fields) in rows.iter().enumerate().skip(1) {
        let Some(row) = EventRow::from_fields(fields) else {
            println!("  ⬜ row {i}: skipped (fewer than 4 fields): {fields:?}");
            continue;
        };
        match clock::resolve(&row.date, &row.time, tz) {
            Ok(instant) => println!("  ✅ row {i}: '{}' at {}", row.description, instant),
            Err(e) => println!("  ⬜ row {i}: '{}' skipped ({e})", row.description),
        }
    }
    Ok(())
}

/// Fire one digest immediately, or only print the generated post.
async fn run_digest(config: ChimeClawConfig, print: bool) -> Result<()> {
    let provider: Arc<dyn Provider> = Arc::from(chimeclaw_providers::create_provider(&config)?);

    if print {
        let text = provider.generate(chimeclaw_scheduler::digest::DIGEST_PROMPT).await?;
        println!("{text}");
        return Ok(());
    }

    config.validate()?;
    let tz = config.tz()?;

    let mut discord = DiscordChannel::new(DiscordConfig::new(config.discord.bot_token.clone()));
    discord.connect().await?;

    let digest = DigestScheduler::new(
        Arc::new(SheetSource::new(config.sheet_url.clone())),
        Arc::new(discord),
        provider,
        config.discord.digest_channel().to_string(),
        tz,
        config.digest.hour,
    );
    digest.fire().await;
    println!("✅ Digest fired.");
    Ok(())
}
