//! ChimeClaw configuration system.
//!
//! Values come from ~/.chimeclaw/config.toml with environment variable
//! overrides, so the bot can run from a bare container with env vars only.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ChimeClawError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChimeClawConfig {
    /// Published CSV URL of the event sheet.
    #[serde(default)]
    pub sheet_url: String,
    /// IANA timezone name used to resolve event times.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Seconds between reminder poll cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub digest: DigestConfig,
}

fn default_timezone() -> String { "US/Eastern".into() }
fn default_poll_interval() -> u64 { 60 }

impl Default for ChimeClawConfig {
    fn default() -> Self {
        Self {
            sheet_url: String::new(),
            timezone: default_timezone(),
            poll_interval_secs: default_poll_interval(),
            discord: DiscordConfig::default(),
            digest: DigestConfig::default(),
        }
    }
}

impl ChimeClawConfig {
    /// Load config from the default path (~/.chimeclaw/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Load config from a specific path, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ChimeClawError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ChimeClawError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Environment variables win over file values.
    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("CHIMECLAW_SHEET_URL") {
            self.sheet_url = v;
        }
        if let Ok(v) = std::env::var("CHIMECLAW_TIMEZONE") {
            self.timezone = v;
        }
        if let Ok(v) = std::env::var("CHIMECLAW_REMINDER_CHANNEL_ID") {
            self.discord.reminder_channel_id = v;
        }
        if let Ok(v) = std::env::var("CHIMECLAW_DIGEST_CHANNEL_ID") {
            self.discord.digest_channel_id = v;
        }
        if let Ok(v) = std::env::var("DISCORD_BOT_TOKEN") {
            self.discord.bot_token = v;
        }
        if let Ok(v) = std::env::var("GEMINI_API_KEY") {
            self.digest.api_key = v;
        }
    }

    /// Validate required settings. Returns a single error naming every
    /// missing value so a bad deployment fails fast with one message.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.sheet_url.is_empty() {
            missing.push("sheet_url (CHIMECLAW_SHEET_URL)");
        }
        if self.discord.bot_token.is_empty() {
            missing.push("discord.bot_token (DISCORD_BOT_TOKEN)");
        }
        if self.discord.reminder_channel_id.is_empty() {
            missing.push("discord.reminder_channel_id (CHIMECLAW_REMINDER_CHANNEL_ID)");
        }
        if self.digest.api_key.is_empty() {
            missing.push("digest.api_key (GEMINI_API_KEY)");
        }
        if !missing.is_empty() {
            return Err(ChimeClawError::Config(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )));
        }
        if self.digest.hour > 23 {
            return Err(ChimeClawError::Config(format!(
                "digest.hour out of range: {}",
                self.digest.hour
            )));
        }
        self.tz()?;
        Ok(())
    }

    /// Parse the configured timezone.
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| ChimeClawError::Config(format!("Unknown timezone: {}", self.timezone)))
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ChimeClawError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".chimeclaw")
            .join("config.toml")
    }

    /// Get the ChimeClaw home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".chimeclaw")
    }
}

/// Discord connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Channel that receives event reminders.
    #[serde(default)]
    pub reminder_channel_id: String,
    /// Channel that receives the daily digest. Empty = reminder channel.
    #[serde(default)]
    pub digest_channel_id: String,
}

impl DiscordConfig {
    /// Channel for digest posts, falling back to the reminder channel.
    pub fn digest_channel(&self) -> &str {
        if self.digest_channel_id.is_empty() {
            &self.reminder_channel_id
        } else {
            &self.digest_channel_id
        }
    }
}

/// Daily digest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Local hour of day (0-23) to post the digest.
    #[serde(default = "default_digest_hour")]
    pub hour: u32,
    /// Generative model used for the digest post.
    #[serde(default = "default_digest_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
}

fn default_digest_hour() -> u32 { 12 }
fn default_digest_model() -> String { "gemini-1.5-flash".into() }

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            hour: default_digest_hour(),
            model: default_digest_model(),
            api_key: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChimeClawConfig::default();
        assert_eq!(config.timezone, "US/Eastern");
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.digest.hour, 12);
        assert_eq!(config.digest.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            sheet_url = "https://docs.google.com/spreadsheets/d/abc/pub?output=csv"
            timezone = "Europe/Berlin"

            [discord]
            bot_token = "token"
            reminder_channel_id = "111"

            [digest]
            hour = 9
        "#;

        let config: ChimeClawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.timezone, "Europe/Berlin");
        assert_eq!(config.discord.reminder_channel_id, "111");
        assert_eq!(config.digest.hour, 9);
        assert_eq!(config.poll_interval_secs, 60);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let toml_str = "";
        let config: ChimeClawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.timezone, "US/Eastern");
        assert!(config.sheet_url.is_empty());
    }

    #[test]
    fn test_validate_names_every_missing_setting() {
        let config = ChimeClawConfig::default();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("CHIMECLAW_SHEET_URL"));
        assert!(err.contains("DISCORD_BOT_TOKEN"));
        assert!(err.contains("CHIMECLAW_REMINDER_CHANNEL_ID"));
        assert!(err.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_validate_rejects_unknown_timezone() {
        let mut config = ChimeClawConfig::default();
        config.sheet_url = "https://example.com/sheet.csv".into();
        config.discord.bot_token = "token".into();
        config.discord.reminder_channel_id = "111".into();
        config.digest.api_key = "key".into();
        config.timezone = "Mars/Olympus_Mons".into();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("Unknown timezone"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_hour() {
        let mut config = ChimeClawConfig::default();
        config.sheet_url = "https://example.com/sheet.csv".into();
        config.discord.bot_token = "token".into();
        config.discord.reminder_channel_id = "111".into();
        config.digest.api_key = "key".into();
        config.digest.hour = 24;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("digest.hour"));
    }

    #[test]
    fn test_digest_channel_fallback() {
        let mut discord = DiscordConfig::default();
        discord.reminder_channel_id = "111".into();
        assert_eq!(discord.digest_channel(), "111");

        discord.digest_channel_id = "222".into();
        assert_eq!(discord.digest_channel(), "222");
    }

    #[test]
    fn test_tz_parses_configured_zone() {
        let config = ChimeClawConfig::default();
        assert_eq!(config.tz().unwrap(), chrono_tz::US::Eastern);
    }

    #[test]
    fn test_home_dir() {
        let home = ChimeClawConfig::home_dir();
        assert!(home.to_string_lossy().contains("chimeclaw"));
    }
}
