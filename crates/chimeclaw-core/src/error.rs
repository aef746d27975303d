//! Unified error types for ChimeClaw.

use thiserror::Error;

/// Result type alias using ChimeClawError.
pub type Result<T> = std::result::Result<T, ChimeClawError>;

#[derive(Error, Debug)]
pub enum ChimeClawError {
    // Table source errors
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Parse error: {0}")]
    Parse(String),

    // Channel errors
    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Channel not connected: {0}")]
    ChannelNotConnected(String),

    // Provider errors
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChimeClawError {
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
