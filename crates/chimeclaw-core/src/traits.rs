//! Trait seams for external collaborators.
//!
//! Schedulers talk to the chat platform and the text generator only
//! through these traits, so they can be driven by in-test fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::OutgoingMessage;

/// A chat platform connection that can deliver messages.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name (e.g., "discord").
    fn name(&self) -> &str;

    /// Connect and validate credentials.
    async fn connect(&mut self) -> Result<()>;

    /// Disconnect.
    async fn disconnect(&mut self) -> Result<()>;

    /// Whether the channel is connected.
    fn is_connected(&self) -> bool;

    /// Deliver a message.
    async fn send(&self, message: OutgoingMessage) -> Result<()>;
}

/// A generative text backend for digest posts.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Generate text from a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
