//! # ChimeClaw Providers
//!
//! Generative text backends for the daily digest post. Gemini is the
//! wired provider; everything downstream sees only the `Provider` seam.

pub mod gemini;

use chimeclaw_core::config::ChimeClawConfig;
use chimeclaw_core::error::Result;
use chimeclaw_core::traits::Provider;

/// Create the configured digest provider.
pub fn create_provider(config: &ChimeClawConfig) -> Result<Box<dyn Provider>> {
    Ok(Box::new(gemini::GeminiProvider::new(config)))
}
