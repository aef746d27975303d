//! # ChimeClaw Core
//!
//! Shared types, configuration, errors, and trait seams for the
//! ChimeClaw event bot.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::ChimeClawConfig;
pub use error::{ChimeClawError, Result};
