//! # ChimeClaw Channels
//!
//! Chat platform implementations. Discord is the wired channel; the
//! `Channel` trait seam keeps the schedulers platform-agnostic.

pub mod discord;

pub use discord::{DiscordChannel, DiscordConfig, DiscordGatewayStream};
