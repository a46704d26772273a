//! Discord adapter for Codewarden.
//!
//! - [`DiscordPlatform`] implements the engine's outbound surface over
//!   serenity's HTTP client.
//! - [`Handler`] receives gateway events, converts them, and queues them
//!   for the dispatcher. It also serves the `/cleanup` slash command.

pub mod commands;
pub mod convert;
mod handler;
mod platform;

pub use handler::Handler;
pub use platform::{DiscordPlatform, classify};

use serenity::all::GatewayIntents;

/// Gateway intents the bot needs: message text, edits, deletes and
/// reactions in guild channels.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
}
