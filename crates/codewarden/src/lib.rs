//! Codewarden - code mirroring and moderation engine for group-chat channels.
//!
//! The crate is platform-agnostic: inbound chat events arrive as [`event::Event`]
//! values and every side effect goes through the [`outbound::Platform`] trait.
//! Platform adapters (see `codewarden-discord`) translate both directions.

pub mod config;
pub mod dispatch;
pub mod event;
pub mod extract;
pub mod mirror;
pub mod moderation;
pub mod outbound;
pub mod render;

#[cfg(test)]
pub(crate) mod testing;
