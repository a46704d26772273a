//! Channel moderation rules that run alongside the mirror engine.
//!
//! Each rule is a small cloneable handle over the shared [`Gateway`](crate::outbound::Gateway)
//! and is fed by the dispatcher. None of them keep state that must survive
//! a restart.

mod autodelete;
mod cleanup;
mod live_wins;
mod milestones;
mod reactions;

pub use autodelete::AutoDelete;
pub use cleanup::CleanupSweep;
pub use live_wins::LiveWins;
pub use milestones::Milestones;
pub use reactions::{ReactionCountdown, ReactionThreshold};
