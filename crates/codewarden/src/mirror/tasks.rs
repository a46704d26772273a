//! Per-entry background activities.
//!
//! Both activities are parameterized by source identity only and reach the
//! entry through the registry, so an entry that is gone means "stop".

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use super::MirrorEngine;
use crate::event::MessageId;

/// Toggle the phase and re-render every `period` until the entry is gone.
pub(super) fn spawn_animation_loop(
    engine: MirrorEngine,
    source: MessageId,
    period: Duration,
    cancel_rx: oneshot::Receiver<()>,
) {
    tokio::spawn(async move {
        debug!(source = %source, "Animation loop started");

        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cancel_rx = cancel_rx;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if !engine.animate(source).await {
                        debug!(source = %source, "Entry gone, stopping animation");
                        break;
                    }
                }
                _ = &mut cancel_rx => {
                    debug!(source = %source, "Animation loop cancelled");
                    break;
                }
            }
        }

        debug!(source = %source, "Animation loop stopped");
    });
}

/// Fire [`MirrorEngine::expire`] once after `remaining`, unless cancelled.
pub(super) fn spawn_expiry_timer(
    engine: MirrorEngine,
    source: MessageId,
    remaining: Duration,
    cancel_rx: oneshot::Receiver<()>,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(remaining) => {
                debug!(source = %source, "Deadline reached");
                engine.expire(source).await;
            }
            _ = cancel_rx => {
                debug!(source = %source, "Expiry timer cancelled");
            }
        }
    });
}
