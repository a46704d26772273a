//! Single consumer that feeds inbound events to the engine and the
//! moderation rules one at a time, in the order they were received.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::config::{Config, ConfigError};
use crate::event::Event;
use crate::mirror::MirrorEngine;
use crate::moderation::{AutoDelete, Milestones, ReactionCountdown, ReactionThreshold};
use crate::outbound::Gateway;

/// Create the queue between a platform adapter and [`Dispatcher::run`].
pub fn channel(buffer: usize) -> (mpsc::Sender<Event>, mpsc::Receiver<Event>) {
    mpsc::channel(buffer)
}

pub struct Dispatcher {
    engine: MirrorEngine,
    auto_delete: AutoDelete,
    countdown: ReactionCountdown,
    threshold: ReactionThreshold,
    milestones: Milestones,
}

impl Dispatcher {
    pub fn new(config: &Config, gateway: Gateway) -> Result<Self, ConfigError> {
        let offset = config.milestones.utc_offset()?;
        Ok(Self {
            engine: MirrorEngine::new(gateway.clone(), config.mirror.clone()),
            auto_delete: AutoDelete::new(gateway.clone(), config.auto_delete.clone()),
            countdown: ReactionCountdown::new(gateway.clone(), config.reactions.countdown.clone()),
            threshold: ReactionThreshold::new(gateway.clone(), config.reactions.threshold.clone()),
            milestones: Milestones::new(gateway, &config.milestones, offset),
        })
    }

    pub fn engine(&self) -> &MirrorEngine {
        &self.engine
    }

    /// Handle one event to completion.
    pub async fn dispatch(&self, event: Event) {
        match event {
            Event::MessageCreated(msg) => {
                self.auto_delete.on_message(&msg);
                self.countdown.on_message(&msg);
                self.engine.on_create(&msg).await;
                self.milestones.on_message(&msg).await;
            }
            Event::MessageEdited(msg) => {
                self.engine.on_edit(&msg).await;
            }
            Event::MessageDeleted(reference) => {
                self.engine.on_delete(reference.message).await;
            }
            Event::ReactionAdded(reaction) => {
                self.threshold.on_reaction(&reaction).await;
            }
        }
    }

    /// Consume events until the queue closes or `shutdown` fires, then tear
    /// down every live mirror.
    pub async fn run(self, mut events: mpsc::Receiver<Event>, mut shutdown: oneshot::Receiver<()>) {
        info!("Dispatcher started");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event).await,
                    None => {
                        debug!("Event queue closed");
                        break;
                    }
                },
                _ = &mut shutdown => {
                    debug!("Shutdown requested");
                    break;
                }
            }
        }

        self.engine.shutdown().await;
        info!("Dispatcher stopped");
    }
}
