//! Delayed deletion of posts by listed bots.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::AutoDeleteConfig;
use crate::event::{AuthorKind, InboundMessage};
use crate::outbound::Gateway;

#[derive(Clone)]
pub struct AutoDelete {
    gateway: Gateway,
    config: Arc<AutoDeleteConfig>,
}

impl AutoDelete {
    pub fn new(gateway: Gateway, config: AutoDeleteConfig) -> Self {
        Self {
            gateway,
            config: Arc::new(config),
        }
    }

    /// Schedule deletion of `msg` if a target bot posted it in a watched
    /// channel. Returns immediately; the wait happens on its own task.
    pub fn on_message(&self, msg: &InboundMessage) -> bool {
        if msg.author.kind != AuthorKind::TargetBot || !self.config.channels.contains(&msg.channel)
        {
            return false;
        }

        let gateway = self.gateway.clone();
        let target = msg.reference();
        let delay = Duration::from_secs(self.config.delay_seconds);
        debug!(target = %target, delay_secs = delay.as_secs(), "Scheduling bot message deletion");

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = gateway.delete(target).await;
        });
        true
    }
}
