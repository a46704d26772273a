//! Bulk removal of recent human messages, on a daily schedule or on demand.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::LiveWins;
use crate::config::{CleanupConfig, ConfigError};
use crate::event::{ChannelId, RoleId};
use crate::outbound::{Delivery, Gateway, OutboundError};

#[derive(Clone)]
pub struct CleanupSweep {
    gateway: Gateway,
    config: Arc<CleanupConfig>,
    schedule: cron::Schedule,
    offset: FixedOffset,
    live_wins: Option<LiveWins>,
}

impl CleanupSweep {
    pub fn new(gateway: Gateway, config: CleanupConfig) -> Result<Self, ConfigError> {
        let schedule = config.parsed_schedule()?;
        let offset = config.utc_offset()?;
        Ok(Self {
            gateway,
            config: Arc::new(config),
            schedule,
            offset,
            live_wins: None,
        })
    }

    /// Remove the live wins counter at the start of every daily run.
    pub fn with_live_wins(mut self, live_wins: LiveWins) -> Self {
        self.live_wins = Some(live_wins);
        self
    }

    /// Whether any of `roles` may run a manual sweep.
    pub fn is_authorized(&self, roles: &[RoleId]) -> bool {
        roles
            .iter()
            .any(|role| self.config.authorized_roles.contains(role))
    }

    /// Delete human messages in `channel` younger than the configured age,
    /// oldest first. Returns how many were actually deleted.
    pub async fn sweep(&self, channel: ChannelId) -> Result<usize, OutboundError> {
        let max_age = TimeDelta::from_std(self.config.max_age()).unwrap_or(TimeDelta::MAX);
        let since = Utc::now()
            .checked_sub_signed(max_age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut history = self.gateway.recent_messages(channel, since).await?;
        history.retain(|m| m.author.kind.is_human() && m.created_at >= since);
        history.sort_by_key(|m| m.created_at);

        let mut deleted = 0;
        for msg in history {
            if let Ok(Delivery::Done) = self.gateway.sweep_delete(msg.reference).await {
                deleted += 1;
            }
        }
        info!(channel = %channel, deleted, "Cleanup sweep finished");
        Ok(deleted)
    }

    /// Sweep `channel` and render the report shown to whoever asked for it.
    pub async fn run_manual(&self, channel: ChannelId) -> String {
        match self.sweep(channel).await {
            Ok(deleted) => format!(
                "🧹 **Manual Cleanup**\n📍 <#{channel}>\n🗑️ **Deleted `{deleted}` messages**"
            ),
            Err(e) => format!("⚠️ **Cleanup failed** in <#{channel}>: {e}"),
        }
    }

    /// Next scheduled run strictly after `after`.
    pub fn next_run(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&after.with_timezone(&self.offset))
            .next()
            .map(|at| at.with_timezone(&Utc))
    }

    /// Clear the live wins counter, sweep every configured channel and post
    /// a summary to the log channel.
    pub async fn run_daily(&self) -> usize {
        if let Some(live_wins) = &self.live_wins
            && live_wins.clear().await
        {
            info!("Live wins counter cleared");
        }

        let mut total = 0;
        let mut lines = vec!["🌙 **Auto Daily Cleanup**".to_string()];
        for &channel in &self.config.channels {
            match self.sweep(channel).await {
                Ok(deleted) => {
                    total += deleted;
                    lines.push(format!("🗑️ <#{channel}>: `{deleted}` deleted"));
                }
                Err(e) => lines.push(format!("⚠️ <#{channel}>: {e}")),
            }
        }

        info!(total, channels = self.config.channels.len(), "Daily cleanup finished");
        if let Some(log) = self.config.log_channel {
            let _ = self.gateway.send(log, &lines.join("\n")).await;
        }
        total
    }

    /// Run [`Self::run_daily`] at every scheduled time until aborted.
    /// Returns `None` when there is nothing to sweep or clear.
    pub fn spawn_daily(self) -> Option<JoinHandle<()>> {
        if self.config.channels.is_empty() && self.live_wins.is_none() {
            return None;
        }

        Some(tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let Some(next) = self.next_run(now) else {
                    error!(schedule = %self.config.schedule, "Cleanup schedule has no upcoming runs");
                    return;
                };
                let wait = (next - now).to_std().unwrap_or_default();
                info!(next = %next.with_timezone(&self.offset), "Next cleanup scheduled");
                tokio::time::sleep(wait).await;

                self.run_daily().await;
            }
        }))
    }
}
