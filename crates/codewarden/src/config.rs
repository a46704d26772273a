use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use tokio::fs;

use chrono::FixedOffset;
use serde::Deserialize;
use thiserror::Error;

use crate::event::{ChannelId, RoleId, UserId};

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordSection,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub auto_delete: AutoDeleteConfig,
    #[serde(default)]
    pub reactions: ReactionsConfig,
    #[serde(default)]
    pub milestones: MilestoneConfig,
    #[serde(default)]
    pub live_wins: LiveWinsConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Ok(serde_saphyr::from_str(&contents)?)
    }

    /// Reject configurations that can never work at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mirror = &self.mirror;
        if !mirror.source_channels.is_empty() && mirror.target_channels.is_empty() {
            return Err(ConfigError::Invalid(
                "mirror.source_channels is set but mirror.target_channels is empty".to_string(),
            ));
        }
        if mirror.window_seconds == 0 {
            return Err(ConfigError::Invalid(
                "mirror.window_seconds must be greater than zero".to_string(),
            ));
        }
        if mirror.animation_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "mirror.animation_interval_seconds must be greater than zero".to_string(),
            ));
        }
        if mirror.max_variants == 0 {
            return Err(ConfigError::Invalid(
                "mirror.max_variants must be at least 1".to_string(),
            ));
        }

        let countdown = &self.reactions.countdown;
        if countdown.channel.is_some() {
            if countdown.glyphs.is_empty() {
                return Err(ConfigError::Invalid(
                    "reactions.countdown.glyphs must not be empty".to_string(),
                ));
            }
            if countdown.interval_seconds == 0 {
                return Err(ConfigError::Invalid(
                    "reactions.countdown.interval_seconds must be greater than zero".to_string(),
                ));
            }
        }

        if self.milestones.channel.is_some() {
            if self.milestones.announce_channel.is_none() {
                return Err(ConfigError::Invalid(
                    "milestones.announce_channel is required when milestones.channel is set"
                        .to_string(),
                ));
            }
            if self.milestones.every == 0 {
                return Err(ConfigError::Invalid(
                    "milestones.every must be greater than zero".to_string(),
                ));
            }
        }

        if self.live_wins.channel.is_some() {
            if self.live_wins.log_channel.is_none() {
                return Err(ConfigError::Invalid(
                    "live_wins.log_channel is required when live_wins.channel is set".to_string(),
                ));
            }
            if self.live_wins.interval_seconds == 0 {
                return Err(ConfigError::Invalid(
                    "live_wins.interval_seconds must be greater than zero".to_string(),
                ));
            }
        }

        self.milestones.utc_offset()?;
        self.live_wins.utc_offset()?;
        self.cleanup.utc_offset()?;
        self.cleanup.parsed_schedule()?;
        Ok(())
    }
}

// ============================================================================
// DiscordSection
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordSection {
    /// Environment variable holding the bot token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Register slash commands in this guild only (instant) instead of globally.
    #[serde(default)]
    pub guild_id: Option<u64>,
}

impl Default for DiscordSection {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            guild_id: None,
        }
    }
}

fn default_token_env() -> String {
    "DISCORD_TOKEN".to_string()
}

// ============================================================================
// MirrorConfig
// ============================================================================

/// How the countdown line marks the deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownStyle {
    /// Platform-rendered relative timestamp (`<t:unix:R>`).
    #[default]
    Relative,
    /// Fixed label with the window length.
    Static,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    #[serde(default)]
    pub source_channels: HashSet<ChannelId>,
    #[serde(default)]
    pub target_channels: Vec<ChannelId>,
    #[serde(default = "default_window")]
    pub window_seconds: u64,
    #[serde(default = "default_animation_interval")]
    pub animation_interval_seconds: u64,
    /// Authors whose mirrors are neither animated nor given a countdown line.
    #[serde(default)]
    pub quiet_authors: HashSet<UserId>,
    /// Render `l`/`I` lookalike variants of each code.
    #[serde(default)]
    pub ambiguous_variants: bool,
    #[serde(default = "default_max_variants")]
    pub max_variants: usize,
    #[serde(default)]
    pub countdown: CountdownStyle,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            source_channels: HashSet::new(),
            target_channels: Vec::new(),
            window_seconds: default_window(),
            animation_interval_seconds: default_animation_interval(),
            quiet_authors: HashSet::new(),
            ambiguous_variants: false,
            max_variants: default_max_variants(),
            countdown: CountdownStyle::default(),
        }
    }
}

impl MirrorConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    pub fn animation_interval(&self) -> Duration {
        Duration::from_secs(self.animation_interval_seconds)
    }
}

fn default_window() -> u64 {
    240
}

fn default_animation_interval() -> u64 {
    15
}

fn default_max_variants() -> usize {
    4
}

// ============================================================================
// PacingConfig
// ============================================================================

/// Minimum spacing between consecutive outbound calls of one kind.
#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_send_ms")]
    pub send_ms: u64,
    #[serde(default = "default_edit_ms")]
    pub edit_ms: u64,
    #[serde(default = "default_delete_ms")]
    pub delete_ms: u64,
    #[serde(default = "default_reaction_ms")]
    pub reaction_ms: u64,
    #[serde(default = "default_sweep_delete_ms")]
    pub sweep_delete_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            send_ms: default_send_ms(),
            edit_ms: default_edit_ms(),
            delete_ms: default_delete_ms(),
            reaction_ms: default_reaction_ms(),
            sweep_delete_ms: default_sweep_delete_ms(),
        }
    }
}

impl PacingConfig {
    /// No spacing at all.
    pub fn unpaced() -> Self {
        Self {
            send_ms: 0,
            edit_ms: 0,
            delete_ms: 0,
            reaction_ms: 0,
            sweep_delete_ms: 0,
        }
    }
}

fn default_send_ms() -> u64 {
    250
}

fn default_edit_ms() -> u64 {
    250
}

fn default_delete_ms() -> u64 {
    250
}

fn default_reaction_ms() -> u64 {
    300
}

fn default_sweep_delete_ms() -> u64 {
    600
}

// ============================================================================
// AutoDeleteConfig
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AutoDeleteConfig {
    #[serde(default)]
    pub channels: HashSet<ChannelId>,
    #[serde(default)]
    pub target_bots: HashSet<UserId>,
    #[serde(default = "default_auto_delete_delay")]
    pub delay_seconds: u64,
}

impl Default for AutoDeleteConfig {
    fn default() -> Self {
        Self {
            channels: HashSet::new(),
            target_bots: HashSet::new(),
            delay_seconds: default_auto_delete_delay(),
        }
    }
}

fn default_auto_delete_delay() -> u64 {
    225
}

// ============================================================================
// ReactionsConfig
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReactionsConfig {
    #[serde(default)]
    pub countdown: CountdownReactionConfig,
    #[serde(default)]
    pub threshold: ThresholdConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountdownReactionConfig {
    #[serde(default)]
    pub channel: Option<ChannelId>,
    #[serde(default = "default_countdown_glyphs")]
    pub glyphs: Vec<String>,
    #[serde(default = "default_countdown_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_countdown_duration")]
    pub duration_seconds: u64,
}

impl Default for CountdownReactionConfig {
    fn default() -> Self {
        Self {
            channel: None,
            glyphs: default_countdown_glyphs(),
            interval_seconds: default_countdown_interval(),
            duration_seconds: default_countdown_duration(),
        }
    }
}

fn default_countdown_glyphs() -> Vec<String> {
    [
        "⚪", "⚪", "⚪", "🟢", "🟢", "🟢", "🟡", "🟡", "🟡", "⚠️", "‼️", "🚨", "🚫",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_countdown_interval() -> u64 {
    19
}

fn default_countdown_duration() -> u64 {
    250
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default)]
    pub channel: Option<ChannelId>,
    #[serde(default)]
    pub target_author: Option<UserId>,
    #[serde(default)]
    pub emoji_id: Option<u64>,
    #[serde(default = "default_reaction_threshold")]
    pub threshold: u64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            channel: None,
            target_author: None,
            emoji_id: None,
            threshold: default_reaction_threshold(),
        }
    }
}

fn default_reaction_threshold() -> u64 {
    4
}

// ============================================================================
// MilestoneConfig
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MilestoneConfig {
    #[serde(default)]
    pub channel: Option<ChannelId>,
    #[serde(default)]
    pub announce_channel: Option<ChannelId>,
    #[serde(default = "default_milestone_every")]
    pub every: u32,
    /// Offset of the local day boundary from UTC.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl Default for MilestoneConfig {
    fn default() -> Self {
        Self {
            channel: None,
            announce_channel: None,
            every: default_milestone_every(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

impl MilestoneConfig {
    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        offset_from_minutes("milestones", self.utc_offset_minutes)
    }
}

fn default_milestone_every() -> u32 {
    10
}

// ============================================================================
// LiveWinsConfig
// ============================================================================

/// Running count of today's human messages in `channel`, kept in a single
/// message in `log_channel`.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveWinsConfig {
    #[serde(default)]
    pub channel: Option<ChannelId>,
    #[serde(default)]
    pub log_channel: Option<ChannelId>,
    #[serde(default = "default_live_wins_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl Default for LiveWinsConfig {
    fn default() -> Self {
        Self {
            channel: None,
            log_channel: None,
            interval_seconds: default_live_wins_interval(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

impl LiveWinsConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        offset_from_minutes("live_wins", self.utc_offset_minutes)
    }
}

fn default_live_wins_interval() -> u64 {
    60
}

// ============================================================================
// CleanupConfig
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    /// Channels swept by the daily schedule.
    #[serde(default)]
    pub channels: Vec<ChannelId>,
    #[serde(default)]
    pub log_channel: Option<ChannelId>,
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
    /// Cron expression (seconds resolution) evaluated in the configured offset.
    #[serde(default = "default_cleanup_schedule")]
    pub schedule: String,
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    /// Roles allowed to run the manual cleanup command.
    #[serde(default)]
    pub authorized_roles: HashSet<RoleId>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            log_channel: None,
            max_age_hours: default_max_age_hours(),
            schedule: default_cleanup_schedule(),
            utc_offset_minutes: default_utc_offset_minutes(),
            authorized_roles: HashSet::new(),
        }
    }
}

impl CleanupConfig {
    /// How far back a sweep reaches. Saturates instead of overflowing.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours.saturating_mul(60 * 60))
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        offset_from_minutes("cleanup", self.utc_offset_minutes)
    }

    pub fn parsed_schedule(&self) -> Result<cron::Schedule, ConfigError> {
        cron::Schedule::from_str(&self.schedule).map_err(|e| {
            ConfigError::Invalid(format!("cleanup.schedule '{}': {}", self.schedule, e))
        })
    }
}

fn default_max_age_hours() -> u64 {
    24
}

fn default_cleanup_schedule() -> String {
    "0 0 0 * * *".to_string()
}

/// India Standard Time.
fn default_utc_offset_minutes() -> i32 {
    330
}

fn offset_from_minutes(section: &str, minutes: i32) -> Result<FixedOffset, ConfigError> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "{section}.utc_offset_minutes out of range: {minutes}"
            ))
        })
}

// ============================================================================
// ConfigError
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Tests
// ============================================================================
