//! Mirror lifecycle engine.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::oneshot;
use tracing::{debug, info};

use super::tasks;
use super::{EntryView, Registry, TrackedEntry};
use crate::config::{CountdownStyle, MirrorConfig};
use crate::event::{ChannelId, InboundMessage, MessageId};
use crate::extract::{extract, variants};
use crate::outbound::{Delivery, Gateway, OutboundError};
use crate::render::{CountdownMarker, StatusLine, render_mirror};

/// Bound on re-edits of one mirror when the entry keeps changing under it.
const MAX_EDITS_PER_MIRROR: usize = 3;

/// Drives every tracked entry from creation to teardown.
///
/// Cheap to clone; clones share the registry and gateway.
#[derive(Clone)]
pub struct MirrorEngine {
    registry: Registry,
    gateway: Gateway,
    config: Arc<MirrorConfig>,
}

impl MirrorEngine {
    pub fn new(gateway: Gateway, config: MirrorConfig) -> Self {
        Self {
            registry: Registry::new(),
            gateway,
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ========================================================================
    // Event entry points
    // ========================================================================

    /// Start tracking `msg` if it is a fresh human post with a code in a
    /// monitored channel. Returns `true` if an entry was created.
    pub async fn on_create(&self, msg: &InboundMessage) -> bool {
        if !msg.author.kind.is_human() || !self.config.source_channels.contains(&msg.channel) {
            return false;
        }

        let now = Utc::now();
        if msg.age(now) > self.config.window() {
            debug!(source = %msg.id, "Message older than window, not mirroring");
            return false;
        }

        let Some(code) = extract(&msg.content) else {
            return false;
        };

        let window = chrono::Duration::from_std(self.config.window())
            .unwrap_or_else(|_| chrono::Duration::zero());
        let deadline = msg.created_at + window;
        let quiet = self.config.quiet_authors.contains(&msg.author.id);
        let entry = TrackedEntry::new(code.clone(), self.variants_for(&code), deadline, quiet);
        let content = self.render(&entry.view());

        // Registered before any send so a racing delete always finds it.
        if !self.registry.create(msg.id, entry) {
            debug!(source = %msg.id, "Already tracked");
            return false;
        }

        info!(source = %msg.id, code = %code, "Tracking code");

        for &channel in &self.config.target_channels {
            self.send_mirror(msg.id, channel, &content).await;
        }

        self.arm(msg.id, quiet, deadline);
        true
    }

    /// Propagate a new code to the mirrors. Edits without a code, of stale
    /// messages, or of untracked messages change nothing.
    pub async fn on_edit(&self, msg: &InboundMessage) -> bool {
        if !self.registry.contains(msg.id) {
            return false;
        }
        if msg.age(Utc::now()) > self.config.window() {
            debug!(source = %msg.id, "Edit outside window, ignoring");
            return false;
        }
        let Some(code) = extract(&msg.content) else {
            debug!(source = %msg.id, "Edit without code, mirrors unchanged");
            return false;
        };

        let variants = self.variants_for(&code);
        let Some(view) = self.registry.set_code(msg.id, code, variants) else {
            return false;
        };
        debug!(source = %msg.id, code = %view.code, "Code updated");
        self.refresh_mirrors(msg.id).await;
        true
    }

    /// Tear down the entry for a deleted source. Returns the number of
    /// mirrors removed; zero if the entry was already gone.
    pub async fn on_delete(&self, source: MessageId) -> usize {
        self.teardown(source, "deleted").await
    }

    /// Tear down the entry when its deadline passes.
    pub async fn expire(&self, source: MessageId) -> usize {
        self.teardown(source, "expired").await
    }

    /// Tear down every live entry.
    pub async fn shutdown(&self) {
        let sources = self.registry.sources();
        if sources.is_empty() {
            return;
        }
        info!(count = sources.len(), "Removing live mirrors");
        for source in sources {
            self.teardown(source, "shutdown").await;
        }
    }

    // ========================================================================
    // Activities
    // ========================================================================

    /// One animation tick. Returns `false` once the entry is gone.
    pub(super) async fn animate(&self, source: MessageId) -> bool {
        if self.registry.toggle_phase(source).is_none() {
            return false;
        }
        self.refresh_mirrors(source).await;
        self.retry_pending(source).await;
        true
    }

    fn arm(&self, source: MessageId, quiet: bool, deadline: chrono::DateTime<Utc>) {
        let (expiry_tx, expiry_rx) = oneshot::channel();
        let (animation_tx, animation_rx) = if quiet {
            (None, None)
        } else {
            let (tx, rx) = oneshot::channel();
            (Some(tx), Some(rx))
        };

        if !self.registry.arm(source, animation_tx, expiry_tx) {
            debug!(source = %source, "Entry removed before activities started");
            return;
        }

        let remaining = (deadline - Utc::now()).to_std().unwrap_or_default();
        tasks::spawn_expiry_timer(self.clone(), source, remaining, expiry_rx);
        if let Some(rx) = animation_rx {
            tasks::spawn_animation_loop(self.clone(), source, self.config.animation_interval(), rx);
        }
    }

    async fn teardown(&self, source: MessageId, reason: &'static str) -> usize {
        let Some(entry) = self.registry.remove(source) else {
            return 0;
        };
        let mirrors = entry.release();

        let mut removed = 0;
        for mirror in mirrors {
            if let Ok(Delivery::Done) = self.gateway.delete(mirror).await {
                removed += 1;
            }
        }
        info!(source = %source, reason, removed, "Stopped tracking code");
        removed
    }

    /// Bring every mirror in line with the entry as it is now.
    ///
    /// Each edit renders from a fresh registry read. If the entry changed
    /// while that edit was in flight, the mirror is edited again, so a
    /// refresh started earlier never has the last word on a mirror.
    async fn refresh_mirrors(&self, source: MessageId) {
        let Some(view) = self.registry.get(source) else {
            return;
        };
        for mirror in view.mirrors {
            let Some(mut current) = self.registry.get(source) else {
                return;
            };
            for _ in 0..MAX_EDITS_PER_MIRROR {
                if !current.mirrors.contains(&mirror) {
                    break;
                }
                let content = self.render(&current);
                match self.gateway.edit(mirror, &content).await {
                    Ok(Delivery::Done) => {}
                    Ok(Delivery::Gone) => {
                        debug!(source = %source, mirror = %mirror, "Mirror vanished, forgetting it");
                        self.registry.drop_mirror(source, mirror);
                        break;
                    }
                    Err(_) => break,
                }

                // Torn down while the edit was in flight.
                let Some(latest) = self.registry.get(source) else {
                    return;
                };
                if self.render(&latest) == content {
                    break;
                }
                debug!(source = %source, mirror = %mirror, "Entry changed during edit, editing again");
                current = latest;
            }
        }
    }

    /// Send one mirror and attach it to the entry. A transient failure
    /// leaves the target pending for the next animation tick.
    async fn send_mirror(&self, source: MessageId, channel: ChannelId, content: &str) {
        match self.gateway.send(channel, content).await {
            Ok(mirror) => {
                if !self.registry.attach_mirror(source, mirror) {
                    debug!(source = %source, mirror = %mirror, "Entry removed while sending, retracting mirror");
                    let _ = self.gateway.delete(mirror).await;
                }
            }
            Err(OutboundError::Transient(_)) => self.registry.defer_target(source, channel),
            Err(_) => {}
        }
    }

    async fn retry_pending(&self, source: MessageId) {
        for channel in self.registry.take_pending(source) {
            let Some(view) = self.registry.get(source) else {
                return;
            };
            debug!(source = %source, channel = %channel, "Retrying mirror send");
            self.send_mirror(source, channel, &self.render(&view)).await;
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn variants_for(&self, code: &str) -> Vec<String> {
        if self.config.ambiguous_variants {
            variants(code, self.config.max_variants)
        } else {
            vec![code.to_string()]
        }
    }

    fn render(&self, view: &EntryView) -> String {
        let status = (!view.quiet).then(|| StatusLine {
            phase: view.phase,
            marker: match self.config.countdown {
                CountdownStyle::Relative => CountdownMarker::Relative(view.deadline),
                CountdownStyle::Static => CountdownMarker::Static(self.config.window()),
            },
        });
        render_mirror(&view.variants, status)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;
    use crate::config::PacingConfig;
    use crate::event::{Author, AuthorKind, ChannelId, MessageRef, UserId};
    use crate::outbound::OutboundError;
    use crate::testing::{Call, FakePlatform, human_message};

    const SOURCE: u64 = 100;
    const TARGET_A: u64 = 200;
    const TARGET_B: u64 = 201;

    fn config() -> MirrorConfig {
        MirrorConfig {
            source_channels: HashSet::from([ChannelId(SOURCE)]),
            target_channels: vec![ChannelId(TARGET_A), ChannelId(TARGET_B)],
            ..MirrorConfig::default()
        }
    }

    fn engine_with(config: MirrorConfig) -> (MirrorEngine, Arc<FakePlatform>) {
        let platform = Arc::new(FakePlatform::new());
        let gateway = Gateway::new(platform.clone(), &PacingConfig::unpaced());
        (MirrorEngine::new(gateway, config), platform)
    }

    fn engine() -> (MirrorEngine, Arc<FakePlatform>) {
        engine_with(config())
    }

    async fn settle(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    fn mirror_texts(platform: &FakePlatform) -> Vec<String> {
        [TARGET_A, TARGET_B]
            .into_iter()
            .flat_map(|ch| platform.live_in(ChannelId(ch)))
            .filter_map(|r| platform.content(r))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Guards
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn ignores_unmonitored_channel() {
        let (engine, platform) = engine();
        let msg = human_message(1, 999, 5, "abc12", 0);
        assert!(!engine.on_create(&msg).await);
        assert!(platform.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ignores_non_human_authors() {
        let (engine, platform) = engine();
        for kind in [
            AuthorKind::Myself,
            AuthorKind::Bot,
            AuthorKind::TargetBot,
            AuthorKind::Webhook,
        ] {
            let mut msg = human_message(1, SOURCE, 5, "abc12", 0);
            msg.author = Author::new(UserId(5), kind);
            assert!(!engine.on_create(&msg).await);
        }
        assert!(platform.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ignores_stale_message() {
        let (engine, platform) = engine();
        let msg = human_message(1, SOURCE, 5, "abc12", 300);
        assert!(!engine.on_create(&msg).await);
        assert!(engine.registry().is_empty());
        assert!(platform.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ignores_message_without_code() {
        let (engine, platform) = engine();
        let msg = human_message(1, SOURCE, 5, "hi all", 0);
        assert!(!engine.on_create(&msg).await);
        assert!(platform.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_create_is_ignored() {
        let (engine, platform) = engine();
        let msg = human_message(1, SOURCE, 5, "abc12", 0);
        assert!(engine.on_create(&msg).await);
        assert!(!engine.on_create(&msg).await);
        assert_eq!(platform.sends().len(), 2);
    }

    // -----------------------------------------------------------------------
    // Lifecycle scenarios
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn create_toggle_expire() {
        let (engine, platform) = engine();
        let msg = human_message(1, SOURCE, 5, "abc12", 0);

        assert!(engine.on_create(&msg).await);
        let sends = platform.sends();
        assert_eq!(sends.len(), 2);
        assert_eq!(sends[0].0, ChannelId(TARGET_A));
        assert_eq!(sends[1].0, ChannelId(TARGET_B));
        for (_, text) in &sends {
            assert!(text.starts_with("# `     abc12     `\n⏳ <t:"));
        }
        let view = engine.registry().get(MessageId(1)).unwrap();
        assert_eq!(view.mirrors.len(), 2);

        // First animation tick at t=15s.
        settle(16).await;
        let edits = platform.edits();
        assert_eq!(edits.len(), 2);
        assert!(edits.iter().all(|(_, text)| text.contains("🔚")));
        assert!(mirror_texts(&platform).iter().all(|t| t.contains("🔚")));

        // Second tick flips back.
        settle(15).await;
        assert!(mirror_texts(&platform).iter().all(|t| t.contains("⏳")));

        // Still alive just before the deadline.
        settle(200).await;
        assert!(engine.registry().contains(MessageId(1)));

        settle(15).await;
        assert!(engine.registry().is_empty());
        assert_eq!(platform.deletes().len(), 2);
        assert!(mirror_texts(&platform).is_empty());

        // Nothing keeps running afterwards.
        platform.clear_calls();
        settle(120).await;
        assert!(platform.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_before_first_tick() {
        let (engine, platform) = engine();
        let msg = human_message(1, SOURCE, 5, "abc12", 0);
        engine.on_create(&msg).await;

        settle(10).await;
        assert_eq!(engine.on_delete(MessageId(1)).await, 2);
        assert!(engine.registry().is_empty());
        assert_eq!(platform.deletes().len(), 2);

        // Neither the t=15 tick nor the t=240 expiry does anything.
        platform.clear_calls();
        settle(300).await;
        assert!(platform.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_is_idempotent() {
        let (engine, platform) = engine();
        engine
            .on_create(&human_message(1, SOURCE, 5, "abc12", 0))
            .await;

        assert_eq!(engine.on_delete(MessageId(1)).await, 2);
        assert_eq!(engine.on_delete(MessageId(1)).await, 0);
        assert_eq!(engine.expire(MessageId(1)).await, 0);
        assert_eq!(platform.deletes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_after_delete_is_a_no_op() {
        let (engine, platform) = engine();
        engine
            .on_create(&human_message(1, SOURCE, 5, "abc12", 0))
            .await;
        engine.on_delete(MessageId(1)).await;

        platform.clear_calls();
        assert_eq!(engine.expire(MessageId(1)).await, 0);
        assert!(platform.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_counts_from_message_creation() {
        let (engine, _platform) = engine();
        // Posted 200s ago, so only 40s remain.
        engine
            .on_create(&human_message(1, SOURCE, 5, "abc12", 200))
            .await;
        settle(35).await;
        assert!(engine.registry().contains(MessageId(1)));
        settle(10).await;
        assert!(engine.registry().is_empty());
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn edit_with_new_code_updates_mirrors_and_keeps_deadline() {
        let (engine, platform) = engine();
        let msg = human_message(1, SOURCE, 5, "abc12", 0);
        engine.on_create(&msg).await;
        let deadline = engine.registry().get(MessageId(1)).unwrap().deadline;

        settle(5).await;
        let mut edited = msg.clone();
        edited.content = "now it is QWE45".to_string();
        assert!(engine.on_edit(&edited).await);

        let view = engine.registry().get(MessageId(1)).unwrap();
        assert_eq!(view.code, "QWE45");
        assert_eq!(view.deadline, deadline);
        let texts = mirror_texts(&platform);
        assert_eq!(texts.len(), 2);
        assert!(texts.iter().all(|t| t.contains("QWE45")));

        // Still expires on the original schedule.
        settle(236).await;
        assert!(engine.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn edit_without_code_leaves_mirrors() {
        let (engine, platform) = engine();
        let msg = human_message(1, SOURCE, 5, "abc12", 0);
        engine.on_create(&msg).await;

        settle(100).await;
        platform.clear_calls();
        let mut edited = msg.clone();
        edited.content = "gone :)".to_string();
        assert!(!engine.on_edit(&edited).await);

        assert!(platform.edits().is_empty());
        assert_eq!(engine.registry().get(MessageId(1)).unwrap().code, "abc12");
        assert!(mirror_texts(&platform).iter().all(|t| t.contains("abc12")));
    }

    #[tokio::test(start_paused = true)]
    async fn edit_of_untracked_message_is_ignored() {
        let (engine, platform) = engine();
        let msg = human_message(1, SOURCE, 5, "abc12", 0);
        assert!(!engine.on_edit(&msg).await);
        assert!(platform.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_edit_is_ignored() {
        let (engine, platform) = engine();
        let msg = human_message(1, SOURCE, 5, "abc12", 230);
        engine.on_create(&msg).await;

        let mut edited = msg.clone();
        edited.content = "QWE45".to_string();
        edited.created_at = Utc::now() - chrono::Duration::seconds(250);
        platform.clear_calls();
        assert!(!engine.on_edit(&edited).await);
        assert!(platform.edits().is_empty());
    }

    // -----------------------------------------------------------------------
    // Failures
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn vanished_mirror_is_dropped() {
        let (engine, platform) = engine();
        engine
            .on_create(&human_message(1, SOURCE, 5, "abc12", 0))
            .await;
        let mirrors = engine.registry().get(MessageId(1)).unwrap().mirrors;
        platform.vanish(mirrors[0]);

        settle(16).await;
        let view = engine.registry().get(MessageId(1)).unwrap();
        assert_eq!(view.mirrors, vec![mirrors[1]]);

        // Teardown only deletes the surviving mirror.
        platform.clear_calls();
        assert_eq!(engine.on_delete(MessageId(1)).await, 1);
        assert_eq!(platform.deletes(), vec![mirrors[1]]);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_retries_next_tick() {
        let (engine, platform) = engine();
        engine
            .on_create(&human_message(1, SOURCE, 5, "abc12", 0))
            .await;
        let mirrors = engine.registry().get(MessageId(1)).unwrap().mirrors;
        platform.fail_target(mirrors[0], OutboundError::Transient("502".to_string()));

        settle(16).await;
        // The failing mirror is kept; the other one was still edited.
        assert_eq!(engine.registry().get(MessageId(1)).unwrap().mirrors.len(), 2);
        assert!(platform.content(mirrors[1]).unwrap().contains("🔚"));
        assert!(platform.content(mirrors[0]).unwrap().contains("⏳"));

        platform.heal_target(mirrors[0]);
        settle(30).await;
        let (a, b) = (
            platform.content(mirrors[0]).unwrap(),
            platform.content(mirrors[1]).unwrap(),
        );
        assert_eq!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_target_channel_does_not_block_others() {
        let (engine, platform) = engine();
        platform.remove_channel(ChannelId(TARGET_A));
        assert!(
            engine
                .on_create(&human_message(1, SOURCE, 5, "abc12", 0))
                .await
        );
        let view = engine.registry().get(MessageId(1)).unwrap();
        assert_eq!(view.mirrors.len(), 1);
        assert_eq!(view.mirrors[0].channel, ChannelId(TARGET_B));

        // Not found is final; the tick does not send there again.
        settle(16).await;
        assert_eq!(platform.sends().len(), 2);
        assert_eq!(engine.registry().get(MessageId(1)).unwrap().mirrors.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_send_failure_is_retried_on_next_tick() {
        let (engine, platform) = engine();
        platform.fail_next(OutboundError::Transient("502".to_string()));
        engine
            .on_create(&human_message(1, SOURCE, 5, "abc12", 0))
            .await;
        assert!(platform.live_in(ChannelId(TARGET_A)).is_empty());
        assert_eq!(engine.registry().get(MessageId(1)).unwrap().mirrors.len(), 1);

        settle(16).await;
        let view = engine.registry().get(MessageId(1)).unwrap();
        assert_eq!(view.mirrors.len(), 2);
        let late = platform.live_in(ChannelId(TARGET_A));
        assert_eq!(late.len(), 1);
        let text = platform.content(late[0]).unwrap();
        assert!(text.contains("abc12") && text.contains("🔚"));

        // Sent once, then animated like the others.
        settle(15).await;
        assert_eq!(platform.sends().len(), 3);
        assert_eq!(engine.on_delete(MessageId(1)).await, 2);
        assert!(mirror_texts(&platform).is_empty());
    }

    // -----------------------------------------------------------------------
    // Rendering modes
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn quiet_author_gets_no_countdown_or_animation() {
        let mut config = config();
        config.quiet_authors.insert(UserId(5));
        let (engine, platform) = engine_with(config);

        engine
            .on_create(&human_message(1, SOURCE, 5, "abc12", 0))
            .await;
        assert!(
            platform
                .sends()
                .iter()
                .all(|(_, text)| text == "# `     abc12     `")
        );

        settle(60).await;
        assert!(platform.edits().is_empty());

        settle(200).await;
        assert!(engine.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ambiguous_codes_render_numbered_variants() {
        let mut config = config();
        config.ambiguous_variants = true;
        config.target_channels = vec![ChannelId(TARGET_A)];
        let (engine, platform) = engine_with(config);

        engine
            .on_create(&human_message(1, SOURCE, 5, "ab1lc", 0))
            .await;
        let (_, text) = &platform.sends()[0];
        assert!(text.starts_with("# 1. `     ab1lc     `\n# 2. `     ab1Ic     `\n⏳"));
    }

    #[tokio::test(start_paused = true)]
    async fn static_countdown_marker() {
        let mut config = config();
        config.countdown = CountdownStyle::Static;
        config.target_channels = vec![ChannelId(TARGET_A)];
        let (engine, platform) = engine_with(config);

        engine
            .on_create(&human_message(1, SOURCE, 5, "abc12", 0))
            .await;
        assert_eq!(platform.sends()[0].1, "# `     abc12     `\n⏳ `4:00`");
    }

    // -----------------------------------------------------------------------
    // Shutdown & races
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn shutdown_removes_everything() {
        let (engine, platform) = engine();
        for id in 1..=3 {
            engine
                .on_create(&human_message(id, SOURCE, 5, "abc12", 0))
                .await;
        }
        assert_eq!(engine.registry().len(), 3);

        engine.shutdown().await;
        assert!(engine.registry().is_empty());
        assert_eq!(platform.deletes().len(), 6);

        platform.clear_calls();
        settle(300).await;
        assert!(platform.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn re_posted_code_after_expiry_starts_fresh() {
        let (engine, platform) = engine();
        engine
            .on_create(&human_message(1, SOURCE, 5, "abc12", 0))
            .await;
        settle(241).await;
        assert!(engine.registry().is_empty());

        assert!(
            engine
                .on_create(&human_message(2, SOURCE, 5, "abc12", 0))
                .await
        );
        assert_eq!(platform.sends().len(), 4);
        let view = engine.registry().get(MessageId(2)).unwrap();
        assert_eq!(view.phase, crate::render::Phase::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn edit_during_slow_tick_wins() {
        let (engine, platform) = engine();
        platform.slow_edits_containing("abc12", Duration::from_secs(3));
        let msg = human_message(1, SOURCE, 5, "abc12", 0);
        engine.on_create(&msg).await;

        // The t=15 tick is still editing the first mirror.
        settle(16).await;
        assert_eq!(platform.edits().len(), 1);

        let mut edited = msg.clone();
        edited.content = "QWE45".to_string();
        assert!(engine.on_edit(&edited).await);

        settle(6).await;
        assert_eq!(engine.registry().get(MessageId(1)).unwrap().code, "QWE45");
        let texts = mirror_texts(&platform);
        assert_eq!(texts.len(), 2);
        for text in &texts {
            assert!(text.contains("QWE45"), "stale mirror: {text:?}");
        }
        // The last edit of every mirror carries the new code.
        let mirrors = engine.registry().get(MessageId(1)).unwrap().mirrors;
        for mirror in mirrors {
            let last = platform
                .edits()
                .into_iter()
                .rfind(|(target, _)| *target == mirror)
                .unwrap();
            assert!(last.1.contains("QWE45"));
        }
        assert_eq!(platform.sends().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_during_slow_tick_leaves_nothing() {
        let (engine, platform) = engine();
        platform.slow_edits_containing("abc12", Duration::from_secs(3));
        engine
            .on_create(&human_message(1, SOURCE, 5, "abc12", 0))
            .await;

        settle(16).await;
        assert_eq!(platform.edits().len(), 1);
        assert_eq!(engine.on_delete(MessageId(1)).await, 2);

        // The in-flight edit lands on a deleted mirror and nothing follows.
        settle(60).await;
        assert!(engine.registry().is_empty());
        assert!(mirror_texts(&platform).is_empty());
        let calls = platform.calls();
        let first_delete = calls
            .iter()
            .position(|c| matches!(c, Call::Delete(_)))
            .unwrap();
        assert!(
            calls[first_delete..]
                .iter()
                .all(|c| matches!(c, Call::Delete(_))),
            "calls after teardown: {:?}",
            &calls[first_delete..]
        );
        assert_eq!(platform.sends().len(), 2);
        assert_eq!(platform.edits().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn many_entries_run_independently() {
        let (engine, platform) = engine();
        engine
            .on_create(&human_message(1, SOURCE, 5, "abc12", 0))
            .await;
        settle(5).await;
        engine
            .on_create(&human_message(2, SOURCE, 6, "def34", 0))
            .await;

        engine.on_delete(MessageId(1)).await;
        settle(20).await;

        // Only the second entry's mirrors were animated.
        let second: Vec<MessageRef> = engine.registry().get(MessageId(2)).unwrap().mirrors;
        let edited: HashSet<MessageRef> = platform.edits().into_iter().map(|(r, _)| r).collect();
        assert_eq!(edited, second.into_iter().collect());
    }
}
