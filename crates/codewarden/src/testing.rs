//! In-memory platform used by unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::event::{
    Author, AuthorKind, ChannelId, Emoji, InboundMessage, MessageId, MessageRef, UserId,
};
use crate::outbound::{HistoryMessage, OutboundError, Platform};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send(ChannelId, String),
    Edit(MessageRef, String),
    Delete(MessageRef),
    AddReaction(MessageRef, Emoji),
    RemoveReaction(MessageRef, Emoji),
    History(ChannelId),
}

#[derive(Default)]
struct FakeState {
    next_id: u64,
    live: HashMap<MessageRef, String>,
    calls: Vec<Call>,
    fail_next: VecDeque<OutboundError>,
    failing_targets: HashMap<MessageRef, OutboundError>,
    missing_channels: HashSet<ChannelId>,
    history: HashMap<ChannelId, Vec<HistoryMessage>>,
    slow_edits: Vec<(String, Duration)>,
}

/// Records every call and keeps message contents so edits after deletes
/// surface as not-found, like a real platform.
pub struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_id: 10_000,
                ..FakeState::default()
            }),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn sends(&self) -> Vec<(ChannelId, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send(ch, text) => Some((ch, text)),
                _ => None,
            })
            .collect()
    }

    pub fn edits(&self) -> Vec<(MessageRef, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Edit(target, text) => Some((target, text)),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<MessageRef> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(target) => Some(target),
                _ => None,
            })
            .collect()
    }

    pub fn content(&self, target: MessageRef) -> Option<String> {
        self.state.lock().unwrap().live.get(&target).cloned()
    }

    pub fn live_in(&self, channel: ChannelId) -> Vec<MessageRef> {
        let mut refs: Vec<_> = self
            .state
            .lock()
            .unwrap()
            .live
            .keys()
            .filter(|r| r.channel == channel)
            .copied()
            .collect();
        refs.sort_by_key(|r| r.message);
        refs
    }

    /// Fail the next call, whatever it is.
    pub fn fail_next(&self, error: OutboundError) {
        self.state.lock().unwrap().fail_next.push_back(error);
    }

    /// Fail every edit/delete/reaction against `target`.
    pub fn fail_target(&self, target: MessageRef, error: OutboundError) {
        self.state
            .lock()
            .unwrap()
            .failing_targets
            .insert(target, error);
    }

    pub fn heal_target(&self, target: MessageRef) {
        self.state.lock().unwrap().failing_targets.remove(&target);
    }

    /// Edits whose text contains `needle` take `delay` to land. The call is
    /// recorded when it starts; the content changes when it finishes.
    pub fn slow_edits_containing(&self, needle: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .slow_edits
            .push((needle.to_string(), delay));
    }

    fn edit_delay(&self, content: &str) -> Option<Duration> {
        self.state
            .lock()
            .unwrap()
            .slow_edits
            .iter()
            .find(|(needle, _)| content.contains(needle.as_str()))
            .map(|(_, delay)| *delay)
    }

    pub fn remove_channel(&self, channel: ChannelId) {
        self.state.lock().unwrap().missing_channels.insert(channel);
    }

    /// Make `target` vanish without going through the platform calls.
    pub fn vanish(&self, target: MessageRef) {
        self.state.lock().unwrap().live.remove(&target);
    }

    pub fn seed_history(&self, channel: ChannelId, messages: Vec<HistoryMessage>) {
        let mut state = self.state.lock().unwrap();
        for msg in &messages {
            state.live.insert(msg.reference, String::new());
        }
        state.history.entry(channel).or_default().extend(messages);
    }

    fn begin(&self, call: Call, target: Option<MessageRef>) -> Result<(), OutboundError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if let Some(err) = state.fail_next.pop_front() {
            return Err(err);
        }
        if let Some(target) = target
            && let Some(err) = state.failing_targets.get(&target)
        {
            return Err(err.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn send_message(
        &self,
        channel: ChannelId,
        content: &str,
    ) -> Result<MessageRef, OutboundError> {
        self.begin(Call::Send(channel, content.to_string()), None)?;
        let mut state = self.state.lock().unwrap();
        if state.missing_channels.contains(&channel) {
            return Err(OutboundError::NotFound);
        }
        state.next_id += 1;
        let reference = MessageRef::new(channel, MessageId(state.next_id));
        state.live.insert(reference, content.to_string());
        Ok(reference)
    }

    async fn edit_message(&self, target: MessageRef, content: &str) -> Result<(), OutboundError> {
        self.begin(Call::Edit(target, content.to_string()), Some(target))?;
        if let Some(delay) = self.edit_delay(content) {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        match state.live.get_mut(&target) {
            Some(existing) => {
                *existing = content.to_string();
                Ok(())
            }
            None => Err(OutboundError::NotFound),
        }
    }

    async fn delete_message(&self, target: MessageRef) -> Result<(), OutboundError> {
        self.begin(Call::Delete(target), Some(target))?;
        let mut state = self.state.lock().unwrap();
        match state.live.remove(&target) {
            Some(_) => Ok(()),
            None => Err(OutboundError::NotFound),
        }
    }

    async fn add_reaction(&self, target: MessageRef, emoji: &Emoji) -> Result<(), OutboundError> {
        self.begin(Call::AddReaction(target, emoji.clone()), Some(target))?;
        if self.state.lock().unwrap().live.contains_key(&target) {
            Ok(())
        } else {
            Err(OutboundError::NotFound)
        }
    }

    async fn remove_reaction(
        &self,
        target: MessageRef,
        emoji: &Emoji,
    ) -> Result<(), OutboundError> {
        self.begin(Call::RemoveReaction(target, emoji.clone()), Some(target))?;
        if self.state.lock().unwrap().live.contains_key(&target) {
            Ok(())
        } else {
            Err(OutboundError::NotFound)
        }
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryMessage>, OutboundError> {
        self.begin(Call::History(channel), None)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .history
            .get(&channel)
            .map(|msgs| {
                msgs.iter()
                    .filter(|m| m.created_at >= since && state.live.contains_key(&m.reference))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// A human message posted `age_secs` ago.
pub fn human_message(id: u64, channel: u64, author: u64, content: &str, age_secs: i64) -> InboundMessage {
    InboundMessage {
        id: MessageId(id),
        channel: ChannelId(channel),
        author: Author::new(UserId(author), AuthorKind::Human),
        content: content.to_string(),
        created_at: Utc::now() - chrono::Duration::seconds(age_secs),
    }
}
