use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::review::{ReviewMode, SessionPhase};
use crate::storage::{Word, WordId, WordStats};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum VocabEvent {
    #[serde(rename = "WORD_ADDED")]
    WordAdded { word: Word },

    #[serde(rename = "WORD_LEARNED")]
    WordLearned {
        id: WordId,
        last_reviewed: Option<DateTime<Utc>>,
    },

    #[serde(rename = "WORD_RESET")]
    WordReset { id: WordId },

    #[serde(rename = "WORD_DELETED")]
    WordDeleted { id: WordId },

    #[serde(rename = "STATS_CHANGED")]
    StatsChanged { stats: WordStats },

    #[serde(rename = "SESSION_STATE_CHANGED")]
    SessionStateChanged {
        mode: ReviewMode,
        phase: SessionPhase,
    },
}

impl VocabEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            VocabEvent::WordAdded { .. } => "WORD_ADDED",
            VocabEvent::WordLearned { .. } => "WORD_LEARNED",
            VocabEvent::WordReset { .. } => "WORD_RESET",
            VocabEvent::WordDeleted { .. } => "WORD_DELETED",
            VocabEvent::StatsChanged { .. } => "STATS_CHANGED",
            VocabEvent::SessionStateChanged { .. } => "SESSION_STATE_CHANGED",
        }
    }

    pub fn word_id(&self) -> Option<WordId> {
        match self {
            VocabEvent::WordAdded { word } => Some(word.id),
            VocabEvent::WordLearned { id, .. }
            | VocabEvent::WordReset { id }
            | VocabEvent::WordDeleted { id } => Some(*id),
            VocabEvent::StatsChanged { .. } | VocabEvent::SessionStateChanged { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub id: String,
    pub event: VocabEvent,
    pub created_at: DateTime<Utc>,
}

impl EventEnvelope {
    pub fn new(event: VocabEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event,
            created_at: Utc::now(),
        }
    }
}

/// 进程内事件总线，供界面层订阅状态变化
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    event_count: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            event_count: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: VocabEvent) {
        let envelope = EventEnvelope::new(event);
        let event_type = envelope.event.event_type();

        self.event_count.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(envelope) {
            Ok(sent_to) => debug!(event_type, sent_to, "Event published"),
            Err(_) => debug!(event_type, "No subscribers for event"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(VocabEvent::WordDeleted { id: 3 });

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event, VocabEvent::WordDeleted { id: 3 });
        assert_eq!(envelope.event.word_id(), Some(3));
        assert_eq!(bus.event_count(), 1);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        bus.publish(VocabEvent::StatsChanged {
            stats: WordStats::new(1, 0),
        });
        assert_eq!(bus.event_count(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serialization() {
        let event = VocabEvent::SessionStateChanged {
            mode: ReviewMode::Quiz,
            phase: SessionPhase::Finished,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SESSION_STATE_CHANGED");
        assert_eq!(json["payload"]["mode"], "quiz");
        assert_eq!(json["payload"]["phase"], "finished");

        let back: VocabEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
