//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the change notifier for the pipeline. It is shared via
//! `Arc<EventBus>` between the story generator, the illustrator and the
//! WebSocket relay.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use curico_core::types::DbId;
use curico_db::models::page::Page;

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// Something that happened to a story or one of its pages.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Story and page rows were committed.
    StoryCreated {
        story_id: DbId,
        owner_id: DbId,
        page_count: usize,
        timestamp: DateTime<Utc>,
    },
    /// A page row was updated (completed, failed or reset for retry).
    PageUpdated {
        story_id: DbId,
        page: Page,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    pub fn story_created(story_id: DbId, owner_id: DbId, page_count: usize) -> Self {
        Self::StoryCreated {
            story_id,
            owner_id,
            page_count,
            timestamp: Utc::now(),
        }
    }

    pub fn page_updated(page: Page) -> Self {
        Self::PageUpdated {
            story_id: page.story_id,
            page,
            timestamp: Utc::now(),
        }
    }

    /// The story this event belongs to.
    pub fn story_id(&self) -> DbId {
        match self {
            Self::StoryCreated { story_id, .. } | Self::PageUpdated { story_id, .. } => *story_id,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`PipelineEvent`].
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    /// Page rows stay the source of truth; the status endpoint covers
    /// anything a subscriber missed.
    pub fn publish(&self, event: PipelineEvent) {
        // Ignore the SendError, it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
