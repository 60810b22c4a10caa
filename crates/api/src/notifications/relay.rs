//! Relays page updates from the event bus to subscribed sockets.
//!
//! [`PageRelay`] is the realtime half of the change notifier: every page
//! row update published on the [`EventBus`](curico_events::EventBus) is
//! forwarded as a `page_updated` frame to the connections watching that
//! story.

use std::sync::Arc;

use curico_events::PipelineEvent;
use tokio::sync::broadcast;

use crate::ws::{messages, WsManager};

pub struct PageRelay {
    ws_manager: Arc<WsManager>,
}

impl PageRelay {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the relay loop.
    ///
    /// Exits when the channel is closed, i.e. every
    /// [`EventBus`](curico_events::EventBus) handle has been dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<PipelineEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.relay(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Clients recover through the status snapshot.
                    tracing::warn!(skipped = n, "Page relay lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, page relay shutting down");
                    break;
                }
            }
        }
    }

    async fn relay(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::PageUpdated { story_id, page, .. } => {
                let sent = self
                    .ws_manager
                    .send_to_story(*story_id, messages::page_updated(page))
                    .await;
                tracing::debug!(story_id, page_id = page.id, sent, "Page update relayed");
            }
            PipelineEvent::StoryCreated { .. } => {}
        }
    }
}
