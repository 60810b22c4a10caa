//! Illustration task queue.
//!
//! Story creation pushes one [`PageTask`] per inserted page; the dispatcher
//! drains the receiving end. The channel is unbounded because producers must
//! never block a request, and the dispatcher bounds the actual work.

use serde::Serialize;
use tokio::sync::mpsc;
use curico_core::types::DbId;
use curico_db::models::page::Page;

/// Request to illustrate one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PageTask {
    pub page_id: DbId,
    pub story_id: DbId,
}

impl From<&Page> for PageTask {
    fn from(page: &Page) -> Self {
        Self {
            page_id: page.id,
            story_id: page.story_id,
        }
    }
}

/// Producer side of the queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct IllustrationQueue {
    sender: mpsc::UnboundedSender<PageTask>,
}

/// Consumer side of the queue, owned by the dispatcher.
#[derive(Debug)]
pub struct IllustrationReceiver {
    receiver: mpsc::UnboundedReceiver<PageTask>,
}

impl IllustrationQueue {
    /// Create a connected producer/consumer pair.
    pub fn channel() -> (Self, IllustrationReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, IllustrationReceiver { receiver })
    }

    /// Enqueue one task. Returns `false` when the dispatcher is gone.
    pub fn enqueue(&self, task: PageTask) -> bool {
        self.sender.send(task).is_ok()
    }

    /// Enqueue every page in order. Returns how many were accepted.
    pub fn enqueue_pages(&self, pages: &[Page]) -> usize {
        let mut accepted = 0;
        for page in pages {
            if !self.enqueue(PageTask::from(page)) {
                tracing::warn!(
                    page_id = page.id,
                    story_id = page.story_id,
                    "Illustration queue closed, page left for the sweep",
                );
                break;
            }
            accepted += 1;
        }
        accepted
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl IllustrationReceiver {
    /// Wait for the next task. `None` once every producer is dropped.
    pub async fn recv(&mut self) -> Option<PageTask> {
        self.receiver.recv().await
    }

    /// Stop accepting new tasks; already queued ones can still be drained.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}
