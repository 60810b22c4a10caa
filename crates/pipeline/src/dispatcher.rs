//! Background illustration dispatcher.
//!
//! Consumes the in-process illustration queue and, every `poll_interval`,
//! sweeps the database for pending pages nobody has claimed (recovery after
//! a restart, or the only source of work in a standalone worker). Each page
//! runs as its own Tokio task; a semaphore bounds concurrent image calls.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use curico_core::types::DbId;
use curico_events::{IllustrationReceiver, PageTask};

use crate::illustrate::{IllustrationOutcome, Illustrator};
use crate::store::PageStore;

/// Default number of concurrent illustrations.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Placeholder period for a disabled sweep ticker.
const IDLE_TICK: Duration = Duration::from_secs(3600);

/// Maximum pages picked up per sweep.
const SWEEP_BATCH: i64 = 100;

/// Background illustration dispatcher.
pub struct IllustrationDispatcher {
    illustrator: Arc<Illustrator>,
    store: Arc<dyn PageStore>,
    poll_interval: Option<Duration>,
    permits: Arc<Semaphore>,
    in_flight: Arc<Mutex<HashSet<DbId>>>,
    tracker: TaskTracker,
}

/// Removes a page id from the in-flight set when the task ends.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<DbId>>>,
    page_id: DbId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.page_id);
        }
    }
}

impl IllustrationDispatcher {
    /// `poll_interval` of `None` disables the database sweep.
    pub fn new(
        illustrator: Arc<Illustrator>,
        store: Arc<dyn PageStore>,
        concurrency: usize,
        poll_interval: Option<Duration>,
    ) -> Self {
        Self {
            illustrator,
            store,
            poll_interval,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            tracker: TaskTracker::new(),
        }
    }

    /// Run the dispatcher loop until the cancellation token is triggered
    /// or both work sources are gone.
    ///
    /// Pass `None` for `queue` to run in sweep-only mode.
    pub async fn run(&self, mut queue: Option<IllustrationReceiver>, cancel: CancellationToken) {
        let mut queue_open = queue.is_some();
        let sweep_enabled = self.poll_interval.is_some();
        // Never polled when the sweep is disabled.
        let mut ticker = tokio::time::interval(self.poll_interval.unwrap_or(IDLE_TICK));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            queue = queue_open,
            poll_interval_secs = self.poll_interval.map(|d| d.as_secs()),
            concurrency = self.permits.available_permits(),
            "Illustration dispatcher started",
        );

        loop {
            if !queue_open && !sweep_enabled {
                tracing::info!("Illustration queue closed and sweep disabled");
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Illustration dispatcher shutting down");
                    break;
                }
                task = next_task(&mut queue), if queue_open => match task {
                    Some(task) => {
                        self.schedule(task);
                    }
                    None => {
                        tracing::info!("Illustration queue closed");
                        queue_open = false;
                    }
                },
                _ = ticker.tick(), if sweep_enabled => {
                    if let Err(e) = self.sweep().await {
                        tracing::error!(error = %e, "Illustration sweep failed");
                    }
                }
            }
        }

        if let Some(queue) = queue.as_mut() {
            queue.close();
        }
        self.tracker.close();
    }

    /// Wait for in-flight illustrations. Returns `false` on timeout.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok()
    }

    /// Number of pages currently scheduled or running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// One sweep: schedule every claimable page not already in flight.
    pub async fn sweep(&self) -> Result<usize, sqlx::Error> {
        let pages = self.store.claimable_pages(SWEEP_BATCH).await?;
        let mut scheduled = 0;
        for page in &pages {
            if self.schedule(PageTask::from(page)) {
                scheduled += 1;
            }
        }
        if scheduled > 0 {
            tracing::info!(scheduled, "Sweep scheduled pending pages");
        }
        Ok(scheduled)
    }

    /// Spawn an illustration task unless the page is already in flight.
    pub fn schedule(&self, task: PageTask) -> bool {
        let guard = {
            let Ok(mut set) = self.in_flight.lock() else {
                return false;
            };
            if !set.insert(task.page_id) {
                tracing::debug!(page_id = task.page_id, "Page already in flight");
                return false;
            }
            InFlightGuard {
                set: Arc::clone(&self.in_flight),
                page_id: task.page_id,
            }
        };

        let illustrator = Arc::clone(&self.illustrator);
        let permits = Arc::clone(&self.permits);
        self.tracker.spawn(async move {
            let _guard = guard;
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            match illustrator.illustrate_by_id(task.page_id).await {
                Ok(IllustrationOutcome::Completed { .. }) => {}
                Ok(IllustrationOutcome::Skipped(reason)) => {
                    tracing::debug!(page_id = task.page_id, reason = reason.message(), "Illustration skipped");
                }
                Err(e) => {
                    tracing::warn!(
                        page_id = task.page_id,
                        story_id = task.story_id,
                        error = %e,
                        "Illustration task failed",
                    );
                }
            }
        });
        true
    }
}

async fn next_task(queue: &mut Option<IllustrationReceiver>) -> Option<PageTask> {
    match queue.as_mut() {
        Some(queue) => queue.recv().await,
        None => std::future::pending().await,
    }
}
