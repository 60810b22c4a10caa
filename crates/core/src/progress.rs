//! Story generation progress tracking.
//!
//! [`ProgressTracker`] is a small state machine fed by page update
//! notifications. Clients drive it from the WebSocket stream; the server
//! builds the same state from database rows to answer status requests.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where a story is in the generation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    Idle,
    GeneratingText,
    GeneratingImages,
    Ready,
}

impl GenerationPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::GeneratingText => "generating_text",
            Self::GeneratingImages => "generating_images",
            Self::Ready => "ready",
        }
    }
}

/// The fields of a page row the tracker cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageUpdate {
    pub page_id: DbId,
    pub story_id: DbId,
    pub image_url: Option<String>,
    /// The page moved to the error status.
    pub is_error: bool,
}

/// Point-in-time view of a tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub story_id: Option<DbId>,
    pub phase: GenerationPhase,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub percentage: u8,
    /// Every page is either complete or failed.
    pub finished: bool,
}

/// Rounded completion percentage. Returns 0 when `total` is 0.
pub fn completion_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (completed.min(total) as f64 / total as f64 * 100.0).round();
    pct as u8
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Counts illustrated pages of one story.
///
/// Completed and failed pages are tracked by id, so replayed or duplicated
/// notifications never inflate the counts.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    phase: GenerationPhase,
    story_id: Option<DbId>,
    total: usize,
    completed: HashSet<DbId>,
    failed: HashSet<DbId>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            phase: GenerationPhase::Idle,
            story_id: None,
            total: 0,
            completed: HashSet::new(),
            failed: HashSet::new(),
        }
    }

    /// Rebuild tracker state from the current page rows of a story.
    ///
    /// Used when a client reloads mid-generation and needs to resume from
    /// the synchronous status endpoint instead of the event stream.
    pub fn from_snapshot(story_id: DbId, pages: &[PageUpdate]) -> Self {
        let own: Vec<&PageUpdate> = pages.iter().filter(|p| p.story_id == story_id).collect();
        let mut tracker = Self {
            phase: GenerationPhase::GeneratingImages,
            story_id: Some(story_id),
            total: own.len(),
            completed: HashSet::new(),
            failed: HashSet::new(),
        };
        for page in own {
            tracker.record(page);
        }
        tracker.promote_if_done();
        tracker
    }

    /// Quiz submitted: `idle -> generating_text`.
    pub fn submit(&mut self) -> Result<(), CoreError> {
        self.expect_phase(GenerationPhase::Idle, "submit")?;
        self.phase = GenerationPhase::GeneratingText;
        Ok(())
    }

    /// Story text stored: `generating_text -> generating_images`.
    pub fn text_generated(&mut self, story_id: DbId, page_count: usize) -> Result<(), CoreError> {
        self.expect_phase(GenerationPhase::GeneratingText, "text_generated")?;
        self.story_id = Some(story_id);
        self.total = page_count;
        self.completed.clear();
        self.failed.clear();
        self.phase = GenerationPhase::GeneratingImages;
        self.promote_if_done();
        Ok(())
    }

    /// Story text failed: `generating_text -> idle`.
    pub fn text_failed(&mut self) -> Result<(), CoreError> {
        self.expect_phase(GenerationPhase::GeneratingText, "text_failed")?;
        self.phase = GenerationPhase::Idle;
        Ok(())
    }

    /// Apply one page notification. Returns `true` when the counts changed.
    ///
    /// Updates for other stories, or received outside `generating_images`,
    /// are ignored.
    pub fn apply(&mut self, update: &PageUpdate) -> bool {
        if self.phase != GenerationPhase::GeneratingImages
            || self.story_id != Some(update.story_id)
        {
            return false;
        }
        let changed = self.record(update);
        self.promote_if_done();
        changed
    }

    /// Stop tracking and return to `idle`.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn phase(&self) -> GenerationPhase {
        self.phase
    }

    pub fn story_id(&self) -> Option<DbId> {
        self.story_id
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed.len()
    }

    pub fn failed(&self) -> usize {
        self.failed.len()
    }

    pub fn percentage(&self) -> u8 {
        completion_percentage(self.completed.len(), self.total)
    }

    /// Whether the reader can be opened.
    pub fn is_ready(&self) -> bool {
        self.phase == GenerationPhase::Ready
    }

    /// Every page has reached a terminal status, successful or not.
    pub fn is_finished(&self) -> bool {
        self.total > 0 && self.completed.len() + self.failed.len() >= self.total
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let completed = self.completed.len();
        let failed = self.failed.len();
        ProgressSnapshot {
            story_id: self.story_id,
            phase: self.phase,
            total: self.total,
            completed,
            failed,
            pending: self.total.saturating_sub(completed + failed),
            percentage: self.percentage(),
            finished: self.is_finished(),
        }
    }

    fn record(&mut self, update: &PageUpdate) -> bool {
        if update.image_url.is_some() {
            self.failed.remove(&update.page_id);
            self.completed.insert(update.page_id)
        } else if update.is_error {
            !self.completed.contains(&update.page_id) && self.failed.insert(update.page_id)
        } else {
            // Back to pending after a manual retry.
            self.failed.remove(&update.page_id)
        }
    }

    fn promote_if_done(&mut self) {
        if self.phase == GenerationPhase::GeneratingImages
            && self.total > 0
            && self.completed.len() >= self.total
        {
            self.phase = GenerationPhase::Ready;
        }
    }

    fn expect_phase(&self, expected: GenerationPhase, action: &str) -> Result<(), CoreError> {
        if self.phase != expected {
            return Err(CoreError::Conflict(format!(
                "Cannot {action} while {}",
                self.phase.as_str()
            )));
        }
        Ok(())
    }
}
