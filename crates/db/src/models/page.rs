//! Page entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use curico_core::progress::PageUpdate;
use curico_core::types::{DbId, Timestamp};

use super::status::{PageStatus, StatusId};

/// A row from the `pages` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Page {
    pub id: DbId,
    pub story_id: DbId,
    pub page_num: i32,
    pub content_text: String,
    pub image_url: Option<String>,
    pub status_id: StatusId,
    pub error_message: Option<String>,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Page {
    pub fn status(&self) -> Option<PageStatus> {
        PageStatus::from_id(self.status_id)
    }

    /// Already illustrated: complete, or carrying an image.
    pub fn is_processed(&self) -> bool {
        self.image_url.is_some() || self.status_id == PageStatus::Complete.id()
    }

    /// The view of this row the progress tracker consumes.
    pub fn progress_update(&self) -> PageUpdate {
        PageUpdate {
            page_id: self.id,
            story_id: self.story_id,
            image_url: self.image_url.clone(),
            is_error: self.status_id == PageStatus::Error.id(),
        }
    }
}

/// A page record as delivered to the illustration webhook.
///
/// Only the identifiers are required; the guard fields may be missing when
/// the caller forwards a freshly inserted row.
#[derive(Debug, Clone, Deserialize)]
pub struct PageRecord {
    pub id: DbId,
    pub story_id: DbId,
    #[serde(default)]
    pub page_num: Option<i32>,
    #[serde(default)]
    pub content_text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status_id: Option<StatusId>,
    /// Status by name (`pending`, `complete`, `error`), as some callers
    /// send it instead of the id.
    #[serde(default)]
    pub status: Option<String>,
}

impl PageRecord {
    /// Same guard as [`Page::is_processed`], applied to the incoming record.
    pub fn is_processed(&self) -> bool {
        self.image_url.is_some()
            || self.status_id == Some(PageStatus::Complete.id())
            || self.status.as_deref() == Some(PageStatus::Complete.as_str())
    }
}

impl From<&Page> for PageRecord {
    fn from(page: &Page) -> Self {
        Self {
            id: page.id,
            story_id: page.story_id,
            page_num: Some(page.page_num),
            content_text: Some(page.content_text.clone()),
            image_url: page.image_url.clone(),
            status_id: Some(page.status_id),
            status: page.status().map(|s| s.as_str().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(status: PageStatus, image_url: Option<&str>) -> Page {
        let now = chrono::Utc::now();
        Page {
            id: 11,
            story_id: 3,
            page_num: 1,
            content_text: "Luna looked up at the stars.".to_string(),
            image_url: image_url.map(str::to_string),
            status_id: status.id(),
            error_message: None,
            claimed_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn pending_page_without_image_is_not_processed() {
        let p = page(PageStatus::Pending, None);
        assert!(!p.is_processed());
        assert!(!PageRecord::from(&p).is_processed());
    }

    #[test]
    fn image_or_complete_status_means_processed() {
        assert!(page(PageStatus::Pending, Some("https://x/3/11.png")).is_processed());
        assert!(page(PageStatus::Complete, Some("https://x/3/11.png")).is_processed());

        let record = PageRecord {
            id: 11,
            story_id: 3,
            page_num: None,
            content_text: None,
            image_url: None,
            status_id: Some(PageStatus::Complete.id()),
            status: None,
        };
        assert!(record.is_processed());
    }

    #[test]
    fn record_with_complete_status_name_is_processed() {
        let record: PageRecord = serde_json::from_value(serde_json::json!({
            "id": 5,
            "story_id": 2,
            "status": "complete"
        }))
        .unwrap();
        assert!(record.is_processed());

        let pending: PageRecord = serde_json::from_value(serde_json::json!({
            "id": 5,
            "story_id": 2,
            "status": "pending"
        }))
        .unwrap();
        assert!(!pending.is_processed());
    }

    #[test]
    fn error_page_maps_to_error_update() {
        let update = page(PageStatus::Error, None).progress_update();
        assert!(update.is_error);
        assert_eq!(update.page_id, 11);
        assert_eq!(update.story_id, 3);
    }

    #[test]
    fn record_deserializes_with_only_ids() {
        let record: PageRecord =
            serde_json::from_value(serde_json::json!({ "id": 5, "story_id": 2 })).unwrap();
        assert_eq!(record.id, 5);
        assert!(record.content_text.is_none());
        assert!(!record.is_processed());
    }
}
