//! Story entity models.

use serde::Serialize;
use sqlx::FromRow;
use curico_core::types::{DbId, Timestamp};

use super::page::Page;

/// A row from the `stories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Story {
    pub id: DbId,
    pub title: String,
    pub owner_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A story with its pages ordered by `page_num`, as the reader consumes it.
#[derive(Debug, Clone, Serialize)]
pub struct StoryWithPages {
    #[serde(flatten)]
    pub story: Story,
    pub pages: Vec<Page>,
}
