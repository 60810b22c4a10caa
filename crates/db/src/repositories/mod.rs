//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod page_repo;
pub mod story_repo;

pub use page_repo::{PageRepo, DEFAULT_CLAIM_LEASE};
pub use story_repo::StoryRepo;
