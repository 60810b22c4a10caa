//! Domain types and pure logic for the Curico storybook pipeline.
//!
//! Nothing in this crate performs I/O. The database, model clients and
//! HTTP layer live in the sibling crates and build on these types.

pub mod error;
pub mod naming;
pub mod page_events;
pub mod progress;
pub mod quiz;
pub mod story_format;
pub mod types;
pub mod webhook;
