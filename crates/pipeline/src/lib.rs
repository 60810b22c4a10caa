//! Story generation pipeline.
//!
//! Two stages connected by the illustration queue:
//!
//! - [`StoryGenerator`](story::StoryGenerator): prompt to story text, then
//!   one story row and N pending page rows, then one queued task per page.
//! - [`Illustrator`](illustrate::Illustrator): one page to one image in
//!   object storage and an updated page row.
//!
//! [`IllustrationDispatcher`](dispatcher::IllustrationDispatcher) drains the
//! queue and periodically sweeps the database, running illustrations as
//! independent tasks. External services sit behind the traits in [`llm`],
//! [`images`], [`storage`] and [`store`] so tests can swap them out.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod illustrate;
pub mod images;
pub mod llm;
pub mod storage;
pub mod store;
pub mod story;

pub use config::{Pipeline, PipelineConfig};
pub use dispatcher::IllustrationDispatcher;
pub use error::PipelineError;
pub use illustrate::{IllustrationOutcome, Illustrator, SkipReason};
pub use story::{GeneratedStory, StoryGenerator};
