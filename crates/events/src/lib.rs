//! Curico event plumbing.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`. Every page row update is published here.
//! - [`IllustrationQueue`]: hand-off from story creation to the
//!   illustration dispatcher, one [`PageTask`] per created page.

pub mod bus;
pub mod queue;

pub use bus::{EventBus, PipelineEvent};
pub use queue::{IllustrationQueue, IllustrationReceiver, PageTask};
