use curico_core::error::CoreError;
use curico_core::story_format::StoryFormatError;
use curico_core::types::DbId;

/// Errors from the model HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Model API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The provider answered 2xx but without the expected content.
    #[error("Model returned no {0}")]
    EmptyResponse(&'static str),
}

/// Errors from object storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

/// Errors raised by any pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Format(#[from] StoryFormatError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Page {0} not found")]
    PageNotFound(DbId),

    /// The illustration task panicked or was cancelled.
    #[error("Illustration task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
