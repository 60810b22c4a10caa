use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use curico_db::repositories::DEFAULT_CLAIM_LEASE;
use curico_events::{EventBus, IllustrationQueue, IllustrationReceiver};

use crate::dispatcher::{IllustrationDispatcher, DEFAULT_CONCURRENCY};
use crate::illustrate::Illustrator;
use crate::images::OpenAiImages;
use crate::llm::{http_client, OpenAiChat};
use crate::storage::{LocalObjectStore, ObjectStore, S3ObjectStore};
use crate::store::PgStore;
use crate::story::StoryGenerator;

/// Where illustrations are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Files below `dir`, served by the API under `/images`.
    Local { dir: String },
    /// An S3 bucket, optionally behind a CDN or custom public URL.
    S3 { bucket: String, public_url: Option<String> },
}

/// Pipeline configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub story_model: String,
    pub image_model: String,
    pub image_size: String,
    pub model_timeout_secs: u64,
    pub storage: StorageBackend,
    /// Base of public image URLs for the local backend.
    pub public_base_url: String,
    pub illustration_concurrency: usize,
    /// Database sweep period; `0` disables the sweep.
    pub dispatch_poll_secs: u64,
    /// Age after which an unfinished claim no longer blocks a page.
    pub claim_lease_secs: u64,
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                         |
    /// |----------------------------|---------------------------------|
    /// | `OPENAI_API_KEY`           | required                        |
    /// | `OPENAI_BASE_URL`          | `https://api.openai.com/v1`     |
    /// | `STORY_MODEL`              | `gpt-5-mini`                    |
    /// | `IMAGE_MODEL`              | `dall-e-3`                      |
    /// | `IMAGE_SIZE`               | `1024x1024`                     |
    /// | `MODEL_TIMEOUT_SECS`       | `120`                           |
    /// | `STORAGE_BACKEND`          | `local` (`local` or `s3`)       |
    /// | `STORAGE_DIR`              | `./storage`                     |
    /// | `PUBLIC_BASE_URL`          | `http://localhost:3000/images`  |
    /// | `S3_BUCKET`                | `images`                        |
    /// | `S3_PUBLIC_URL`            | unset                           |
    /// | `ILLUSTRATION_CONCURRENCY` | `4`                             |
    /// | `DISPATCH_POLL_SECS`       | `30`                            |
    /// | `CLAIM_LEASE_SECS`         | `600`                           |
    pub fn from_env() -> Self {
        let openai_api_key =
            std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set");

        let storage = match env_or("STORAGE_BACKEND", "local").as_str() {
            "local" => StorageBackend::Local {
                dir: env_or("STORAGE_DIR", "./storage"),
            },
            "s3" => StorageBackend::S3 {
                bucket: env_or("S3_BUCKET", curico_core::naming::IMAGES_BUCKET),
                public_url: std::env::var("S3_PUBLIC_URL").ok().filter(|s| !s.is_empty()),
            },
            other => panic!("STORAGE_BACKEND must be 'local' or 's3', got '{other}'"),
        };

        let model_timeout_secs: u64 = env_or("MODEL_TIMEOUT_SECS", "120")
            .parse()
            .expect("MODEL_TIMEOUT_SECS must be a valid u64");
        let claim_lease_secs: u64 = env_or(
            "CLAIM_LEASE_SECS",
            &DEFAULT_CLAIM_LEASE.as_secs().to_string(),
        )
        .parse()
        .expect("CLAIM_LEASE_SECS must be a valid u64");
        assert!(
            claim_lease_secs > model_timeout_secs,
            "CLAIM_LEASE_SECS must exceed MODEL_TIMEOUT_SECS"
        );

        Self {
            openai_api_key,
            openai_base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            story_model: env_or("STORY_MODEL", "gpt-5-mini"),
            image_model: env_or("IMAGE_MODEL", "dall-e-3"),
            image_size: env_or("IMAGE_SIZE", "1024x1024"),
            model_timeout_secs,
            storage,
            public_base_url: env_or("PUBLIC_BASE_URL", "http://localhost:3000/images"),
            illustration_concurrency: env_or(
                "ILLUSTRATION_CONCURRENCY",
                &DEFAULT_CONCURRENCY.to_string(),
            )
            .parse()
            .expect("ILLUSTRATION_CONCURRENCY must be a valid usize"),
            dispatch_poll_secs: env_or("DISPATCH_POLL_SECS", "30")
                .parse()
                .expect("DISPATCH_POLL_SECS must be a valid u64"),
            claim_lease_secs,
        }
    }

    /// Sweep period, `None` when disabled.
    pub fn poll_interval(&self) -> Option<Duration> {
        (self.dispatch_poll_secs > 0).then(|| Duration::from_secs(self.dispatch_poll_secs))
    }

    /// Local storage directory, when that backend is selected.
    pub fn local_storage_dir(&self) -> Option<&str> {
        match &self.storage {
            StorageBackend::Local { dir } => Some(dir),
            StorageBackend::S3 { .. } => None,
        }
    }

    /// Construct the configured object store.
    pub async fn object_store(&self) -> Arc<dyn ObjectStore> {
        match &self.storage {
            StorageBackend::Local { dir } => {
                Arc::new(LocalObjectStore::new(dir, self.public_base_url.clone()))
            }
            StorageBackend::S3 { bucket, public_url } => {
                Arc::new(S3ObjectStore::from_env(bucket.clone(), public_url.clone()).await)
            }
        }
    }

    /// Wire every pipeline component against PostgreSQL and the configured
    /// model and storage providers.
    pub async fn build(&self, pool: PgPool, events: Arc<EventBus>) -> (Pipeline, IllustrationReceiver) {
        let client = http_client(Duration::from_secs(self.model_timeout_secs));
        let store = Arc::new(
            PgStore::new(pool).with_claim_lease(Duration::from_secs(self.claim_lease_secs)),
        );
        let objects = self.object_store().await;
        tracing::info!(
            storage = objects.backend_name(),
            story_model = %self.story_model,
            image_model = %self.image_model,
            "Pipeline configured",
        );

        let story_model = Arc::new(OpenAiChat::new(
            client.clone(),
            self.openai_api_key.clone(),
            self.story_model.clone(),
            self.openai_base_url.clone(),
        ));
        let image_model = Arc::new(OpenAiImages::new(
            client,
            self.openai_api_key.clone(),
            self.image_model.clone(),
            self.image_size.clone(),
            self.openai_base_url.clone(),
        ));

        let (queue, receiver) = IllustrationQueue::channel();
        let generator = Arc::new(StoryGenerator::new(
            story_model,
            store.clone(),
            queue.clone(),
            Arc::clone(&events),
        ));
        let illustrator = Arc::new(Illustrator::new(
            store.clone(),
            image_model,
            objects,
            events,
        ));
        let dispatcher = Arc::new(IllustrationDispatcher::new(
            Arc::clone(&illustrator),
            store,
            self.illustration_concurrency,
            self.poll_interval(),
        ));

        (
            Pipeline {
                generator,
                illustrator,
                dispatcher,
                queue,
            },
            receiver,
        )
    }
}

/// The wired pipeline, shared by the API and the worker.
#[derive(Clone)]
pub struct Pipeline {
    pub generator: Arc<StoryGenerator>,
    pub illustrator: Arc<Illustrator>,
    pub dispatcher: Arc<IllustrationDispatcher>,
    pub queue: IllustrationQueue,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
