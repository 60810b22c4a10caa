//! Shared test harness: the production router wired to fake model and
//! storage providers on top of a real database pool.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use curico_api::auth::jwt::{generate_access_token, JwtConfig};
use curico_api::config::ServerConfig;
use curico_api::router::build_app_router;
use curico_api::state::AppState;
use curico_api::ws::WsManager;
use curico_core::types::DbId;
use curico_events::{EventBus, IllustrationQueue, IllustrationReceiver};
use curico_pipeline::error::{ModelError, StorageError};
use curico_pipeline::images::ImageModel;
use curico_pipeline::llm::StoryModel;
use curico_pipeline::storage::ObjectStore;
use curico_pipeline::store::PgStore;
use curico_pipeline::{IllustrationDispatcher, Illustrator, Pipeline, StoryGenerator};

pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

/// Smallest payload recognized as PNG.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
        },
        webhook_secret: WEBHOOK_SECRET.to_string(),
        images_dir: None,
    }
}

/// `Authorization` header value for `user_id`.
pub fn bearer(user_id: DbId) -> String {
    let token = generate_access_token(user_id, &test_config().jwt).unwrap();
    format!("Bearer {token}")
}

/// A model reply with a title and `n` pages.
pub fn story_reply(title: &str, n: usize) -> String {
    let mut out = format!("<title>{title}</title>\n");
    for i in 1..=n {
        out.push_str(&format!("<page>Page {i}: Luna hops a little higher.</page>\n"));
    }
    out
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

pub struct FixedModel {
    reply: String,
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl StoryModel for FixedModel {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

#[derive(Default)]
pub struct FakeImages {
    pub fail: AtomicBool,
    calls: AtomicUsize,
}

impl FakeImages {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageModel for FakeImages {
    async fn generate(&self, _prompt: &str) -> Result<Vec<u8>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ModelError::Api {
                status: 500,
                body: "provider exploded".into(),
            });
        }
        Ok(PNG_BYTES.to_vec())
    }
}

#[derive(Default)]
pub struct MemoryObjects {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://cdn.test/images/{key}")
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub model: Arc<FixedModel>,
    pub images: Arc<FakeImages>,
    pub objects: Arc<MemoryObjects>,
    /// Queued illustration tasks. Tests drain it by hand instead of
    /// running the dispatcher.
    pub receiver: IllustrationReceiver,
}

/// Build the full application router with a model that always answers
/// with `reply`.
pub fn build_test_app_with(pool: PgPool, reply: String) -> TestApp {
    let config = test_config();
    let store = Arc::new(PgStore::new(pool.clone()));
    let model = Arc::new(FixedModel {
        reply,
        prompts: Mutex::new(Vec::new()),
    });
    let images = Arc::new(FakeImages::default());
    let objects = Arc::new(MemoryObjects::default());
    let event_bus = Arc::new(EventBus::default());

    let (queue, receiver) = IllustrationQueue::channel();
    let generator = Arc::new(StoryGenerator::new(
        model.clone(),
        store.clone(),
        queue.clone(),
        Arc::clone(&event_bus),
    ));
    let illustrator = Arc::new(Illustrator::new(
        store.clone(),
        images.clone(),
        objects.clone(),
        Arc::clone(&event_bus),
    ));
    let dispatcher = Arc::new(IllustrationDispatcher::new(
        Arc::clone(&illustrator),
        store,
        2,
        None,
    ));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager: Arc::new(WsManager::new()),
        event_bus,
        pipeline: Pipeline {
            generator,
            illustrator,
            dispatcher,
            queue,
        },
    };

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
        model,
        images,
        objects,
        receiver,
    }
}

/// Build the router with a model replying with a 12-page story.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, story_reply("Luna's Leap", 12)).router
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn get_auth(app: Router, uri: &str, user_id: DbId) -> Response {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .header("authorization", bearer(user_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// POST a JSON body with optional extra headers.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    headers: &[(&str, String)],
) -> Response {
    let mut request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        request = request.header(*name, value.as_str());
    }
    app.oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}
