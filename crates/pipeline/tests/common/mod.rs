//! In-memory fakes for the pipeline seams.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use curico_core::types::DbId;
use curico_db::models::page::Page;
use curico_db::models::status::PageStatus;
use curico_db::models::story::Story;
use curico_db::repositories::DEFAULT_CLAIM_LEASE;
use curico_events::{EventBus, IllustrationQueue, IllustrationReceiver};
use curico_pipeline::error::{ModelError, StorageError};
use curico_pipeline::illustrate::Illustrator;
use curico_pipeline::images::ImageModel;
use curico_pipeline::llm::StoryModel;
use curico_pipeline::storage::ObjectStore;
use curico_pipeline::store::{PageStore, StoryStore};
use curico_pipeline::story::StoryGenerator;

/// Smallest payload `image::guess_format` recognizes as PNG.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01";

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    next_id: DbId,
    stories: Vec<Story>,
    pages: HashMap<DbId, Page>,
}

/// In-memory story and page store with the same conditional updates as
/// the SQL repositories.
pub struct MemoryStore {
    state: Mutex<StoreState>,
    pub fail_inserts: std::sync::atomic::AtomicBool,
    claim_lease: chrono::Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            state: Mutex::default(),
            fail_inserts: Default::default(),
            claim_lease: chrono::Duration::from_std(DEFAULT_CLAIM_LEASE).unwrap(),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn page(&self, id: DbId) -> Page {
        self.state.lock().unwrap().pages[&id].clone()
    }

    pub fn pages_of(&self, story_id: DbId) -> Vec<Page> {
        let state = self.state.lock().unwrap();
        let mut pages: Vec<Page> = state
            .pages
            .values()
            .filter(|p| p.story_id == story_id)
            .cloned()
            .collect();
        pages.sort_by_key(|p| p.page_num);
        pages
    }

    pub fn story_count(&self) -> usize {
        self.state.lock().unwrap().stories.len()
    }

    pub fn page_count(&self) -> usize {
        self.state.lock().unwrap().pages.len()
    }

    /// Overwrite a stored page, e.g. to simulate an already-illustrated row.
    pub fn put_page(&self, page: Page) {
        self.state.lock().unwrap().pages.insert(page.id, page);
    }

    /// Pending, without an image, and not holding a live claim.
    fn is_claimable(&self, page: &Page) -> bool {
        let lease_expired = page
            .claimed_at
            .map_or(true, |at| at < Utc::now() - self.claim_lease);
        page.status_id == PageStatus::Pending.id() && page.image_url.is_none() && lease_expired
    }

    fn update<F>(&self, id: DbId, f: F) -> Option<Page>
    where
        F: FnOnce(&mut Page) -> bool,
    {
        let mut state = self.state.lock().unwrap();
        let page = state.pages.get_mut(&id)?;
        if f(page) {
            page.updated_at = Utc::now();
            Some(page.clone())
        } else {
            None
        }
    }
}

#[async_trait]
impl StoryStore for MemoryStore {
    async fn create_story(
        &self,
        owner_id: DbId,
        title: &str,
        page_texts: &[String],
    ) -> Result<(Story, Vec<Page>), sqlx::Error> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Protocol("insert failed".into()));
        }
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        state.next_id += 1;
        let story = Story {
            id: state.next_id,
            title: title.to_string(),
            owner_id,
            created_at: now,
            updated_at: now,
        };
        let mut pages = Vec::new();
        for (i, text) in page_texts.iter().enumerate() {
            state.next_id += 1;
            let page = Page {
                id: state.next_id,
                story_id: story.id,
                page_num: i as i32 + 1,
                content_text: text.clone(),
                image_url: None,
                status_id: PageStatus::Pending.id(),
                error_message: None,
                claimed_at: None,
                completed_at: None,
                created_at: now,
                updated_at: now,
            };
            state.pages.insert(page.id, page.clone());
            pages.push(page);
        }
        state.stories.push(story.clone());
        Ok((story, pages))
    }
}

#[async_trait]
impl PageStore for MemoryStore {
    async fn find_page(&self, id: DbId) -> Result<Option<Page>, sqlx::Error> {
        Ok(self.state.lock().unwrap().pages.get(&id).cloned())
    }

    async fn claim_page(&self, id: DbId) -> Result<Option<Page>, sqlx::Error> {
        Ok(self.update(id, |p| {
            let claimable = self.is_claimable(p);
            if claimable {
                p.claimed_at = Some(Utc::now());
            }
            claimable
        }))
    }

    async fn complete_page(
        &self,
        id: DbId,
        image_url: &str,
    ) -> Result<Option<Page>, sqlx::Error> {
        Ok(self.update(id, |p| {
            if p.status_id != PageStatus::Pending.id() {
                return false;
            }
            p.image_url = Some(image_url.to_string());
            p.status_id = PageStatus::Complete.id();
            p.error_message = None;
            p.completed_at = Some(Utc::now());
            true
        }))
    }

    async fn fail_page(&self, id: DbId, message: &str) -> Result<Option<Page>, sqlx::Error> {
        Ok(self.update(id, |p| {
            if p.status_id != PageStatus::Pending.id() {
                return false;
            }
            p.status_id = PageStatus::Error.id();
            p.error_message = Some(message.to_string());
            p.completed_at = Some(Utc::now());
            true
        }))
    }

    async fn reset_page(&self, id: DbId) -> Result<Option<Page>, sqlx::Error> {
        Ok(self.update(id, |p| {
            if p.status_id != PageStatus::Error.id() {
                return false;
            }
            p.status_id = PageStatus::Pending.id();
            p.claimed_at = None;
            p.error_message = None;
            p.completed_at = None;
            true
        }))
    }

    async fn claimable_pages(&self, limit: i64) -> Result<Vec<Page>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        let mut pages: Vec<Page> = state
            .pages
            .values()
            .filter(|p| self.is_claimable(p))
            .cloned()
            .collect();
        pages.sort_by_key(|p| p.id);
        pages.truncate(limit as usize);
        Ok(pages)
    }
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// Story model returning a fixed reply and recording the prompts it saw.
pub struct ScriptedModel {
    reply: Result<String, u16>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(status),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl StoryModel for ScriptedModel {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(ModelError::Api {
                status: *status,
                body: "model unavailable".into(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Image model returning fixed bytes, or failing, and counting calls.
pub struct FakeImages {
    payload: Option<Vec<u8>>,
    calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
    delay: Option<std::time::Duration>,
}

impl FakeImages {
    pub fn png() -> Arc<Self> {
        Arc::new(Self::with_payload(Some(PNG_BYTES.to_vec()), None))
    }

    pub fn slow_png(delay: std::time::Duration) -> Arc<Self> {
        Arc::new(Self::with_payload(Some(PNG_BYTES.to_vec()), Some(delay)))
    }

    pub fn returning(bytes: &[u8]) -> Arc<Self> {
        Arc::new(Self::with_payload(Some(bytes.to_vec()), None))
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self::with_payload(None, None))
    }

    fn with_payload(payload: Option<Vec<u8>>, delay: Option<std::time::Duration>) -> Self {
        Self {
            payload,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            delay,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageModel for FakeImages {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.payload.clone().ok_or(ModelError::Api {
            status: 500,
            body: "image generation failed".into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Object storage
// ---------------------------------------------------------------------------

/// Object store keeping uploads in memory.
#[derive(Default)]
pub struct MemoryObjects {
    pub objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryObjects {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (bytes, content_type.to_string()));
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
// Wiring
// ---------------------------------------------------------------------------

/// A model reply with a title and `n` pages.
pub fn story_reply(title: &str, n: usize) -> String {
    let mut out = format!("<title>{title}</title>\n");
    for i in 1..=n {
        out.push_str(&format!("<page>Page {i}: Luna hops a little higher.</page>\n"));
    }
    out
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub images: Arc<FakeImages>,
    pub objects: Arc<MemoryObjects>,
    pub events: Arc<EventBus>,
    pub queue: IllustrationQueue,
    pub receiver: Option<IllustrationReceiver>,
    pub illustrator: Arc<Illustrator>,
}

impl Harness {
    pub fn new(images: Arc<FakeImages>) -> Self {
        let store = MemoryStore::new();
        let objects = MemoryObjects::new();
        let events = Arc::new(EventBus::default());
        let (queue, receiver) = IllustrationQueue::channel();
        let illustrator = Arc::new(Illustrator::new(
            store.clone(),
            images.clone(),
            objects.clone(),
            Arc::clone(&events),
        ));
        Self {
            store,
            images,
            objects,
            events,
            queue,
            receiver: Some(receiver),
            illustrator,
        }
    }

    pub fn generator(&self, model: Arc<ScriptedModel>) -> StoryGenerator {
        StoryGenerator::new(
            model,
            self.store.clone(),
            self.queue.clone(),
            Arc::clone(&self.events),
        )
    }

    /// Insert a story directly, bypassing the text model.
    pub async fn seed_story(&self, pages: usize) -> (Story, Vec<Page>) {
        let texts: Vec<String> = (1..=pages).map(|i| format!("Page {i} text")).collect();
        self.store.create_story(1, "Seeded", &texts).await.unwrap()
    }
}
