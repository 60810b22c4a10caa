//! Illustration model client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::llm::{ensure_success, parse_response};

/// Fixed style prefix for every page illustration.
pub const ILLUSTRATION_STYLE: &str =
    "Children's book illustration, vibrant colors, whimsical style: ";

/// The image prompt for one page's text.
pub fn illustration_prompt(content_text: &str) -> String {
    format!("{ILLUSTRATION_STYLE}{content_text}")
}

/// An image model that turns a prompt into raw image bytes.
#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ModelError>;
}

/// OpenAI-compatible `/images/generations` client.
///
/// The API answers with a short-lived URL, which is downloaded right away
/// so the bytes can be persisted.
pub struct OpenAiImages {
    client: reqwest::Client,
    api_key: String,
    model: String,
    size: String,
    base_url: String,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    response_format: &'static str,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
}

impl OpenAiImages {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        model: String,
        size: String,
        base_url: String,
    ) -> Self {
        Self {
            client,
            api_key,
            model,
            size,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageModel for OpenAiImages {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ModelError> {
        let request = ImageRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: &self.size,
            response_format: "url",
        };

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let body: ImageResponse = parse_response(response).await?;
        let url = body
            .data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .ok_or(ModelError::EmptyResponse("image url"))?;

        tracing::debug!(model = %self.model, "Downloading generated image");
        let download = ensure_success(self.client.get(&url).send().await?).await?;
        let bytes = download.bytes().await?;
        if bytes.is_empty() {
            return Err(ModelError::EmptyResponse("image bytes"));
        }
        Ok(bytes.to_vec())
    }
}
