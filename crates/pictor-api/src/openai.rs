use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

const MODEL: &str = "dall-e-3";
const SIZE: &str = "1024x1024";

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("generation API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed generation response: {0}")]
    Malformed(String),
    #[error("generation API returned no images")]
    Empty,
}

/// Turns a prompt into the URL of a freshly generated image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

/// OpenAI Images API client.
pub struct OpenAiImages {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

impl OpenAiImages {
    pub fn new(client: Client, api_key: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImages {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let payload = GenerationRequest { model: MODEL, prompt, n: 1, size: SIZE };
        debug!("Calling image generation: model={} size={}", MODEL, SIZE);

        let resp = self
            .client
            .post(format!("{}/v1/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(GenerateError::Status { status: status.as_u16(), body });
        }

        let parsed: GenerationResponse =
            serde_json::from_str(&body).map_err(|e| GenerateError::Malformed(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .and_then(|image| image.url)
            .ok_or(GenerateError::Empty)
    }
}
