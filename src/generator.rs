//! Client for the external text-to-image API.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ApiConfig;
use crate::constants::{
    GENERATION_TIMEOUT, IMAGE_QUALITY, IMAGE_SIZE, IMAGES_PER_PROMPT, OPENAI_ORGANIZATION_HEADER,
};
use crate::error::ImageGenError;

/// Request body for POST /images/generations
/// Docs: https://platform.openai.com/docs/api-reference/images
#[derive(Serialize, Debug)]
struct ImagesGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    quality: &'a str,
}

#[derive(Deserialize, Debug)]
struct ImagesGenerateResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Deserialize, Debug)]
struct ImageData {
    url: Option<String>,
    revised_prompt: Option<String>,
}

/// Maps a prompt to the URL of a freshly generated image.
///
/// Credentials come from [`ApiConfig`] at construction; every call uses the same
/// size, quality and single-image count.
#[derive(Clone, Debug)]
pub struct ImageGenerator {
    client: Client,
    api: ApiConfig,
    endpoint: String,
}

impl ImageGenerator {
    /// Builds a client bound to `api`, with calls capped at [`GENERATION_TIMEOUT`].
    pub fn new(api: ApiConfig) -> Result<Self, ImageGenError> {
        let client = Client::builder()
            .timeout(GENERATION_TIMEOUT)
            .build()
            .map_err(|err| {
                ImageGenError::ExternalService(format!("Failed to build API client: {err}"))
            })?;
        let endpoint = format!(
            "{}/images/generations",
            api.base_url.as_str().trim_end_matches('/')
        );
        Ok(Self {
            client,
            api,
            endpoint,
        })
    }

    /// Requests one image for `prompt` and returns its URL.
    pub async fn generate(&self, prompt: &str) -> Result<String, ImageGenError> {
        let req_body = ImagesGenerateRequest {
            model: &self.api.model,
            prompt,
            n: IMAGES_PER_PROMPT,
            size: IMAGE_SIZE,
            quality: IMAGE_QUALITY,
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api.api_key)
            .json(&req_body);
        if let Some(organization) = &self.api.organization {
            request = request.header(OPENAI_ORGANIZATION_HEADER, organization);
        }

        let resp = request.send().await.map_err(|err| {
            ImageGenError::ExternalService(format!("Request to {} failed: {err}", self.endpoint))
        })?;

        let status = resp.status();
        let resp_bytes = resp.bytes().await.map_err(|err| {
            ImageGenError::ExternalService(format!("Failed reading generation response: {err}"))
        })?;
        if !status.is_success() {
            return Err(ImageGenError::ExternalService(format!(
                "Images API error {status}: {}",
                String::from_utf8_lossy(&resp_bytes)
            )));
        }

        let parsed: ImagesGenerateResponse = serde_json::from_slice(&resp_bytes).map_err(|err| {
            ImageGenError::ExternalService(format!("Failed to parse generation response: {err}"))
        })?;

        let first = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ImageGenError::ExternalService("No image data returned".to_string()))?;

        if let Some(revised_prompt) = first.revised_prompt {
            debug!("Revised prompt from the API: {revised_prompt}");
        }

        first
            .url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ImageGenError::ExternalService("Image response missing url".to_string()))
    }
}
