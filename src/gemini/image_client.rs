use crate::{
    config::ServiceConfig,
    error::{RenderError, Result},
    gemini::{response::parse_generated_image, GenerationResult, ImageService},
    logger::{self, redact_secret},
    models::{GenerationRequest, SUPPORTED_MODELS},
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// HTTP client for the Gemini `generateContent` endpoint. One request per
/// call, no retries.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RenderError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    pub fn supported_models() -> Vec<(&'static str, &'static str)> {
        SUPPORTED_MODELS.to_vec()
    }

    /// Sends the request and returns the body of a 2xx response.
    pub async fn send(&self, request: &GenerationRequest) -> Result<String> {
        let payload = request.to_payload()?;
        let endpoint = request.endpoint();

        log::info!("Calling API: {}", endpoint);
        log::info!(
            "Model: {}, aspect ratio: {}, image size: {}",
            request.model,
            request.aspect_ratio.as_deref().unwrap_or("original"),
            request.image_size
        );
        log::debug!("API key: {}", redact_secret(&request.api_key));
        log::debug!("Prompt: {}", request.effective_prompt);

        let mut timer = logger::timer("Generation request");
        let response = self
            .client
            .post(&endpoint)
            .header(API_KEY_HEADER, &request.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;
        timer.stop();

        classify_response(status.as_u16(), body)
    }

    fn transport_error(&self, e: reqwest::Error) -> RenderError {
        let message = if e.is_timeout() {
            format!("request timed out after {:?}: {}", self.timeout, e)
        } else {
            e.to_string()
        };
        log::error!("HTTP error: {}", message);
        RenderError::Transport(message)
    }
}

/// Non-2xx statuses become [`RenderError::Api`] with the body kept verbatim.
pub fn classify_response(status: u16, body: String) -> Result<String> {
    if (200..300).contains(&status) {
        log::info!("API response received: {} characters", body.len());
        Ok(body)
    } else {
        log::error!("API error ({}): {}", status, body);
        Err(RenderError::Api { status, body })
    }
}

#[async_trait]
impl ImageService for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        let body = self.send(request).await?;
        Ok(parse_generated_image(&body)?)
    }
}
