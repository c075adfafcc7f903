pub mod image_client;
pub mod response;

use crate::{error::Result, models::GenerationRequest};
use async_trait::async_trait;
use image::DynamicImage;

pub use image_client::{classify_response, GeminiClient};
pub use response::{extract_image_data, parse_generated_image};

/// Decoded image on success, the reason it failed otherwise.
pub type GenerationResult = Result<DynamicImage>;

/// The remote image generator. [`GeminiClient`] talks HTTP; tests and hosts
/// can plug in their own.
#[async_trait]
pub trait ImageService: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult;
}
