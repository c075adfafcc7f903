use crate::codec;
use crate::error::{ParseError, ParseFailure};
use crate::models::GenerateContentResponse;
use image::DynamicImage;

/// Pulls the base64 image out of `candidates[0].content.parts[]`. The first
/// part with inline data wins, in the order the service returned them.
pub fn extract_image_data(body: &str) -> Result<String, ParseError> {
    let fail = |reason: ParseFailure| {
        let err = ParseError::new(reason, body);
        log::warn!(
            "Unusable generation response: {} ({} bytes)",
            err.reason,
            err.response_len
        );
        log::debug!("Response excerpt: {}", err.excerpt);
        err
    };

    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| fail(ParseFailure::InvalidJson(e.to_string())))?;

    let candidate = response
        .candidates
        .as_ref()
        .and_then(|candidates| candidates.first())
        .ok_or_else(|| fail(ParseFailure::NoCandidates))?;

    if let Some(reason) = &candidate.finish_reason {
        log::debug!("Candidate finish reason: {}", reason);
    }

    let content = candidate
        .content
        .as_ref()
        .ok_or_else(|| fail(ParseFailure::NoContent))?;
    let parts = content
        .parts
        .as_ref()
        .ok_or_else(|| fail(ParseFailure::NoParts))?;

    for part in parts {
        if let Some(text) = part.text() {
            log::debug!("Model commentary: {}", text);
        }
    }

    parts
        .iter()
        .find_map(|part| part.image_data())
        .map(str::to_string)
        .ok_or_else(|| fail(ParseFailure::NoInlineImage))
}

pub fn parse_generated_image(body: &str) -> Result<DynamicImage, ParseError> {
    let data = extract_image_data(body)?;
    codec::decode_base64(&data).map_err(|e| {
        log::warn!("Generated image could not be decoded: {}", e);
        ParseError::new(ParseFailure::ImageDecode(e), body)
    })
}
