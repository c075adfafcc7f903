use crate::codec;
use crate::config::{ServiceConfig, SourceEncoding};
use crate::error::{RenderError, Result};
use crate::logger::redact_secret;
use crate::models::settings::RenderSettings;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use serde_json::{json, Value};
use std::fmt;

/// Source image bytes ready to be embedded in a request.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub encoding: SourceEncoding,
    /// What the payload claims the bytes are.
    pub declared_mime: String,
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("bytes", &self.bytes.len())
            .field("encoding", &self.encoding)
            .field("declared_mime", &self.declared_mime)
            .finish()
    }
}

impl EncodedImage {
    pub fn encode(image: &DynamicImage, config: &ServiceConfig) -> Result<Self> {
        let bytes = codec::encode_bytes(image, config.source_encoding, config.jpeg_quality)?;
        Ok(Self {
            bytes,
            encoding: config.source_encoding,
            declared_mime: config.declared_source_mime().to_string(),
        })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// One call's worth of validated inputs.
#[derive(Clone)]
pub struct GenerationRequest {
    pub base_url: String,
    pub api_key: String,
    pub effective_prompt: String,
    pub source_image: Option<EncodedImage>,
    pub model: String,
    pub aspect_ratio: Option<String>,
    pub image_size: String,
}

impl fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("base_url", &self.base_url)
            .field("api_key", &redact_secret(&self.api_key))
            .field("effective_prompt", &self.effective_prompt)
            .field("source_image", &self.source_image)
            .field("model", &self.model)
            .field("aspect_ratio", &self.aspect_ratio)
            .field("image_size", &self.image_size)
            .finish()
    }
}

impl GenerationRequest {
    /// Snapshots the settings and encodes the source image, if any.
    pub fn from_settings(
        settings: &RenderSettings,
        source: Option<&DynamicImage>,
        config: &ServiceConfig,
    ) -> Result<Self> {
        let source_image = source
            .map(|image| EncodedImage::encode(image, config))
            .transpose()?;

        Ok(Self {
            base_url: settings.api_base_url().to_string(),
            api_key: settings.api_key().to_string(),
            effective_prompt: settings.effective_prompt(),
            source_image,
            model: settings.model().to_string(),
            aspect_ratio: settings.aspect_ratio_hint().map(str::to_string),
            image_size: settings.image_size().to_string(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(RenderError::Validation("missing base url".into()));
        }
        if self.api_key.trim().is_empty() {
            return Err(RenderError::Validation("missing api key".into()));
        }
        if self.source_image.is_none() {
            return Err(RenderError::Validation("missing source image".into()));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim().trim_end_matches('/'),
            self.model
        )
    }

    pub fn image_config(&self) -> Value {
        match self.aspect_ratio.as_deref().filter(|ratio| !ratio.is_empty()) {
            Some(ratio) => json!({
                "aspectRatio": ratio,
                "imageSize": self.image_size
            }),
            None => json!({
                "imageSize": self.image_size
            }),
        }
    }

    /// Validates, then builds the `generateContent` body.
    pub fn to_payload(&self) -> Result<Value> {
        self.validate()?;
        let image = self
            .source_image
            .as_ref()
            .ok_or_else(|| RenderError::Validation("missing source image".into()))?;

        Ok(json!({
            "contents": [
                {
                    "parts": [
                        { "text": self.effective_prompt },
                        {
                            "inline_data": {
                                "mime_type": image.declared_mime,
                                "data": image.to_base64()
                            }
                        }
                    ]
                }
            ],
            "tools": [ { "google_search": {} } ],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"],
                "imageConfig": self.image_config()
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceMimePolicy;
    use crate::models::settings::{ASPECT_RATIOS, DEFAULT_SYSTEM_PROMPT};
    use image::{Rgb, RgbImage};

    fn source_800x600() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(800, 600, Rgb([90, 120, 150])))
    }

    fn ready_settings() -> RenderSettings {
        let mut settings = RenderSettings::new();
        settings.set_api_key("test-key");
        settings.set_prompt("add sunset lighting");
        settings
    }

    #[test]
    fn sunset_scenario_payload() {
        let mut settings = ready_settings();
        settings.set_aspect_ratio("16:9").unwrap();
        settings.set_image_size("2K").unwrap();
        let source = source_800x600();

        let request =
            GenerationRequest::from_settings(&settings, Some(&source), &ServiceConfig::new())
                .unwrap();
        let payload = request.to_payload().unwrap();

        assert_eq!(
            payload["generationConfig"]["imageConfig"],
            json!({ "aspectRatio": "16:9", "imageSize": "2K" })
        );
        assert_eq!(
            payload["contents"][0]["parts"][0]["text"],
            json!(format!("{}\n\nadd sunset lighting", DEFAULT_SYSTEM_PROMPT))
        );
        assert_eq!(
            payload["generationConfig"]["responseModalities"],
            json!(["TEXT", "IMAGE"])
        );
        assert_eq!(payload["tools"], json!([{ "google_search": {} }]));

        let inline = &payload["contents"][0]["parts"][1]["inline_data"];
        assert_eq!(inline["mime_type"], "image/png");
        let bytes = STANDARD.decode(inline["data"].as_str().unwrap()).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = codec::decode_bytes(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 600));
    }

    #[test]
    fn aspect_ratio_key_only_when_set() {
        let source = source_800x600();
        for option in ASPECT_RATIOS {
            let mut settings = ready_settings();
            settings.set_aspect_ratio(option.ratio).unwrap();
            let request =
                GenerationRequest::from_settings(&settings, Some(&source), &ServiceConfig::new())
                    .unwrap();
            let config = request.image_config();

            assert_eq!(config["imageSize"], "1K");
            if option.ratio.is_empty() {
                assert!(config.get("aspectRatio").is_none());
            } else {
                assert_eq!(config["aspectRatio"], option.ratio);
            }
        }
    }

    #[test]
    fn validation_order_and_messages() {
        let source = source_800x600();
        let config = ServiceConfig::new();

        let mut settings = ready_settings();
        settings.set_api_base_url("  ");
        let request = GenerationRequest::from_settings(&settings, Some(&source), &config).unwrap();
        assert!(
            matches!(request.to_payload(), Err(RenderError::Validation(m)) if m == "missing base url")
        );

        let mut settings = ready_settings();
        settings.set_api_key("");
        let request = GenerationRequest::from_settings(&settings, Some(&source), &config).unwrap();
        assert!(
            matches!(request.validate(), Err(RenderError::Validation(m)) if m == "missing api key")
        );

        let request = GenerationRequest::from_settings(&ready_settings(), None, &config).unwrap();
        assert!(
            matches!(request.validate(), Err(RenderError::Validation(m)) if m == "missing source image")
        );
    }

    #[test]
    fn endpoint_embeds_model_and_trims_slash() {
        let mut settings = ready_settings();
        settings.set_api_base_url("https://proxy.example.com/");
        settings.set_model("gemini-2.5-flash-image").unwrap();
        let request =
            GenerationRequest::from_settings(&settings, None, &ServiceConfig::new()).unwrap();
        assert_eq!(
            request.endpoint(),
            "https://proxy.example.com/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn match_encoding_policy_declares_jpeg() {
        let config = ServiceConfig::new().with_mime_policy(SourceMimePolicy::MatchEncoding);
        let request =
            GenerationRequest::from_settings(&ready_settings(), Some(&source_800x600()), &config)
                .unwrap();
        let payload = request.to_payload().unwrap();
        assert_eq!(
            payload["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/jpeg"
        );
    }

    #[test]
    fn debug_does_not_leak_key() {
        let request =
            GenerationRequest::from_settings(&ready_settings(), None, &ServiceConfig::new())
                .unwrap();
        assert!(!format!("{:?}", request).contains("test-key"));
    }
}
