use crate::config::DEFAULT_API_BASE_URL;
use crate::error::{RenderError, Result};
use crate::logger::redact_secret;
use std::fmt;

pub const DEFAULT_MODEL: &str = "gemini-3-pro-image-preview";
pub const DEFAULT_IMAGE_SIZE: &str = "1K";
pub const DEFAULT_DIMENSION: u32 = 512;

pub const DEFAULT_SYSTEM_PROMPT: &str = "Use the provided image as the exact camera view. \
Keep the camera position, perspective, field of view, framing and the geometry of every object \
identical to the input image. Only change materials, lighting, environment and rendering style \
as described below.";

/// Supported model identifiers and their display names, in menu order.
pub const SUPPORTED_MODELS: &[(&str, &str)] = &[
    ("gemini-3.1-flash-image-preview", "Nano Banana 2"),
    ("gemini-3-pro-image-preview", "Nano Banana Pro"),
    ("gemini-2.5-flash-image", "Nano Banana"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleTemplate {
    pub name: &'static str,
    /// `None` for the "None" and "Custom" entries, which leave the prompt alone.
    pub text: Option<&'static str>,
}

pub const STYLE_TEMPLATES: &[StyleTemplate] = &[
    StyleTemplate {
        name: "None",
        text: None,
    },
    StyleTemplate {
        name: "Photorealistic",
        text: Some(
            "Render this scene as a photorealistic architectural photograph with natural \
             daylight, physically accurate materials and soft shadows.",
        ),
    },
    StyleTemplate {
        name: "Golden Hour",
        text: Some(
            "Render this scene at golden hour with warm low sunlight, long shadows and a \
             glowing sky.",
        ),
    },
    StyleTemplate {
        name: "Night",
        text: Some(
            "Render this scene at night with artificial interior and street lighting, a dark \
             blue sky and realistic light bloom.",
        ),
    },
    StyleTemplate {
        name: "Interior",
        text: Some(
            "Render this interior with furnished rooms, realistic textiles and wood, and soft \
             indirect light through the windows.",
        ),
    },
    StyleTemplate {
        name: "Pencil Sketch",
        text: Some("Turn this scene into a hand-drawn pencil sketch with clean line work and light hatching."),
    },
    StyleTemplate {
        name: "Watercolor",
        text: Some("Turn this scene into a loose watercolor illustration with soft washes and paper texture."),
    },
    StyleTemplate {
        name: "Clay Model",
        text: Some("Render this scene as a white clay model with neutral studio lighting and ambient occlusion."),
    },
    StyleTemplate {
        name: "Custom",
        text: None,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatioOption {
    pub label: &'static str,
    /// Empty for "Original": no ratio is sent.
    pub ratio: &'static str,
}

pub const ASPECT_RATIOS: &[AspectRatioOption] = &[
    AspectRatioOption {
        label: "Original",
        ratio: "",
    },
    AspectRatioOption {
        label: "Square (1:1)",
        ratio: "1:1",
    },
    AspectRatioOption {
        label: "Portrait (2:3)",
        ratio: "2:3",
    },
    AspectRatioOption {
        label: "Landscape (3:2)",
        ratio: "3:2",
    },
    AspectRatioOption {
        label: "Portrait (3:4)",
        ratio: "3:4",
    },
    AspectRatioOption {
        label: "Landscape (4:3)",
        ratio: "4:3",
    },
    AspectRatioOption {
        label: "Portrait (4:5)",
        ratio: "4:5",
    },
    AspectRatioOption {
        label: "Landscape (5:4)",
        ratio: "5:4",
    },
    AspectRatioOption {
        label: "Vertical (9:16)",
        ratio: "9:16",
    },
    AspectRatioOption {
        label: "Widescreen (16:9)",
        ratio: "16:9",
    },
    AspectRatioOption {
        label: "Ultrawide (21:9)",
        ratio: "21:9",
    },
];

pub const IMAGE_SIZE_TIERS: &[&str] = &["0.5K", "1K", "2K", "4K"];

pub fn model_display_name(model_id: &str) -> Option<&'static str> {
    SUPPORTED_MODELS
        .iter()
        .find(|(id, _)| *id == model_id)
        .map(|(_, name)| *name)
}

pub fn is_supported_model(model_id: &str) -> bool {
    model_display_name(model_id).is_some()
}

pub fn find_style_template(name: &str) -> Option<(usize, &'static StyleTemplate)> {
    STYLE_TEMPLATES
        .iter()
        .enumerate()
        .find(|(_, template)| template.name == name)
}

/// Field identifiers reported after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsField {
    ApiBaseUrl,
    ApiKey,
    Model,
    Prompt,
    SystemPrompt,
    StyleTemplate,
    AspectRatio,
    ImageSize,
    Dimensions,
}

/// Everything a generation request is parameterized by.
///
/// Setters record which fields actually changed; the controller drains them
/// with [`RenderSettings::take_changes`] and forwards them to observers.
#[derive(Clone, PartialEq)]
pub struct RenderSettings {
    api_base_url: String,
    api_key: String,
    model: String,
    prompt: String,
    system_prompt: String,
    style_template: usize,
    aspect_ratio: String,
    image_size: String,
    source_width: u32,
    source_height: u32,
    width: u32,
    height: u32,
    changes: Vec<SettingsField>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            prompt: String::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            style_template: 0,
            aspect_ratio: String::new(),
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
            source_width: 0,
            source_height: 0,
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            changes: Vec::new(),
        }
    }
}

impl fmt::Debug for RenderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderSettings")
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &redact_secret(&self.api_key))
            .field("model", &self.model)
            .field("prompt", &self.prompt)
            .field("style_template", &self.style_template().name)
            .field("aspect_ratio", &self.aspect_ratio)
            .field("image_size", &self.image_size)
            .field("source", &(self.source_width, self.source_height))
            .field("size", &(self.width, self.height))
            .finish()
    }
}

impl RenderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn model_display_name(&self) -> &'static str {
        model_display_name(&self.model).unwrap_or("Unknown model")
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn style_template(&self) -> &'static StyleTemplate {
        &STYLE_TEMPLATES[self.style_template]
    }

    pub fn aspect_ratio(&self) -> &str {
        &self.aspect_ratio
    }

    /// The ratio to send, `None` for the "Original" sentinel.
    pub fn aspect_ratio_hint(&self) -> Option<&str> {
        if self.aspect_ratio.is_empty() {
            None
        } else {
            Some(&self.aspect_ratio)
        }
    }

    pub fn image_size(&self) -> &str {
        &self.image_size
    }

    pub fn source_dimensions(&self) -> (u32, u32) {
        (self.source_width, self.source_height)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Both the credential and the endpoint are filled in.
    pub fn has_credentials(&self) -> bool {
        !self.api_base_url.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    /// Prefix and prompt joined by a blank line; the bare prompt when the
    /// prefix is blank.
    pub fn effective_prompt(&self) -> String {
        if self.system_prompt.trim().is_empty() {
            self.prompt.clone()
        } else {
            format!("{}\n\n{}", self.system_prompt, self.prompt)
        }
    }

    pub fn set_api_base_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        if url != self.api_base_url {
            self.api_base_url = url;
            self.mark(SettingsField::ApiBaseUrl);
        }
    }

    pub fn set_api_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        if key != self.api_key {
            self.api_key = key;
            self.mark(SettingsField::ApiKey);
        }
    }

    pub fn set_model(&mut self, model_id: &str) -> Result<()> {
        if !is_supported_model(model_id) {
            return Err(RenderError::Validation(format!(
                "unsupported model: {}",
                model_id
            )));
        }
        if model_id != self.model {
            self.model = model_id.to_string();
            self.mark(SettingsField::Model);
        }
        Ok(())
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        if prompt != self.prompt {
            self.prompt = prompt;
            self.mark(SettingsField::Prompt);
        }
    }

    pub fn set_system_prompt(&mut self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        if prefix != self.system_prompt {
            self.system_prompt = prefix;
            self.mark(SettingsField::SystemPrompt);
        }
    }

    /// Selects a preset by name. A preset with text replaces the prompt
    /// outright, discarding whatever was typed before.
    pub fn select_style_template(&mut self, name: &str) -> Result<()> {
        let (index, template) = find_style_template(name).ok_or_else(|| {
            RenderError::Validation(format!("unknown style template: {}", name))
        })?;

        if index != self.style_template {
            self.style_template = index;
            self.mark(SettingsField::StyleTemplate);
        }
        if let Some(text) = template.text {
            self.set_prompt(text);
        }
        Ok(())
    }

    pub fn set_aspect_ratio(&mut self, ratio: &str) -> Result<()> {
        if !ASPECT_RATIOS.iter().any(|option| option.ratio == ratio) {
            return Err(RenderError::Validation(format!(
                "unsupported aspect ratio: {}",
                ratio
            )));
        }
        if ratio != self.aspect_ratio {
            self.aspect_ratio = ratio.to_string();
            self.mark(SettingsField::AspectRatio);
        }
        Ok(())
    }

    pub fn set_image_size(&mut self, tier: &str) -> Result<()> {
        if !IMAGE_SIZE_TIERS.contains(&tier) {
            return Err(RenderError::Validation(format!(
                "unsupported image size: {}",
                tier
            )));
        }
        if tier != self.image_size {
            self.image_size = tier.to_string();
            self.mark(SettingsField::ImageSize);
        }
        Ok(())
    }

    /// Records a new source image size; the working size follows it.
    pub fn set_source_dimensions(&mut self, width: u32, height: u32) {
        let unchanged = (self.source_width, self.source_height, self.width, self.height)
            == (width, height, width, height);
        self.source_width = width;
        self.source_height = height;
        self.width = width;
        self.height = height;
        if !unchanged {
            self.mark(SettingsField::Dimensions);
        }
    }

    pub fn take_changes(&mut self) -> Vec<SettingsField> {
        std::mem::take(&mut self.changes)
    }

    fn mark(&mut self, field: SettingsField) {
        if !self.changes.contains(&field) {
            self.changes.push(field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_published_lists() {
        let settings = RenderSettings::new();
        assert_eq!(settings.model(), DEFAULT_MODEL);
        assert_eq!(settings.model_display_name(), "Nano Banana Pro");
        assert_eq!(settings.image_size(), "1K");
        assert_eq!(settings.aspect_ratio_hint(), None);
        assert_eq!(settings.style_template().name, "None");
        assert_eq!(settings.dimensions(), (512, 512));
        assert!(!settings.has_credentials());
    }

    #[test]
    fn every_template_with_text_replaces_prompt() {
        for template in STYLE_TEMPLATES.iter().filter(|t| t.text.is_some()) {
            let mut settings = RenderSettings::new();
            settings.set_prompt("my careful custom wording");
            settings.select_style_template(template.name).unwrap();
            assert_eq!(settings.prompt(), template.text.unwrap());
        }
    }

    #[test]
    fn sentinel_templates_keep_prompt() {
        let mut settings = RenderSettings::new();
        settings.select_style_template("Watercolor").unwrap();
        settings.set_prompt("hand tuned");
        settings.select_style_template("Custom").unwrap();
        assert_eq!(settings.prompt(), "hand tuned");
        settings.select_style_template("None").unwrap();
        assert_eq!(settings.prompt(), "hand tuned");
    }

    #[test]
    fn unknown_enum_values_are_rejected_unchanged() {
        let mut settings = RenderSettings::new();
        assert!(settings.set_model("gpt-image-1").is_err());
        assert!(settings.set_aspect_ratio("7:3").is_err());
        assert!(settings.set_image_size("8K").is_err());
        assert!(settings.select_style_template("Cubist").is_err());

        assert_eq!(settings.model(), DEFAULT_MODEL);
        assert_eq!(settings.aspect_ratio(), "");
        assert_eq!(settings.image_size(), "1K");
        assert!(settings.take_changes().is_empty());
    }

    #[test]
    fn source_dimensions_move_working_size_too() {
        let mut settings = RenderSettings::new();
        settings.set_source_dimensions(800, 600);
        assert_eq!(settings.source_dimensions(), (800, 600));
        assert_eq!(settings.dimensions(), (800, 600));
        assert_eq!(settings.take_changes(), vec![SettingsField::Dimensions]);

        settings.set_source_dimensions(800, 600);
        assert!(settings.take_changes().is_empty());
    }

    #[test]
    fn effective_prompt_skips_blank_prefix() {
        let mut settings = RenderSettings::new();
        settings.set_prompt("add sunset lighting");
        assert_eq!(
            settings.effective_prompt(),
            format!("{}\n\nadd sunset lighting", DEFAULT_SYSTEM_PROMPT)
        );

        settings.set_system_prompt("   ");
        assert_eq!(settings.effective_prompt(), "add sunset lighting");
    }

    #[test]
    fn changes_are_deduplicated_and_drained() {
        let mut settings = RenderSettings::new();
        settings.set_prompt("a");
        settings.set_prompt("b");
        settings.set_api_key("key");
        settings.set_model("gemini-2.5-flash-image").unwrap();
        assert_eq!(
            settings.take_changes(),
            vec![
                SettingsField::Prompt,
                SettingsField::ApiKey,
                SettingsField::Model
            ]
        );
        assert!(settings.take_changes().is_empty());
    }

    #[test]
    fn debug_output_masks_api_key() {
        let mut settings = RenderSettings::new();
        settings.set_api_key("AIzaVerySecretKey");
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("VerySecretKey"));
        assert!(debug.contains("AIza..."));
    }
}
