use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `generateContent` response body. Every level is optional so a missing
/// field becomes a specific parse failure instead of a serde error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    pub prompt_feedback: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    pub parts: Option<Vec<Part>>,
    pub role: Option<String>,
}

/// Leaf values are kept as raw JSON: a `data` or `text` of the wrong type
/// makes the part unusable rather than the whole body unreadable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,
    #[serde(rename = "inlineData", default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    /// The REST spelling; a part may carry both.
    #[serde(rename = "inline_data", default, skip_serializing_if = "Option::is_none")]
    pub inline_data_snake: Option<InlineData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InlineData {
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<Value>,
    #[serde(rename = "mime_type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type_snake: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl InlineData {
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type
            .as_ref()
            .or(self.mime_type_snake.as_ref())
            .and_then(Value::as_str)
    }

    /// Non-empty string data; anything else counts as no image.
    pub fn image_data(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(Value::as_str)
            .filter(|data| !data.trim().is_empty())
    }
}

impl Part {
    pub fn text(&self) -> Option<&str> {
        self.text.as_ref().and_then(Value::as_str)
    }

    /// Base64 image data when this part carries a non-empty inline blob.
    /// `inlineData` is looked at before `inline_data`.
    pub fn image_data(&self) -> Option<&str> {
        self.inline_data
            .iter()
            .chain(self.inline_data_snake.iter())
            .find_map(InlineData::image_data)
    }
}
