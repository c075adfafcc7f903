use std::fmt;

/// Longest slice of a response body kept inside a [`ParseError`].
pub const EXCERPT_LIMIT: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::Validation(_) => ErrorKind::Validation,
            RenderError::Transport(_) => ErrorKind::Transport,
            RenderError::Api { .. } => ErrorKind::Api,
            RenderError::Parse(_) => ErrorKind::Parse,
            RenderError::Decode(_) => ErrorKind::Decode,
            RenderError::Encode(_) => ErrorKind::Encode,
            RenderError::Capture(_) => ErrorKind::Capture,
            RenderError::Config(_) => ErrorKind::Config,
            RenderError::Io(_) => ErrorKind::Io,
        }
    }

    /// Short text suitable for a status line.
    pub fn summary(&self) -> String {
        match self {
            RenderError::Validation(msg) => msg.clone(),
            RenderError::Transport(msg) => format!("network error: {}", msg),
            RenderError::Api { status, .. } => format!("API error {}", status),
            RenderError::Parse(_) | RenderError::Decode(_) => "check API response".to_string(),
            RenderError::Encode(msg) => format!("could not encode image: {}", msg),
            RenderError::Capture(msg) => msg.clone(),
            RenderError::Config(msg) => format!("configuration error: {}", msg),
            RenderError::Io(msg) => msg.clone(),
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        RenderError::Io(e.to_string())
    }
}

/// Coarse classification of a [`RenderError`], carried by the controller's
/// error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Api,
    Parse,
    Decode,
    Encode,
    Capture,
    Config,
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(String),

    #[error("unrecognized or corrupt image data: {0}")]
    Image(String),

    #[error("frame buffer holds {actual} bytes, {width}x{height} BGRA needs {expected}")]
    FrameSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    InvalidJson(String),
    NoCandidates,
    NoContent,
    NoParts,
    NoInlineImage,
    ImageDecode(DecodeError),
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::InvalidJson(msg) => write!(f, "invalid json: {}", msg),
            ParseFailure::NoCandidates => write!(f, "no candidates"),
            ParseFailure::NoContent => write!(f, "no content in candidate"),
            ParseFailure::NoParts => write!(f, "no parts in content"),
            ParseFailure::NoInlineImage => write!(f, "no image found in response"),
            ParseFailure::ImageDecode(e) => write!(f, "image decode failed: {}", e),
        }
    }
}

/// A response body that could not be turned into an image, with enough of
/// the raw body kept around to diagnose it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason} (response: {response_len} bytes, excerpt: {excerpt})")]
pub struct ParseError {
    pub reason: ParseFailure,
    pub response_len: usize,
    pub excerpt: String,
}

impl ParseError {
    pub fn new(reason: ParseFailure, body: &str) -> Self {
        Self {
            reason,
            response_len: body.len(),
            excerpt: excerpt(body, EXCERPT_LIMIT),
        }
    }
}

/// Cuts `body` down to at most `limit` bytes on a char boundary.
pub fn excerpt(body: &str, limit: usize) -> String {
    if body.len() <= limit {
        return body.to_string();
    }
    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_keeps_size_and_excerpt() {
        let body = "x".repeat(2000);
        let err = ParseError::new(ParseFailure::NoCandidates, &body);
        assert_eq!(err.response_len, 2000);
        assert_eq!(err.excerpt.len(), EXCERPT_LIMIT + 3);
        assert!(err.to_string().starts_with("no candidates"));
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let body = "ééééé";
        let cut = excerpt(body, 3);
        assert_eq!(cut, "é...");
    }

    #[test]
    fn summaries_feed_status_line() {
        let api = RenderError::Api {
            status: 429,
            body: "{}".into(),
        };
        assert_eq!(api.summary(), "API error 429");
        assert_eq!(api.kind(), ErrorKind::Api);

        let parse = RenderError::from(ParseError::new(ParseFailure::NoParts, "{}"));
        assert_eq!(parse.summary(), "check API response");
    }
}
