use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Container used for the source image inside a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Jpeg,
    Png,
}

impl SourceEncoding {
    pub fn mime_type(&self) -> &'static str {
        match self {
            SourceEncoding::Jpeg => "image/jpeg",
            SourceEncoding::Png => "image/png",
        }
    }
}

/// Which `mime_type` the request declares for the source image.
///
/// `Legacy` always declares `image/png`, whatever the bytes are. Deployed
/// clients have always sent JPEG bytes under that label and the service
/// accepts it, so it stays the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMimePolicy {
    #[default]
    Legacy,
    MatchEncoding,
}

impl SourceMimePolicy {
    pub fn declared_mime(&self, encoding: SourceEncoding) -> &'static str {
        match self {
            SourceMimePolicy::Legacy => "image/png",
            SourceMimePolicy::MatchEncoding => encoding.mime_type(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub timeout: Duration,
    pub source_encoding: SourceEncoding,
    pub jpeg_quality: u8,
    pub mime_policy: SourceMimePolicy,
    pub api_base_url: Option<String>,
    pub api_key: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            source_encoding: SourceEncoding::Jpeg,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            mime_policy: SourceMimePolicy::Legacy,
            api_base_url: None,
            api_key: None,
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_base_url = env::var("GEMINI_API_BASE")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let timeout = env::var("AIRENDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        ServiceConfig {
            timeout,
            api_base_url,
            api_key,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_source_encoding(mut self, encoding: SourceEncoding) -> Self {
        self.source_encoding = encoding;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn with_mime_policy(mut self, policy: SourceMimePolicy) -> Self {
        self.mime_policy = policy;
        self
    }

    pub fn with_credentials(
        mut self,
        api_base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        self.api_base_url = Some(api_base_url.into());
        self.api_key = Some(api_key.into());
        self
    }

    pub fn declared_source_mime(&self) -> &'static str {
        self.mime_policy.declared_mime(self.source_encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_policy_labels_jpeg_as_png() {
        let config = ServiceConfig::new();
        assert_eq!(config.source_encoding, SourceEncoding::Jpeg);
        assert_eq!(config.declared_source_mime(), "image/png");
    }

    #[test]
    fn match_encoding_declares_real_type() {
        let config = ServiceConfig::new().with_mime_policy(SourceMimePolicy::MatchEncoding);
        assert_eq!(config.declared_source_mime(), "image/jpeg");

        let png = config.with_source_encoding(SourceEncoding::Png);
        assert_eq!(png.declared_source_mime(), "image/png");
    }

    #[test]
    fn defaults_use_five_minute_timeout() {
        let config = ServiceConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.jpeg_quality, 90);
        assert_eq!(ServiceConfig::new().with_jpeg_quality(0).jpeg_quality, 1);
    }
}
