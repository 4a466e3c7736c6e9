use std::env;
use std::path::PathBuf;
use url::Url;
use validator::Validate;

pub const DEFAULT_OCR_ENDPOINT: &str = "https://api.ocr.space/parse/image";
pub const DEFAULT_COMPLETION_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_COMPLETION_MODEL: &str = "llama3-8b-8192";

/// OCR provider settings
#[derive(Debug, Clone, Validate)]
pub struct OcrConfig {
    /// API key sent as the `apikey` form field (env: OCR_SPACE_KEY)
    #[validate(length(min = 1, message = "OCR_SPACE_KEY must be set"))]
    pub api_key: String,

    /// Parse endpoint (default: OCR.space `/parse/image`)
    pub endpoint: Url,

    /// OCR language code (default: "eng")
    #[validate(length(min = 1, message = "OCR_LANGUAGE must not be empty"))]
    pub language: String,
}

/// Chat-completion provider settings
#[derive(Debug, Clone, Validate)]
pub struct CompletionConfig {
    /// Bearer token for the completion API (env: GROQ_API_KEY)
    #[validate(length(min = 1, message = "GROQ_API_KEY must be set"))]
    pub api_key: String,

    /// Full chat completions URL (default: Groq's OpenAI-compatible endpoint)
    pub endpoint: Url,

    #[validate(length(min = 1, message = "COMPLETION_MODEL must not be empty"))]
    pub model: String,
}

/// Application configuration, sourced from the environment
#[derive(Debug, Clone, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub ocr: OcrConfig,

    #[validate(nested)]
    pub completion: CompletionConfig,

    /// Maximum accepted image size in bytes (default: 10 MB)
    #[validate(range(min = 1, message = "MAX_UPLOAD_SIZE must be positive"))]
    pub max_upload_size: usize,

    /// Directory for transient uploads (default: "uploads")
    pub upload_dir: PathBuf,

    /// Pre-built UI bundle to serve on unmatched routes
    pub static_dir: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: Url::parse(DEFAULT_OCR_ENDPOINT).expect("valid default OCR URL"),
            language: "eng".to_string(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: Url::parse(DEFAULT_COMPLETION_ENDPOINT)
                .expect("valid default completion URL"),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            completion: CompletionConfig::default(),
            max_upload_size: 10 * 1024 * 1024, // 10 MB
            upload_dir: PathBuf::from("uploads"),
            static_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            ocr: OcrConfig {
                api_key: env::var("OCR_SPACE_KEY").unwrap_or(default.ocr.api_key),
                endpoint: url_var("OCR_ENDPOINT").unwrap_or(default.ocr.endpoint),
                language: env::var("OCR_LANGUAGE").unwrap_or(default.ocr.language),
            },

            completion: CompletionConfig {
                api_key: env::var("GROQ_API_KEY").unwrap_or(default.completion.api_key),
                endpoint: url_var("COMPLETION_ENDPOINT").unwrap_or(default.completion.endpoint),
                model: env::var("COMPLETION_MODEL").unwrap_or(default.completion.model),
            },

            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            static_dir: env::var("STATIC_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Config pointing both providers at one base URL, such as a local mock
    /// server or a gateway that proxies both APIs
    pub fn with_provider_base(
        base: &Url,
        ocr_key: impl Into<String>,
        completion_key: impl Into<String>,
    ) -> Self {
        let default = Self::default();
        Self {
            ocr: OcrConfig {
                api_key: ocr_key.into(),
                endpoint: base.join("parse/image").unwrap_or_else(|_| base.clone()),
                ..default.ocr
            },
            completion: CompletionConfig {
                api_key: completion_key.into(),
                endpoint: base
                    .join("openai/v1/chat/completions")
                    .unwrap_or_else(|_| base.clone()),
                ..default.completion
            },
            ..default
        }
    }
}

fn url_var(key: &str) -> Option<Url> {
    let raw = env::var(key).ok()?;
    match Url::parse(&raw) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!("Ignoring invalid {}='{}': {}", key, raw, e);
            None
        }
    }
}
