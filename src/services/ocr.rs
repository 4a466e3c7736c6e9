use crate::config::OcrConfig;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Returned in place of text when the provider finds nothing
pub const NO_TEXT_FOUND: &str = "No text found";

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("failed to read staged image: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("OCR provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("OCR provider reported a processing error: {0}")]
    Provider(String),

    #[error("malformed OCR response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Trait for OCR implementations
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the text of the image stored at `image_path`.
    ///
    /// `file_type` is the image subtype (`png`, `jpeg`, ...), `language` the
    /// provider language code.
    async fn extract_text(
        &self,
        image_path: &Path,
        file_type: &str,
        language: &str,
    ) -> Result<String, ExtractionError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrResponse {
    #[serde(default)]
    parsed_results: Option<Vec<ParsedResult>>,
    #[serde(default)]
    is_errored_on_processing: bool,
    // Either a string or a list of strings depending on the failure
    #[serde(default)]
    error_message: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: Option<String>,
}

impl OcrResponse {
    fn into_text(self) -> Result<String, ExtractionError> {
        if self.is_errored_on_processing {
            let reason = match self.error_message {
                Some(serde_json::Value::String(s)) => s,
                Some(serde_json::Value::Array(items)) => items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
                Some(other) => other.to_string(),
                None => "unknown error".to_string(),
            };
            return Err(ExtractionError::Provider(reason));
        }

        let text = self
            .parsed_results
            .and_then(|results| results.into_iter().next())
            .and_then(|first| first.parsed_text)
            .filter(|text| !text.is_empty());

        Ok(text.unwrap_or_else(|| NO_TEXT_FOUND.to_string()))
    }
}

/// OCR.space `/parse/image` client
pub struct OcrSpaceClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl OcrSpaceClient {
    pub fn new(client: Client, config: &OcrConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl TextExtractor for OcrSpaceClient {
    async fn extract_text(
        &self,
        image_path: &Path,
        file_type: &str,
        language: &str,
    ) -> Result<String, ExtractionError> {
        let bytes = tokio::fs::read(image_path).await?;
        let size = bytes.len();

        let stem = image_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");
        let part = Part::bytes(bytes)
            .file_name(format!("{}.{}", stem, file_type))
            .mime_str(&format!("image/{}", file_type))?;

        let form = Form::new()
            .part("file", part)
            .text("apikey", self.api_key.clone())
            .text("language", language.to_string())
            .text("filetype", file_type.to_string());

        tracing::debug!(
            "Sending {} bytes ({}) to OCR provider at {}",
            size,
            file_type,
            self.endpoint
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OcrResponse = serde_json::from_str(&body)?;
        parsed.into_text()
    }
}
