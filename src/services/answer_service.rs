use crate::api::error::AppError;
use crate::config::AppConfig;
use crate::models::ExtractTextResponse;
use crate::services::completion::{ChatCompletionClient, CompletionProvider};
use crate::services::ocr::{OcrSpaceClient, TextExtractor};
use crate::services::prompt::compose_prompt;
use crate::services::upload::UploadedImage;
use std::sync::Arc;
use tracing::info;

/// Runs one uploaded image through OCR and the completion model.
///
/// Stages run strictly in order and stop at the first failure; the staged
/// upload is released once the pipeline finishes, whatever the outcome.
pub struct AnswerService {
    extractor: Arc<dyn TextExtractor>,
    completer: Arc<dyn CompletionProvider>,
    language: String,
}

impl AnswerService {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        completer: Arc<dyn CompletionProvider>,
        language: String,
    ) -> Self {
        Self {
            extractor,
            completer,
            language,
        }
    }

    /// Build the HTTP-backed providers described by `config`
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self::new(
            Arc::new(OcrSpaceClient::new(client.clone(), &config.ocr)),
            Arc::new(ChatCompletionClient::new(client, &config.completion)),
            config.ocr.language.clone(),
        ))
    }

    pub async fn answer(&self, image: UploadedImage) -> Result<ExtractTextResponse, AppError> {
        let outcome = self.run_pipeline(&image).await;
        image.discard();
        outcome
    }

    async fn run_pipeline(&self, image: &UploadedImage) -> Result<ExtractTextResponse, AppError> {
        info!(
            "🖼️  Processing {} byte {} image",
            image.size(),
            image.file_type()
        );
        let text = self
            .extractor
            .extract_text(image.path(), image.file_type(), &self.language)
            .await?;
        info!("🔎 Extracted {} characters of text", text.chars().count());

        let prompt = compose_prompt(&text);
        let answer = self.completer.complete(&prompt).await?;
        info!("🤖 Received answer ({} characters)", answer.chars().count());

        Ok(ExtractTextResponse { text, answer })
    }
}
