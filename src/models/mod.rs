use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Successful result of `POST /api/extract-text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ExtractTextResponse {
    /// Text recognized in the image, or "No text found"
    pub text: String,
    /// Model answer, or "No response from AI"
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Multipart body of `POST /api/extract-text`
#[derive(ToSchema)]
pub struct ImageUpload {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}
