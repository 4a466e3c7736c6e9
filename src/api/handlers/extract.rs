use crate::AppState;
use crate::api::error::AppError;
use crate::models::{ErrorResponse, ExtractTextResponse, ImageUpload};
use crate::services::upload::receive_image;
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};

#[utoipa::path(
    post,
    path = "/api/extract-text",
    request_body(content = ImageUpload, description = "Image of a question", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Extracted text and model answer", body = ExtractTextResponse),
        (status = 400, description = "No image provided or malformed upload", body = ErrorResponse),
        (status = 413, description = "Image too large", body = ErrorResponse),
        (status = 500, description = "OCR or completion provider failed", body = ErrorResponse)
    ),
    tag = "extract"
)]
pub async fn extract_text(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractTextResponse>, AppError> {
    let multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let image = receive_image(
        multipart,
        &state.config.upload_dir,
        state.config.max_upload_size,
    )
    .await?;

    let response = state.answer_service.answer(image).await?;
    Ok(Json(response))
}
