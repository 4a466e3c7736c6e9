use crate::api::error::AppError;
use axum::extract::Multipart;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use futures::TryStreamExt;
use std::path::Path;
use tempfile::TempPath;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// An image staged on local disk for the lifetime of one request.
///
/// The backing file is removed when the value is dropped, so every exit
/// path of the handler releases it. [`UploadedImage::discard`] releases it
/// explicitly and logs a failed deletion instead of ignoring it.
#[derive(Debug)]
pub struct UploadedImage {
    path: TempPath,
    file_type: String,
    size: u64,
}

impl UploadedImage {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Image subtype passed to the OCR provider (`png`, `jpeg`, ...)
    pub fn file_type(&self) -> &str {
        &self.file_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Delete the staged file. Consumes the image so it can only run once.
    pub fn discard(self) {
        let staged_at = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => tracing::debug!("Removed staged upload {}", staged_at),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Staged upload {} was already removed", staged_at)
            }
            Err(e) => tracing::warn!("Failed to delete staged upload {}: {}", staged_at, e),
        }
    }

    #[cfg(test)]
    pub(crate) fn stage_bytes(dir: &Path, bytes: &[u8], file_type: &str) -> Self {
        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(dir)
            .unwrap();
        std::io::Write::write_all(&mut file, bytes).unwrap();
        Self {
            path: file.into_temp_path(),
            file_type: file_type.to_string(),
            size: bytes.len() as u64,
        }
    }
}

/// Read the single `image` field of a multipart body into `upload_dir`.
///
/// Fails with [`AppError::MissingUpload`] when no (non-empty) image is
/// present. On failure the remaining multipart stream is drained.
pub async fn receive_image(
    mut multipart: Multipart,
    upload_dir: &Path,
    max_size: usize,
) -> Result<UploadedImage, AppError> {
    let mut staged: Option<UploadedImage> = None;

    let result: Result<UploadedImage, AppError> = async {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            if field.name() != Some(IMAGE_FIELD) {
                continue;
            }
            if staged.is_some() {
                return Err(AppError::BadRequest(
                    "Only one image may be uploaded per request".to_string(),
                ));
            }
            staged = Some(stage_field(field, upload_dir, max_size).await?);
        }

        staged.take().ok_or(AppError::MissingUpload)
    }
    .await;

    match result {
        Ok(image) => Ok(image),
        Err(e) => {
            // Keep the connection healthy for the client reading our error
            tracing::warn!("Upload rejected: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}

async fn stage_field(
    field: Field<'_>,
    upload_dir: &Path,
    max_size: usize,
) -> Result<UploadedImage, AppError> {
    let declared_type = field.content_type().map(|s| s.to_string());
    let original_name = field.file_name().unwrap_or("unnamed").to_string();

    let temp_file = tempfile::Builder::new()
        .prefix("upload-")
        .tempfile_in(upload_dir)
        .map_err(|e| AppError::Internal(format!("Failed to create temp file: {}", e)))?;
    let (file, path) = temp_file.into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let body_with_io_error = field.map_err(std::io::Error::other);
    let mut reader = StreamReader::new(body_with_io_error).take(max_size as u64 + 1);

    // Peek for magic bytes
    let mut header_buffer = [0u8; 1024];
    let n = reader.read(&mut header_buffer).await.map_err(stream_error)?;
    let header = &header_buffer[..n];

    file.write_all(header)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let copied = tokio::io::copy(&mut reader, &mut file)
        .await
        .map_err(stream_error)?;
    file.flush()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let size = n as u64 + copied;
    if size > max_size as u64 {
        return Err(AppError::PayloadTooLarge(format!(
            "Image exceeds the maximum size of {} bytes",
            max_size
        )));
    }
    if size == 0 {
        return Err(AppError::MissingUpload);
    }

    let file_type = resolve_file_type(declared_type.as_deref(), header).ok_or_else(|| {
        AppError::BadRequest("Uploaded file is not a recognized image".to_string())
    })?;

    tracing::info!(
        "Staged upload '{}' ({} bytes, type {}) at {}",
        original_name,
        size,
        file_type,
        path.display()
    );

    Ok(UploadedImage {
        path,
        file_type,
        size,
    })
}

/// Subtype of the declared image content type, or of the sniffed one when
/// the client sent nothing usable. Sniffed non-image formats yield `None`.
pub fn resolve_file_type(declared: Option<&str>, header: &[u8]) -> Option<String> {
    let declared = declared.and_then(|ct| ct.parse::<mime::Mime>().ok());
    if let Some(m) = &declared {
        if m.type_() == mime::IMAGE {
            return Some(m.subtype().as_str().to_lowercase());
        }
    }

    let kind = infer::get(header).filter(|k| k.matcher_type() == infer::MatcherType::Image)?;
    let sniffed = kind.mime_type().parse::<mime::Mime>().ok()?;
    Some(sniffed.subtype().as_str().to_lowercase())
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

fn stream_error(e: std::io::Error) -> AppError {
    let status = e
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<MultipartError>())
        .map(|me| me.status());

    match status {
        Some(StatusCode::PAYLOAD_TOO_LARGE) => {
            AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
        }
        Some(_) => AppError::BadRequest(format!("Malformed upload: {}", e)),
        None => AppError::Internal(format!("Failed to stage upload: {}", e)),
    }
}
