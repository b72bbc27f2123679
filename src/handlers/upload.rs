// src/handlers/upload.rs

use axum::extract::multipart::Field;

use crate::error::AppError;

/// A file part read from a multipart form.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Reads a file part, refusing anything over `max_bytes`.
pub async fn read_file(mut field: Field<'_>, max_bytes: usize) -> Result<UploadedFile, AppError> {
    let file_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if bytes.len() + chunk.len() > max_bytes {
            return Err(AppError::BadRequest(format!(
                "File size exceeds {}MB limit",
                max_bytes / (1024 * 1024)
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(UploadedFile {
        file_name,
        content_type,
        bytes,
    })
}

/// Reads a text part, treating blank values as absent.
pub async fn read_text(field: Field<'_>) -> Result<Option<String>, AppError> {
    let text = field.text().await?;
    let text = text.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}
