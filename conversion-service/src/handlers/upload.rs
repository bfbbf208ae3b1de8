use crate::models::{ConversionKind, DocumentFormat, FormatRejection};
use crate::services::{sanitize_filename, Upload};
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::http::StatusCode;
use service_core::error::AppError;

/// Name of the multipart field carrying the document.
pub const FILE_FIELD: &str = "file";

/// Pull the `file` field out of a multipart body and validate it for `kind`.
pub async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
    kind: ConversionKind,
) -> Result<Upload, AppError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!(error = %e, "Rejected non-multipart upload");
        AppError::BadRequest(anyhow::anyhow!("No file provided"))
    })?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .and_then(sanitize_filename)
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file selected")))?;

        if DocumentFormat::from_filename(&filename)
            .filter(|f| kind.accepts(*f))
            .is_none()
        {
            return Err(AppError::BadRequest(anyhow::anyhow!(kind.rejection_message())));
        }

        let data = field.bytes().await.map_err(multipart_error)?.to_vec();
        if data.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!("Uploaded file is empty")));
        }

        let format = kind.resolve_input(&filename, &data).map_err(|rejection| {
            let message = match rejection {
                FormatRejection::UnsupportedExtension => kind.rejection_message(),
                FormatRejection::ContentMismatch => "File content does not match its extension",
            };
            AppError::BadRequest(anyhow::anyhow!(message))
        })?;

        tracing::info!(
            filename = %filename,
            format = %format,
            size = data.len(),
            kind = %kind,
            "Upload accepted"
        );

        return Ok(Upload {
            filename,
            format,
            data,
        });
    }

    Err(AppError::BadRequest(anyhow::anyhow!("No file provided")))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(anyhow::anyhow!("File too large"))
    } else {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart body: {}", e.body_text()))
    }
}
