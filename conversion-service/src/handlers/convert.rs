use crate::models::{ConversionKind, DocumentFormat};
use crate::handlers::upload::read_upload;
use crate::services::Converted;
use crate::startup::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use service_core::error::AppError;

pub async fn word_to_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    convert(state, ConversionKind::WordToPdf, multipart).await
}

pub async fn pdf_to_word(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    convert(state, ConversionKind::PdfToWord, multipart).await
}

async fn convert(
    state: AppState,
    kind: ConversionKind,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let upload = read_upload(multipart, kind).await?;
    let converted = state.conversions.convert(kind, upload).await?;

    tracing::info!(
        kind = %kind,
        filename = %converted.filename,
        size = converted.data.len(),
        "Returning converted document"
    );

    Ok(attachment(converted))
}

pub fn attachment(converted: Converted) -> Response {
    let Converted {
        filename,
        format,
        data,
    } = converted;

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type(format)),
            (header::CONTENT_DISPOSITION, content_disposition(&filename)),
        ],
        data,
    )
        .into_response()
}

fn content_type(format: DocumentFormat) -> HeaderValue {
    HeaderValue::from_static(format.mime_type())
}

/// `attachment` with an ASCII fallback name plus the RFC 5987 UTF-8 form.
pub fn content_disposition(filename: &str) -> HeaderValue {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    );

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
