use crate::dtos::tasks::status_url;
use crate::dtos::{TaskResponse, TaskStatusParams, TaskSubmittedResponse};
use crate::handlers::convert::attachment;
use crate::handlers::upload::read_upload;
use crate::models::{ConversionKind, TaskStatus};
use crate::services::{Converted, Workspace};
use crate::startup::AppState;
use crate::workers::{enqueue, ConversionJob};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

pub async fn submit_word_to_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    submit(state, ConversionKind::WordToPdf, multipart).await
}

pub async fn submit_pdf_to_word(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    submit(state, ConversionKind::PdfToWord, multipart).await
}

pub async fn submit_pdf_to_doc(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    submit(state, ConversionKind::PdfToDoc, multipart).await
}

async fn submit(
    state: AppState,
    kind: ConversionKind,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let job_tx = state
        .job_tx
        .clone()
        .ok_or_else(|| AppError::ServiceUnavailable("Worker pool disabled".to_string()))?;

    let upload = read_upload(multipart, kind).await?;

    let task_id = Uuid::new_v4().to_string();
    let workspace = Workspace::with_id(task_id.clone(), upload.filename.clone());
    let input_format = upload.format;
    let original_filename = upload.filename.clone();

    state.conversions.stage(&workspace, upload).await?;
    let task = state.tasks.create(&task_id, &original_filename, kind);

    let job = ConversionJob {
        task_id: task_id.clone(),
        workspace: workspace.clone(),
        kind,
        input_format,
    };

    if let Err(e) = enqueue(&job_tx, job) {
        state.tasks.remove(&task_id);
        state.conversions.discard(&workspace).await;
        tracing::warn!(task_id = %task_id, error = %e, "Rejected conversion task");
        return Err(e);
    }

    tracing::info!(
        task_id = %task_id,
        kind = %kind,
        filename = %original_filename,
        "Conversion task submitted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(TaskSubmittedResponse {
            status_url: status_url(&task_id),
            task_id,
            status: task.status,
        }),
    ))
}

pub async fn task_status(
    State(state): State<AppState>,
    Query(params): Query<TaskStatusParams>,
) -> Result<Json<TaskResponse>, AppError> {
    params.validate()?;

    let task = state
        .tasks
        .get(&params.task_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Task not found")))?;

    Ok(Json(TaskResponse::from(task)))
}

pub async fn download_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response, AppError> {
    let task = state
        .tasks
        .get(&task_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Task not found")))?;

    let output_key = match (task.status, task.output_key) {
        (TaskStatus::Completed, Some(key)) => key,
        _ => {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Task is not completed"
            )))
        }
    };

    let data = state.conversions.storage().download(&output_key).await?;
    let target = task.kind.target();

    tracing::info!(
        task_id = %task_id,
        size = data.len(),
        "Serving converted task output"
    );

    Ok(attachment(Converted {
        filename: Workspace::with_id(task_id, task.original_filename)
            .output_name(target.extension()),
        format: target,
        data,
    }))
}
