use crate::converters::{CommandExecutor, ConversionRequest, ConverterRegistry};
use crate::models::{pdf_has_text_layer, ConversionKind, DocumentFormat};
use crate::services::metrics::{record_conversion_finished, record_conversion_started};
use crate::services::storage::{Storage, Workspace};
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Instant;

/// Validated upload ready to be converted.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub format: DocumentFormat,
    pub data: Vec<u8>,
}

/// The converted file, read back into memory.
#[derive(Debug)]
pub struct Converted {
    pub filename: String,
    pub format: DocumentFormat,
    pub data: Vec<u8>,
}

/// Sequences one conversion: place the input in a workspace, run the engine,
/// and check that it produced the expected file.
#[derive(Clone)]
pub struct ConversionService {
    storage: Arc<dyn Storage>,
    registry: Arc<ConverterRegistry>,
    executor: CommandExecutor,
}

impl ConversionService {
    pub fn new(
        storage: Arc<dyn Storage>,
        registry: Arc<ConverterRegistry>,
        executor: CommandExecutor,
    ) -> Self {
        Self {
            storage,
            registry,
            executor,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Store the upload in a fresh workspace.
    pub async fn stage(&self, workspace: &Workspace, upload: Upload) -> Result<(), AppError> {
        if upload.format == DocumentFormat::Pdf && !pdf_has_text_layer(&upload.data) {
            tracing::warn!(
                filename = %upload.filename,
                "PDF has no detectable text layer, output may be empty"
            );
        }
        self.storage.upload(&workspace.input_key(), upload.data).await
    }

    /// Run the engine over a staged workspace. Returns the output key.
    pub async fn run(
        &self,
        workspace: &Workspace,
        kind: ConversionKind,
        input_format: DocumentFormat,
    ) -> Result<String, AppError> {
        let converter = self.registry.find_converter(kind).ok_or_else(|| {
            AppError::ConversionFailed(anyhow::anyhow!("No converter registered for {}", kind))
        })?;

        let input = self.storage.resolve(&workspace.input_key());
        let output_dir = self.storage.resolve(&workspace.id);
        let output_key = workspace.output_key(kind.target().extension());

        let request = ConversionRequest {
            kind,
            input: &input,
            input_format,
            output_dir: &output_dir,
        };

        record_conversion_started(kind);
        let start = Instant::now();

        let result = converter.convert(&request, &self.executor).await.and_then(|_| {
            if self.storage.resolve(&output_key).is_file() {
                Ok(())
            } else {
                Err(AppError::ConversionFailed(anyhow::anyhow!(
                    "{} exited cleanly but produced no {}",
                    converter.name(),
                    output_key
                )))
            }
        });

        record_conversion_finished(kind, start.elapsed(), result.is_ok());

        match result {
            Ok(()) => {
                tracing::info!(
                    kind = %kind,
                    workspace = %workspace.id,
                    duration_ms = start.elapsed().as_millis(),
                    "Conversion succeeded"
                );
                Ok(output_key)
            }
            Err(e) => {
                tracing::error!(
                    kind = %kind,
                    workspace = %workspace.id,
                    error = %e,
                    "Conversion failed"
                );
                Err(e)
            }
        }
    }

    /// Full synchronous conversion. The workspace is removed whatever the
    /// outcome.
    pub async fn convert(&self, kind: ConversionKind, upload: Upload) -> Result<Converted, AppError> {
        let workspace = Workspace::new(upload.filename.clone());
        let input_format = upload.format;

        let result = async {
            self.stage(&workspace, upload).await?;
            let output_key = self.run(&workspace, kind, input_format).await?;
            self.storage.download(&output_key).await
        }
        .await;

        self.discard(&workspace).await;

        let data = result?;
        Ok(Converted {
            filename: workspace.output_name(kind.target().extension()),
            format: kind.target(),
            data,
        })
    }

    /// Best-effort removal of a workspace; failures are only logged.
    pub async fn discard(&self, workspace: &Workspace) {
        if let Err(e) = self.storage.delete_workspace(&workspace.id).await {
            tracing::warn!(
                workspace = %workspace.id,
                error = %e,
                "Failed to clean up conversion workspace"
            );
        }
    }
}
