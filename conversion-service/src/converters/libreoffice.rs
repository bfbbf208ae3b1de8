use crate::converters::converter::{ConversionRequest, Converter};
use crate::converters::executor::CommandExecutor;
use crate::models::{ConversionKind, DocumentFormat};
use async_trait::async_trait;
use service_core::error::AppError;
use std::path::Path;

/// Profile directory created inside each output dir. Concurrent soffice
/// processes sharing one profile block each other.
const PROFILE_DIR: &str = ".lo-profile";

/// Drives LibreOffice in headless mode.
pub struct LibreOfficeConverter {
    program: String,
}

impl LibreOfficeConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn target_filter(target: DocumentFormat) -> &'static str {
        match target {
            DocumentFormat::Pdf => "pdf:writer_pdf_Export",
            DocumentFormat::Docx => "docx:MS Word 2007 XML",
            DocumentFormat::Doc => "doc:MS Word 97",
        }
    }

    pub fn build_args(request: &ConversionRequest<'_>) -> Vec<String> {
        let profile = request.output_dir.join(PROFILE_DIR);
        let mut args = vec![
            format!("-env:UserInstallation={}", file_url(&profile)),
            "--headless".to_string(),
            "--nologo".to_string(),
            "--norestore".to_string(),
            "--nofirststartwizard".to_string(),
            "--nodefault".to_string(),
        ];

        // Without the import filter soffice opens PDFs in Draw
        if request.input_format == DocumentFormat::Pdf {
            args.push("--infilter=writer_pdf_import".to_string());
        }

        args.push("--convert-to".to_string());
        args.push(Self::target_filter(request.kind.target()).to_string());
        args.push(request.input.display().to_string());
        args.push("--outdir".to_string());
        args.push(request.output_dir.display().to_string());
        args
    }
}

fn file_url(path: &Path) -> String {
    let raw = path.display().to_string().replace('\\', "/");
    let encoded = raw
        .split('/')
        .enumerate()
        .map(|(i, segment)| {
            // Keep a Windows drive letter such as `C:` readable
            if i == 0 && segment.ends_with(':') {
                segment.to_string()
            } else {
                urlencoding::encode(segment).into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("/");

    if encoded.starts_with('/') {
        format!("file://{}", encoded)
    } else {
        format!("file:///{}", encoded)
    }
}

#[async_trait]
impl Converter for LibreOfficeConverter {
    fn name(&self) -> &'static str {
        "libreoffice"
    }

    fn supports(&self, _kind: ConversionKind) -> bool {
        true
    }

    async fn convert(
        &self,
        request: &ConversionRequest<'_>,
        executor: &CommandExecutor,
    ) -> Result<(), AppError> {
        let args = Self::build_args(request);

        tracing::info!(
            converter = self.name(),
            kind = %request.kind,
            input = ?request.input,
            "Invoking conversion engine"
        );

        executor
            .execute(&self.program, &args, Some(request.output_dir))
            .await
            .map_err(|e| AppError::ConversionFailed(anyhow::Error::new(e)))?;

        Ok(())
    }
}
