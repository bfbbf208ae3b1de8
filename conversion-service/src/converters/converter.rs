use crate::config::ConverterConfig;
use crate::converters::executor::CommandExecutor;
use crate::converters::LibreOfficeConverter;
use crate::models::{ConversionKind, DocumentFormat};
use async_trait::async_trait;
use service_core::error::AppError;
use std::path::Path;

/// One conversion handed to an engine: convert `input` and write the result
/// into `output_dir` as `<input stem>.<target extension>`.
#[derive(Debug)]
pub struct ConversionRequest<'a> {
    pub kind: ConversionKind,
    pub input: &'a Path,
    pub input_format: DocumentFormat,
    pub output_dir: &'a Path,
}

#[async_trait]
pub trait Converter: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, kind: ConversionKind) -> bool;

    async fn convert(
        &self,
        request: &ConversionRequest<'_>,
        executor: &CommandExecutor,
    ) -> Result<(), AppError>;
}

pub struct ConverterRegistry {
    converters: Vec<Box<dyn Converter>>,
}

impl ConverterRegistry {
    pub fn new(config: &ConverterConfig) -> Self {
        Self::with_converters(vec![Box::new(LibreOfficeConverter::new(
            config.soffice_path.clone(),
        ))])
    }

    pub fn with_converters(converters: Vec<Box<dyn Converter>>) -> Self {
        Self { converters }
    }

    pub fn find_converter(&self, kind: ConversionKind) -> Option<&dyn Converter> {
        self.converters
            .iter()
            .find(|c| c.supports(kind))
            .map(|b| b.as_ref())
    }
}
