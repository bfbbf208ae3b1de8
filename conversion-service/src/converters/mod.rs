mod converter;
mod executor;
mod libreoffice;

pub use converter::{ConversionRequest, Converter, ConverterRegistry};
pub use executor::{CommandError, CommandExecutor};
pub use libreoffice::LibreOfficeConverter;
