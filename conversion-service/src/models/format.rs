use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
const ZIP_MAGIC: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
const PDF_MAGIC: &[u8] = b"%PDF";

/// How far into a PDF to look for text operators.
const TEXT_SCAN_LIMIT: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Doc,
    Docx,
    Pdf,
}

impl DocumentFormat {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = Path::new(filename).extension()?.to_str()?;
        match extension.to_ascii_lowercase().as_str() {
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Identify a format from its leading magic bytes.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(OLE2_MAGIC) {
            Some(Self::Doc)
        } else if data.starts_with(ZIP_MAGIC) {
            Some(Self::Docx)
        } else if data.starts_with(PDF_MAGIC) {
            Some(Self::Pdf)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Pdf => "pdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Doc => "application/msword",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Pdf => "application/pdf",
        }
    }

    pub fn is_word(&self) -> bool {
        matches!(self, Self::Doc | Self::Docx)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionKind {
    WordToPdf,
    PdfToWord,
    PdfToDoc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatRejection {
    /// The file name does not carry an extension this conversion accepts.
    UnsupportedExtension,
    /// The bytes do not look like the declared family.
    ContentMismatch,
}

impl ConversionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WordToPdf => "word-to-pdf",
            Self::PdfToWord => "pdf-to-word",
            Self::PdfToDoc => "pdf-to-doc",
        }
    }

    pub fn target(&self) -> DocumentFormat {
        match self {
            Self::WordToPdf => DocumentFormat::Pdf,
            Self::PdfToWord => DocumentFormat::Docx,
            Self::PdfToDoc => DocumentFormat::Doc,
        }
    }

    pub fn accepts(&self, format: DocumentFormat) -> bool {
        match self {
            Self::WordToPdf => format.is_word(),
            Self::PdfToWord | Self::PdfToDoc => format == DocumentFormat::Pdf,
        }
    }

    pub fn rejection_message(&self) -> &'static str {
        match self {
            Self::WordToPdf => "Only Word files are allowed",
            Self::PdfToWord | Self::PdfToDoc => "Only PDF files are allowed",
        }
    }

    /// Decide the real input format from the client's file name and the
    /// content header. A `.doc` that is really a `.docx` (or the reverse) is
    /// accepted as what the bytes say it is.
    pub fn resolve_input(
        &self,
        filename: &str,
        data: &[u8],
    ) -> Result<DocumentFormat, FormatRejection> {
        let declared = DocumentFormat::from_filename(filename)
            .filter(|f| self.accepts(*f))
            .ok_or(FormatRejection::UnsupportedExtension)?;

        match DocumentFormat::sniff(data) {
            Some(actual) if self.accepts(actual) => {
                if actual != declared {
                    tracing::debug!(
                        declared = %declared,
                        actual = %actual,
                        "Upload extension disagrees with content, using content"
                    );
                }
                Ok(actual)
            }
            _ => Err(FormatRejection::ContentMismatch),
        }
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rough check for a text layer: scanned PDFs carry only images, so the
/// engine will produce an empty document for them.
pub fn pdf_has_text_layer(data: &[u8]) -> bool {
    let window = &data[..data.len().min(TEXT_SCAN_LIMIT)];
    let contains = |needle: &[u8]| window.windows(needle.len()).any(|w| w == needle);

    contains(b"/Font") || contains(b"Tj") || contains(b"TJ") || (contains(b"BT") && contains(b"ET"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC_BYTES: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    const DOCX_BYTES: &[u8] = &[0x50, 0x4B, 0x03, 0x04, 0x14, 0x00];
    const PDF_BYTES: &[u8] = b"%PDF-1.7\n";

    #[test]
    fn extension_is_case_insensitive() {
        assert_eq!(
            DocumentFormat::from_filename("Report.DOCX"),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(
            DocumentFormat::from_filename("a.b.pdf"),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(DocumentFormat::from_filename("notes.txt"), None);
        assert_eq!(DocumentFormat::from_filename("docx"), None);
    }

    #[test]
    fn sniff_recognises_magic_numbers() {
        assert_eq!(DocumentFormat::sniff(DOC_BYTES), Some(DocumentFormat::Doc));
        assert_eq!(DocumentFormat::sniff(DOCX_BYTES), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::sniff(PDF_BYTES), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::sniff(b"%PD"), None);
        assert_eq!(DocumentFormat::sniff(b"hello world"), None);
    }

    #[test]
    fn word_to_pdf_rejects_pdf_extension() {
        assert_eq!(
            ConversionKind::WordToPdf.resolve_input("file.pdf", PDF_BYTES),
            Err(FormatRejection::UnsupportedExtension)
        );
    }

    #[test]
    fn word_flavour_follows_content() {
        assert_eq!(
            ConversionKind::WordToPdf.resolve_input("legacy.doc", DOCX_BYTES),
            Ok(DocumentFormat::Docx)
        );
        assert_eq!(
            ConversionKind::WordToPdf.resolve_input("modern.docx", DOC_BYTES),
            Ok(DocumentFormat::Doc)
        );
    }

    #[test]
    fn pdf_with_wrong_content_is_mismatch() {
        assert_eq!(
            ConversionKind::PdfToWord.resolve_input("scan.pdf", DOCX_BYTES),
            Err(FormatRejection::ContentMismatch)
        );
        assert_eq!(
            ConversionKind::WordToPdf.resolve_input("fake.docx", b"plain text"),
            Err(FormatRejection::ContentMismatch)
        );
    }

    #[test]
    fn targets() {
        assert_eq!(ConversionKind::WordToPdf.target(), DocumentFormat::Pdf);
        assert_eq!(ConversionKind::PdfToWord.target(), DocumentFormat::Docx);
        assert_eq!(ConversionKind::PdfToDoc.target(), DocumentFormat::Doc);
    }

    #[test]
    fn kind_serializes_as_route_segment() {
        assert_eq!(
            serde_json::to_string(&ConversionKind::PdfToDoc).unwrap(),
            "\"pdf-to-doc\""
        );
    }

    #[test]
    fn text_layer_detection() {
        assert!(pdf_has_text_layer(b"%PDF-1.4 BT /F1 12 Tf (Hi) Tj ET"));
        assert!(!pdf_has_text_layer(b"%PDF-1.4 /XObject /Image"));
    }
}
