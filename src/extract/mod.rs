//! Text extraction from uploaded documents.
//!
//! Each supported format (plain text, PDF, DOCX) implements [`TextExtractor`].
//! The [`extractor_for()`] factory returns the right extractor for a format,
//! and [`process_document()`] runs the whole thing for a file on disk.

pub mod docx;
pub mod error;
pub mod pdf;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::{ExtractError, ExtractResult};

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFormat {
    PlainText,
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Human-readable name for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "text",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    /// Canonical dotted extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::PlainText => ".txt",
            Self::Pdf => ".pdf",
            Self::Docx => ".docx",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text pulled out of a document.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Trimmed text content.
    pub text: String,
    pub format: DocumentFormat,
    /// Whitespace-delimited word count.
    pub word_count: usize,
    /// Paragraph blocks, in document order (input for chunking).
    pub paragraphs: Vec<String>,
}

impl ExtractedText {
    /// Build from raw text, splitting paragraphs on blank lines.
    pub fn from_text(text: String, format: DocumentFormat) -> Self {
        let text = text.trim().to_string();
        let paragraphs = split_paragraphs(&text);
        Self {
            word_count: text.split_whitespace().count(),
            text,
            format,
            paragraphs,
        }
    }

    /// Build from explicit paragraphs (DOCX), joined with newlines.
    pub fn from_paragraphs(paragraphs: Vec<String>, format: DocumentFormat) -> Self {
        let paragraphs: Vec<String> = paragraphs
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        let text = paragraphs.join("\n");
        Self {
            word_count: text.split_whitespace().count(),
            text,
            format,
            paragraphs,
        }
    }
}

/// Trait for format-specific text extractors.
pub trait TextExtractor {
    /// Extract text from raw bytes.
    fn extract(&self, data: &[u8]) -> ExtractResult<ExtractedText>;

    /// The format this extractor handles.
    fn format(&self) -> DocumentFormat;
}

/// Get the appropriate extractor for a format.
pub fn extractor_for(format: DocumentFormat) -> Box<dyn TextExtractor + Send + Sync> {
    match format {
        DocumentFormat::PlainText => Box::new(PlainTextExtractor),
        DocumentFormat::Pdf => Box::new(pdf::PdfExtractor),
        DocumentFormat::Docx => Box::new(docx::DocxExtractor),
    }
}

/// Lowercased extension including the leading dot, or `""` when there is none.
///
/// Dotfiles like `.env` have no extension, matching `os.path.splitext` rules.
pub fn file_extension(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let stem_offset = name.len() - name.trim_start_matches('.').len();
    match name[stem_offset..].rfind('.') {
        Some(pos) => name[stem_offset + pos..].to_lowercase(),
        None => String::new(),
    }
}

/// Detect the format from a file name's extension.
pub fn detect_format(filename: &str) -> Option<DocumentFormat> {
    match file_extension(filename).as_str() {
        ".txt" => Some(DocumentFormat::PlainText),
        ".pdf" => Some(DocumentFormat::Pdf),
        ".docx" => Some(DocumentFormat::Docx),
        _ => None,
    }
}

/// Extract text from in-memory bytes, choosing the extractor by file name.
///
/// Empty results are an error: there is nothing to classify.
pub fn extract_bytes(filename: &str, data: &[u8]) -> ExtractResult<ExtractedText> {
    let format = detect_format(filename).ok_or_else(|| ExtractError::UnsupportedFormat {
        extension: file_extension(filename),
    })?;
    let extracted = extractor_for(format).extract(data)?;
    if extracted.text.is_empty() {
        return Err(ExtractError::EmptyDocument {
            origin: filename.to_string(),
        });
    }
    Ok(extracted)
}

/// Read a saved document from disk and extract its text.
pub fn process_document(path: &Path) -> ExtractResult<ExtractedText> {
    let data = std::fs::read(path).map_err(|e| ExtractError::Io { source: e })?;
    let name = path.display().to_string();
    extract_bytes(&name, &data).inspect_err(|e| {
        tracing::warn!(path = %name, "error processing document: {e}");
    })
}

fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Plain UTF-8 text. A leading byte-order mark is dropped.
struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::PlainText
    }

    fn extract(&self, data: &[u8]) -> ExtractResult<ExtractedText> {
        let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
        let text = std::str::from_utf8(data).map_err(|e| ExtractError::ParseError {
            format: "text".into(),
            message: format!("invalid UTF-8: {e}"),
        })?;
        Ok(ExtractedText::from_text(
            text.replace("\r\n", "\n"),
            DocumentFormat::PlainText,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_rules() {
        assert_eq!(file_extension("report.PDF"), ".pdf");
        assert_eq!(file_extension("archive.tar.gz"), ".gz");
        assert_eq!(file_extension("README"), "");
        assert_eq!(file_extension(".env"), "");
        assert_eq!(file_extension("dir.d/notes"), "");
        assert_eq!(file_extension("uploads/abc.docx"), ".docx");
    }

    #[test]
    fn detect_known_formats() {
        assert_eq!(detect_format("a.txt"), Some(DocumentFormat::PlainText));
        assert_eq!(detect_format("B.PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(detect_format("c.docx"), Some(DocumentFormat::Docx));
        assert_eq!(detect_format("d.doc"), None);
        assert_eq!(detect_format("image.png"), None);
    }

    #[test]
    fn plain_text_trims_and_splits() {
        let doc = PlainTextExtractor
            .extract(b"\xEF\xBB\xBF  Title\r\n\r\nFirst paragraph.\r\n\r\nSecond one.\n\n")
            .unwrap();
        assert_eq!(doc.text, "Title\n\nFirst paragraph.\n\nSecond one.");
        assert_eq!(doc.paragraphs.len(), 3);
        assert_eq!(doc.word_count, 5);
    }

    #[test]
    fn plain_text_rejects_invalid_utf8() {
        let err = PlainTextExtractor.extract(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, ExtractError::ParseError { .. }));
    }

    #[test]
    fn whitespace_only_is_empty_document() {
        let err = extract_bytes("blank.txt", b" \n\n\t ").unwrap_err();
        assert!(matches!(err, ExtractError::EmptyDocument { .. }));
    }

    #[test]
    fn unknown_extension_rejected() {
        let err = extract_bytes("slides.pptx", b"whatever").unwrap_err();
        match err {
            ExtractError::UnsupportedFormat { extension } => assert_eq!(extension, ".pptx"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn process_saved_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("memo.txt");
        std::fs::write(&path, "Quarterly revenue grew.").unwrap();
        let doc = process_document(&path).unwrap();
        assert_eq!(doc.text, "Quarterly revenue grew.");
        assert_eq!(doc.format, DocumentFormat::PlainText);
    }

    #[test]
    fn process_missing_file_is_io_error() {
        let err = process_document(Path::new("/nonexistent/memo.txt")).unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }
}
