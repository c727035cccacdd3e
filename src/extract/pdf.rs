//! PDF text extraction using the `pdf-extract` crate.
//!
//! `pdf-extract` returns all pages as one string with form feeds between
//! pages. Pages are re-joined with a single newline, and lines inside a
//! paragraph are folded together since PDF layout breaks lines arbitrarily.

use crate::extract::error::{ExtractError, ExtractResult};
use crate::extract::{DocumentFormat, ExtractedText, TextExtractor};

/// PDF extractor backed by `pdf-extract`.
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn extract(&self, data: &[u8]) -> ExtractResult<ExtractedText> {
        let raw =
            pdf_extract::extract_text_from_mem(data).map_err(|e| ExtractError::ParseError {
                format: "pdf".into(),
                message: e.to_string(),
            })?;
        Ok(from_page_text(&raw))
    }
}

/// Assemble extracted text from `pdf-extract` output.
fn from_page_text(raw: &str) -> ExtractedText {
    let pages: Vec<&str> = raw
        .split('\x0C')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let paragraphs: Vec<String> = pages
        .iter()
        .flat_map(|page| page.split("\n\n"))
        .map(|para| {
            para.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|p| !p.is_empty())
        .collect();

    let text = pages.join("\n").trim().to_string();
    ExtractedText {
        word_count: text.split_whitespace().count(),
        text,
        format: DocumentFormat::Pdf,
        paragraphs,
    }
}
