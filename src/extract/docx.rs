//! DOCX text extraction using the `docx-rs` reader.
//!
//! Only body paragraphs contribute text; tables, headers and footers are
//! skipped. Runs nested inside hyperlinks are included.

use docx_rs::{DocumentChild, ParagraphChild, RunChild};

use crate::extract::error::{ExtractError, ExtractResult};
use crate::extract::{DocumentFormat, ExtractedText, TextExtractor};

/// DOCX extractor backed by `docx-rs`.
pub struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Docx
    }

    fn extract(&self, data: &[u8]) -> ExtractResult<ExtractedText> {
        let docx = docx_rs::read_docx(data).map_err(|e| ExtractError::ParseError {
            format: "docx".into(),
            message: e.to_string(),
        })?;

        let paragraphs = docx
            .document
            .children
            .iter()
            .filter_map(|child| match child {
                DocumentChild::Paragraph(para) => Some(paragraph_text(&para.children)),
                _ => None,
            })
            .collect();

        Ok(ExtractedText::from_paragraphs(
            paragraphs,
            DocumentFormat::Docx,
        ))
    }
}

fn paragraph_text(children: &[ParagraphChild]) -> String {
    let mut text = String::new();
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for rc in &run.children {
                    match rc {
                        RunChild::Text(t) => text.push_str(&t.text),
                        RunChild::Tab(_) => text.push('\t'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => text.push_str(&paragraph_text(&link.children)),
            _ => {}
        }
    }
    text
}
