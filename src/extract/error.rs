//! Rich diagnostic error types for text extraction.

use miette::Diagnostic;
use thiserror::Error;

/// Errors from turning uploaded bytes into plain text.
#[derive(Debug, Error, Diagnostic)]
pub enum ExtractError {
    #[error("unsupported file type: \"{extension}\"")]
    #[diagnostic(
        code(doccls::extract::unsupported_format),
        help("Supported formats are .txt, .pdf and .docx.")
    )]
    UnsupportedFormat { extension: String },

    #[error("parse error in {format} document: {message}")]
    #[diagnostic(
        code(doccls::extract::parse_error),
        help(
            "The document could not be parsed. Verify the file is a valid {format} \
             and not corrupted or password protected."
        )
    )]
    ParseError { format: String, message: String },

    #[error("empty document: no text extracted from \"{origin}\"")]
    #[diagnostic(
        code(doccls::extract::empty_document),
        help(
            "The extractor found no text. Scanned PDFs without a text layer \
             and image-only documents cannot be classified."
        )
    )]
    EmptyDocument { origin: String },

    #[error("I/O error: {source}")]
    #[diagnostic(
        code(doccls::extract::io),
        help("A filesystem operation failed. Check file paths and permissions.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for extraction results.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;
