//! Rich diagnostic error types for doc-classify.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so operators know what went wrong and how
//! to fix it. [`Error`] wraps them all for callers that span subsystems.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for doc-classify.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] crate::paths::PathError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Extract(#[from] crate::extract::ExtractError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Service(#[from] crate::service::ServiceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Client(#[from] crate::client::ClientError),
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    #[diagnostic(
        code(doccls::config::read),
        help("Ensure the config file exists and is readable, or omit --config to use defaults.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    #[diagnostic(
        code(doccls::config::parse),
        help("Check the TOML syntax. Unknown keys are rejected so typos don't go unnoticed.")
    )]
    Parse { path: String, message: String },

    #[error("invalid setting `{field}`: {message}")]
    #[diagnostic(
        code(doccls::config::invalid),
        help("Fix the value in the config file or the corresponding DOCCLS_* environment variable.")
    )]
    Invalid { field: String, message: String },

    #[error("failed to serialize settings: {message}")]
    #[diagnostic(code(doccls::config::serialize))]
    Serialize { message: String },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Classifier errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ClassifyError {
    #[error("no candidate categories configured")]
    #[diagnostic(
        code(doccls::classify::empty_labels),
        help("Add at least one entry to `categories` in the config file.")
    )]
    EmptyLabels,

    #[error("classifier backend at {url} failed: {message}")]
    #[diagnostic(
        code(doccls::classify::backend),
        help(
            "The remote zero-shot endpoint rejected the request or is unreachable. \
             Check `classifier.endpoint`, the API token, and network connectivity, \
             or switch `classifier.backend` to \"lexical\"."
        )
    )]
    Backend { url: String, message: String },

    #[error("classifier backend returned an unexpected response: {message}")]
    #[diagnostic(
        code(doccls::classify::invalid_response),
        help("The endpoint must answer with `{{\"labels\": [...], \"scores\": [...]}}`.")
    )]
    InvalidResponse { message: String },

    #[error("classifier backend timed out after {timeout_secs}s")]
    #[diagnostic(
        code(doccls::classify::timeout),
        help("Increase `classifier.timeout_secs` or use a smaller model.")
    )]
    Timeout { timeout_secs: u64 },
}

/// Result type for classifier operations.
pub type ClassifyResult<T> = std::result::Result<T, ClassifyError>;

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(doccls::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(doccls::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             This may indicate corruption; try running with a fresh data directory."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(doccls::store::serde),
        help(
            "Failed to serialize or deserialize a document record. \
             The stored format may have changed between versions."
        )
    )]
    Serialization { message: String },
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Convenience alias for functions returning doc-classify results.
pub type Result<T> = std::result::Result<T, Error>;
