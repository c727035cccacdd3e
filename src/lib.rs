// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # doc-classify
//!
//! Document classification service: upload TXT, PDF or DOCX files, get a
//! predicted category with a confidence score, and browse the stored history
//! and aggregate statistics.
//!
//! ## Architecture
//!
//! - **Extraction** (`extract`): plain text, PDF (`pdf-extract`) and DOCX (`docx-rs`)
//! - **Classification** (`classify`): offline lexical scorer or a remote zero-shot NLI model
//! - **Storage** (`store`): document records in redb
//! - **Pipeline** (`service`): validate, save, extract, classify, persist
//! - **HTTP API** (`server`, feature `server`): axum routes over the pipeline
//! - **Client** (`client`): in-process or remote access for the CLI
//!
//! ## Library usage
//!
//! ```no_run
//! use doc_classify::config::Settings;
//! use doc_classify::paths::ClassifyPaths;
//! use doc_classify::service::ClassificationService;
//!
//! let paths = ClassifyPaths::resolve().unwrap();
//! let service = ClassificationService::open(Settings::default(), &paths).unwrap();
//! let out = service
//!     .classify_upload("memo.txt", b"The parties hereby agree to the terms and conditions.")
//!     .unwrap();
//! println!("{} ({:.1}%)", out.result.predicted_category, out.result.confidence_score * 100.0);
//! ```

pub mod chunker;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod paths;
pub mod render;
#[cfg(feature = "server")]
pub mod server;
pub mod service;
pub mod stats;
pub mod store;
