//! The classification pipeline: validate, save, extract, classify, persist.
//!
//! [`ClassificationService`] owns the settings, the classifier and the
//! document store. The HTTP server and the in-process CLI both drive it.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::{self, ClassificationResult, Classifier};
use crate::config::Settings;
use crate::error::{ClassifyError, StoreError};
use crate::extract::{self, file_extension};
use crate::paths::{self, ClassifyPaths};
use crate::stats::{self, DocumentStats, StatsOverview};
use crate::store::{DocumentRecord, DocumentStore, MetadataUpdate, NewDocument};

/// Errors from the classification pipeline.
#[derive(Debug, Error, Diagnostic)]
pub enum ServiceError {
    #[error("{message}")]
    #[diagnostic(
        code(doccls::service::unsupported_type),
        help("Convert the document to one of the allowed formats, or extend `allowed_extensions`.")
    )]
    UnsupportedFileType { filename: String, message: String },

    #[error("File too large. Maximum size is {limit} bytes")]
    #[diagnostic(
        code(doccls::service::too_large),
        help("Split the document or raise `max_file_size` in the config file.")
    )]
    FileTooLarge { filename: String, size: u64, limit: u64 },

    #[error("Failed to process document")]
    #[diagnostic(
        code(doccls::service::processing_failed),
        help("The file could not be read as text ({reason}). Check that it is not corrupt or empty.")
    )]
    ProcessingFailed { filename: String, reason: String },

    #[error("Document not found")]
    #[diagnostic(code(doccls::service::not_found))]
    NotFound { id: u64 },

    #[error("failed to write upload {path}")]
    #[diagnostic(
        code(doccls::service::io),
        help("Check that the upload directory exists and is writable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

/// Result type for pipeline operations.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub data: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
        }
    }

    /// Read a file from disk, keeping only its base name.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { filename, data })
    }
}

/// A successfully classified and stored upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedUpload {
    /// Id of the stored record.
    #[serde(default)]
    pub id: Option<u64>,
    pub filename: String,
    #[serde(flatten)]
    pub result: ClassificationResult,
}

/// Per-file outcome of a batch request, in upload order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchItem {
    Failed { filename: String, error: String },
    Classified(ClassifiedUpload),
}

impl BatchItem {
    pub fn filename(&self) -> &str {
        match self {
            Self::Failed { filename, .. } => filename,
            Self::Classified(c) => &c.filename,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// The document classification service.
pub struct ClassificationService {
    settings: Settings,
    classifier: Box<dyn Classifier>,
    store: DocumentStore,
    upload_dir: PathBuf,
}

impl ClassificationService {
    /// Build from settings: opens the store and creates the upload directory.
    pub fn open(settings: Settings, paths: &ClassifyPaths) -> crate::error::Result<Self> {
        let upload_dir = settings.upload_dir(paths);
        paths::create_dir(&upload_dir)?;
        let store = DocumentStore::open(&settings.database_path(paths))?;
        let classifier = classify::from_settings(&settings);
        tracing::info!(
            backend = classifier.name(),
            categories = settings.categories.len(),
            uploads = %upload_dir.display(),
            "classification service ready"
        );
        Ok(Self::with_parts(settings, classifier, store, upload_dir))
    }

    /// Assemble from explicit parts.
    pub fn with_parts(
        settings: Settings,
        classifier: Box<dyn Classifier>,
        store: DocumentStore,
        upload_dir: PathBuf,
    ) -> Self {
        Self {
            settings,
            classifier,
            store,
            upload_dir,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Run one upload through the pipeline.
    pub fn classify_upload(&self, filename: &str, data: &[u8]) -> ServiceResult<ClassifiedUpload> {
        let ext = file_extension(filename);
        if !self.settings.is_allowed_extension(&ext) {
            return Err(ServiceError::UnsupportedFileType {
                filename: filename.to_string(),
                message: self.settings.unsupported_type_message(),
            });
        }
        let size = data.len() as u64;
        if size > self.settings.max_file_size {
            return Err(ServiceError::FileTooLarge {
                filename: filename.to_string(),
                size,
                limit: self.settings.max_file_size,
            });
        }

        let stored_name = format!("{}{ext}", uuid::Uuid::new_v4());
        let path = self.upload_dir.join(&stored_name);
        std::fs::write(&path, data).map_err(|e| ServiceError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        match self.classify_saved(filename, &stored_name, &path, &ext, size) {
            Ok(classified) => Ok(classified),
            Err(e) => {
                discard_upload(&path);
                Err(e)
            }
        }
    }

    fn classify_saved(
        &self,
        filename: &str,
        stored_name: &str,
        path: &Path,
        ext: &str,
        size: u64,
    ) -> ServiceResult<ClassifiedUpload> {
        let extracted =
            extract::process_document(path).map_err(|e| ServiceError::ProcessingFailed {
                filename: filename.to_string(),
                reason: e.to_string(),
            })?;
        let result = classify::classify_text(self.classifier.as_ref(), &extracted, &self.settings)?;

        let record = self.store.insert(
            NewDocument {
                filename: stored_name.to_string(),
                original_filename: filename.to_string(),
                file_path: path.display().to_string(),
                file_type: ext.to_string(),
                file_size: size,
                predicted_category: None,
                confidence_score: None,
                category_scores: None,
                token_count: None,
                num_chunks: None,
            }
            .with_classification(&result),
        )?;

        tracing::info!(
            id = record.id,
            filename,
            category = %result.predicted_category,
            score = result.confidence_score,
            level = %result.confidence_level,
            "document classified"
        );
        Ok(ClassifiedUpload {
            id: Some(record.id),
            filename: filename.to_string(),
            result,
        })
    }

    /// Classify several uploads. One entry per upload, in order; a failing
    /// file is reported in place and does not stop the rest.
    pub fn classify_batch(&self, uploads: &[Upload]) -> Vec<BatchItem> {
        uploads
            .iter()
            .map(|u| match self.classify_upload(&u.filename, &u.data) {
                Ok(classified) => BatchItem::Classified(classified),
                Err(e) => {
                    tracing::warn!(filename = %u.filename, "batch item failed: {e}");
                    BatchItem::Failed {
                        filename: u.filename.clone(),
                        error: e.to_string(),
                    }
                }
            })
            .collect()
    }

    /// All documents, newest first.
    pub fn documents(&self) -> ServiceResult<Vec<DocumentRecord>> {
        Ok(self.store.list_recent()?)
    }

    pub fn documents_page(&self, skip: usize, limit: usize) -> ServiceResult<Vec<DocumentRecord>> {
        Ok(self.store.page(skip, limit)?)
    }

    pub fn document(&self, id: u64) -> ServiceResult<DocumentRecord> {
        self.store.get(id)?.ok_or(ServiceError::NotFound { id })
    }

    pub fn count(&self) -> ServiceResult<u64> {
        Ok(self.store.count()?)
    }

    /// Totals and distribution, both taken from one scan of the store.
    pub fn stats(&self) -> ServiceResult<DocumentStats> {
        let docs = self.store.all()?;
        Ok(DocumentStats {
            total_documents: docs.len() as u64,
            category_distribution: stats::distribution_from_documents(&docs),
        })
    }

    /// Stats together with the documents they describe, from one scan.
    pub fn overview(&self) -> ServiceResult<StatsOverview> {
        Ok(StatsOverview::from_documents(self.store.list_recent()?))
    }

    pub fn update_document(&self, id: u64, update: &MetadataUpdate) -> ServiceResult<DocumentRecord> {
        self.store
            .update_metadata(id, update)?
            .ok_or(ServiceError::NotFound { id })
    }

    /// Delete a record and its stored upload.
    pub fn remove_document(&self, id: u64) -> ServiceResult<DocumentRecord> {
        let record = self.store.remove(id)?.ok_or(ServiceError::NotFound { id })?;
        discard_upload(Path::new(&record.file_path));
        tracing::info!(id, filename = %record.original_filename, "document removed");
        Ok(record)
    }
}

fn discard_upload(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), "failed to remove upload: {e}");
        }
    }
}
