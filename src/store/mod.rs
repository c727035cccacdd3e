//! Persistent document records.
//!
//! [`DocumentRecord`] is both the stored value (bincode inside redb) and the
//! JSON shape served by the API. [`DocumentStore`] owns the database.

pub mod durable;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{CategoryScores, ClassificationResult, ConfidenceLevel, Thresholds};

pub use crate::error::StoreResult;
pub use durable::DocumentStore;

/// A classified document as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Monotonic identifier, starting at 1.
    pub id: u64,
    /// Stored file name (`{uuid}{ext}`).
    pub filename: String,
    /// Name the file was uploaded under.
    pub original_filename: String,
    pub file_path: String,
    /// Lowercased dotted extension.
    pub file_type: String,
    pub file_size: u64,
    pub predicted_category: Option<String>,
    pub confidence_score: Option<f64>,
    pub category_scores: Option<CategoryScores>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub token_count: Option<u64>,
    pub num_chunks: Option<u64>,
}

impl DocumentRecord {
    pub fn confidence_level(&self, thresholds: &Thresholds) -> Option<ConfidenceLevel> {
        self.confidence_score
            .map(|s| ConfidenceLevel::from_score(s, thresholds))
    }

    /// Size in bytes as a short human-readable string.
    pub fn display_size(&self) -> String {
        crate::stats::format_kb(self.file_size as f64 / 1024.0)
    }
}

/// Fields supplied when inserting; id and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub filename: String,
    pub original_filename: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: u64,
    pub predicted_category: Option<String>,
    pub confidence_score: Option<f64>,
    pub category_scores: Option<CategoryScores>,
    pub token_count: Option<u64>,
    pub num_chunks: Option<u64>,
}

impl NewDocument {
    /// Attach a classification outcome.
    pub fn with_classification(mut self, result: &ClassificationResult) -> Self {
        self.predicted_category = Some(result.predicted_category.clone());
        self.confidence_score = Some(result.confidence_score);
        self.category_scores = Some(result.category_scores.clone());
        self.token_count = result.token_count.map(|n| n as u64);
        self.num_chunks = result.num_chunks.map(|n| n as u64);
        self
    }
}

/// User-editable metadata. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl MetadataUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.tags.is_none()
    }

    fn apply(&self, record: &mut DocumentRecord) {
        if let Some(title) = &self.title {
            record.title = Some(title.clone()).filter(|t| !t.is_empty());
        }
        if let Some(description) = &self.description {
            record.description = Some(description.clone()).filter(|d| !d.is_empty());
        }
        if let Some(tags) = &self.tags {
            let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
            for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
                if !cleaned.iter().any(|c| c == tag) {
                    cleaned.push(tag.to_string());
                }
            }
            record.tags = cleaned;
        }
    }
}
