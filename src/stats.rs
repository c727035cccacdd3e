//! Aggregate statistics over stored documents.
//!
//! The server reports totals and the category distribution; the dashboard
//! figures (most common category, average size, high-confidence share) are
//! derived from the document list. When the stats endpoint is unreachable the
//! distribution is recomputed from the documents too.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::store::DocumentRecord;

/// What `/api/v1/documents/stats` returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub total_documents: u64,
    pub category_distribution: BTreeMap<String, u64>,
}

/// What `/api/stats` returns: stats plus the documents they cover.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsOverview {
    pub total_documents: u64,
    pub category_distribution: BTreeMap<String, u64>,
    pub documents: Vec<DocumentRecord>,
}

impl StatsOverview {
    /// Rebuild an overview from documents alone.
    pub fn from_documents(documents: Vec<DocumentRecord>) -> Self {
        Self {
            total_documents: documents.len() as u64,
            category_distribution: distribution_from_documents(&documents),
            documents,
        }
    }
}

/// Count documents per predicted category. Unclassified documents are skipped.
pub fn distribution_from_documents(docs: &[DocumentRecord]) -> BTreeMap<String, u64> {
    let mut dist = BTreeMap::new();
    for category in docs.iter().filter_map(|d| d.predicted_category.as_ref()) {
        *dist.entry(category.clone()).or_insert(0) += 1;
    }
    dist
}

/// Category with the highest count, `"N/A"` when there are none.
/// Ties resolve to the alphabetically first category.
pub fn most_common_category(distribution: &BTreeMap<String, u64>) -> String {
    let mut best: Option<(&String, u64)> = None;
    for (category, &count) in distribution {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((category, count));
        }
    }
    best.map(|(c, _)| c.clone())
        .unwrap_or_else(|| "N/A".to_string())
}

/// Mean file size in KB, `None` without documents.
pub fn average_file_size_kb(docs: &[DocumentRecord]) -> Option<f64> {
    if docs.is_empty() {
        return None;
    }
    let total: u64 = docs.iter().map(|d| d.file_size).sum();
    Some(total as f64 / docs.len() as f64 / 1024.0)
}

/// `"12.3 KB"`.
pub fn format_kb(kb: f64) -> String {
    format!("{kb:.1} KB")
}

/// Average size for display, `"0 KB"` without documents.
pub fn average_file_size_display(docs: &[DocumentRecord]) -> String {
    average_file_size_kb(docs)
        .map(format_kb)
        .unwrap_or_else(|| "0 KB".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighConfidence {
    pub count: usize,
    /// Share of all documents, rounded to a whole percent.
    pub percentage: u32,
}

/// Documents scoring at or above `cutoff`.
pub fn high_confidence(docs: &[DocumentRecord], cutoff: f64) -> HighConfidence {
    let count = docs
        .iter()
        .filter(|d| d.confidence_score.is_some_and(|s| s >= cutoff))
        .count();
    let percentage = if docs.is_empty() {
        0
    } else {
        (count as f64 / docs.len() as f64 * 100.0).round() as u32
    };
    HighConfidence { count, percentage }
}

/// Each category's share of all documents, in percent. Empty when there are none.
pub fn category_percentages(
    distribution: &BTreeMap<String, u64>,
    total_documents: u64,
) -> BTreeMap<String, f64> {
    if total_documents == 0 {
        return BTreeMap::new();
    }
    distribution
        .iter()
        .map(|(category, count)| {
            (
                category.clone(),
                *count as f64 / total_documents as f64 * 100.0,
            )
        })
        .collect()
}

/// Every figure the stats dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub total_documents: u64,
    pub most_common_category: String,
    pub average_file_size: String,
    pub high_confidence: HighConfidence,
    pub category_distribution: BTreeMap<String, u64>,
    #[serde(default)]
    pub category_percentages: BTreeMap<String, f64>,
}

impl Dashboard {
    pub fn from_overview(overview: &StatsOverview, cutoff: f64) -> Self {
        Self {
            total_documents: overview.total_documents,
            most_common_category: most_common_category(&overview.category_distribution),
            average_file_size: average_file_size_display(&overview.documents),
            high_confidence: high_confidence(&overview.documents, cutoff),
            category_distribution: overview.category_distribution.clone(),
            category_percentages: category_percentages(
                &overview.category_distribution,
                overview.total_documents,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn doc(id: u64, category: Option<&str>, score: Option<f64>, size: u64) -> DocumentRecord {
        DocumentRecord {
            id,
            filename: format!("{id}.txt"),
            original_filename: format!("doc{id}.txt"),
            file_path: format!("/uploads/{id}.txt"),
            file_type: ".txt".into(),
            file_size: size,
            predicted_category: category.map(String::from),
            confidence_score: score,
            category_scores: None,
            created_at: Utc::now(),
            updated_at: None,
            title: None,
            description: None,
            tags: Vec::new(),
            token_count: None,
            num_chunks: None,
        }
    }

    fn sample() -> Vec<DocumentRecord> {
        vec![
            doc(1, Some("Legal Document"), Some(0.9), 1024),
            doc(2, Some("Legal Document"), Some(0.4), 2048),
            doc(3, Some("Academic Paper"), Some(0.5), 3072),
            doc(4, None, None, 4096),
        ]
    }

    #[test]
    fn distribution_counts_classified_documents() {
        let dist = distribution_from_documents(&sample());
        assert_eq!(dist.get("Legal Document"), Some(&2));
        assert_eq!(dist.get("Academic Paper"), Some(&1));
        assert_eq!(dist.values().sum::<u64>(), 3);
    }

    #[test]
    fn most_common_and_ties() {
        let dist = distribution_from_documents(&sample());
        assert_eq!(most_common_category(&dist), "Legal Document");

        let tied: BTreeMap<String, u64> =
            [("Other".to_string(), 2), ("Business Proposal".to_string(), 2)].into();
        assert_eq!(most_common_category(&tied), "Business Proposal");
        assert_eq!(most_common_category(&BTreeMap::new()), "N/A");
    }

    #[test]
    fn average_size_formatting() {
        assert_eq!(average_file_size_display(&sample()), "2.5 KB");
        assert_eq!(average_file_size_display(&[]), "0 KB");
        assert_eq!(format_kb(0.5), "0.5 KB");
    }

    #[test]
    fn high_confidence_uses_inclusive_cutoff() {
        let hc = high_confidence(&sample(), 0.5);
        assert_eq!(hc.count, 2);
        assert_eq!(hc.percentage, 50);
        assert_eq!(
            high_confidence(&[], 0.5),
            HighConfidence {
                count: 0,
                percentage: 0
            }
        );
        let third = high_confidence(&sample()[..3], 0.85);
        assert_eq!(third.percentage, 33);
    }

    #[test]
    fn dashboard_from_fallback_overview() {
        let overview = StatsOverview::from_documents(sample());
        assert_eq!(overview.total_documents, 4);
        let dash = Dashboard::from_overview(&overview, 0.5);
        assert_eq!(dash.most_common_category, "Legal Document");
        assert_eq!(dash.average_file_size, "2.5 KB");
        assert_eq!(dash.high_confidence.count, 2);
    }

    #[test]
    fn category_shares_of_total() {
        let dist: BTreeMap<String, u64> =
            [("Legal Document".to_string(), 2), ("Other".to_string(), 1)].into();
        let shares = category_percentages(&dist, 3);
        assert!((shares["Legal Document"] - 200.0 / 3.0).abs() < 1e-9);
        assert!((shares["Other"] - 100.0 / 3.0).abs() < 1e-9);
        assert!(category_percentages(&dist, 0).is_empty());
    }
}
