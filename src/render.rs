//! Plain-text renderings for the CLI: result cards, history table, stats dashboard.

use std::fmt::Write;

use crate::classify::{CategoryScores, ConfidenceLevel, Thresholds};
use crate::service::{BatchItem, ClassifiedUpload};
use crate::stats::Dashboard;
use crate::store::DocumentRecord;

const NAME_WIDTH: usize = 32;
const CATEGORY_WIDTH: usize = 24;

/// `0.8734` → `"87.3%"`.
pub fn percent(score: f64) -> String {
    format!("{:.1}%", score * 100.0)
}

fn clip(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let head: String = s.chars().take(width.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

fn write_scores(out: &mut String, scores: &CategoryScores) {
    for s in scores.iter() {
        let _ = writeln!(out, "    {:<CATEGORY_WIDTH$} {:>6}", s.label, percent(s.score));
    }
}

/// One classified upload.
pub fn classification_card(upload: &ClassifiedUpload) -> String {
    let r = &upload.result;
    let mut out = String::new();
    let _ = writeln!(out, "{}", upload.filename);
    let _ = writeln!(out, "  Category:   {}", r.predicted_category);
    let _ = writeln!(
        out,
        "  Confidence: {} ({})",
        percent(r.confidence_score),
        r.confidence_level.label()
    );
    if r.confidence_level.needs_review() {
        let _ = writeln!(out, "  Manual review recommended");
    }
    if let Some(id) = upload.id {
        let _ = writeln!(out, "  Document:   #{id}");
    }
    let _ = writeln!(out, "  Scores:");
    write_scores(&mut out, &r.category_scores);
    out
}

/// Every item of a batch, failures included, in order.
pub fn batch_report(items: &[BatchItem]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        match item {
            BatchItem::Classified(upload) => out.push_str(&classification_card(upload)),
            BatchItem::Failed { filename, error } => {
                let _ = writeln!(out, "{filename}");
                let _ = writeln!(out, "  Error: {error}");
            }
        }
    }
    let failed = items.iter().filter(|i| i.is_failed()).count();
    let _ = writeln!(
        out,
        "\n{} classified, {failed} failed",
        items.len() - failed
    );
    out
}

/// Tabular document history.
pub fn history_table(docs: &[DocumentRecord]) -> String {
    if docs.is_empty() {
        return "No documents found\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<NAME_WIDTH$}  {:<CATEGORY_WIDTH$}  {:>6}  {:>10}  {:>6}  {:>6}  {:<16}",
        "ID", "Filename", "Category", "Conf.", "Size", "Tokens", "Chunks", "Uploaded"
    );
    for d in docs {
        let _ = writeln!(
            out,
            "{:>4}  {:<NAME_WIDTH$}  {:<CATEGORY_WIDTH$}  {:>6}  {:>10}  {:>6}  {:>6}  {:<16}",
            d.id,
            clip(&d.original_filename, NAME_WIDTH),
            clip(d.predicted_category.as_deref().unwrap_or("N/A"), CATEGORY_WIDTH),
            d.confidence_score.map(percent).unwrap_or_else(|| "N/A".into()),
            d.display_size(),
            d.token_count
                .filter(|&n| n > 0)
                .map(|n| n.to_string())
                .unwrap_or_else(|| "N/A".into()),
            d.num_chunks.filter(|&n| n > 0).unwrap_or(1),
            d.created_at.format("%Y-%m-%d %H:%M").to_string(),
        );
    }
    out
}

/// Full detail for one stored document.
pub fn document_detail(doc: &DocumentRecord, thresholds: &Thresholds) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#{} {}", doc.id, doc.original_filename);
    if let Some(title) = &doc.title {
        let _ = writeln!(out, "  Title:       {title}");
    }
    if let Some(description) = &doc.description {
        let _ = writeln!(out, "  Description: {description}");
    }
    if !doc.tags.is_empty() {
        let _ = writeln!(out, "  Tags:        {}", doc.tags.join(", "));
    }
    let _ = writeln!(
        out,
        "  Category:    {}",
        doc.predicted_category.as_deref().unwrap_or("N/A")
    );
    if let (Some(score), Some(level)) = (doc.confidence_score, doc.confidence_level(thresholds)) {
        let _ = writeln!(out, "  Confidence:  {} ({})", percent(score), level.label());
        if level == ConfidenceLevel::Low {
            let _ = writeln!(out, "  Manual review recommended");
        }
    }
    let _ = writeln!(out, "  Type:        {}", doc.file_type);
    let _ = writeln!(out, "  Size:        {}", doc.display_size());
    let _ = writeln!(out, "  Stored as:   {}", doc.file_path);
    let _ = writeln!(
        out,
        "  Uploaded:    {}",
        doc.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(updated) = doc.updated_at {
        let _ = writeln!(out, "  Updated:     {}", updated.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(scores) = &doc.category_scores {
        let _ = writeln!(out, "  Scores:");
        write_scores(&mut out, scores);
    }
    out
}

/// The statistics dashboard.
pub fn dashboard(dash: &Dashboard) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total documents:      {}", dash.total_documents);
    let _ = writeln!(out, "Most common category: {}", dash.most_common_category);
    let _ = writeln!(out, "Average file size:    {}", dash.average_file_size);
    let _ = writeln!(
        out,
        "High confidence:      {} ({}%)",
        dash.high_confidence.count, dash.high_confidence.percentage
    );
    if !dash.category_distribution.is_empty() {
        let _ = writeln!(out, "\nCategory distribution:");
        let mut rows: Vec<(&String, &u64)> = dash.category_distribution.iter().collect();
        rows.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (category, count) in rows {
            let share = dash
                .category_percentages
                .get(category)
                .map(|p| format!("{p:.1}%"))
                .unwrap_or_else(|| "N/A".into());
            let _ = writeln!(out, "  {category:<CATEGORY_WIDTH$} {count:>5} {share:>7}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ClassificationResult, LabelScore};
    use crate::stats::{HighConfidence, StatsOverview};
    use chrono::{TimeZone, Utc};

    fn result(score: f64, level: ConfidenceLevel) -> ClassificationResult {
        ClassificationResult {
            predicted_category: "Legal Document".into(),
            confidence_score: score,
            confidence_level: level,
            category_scores: CategoryScores::ranked(vec![
                LabelScore::new("Legal Document", score),
                LabelScore::new("Other", 1.0 - score),
            ]),
            token_count: Some(10),
            num_chunks: Some(1),
        }
    }

    fn record() -> DocumentRecord {
        DocumentRecord {
            id: 7,
            filename: "abc.pdf".into(),
            original_filename: "lease.pdf".into(),
            file_path: "/uploads/abc.pdf".into(),
            file_type: ".pdf".into(),
            file_size: 5120,
            predicted_category: Some("Legal Document".into()),
            confidence_score: Some(0.42),
            category_scores: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap(),
            updated_at: None,
            title: None,
            description: None,
            tags: vec![],
            token_count: None,
            num_chunks: None,
        }
    }

    #[test]
    fn percent_has_one_decimal() {
        assert_eq!(percent(0.8734), "87.3%");
        assert_eq!(percent(1.0), "100.0%");
    }

    #[test]
    fn low_confidence_card_recommends_review() {
        let card = classification_card(&ClassifiedUpload {
            id: Some(3),
            filename: "lease.pdf".into(),
            result: result(0.4, ConfidenceLevel::Low),
        });
        assert!(card.contains("Legal Document"));
        assert!(card.contains("40.0% (Low confidence)"));
        assert!(card.contains("Manual review recommended"));

        let card = classification_card(&ClassifiedUpload {
            id: None,
            filename: "lease.pdf".into(),
            result: result(0.9, ConfidenceLevel::High),
        });
        assert!(!card.contains("Manual review"));
    }

    #[test]
    fn batch_report_lists_failures_in_place() {
        let report = batch_report(&[
            BatchItem::Failed {
                filename: "x.exe".into(),
                error: "Unsupported file type. Allowed types: .txt".into(),
            },
            BatchItem::Classified(ClassifiedUpload {
                id: Some(1),
                filename: "a.txt".into(),
                result: result(0.8, ConfidenceLevel::High),
            }),
        ]);
        let x = report.find("x.exe").unwrap();
        let a = report.find("a.txt").unwrap();
        assert!(x < a);
        assert!(report.contains("1 classified, 1 failed"));
    }

    #[test]
    fn history_defaults_and_empty() {
        assert_eq!(history_table(&[]), "No documents found\n");
        let table = history_table(&[record()]);
        assert!(table.contains("lease.pdf"));
        assert!(table.contains("42.0%"));
        assert!(table.contains("5.0 KB"));
        assert!(table.contains("N/A"));
        assert!(table.contains("2024-03-09"));
    }

    #[test]
    fn long_names_are_clipped() {
        let clipped = clip(&"x".repeat(40), 10);
        assert_eq!(clipped.chars().count(), 10);
        assert!(clipped.ends_with('…'));
    }

    #[test]
    fn detail_shows_metadata() {
        let mut doc = record();
        doc.title = Some("Office lease".into());
        doc.tags = vec!["lease".into(), "2024".into()];
        let text = document_detail(&doc, &Thresholds::default());
        assert!(text.contains("Office lease"));
        assert!(text.contains("lease, 2024"));
        assert!(text.contains("Manual review recommended"));
    }

    #[test]
    fn dashboard_rows_sorted_by_count() {
        let mut overview = StatsOverview::default();
        overview.total_documents = 3;
        overview.category_distribution.insert("Other".into(), 1);
        overview.category_distribution.insert("Legal Document".into(), 2);
        let dash = Dashboard::from_overview(&overview, 0.5);
        assert_eq!(dash.high_confidence, HighConfidence { count: 0, percentage: 0 });
        let text = dashboard(&dash);
        assert!(text.contains("Most common category: Legal Document"));
        assert!(text.contains("Average file size:    0 KB"));
        assert!(text.find("Legal Document").unwrap() < text.rfind("Other").unwrap());
        assert!(text.contains("66.7%"));
        assert!(text.contains("33.3%"));
    }

    #[test]
    fn zero_counts_render_like_missing() {
        let mut doc = record();
        doc.token_count = Some(0);
        doc.num_chunks = Some(0);
        let table = history_table(&[doc]);
        let row = table.lines().nth(1).unwrap();
        assert!(row.contains("N/A"));
        assert!(row.contains("     1  2024-03-09 12:00"));
    }
}
