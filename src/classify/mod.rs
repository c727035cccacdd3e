//! Document classification: candidate-label scoring and confidence bucketing.
//!
//! A [`Classifier`] scores a text against every candidate category with
//! single-label semantics (scores sum to 1, highest first). [`classify_text()`]
//! feeds it extracted text using the configured strategy and turns the ranked
//! scores into a [`ClassificationResult`].
//!
//! Two backends ship:
//!
//! - [`LexicalClassifier`]: offline keyword-evidence scorer with a softmax
//!   over categories.
//! - [`RemoteZeroShotClassifier`]: a zero-shot NLI model behind a Hugging Face
//!   compatible inference endpoint.

pub mod lexical;
pub mod remote;

use std::fmt;

use rayon::prelude::*;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::chunker::chunk_paragraphs;
use crate::config::{ClassifierBackend, Settings, TextSettings, TextStrategy};
use crate::error::{ClassifyError, ClassifyResult};
use crate::extract::ExtractedText;

pub use lexical::LexicalClassifier;
pub use remote::RemoteZeroShotClassifier;

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// Score cut-offs for the confidence levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Thresholds {
    /// Scores at or above this are `high`.
    pub high: f64,
    /// Scores at or above this (and below `high`) are `medium`.
    pub medium: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high: 0.75,
            medium: 0.50,
        }
    }
}

/// Three-way bucketing of a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64, thresholds: &Thresholds) -> Self {
        if score >= thresholds.high {
            Self::High
        } else if score >= thresholds.medium {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Display label, e.g. "High confidence".
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High confidence",
            Self::Medium => "Medium confidence",
            Self::Low => "Low confidence",
        }
    }

    /// Low-confidence predictions should be reviewed by a person.
    pub fn needs_review(&self) -> bool {
        matches!(self, Self::Low)
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// Score for one candidate label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Category → score mapping, kept in rank order (highest first).
///
/// Serializes as a JSON object whose key order is the ranking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryScores(Vec<LabelScore>);

impl CategoryScores {
    /// Build from scores in any order; they are ranked on construction.
    pub fn ranked(mut scores: Vec<LabelScore>) -> Self {
        rank(&mut scores);
        Self(scores)
    }

    pub fn top(&self) -> Option<&LabelScore> {
        self.0.first()
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.iter().find(|s| s.label == label).map(|s| s.score)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelScore> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for CategoryScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for s in &self.0 {
            map.serialize_entry(&s.label, &s.score)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CategoryScores {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoresVisitor;

        impl<'de> Visitor<'de> for ScoresVisitor {
            type Value = CategoryScores;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of category to score")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut scores = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((label, score)) = access.next_entry::<String, f64>()? {
                    scores.push(LabelScore { label, score });
                }
                Ok(CategoryScores(scores))
            }
        }

        deserializer.deserialize_map(ScoresVisitor)
    }
}

/// Sort scores descending. Ties keep their input (label) order.
pub fn rank(scores: &mut [LabelScore]) {
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Numerically stable softmax over logits.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return vec![1.0 / logits.len().max(1) as f64; logits.len()];
    }
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

// ---------------------------------------------------------------------------
// Classifier trait
// ---------------------------------------------------------------------------

/// A single-label document scorer.
pub trait Classifier: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Score `text` against every label. Returns one entry per label, ranked
    /// highest first, with scores summing to 1.
    fn score(&self, text: &str, labels: &[String]) -> ClassifyResult<Vec<LabelScore>>;
}

/// Build the classifier selected in the settings.
pub fn from_settings(settings: &Settings) -> Box<dyn Classifier> {
    match settings.classifier.backend {
        ClassifierBackend::Lexical => Box::new(LexicalClassifier::with_lexicon(
            &settings.classifier.lexicon,
        )),
        ClassifierBackend::Remote => Box::new(RemoteZeroShotClassifier::from_settings(
            &settings.classifier,
        )),
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Outcome of classifying one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub predicted_category: String,
    pub confidence_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub category_scores: CategoryScores,
    /// Words in the extracted text.
    #[serde(default)]
    pub token_count: Option<usize>,
    /// Chunks the text was split into.
    #[serde(default)]
    pub num_chunks: Option<usize>,
}

impl ClassificationResult {
    /// Assemble from ranked scores.
    pub fn from_scores(scores: CategoryScores, thresholds: &Thresholds) -> ClassifyResult<Self> {
        let top = scores.top().ok_or(ClassifyError::EmptyLabels)?;
        Ok(Self {
            predicted_category: top.label.clone(),
            confidence_score: top.score,
            confidence_level: ConfidenceLevel::from_score(top.score, thresholds),
            category_scores: scores.clone(),
            token_count: None,
            num_chunks: None,
        })
    }
}

/// Truncate to `max_chars` characters, appending `"..."` when text was cut.
pub fn prepare_text(text: &str, text_settings: &TextSettings) -> String {
    match text.char_indices().nth(text_settings.max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Classify extracted text with the configured strategy.
pub fn classify_text(
    classifier: &dyn Classifier,
    extracted: &ExtractedText,
    settings: &Settings,
) -> ClassifyResult<ClassificationResult> {
    let labels = &settings.categories;
    if labels.is_empty() {
        return Err(ClassifyError::EmptyLabels);
    }

    let (scores, num_chunks) = match settings.text.strategy {
        TextStrategy::Truncate => {
            let text = prepare_text(&extracted.text, &settings.text);
            (classifier.score(&text, labels)?, 1)
        }
        TextStrategy::Chunked => {
            let chunks = chunk_paragraphs(&extracted.paragraphs, &settings.text.chunk);
            if chunks.len() <= 1 {
                let text = prepare_text(&extracted.text, &settings.text);
                (classifier.score(&text, labels)?, 1)
            } else {
                let scored = chunks.len().min(settings.text.max_chunks);
                tracing::debug!(
                    chunks = chunks.len(),
                    scored,
                    backend = classifier.name(),
                    "classifying chunked document"
                );
                let per_chunk: Vec<Vec<LabelScore>> = chunks[..scored]
                    .par_iter()
                    .map(|chunk| classifier.score(&chunk.text, labels))
                    .collect::<ClassifyResult<_>>()?;
                (mean_scores(labels, &per_chunk), chunks.len())
            }
        }
    };

    let mut result = ClassificationResult::from_scores(
        CategoryScores::ranked(scores),
        &settings.thresholds,
    )?;
    result.token_count = Some(extracted.word_count);
    result.num_chunks = Some(num_chunks);
    Ok(result)
}

/// Per-label arithmetic mean across chunk scorings.
fn mean_scores(labels: &[String], per_chunk: &[Vec<LabelScore>]) -> Vec<LabelScore> {
    let n = per_chunk.len().max(1) as f64;
    labels
        .iter()
        .map(|label| {
            let total: f64 = per_chunk
                .iter()
                .filter_map(|scores| scores.iter().find(|s| &s.label == label))
                .map(|s| s.score)
                .sum();
            LabelScore::new(label.clone(), total / n)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DocumentFormat;

    /// Always prefers the label whose name appears in the text; otherwise the last label.
    struct EchoClassifier;

    impl Classifier for EchoClassifier {
        fn name(&self) -> &str {
            "echo"
        }

        fn score(&self, text: &str, labels: &[String]) -> ClassifyResult<Vec<LabelScore>> {
            let hit = labels
                .iter()
                .position(|l| text.contains(l.as_str()))
                .unwrap_or(labels.len() - 1);
            let logits: Vec<f64> = (0..labels.len())
                .map(|i| if i == hit { 2.0 } else { 0.0 })
                .collect();
            let mut scores: Vec<LabelScore> = labels
                .iter()
                .zip(softmax(&logits))
                .map(|(l, s)| LabelScore::new(l.clone(), s))
                .collect();
            rank(&mut scores);
            Ok(scores)
        }
    }

    fn settings_with(labels: &[&str]) -> Settings {
        Settings {
            categories: labels.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn confidence_buckets() {
        let t = Thresholds::default();
        assert_eq!(ConfidenceLevel::from_score(0.75, &t), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.7499, &t), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.50, &t), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.4999, &t), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0.0, &t), ConfidenceLevel::Low);
        assert!(ConfidenceLevel::Low.needs_review());
        assert_eq!(ConfidenceLevel::Medium.label(), "Medium confidence");
    }

    #[test]
    fn confidence_level_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ConfidenceLevel::High).unwrap(),
            "\"high\""
        );
    }

    #[test]
    fn softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(p[2] > p[1] && p[1] > p[0]);
        assert!(softmax(&[]).is_empty());
    }

    #[test]
    fn ranking_is_stable_on_ties() {
        let mut scores = vec![
            LabelScore::new("a", 0.25),
            LabelScore::new("b", 0.5),
            LabelScore::new("c", 0.25),
        ];
        rank(&mut scores);
        let order: Vec<&str> = scores.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn category_scores_serialize_in_rank_order() {
        let scores = CategoryScores::ranked(vec![
            LabelScore::new("Other", 0.1),
            LabelScore::new("Legal Document", 0.9),
        ]);
        let json = serde_json::to_string(&scores).unwrap();
        assert_eq!(json, r#"{"Legal Document":0.9,"Other":0.1}"#);

        let back: CategoryScores = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scores);
        assert_eq!(back.get("Other"), Some(0.1));
    }

    #[test]
    fn truncation_appends_ellipsis_on_char_boundary() {
        let ts = TextSettings {
            max_chars: 3,
            ..Default::default()
        };
        assert_eq!(prepare_text("héllo", &ts), "hél...");
        assert_eq!(prepare_text("hél", &ts), "hél");
        assert_eq!(prepare_text("", &ts), "");
    }

    #[test]
    fn truncate_strategy_uses_only_the_head() {
        let settings = settings_with(&["Invoice", "Letter"]);
        let mut body = "x".repeat(600);
        body.push_str(" Invoice");
        let extracted = ExtractedText::from_text(body, DocumentFormat::PlainText);
        let result = classify_text(&EchoClassifier, &extracted, &settings).unwrap();
        // "Invoice" sits past the 512-char cut, so the fallback label wins.
        assert_eq!(result.predicted_category, "Letter");
        assert_eq!(result.num_chunks, Some(1));
        assert_eq!(result.token_count, Some(2));
    }

    #[test]
    fn chunked_strategy_averages_chunks() {
        let mut settings = settings_with(&["Invoice", "Letter"]);
        settings.text.strategy = TextStrategy::Chunked;
        settings.text.chunk = crate::chunker::ChunkConfig {
            min_words: 1,
            target_words: 3,
            max_words: 10,
        };
        let text = "Invoice number one two\n\nInvoice again here now\n\nLetter body text here";
        let extracted = ExtractedText::from_text(text.into(), DocumentFormat::PlainText);
        let result = classify_text(&EchoClassifier, &extracted, &settings).unwrap();
        assert_eq!(result.num_chunks, Some(3));
        assert_eq!(result.predicted_category, "Invoice");
        let total: f64 = result.category_scores.iter().map(|s| s.score).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn chunked_strategy_caps_scored_chunks() {
        let mut settings = settings_with(&["Invoice", "Letter"]);
        settings.text.strategy = TextStrategy::Chunked;
        settings.text.max_chunks = 1;
        settings.text.chunk = crate::chunker::ChunkConfig {
            min_words: 1,
            target_words: 2,
            max_words: 10,
        };
        let text = "Letter first\n\nInvoice second\n\nInvoice third";
        let extracted = ExtractedText::from_text(text.into(), DocumentFormat::PlainText);
        let result = classify_text(&EchoClassifier, &extracted, &settings).unwrap();
        assert_eq!(result.num_chunks, Some(3));
        assert_eq!(result.predicted_category, "Letter");
    }

    #[test]
    fn level_follows_configured_thresholds() {
        let mut settings = settings_with(&["Invoice", "Letter"]);
        let extracted = ExtractedText::from_text("Invoice".into(), DocumentFormat::PlainText);
        // softmax([2, 0]) ≈ 0.88
        let result = classify_text(&EchoClassifier, &extracted, &settings).unwrap();
        assert_eq!(result.confidence_level, ConfidenceLevel::High);

        settings.thresholds = Thresholds {
            high: 0.95,
            medium: 0.9,
        };
        let result = classify_text(&EchoClassifier, &extracted, &settings).unwrap();
        assert_eq!(result.confidence_level, ConfidenceLevel::Low);
    }

    #[test]
    fn empty_labels_rejected() {
        let settings = settings_with(&[]);
        let extracted = ExtractedText::from_text("text".into(), DocumentFormat::PlainText);
        let err = classify_text(&EchoClassifier, &extracted, &settings).unwrap_err();
        assert!(matches!(err, ClassifyError::EmptyLabels));
    }
}
