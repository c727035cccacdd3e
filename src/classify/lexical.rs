//! Offline keyword-evidence classifier.
//!
//! Each category carries a lexicon of weighted terms and phrases. Text is
//! NFKC-normalized, lowercased, tokenized and lightly stemmed; every lexicon
//! hit adds sublinear evidence (`1 + ln(count)`) to its category. Evidence is
//! normalized by document length and pushed through a softmax, with a small
//! prior on the catch-all category so documents without evidence land there.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::classify::{Classifier, LabelScore, rank, softmax};
use crate::error::{ClassifyError, ClassifyResult};

/// Logit scale applied to length-normalized evidence.
const SHARPNESS: f64 = 4.5;
/// Logit given to the catch-all category before any evidence.
const FALLBACK_PRIOR: f64 = 0.5;
/// Category that receives [`FALLBACK_PRIOR`].
const FALLBACK_LABEL: &str = "Other";

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+(?:'[\p{L}]+)?").unwrap());

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "that", "the", "this", "to", "was", "with",
];

/// `(weight, terms)` for one built-in category.
type BuiltinLexicon = (&'static str, &'static [(f64, &'static [&'static str])]);

const BUILTIN: &[BuiltinLexicon] = &[
    (
        "Technical Documentation",
        &[
            (
                1.5,
                &[
                    "api", "endpoint", "sdk", "installation", "configuration", "cli",
                    "documentation", "user guide", "getting started", "troubleshooting",
                ],
            ),
            (
                1.0,
                &[
                    "install", "configure", "parameter", "function", "module", "library",
                    "version", "release", "deploy", "deployment", "server", "database", "query",
                    "command", "architecture", "interface", "protocol", "request", "response",
                    "error code", "debug", "compile", "build", "dependency", "runtime",
                    "implementation", "setup", "usage", "syntax", "json", "http", "code",
                    "software", "system", "file", "default", "option",
                ],
            ),
        ],
    ),
    (
        "Business Proposal",
        &[
            (
                1.5,
                &[
                    "proposal", "budget", "roi", "return on investment", "deliverable",
                    "executive summary", "value proposition", "pricing", "stakeholder",
                ],
            ),
            (
                1.0,
                &[
                    "client", "cost", "price", "revenue", "investment", "timeline", "milestone",
                    "market", "strategy", "growth", "profit", "quote", "scope", "opportunity",
                    "partnership", "sales", "customer", "objective", "business", "project plan",
                    "competitive", "propose", "quarter", "fiscal", "company", "service",
                ],
            ),
        ],
    ),
    (
        "Legal Document",
        &[
            (
                1.5,
                &[
                    "hereby", "herein", "hereinafter", "whereas", "indemnify", "indemnification",
                    "jurisdiction", "governing law", "pursuant", "notwithstanding",
                    "terms and conditions", "arbitration",
                ],
            ),
            (
                1.0,
                &[
                    "agreement", "contract", "party", "shall", "liability", "liable", "clause",
                    "termination", "terminate", "breach", "confidentiality", "warranty",
                    "plaintiff", "defendant", "court", "statute", "obligation", "license",
                    "licensor", "licensee", "intellectual property", "law", "legal", "right",
                    "consent", "dispute",
                ],
            ),
        ],
    ),
    (
        "Academic Paper",
        &[
            (
                1.5,
                &[
                    "abstract", "methodology", "hypothesis", "literature review", "et al",
                    "related work", "peer review", "dataset",
                ],
            ),
            (
                1.0,
                &[
                    "introduction", "method", "experiment", "experimental", "result",
                    "conclusion", "literature", "study", "research", "analysis", "sample",
                    "participant", "significant", "statistical", "correlation", "finding",
                    "reference", "citation", "university", "journal", "theorem", "proof",
                    "evaluation", "baseline", "theory", "empirical",
                ],
            ),
        ],
    ),
    (
        "General Article",
        &[
            (
                1.5,
                &["according to", "interview", "news", "reporter", "column", "opinion"],
            ),
            (
                1.0,
                &[
                    "story", "today", "yesterday", "week", "people", "city", "world", "said",
                    "say", "life", "travel", "health", "sport", "music", "film", "culture",
                    "tip", "community", "family", "local", "popular", "recently", "blog",
                    "weekend", "season", "home",
                ],
            ),
        ],
    ),
];

/// A lexicon entry: stemmed token sequence plus its weight.
#[derive(Debug, Clone)]
struct Term {
    tokens: Vec<String>,
    weight: f64,
}

/// Keyword-evidence classifier. Deterministic and dependency-free at runtime.
#[derive(Debug, Clone)]
pub struct LexicalClassifier {
    lexicon: HashMap<String, Vec<Term>>,
}

impl Default for LexicalClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalClassifier {
    /// Classifier with the built-in lexicon only.
    pub fn new() -> Self {
        let mut lexicon = HashMap::new();
        for (label, groups) in BUILTIN {
            let terms = groups
                .iter()
                .flat_map(|(weight, words)| {
                    words.iter().filter_map(move |w| term(w, *weight))
                })
                .collect();
            lexicon.insert(label.to_string(), terms);
        }
        Self { lexicon }
    }

    /// Built-in lexicon extended with configured keywords (weight 1.0).
    pub fn with_lexicon(extra: &BTreeMap<String, Vec<String>>) -> Self {
        let mut classifier = Self::new();
        for (label, words) in extra {
            let entry = classifier.lexicon.entry(label.clone()).or_default();
            entry.extend(words.iter().filter_map(|w| term(w, 1.0)));
        }
        classifier
    }

    /// Terms used for `label`. Labels without a lexicon fall back to their own words.
    fn terms_for(&self, label: &str) -> Vec<Term> {
        match self.lexicon.get(label) {
            Some(terms) => terms.clone(),
            None if label == FALLBACK_LABEL => Vec::new(),
            None => tokenize(label)
                .into_iter()
                .filter(|t| !STOPWORDS.contains(&t.as_str()))
                .map(|t| Term {
                    tokens: vec![t],
                    weight: 1.0,
                })
                .collect(),
        }
    }
}

impl Classifier for LexicalClassifier {
    fn name(&self) -> &str {
        "lexical"
    }

    fn score(&self, text: &str, labels: &[String]) -> ClassifyResult<Vec<LabelScore>> {
        if labels.is_empty() {
            return Err(ClassifyError::EmptyLabels);
        }
        let tokens = tokenize(text);
        let length_norm = (tokens.len().max(1) as f64).sqrt();

        let logits: Vec<f64> = labels
            .iter()
            .map(|label| {
                let evidence: f64 = self
                    .terms_for(label)
                    .iter()
                    .map(|t| match count_occurrences(&tokens, &t.tokens) {
                        0 => 0.0,
                        n => t.weight * (1.0 + (n as f64).ln()),
                    })
                    .sum();
                let prior = if label == FALLBACK_LABEL { FALLBACK_PRIOR } else { 0.0 };
                prior + SHARPNESS * evidence / length_norm
            })
            .collect();

        let mut scores: Vec<LabelScore> = labels
            .iter()
            .zip(softmax(&logits))
            .map(|(label, score)| LabelScore::new(label.clone(), score))
            .collect();
        rank(&mut scores);
        Ok(scores)
    }
}

fn term(phrase: &str, weight: f64) -> Option<Term> {
    let tokens = tokenize(phrase);
    (!tokens.is_empty()).then_some(Term { tokens, weight })
}

/// NFKC-normalize, lowercase, split into word tokens and stem.
fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text.nfkc().collect::<String>().to_lowercase();
    let normalized = normalized.replace('\u{2019}', "'");
    TOKEN_RE
        .find_iter(&normalized)
        .map(|m| stem(m.as_str()))
        .collect()
}

/// Strip possessives and simple plurals so "parties" matches "party".
fn stem(token: &str) -> String {
    let token = token.strip_suffix("'s").unwrap_or(token);
    let token = token.trim_end_matches('\'');
    if token.len() > 4 && token.ends_with("ies") {
        return format!("{}y", &token[..token.len() - 3]);
    }
    if token.len() > 3
        && token.ends_with('s')
        && !token.ends_with("ss")
        && !token.ends_with("us")
        && !token.ends_with("is")
    {
        return token[..token.len() - 1].to_string();
    }
    token.to_string()
}

fn count_occurrences(tokens: &[String], phrase: &[String]) -> usize {
    match phrase.len() {
        0 => 0,
        1 => tokens.iter().filter(|t| **t == phrase[0]).count(),
        n => tokens.windows(n).filter(|w| *w == phrase).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> Vec<String> {
        crate::config::Settings::default().categories
    }

    fn top(text: &str) -> LabelScore {
        LexicalClassifier::new()
            .score(text, &categories())
            .unwrap()
            .remove(0)
    }

    #[test]
    fn stemming_rules() {
        assert_eq!(stem("parties"), "party");
        assert_eq!(stem("results"), "result");
        assert_eq!(stem("analysis"), "analysis");
        assert_eq!(stem("status"), "status");
        assert_eq!(stem("business"), "business");
        assert_eq!(stem("company's"), "company");
        assert_eq!(stem("api"), "api");
    }

    #[test]
    fn tokenizer_normalizes_width_and_case() {
        // Fullwidth letters fold to ASCII under NFKC.
        assert_eq!(tokenize("ＡＰＩ Endpoints!"), vec!["api", "endpoint"]);
        assert_eq!(tokenize("the client’s budget"), vec!["the", "client", "budget"]);
    }

    #[test]
    fn phrases_match_token_windows() {
        let tokens = tokenize("Terms and conditions apply. See terms and conditions.");
        let phrase = tokenize("terms and conditions");
        assert_eq!(count_occurrences(&tokens, &phrase), 2);
    }

    #[test]
    fn recognizes_legal_text() {
        let s = top(
            "This Agreement is entered into by and between the parties. The Licensee shall \
             indemnify the Licensor against any liability. This contract is governed by the \
             laws of the State of Delaware and any dispute shall be resolved by arbitration.",
        );
        assert_eq!(s.label, "Legal Document");
        assert!(s.score >= 0.75, "score was {}", s.score);
    }

    #[test]
    fn recognizes_technical_text() {
        let s = top(
            "Installation: run the CLI with the --config flag. The API endpoint accepts a JSON \
             request and returns a response with an error code on failure. See the \
             configuration reference for every parameter.",
        );
        assert_eq!(s.label, "Technical Documentation");
    }

    #[test]
    fn recognizes_academic_text() {
        let s = top(
            "Abstract. We test the hypothesis that sample size affects correlation strength. \
             Our methodology follows Smith et al. The experiment results are statistically \
             significant, and the conclusion discusses related work.",
        );
        assert_eq!(s.label, "Academic Paper");
    }

    #[test]
    fn recognizes_business_text() {
        let s = top(
            "Executive summary: this proposal outlines the budget, timeline and deliverables \
             for the client. Expected ROI is 30% within two quarters thanks to revenue growth.",
        );
        assert_eq!(s.label, "Business Proposal");
    }

    #[test]
    fn no_evidence_falls_back_to_other() {
        let s = top("zxq vlorp 12345");
        assert_eq!(s.label, "Other");
        assert!(s.score < 0.5, "score was {}", s.score);
    }

    #[test]
    fn scores_sum_to_one_and_cover_all_labels() {
        let labels = categories();
        let scores = LexicalClassifier::new()
            .score("The court ruled on the contract.", &labels)
            .unwrap();
        assert_eq!(scores.len(), labels.len());
        let total: f64 = scores.iter().map(|s| s.score).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(scores.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn unknown_labels_use_their_own_words() {
        let labels = vec!["Recipe".to_string(), "Invoice".to_string()];
        let scores = LexicalClassifier::new()
            .score("Invoice #42: please pay this invoice by Friday.", &labels)
            .unwrap();
        assert_eq!(scores[0].label, "Invoice");
    }

    #[test]
    fn configured_keywords_extend_lexicon() {
        let mut extra = BTreeMap::new();
        extra.insert("Recipe".to_string(), vec!["tablespoon".to_string(), "bake".into()]);
        let labels = vec!["Recipe".to_string(), "Other".to_string()];
        let scores = LexicalClassifier::with_lexicon(&extra)
            .score("Bake for 20 minutes, then add a tablespoon of butter.", &labels)
            .unwrap();
        assert_eq!(scores[0].label, "Recipe");
    }

    #[test]
    fn deterministic() {
        let c = LexicalClassifier::new();
        let labels = categories();
        let a = c.score("Quarterly budget review", &labels).unwrap();
        let b = c.score("Quarterly budget review", &labels).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_labels_error() {
        let err = LexicalClassifier::new().score("text", &[]).unwrap_err();
        assert!(matches!(err, ClassifyError::EmptyLabels));
    }
}
