//! Service settings, persisted as TOML.
//!
//! Every field has a serde default so a partial (or missing) config file yields
//! a working setup. The global file lives at
//! `$XDG_CONFIG_HOME/doc-classify/config.toml`; a handful of `DOCCLS_*`
//! environment variables override it at startup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chunker::ChunkConfig;
use crate::classify::{ConfidenceLevel, Thresholds};
use crate::error::{ConfigError, ConfigResult};
use crate::paths::ClassifyPaths;

/// Which classifier implementation scores documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierBackend {
    /// Built-in offline lexical scorer.
    Lexical,
    /// Hugging Face compatible zero-shot inference endpoint.
    Remote,
}

impl std::str::FromStr for ClassifierBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lexical" => Ok(Self::Lexical),
            "remote" => Ok(Self::Remote),
            other => Err(ConfigError::Invalid {
                field: "classifier.backend".into(),
                message: format!("unknown backend \"{other}\" (expected lexical or remote)"),
            }),
        }
    }
}

/// How extracted text is fed to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStrategy {
    /// Score the first `max_chars` characters only.
    Truncate,
    /// Score up to `max_chunks` normalized chunks and average.
    Chunked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierSettings {
    #[serde(default = "default_backend")]
    pub backend: ClassifierBackend,
    #[serde(default = "default_model")]
    pub model: String,
    /// Full inference URL. Derived from `model` when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_hypothesis_template")]
    pub hypothesis_template: String,
    /// Extra keywords per category for the lexical backend.
    #[serde(default)]
    pub lexicon: BTreeMap<String, Vec<String>>,
}

impl ClassifierSettings {
    /// The endpoint actually called by the remote backend.
    pub fn resolved_endpoint(&self) -> String {
        self.endpoint.clone().unwrap_or_else(|| {
            format!(
                "https://api-inference.huggingface.co/models/{}",
                self.model
            )
        })
    }
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            model: default_model(),
            endpoint: None,
            api_token: None,
            timeout_secs: default_timeout_secs(),
            hypothesis_template: default_hypothesis_template(),
            lexicon: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextSettings {
    #[serde(default = "default_strategy")]
    pub strategy: TextStrategy,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
    #[serde(default)]
    pub chunk: ChunkConfig,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            max_chars: default_max_chars(),
            max_chunks: default_max_chunks(),
            chunk: ChunkConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatsSettings {
    /// Minimum score counted as "high confidence" on the dashboard.
    #[serde(default = "default_high_confidence_cutoff")]
    pub high_confidence_cutoff: f64,
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            high_confidence_cutoff: default_high_confidence_cutoff(),
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_api_v1_prefix")]
    pub api_v1_prefix: String,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Overrides the XDG data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub upload_dir: Option<PathBuf>,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Per-file limit in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Whole-request limit in bytes (batch uploads).
    #[serde(default = "default_max_request_size")]
    pub max_request_size: u64,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub stats: StatsSettings,
    #[serde(default)]
    pub classifier: ClassifierSettings,
    #[serde(default)]
    pub text: TextSettings,
}

fn default_project_name() -> String {
    "AI Document Classification".into()
}
fn default_api_prefix() -> String {
    "/api".into()
}
fn default_api_v1_prefix() -> String {
    "/api/v1".into()
}
fn default_bind() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}
fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}
fn default_max_request_size() -> u64 {
    100 * 1024 * 1024
}
fn default_allowed_extensions() -> Vec<String> {
    vec![".txt".into(), ".pdf".into(), ".docx".into()]
}
fn default_categories() -> Vec<String> {
    [
        "Technical Documentation",
        "Business Proposal",
        "Legal Document",
        "Academic Paper",
        "General Article",
        "Other",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3002".into()]
}
fn default_backend() -> ClassifierBackend {
    ClassifierBackend::Lexical
}
fn default_model() -> String {
    "facebook/bart-large-mnli".into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_hypothesis_template() -> String {
    "This example is {}.".into()
}
fn default_strategy() -> TextStrategy {
    TextStrategy::Truncate
}
fn default_max_chars() -> usize {
    512
}
fn default_max_chunks() -> usize {
    8
}
fn default_high_confidence_cutoff() -> f64 {
    0.5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            api_prefix: default_api_prefix(),
            api_v1_prefix: default_api_v1_prefix(),
            bind: default_bind(),
            port: default_port(),
            data_dir: None,
            upload_dir: None,
            database_path: None,
            max_file_size: default_max_file_size(),
            max_request_size: default_max_request_size(),
            allowed_extensions: default_allowed_extensions(),
            categories: default_categories(),
            cors_origins: default_cors_origins(),
            thresholds: Thresholds::default(),
            stats: StatsSettings::default(),
            classifier: ClassifierSettings::default(),
            text: TextSettings::default(),
        }
    }
}

impl Settings {
    /// Read settings from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&data).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Parse settings from a TOML string.
    pub fn from_toml(data: &str) -> ConfigResult<Self> {
        toml::from_str(data).map_err(|e| ConfigError::Parse {
            path: "(inline)".into(),
            message: e.to_string(),
        })
    }

    /// Load the global config file, apply environment overrides, and validate.
    pub fn load_or_default(paths: &ClassifyPaths) -> ConfigResult<Self> {
        let mut settings = Self::load(&paths.global_config_file())?;
        settings.apply_env();
        settings.validate()?;
        Ok(settings)
    }

    /// Render as TOML (for `doc-classify config`).
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            message: e.to_string(),
        })
    }

    /// Apply `DOCCLS_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the process env in production).
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup("DOCCLS_BIND") {
            self.bind = bind;
        }
        if let Some(port) = lookup("DOCCLS_PORT") {
            match port.parse() {
                Ok(p) => self.port = p,
                Err(_) => tracing::warn!(value = %port, "ignoring invalid DOCCLS_PORT"),
            }
        }
        if let Some(dir) = lookup("DOCCLS_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(token) = lookup("DOCCLS_API_TOKEN") {
            self.classifier.api_token = Some(token);
        }
        if let Some(backend) = lookup("DOCCLS_CLASSIFIER") {
            match backend.parse() {
                Ok(b) => self.classifier.backend = b,
                Err(e) => tracing::warn!("ignoring DOCCLS_CLASSIFIER: {e}"),
            }
        }
    }

    /// Check invariants the pipeline relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |field: &str, message: String| ConfigError::Invalid {
            field: field.into(),
            message,
        };

        let Thresholds { high, medium } = self.thresholds;
        if !(0.0..=1.0).contains(&high) || !(0.0..=1.0).contains(&medium) {
            return Err(invalid(
                "thresholds",
                format!("thresholds must lie in [0, 1], got high={high} medium={medium}"),
            ));
        }
        if medium > high {
            return Err(invalid(
                "thresholds",
                format!("medium ({medium}) must not exceed high ({high})"),
            ));
        }
        if self.categories.is_empty() {
            return Err(invalid("categories", "at least one category is required".into()));
        }
        if self.allowed_extensions.is_empty() {
            return Err(invalid(
                "allowed_extensions",
                "at least one extension is required".into(),
            ));
        }
        if let Some(ext) = self.allowed_extensions.iter().find(|e| !e.starts_with('.')) {
            return Err(invalid(
                "allowed_extensions",
                format!("\"{ext}\" must start with a dot, e.g. \".txt\""),
            ));
        }
        if self.max_file_size == 0 {
            return Err(invalid("max_file_size", "must be greater than zero".into()));
        }
        if self.text.max_chars == 0 {
            return Err(invalid("text.max_chars", "must be greater than zero".into()));
        }
        if self.text.max_chunks == 0 {
            return Err(invalid("text.max_chunks", "must be greater than zero".into()));
        }
        Ok(())
    }

    /// Bucket a confidence score into its level.
    pub fn confidence_level(&self, score: f64) -> ConfidenceLevel {
        ConfidenceLevel::from_score(score, &self.thresholds)
    }

    /// Whether a (dotted) extension is accepted for upload. Case-insensitive.
    pub fn is_allowed_extension(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.to_lowercase() == ext)
    }

    /// `"Unsupported file type. Allowed types: .txt, .pdf, .docx"`
    pub fn unsupported_type_message(&self) -> String {
        format!(
            "Unsupported file type. Allowed types: {}",
            self.allowed_extensions.join(", ")
        )
    }

    /// Apply the `data_dir` override to resolved XDG paths.
    pub fn effective_paths(&self, paths: ClassifyPaths) -> ClassifyPaths {
        match &self.data_dir {
            Some(dir) => paths.with_data_dir(dir.clone()),
            None => paths,
        }
    }

    pub fn upload_dir(&self, paths: &ClassifyPaths) -> PathBuf {
        self.upload_dir
            .clone()
            .unwrap_or_else(|| paths.uploads_dir())
    }

    pub fn database_path(&self, paths: &ClassifyPaths) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| paths.database_file())
    }

    /// `bind:port` for the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
