//! XDG-compliant path resolution for doc-classify.
//!
//! [`ClassifyPaths`] locates the global config file, the data directory that
//! holds the document database and saved uploads, and the runtime directory
//! where the server drops its PID file.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(doccls::paths::no_home),
        help("Set the HOME environment variable, or pass --data-dir explicitly.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(doccls::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

const APP_DIR: &str = "doc-classify";

/// Global XDG-compliant directories for doc-classify.
#[derive(Debug, Clone)]
pub struct ClassifyPaths {
    /// `$XDG_CONFIG_HOME/doc-classify/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/doc-classify/`
    pub data_dir: PathBuf,
    /// `$XDG_STATE_HOME/doc-classify/`
    pub state_dir: PathBuf,
    /// `$XDG_RUNTIME_DIR/doc-classify/` (falls back to `state_dir/run/`)
    pub runtime_dir: PathBuf,
}

impl ClassifyPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| PathError::NoHome)?;

        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".config"))
            .join(APP_DIR);

        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/share"))
            .join(APP_DIR);

        let state_dir = std::env::var("XDG_STATE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/state"))
            .join(APP_DIR);

        let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
            .map(|d| PathBuf::from(d).join(APP_DIR))
            .unwrap_or_else(|_| state_dir.join("run"));

        Ok(Self {
            config_dir,
            data_dir,
            state_dir,
            runtime_dir,
        })
    }

    /// Root every directory under a single base (used by `--data-dir` and tests).
    pub fn rooted_at(base: &Path) -> Self {
        Self {
            config_dir: base.join("config"),
            data_dir: base.to_path_buf(),
            state_dir: base.join("state"),
            runtime_dir: base.join("run"),
        }
    }

    /// Same as `self`, but with a different data directory.
    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data_dir = data_dir;
        self
    }

    /// Create all base directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.state_dir,
            &self.runtime_dir,
            &self.uploads_dir(),
        ] {
            create_dir(dir)?;
        }
        Ok(())
    }

    /// Path to the global config file.
    pub fn global_config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Default directory for saved uploads.
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    /// Default document database file.
    pub fn database_file(&self) -> PathBuf {
        self.data_dir.join("documents.redb")
    }

    /// PID file written by a running `doc-classifyd`.
    pub fn pid_file(&self) -> PathBuf {
        self.runtime_dir.join("doc-classifyd.pid")
    }
}

/// `create_dir_all` with a diagnostic error.
pub fn create_dir(dir: &Path) -> PathResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
        path: dir.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_paths_use_app_dir() {
        // Read-only check: mutating env vars is unsafe in edition 2024.
        let paths = ClassifyPaths::resolve().unwrap();
        assert!(paths.config_dir.ends_with(APP_DIR));
        assert!(paths.data_dir.ends_with(APP_DIR));
        assert!(paths.pid_file().starts_with(&paths.runtime_dir));
    }

    #[test]
    fn rooted_layout() {
        let paths = ClassifyPaths::rooted_at(Path::new("/srv/docs"));
        assert_eq!(paths.uploads_dir(), PathBuf::from("/srv/docs/uploads"));
        assert_eq!(
            paths.database_file(),
            PathBuf::from("/srv/docs/documents.redb")
        );
        assert_eq!(
            paths.global_config_file(),
            PathBuf::from("/srv/docs/config/config.toml")
        );
    }

    #[test]
    fn ensure_dirs_creates_uploads() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = ClassifyPaths::rooted_at(dir.path());
        paths.ensure_dirs().unwrap();
        assert!(paths.uploads_dir().is_dir());
        assert!(paths.runtime_dir.is_dir());
    }
}
