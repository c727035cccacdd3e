//! Client abstraction for talking to the classification service.
//!
//! `ClassifyClient` wraps either a local `Arc<ClassificationService>` or an
//! HTTP connection to a `doc-classifyd` server. The CLI resolves which variant
//! to use at startup via [`discover_server`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use miette::Diagnostic;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::paths::ClassifyPaths;
use crate::service::{BatchItem, ClassificationService, ClassifiedUpload, ServiceError, Upload};
use crate::stats::{DocumentStats, StatsOverview};
use crate::store::{DocumentRecord, MetadataUpdate};

// ── Discovery ─────────────────────────────────────────────────────────────

/// Contents of the `doc-classifyd` PID file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub pid: u32,
    pub port: u16,
    pub bind: String,
}

impl ServerInfo {
    /// A wildcard bind is reached over loopback.
    pub fn base_url(&self) -> String {
        let host = match self.bind.as_str() {
            "0.0.0.0" | "::" => "127.0.0.1",
            other => other,
        };
        format!("http://{host}:{}", self.port)
    }
}

/// Find a live `doc-classifyd`: PID file present, process running, `/health` is 200.
/// A PID file naming a dead process is removed.
pub fn discover_server(paths: &ClassifyPaths) -> Option<ServerInfo> {
    let pid_path = paths.pid_file();
    let info: ServerInfo = serde_json::from_str(&std::fs::read_to_string(&pid_path).ok()?).ok()?;

    if !process_alive(info.pid) {
        tracing::debug!(pid = info.pid, "removing stale PID file");
        let _ = std::fs::remove_file(&pid_path);
        return None;
    }

    let health = format!("{}/health", info.base_url());
    ureq::get(&health)
        .timeout(Duration::from_secs(2))
        .call()
        .ok()
        .filter(|resp| resp.status() == 200)
        .map(|_| info)
}

/// Record this process as the running server.
pub fn write_pid_file(paths: &ClassifyPaths, port: u16, bind: &str) -> std::io::Result<()> {
    let info = ServerInfo {
        pid: std::process::id(),
        port,
        bind: bind.to_string(),
    };
    let json = serde_json::to_string_pretty(&info).map_err(std::io::Error::other)?;
    std::fs::write(paths.pid_file(), json)
}

pub fn remove_pid_file(paths: &ClassifyPaths) {
    let _ = std::fs::remove_file(paths.pid_file());
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    // SAFETY: signal 0 performs the permission and existence check only.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Diagnostic)]
pub enum ClientError {
    /// The server answered with an error status.
    #[error("{detail}")]
    #[diagnostic(code(doccls::client::server))]
    Server { status: u16, detail: String },

    #[error("No response from server")]
    #[diagnostic(
        code(doccls::client::no_response),
        help("Is doc-classifyd running? Start it, pass --server <url>, or use --local.")
    )]
    NoResponse { message: String },

    #[error("Invalid response format from server")]
    #[diagnostic(code(doccls::client::invalid_response), help("Server version mismatch?"))]
    InvalidResponse { message: String },

    #[error("Failed to upload documents")]
    #[diagnostic(code(doccls::client::upload))]
    Upload { message: String },

    #[error("remote request failed: {message}")]
    #[diagnostic(code(doccls::client::request))]
    Request { message: String },

    #[error("failed to read {path}")]
    #[diagnostic(code(doccls::client::read), help("Check that the file exists and is readable."))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Service(#[from] ServiceError),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// `{"detail": "..."}` error body used by every route.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

fn map_send_error(e: reqwest::Error) -> ClientError {
    if e.is_connect() || e.is_timeout() {
        ClientError::NoResponse {
            message: e.to_string(),
        }
    } else {
        ClientError::Request {
            message: e.to_string(),
        }
    }
}

// ── Health ────────────────────────────────────────────────────────────────

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
    pub documents: u64,
}

// ── Client ────────────────────────────────────────────────────────────────

/// Either a local service or a remote HTTP connection to doc-classifyd.
pub enum ClassifyClient {
    /// Direct in-process access.
    Local(Arc<ClassificationService>),
    /// HTTP client to a running server.
    Remote { base_url: String, http: Client },
}

impl ClassifyClient {
    /// Connect to a server at `base_url`.
    pub fn remote(base_url: &str) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| ClientError::Request {
                message: e.to_string(),
            })?;
        Ok(ClassifyClient::Remote {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Connect to a discovered server.
    pub fn from_server(info: &ServerInfo) -> ClientResult<Self> {
        Self::remote(&info.base_url())
    }

    /// Wrap a local service.
    pub fn local(service: Arc<ClassificationService>) -> Self {
        ClassifyClient::Local(service)
    }

    /// Returns true if this is a remote client.
    pub fn is_remote(&self) -> bool {
        matches!(self, ClassifyClient::Remote { .. })
    }

    // -- helpers for remote calls --

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let ClassifyClient::Remote { base_url, http } = self else {
            unreachable!("request called on local client");
        };
        http.request(method, format!("{base_url}{path}"))
    }

    /// Send a request and decode a JSON body, mapping error statuses to their `detail`.
    fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> ClientResult<T> {
        let value = self.send_value(req)?;
        serde_json::from_value(value).map_err(|e| ClientError::InvalidResponse {
            message: e.to_string(),
        })
    }

    fn send_value(&self, req: RequestBuilder) -> ClientResult<serde_json::Value> {
        let resp = req.send().map_err(map_send_error)?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .json::<ErrorBody>()
                .ok()
                .and_then(|b| b.detail)
                .map(|d| match d {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .unwrap_or_else(|| "Server error".to_string());
            return Err(ClientError::Server {
                status: status.as_u16(),
                detail,
            });
        }
        resp.json().map_err(|e| ClientError::InvalidResponse {
            message: e.to_string(),
        })
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send_json(self.request(reqwest::Method::GET, path))
    }

    // -- operations --

    pub fn health(&self) -> ClientResult<Health> {
        match self {
            ClassifyClient::Local(service) => Ok(Health {
                status: "ok".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                documents: service.count()?,
            }),
            ClassifyClient::Remote { .. } => self.get_json("/health"),
        }
    }

    /// Classify one file through `POST /api/classify`.
    pub fn upload_document(&self, path: &Path) -> ClientResult<ClassifiedUpload> {
        let upload = read_upload(path)?;
        match self {
            ClassifyClient::Local(service) => {
                Ok(service.classify_upload(&upload.filename, &upload.data)?)
            }
            ClassifyClient::Remote { .. } => {
                let form = Form::new().part("file", upload_part(upload)?);
                let req = self
                    .request(reqwest::Method::POST, "/api/classify")
                    .multipart(form);
                self.send_json(req)
            }
        }
    }

    /// Classify several files in one batch request. One item per file, in order.
    pub fn upload_documents(&self, paths: &[&Path]) -> ClientResult<Vec<BatchItem>> {
        let uploads = paths
            .iter()
            .map(|p| read_upload(p))
            .collect::<ClientResult<Vec<_>>>()?;
        match self {
            ClassifyClient::Local(service) => Ok(service.classify_batch(&uploads)),
            ClassifyClient::Remote { .. } => {
                let mut form = Form::new();
                for upload in uploads {
                    form = form.part("files", upload_part(upload)?);
                }
                let req = self
                    .request(reqwest::Method::POST, "/api/classify-batch")
                    .multipart(form);
                let value = self.send_value(req).map_err(|e| match e {
                    ClientError::Request { message } => ClientError::Upload { message },
                    other => other,
                })?;
                if !value.is_array() {
                    return Err(ClientError::InvalidResponse {
                        message: format!("expected an array, got {value}"),
                    });
                }
                serde_json::from_value(value).map_err(|e| ClientError::InvalidResponse {
                    message: e.to_string(),
                })
            }
        }
    }

    /// Every stored document, newest first.
    pub fn document_history(&self) -> ClientResult<Vec<DocumentRecord>> {
        match self {
            ClassifyClient::Local(service) => Ok(service.documents()?),
            ClassifyClient::Remote { .. } => self.get_json("/api/documents"),
        }
    }

    pub fn documents_page(&self, skip: usize, limit: usize) -> ClientResult<Vec<DocumentRecord>> {
        match self {
            ClassifyClient::Local(service) => Ok(service.documents_page(skip, limit)?),
            ClassifyClient::Remote { .. } => {
                self.get_json(&format!("/api/v1/documents?skip={skip}&limit={limit}"))
            }
        }
    }

    pub fn document(&self, id: u64) -> ClientResult<DocumentRecord> {
        match self {
            ClassifyClient::Local(service) => Ok(service.document(id)?),
            ClassifyClient::Remote { .. } => self.get_json(&format!("/api/v1/documents/{id}")),
        }
    }

    pub fn stats(&self) -> ClientResult<DocumentStats> {
        match self {
            ClassifyClient::Local(service) => Ok(service.stats()?),
            ClassifyClient::Remote { .. } => self.get_json("/api/v1/documents/stats"),
        }
    }

    /// Stats plus documents. If `/api/stats` fails, the distribution is
    /// recomputed from the document history.
    pub fn stats_overview(&self) -> ClientResult<StatsOverview> {
        match self {
            ClassifyClient::Local(service) => Ok(service.overview()?),
            ClassifyClient::Remote { .. } => match self.get_json("/api/stats") {
                Ok(overview) => Ok(overview),
                Err(e) => {
                    tracing::warn!("stats endpoint failed, computing from documents: {e}");
                    Ok(StatsOverview::from_documents(self.document_history()?))
                }
            },
        }
    }

    pub fn update_document(&self, id: u64, update: &MetadataUpdate) -> ClientResult<DocumentRecord> {
        match self {
            ClassifyClient::Local(service) => Ok(service.update_document(id, update)?),
            ClassifyClient::Remote { .. } => {
                let req = self
                    .request(reqwest::Method::PATCH, &format!("/api/v1/documents/{id}"))
                    .json(update);
                self.send_json(req)
            }
        }
    }

    pub fn remove_document(&self, id: u64) -> ClientResult<DocumentRecord> {
        match self {
            ClassifyClient::Local(service) => Ok(service.remove_document(id)?),
            ClassifyClient::Remote { .. } => self.send_json(
                self.request(reqwest::Method::DELETE, &format!("/api/v1/documents/{id}")),
            ),
        }
    }
}

fn read_upload(path: &Path) -> ClientResult<Upload> {
    Upload::from_path(path).map_err(|e| ClientError::Read {
        path: path.display().to_string(),
        source: e,
    })
}

fn upload_part(upload: Upload) -> ClientResult<Part> {
    let mime = match crate::extract::file_extension(&upload.filename).as_str() {
        ".pdf" => "application/pdf",
        ".docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".txt" => "text/plain",
        _ => "application/octet-stream",
    };
    Part::bytes(upload.data)
        .file_name(upload.filename)
        .mime_str(mime)
        .map_err(|e| ClientError::Upload {
            message: e.to_string(),
        })
}
