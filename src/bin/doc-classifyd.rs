//! doc-classifyd: HTTP server for document classification.
//!
//! Reads `$XDG_CONFIG_HOME/doc-classify/config.toml` (plus `DOCCLS_*`
//! overrides), opens the document store and serves the API until SIGINT or
//! SIGTERM. A PID file lets the `doc-classify` CLI find the running server.

use std::sync::Arc;

use miette::{IntoDiagnostic, Result};

use doc_classify::client;
use doc_classify::config::Settings;
use doc_classify::paths::ClassifyPaths;
use doc_classify::server;
use doc_classify::service::ClassificationService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,pdf_extract=warn,lopdf=warn")
            }),
        )
        .init();

    let xdg = ClassifyPaths::resolve()?;
    let settings = Settings::load_or_default(&xdg)?;
    let paths = settings.effective_paths(xdg);
    paths.ensure_dirs()?;

    let addr = settings.listen_addr();
    let bind = settings.bind.clone();
    let service = Arc::new(ClassificationService::open(settings, &paths)?);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .into_diagnostic()?;
    let port = listener.local_addr().into_diagnostic()?.port();

    if let Err(e) = client::write_pid_file(&paths, port, &bind) {
        tracing::warn!("failed to write PID file: {e}");
    }

    let paths_for_shutdown = paths.clone();
    let result = server::serve(listener, service, async move {
        server::shutdown_signal().await;
        tracing::info!("doc-classifyd shutting down");
        client::remove_pid_file(&paths_for_shutdown);
    })
    .await;

    client::remove_pid_file(&paths);
    result.into_diagnostic()
}
