//! doc-classify CLI: classify documents and browse the history.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use doc_classify::client::{self, ClassifyClient};
use doc_classify::config::Settings;
use doc_classify::paths::ClassifyPaths;
use doc_classify::render;
use doc_classify::service::ClassificationService;
use doc_classify::stats::Dashboard;
use doc_classify::store::MetadataUpdate;

#[derive(Parser)]
#[command(name = "doc-classify", version, about = "Document classification")]
struct Cli {
    /// Talk to the server at this URL instead of discovering one.
    #[arg(long, global = true, conflicts_with = "local")]
    server: Option<String>,

    /// Work in-process even if a server is running.
    #[arg(long, global = true)]
    local: bool,

    /// Config file (default: $XDG_CONFIG_HOME/doc-classify/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for uploads and the document database.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one or more documents.
    Classify {
        /// Files to upload (.txt, .pdf, .docx).
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List every classified document, newest first.
    History,

    /// Show one document.
    Show { id: u64 },

    /// List documents by id with offset and limit.
    Page {
        #[arg(long, default_value = "0")]
        skip: usize,
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Show the statistics dashboard.
    Stats,

    /// Edit a document's title, description or tags.
    Tag {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Replace the tag list (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Remove every tag.
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,
    },

    /// Delete a document and its stored upload.
    Remove { id: u64 },

    /// Print the effective settings as TOML.
    Config,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn load_settings(cli: &Cli, paths: &ClassifyPaths) -> Result<Settings> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| paths.global_config_file());
    let mut settings = Settings::load(&path)?;
    settings.apply_env();
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = Some(dir.clone());
    }
    settings.validate()?;
    Ok(settings)
}

/// `--server`, then a discovered server unless `--local`, then in-process.
fn resolve_client(cli: &Cli, settings: &Settings, paths: &ClassifyPaths) -> Result<ClassifyClient> {
    if let Some(url) = &cli.server {
        tracing::debug!(url, "using explicit server");
        return Ok(ClassifyClient::remote(url)?);
    }
    if !cli.local {
        if let Some(info) = client::discover_server(paths) {
            tracing::debug!(url = %info.base_url(), "using discovered server");
            return Ok(ClassifyClient::from_server(&info)?);
        }
    }
    let service = ClassificationService::open(settings.clone(), paths)?;
    Ok(ClassifyClient::local(Arc::new(service)))
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let xdg = ClassifyPaths::resolve()?;
    let settings = load_settings(&cli, &xdg)?;
    let paths = settings.effective_paths(xdg);

    if let Commands::Config = cli.command {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    paths.ensure_dirs()?;
    let client = resolve_client(&cli, &settings, &paths)?;

    match &cli.command {
        Commands::Classify { files } => {
            let inputs: Vec<&std::path::Path> = files.iter().map(PathBuf::as_path).collect();
            let items = client.upload_documents(&inputs)?;
            if cli.json {
                print_json(&items)?;
            } else {
                print!("{}", render::batch_report(&items));
            }
        }

        Commands::History => {
            let docs = client.document_history()?;
            if cli.json {
                print_json(&docs)?;
            } else {
                print!("{}", render::history_table(&docs));
            }
        }

        Commands::Show { id } => {
            let doc = client.document(*id)?;
            if cli.json {
                print_json(&doc)?;
            } else {
                print!("{}", render::document_detail(&doc, &settings.thresholds));
            }
        }

        Commands::Page { skip, limit } => {
            let docs = client.documents_page(*skip, *limit)?;
            if cli.json {
                print_json(&docs)?;
            } else {
                print!("{}", render::history_table(&docs));
            }
        }

        Commands::Stats => {
            let overview = client.stats_overview()?;
            let dash = Dashboard::from_overview(&overview, settings.stats.high_confidence_cutoff);
            if cli.json {
                print_json(&dash)?;
            } else {
                print!("{}", render::dashboard(&dash));
            }
        }

        Commands::Tag {
            id,
            title,
            description,
            tags,
            clear_tags,
        } => {
            let update = MetadataUpdate {
                title: title.clone(),
                description: description.clone(),
                tags: if *clear_tags {
                    Some(Vec::new())
                } else if tags.is_empty() {
                    None
                } else {
                    Some(tags.clone())
                },
            };
            if update.is_empty() {
                return Err(miette::miette!(
                    help = "Pass --title, --description, --tag or --clear-tags.",
                    "nothing to update"
                ));
            }
            let doc = client.update_document(*id, &update)?;
            if cli.json {
                print_json(&doc)?;
            } else {
                print!("{}", render::document_detail(&doc, &settings.thresholds));
            }
        }

        Commands::Remove { id } => {
            let doc = client.remove_document(*id)?;
            if cli.json {
                print_json(&doc)?;
            } else {
                println!("Removed #{} {}", doc.id, doc.original_filename);
            }
        }

        Commands::Config => unreachable!("handled above"),
    }

    Ok(())
}
