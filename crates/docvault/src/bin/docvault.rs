//! docvault CLI.
//!
//! ```bash
//! docvault upload report.pdf --wait
//! docvault list --sort-by size --order ASC
//! docvault show <ID>
//! docvault download <ID> ./copy.pdf
//! docvault delete <ID>
//! ```
//!
//! Every command prints JSON on stdout; logs go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

use docvault::config::{apply_env_overrides, load_config, validate_config};
use docvault::{logging, open_documents, Config, Docvault, PageQuery, UploadRequest};

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Store documents and generate AI summaries and markdown for them.
#[derive(Parser)]
#[command(name = "docvault", version, about)]
struct Cli {
    /// JSON config file (defaults apply when omitted)
    #[arg(short, long, env = "DOCVAULT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a file and schedule its processing
    Upload {
        file: PathBuf,

        /// Declared media type (guessed from the file name when omitted)
        #[arg(long)]
        mime: Option<String>,

        /// Wait until processing has finished and print the result
        #[arg(long)]
        wait: bool,
    },
    /// List documents, one page at a time
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        /// uploadedAt, originalName or size
        #[arg(long)]
        sort_by: Option<String>,
        /// ASC or DESC
        #[arg(long)]
        order: Option<String>,
    },
    /// Show a document with its processing status and artifacts
    Show { id: String },
    /// Delete a document and its stored file
    Delete { id: String },
    /// Write the original upload to a file
    Download { id: String, out: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("warning: {}", e);
    }

    let result = run(&config, cli.command).await;

    match result {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn resolve_config(path: Option<&Path>) -> CliResult<Config> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => {
            let config = Config::default();
            validate_config(&config)?;
            config
        }
    };
    Ok(apply_env_overrides(config)?)
}

/// Only `upload` starts the generation backend and pipeline queue; the
/// other commands open the stores read-only.
async fn run(config: &Config, command: Command) -> CliResult<serde_json::Value> {
    match command {
        Command::Upload { file, mime, wait } => {
            let app = Docvault::from_config(config)?;
            let result = upload(&app, file, mime, wait).await;
            app.shutdown().await;
            result
        }
        Command::List {
            page,
            limit,
            sort_by,
            order,
        } => {
            let query = PageQuery::parse(page, limit, sort_by.as_deref(), order.as_deref())?;
            Ok(serde_json::to_value(open_documents(config)?.list(query)?)?)
        }
        Command::Show { id } => Ok(serde_json::to_value(open_documents(config)?.get(&id)?)?),
        Command::Delete { id } => {
            open_documents(config)?.delete(&id)?;
            Ok(json!({ "deleted": id }))
        }
        Command::Download { id, out } => {
            let file = open_documents(config)?.download(&id)?;
            tokio::fs::write(&out, &file.bytes).await?;
            Ok(json!({
                "id": id,
                "originalName": file.original_name,
                "mimeType": file.mime_type,
                "size": file.bytes.len(),
                "path": out.display().to_string(),
            }))
        }
    }
}

async fn upload(
    app: &Docvault,
    file: PathBuf,
    mime: Option<String>,
    wait: bool,
) -> CliResult<serde_json::Value> {
    let documents = app.documents();
    let bytes = tokio::fs::read(&file).await?;
    let original_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mime_type = mime.unwrap_or_else(|| {
        mime_guess::from_path(&file)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string()
    });

    // Subscribe first so the terminal event cannot be missed.
    let mut events = app.subscribe();
    let detail = documents.submit(UploadRequest::new(bytes, original_name, mime_type))?;
    if !wait {
        return Ok(serde_json::to_value(detail)?);
    }

    let id = detail.document.id;
    loop {
        match events.recv().await {
            Ok(event) if event.document_id == id && event.event.is_final() => break,
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
    Ok(serde_json::to_value(documents.get(&id)?)?)
}
