use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    ApiClient, CallListViewer, CallsApi, Severity, UploadController, UploadEvent, UploadPhase,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, normalize_server_url, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "auditor",
    about = "Upload support call recordings and list their processing status"
)]
struct Cli {
    /// Config file; `auditor.toml` in the working directory is used when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the API is reachable.
    Health,
    /// Print where uploads are stored (`local` or `s3`).
    StorageMode,
    /// Upload an audio recording and register it as a call.
    Upload { file: PathBuf },
    /// List registered calls.
    Calls,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(server_url) = cli.server_url.as_deref() {
        settings.server_url = normalize_server_url(server_url);
    }
    info!(server_url = %settings.server_url, "using api");

    let api = build_api(&settings)?;
    match cli.command {
        Command::Health => {
            let health = api.health().await?;
            println!("api health: {}", health.status);
            if !health.is_ok() {
                bail!("api reported status {}", health.status);
            }
        }
        Command::StorageMode => {
            println!("{}", api.storage_mode().await?);
        }
        Command::Upload { file } => run_upload(api, file).await?,
        Command::Calls => {
            let viewer = CallListViewer::new(api);
            let outcome = viewer.refresh().await;
            println!("{}", viewer.render().await);
            outcome?;
        }
    }

    Ok(())
}

fn build_api(settings: &Settings) -> Result<Arc<dyn CallsApi>> {
    let http = reqwest::Client::builder()
        .timeout(settings.request_timeout())
        .build()
        .context("failed to build http client")?;
    let client = ApiClient::with_http_client(&settings.server_url, http)
        .with_context(|| format!("invalid server url {}", settings.server_url))?;
    Ok(Arc::new(client))
}

/// The selection reset only matters to an interactive form; the CLI exits
/// right after the upload, so it must not wait for it.
fn upload_controller(api: Arc<dyn CallsApi>) -> UploadController {
    UploadController::new(api).with_reset_delay(Duration::ZERO)
}

async fn run_upload(api: Arc<dyn CallsApi>, file: PathBuf) -> Result<()> {
    let controller = upload_controller(api);
    let mut events = controller.subscribe_events();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let Some(line) = describe_event(&event) {
                println!("{line}");
            }
        }
    });

    let outcome = match controller.select_file(&file).await {
        Ok(_) => controller.upload().await,
        Err(err) => Err(err),
    };
    // Dropping the controller closes the event channel and ends the printer.
    drop(controller);
    let _ = printer.await;

    let call = outcome.with_context(|| format!("upload of {} failed", file.display()))?;
    println!("call {} registered with status {}", call.id, call.status);
    Ok(())
}

fn describe_event(event: &UploadEvent) -> Option<String> {
    match event {
        UploadEvent::Status(status) => {
            let tag = match status.severity {
                Severity::Info => "info",
                Severity::Success => "success",
                Severity::Error => "error",
            };
            Some(format!("[{tag}] {}", status.text))
        }
        UploadEvent::Progress(progress) => Some(format!("progress {progress}%")),
        UploadEvent::FileStaged(staged) => Some(format!(
            "staged {} ({}, {} bytes)",
            staged.filename, staged.content_type, staged.size_bytes
        )),
        UploadEvent::SelectionCleared => Some("selection cleared".to_string()),
        UploadEvent::PhaseChanged(UploadPhase::Uploading) => Some("uploading...".to_string()),
        UploadEvent::PhaseChanged(_) | UploadEvent::Registered(_) => None,
    }
}
