//! squish - コマンドラインから画像を圧縮する
//!
//! ファイルを upload ディレクトリにステージし、バッチとして投入して
//! イベントを JSON Lines で標準出力に流します。

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use squish_core::app::{App, AppBuilder};
use squish_core::config::SquishConfig;
use squish_core::domain::{BatchId, DomainEvent, InputItem};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "squish", version, about = "Ephemeral image compression")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = squish_core::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compress one or more images as a single batch
    Compress {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Stay alive until the artifacts have expired
        #[arg(long)]
        hold: bool,
    },
    /// Print the effective configuration
    Config {
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = SquishConfig::load_from_path(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    match cli.command {
        Command::Compress { files, hold } => compress(config, files, hold).await,
        Command::Config { json } => show_config(&config, json),
    }
}

fn show_config(config: &SquishConfig, as_json: bool) -> Result<()> {
    if as_json {
        let rendered =
            serde_json::to_string_pretty(config).context("failed to serialize configuration")?;
        println!("{rendered}");
    } else {
        println!("{config:#?}");
    }
    Ok(())
}

async fn compress(config: SquishConfig, files: Vec<PathBuf>, hold: bool) -> Result<()> {
    let app = AppBuilder::new(config)
        .build()
        .await
        .context("failed to initialize squish")?;

    let mut items = Vec::with_capacity(files.len());
    for file in &files {
        match stage(&app, file).await {
            Ok(item) => items.push(item),
            Err(err) => {
                unstage(&items).await;
                return Err(err);
            }
        }
    }

    let mut events = app.subscribe();
    if let Err(err) = app.orchestrator().validate(&items) {
        unstage(&items).await;
        return Err(err).context("batch was rejected");
    }
    let receipt = app
        .orchestrator()
        .submit(items)
        .context("batch was rejected")?;
    info!(batch_id = %receipt.batch_id, accepted = receipt.accepted, "batch submitted");

    stream_events(&mut events, receipt.batch_id).await?;
    let summary = receipt
        .handle
        .wait()
        .await
        .context("batch supervisor panicked")?;
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "batch finished"
    );

    if hold {
        let config = app.config();
        let wait = config.retention.window + config.deletion.max_total_delay() + Duration::from_secs(1);
        info!(wait = ?wait, "holding until artifacts expire");
        tokio::time::sleep(wait).await;
        info!(remaining = app.registry().len(), "retention window elapsed");
    } else if summary.succeeded > 0 {
        warn!(
            dir = %app.config().storage.output_dir.display(),
            "exiting before expiry; artifacts are left on disk"
        );
    }

    if summary.failed > 0 {
        warn!(
            dir = %app.config().storage.upload_dir.display(),
            failed = summary.failed,
            "uploads of failed images are kept"
        );
    }
    if summary.succeeded == 0 {
        bail!("no image in the batch could be compressed");
    }
    Ok(())
}

/// Copy `file` into the upload directory the way a transport would.
async fn stage(app: &App, file: &Path) -> Result<InputItem> {
    let original_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} has no usable file name", file.display()))?
        .to_string();
    let staged = app
        .config()
        .storage
        .upload_dir
        .join(app.ids().generate_upload_id().to_string());

    tokio::fs::copy(file, &staged)
        .await
        .with_context(|| format!("failed to stage {}", file.display()))?;
    InputItem::from_path(staged, original_name)
        .await
        .with_context(|| format!("failed to measure {}", file.display()))
}

/// Remove staged copies that never made it into a batch.
async fn unstage(items: &[InputItem]) {
    for item in items {
        if let Err(err) = tokio::fs::remove_file(item.path()).await {
            warn!(path = %item.path().display(), error = %err, "cannot remove staged upload");
        }
    }
}

/// Print this batch's events as JSON lines until it completes.
async fn stream_events(
    events: &mut tokio::sync::broadcast::Receiver<DomainEvent>,
    batch_id: BatchId,
) -> Result<()> {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "event stream lagged");
                continue;
            }
            Err(RecvError::Closed) => bail!("event stream closed before the batch completed"),
        };
        if event.batch_id() != batch_id {
            continue;
        }

        let line = json!({ "event": event.name(), "payload": event.payload() });
        println!("{line}");
        if matches!(event, DomainEvent::AllImagesCompressed(_)) {
            return Ok(());
        }
    }
}
