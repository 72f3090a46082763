use std::path::PathBuf;

use alt_text_batch::{AltTextConfig, AltTextError, FileUpload, Orchestrator, ALT_TEXT_PROMPT};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "alt-text", about = "Generate accessibility alt text for images")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Caption local files and image URLs
    Generate(GenerateArgs),
    /// Print the instruction sent with every image
    Prompt,
}

#[derive(Args)]
struct GenerateArgs {
    /// Image files or http(s) URLs
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write results as CSV to this file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// TOML config file (api_key, endpoint, model, timeout_secs, prompt)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the model name
    #[arg(long)]
    model: Option<String>,

    /// Override the API endpoint
    #[arg(long)]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate(args) => generate(args).await,
        Commands::Prompt => {
            println!("{}", ALT_TEXT_PROMPT);
            Ok(())
        }
    }
}

fn load_config(args: &GenerateArgs) -> Result<AltTextConfig> {
    let mut config = match &args.config {
        Some(path) => AltTextConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AltTextConfig::default(),
    }
    .with_env();

    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    Ok(config)
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

async fn generate(args: GenerateArgs) -> Result<()> {
    let config = load_config(&args)?;
    let orchestrator = Orchestrator::from_config(config)
        .context("Set ALT_TEXT_API_KEY or pass --config with an api_key")?;

    let mut uploads = Vec::new();
    for input in &args.inputs {
        if is_url(input) {
            orchestrator.add_url_record(input)?;
        } else {
            let upload = FileUpload::from_path(input)
                .await
                .with_context(|| format!("Failed to read {}", input))?;
            uploads.push(upload);
        }
    }

    let offered = uploads.len();
    match orchestrator.add_files(uploads) {
        Ok(ids) if ids.len() < offered => {
            warn!("skipped {} non-image file(s)", offered - ids.len())
        }
        Ok(_) => {}
        Err(AltTextError::NoValidImages) => warn!("none of the given files is an image"),
        Err(e) => return Err(e.into()),
    }

    let summary = orchestrator.process_batch().await?;

    for record in orchestrator.snapshot() {
        match (&record.alt_text, &record.status_error) {
            (_, Some(error)) => println!("{}: error: {}", record.label(), error),
            (Some(alt), None) => println!("{}: {}", record.label(), alt),
            (None, None) => println!("{}: (no result)", record.label()),
        }
    }
    eprintln!(
        "{} captioned, {} failed, {} skipped in {} ms",
        summary.succeeded, summary.failed, summary.skipped, summary.duration_ms
    );

    if let Some(path) = &args.csv {
        match orchestrator.export_csv() {
            Ok(csv) => std::fs::write(path, csv)
                .with_context(|| format!("Failed to write {}", path.display()))?,
            Err(AltTextError::NothingToExport) => warn!("no alt text to export"),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
