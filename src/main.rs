// src/main.rs
mod extractors;
mod source;
mod storage;
mod utils;

use clap::Parser;

use extractors::profile::ProfileExtractor;
use storage::StorageManager;
use utils::AppError;

/// Command Line Interface for the profile field extractor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Document to extract from: a local HTML file path or an http(s) URL
    input: String,

    /// Output directory for extracted profiles
    #[arg(short, long, default_value = "./output")]
    output_dir: String,

    /// Source URL recorded in the metadata when reading from a file
    #[arg(long)]
    source_url: Option<String>,

    /// Extract only, without persisting the result
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting extraction for args: {:?}", args);

    // 3. Acquire the document (the only fatal boundary besides an empty body)
    let (html, source_url) = if source::is_url(&args.input) {
        let body = source::fetch_document(&args.input).await?;
        (body, args.input.clone())
    } else {
        let body = source::read_document(&args.input).await?;
        let url = args
            .source_url
            .clone()
            .unwrap_or_else(|| format!("file://{}", args.input));
        (body, url)
    };

    // 4. Run one extraction pass
    let extractor = ProfileExtractor::new();
    let record = extractor.extract(&html, &source_url)?;

    println!(
        "{}",
        serde_json::to_string_pretty(&record).map_err(|e| AppError::Processing(e.to_string()))?
    );

    if args.dry_run {
        tracing::info!("Dry run requested, skipping persistence");
        return Ok(());
    }

    // 5. Persist once; a sink failure is reported, never fatal
    let storage = StorageManager::new(&args.output_dir)?;
    let outcome = storage.persist(&record).await;
    if outcome.success {
        tracing::info!("Profile extracted and persisted successfully");
    } else {
        tracing::warn!(
            "Profile extracted but not persisted: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}
