use std::path::Path;

use clap::Parser;
use config::Config;
use tracing::{error, info, warn};

use m3ufilter::fetch;
use m3ufilter::playlist::filter_playlist;
use m3ufilter::settings::Settings;
use m3ufilter::storage::{save_local, Credentials, S3Storage};

const PLAYLIST_CONTENT_TYPE: &str = "application/x-mpegurl";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Save the playlists locally and skip the S3 upload (overrides config)
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration: optional TOML file with an environment overlay,
    // so CI pipelines can run on variables alone.
    let settings = Config::builder()
        .add_source(config::File::with_name(&args.config).required(false))
        .add_source(config::Environment::with_prefix("M3UFILTER").separator("__"))
        .build()?;
    let settings: Settings = settings.try_deserialize()?;

    let validation_errors = settings.validate();
    if !validation_errors.is_empty() {
        for err in &validation_errors {
            error!("Configuration error: {}", err);
        }
        std::process::exit(1);
    }

    let dry_run = args.dry_run || settings.output.dry_run;

    if let Err(e) = run(&settings, dry_run).await {
        error!("Process failed: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(settings: &Settings, dry_run: bool) -> anyhow::Result<()> {
    info!("Starting M3U filtering process");

    let raw = fetch::fetch_playlist(&settings.source.url, settings.source.max_bytes).await?;
    let raw = fetch::drop_oversized_lines(&raw, fetch::MAX_LINE_LENGTH);

    let policy = settings.filter_policy()?;
    let outcome = filter_playlist(&raw, &policy)?;
    let stats = outcome.stats;
    info!(
        "Filtering complete: {} lines -> {} lines ({} channels -> {} channels)",
        stats.input_lines, stats.output_lines, stats.input_channels, stats.output_channels
    );

    // Both playlists are saved locally in all modes for artifact availability.
    let out_dir = Path::new(&settings.output.dir);
    save_local(out_dir, &settings.s3.key, &outcome.playlist)?;
    save_local(out_dir, &settings.all_categories_key(), &raw)?;

    if dry_run {
        info!("Dry-run mode: files saved locally, skipping S3 upload");
        return Ok(());
    }

    if settings.s3.bucket == "your-bucket-name" {
        anyhow::bail!("s3.bucket is not configured. Please set it before uploading.");
    }

    let Some(credentials) = Credentials::from_env() else {
        warn!("AWS credentials not found in environment variables. Make sure they are set.");
        anyhow::bail!("AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY are required for upload");
    };

    let storage = S3Storage::new(settings.s3.clone(), credentials)?;
    storage
        .put_object(&settings.s3.key, outcome.playlist.as_bytes(), PLAYLIST_CONTENT_TYPE)
        .await?;
    storage
        .put_object(&settings.all_categories_key(), raw.as_bytes(), PLAYLIST_CONTENT_TYPE)
        .await?;

    info!("Process completed successfully");
    Ok(())
}
