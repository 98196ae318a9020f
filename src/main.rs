use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use chapter_splitter::config::Config;
use chapter_splitter::processing::ChapterPipeline;
use chapter_splitter::{load_catalog, Ffmpeg};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Chapter Splitter")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Cut keyword-matching chapters out of long-form media")
        .arg(
            Arg::new("catalog")
                .short('c')
                .long("catalog")
                .value_name("FILE")
                .help("JSON catalog of media records with timestamped descriptions")
                .required(true)
        )
        .arg(
            Arg::new("media-dir")
                .short('m')
                .long("media-dir")
                .value_name("DIR")
                .help("Directory containing the source media files")
                .required_unless_present("preview")
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Output directory for clips, manifests and the outline [default: config]")
        )
        .arg(
            Arg::new("keyword")
                .short('k')
                .long("keyword")
                .value_name("WORD")
                .help("Keyword to match; prefix with '-' to exclude. Repeatable")
                .action(ArgAction::Append)
                .allow_hyphen_values(true)
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .value_name("NUM")
                .help("Number of media items split in parallel [default: config]")
                .value_parser(clap::value_parser!(usize))
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file")
        )
        .arg(
            Arg::new("preview")
                .long("preview")
                .help("Only list the matching chapters, do not split anything")
                .action(ArgAction::SetTrue)
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");

    // Load configuration first, its log level is the default filter
    let (mut config, load_error) = match matches.get_one::<String>("config") {
        Some(path) => (Config::from_file(&PathBuf::from(path))?, None),
        None => match Config::load() {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
    };

    // Initialize logging; RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter(verbose))),
        )
        .init();

    if verbose {
        info!("Verbose logging enabled");
    }
    if let Some(e) = load_error {
        warn!("Failed to load config, using defaults: {}", e);
    }

    if let Some(workers) = matches.get_one::<usize>("workers") {
        config.performance.max_workers = *workers;
    }
    if let Some(output_dir) = matches.get_one::<String>("output-dir") {
        config.output.base_dir = PathBuf::from(output_dir);
    }
    config.validate()?;

    let keywords: Vec<String> = matches
        .get_many::<String>("keyword")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let catalog_path = PathBuf::from(
        matches
            .get_one::<String>("catalog")
            .ok_or_else(|| anyhow!("--catalog is required"))?,
    );
    let records = load_catalog(&catalog_path).await?;

    let output_dir = config.output.base_dir.clone();
    let pipeline = ChapterPipeline::with_ffmpeg(config);

    if matches.get_flag("preview") {
        let (_, summary) = pipeline.preview(&records, &keywords);
        println!("{}", summary);
        return Ok(());
    }

    let media_dir = PathBuf::from(
        matches
            .get_one::<String>("media-dir")
            .ok_or_else(|| anyhow!("--media-dir is required unless --preview is given"))?,
    );

    // Validate input directory
    if !media_dir.exists() {
        error!("Media directory does not exist: {}", media_dir.display());
        return Err(anyhow!("Media directory not found"));
    }

    let ffmpeg = Ffmpeg::with_binary(pipeline.config().splitting.ffmpeg_path.clone());
    if !ffmpeg.is_available().await {
        error!("ffmpeg not found at {}", ffmpeg.binary().display());
        return Err(anyhow!("ffmpeg is not available"));
    }

    info!("🚀 Chapter Splitter starting...");
    info!("{}", pipeline.config().summary());

    let results = pipeline.run(&records, &keywords, &media_dir, &output_dir).await?;

    // Print results
    println!("{}", results.summary);
    info!("🎉 Processing completed in {:.2}s", results.total_time.as_secs_f64());
    info!("✅ Successful: {}", results.successful);
    info!("⚠️ Partial: {}", results.partial);
    info!("❌ Failed: {}", results.failed);
    info!("🎬 Clips: {}", results.clips);
    if let Some(outline) = &results.outline_path {
        info!("🧭 Outline: {}", outline.display());
    }

    Ok(())
}
