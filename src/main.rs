//! Image Indexer CLI
//!
//! Walks an image volume and submits every image to the visual search service.

use clap::Parser;
use env_logger::Env;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use image_indexer::config::{DEFAULT_QUEUE_CAPACITY, DEFAULT_ROOT, DEFAULT_WORKERS};
use image_indexer::http::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS};
use image_indexer::{
    walk_and_index, ExtensionFilter, HttpIndexer, IndexConfig, IndexReport, Indexer, LogIndexer,
    ProgressReporter, EXIT_FATAL,
};

const ABOUT: &str = r#"
Image Indexer - find images and register them with the visual search service

Examples:
  image_indexer                                   walk /images, post to localhost
  image_indexer /mnt/photos -e jpg,png            only .jpg and .png files
  image_indexer /images --dry-run                 log what would be indexed
  image_indexer /images --image-base-url http://nginx/data/ -w 8
"#;

/// Walks a directory tree and indexes the images it contains
#[derive(Parser)]
#[command(name = "image_indexer")]
#[command(author, version, about = ABOUT, long_about = None)]
struct Cli {
    /// Root directory to walk
    #[arg(default_value = DEFAULT_ROOT)]
    root: PathBuf,

    /// Image extensions, comma separated or repeated (default: common image types)
    #[arg(short = 'e', long = "ext", value_delimiter = ',')]
    extensions: Vec<String>,

    /// Index endpoint of the visual search service
    #[arg(long, env = "IMAGE_INDEXER_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Public URL of the root directory; images are sent as file:// URLs without it
    #[arg(long, env = "IMAGE_INDEXER_BASE_URL")]
    image_base_url: Option<String>,

    /// Log the images instead of submitting them
    #[arg(long)]
    dry_run: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Concurrent submissions (0 = one per CPU)
    #[arg(short = 'w', long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Images queued ahead of the submitters
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Maximum depth below the root
    #[arg(long)]
    max_depth: Option<usize>,

    /// Follow symbolic links
    #[arg(long)]
    follow_links: bool,

    /// Directory name to skip, may be repeated
    #[arg(long = "ignore-dir")]
    ignore_dirs: Vec<String>,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,

    /// Emit JSON progress events on stderr
    #[arg(long)]
    progress: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let extensions = if cli.extensions.is_empty() {
        ExtensionFilter::images()
    } else {
        ExtensionFilter::new(&cli.extensions)
    };
    if extensions.is_empty() {
        error!("No usable extension in --ext {:?}", cli.extensions);
        return ExitCode::from(EXIT_FATAL);
    }

    let config = IndexConfig::builder()
        .root(cli.root)
        .extensions(extensions)
        .ignore_dirs(cli.ignore_dirs.into_iter().collect())
        .follow_links(cli.follow_links)
        .max_depth(cli.max_depth)
        .workers(cli.workers)
        .queue_capacity(cli.queue_capacity)
        .build();

    info!("Indexing images under {}", config.root.display());
    info!(
        "Extensions: {}",
        config.extensions.suffixes().collect::<Vec<_>>().join(" ")
    );
    info!("Workers: {}", config.effective_workers());

    let indexer: Box<dyn Indexer> = if cli.dry_run {
        info!("Dry run, nothing will be submitted");
        Box::new(LogIndexer)
    } else {
        match HttpIndexer::new(
            &cli.endpoint,
            cli.image_base_url.as_deref(),
            Duration::from_secs(cli.timeout_secs),
        ) {
            Ok(indexer) => {
                info!("Endpoint: {}", indexer.endpoint());
                Box::new(indexer)
            }
            Err(e) => {
                error!("{}", e);
                return ExitCode::from(EXIT_FATAL);
            }
        }
    };

    let reporter = ProgressReporter::new(cli.progress, config.progress_interval_ms);

    match walk_and_index(&config, &indexer, &reporter) {
        Ok(report) => {
            print_report(&report, cli.json);
            ExitCode::from(report.exit_code())
        }
        Err(e) => {
            error!("Cannot walk {}: {}", config.root.display(), e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn print_report(report: &IndexReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(out) => println!("{}", out),
            Err(e) => error!("Cannot serialize report: {}", e),
        }
        return;
    }

    println!("Indexing completed:");
    println!("  Directories: {}", report.dirs_visited);
    println!("  Files: {}", report.files_seen);
    println!("  Images: {}", report.candidates);
    println!("  Submitted: {}", report.submitted);
    println!("  Failed: {}", report.failed);
    println!("  Unreadable: {}", report.unreadable_dirs);
    println!("  Duration: {}ms", report.duration_ms);
    for failure in &report.failures {
        println!("  ! {}: {}", failure.path.display(), failure.message);
    }
}
