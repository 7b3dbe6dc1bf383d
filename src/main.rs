//! KSS command line interface.
//!
//! Wraps the analyzer library in four commands: `tistory` and `youtube`
//! for a single known platform, `analyze` for auto-detection and `batch`
//! for a JSON file of platform-tagged URLs. Results print to stdout and
//! are saved under the output directory with a timestamp suffix.

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use kss::batch::{run_batch, BatchItem, SessionDispatcher};
use kss::config::Config;
use kss::engine::{clean_text, truncate_text};
use kss::platform::{self, Platform};
use kss::record::{AnalysisRecord, BatchOutcome};
use kss::session::Session;
use kss::{output, Result};

#[derive(Parser)]
#[command(name = "kss", version, about = "Analyzer for Korean social platforms")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Directory where results are saved
    #[arg(short, long, global = true)]
    output: Option<String>,

    /// Output format on stdout
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Summary)]
    format: Format,

    /// Run the browser with a visible window
    #[arg(long, global = true)]
    headed: bool,

    /// Navigation timeout in milliseconds
    #[arg(short, long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a Tistory blog
    Tistory {
        url: String,
        /// Maximum recent posts to collect
        #[arg(long)]
        posts: Option<usize>,
    },
    /// Analyze a YouTube channel
    Youtube {
        url: String,
        /// Maximum recent videos to collect
        #[arg(long)]
        videos: Option<usize>,
    },
    /// Analyze a URL on whichever platform it belongs to
    Analyze { url: String },
    /// Analyze every item in a JSON batch file
    Batch { file: String },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Human-readable overview
    Summary,
    /// Full record as pretty JSON
    Json,
}

/// One entry of a batch file: `[{ "platform": "tistory", "url": "..." }]`.
#[derive(Deserialize)]
struct BatchFileItem {
    platform: String,
    url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing - respect RUST_LOG environment variable
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    info!("KSS v{}", kss::VERSION);

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    apply_overrides(&mut config, &cli);

    let mut session = Session::new(config.browser.clone());
    let outcome = run(&cli, &config, &mut session).await;

    if let Err(e) = session.shutdown().await {
        warn!("Browser shutdown failed: {}", e);
    }

    if let Err(e) = outcome {
        error!("Analysis failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if cli.headed {
        config.browser.headless = false;
    }
    if let Some(timeout) = cli.timeout {
        config.browser.timeout_ms = timeout;
    }
    if let Some(dir) = &cli.output {
        config.output.dir = dir.clone();
    }
    match &cli.command {
        Command::Tistory { posts: Some(posts), .. } => config.tistory.max_posts = *posts,
        Command::Youtube { videos: Some(videos), .. } => config.youtube.max_videos = *videos,
        _ => {}
    }
}

async fn run(cli: &Cli, config: &Config, session: &mut Session) -> Result<()> {
    match &cli.command {
        Command::Tistory { url, .. } => {
            let record = platform::tistory::analyze(session, config, url).await?;
            emit_record(&record, cli.format);
            let name = section_label(&record, "blog_info", "title").unwrap_or("blog");
            output::save_json(&config.output.dir, &format!("tistory_{}", name), &record)?;
        }
        Command::Youtube { url, .. } => {
            let record = platform::youtube::analyze_channel(session, config, url).await?;
            emit_record(&record, cli.format);
            let name = section_label(&record, "channel_info", "name").unwrap_or("channel");
            output::save_json(&config.output.dir, &format!("youtube_{}", name), &record)?;
        }
        Command::Analyze { url } => {
            let record = platform::analyze(session, config, url).await?;
            emit_record(&record, cli.format);
            output::save_json(
                &config.output.dir,
                &format!("{}_analysis", record.platform),
                &record,
            )?;
        }
        Command::Batch { file } => {
            let items = load_batch_file(file)?;
            info!("Loaded {} batch items from {}", items.len(), file);

            let mut dispatcher = SessionDispatcher::new(session, config);
            let outcomes = run_batch(&mut dispatcher, &config.batch, &items).await;

            emit_batch(&outcomes, cli.format);
            output::save_json(&config.output.dir, "batch_analysis", &outcomes)?;
        }
    }
    Ok(())
}

fn load_batch_file(path: &str) -> Result<Vec<BatchItem>> {
    let content = std::fs::read_to_string(path)?;
    let entries: Vec<BatchFileItem> = serde_json::from_str(&content)?;
    Ok(entries
        .into_iter()
        .map(|entry| BatchItem::new(Platform::from_name(&entry.platform), entry.url))
        .collect())
}

fn section_label<'a>(record: &'a AnalysisRecord, section: &str, field: &str) -> Option<&'a str> {
    record
        .section(section)
        .and_then(|section| section.get(field))
        .and_then(Value::as_str)
        .filter(|label| !label.is_empty())
}

fn emit_record(record: &AnalysisRecord, format: Format) {
    match format {
        Format::Json => match serde_json::to_string_pretty(record) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!("Failed to render record as JSON: {}", e),
        },
        Format::Summary => print_summary(record),
    }
}

fn print_summary(record: &AnalysisRecord) {
    println!();
    println!("platform     {}", record.platform);
    println!("url          {}", record.url);
    println!("analyzed at  {}", record.analyzed_at);
    for (name, value) in &record.sections {
        match value {
            Value::Array(items) => println!("{:<12} {} items", name, items.len()),
            Value::Object(fields) => {
                println!("{}:", name);
                for (field, value) in fields {
                    println!("  {:<18} {}", field, render_scalar(value));
                }
            }
            other => println!("{:<12} {}", name, other),
        }
    }
    println!();
}

/// One-line rendering for a summary cell, capped at 60 characters.
fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => truncate_text(&clean_text(text), 60),
        other => other.to_string(),
    }
}

fn emit_batch(outcomes: &[BatchOutcome], format: Format) {
    if format == Format::Json {
        match serde_json::to_string_pretty(outcomes) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!("Failed to render outcomes as JSON: {}", e),
        }
        return;
    }

    println!();
    for outcome in outcomes {
        match outcome {
            BatchOutcome::Success(record) => {
                println!("ok    {:<10} {}", record.platform, record.url)
            }
            BatchOutcome::Error { url, error, .. } => println!("fail  {} ({})", url, error),
        }
    }
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    println!("\n{}/{} succeeded", succeeded, outcomes.len());
}
