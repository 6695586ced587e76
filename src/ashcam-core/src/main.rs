//! Ashcam - webcam image timeline viewer
//!
//! Browses recent captures of one ashcam webcam, reports missing capture
//! slots and serves the viewer API.

use anyhow::{bail, Context, Result};
use ashcam_client::AshcamClient;
use ashcam_timeline::{DateRangeStart, GapReport, ImageRecord, Navigator};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};

use ashcam_core::colored_logger::{init_component_logger, Component};
use ashcam_core::config::Config;

#[derive(Parser)]
#[command(name = "ashcam")]
#[command(about = "Browse webcam captures and report missing images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Configuration profile to apply
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the most recent images
    Latest {
        /// Number of images to list
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },

    /// Report missing capture slots and coverage
    Gaps {
        /// Only consider interesting images
        #[arg(long)]
        interesting: bool,

        /// Older pages to load before computing
        #[arg(long, default_value = "0")]
        pages: u32,
    },

    /// Show the image at a position, 1 being the newest
    Jump {
        position: i64,
    },

    /// Load every image since a date (YYYY-MM-DD or RFC 3339)
    Since {
        date: String,

        /// Accept clamping to the first available image without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// List interesting images for this webcam
    Interesting {
        /// Maximum number of images requested from the server
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Keep polling for new images until Ctrl+C
    Watch,

    /// Start the viewer web API
    Viewer {
        /// Web server port
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let component = match cli.command {
        Commands::Watch => Component::Refresh,
        Commands::Viewer { .. } => Component::Viewer,
        _ => Component::Main,
    };
    init_component_logger(component, level)?;

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(profile) = cli.profile.as_deref() {
        config = config.apply_profile(profile)?;
    }

    let navigator = build_navigator(&config)?;

    match cli.command {
        Commands::Latest { count } => cmd_latest(&navigator, count).await,
        Commands::Gaps { interesting, pages } => cmd_gaps(&navigator, interesting, pages).await,
        Commands::Jump { position } => cmd_jump(&navigator, position).await,
        Commands::Since { date, yes } => cmd_since(&navigator, &date, yes).await,
        Commands::Interesting { limit } => {
            let limit = limit.unwrap_or(config.timeline.interesting_limit);
            cmd_interesting(&navigator, limit).await
        }
        Commands::Watch => cmd_watch(&navigator, &config).await,
        Commands::Viewer { port } => cmd_viewer(navigator, &config, port).await,
    }
}

fn build_navigator(config: &Config) -> Result<Navigator> {
    let client = AshcamClient::new(&config.api.base_url, &config.api.webcam, config.api_timeout())
        .context("Failed to create API client")?;
    info!("webcam {} via {}", config.api.webcam, config.api.base_url);
    Ok(Navigator::new(Arc::new(client), config.navigator_config()))
}

async fn cmd_latest(navigator: &Navigator, count: usize) -> Result<()> {
    navigator.load_initial().await.context("Failed to load recent images")?;
    let view = navigator.snapshot().await;

    if let Some(webcam) = &view.webcam {
        println!("{} ({})", webcam.webcam_name, webcam.webcam_code);
        println!("images on server: {}", webcam.image_total);
    }
    println!("loaded: {}", view.loaded);

    if view.images.is_empty() {
        println!("no images in the recent window");
        return Ok(());
    }

    println!();
    for (i, image) in view.images.iter().take(count).enumerate() {
        println!("{:>4}. {}", i + 1, describe(image));
    }

    Ok(())
}

async fn cmd_gaps(navigator: &Navigator, interesting: bool, pages: u32) -> Result<()> {
    navigator.load_initial().await.context("Failed to load recent images")?;

    for _ in 0..pages {
        match navigator.load_more(None).await {
            Ok(0) => break,
            Ok(n) => info!("loaded {} older images", n),
            Err(e) => {
                warn!("stopped paging: {}", e);
                break;
            }
        }
    }

    navigator.set_interesting_only(interesting).await;
    let report = navigator.gap_report().await;
    print_gap_report(&report);

    Ok(())
}

async fn cmd_jump(navigator: &Navigator, position: i64) -> Result<()> {
    navigator.load_initial().await.context("Failed to load recent images")?;

    let outcome = navigator.jump_to(position).await?;
    if outcome.fetched {
        info!("timeline reloaded to reach position {}", outcome.position);
    }

    let view = navigator.snapshot().await;
    match view.current {
        Some(image) => println!("{:>4}. {}", outcome.position, describe(&image)),
        None => println!("no image at position {}", outcome.position),
    }

    Ok(())
}

async fn cmd_since(navigator: &Navigator, date: &str, yes: bool) -> Result<()> {
    let start = parse_start(date)?;
    navigator.load_initial().await.context("Failed to load webcam metadata")?;

    let mut confirmed = yes;
    if let DateRangeStart::Clamped { requested, earliest } = navigator.plan_date_range(start).await? {
        if !confirmed {
            confirmed = confirm(&format!(
                "{} is before the first image ({}). Load from the first image instead?",
                format_ts(requested),
                format_ts(earliest)
            ))?;
        }
        if !confirmed {
            println!("cancelled");
            return Ok(());
        }
    }

    let loaded = navigator.load_date_range(start, confirmed).await?;
    println!("loaded {} images", loaded);
    print_gap_report(&navigator.gap_report().await);

    Ok(())
}

async fn cmd_interesting(navigator: &Navigator, limit: u32) -> Result<()> {
    navigator.load_initial().await.context("Failed to load recent images")?;

    navigator.set_interesting_only(true).await;
    let view = navigator.snapshot().await;
    let images = if view.images.is_empty() {
        info!("no interesting images in the loaded range, asking the interesting feed");
        navigator.interesting_elsewhere(limit).await?
    } else {
        view.images
    };

    if images.is_empty() {
        println!("no interesting images found");
        return Ok(());
    }

    println!("found {} interesting image(s):\n", images.len());
    for (i, image) in images.iter().enumerate() {
        println!("{:>4}. {}", i + 1, describe(image));
    }

    Ok(())
}

async fn cmd_watch(navigator: &Navigator, config: &Config) -> Result<()> {
    let loaded = navigator.load_initial().await.context("Failed to load recent images")?;
    info!("watching {} from {} loaded images", config.api.webcam, loaded);

    let shutdown = shutdown_flag()?;
    navigator
        .run_refresh_loop(config.refresh_interval(), shutdown)
        .await;

    Ok(())
}

async fn cmd_viewer(navigator: Navigator, config: &Config, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.viewer.port);

    // The viewer stays up without data; the front end can retry.
    if let Err(e) = navigator.load_initial().await {
        error!("initial load failed: {}", e);
    }

    let shutdown = shutdown_flag()?;

    let refresher = {
        let navigator = navigator.clone();
        let shutdown = shutdown.clone();
        let period = config.refresh_interval();
        tokio::spawn(async move { navigator.run_refresh_loop(period, shutdown).await })
    };

    let static_dir = config.viewer.static_dir.clone();
    tokio::select! {
        result = ashcam_web::serve(navigator, port, static_dir) => {
            if let Err(e) = result {
                error!("viewer error: {}", e);
            }
        }
        _ = async {
            while !shutdown.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        } => {
            info!("shutting down viewer");
        }
    }

    shutdown.store(true, Ordering::SeqCst);
    refresher.await.ok();
    info!("viewer stopped");
    Ok(())
}

fn shutdown_flag() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("received shutdown signal");
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;
    Ok(shutdown)
}

fn print_gap_report(report: &GapReport) {
    let Some(stats) = report.stats else {
        println!("not enough images to estimate gaps");
        return;
    };

    println!(
        "coverage: {:.1}% ({} of {} expected, {} missing)",
        stats.coverage_percent, stats.actual_count, stats.expected_count, stats.missing_count
    );

    if report.missing.is_empty() {
        return;
    }

    println!("\nmissing slots:");
    for slot in &report.missing {
        println!("  {}", slot.date.format("%Y-%m-%d %H:%M UTC"));
    }
}

fn describe(image: &ImageRecord) -> String {
    let mut line = format!("{}  #{}", image.date().format("%Y-%m-%d %H:%M:%S UTC"), image.id);
    if image.is_interesting() {
        line.push_str("  [interesting]");
    }
    if image.is_night {
        line.push_str("  [night]");
    }
    line.push_str("  ");
    line.push_str(&image.url);
    line
}

fn format_ts(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Parse a start date as RFC 3339 or a plain `YYYY-MM-DD` (midnight UTC)
fn parse_start(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(day) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    bail!("invalid date '{}': expected YYYY-MM-DD or RFC 3339", input)
}
