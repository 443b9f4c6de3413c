//! cyclecast - Publish the next post from a catalog
//!
//! Meant to be started by a scheduler (cron, a CI workflow) or by hand.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use libcyclecast::config::resolve_trigger;
use libcyclecast::formatter::preview;
use libcyclecast::logging::{LogFormat, LoggingConfig};
use libcyclecast::poster::create_platform;
use libcyclecast::runner::{PostedItem, PreviewItem};
use libcyclecast::{Config, CyclecastError, PlatformKind, Result, RunOutcome, Runner, Status};

#[derive(Parser, Debug)]
#[command(name = "cyclecast")]
#[command(version)]
#[command(about = "Publish the next post from a catalog to Facebook or LinkedIn")]
#[command(long_about = "\
cyclecast - Publish the next post from a catalog

DESCRIPTION:
    cyclecast reads a CSV catalog of pre-written posts, picks the next one that
    has not been published in the current cycle, varies its layout, and posts it.
    Once every post has gone out the cycle starts again from the top.

    Timer-triggered runs wait for a randomly drawn interval since the last post
    and may sleep a random startup delay first. Manual runs (--manual,
    CYCLECAST_TRIGGER=manual, or a workflow_dispatch event) skip both.

COMMANDS:
    post        Publish one post if it is time (default)
    preview     Show the next posts without publishing
    batch       Publish several posts with a wait between them
    status      Show catalog progress
    reset       Clear the posted log
    schedule    Have the platform publish the next post later (Facebook)

USAGE EXAMPLES:
    # Scheduled run
    cyclecast

    # Post right now regardless of the interval
    cyclecast --manual

    # Dry run of the next 5 posts
    cyclecast preview -n 5

    # Post 3 times, 20 minutes apart
    cyclecast batch -n 3 --delay 20m

    # Progress as JSON
    cyclecast --platform linkedin status --format json

CONFIGURATION:
    Configuration file: ~/.config/cyclecast/config.toml

    Environment variables:
        CYCLECAST_CONFIG       - Path to config file
        CYCLECAST_TRIGGER      - timer or manual
        CYCLECAST_LOG_FORMAT   - text, json or pretty
        CYCLECAST_LOG_LEVEL    - error, warn, info, debug or trace
        FB_PAGE_ACCESS_TOKEN   - Facebook page token
        FB_PAGE_ID             - Facebook page id
        LINKEDIN_ACCESS_TOKEN  - LinkedIn member token
        LINKEDIN_USER_ID       - LinkedIn member id (skips the lookup)

EXIT CODES:
    0 - Success, not yet time to post, or dry run
    1 - Publishing failed (or content/log error)
    2 - Configuration error or missing credentials
    3 - Invalid input
")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Target platform (facebook or linkedin)
    #[arg(short, long, global = true)]
    platform: Option<PlatformKind>,

    /// Treat this run as manually triggered
    #[arg(long, global = true)]
    manual: bool,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format: text, json or pretty
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Publish one post if the interval gate allows
    Post,

    /// Show the next posts as they would be published
    Preview {
        /// Number of posts to show
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Publish several posts, waiting between them
    Batch {
        /// Number of posts to publish
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Wait between posts (e.g. "30m", "1h 15m")
        #[arg(short, long)]
        delay: Option<String>,
    },

    /// Show catalog progress
    Status {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Number of upcoming posts to list
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },

    /// Clear the posted log
    Reset,

    /// Schedule the next post on the platform
    Schedule {
        /// How far ahead to publish (e.g. "2h")
        #[arg(long = "in", value_name = "DURATION")]
        delay: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env(cli.verbose);
    if let Some(format) = cli.log_format {
        logging.format = format;
    }
    logging.init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    if let Some(platform) = cli.platform {
        config.defaults.platform = platform;
    }
    let kind = config.defaults.platform;

    match cli.command.unwrap_or(Commands::Post) {
        Commands::Post => {
            let trigger = resolve_trigger(cli.manual)?;
            tracing::debug!("Run triggered by {:?}", trigger);
            let platform = create_platform(kind, &config)?;
            let mut runner = Runner::from_config(config, platform)?;
            let outcome = runner.run_once(trigger).await?;
            print_outcome(&outcome);
        }
        Commands::Preview { count } => {
            let count = count.unwrap_or(config.schedule.preview_count);
            let mut runner = Runner::offline_from_config(config)?;
            print_preview(&runner.preview(count)?);
        }
        Commands::Batch { count, delay } => {
            let count = count.unwrap_or(config.schedule.batch_count);
            let delay = match delay {
                Some(value) => parse_duration(&value)?,
                None => config.batch_delay()?,
            };
            let platform = create_platform(kind, &config)?;
            let mut runner = Runner::from_config(config, platform)?;
            for outcome in runner.batch(count, delay).await? {
                print_outcome(&outcome);
            }
        }
        Commands::Status { format, count } => {
            if format != "text" && format != "json" {
                return Err(CyclecastError::InvalidInput(format!(
                    "Invalid format '{}'. Must be 'text' or 'json'",
                    format
                )));
            }
            let runner = Runner::offline_from_config(config)?;
            let status = runner.status(count)?;
            if format == "json" {
                let json = serde_json::to_string_pretty(&status).map_err(|e| {
                    CyclecastError::InvalidInput(format!("Failed to serialize status: {}", e))
                })?;
                println!("{}", json);
            } else {
                print_status(&status);
            }
        }
        Commands::Reset => {
            let runner = Runner::offline_from_config(config)?;
            runner.reset()?;
            println!("Posted log cleared: {}", runner.store().path().display());
        }
        Commands::Schedule { delay } => {
            let delay = parse_duration(&delay)?;
            let at = Utc::now()
                + chrono::Duration::from_std(delay).map_err(|_| {
                    CyclecastError::InvalidInput("Schedule delay is too large".to_string())
                })?;
            let platform = create_platform(kind, &config)?;
            let mut runner = Runner::from_config(config, platform)?;
            match runner.schedule_next(at).await? {
                Some(item) => println!(
                    "Scheduled {} for {} as {}",
                    item.record_id,
                    item.publish_at.to_rfc3339(),
                    item.remote_id
                ),
                None => println!("Nothing to schedule: the catalog is empty"),
            }
        }
    }

    Ok(())
}

fn parse_duration(value: &str) -> Result<Duration> {
    humantime::parse_duration(value.trim()).map_err(|e| {
        CyclecastError::InvalidInput(format!("Invalid duration '{}': {}", value, e))
    })
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Posted(item) => print_posted(item),
        RunOutcome::NotYetTime { minutes_remaining } => {
            println!("Not time to post yet ({} minutes remaining)", minutes_remaining)
        }
        RunOutcome::NothingToPost => println!("Nothing to post: the catalog is empty"),
    }
}

fn print_posted(item: &PostedItem) {
    println!("Posted [{}] {} as {}", item.category, item.record_id, item.remote_id);
    println!("{}", "-".repeat(40));
    println!("{}", preview(&item.text, 200));
    println!("{}", "-".repeat(40));
    match (&item.image, item.media_attached, &item.degraded) {
        (Some(image), true, _) => println!("Image: {}", image),
        (Some(image), false, Some(reason)) => {
            println!("Image {} dropped, posted text-only: {}", image, reason)
        }
        (Some(image), false, None) => println!("Image {} not found, posted text-only", image),
        (None, _, _) => {}
    }
    if item.cycle_reset {
        println!("Catalog exhausted, started a new cycle");
    }
}

fn print_preview(items: &[PreviewItem]) {
    if items.is_empty() {
        println!("Nothing to preview: the catalog is empty");
        return;
    }
    println!("Next {} posts would be:", items.len());
    for (index, item) in items.iter().enumerate() {
        println!();
        println!("--- Post {} [{}] {} ---", index + 1, item.category, item.record_id);
        println!("{}", preview(&item.text, 300));
        if let Some(image) = &item.image {
            println!("Image: {}", image);
        }
    }
}

fn print_status(status: &Status) {
    println!("Platform:       {}", status.platform);
    println!("Posted log:     {}", status.log_path);
    println!("Total posts:    {}", status.total);
    println!("Posted (cycle): {}", status.posted);
    println!("Remaining:      {}", status.remaining);
    if status.cycle_complete {
        println!("Cycle complete: the next run starts again from the top");
    }
    match status.last_post_time {
        Some(at) => println!("Last post:      {}", at.to_rfc3339()),
        None => println!("Last post:      never"),
    }
    if let Some(id) = &status.last_post_id {
        println!("Last post id:   {}", id);
    }
    if !status.upcoming.is_empty() {
        println!();
        println!("Upcoming:");
        for item in &status.upcoming {
            println!("  {} [{}]", item.id, item.category);
        }
    }
}
