mod alarm;
mod browser;
mod config;
mod prompt;
mod time_provider;
mod videos;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::alarm::model::{AlarmTime, seconds_until};
use crate::alarm::scheduler::{AlarmScheduler, FireOutcome};
use crate::browser::{SystemBrowser, open_random_video};
use crate::config::{AppConfig, load_app_config};
use crate::prompt::{Console, FAREWELL, PromptOutcome, prompt_alarm_time};
use crate::time_provider::{SystemTimeSource, TimeSource};
use crate::videos::load_video_urls;

const WAIT_POLL: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
#[command(
    name = "videoalarm",
    version,
    about = "Wake up to a random video from your list"
)]
struct Cli {
    /// JSON settings file (version, videos_file, default_urls, quit_keyword)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Video list, one URL per line; created with defaults when missing
    #[arg(long)]
    videos: Option<PathBuf>,

    /// Alarm time such as 20:50, 11:34am or 3pm; skips the prompt
    #[arg(long, value_name = "TIME")]
    at: Option<AlarmTime>,

    /// Command used to open the video; defaults to $BROWSER, then the system opener
    #[arg(long)]
    browser: Option<String>,

    /// Print when the alarm would ring without arming it
    #[arg(long)]
    dry_run: bool,

    #[arg(long, value_name = "SECONDS", hide = true)]
    fire_in: Option<u64>,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "videoalarm=warn".into()),
        )
        .with_writer(io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_app_config(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(videos) = cli.videos {
        config.videos_file = videos;
    }

    let urls = load_video_urls(&config.videos_file, &config.default_urls);
    info!(
        path = %config.videos_file.display(),
        count = urls.len(),
        "video list ready"
    );

    let mut console = Console::install();
    let alarm_time = match cli.at {
        Some(time) => time,
        None => {
            let outcome = {
                let mut out = io::stdout().lock();
                prompt_alarm_time(&mut console, &mut out, &config.quit_keyword)?
            };
            match outcome {
                PromptOutcome::Time(time) => time,
                PromptOutcome::Cancelled => {
                    println!("\n{FAREWELL}");
                    return Ok(());
                }
            }
        }
    };

    let source: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
    let clock = alarm_time.to_clock();
    let delay = match cli.fire_in {
        Some(secs) => Duration::from_secs(secs),
        None => {
            let secs = seconds_until(clock, &source.now())?;
            Duration::from_secs(u64::try_from(secs).unwrap_or(0))
        }
    };
    let delay_secs = delay.as_secs();

    if cli.dry_run {
        println!("Alarm would ring at {clock}, {delay_secs} seconds from now (dry run, nothing armed).");
        return Ok(());
    }

    let browser = SystemBrowser::from_env(cli.browser);
    let handle = AlarmScheduler::new(source)
        .with_poll_slice(WAIT_POLL)
        .arm(delay, move || open_random_video(&urls, &browser, &mut rand::rng()));
    info!(%clock, fire_at = %handle.fire_at(), "alarm armed");
    println!(
        "Your alarm will run in {delay_secs} seconds, please don't close this window or it won't run."
    );

    while !handle.is_finished() {
        if console.interrupted_within(WAIT_POLL) {
            handle.cancel();
            break;
        }
    }

    match handle.join()? {
        FireOutcome::Fired(url) => println!("Opened {url}"),
        FireOutcome::Cancelled => println!("\nAlarm cancelled."),
    }
    Ok(())
}
