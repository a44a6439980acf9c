use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use console::Emoji;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use podplay::{
    DownloadManager, Episode, FetchOptions, MediaBackend, NoopReporter, PlaybackController,
    ProgressEvent, ProgressReporter, ReqwestClient, SharedProgressReporter, WriteMode,
    default_browse_root, load_episodes,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");

/// Browse podcast feeds, download episodes and play them
#[derive(Parser, Debug)]
#[command(name = "podplay")]
#[command(about = "Browse podcast feeds, download episodes and play them")]
#[command(version)]
struct Args {
    /// Show debug diagnostics (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the episodes of a feed, oldest first
    Episodes {
        /// RSS feed URL or path to local RSS file
        feed: String,

        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download one episode unless it is already on disk
    Fetch(EpisodeArgs),

    /// Download one episode and control its playback from the prompt
    Play(EpisodeArgs),

    /// Print the directory offered as the starting point for browsing
    Root,
}

#[derive(clap::Args, Debug)]
struct EpisodeArgs {
    /// RSS feed URL or path to local RSS file
    feed: String,

    /// Episode number as shown by `podplay episodes`
    number: u32,

    /// Directory the episode is downloaded to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Write straight into the final file instead of a .partial file
    #[arg(long)]
    in_place: bool,

    /// Quiet mode - suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    multi: MultiProgress,
    download_bar: Mutex<Option<ProgressBar>>,
    main_bar: ProgressBar,
}

impl IndicatifReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let main_style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg}")
            .unwrap();

        let main_bar = multi.add(ProgressBar::new_spinner());
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            multi,
            download_bar: Mutex::new(None),
            main_bar,
        }
    }

    fn start_bar(&self, length: u64, title: &str) {
        let style = ProgressStyle::default_bar()
            .template(&format!(
                "  {DOWNLOAD}[{{bar:30.cyan/blue}}] {{bytes}}/{{total_bytes}} {{wide_msg}}"
            ))
            .unwrap()
            .progress_chars("█▓░");

        let bar = self.multi.add(ProgressBar::new(length));
        bar.set_style(style);
        bar.set_message(truncate_title(title, 40));
        *self.download_bar.lock().unwrap() = Some(bar);
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Some(bar) = self.download_bar.lock().unwrap().as_ref() {
            f(bar);
        }
    }

    fn finish(&self, message: String) {
        if let Some(bar) = self.download_bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
        self.main_bar.finish_with_message(message);
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FetchingFeed { url } => {
                self.main_bar
                    .set_message(format!("{SEARCH}Fetching feed: {}", url.cyan()));
            }

            ProgressEvent::FeedParsed {
                podcast_title,
                total_episodes,
            } => {
                self.main_bar.set_message(format!(
                    "{HEADPHONES}{} • {} episodes",
                    podcast_title.bold().green(),
                    total_episodes.to_string().cyan()
                ));
            }

            ProgressEvent::CacheHit { episode_title, .. } => {
                self.finish(format!(
                    "{SUCCESS}{} already downloaded",
                    truncate_title(&episode_title, 40).green()
                ));
            }

            ProgressEvent::DownloadStarting {
                episode_title,
                content_length,
            } => {
                self.start_bar(content_length.unwrap_or(0), &episode_title);
            }

            ProgressEvent::DownloadProgress {
                bytes_downloaded,
                total_bytes,
                ..
            } => {
                self.with_bar(|bar| {
                    if let Some(total) = total_bytes {
                        bar.set_length(total);
                    }
                    bar.set_position(bytes_downloaded);
                });
            }

            ProgressEvent::Finalizing { .. } => {
                self.with_bar(|bar| bar.set_message("finalizing"));
            }

            ProgressEvent::DownloadCompleted { episode_title, .. } => {
                self.finish(format!(
                    "{SUCCESS}{}",
                    truncate_title(&episode_title, 40).green()
                ));
            }

            ProgressEvent::DownloadFailed {
                episode_title,
                error,
            } => {
                self.finish(format!(
                    "{FAILURE}{} - {}",
                    truncate_title(&episode_title, 30).red(),
                    error.red()
                ));
            }
        }
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let kept: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

fn format_position(position: Duration) -> String {
    let secs = position.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "podplay=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn select_episode(episodes: Vec<Episode>, number: u32) -> Result<Episode> {
    if episodes.is_empty() {
        bail!("Feed contains no usable episodes");
    }
    let total = episodes.len();
    episodes
        .into_iter()
        .find(|episode| episode.number() == number)
        .with_context(|| format!("No episode {number}, the feed has episodes 1 to {total}"))
}

async fn list_episodes(client: &ReqwestClient, feed: &str, json: bool) -> Result<()> {
    let episodes = load_episodes(client, feed, &NoopReporter::shared())
        .await
        .context("Failed to load feed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&episodes)?);
        return Ok(());
    }

    let Some(first) = episodes.first() else {
        println!("{}", "No usable episodes in this feed".yellow());
        return Ok(());
    };

    println!(
        "\n{HEADPHONES}{} {}\n",
        first.podcast_title().bold().green(),
        format!("by {}", first.author()).dimmed()
    );
    for episode in &episodes {
        println!(
            "  {:>4}  {}",
            episode.number().to_string().cyan(),
            episode.title()
        );
    }
    println!();

    Ok(())
}

async fn fetch_episode(client: &ReqwestClient, args: &EpisodeArgs) -> Result<PathBuf> {
    let reporter: SharedProgressReporter = if args.quiet {
        NoopReporter::shared()
    } else {
        Arc::new(IndicatifReporter::new())
    };

    let episodes = load_episodes(client, &args.feed, &reporter)
        .await
        .context("Failed to load feed")?;
    let episode = select_episode(episodes, args.number)?;

    let options = FetchOptions {
        write_mode: if args.in_place {
            WriteMode::InPlace
        } else {
            WriteMode::Atomic
        },
        default_dir: None,
    };
    let manager = DownloadManager::new(client.clone(), reporter).with_options(options);

    manager
        .spawn_fetch(episode, args.output_dir.clone())
        .await?
        .context("Failed to download episode")
}

fn print_status<B: MediaBackend>(controller: &PlaybackController<B>) {
    println!(
        "{} {} | vol {:.1} | {}x",
        controller.status().to_string().bold(),
        format_position(controller.position()).cyan(),
        controller.volume(),
        controller.rate_label()
    );
}

async fn run_prompt<B: MediaBackend>(controller: &mut PlaybackController<B>) -> Result<()> {
    println!(
        "{}",
        "Commands: play, pause, ff, rw, +, -, rate, status, quit".dimmed()
    );
    print_status(controller);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "play" | "p" => controller.play(),
            "pause" | "space" => controller.pause(),
            "ff" | "f" => controller.seek_forward(),
            "rw" | "b" => controller.seek_back(),
            "+" => controller.volume_up(),
            "-" => controller.volume_down(),
            "rate" | "r" => controller.cycle_rate(),
            "status" | "s" | "" => {}
            "quit" | "q" => break,
            other => {
                println!("{} {}", "Unknown command:".red(), other);
                continue;
            }
        }
        print_status(controller);
    }

    Ok(())
}

#[cfg(feature = "rodio")]
fn backend() -> Result<podplay::RodioBackend> {
    podplay::RodioBackend::new().context("Failed to open audio output")
}

#[cfg(not(feature = "rodio"))]
fn backend() -> Result<podplay::ClockBackend> {
    Ok(podplay::ClockBackend::new())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let client = ReqwestClient::new();

    match args.command {
        Command::Root => {
            println!("{}", default_browse_root().display());
        }

        Command::Episodes { feed, json } => {
            list_episodes(&client, &feed, json).await?;
        }

        Command::Fetch(episode_args) => {
            let path = fetch_episode(&client, &episode_args).await?;
            println!("\n{FOLDER}{}", path.display().to_string().cyan());
        }

        Command::Play(episode_args) => {
            let path = fetch_episode(&client, &episode_args).await?;

            println!(
                "\n{}{} {}\n",
                MICROPHONE,
                "podplay".bold().magenta(),
                path.display().to_string().dimmed()
            );

            let mut controller = PlaybackController::with_media(backend()?, &path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            run_prompt(&mut controller).await?;
        }
    }

    Ok(())
}
