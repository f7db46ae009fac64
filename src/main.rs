use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use moodtune::config::Overrides;
use moodtune::detector::{JsonLinesSource, SidecarSource, ThreadedLinesSource};
use moodtune::{
    AudioBackend, Config, CpalBackend, Error, FrameOutcome, FrameSource, NullBackend,
    PlaybackController, PlaylistPool, PlaylistSelector, Session,
};

/// Simulated track length when running without an audio device
const DRY_RUN_TRACK_LENGTH: Duration = Duration::from_secs(180);

/// moodtune - plays music that follows the mood on camera
#[derive(Parser)]
#[command(name = "moodtune", version, about)]
struct Cli {
    /// Config file (default: ~/.config/moodtune/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Track library root with one directory per category
    #[arg(long, env = "MOODTUNE_SONGS_DIR")]
    songs_dir: Option<PathBuf>,

    /// Minimum detector confidence (0.2 - 0.5)
    #[arg(long, env = "MOODTUNE_CONFIDENCE_THRESHOLD")]
    confidence_threshold: Option<f32>,

    /// Observations kept for majority voting (5 - 20)
    #[arg(long, env = "MOODTUNE_HISTORY_SIZE")]
    history_size: Option<usize>,

    /// Seconds a mood must hold before the music changes
    #[arg(long, env = "MOODTUNE_STABILITY_SECS")]
    stability_secs: Option<f64>,

    /// Process every Kth detector frame
    #[arg(long, env = "MOODTUNE_FRAME_INTERVAL")]
    frame_interval: Option<u32>,

    /// Read detector frames from a file ("-" for stdin, the default)
    #[arg(short, long, conflicts_with = "detector_cmd")]
    input: Option<PathBuf>,

    /// Spawn the detector and read frames from its stdout
    #[arg(long)]
    detector_cmd: Option<String>,

    /// Log track changes without opening an audio device
    #[arg(long)]
    dry_run: bool,

    /// Print a JSON status line for every processed frame
    #[arg(long)]
    status_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List the tracks found for each category
    Library,
    /// Play one track on the default output device
    TestSpeaker {
        /// Audio file to play
        track: PathBuf,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            config_path: self.config.clone(),
            songs_dir: self.songs_dir.clone(),
            confidence_threshold: self.confidence_threshold,
            history_size: self.history_size,
            stability_secs: self.stability_secs,
            frame_interval: self.frame_interval,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,moodtune=info",
        1 => "info,moodtune=debug",
        2 => "debug",
        _ => "trace",
    };

    // Status lines own stdout, logs go to stderr
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(Command::TestSpeaker { track }) = &cli.command {
        return test_speaker(track).await;
    }

    let config = Config::load(&cli.overrides())?;
    tracing::debug!(?config, "loaded configuration");

    if matches!(cli.command, Some(Command::Library)) {
        return list_library(&config);
    }

    let pool = PlaylistPool::scan(&config.library);
    let backend: Box<dyn AudioBackend> = if cli.dry_run {
        tracing::info!("dry run, no audio device opened");
        Box::new(NullBackend::new(DRY_RUN_TRACK_LENGTH))
    } else {
        Box::new(CpalBackend::new()?)
    };
    let controller = PlaybackController::new(
        backend,
        pool,
        PlaylistSelector::new(),
        config.playback.retry_delay,
    );
    let mut session = Session::new(&config, controller)?;

    let mut source: Box<dyn FrameSource> = match (&cli.detector_cmd, &cli.input) {
        (Some(cmd), _) => Box::new(SidecarSource::spawn(cmd)?),
        (None, Some(path)) if path != Path::new("-") => {
            Box::new(JsonLinesSource::open(path).await?)
        }
        _ => {
            tracing::info!("reading detector frames from stdin");
            Box::new(ThreadedLinesSource::stdin()?)
        }
    };

    let result = run_loop(
        &mut session,
        source.as_mut(),
        config.playback.poll_interval,
        cli.status_json,
    )
    .await;

    session.shutdown();
    result
}

/// Feed frames and playback polls into the session until Ctrl-C or end of input
#[allow(clippy::future_not_send)]
async fn run_loop<B: AudioBackend>(
    session: &mut Session<B>,
    source: &mut dyn FrameSource,
    poll_interval: Duration,
    status_json: bool,
) -> anyhow::Result<()> {
    // Set up shutdown signal
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    let mut poll = tokio::time::interval(poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(session_id = %session.id(), "moodtune ready");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::info!("shutdown requested");
                break;
            }
            frame = source.next_frame() => {
                let Some(frame) = frame? else {
                    tracing::info!("detector input ended");
                    break;
                };

                let now = Instant::now();
                let outcome = session.handle_frame(&frame, now);
                if status_json && outcome != FrameOutcome::Skipped {
                    let snapshot = session.snapshot(session.frame_time(&frame, now));
                    println!("{}", serde_json::to_string(&snapshot)?);
                }
            }
            _ = poll.tick() => {
                session.poll_playback(Instant::now());
            }
        }
    }

    Ok(())
}

/// Print every category with its tracks
fn list_library(config: &Config) -> anyhow::Result<()> {
    let root = &config.library.root;
    if !root.is_dir() {
        return Err(Error::Library(format!("{} is not a directory", root.display())).into());
    }

    let pool = PlaylistPool::scan(&config.library);

    println!("Library: {}", root.display());
    for (category, tracks) in pool.iter() {
        println!("\n{category} ({} tracks)", tracks.len());
        if tracks.is_empty() {
            println!("  warning: no tracks, this mood will play silence");
        }
        for track in tracks {
            println!("  {}", track.display());
        }
    }
    println!("\n{} tracks total", pool.total());

    Ok(())
}

/// Play a single track until it ends or Ctrl-C
#[allow(clippy::future_not_send)]
async fn test_speaker(track: &Path) -> anyhow::Result<()> {
    println!("Playing {} ...", track.display());

    let mut backend = CpalBackend::new()?;
    println!("Output sample rate: {} Hz", backend.sample_rate());
    backend.play(track)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!("Interrupted");
                break;
            }
            () = tokio::time::sleep(Duration::from_millis(100)) => {
                if backend.is_finished() {
                    break;
                }
            }
        }
    }

    backend.stop();

    println!("\n---");
    println!("If you heard the track, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");

    Ok(())
}
