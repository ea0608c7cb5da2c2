use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};
use voicematch_capture::{
    CaptureFlow, Config, CpalBackend, Navigator, SessionRunner, SessionSnapshot, SessionStatus,
    UniformPicker,
};

#[derive(Parser)]
#[command(name = "voicematch-capture")]
#[command(about = "Record a short voice sample and hand it to matching")]
struct Args {
    /// Config file path (extension optional)
    #[arg(short, long, default_value = "config/voicematch")]
    config: String,

    /// Override the capture window in seconds
    #[arg(long)]
    capture_secs: Option<u64>,

    /// Override the hint delay in seconds
    #[arg(long)]
    hint_secs: Option<u64>,

    /// Save the captured WAV to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the artifact summary as JSON
    #[arg(long)]
    json: bool,
}

/// Demo navigator: the matching screen is out of scope, so moving on
/// is just logged
struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn open_matching(&self) {
        info!("Moving on to matching");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("VoiceMatch capture v0.1.0");
    info!("Loaded config: {}", cfg.service.name);

    let mut session_config = cfg.session_config();
    if let Some(secs) = args.capture_secs {
        session_config.capture_duration = Duration::from_secs(secs);
    }
    if let Some(secs) = args.hint_secs {
        session_config.hint_delay = Duration::from_secs(secs);
    }
    info!(
        "Capture window: {}s, hint delay: {}s",
        session_config.capture_duration.as_secs(),
        session_config.hint_delay.as_secs()
    );

    let mic = Box::new(CpalBackend::new(cfg.microphone_config()));
    let handle = SessionRunner::spawn(session_config, mic, Box::new(UniformPicker));
    let mut updates = handle.updates();

    // Render every transition in the background
    let renderer = tokio::spawn(render_updates(handle.updates()));

    info!("Press Enter to start recording (idle a moment for a suggestion)");
    wait_for_enter().await?;
    handle.start().await?;

    let snapshot = wait_for(&mut updates, |s| {
        s.status == SessionStatus::Recording || s.status.is_terminal()
    })
    .await?;

    if snapshot.status == SessionStatus::Recording {
        info!("Press Enter to stop early, or let the window run out");

        tokio::select! {
            entered = wait_for_enter() => {
                entered?;
                if let Err(e) = handle.stop().await {
                    // The window may have elapsed just before the keystroke
                    warn!("Stop not accepted: {}", e);
                }
            }
            _ = wait_for(&mut updates, |s| s.status.is_terminal()) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                handle.shutdown().await;
                renderer.abort();
                return Ok(());
            }
        }

        wait_for(&mut updates, |s| s.status.is_terminal()).await?;
    }

    let snapshot = handle.snapshot();
    match snapshot.status {
        SessionStatus::Captured => {
            let artifact = snapshot
                .artifact
                .context("captured session without artifact")?;

            if let Some(path) = &args.output {
                std::fs::write(path, &artifact.bytes)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Saved capture to {}", path.display());
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&artifact.summary())?);
            }

            let mut flow = CaptureFlow::new(handle.clone(), Box::new(LoggingNavigator));
            flow.confirm()?;
        }
        SessionStatus::Failed => {
            if let Some(error) = &snapshot.error {
                warn!("Capture failed: {}", error);
                if error.is_permission_denied() {
                    info!("Allow microphone access in system settings, then run again");
                }
            }
        }
        status => warn!("Session ended in unexpected status: {}", status),
    }

    handle.shutdown().await;
    renderer.abort();

    Ok(())
}

/// Print each snapshot as it is published
async fn render_updates(mut updates: watch::Receiver<SessionSnapshot>) {
    loop {
        render(&updates.borrow_and_update());
        if updates.changed().await.is_err() {
            break;
        }
    }
}

fn render(snapshot: &SessionSnapshot) {
    match snapshot.status {
        SessionStatus::Idle => match &snapshot.hint {
            Some(hint) => info!("Need an idea? {}", hint),
            None => info!("Ready when you are"),
        },
        SessionStatus::AwaitingPermission => info!("Requesting microphone access..."),
        SessionStatus::Recording => info!("Recording..."),
        SessionStatus::Stopping => info!("Finalizing capture..."),
        SessionStatus::Captured => {
            if let Some(artifact) = &snapshot.artifact {
                info!(
                    "Captured {:.1}s of audio ({} bytes, {})",
                    artifact.duration_secs,
                    artifact.bytes.len(),
                    artifact.mime_type
                );
            }
        }
        SessionStatus::Failed => {
            if let Some(error) = &snapshot.error {
                warn!("{}", error);
            }
        }
    }
}

/// Block until the snapshot satisfies `pred`, following updates
async fn wait_for<F>(
    updates: &mut watch::Receiver<SessionSnapshot>,
    pred: F,
) -> Result<SessionSnapshot>
where
    F: Fn(&SessionSnapshot) -> bool,
{
    loop {
        {
            let current = updates.borrow_and_update();
            if pred(&current) {
                return Ok(current.clone());
            }
        }
        updates
            .changed()
            .await
            .map_err(|_| anyhow::anyhow!("session closed"))?;
    }
}

/// Resolve on the next line from stdin (EOF counts)
async fn wait_for_enter() -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    lines.next_line().await.context("Failed to read stdin")?;
    Ok(())
}
