use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::{info, warn};

use live_vote::capture::camera::CameraBackend;
use live_vote::capture::sources::{
    StillImageCamera, StillImageLibrary, TestPatternCamera, native_screen_library,
};
use live_vote::capture::surface::CaptureLibraryLoader;
use live_vote::config::{API_BASE_URL_ENV, DEFAULT_API_BASE_URL, DEFAULT_LIBRARY_URL};
use live_vote::{
    CaptureMode, CaptureOutcome, Gesture, HttpUploader, Phase, Theme, TriggerMode, TriggerResult,
    VoteWidget, WidgetConfig,
};

/// Cast votes from the terminal: capture, upload, and watch the budget drain.
#[derive(Parser, Debug)]
#[command(name = "vote")]
#[command(about = "🗳️  Live vote widget driven from the command line")]
#[command(long_about = "Runs the live vote widget headless. Each vote captures the camera frame or \
the whole surface, uploads it to the collector and spends one vote from the session budget.")]
struct Args {
    /// Collector base URL, `/upload` is appended
    #[arg(long, env = API_BASE_URL_ENV, default_value = DEFAULT_API_BASE_URL)]
    base_url: String,

    /// Votes available in this session
    #[arg(short, long, default_value_t = 20)]
    votes: u32,

    /// Capture strategy
    #[arg(short, long, default_value = "surface", help = "What to capture: frame (camera) or surface (whole screen)")]
    mode: CaptureMode,

    /// Trigger gesture
    #[arg(short, long, default_value = "tap", help = "Trigger gesture: tap, swipe, swipe:<distance>")]
    trigger: TriggerMode,

    /// Presentation theme
    #[arg(long, default_value = "classic")]
    theme: Theme,

    /// Serve this image as the camera instead of the test pattern
    #[arg(long)]
    camera_image: Option<PathBuf>,

    /// Render this image as the surface instead of the screen
    #[arg(long)]
    surface_image: Option<PathBuf>,

    /// Location reported for the surface capture library
    #[arg(long, default_value = DEFAULT_LIBRARY_URL)]
    library_url: String,

    /// Number of votes to cast
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u32,

    /// Skip the first-run practice walkthrough
    #[arg(long)]
    skip_onboarding: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("live_vote=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let config = WidgetConfig {
        api_base_url: args.base_url,
        votes_max: args.votes,
        capture_mode: args.mode,
        trigger: args.trigger,
        theme: args.theme,
        library_url: args.library_url,
        ..WidgetConfig::default()
    };
    config.validate().map_err(anyhow::Error::msg)?;

    let camera: Arc<dyn CameraBackend> = match args.camera_image {
        Some(path) => Arc::new(StillImageCamera::new(path)),
        None => Arc::new(TestPatternCamera::new(1280, 720).front_only()),
    };
    let library: Arc<dyn CaptureLibraryLoader> = match args.surface_image {
        Some(path) => Arc::new(StillImageLibrary::new(path)),
        None => native_screen_library(&config.library_url),
    };
    let uploader = Arc::new(HttpUploader::from_config(&config));

    info!(endpoint = uploader.endpoint(), "collector configured");
    let trigger = config.trigger;
    let mut widget = VoteWidget::assemble(config, camera, library, uploader, !args.skip_onboarding)?;

    if widget.mount().await.is_err() && widget.config().capture_mode == CaptureMode::Frame {
        bail!("frame capture needs a camera");
    }

    let gesture = gesture_for(trigger);
    if let Some(onboarding) = widget.onboarding() {
        onboarding.confirm_rules()?;
        widget.handle_gesture(gesture).await?;
        widget.finish_onboarding()?;
    }

    let mut phase = widget.session().subscribe_phase();
    for _ in 0..args.count {
        phase.wait_for(|phase| *phase == Phase::Idle).await?;

        match widget.handle_gesture(gesture).await? {
            TriggerResult::Capture(CaptureOutcome::Voted {
                votes_remaining,
                response,
            }) => {
                println!("✅ vote confirmed, {votes_remaining} left: {response}");
            }
            TriggerResult::Capture(CaptureOutcome::Rejected(error)) => {
                println!("🚫 {}", error.user_message());
                break;
            }
            TriggerResult::Capture(CaptureOutcome::Failed(error)) => {
                println!("❌ {}", error.user_message());
            }
            other => warn!(?other, "vote not cast"),
        }
    }

    let session = widget.session();
    println!(
        "{} of {} votes used",
        session.votes_max() - session.votes_remaining(),
        session.votes_max()
    );
    widget.teardown();
    Ok(())
}

/// A gesture that satisfies `trigger`.
fn gesture_for(trigger: TriggerMode) -> Gesture {
    match trigger {
        TriggerMode::Tap => Gesture::Tap,
        TriggerMode::Swipe { min_distance } => Gesture::Swipe {
            dx: 0.0,
            dy: -min_distance,
        },
    }
}
