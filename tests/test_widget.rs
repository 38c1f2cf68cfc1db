//! Integration tests for the assembled vote widget
//!
//! Real capture pipeline, real camera manager and bundled test sources; only
//! the uploader and failing backends are mocked.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::mock_capture::{CountingLibrary, NoCamera};
use common::mock_upload::MockUploader;
use live_vote::capture::camera::FacingPreference;
use live_vote::capture::sources::{TestPatternCamera, UnsupportedLibrary};
use live_vote::{
    CaptureMode, CaptureOutcome, Gesture, Phase, Theme, TriggerMode, TriggerResult, VoteWidget,
    WidgetConfig,
};

fn config(mode: CaptureMode, trigger: TriggerMode) -> WidgetConfig {
    WidgetConfig {
        capture_mode: mode,
        trigger,
        votes_max: 3,
        timings: common::fast_timings(),
        ..WidgetConfig::default()
    }
}

fn expect_capture(result: TriggerResult) -> CaptureOutcome {
    match result {
        TriggerResult::Capture(outcome) => outcome,
        other => panic!("expected a capture, got {other:?}"),
    }
}

#[tokio::test]
async fn test_frame_vote_with_fallback_camera() {
    let uploader = Arc::new(MockUploader::accepting());
    let mut widget = VoteWidget::assemble(
        config(CaptureMode::Frame, TriggerMode::Tap),
        Arc::new(TestPatternCamera::new(48, 32).front_only()),
        Arc::new(UnsupportedLibrary::default()),
        uploader.clone(),
        false,
    )
    .unwrap();
    assert!(!widget.camera_active());

    assert_eq!(widget.mount().await.unwrap(), FacingPreference::Default);
    assert!(widget.preview().is_live());

    let outcome = expect_capture(widget.handle_gesture(Gesture::Tap).await.unwrap());
    assert!(outcome.is_voted(), "{outcome:?}");
    assert_eq!(widget.session().votes_remaining(), 2);
    assert_eq!(uploader.calls(), 1);
}

#[tokio::test]
async fn test_no_camera_degrades_to_surface_capture() {
    let camera = Arc::new(NoCamera::new());
    let library = Arc::new(CountingLibrary::new());
    let uploader = Arc::new(MockUploader::accepting());
    let mut widget = VoteWidget::assemble(
        config(CaptureMode::Surface, TriggerMode::Tap),
        camera.clone(),
        library.clone(),
        uploader.clone(),
        false,
    )
    .unwrap();

    let error = widget.mount().await.unwrap_err();
    assert_eq!(error.category(), "camera_unavailable");
    assert_eq!(camera.attempts.load(Ordering::SeqCst), 3);
    assert!(!widget.camera_active());
    assert!(!widget.preview().is_live());

    let outcome = expect_capture(widget.handle_gesture(Gesture::Tap).await.unwrap());
    assert!(outcome.is_voted(), "{outcome:?}");
    assert_eq!(library.loads(), 1);
}

#[tokio::test]
async fn test_no_camera_frame_capture_fails_without_cost() {
    let uploader = Arc::new(MockUploader::accepting());
    let mut widget = VoteWidget::assemble(
        config(CaptureMode::Frame, TriggerMode::Tap),
        Arc::new(NoCamera::new()),
        Arc::new(UnsupportedLibrary::default()),
        uploader.clone(),
        false,
    )
    .unwrap();
    assert!(widget.mount().await.is_err());

    let outcome = expect_capture(widget.handle_gesture(Gesture::Tap).await.unwrap());
    assert_eq!(outcome.error().unwrap().category(), "frame_unavailable");
    assert_eq!(widget.session().phase(), Phase::Idle);
    assert_eq!(widget.session().votes_remaining(), 3);
    assert_eq!(uploader.calls(), 0);
}

#[tokio::test]
async fn test_library_load_failure_surfaces_as_capture_failure() {
    let uploader = Arc::new(MockUploader::accepting());
    let config = WidgetConfig {
        library_url: "https://cdn.example.test/capture.js".to_string(),
        ..config(CaptureMode::Surface, TriggerMode::Tap)
    };
    let library = Arc::new(UnsupportedLibrary::new(config.library_url.clone()));
    let widget = VoteWidget::assemble(
        config,
        Arc::new(NoCamera::new()),
        library,
        uploader.clone(),
        false,
    )
    .unwrap();

    let outcome = expect_capture(widget.handle_gesture(Gesture::Tap).await.unwrap());
    let error = outcome.error().unwrap();
    assert_eq!(error.category(), "capture_library");
    assert!(error.to_string().contains("https://cdn.example.test/capture.js"));
    assert!(
        widget
            .session()
            .error()
            .unwrap()
            .starts_with("Failed to capture screenshot")
    );
    assert_eq!(widget.session().votes_remaining(), 3);
    assert_eq!(uploader.calls(), 0);
}

#[tokio::test]
async fn test_back_to_back_taps_load_library_once() {
    let library = Arc::new(CountingLibrary::new());
    let uploader = Arc::new(MockUploader::accepting());
    let widget = VoteWidget::assemble(
        config(CaptureMode::Surface, TriggerMode::Tap),
        Arc::new(NoCamera::new()),
        library.clone(),
        uploader.clone(),
        false,
    )
    .unwrap();

    let (first, second) = futures_util::join!(
        widget.handle_gesture(Gesture::Tap),
        widget.handle_gesture(Gesture::Tap)
    );
    let outcomes = [
        expect_capture(first.unwrap()),
        expect_capture(second.unwrap()),
    ];

    assert_eq!(outcomes.iter().filter(|o| o.is_voted()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, CaptureOutcome::Ignored))
            .count(),
        1
    );
    assert_eq!(library.loads(), 1);
    assert_eq!(uploader.calls(), 1);
    assert_eq!(widget.session().votes_remaining(), 2);
}

#[tokio::test]
async fn test_swipe_trigger_ignores_other_gestures() {
    let uploader = Arc::new(MockUploader::accepting());
    let widget = VoteWidget::assemble(
        config(
            CaptureMode::Surface,
            TriggerMode::Swipe {
                min_distance: 80.0,
            },
        ),
        Arc::new(NoCamera::new()),
        Arc::new(CountingLibrary::new()),
        uploader.clone(),
        false,
    )
    .unwrap();

    for gesture in [
        Gesture::Tap,
        Gesture::Swipe { dx: 0.0, dy: -40.0 },
        Gesture::Swipe { dx: 0.0, dy: 200.0 },
    ] {
        assert!(matches!(
            widget.handle_gesture(gesture).await.unwrap(),
            TriggerResult::Ignored
        ));
    }
    assert_eq!(uploader.calls(), 0);

    let outcome = expect_capture(
        widget
            .handle_gesture(Gesture::Swipe { dx: 5.0, dy: -120.0 })
            .await
            .unwrap(),
    );
    assert!(outcome.is_voted());
}

#[tokio::test]
async fn test_onboarding_owns_trigger_until_finished() {
    let uploader = Arc::new(MockUploader::accepting());
    let widget = VoteWidget::assemble(
        config(CaptureMode::Surface, TriggerMode::Tap),
        Arc::new(NoCamera::new()),
        Arc::new(CountingLibrary::new()),
        uploader.clone(),
        true,
    )
    .unwrap();
    let onboarding = widget.onboarding().unwrap();

    // Nothing listens while the rules are shown
    assert!(matches!(
        widget.handle_gesture(Gesture::Tap).await.unwrap(),
        TriggerResult::Ignored
    ));
    assert!(widget.finish_onboarding().is_err());

    onboarding.confirm_rules().unwrap();
    assert!(matches!(
        widget.handle_gesture(Gesture::Tap).await.unwrap(),
        TriggerResult::Practice(true)
    ));
    assert!(onboarding.state().practice_complete);
    assert_eq!(uploader.calls(), 0);
    assert_eq!(widget.session().votes_remaining(), 3);

    widget.finish_onboarding().unwrap();
    let outcome = expect_capture(widget.handle_gesture(Gesture::Tap).await.unwrap());
    assert!(outcome.is_voted());
    assert_eq!(uploader.calls(), 1);
}

#[tokio::test]
async fn test_teardown_releases_camera_once() {
    let mut widget = VoteWidget::assemble(
        WidgetConfig {
            theme: Theme::Stadium,
            ..config(CaptureMode::Frame, TriggerMode::Tap)
        },
        Arc::new(TestPatternCamera::new(8, 8)),
        Arc::new(UnsupportedLibrary::default()),
        Arc::new(MockUploader::accepting()),
        false,
    )
    .unwrap();
    assert_eq!(widget.theme(), Theme::Stadium);

    assert_eq!(widget.mount().await.unwrap(), FacingPreference::Back);
    let preview = widget.preview();
    assert!(preview.is_live());

    assert_eq!(widget.teardown(), 1);
    assert_eq!(widget.teardown(), 0);
    assert!(!preview.is_live());
    assert!(!widget.camera_active());
}

#[test]
fn test_invalid_config_is_rejected() {
    let result = VoteWidget::assemble(
        WidgetConfig {
            api_base_url: "ftp://collector".to_string(),
            ..WidgetConfig::default()
        },
        Arc::new(NoCamera::new()),
        Arc::new(UnsupportedLibrary::default()),
        Arc::new(MockUploader::accepting()),
        false,
    );
    assert_eq!(result.err().unwrap().category(), "config");
}
