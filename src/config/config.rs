//! # Widget Configuration
//!
//! This module provides the configuration structure and validation for the
//! live vote widget. It is the common interface between the CLI and the core
//! session.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Default | Description |
//! |-----------|------|---------|-------------|
//! | `api_base_url` | `String` | hosted collector | Base URL, `/upload` is appended |
//! | `votes_max` | `u32` | 20 | Votes available per session |
//! | `capture_mode` | `CaptureMode` | `Surface` | Camera frame or whole surface |
//! | `trigger` | `TriggerMode` | `Tap` | How the user casts a vote |
//! | `theme` | `Theme` | `Classic` | Presentation theme name |
//!
//! ## Base URL Resolution
//!
//! The only runtime override is the `VOTE_API_BASE_URL` environment variable.
//! When it is unset or blank the built-in default is used.
//!
//! ## Examples
//!
//! ```rust
//! use live_vote::config::WidgetConfig;
//!
//! let config = WidgetConfig::default();
//! assert_eq!(config.votes_max, 20);
//! assert!(config.validate().is_ok());
//! assert!(config.upload_url().ends_with("/api/upload"));
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::capture::surface::RenderOptions;

/// Collector used when no override is configured.
pub const DEFAULT_API_BASE_URL: &str = "https://pv-be-q7m9.onrender.com/api";

/// Environment variable that overrides [`DEFAULT_API_BASE_URL`].
pub const API_BASE_URL_ENV: &str = "VOTE_API_BASE_URL";

/// Where the on-demand surface capture library is fetched from.
pub const DEFAULT_LIBRARY_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/html2canvas/1.4.1/html2canvas.min.js";

/// Votes granted to a fresh session.
pub const DEFAULT_VOTES_MAX: u32 = 20;

/// Which capture strategy the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// Current camera frame at native resolution.
    Frame,
    /// The whole visible surface through the capture library.
    #[default]
    Surface,
}

impl FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "frame" | "camera" => Ok(Self::Frame),
            "surface" | "screen" => Ok(Self::Surface),
            _ => Err(format!("Invalid capture mode: {s}. Use: frame, surface")),
        }
    }
}

/// Gesture that casts a vote.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TriggerMode {
    /// A tap on the vote button.
    #[default]
    Tap,
    /// An upward swipe covering at least `min_distance` logical pixels.
    Swipe { min_distance: f32 },
}

impl FromStr for TriggerMode {
    type Err = String;

    /// Parses `tap`, `swipe` (120px) or `swipe:<distance>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        match lower.split_once(':') {
            None if lower == "tap" => Ok(Self::Tap),
            None if lower == "swipe" => Ok(Self::Swipe {
                min_distance: 120.0,
            }),
            Some(("swipe", distance)) => {
                let min_distance: f32 = distance
                    .parse()
                    .map_err(|_| format!("Invalid swipe distance: {distance}"))?;
                Ok(Self::Swipe { min_distance })
            }
            _ => Err(format!(
                "Invalid trigger: {s}. Use: tap, swipe, swipe:<distance>"
            )),
        }
    }
}

/// Presentation theme. The core passes it through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Classic,
    Neon,
    Stadium,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Classic => "classic",
            Self::Neon => "neon",
            Self::Stadium => "stadium",
        };
        f.write_str(name)
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "classic" => Ok(Self::Classic),
            "neon" => Ok(Self::Neon),
            "stadium" => Ok(Self::Stadium),
            _ => Err(format!("Invalid theme: {s}. Use: classic, neon, stadium")),
        }
    }
}

/// Fixed visual delays driving the automatic transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// `shooting -> idle` after a confirmed vote.
    pub settle_delay: Duration,
    /// How long the "vote confirmed" indicator stays up.
    pub confirm_display: Duration,
    /// Practice vote animation window.
    pub practice_animation: Duration,
    /// Practice success flash after the animation.
    pub practice_flash: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(1200),
            confirm_display: Duration::from_millis(2500),
            practice_animation: Duration::from_millis(1500),
            practice_flash: Duration::from_millis(800),
        }
    }
}

/// Configuration structure for the live vote widget.
///
/// Every variant of the widget (endpoint, trigger gesture, theme) is a value
/// here rather than a separate code path.
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    /// Collector base URL, without the `/upload` suffix.
    pub api_base_url: String,

    /// Votes available to the session. Must be greater than 0.
    pub votes_max: u32,

    /// Capture strategy used by the pipeline.
    pub capture_mode: CaptureMode,

    /// Gesture that casts a vote.
    pub trigger: TriggerMode,

    /// Presentation theme.
    pub theme: Theme,

    /// Animation and settle delays.
    pub timings: Timings,

    /// Where the surface capture library is loaded from. Reported as the
    /// `url` of a failed library load.
    pub library_url: String,

    /// Options handed to the surface capture library.
    pub render: RenderOptions,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            votes_max: DEFAULT_VOTES_MAX,
            capture_mode: CaptureMode::default(),
            trigger: TriggerMode::default(),
            theme: Theme::default(),
            timings: Timings::default(),
            library_url: DEFAULT_LIBRARY_URL.to_string(),
            render: RenderOptions::default(),
        }
    }
}

impl WidgetConfig {
    /// Defaults with the base URL resolved from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with the base URL resolved through `lookup`.
    ///
    /// A missing or blank override falls back to [`DEFAULT_API_BASE_URL`].
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup(API_BASE_URL_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        Self {
            api_base_url,
            ..Self::default()
        }
    }

    /// Full upload endpoint: `{base}/upload`.
    pub fn upload_url(&self) -> String {
        format!("{}/upload", self.api_base_url.trim_end_matches('/'))
    }

    /// Validates the configuration parameters.
    ///
    /// # Validation Rules
    ///
    /// - `api_base_url` must start with `http://` or `https://`
    /// - `votes_max` must be greater than 0
    /// - a swipe trigger needs a positive distance
    /// - the render scale must be positive
    pub fn validate(&self) -> Result<(), String> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(format!(
                "API base URL must be http(s): {}",
                self.api_base_url
            ));
        }
        if self.votes_max == 0 {
            return Err("Vote budget must be greater than 0".to_string());
        }
        if let TriggerMode::Swipe { min_distance } = self.trigger {
            if !(min_distance > 0.0) {
                return Err("Swipe distance must be greater than 0".to_string());
            }
        }
        if !(self.render.scale > 0.0) {
            return Err("Render scale must be greater than 0".to_string());
        }
        Ok(())
    }
}
