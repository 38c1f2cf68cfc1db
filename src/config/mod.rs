//! # Configuration Module
//!
//! Widget configuration: endpoint, vote budget, capture strategy, trigger and
//! theme, and the fixed animation timings the phase machine uses.

pub mod config;

pub use config::{
    CaptureMode, DEFAULT_API_BASE_URL, DEFAULT_LIBRARY_URL, DEFAULT_VOTES_MAX,
    API_BASE_URL_ENV, Theme, Timings, TriggerMode, WidgetConfig,
};
