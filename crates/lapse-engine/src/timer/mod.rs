//! Elapsed-time tracker.
//!
//! `TimerEngine` is a two-state machine (stopped / running) that keeps a
//! frame callback registered while running and publishes a millisecond
//! elapsed value, throttled to the configured update rate.

mod config;
mod engine;
mod error;
mod state;

pub use config::{throttle_interval_ms, FpsSource, TimerConfig};
pub use engine::{ObserverId, TimerEngine, TimerEngineBuilder};
pub use error::TimerError;
pub use state::TimerSnapshot;
