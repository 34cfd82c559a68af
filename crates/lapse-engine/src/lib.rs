//! Lapse engine crate.
//!
//! This crate owns the elapsed-time tracker and the clock/frame-scheduling
//! seams it runs on. Hosts (windowing loops, test harnesses) supply a
//! [`time::MonotonicClock`] and a [`time::FrameScheduler`]; the
//! [`timer::TimerEngine`] does the rest.

pub mod time;
pub mod timer;

pub mod logging;
