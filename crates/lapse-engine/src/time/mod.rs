//! Time subsystem.
//!
//! Provides the two environment primitives the timer depends on, decoupled
//! from any particular runtime:
//! - a `MonotonicClock` sampled in milliseconds
//! - a `FrameScheduler` that runs one-shot callbacks once per rendered frame
//!
//! `FrameQueue` is the stock scheduler: the host loop calls `run_frame()` once
//! per presented frame.

mod clock;
mod frame;

pub use clock::{ManualClock, MonotonicClock, SystemClock};
pub use frame::{FrameCallback, FrameHandle, FrameQueue, FrameScheduler};
