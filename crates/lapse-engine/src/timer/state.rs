use std::time::Duration;

use crate::time::FrameHandle;

/// Published view of a timer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TimerSnapshot {
    /// Elapsed running time since the last reset, in milliseconds.
    pub elapsed_ms: f64,
    pub running: bool,
}

impl TimerSnapshot {
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed_ms / 1000.0)
    }
}

/// Running flag plus the frame registration that keeps the run alive.
///
/// A handle exists iff the timer is running.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum TimerPhase {
    Stopped,
    Running { frame: FrameHandle, run: u64 },
}

/// Mutable timer state. All instants are clock readings in milliseconds.
#[derive(Debug, Clone)]
pub(crate) struct TimerState {
    pub elapsed_ms: f64,
    pub phase: TimerPhase,
    /// Reading at which `elapsed == accumulated_ms` for the current run.
    pub begin_ms: f64,
    pub last_sample_ms: f64,
    /// Run time frozen by the last stop, consumed by the next start.
    pub accumulated_ms: f64,
    runs: u64,
}

impl TimerState {
    pub fn new() -> Self {
        Self {
            elapsed_ms: 0.0,
            phase: TimerPhase::Stopped,
            begin_ms: 0.0,
            last_sample_ms: 0.0,
            accumulated_ms: 0.0,
            runs: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, TimerPhase::Running { .. })
    }

    /// Id of the run in progress, if any.
    pub fn active_run(&self) -> Option<u64> {
        match self.phase {
            TimerPhase::Running { run, .. } => Some(run),
            TimerPhase::Stopped => None,
        }
    }

    /// Reserves the id for the next run.
    pub fn next_run(&mut self) -> u64 {
        self.runs = self.runs.wrapping_add(1);
        self.runs
    }

    /// Stopped -> Running. Resumes from the accumulated time and refreshes.
    pub fn begin_run(&mut self, now: f64, frame: FrameHandle, run: u64) {
        self.begin_ms = now - self.accumulated_ms;
        self.phase = TimerPhase::Running { frame, run };
        self.refresh(now);
    }

    /// Running -> Stopped. Returns the frame registration to cancel.
    pub fn end_run(&mut self, now: f64) -> Option<FrameHandle> {
        let TimerPhase::Running { frame, .. } = self.phase else {
            return None;
        };
        self.accumulated_ms = now - self.begin_ms;
        self.phase = TimerPhase::Stopped;
        self.refresh(now);
        Some(frame)
    }

    /// Records the registration made for the next frame of `run`.
    pub fn rearm(&mut self, frame: FrameHandle, run: u64) {
        if self.active_run() == Some(run) {
            self.phase = TimerPhase::Running { frame, run };
        }
    }

    /// Moves the time origin to `now` and zeroes everything accumulated.
    pub fn rebase(&mut self, now: f64) {
        self.begin_ms = now;
        self.last_sample_ms = now;
        self.accumulated_ms = 0.0;
        self.elapsed_ms = 0.0;
    }

    /// Unconditional refresh.
    pub fn refresh(&mut self, now: f64) {
        self.elapsed_ms = (now - self.begin_ms).max(0.0);
        self.last_sample_ms = now;
    }

    /// Throttled refresh. Returns whether the published value was updated.
    pub fn sample(&mut self, now: f64, interval_ms: f64) -> bool {
        if now - self.last_sample_ms > interval_ms {
            self.refresh(now);
            true
        } else {
            false
        }
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            elapsed_ms: self.elapsed_ms,
            running: self.is_running(),
        }
    }
}
