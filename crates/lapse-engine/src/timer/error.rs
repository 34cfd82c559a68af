use std::fmt;

/// Construction-time failure of a [`TimerEngine`](super::TimerEngine).
///
/// Running engines never fail; every error here is raised by the builder or
/// by an fps setter before any state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerError {
    /// No monotonic clock was supplied.
    MissingClock,
    /// No frame scheduler was supplied.
    MissingScheduler,
    /// A fixed update rate that is not a number.
    InvalidFps(f64),
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingClock => write!(f, "timer configuration error: no monotonic clock supplied"),
            Self::MissingScheduler => {
                write!(f, "timer configuration error: no frame scheduler supplied")
            }
            Self::InvalidFps(fps) => write!(f, "timer configuration error: invalid fps {fps}"),
        }
    }
}

impl std::error::Error for TimerError {}
