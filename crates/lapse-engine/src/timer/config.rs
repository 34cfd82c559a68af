use std::fmt;
use std::rc::Rc;

use super::error::TimerError;

/// Where the desired update rate comes from.
///
/// The rate is re-read on every throttle check, so a `Source` getter can track
/// a value owned elsewhere (a settings panel, a slider) without restarting the
/// timer.
#[derive(Clone)]
pub enum FpsSource {
    Fixed(f64),
    Source(Rc<dyn Fn() -> f64>),
}

impl FpsSource {
    /// Current update rate in Hz.
    pub fn current(&self) -> f64 {
        match self {
            Self::Fixed(fps) => *fps,
            Self::Source(getter) => getter(),
        }
    }

    /// Minimum spacing between refreshes, in milliseconds.
    pub fn interval_ms(&self) -> f64 {
        throttle_interval_ms(self.current())
    }
}

impl Default for FpsSource {
    fn default() -> Self {
        Self::Fixed(0.0)
    }
}

impl fmt::Debug for FpsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(fps) => f.debug_tuple("Fixed").field(fps).finish(),
            Self::Source(_) => f.write_str("Source(..)"),
        }
    }
}

/// Throttle interval for `fps`.
///
/// Rates `<= 0` (and NaN) mean "every frame" and map to 0.
pub fn throttle_interval_ms(fps: f64) -> f64 {
    if fps > 0.0 { 1000.0 / fps } else { 0.0 }
}

/// Timer configuration.
///
/// # Example
/// ```rust
/// use lapse_engine::timer::TimerConfig;
///
/// let config = TimerConfig::new().fps(30.0).immediate(true);
/// assert!(config.immediate);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TimerConfig {
    pub fps: FpsSource,

    /// Start as soon as the engine is built.
    pub immediate: bool,
}

impl TimerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fps(mut self, v: f64) -> Self { self.fps = FpsSource::Fixed(v); self }
    pub fn immediate(mut self, v: bool) -> Self { self.immediate = v; self }

    pub fn fps_source<F>(mut self, getter: F) -> Self
    where
        F: Fn() -> f64 + 'static,
    {
        self.fps = FpsSource::Source(Rc::new(getter));
        self
    }

    pub(crate) fn validate(&self) -> Result<(), TimerError> {
        match self.fps {
            FpsSource::Fixed(fps) if fps.is_nan() => Err(TimerError::InvalidFps(fps)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn non_positive_fps_means_every_frame() {
        assert_eq!(throttle_interval_ms(0.0), 0.0);
        assert_eq!(throttle_interval_ms(-30.0), 0.0);
        assert_eq!(throttle_interval_ms(f64::NAN), 0.0);
    }

    #[test]
    fn positive_fps_maps_to_period() {
        assert_eq!(throttle_interval_ms(10.0), 100.0);
        assert_eq!(throttle_interval_ms(4.0), 250.0);
    }

    #[test]
    fn source_is_reread() {
        let rate = Rc::new(Cell::new(10.0));
        let r = Rc::clone(&rate);
        let source = FpsSource::Source(Rc::new(move || r.get()));
        assert_eq!(source.interval_ms(), 100.0);
        rate.set(20.0);
        assert_eq!(source.interval_ms(), 50.0);
    }

    #[test]
    fn defaults() {
        let config = TimerConfig::default();
        assert_eq!(config.fps.current(), 0.0);
        assert!(!config.immediate);
    }

    #[test]
    fn nan_fixed_fps_is_rejected() {
        let config = TimerConfig::new().fps(f64::NAN);
        assert!(matches!(config.validate(), Err(TimerError::InvalidFps(_))));
        assert!(TimerConfig::new().fps(-1.0).validate().is_ok());
    }
}
