use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::time::{FrameHandle, FrameScheduler, MonotonicClock};

use super::config::{FpsSource, TimerConfig};
use super::error::TimerError;
use super::state::{TimerSnapshot, TimerState};

type Observer = RefCell<Box<dyn FnMut(TimerSnapshot)>>;

/// Identifies an observer registered with [`TimerEngine::subscribe`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ObserverId(u64);

/// Millisecond stopwatch driven by per-frame callbacks.
///
/// The engine samples its clock on every frame while running and refreshes
/// the published elapsed value at most once per throttle interval. `start`,
/// `stop` and `reset` always publish an up-to-date value immediately.
///
/// The engine is single-threaded: all calls, including frame callbacks, must
/// come from the host loop that owns the scheduler. Dropping the engine stops
/// it and cancels its pending frame.
///
/// # Example
/// ```rust
/// use std::rc::Rc;
/// use lapse_engine::time::{FrameQueue, ManualClock};
/// use lapse_engine::timer::{TimerConfig, TimerEngine};
///
/// let clock = Rc::new(ManualClock::new(0.0));
/// let frames = Rc::new(FrameQueue::new());
/// let timer = TimerEngine::new(clock.clone(), frames.clone(), TimerConfig::new()).unwrap();
///
/// timer.start();
/// clock.advance(16.0);
/// frames.run_frame();
/// assert_eq!(timer.elapsed_ms(), 16.0);
/// ```
pub struct TimerEngine {
    shared: Rc<Shared>,
}

struct Shared {
    clock: Rc<dyn MonotonicClock>,
    scheduler: Rc<dyn FrameScheduler>,
    fps: RefCell<FpsSource>,
    state: RefCell<TimerState>,

    observers: RefCell<Vec<(ObserverId, Rc<Observer>)>>,
    next_observer: Cell<u64>,
    notifying: Cell<bool>,
    republish: Cell<bool>,
    last_published: Cell<Option<TimerSnapshot>>,
    nan_warned: Cell<bool>,
}

/// Clears the notification flags when a round ends, including by unwinding
/// out of a panicking observer.
struct NotifyGuard<'a> {
    shared: &'a Shared,
}

impl Drop for NotifyGuard<'_> {
    fn drop(&mut self) {
        self.shared.republish.set(false);
        self.shared.notifying.set(false);
    }
}

/// Builder for [`TimerEngine`].
///
/// Both environment primitives are mandatory; `build` fails fast when one is
/// missing rather than producing a timer that never ticks.
#[derive(Default)]
pub struct TimerEngineBuilder {
    clock: Option<Rc<dyn MonotonicClock>>,
    scheduler: Option<Rc<dyn FrameScheduler>>,
    config: TimerConfig,
}

impl TimerEngineBuilder {
    pub fn clock<C>(mut self, clock: Rc<C>) -> Self
    where
        C: MonotonicClock + 'static,
    {
        let clock: Rc<dyn MonotonicClock> = clock;
        self.clock = Some(clock);
        self
    }

    pub fn scheduler<S>(mut self, scheduler: Rc<S>) -> Self
    where
        S: FrameScheduler + 'static,
    {
        let scheduler: Rc<dyn FrameScheduler> = scheduler;
        self.scheduler = Some(scheduler);
        self
    }

    pub fn config(mut self, config: TimerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<TimerEngine, TimerError> {
        let clock = self.clock.ok_or(TimerError::MissingClock)?;
        let scheduler = self.scheduler.ok_or(TimerError::MissingScheduler)?;
        self.config.validate()?;

        let TimerConfig { fps, immediate } = self.config;
        log::debug!("timer created (fps={fps:?}, immediate={immediate})");

        let engine = TimerEngine {
            shared: Rc::new(Shared {
                clock,
                scheduler,
                fps: RefCell::new(fps),
                state: RefCell::new(TimerState::new()),
                observers: RefCell::new(Vec::new()),
                next_observer: Cell::new(0),
                notifying: Cell::new(false),
                republish: Cell::new(false),
                last_published: Cell::new(None),
                nan_warned: Cell::new(false),
            }),
        };

        if immediate {
            engine.start();
        }

        Ok(engine)
    }
}

impl TimerEngine {
    pub fn builder() -> TimerEngineBuilder {
        TimerEngineBuilder::default()
    }

    /// Shorthand for the builder with both primitives supplied.
    pub fn new<C, S>(clock: Rc<C>, scheduler: Rc<S>, config: TimerConfig) -> Result<Self, TimerError>
    where
        C: MonotonicClock + 'static,
        S: FrameScheduler + 'static,
    {
        Self::builder()
            .clock(clock)
            .scheduler(scheduler)
            .config(config)
            .build()
    }

    /// Starts (or resumes) accumulating time. No-op while running.
    pub fn start(&self) {
        Shared::start(&self.shared);
    }

    /// Pauses accumulation, keeping the elapsed time. No-op while stopped.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Zeroes the elapsed time without changing the running state.
    ///
    /// A running timer keeps its frame registration and counts up from zero;
    /// the next throttled refresh follows the normal interval.
    pub fn reset(&self) {
        self.shared.reset();
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.shared.state.borrow().elapsed_ms
    }

    pub fn elapsed(&self) -> Duration {
        self.snapshot().elapsed()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.borrow().is_running()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.shared.state.borrow().snapshot()
    }

    /// Current desired update rate in Hz.
    pub fn fps(&self) -> f64 {
        self.shared.fps_source().current()
    }

    pub fn throttle_interval_ms(&self) -> f64 {
        self.shared.fps_source().interval_ms()
    }

    /// Changes the update rate; takes effect on the next frame.
    pub fn set_fps(&self, fps: f64) -> Result<(), TimerError> {
        if fps.is_nan() {
            return Err(TimerError::InvalidFps(fps));
        }
        *self.shared.fps.borrow_mut() = FpsSource::Fixed(fps);
        Ok(())
    }

    /// Replaces the update rate with a getter re-read on every frame.
    pub fn set_fps_source<F>(&self, getter: F)
    where
        F: Fn() -> f64 + 'static,
    {
        *self.shared.fps.borrow_mut() = FpsSource::Source(Rc::new(getter));
    }

    /// Registers `observer`, called after every published change.
    ///
    /// Observers may call back into the engine. Changes made from inside an
    /// observer are delivered after the current round completes.
    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: FnMut(TimerSnapshot) + 'static,
    {
        let id = ObserverId(self.shared.next_observer.get());
        self.shared.next_observer.set(id.0.wrapping_add(1));

        let observer: Box<dyn FnMut(TimerSnapshot)> = Box::new(observer);
        self.shared
            .observers
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(observer))));
        id
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.shared.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn fps_source(&self) -> FpsSource {
        // Cloned so a getter may touch the engine without a live borrow.
        self.fps.borrow().clone()
    }

    fn start(this: &Rc<Self>) {
        let run = {
            let mut state = this.state.borrow_mut();
            if state.is_running() {
                return;
            }
            state.next_run()
        };

        let frame = Self::request_tick(this, run);
        let now = this.clock.now_ms();
        let elapsed = {
            let mut state = this.state.borrow_mut();
            state.begin_run(now, frame, run);
            state.elapsed_ms
        };

        log::debug!("timer started (run {run}, resumed at {elapsed:.3} ms)");
        this.publish();
    }

    fn stop(&self) {
        let now = self.clock.now_ms();
        let Some(frame) = self.state.borrow_mut().end_run(now) else {
            return;
        };
        self.scheduler.cancel_frame(frame);

        log::debug!("timer stopped at {:.3} ms", self.state.borrow().elapsed_ms);
        self.publish();
    }

    fn reset(&self) {
        let now = self.clock.now_ms();
        self.state.borrow_mut().rebase(now);

        log::debug!("timer reset");
        self.publish();
    }

    fn request_tick(this: &Rc<Self>, run: u64) -> FrameHandle {
        let weak = Rc::downgrade(this);
        this.scheduler.request_frame(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                Shared::tick(&shared, run);
            }
        }))
    }

    fn tick(this: &Rc<Self>, run: u64) {
        if this.state.borrow().active_run() != Some(run) {
            // Callback outlived its run (cancellation was not delivered).
            log::trace!("dropping stale frame callback of run {run}");
            return;
        }

        let interval = this.interval_for_tick();
        let now = this.clock.now_ms();
        let refreshed = {
            let mut state = this.state.borrow_mut();
            // The getter may have stopped the timer.
            if state.active_run() != Some(run) {
                return;
            }
            state.sample(now, interval)
        };

        // Re-arm before notifying so an observer that stops the timer
        // cancels the fresh registration.
        let frame = Self::request_tick(this, run);
        this.state.borrow_mut().rearm(frame, run);

        if refreshed {
            log::trace!("timer refreshed at {now:.3} ms");
            this.publish();
        }
    }

    /// Throttle interval for the current frame. Warns once per run of NaN
    /// readings from a getter.
    fn interval_for_tick(&self) -> f64 {
        let fps = self.fps_source().current();
        if fps.is_nan() {
            if !self.nan_warned.replace(true) {
                log::warn!("fps source produced NaN; refreshing every frame");
            }
        } else {
            self.nan_warned.set(false);
        }
        super::config::throttle_interval_ms(fps)
    }

    fn publish(&self) {
        if self.notifying.replace(true) {
            self.republish.set(true);
            return;
        }
        let _guard = NotifyGuard { shared: self };

        loop {
            self.republish.set(false);

            let snapshot = self.state.borrow().snapshot();
            if self.last_published.replace(Some(snapshot)) != Some(snapshot) {
                let observers: Vec<Rc<Observer>> = self
                    .observers
                    .borrow()
                    .iter()
                    .map(|(_, observer)| Rc::clone(observer))
                    .collect();

                for observer in observers {
                    let mut callback = observer.borrow_mut();
                    (*callback)(snapshot);
                }
            }

            if !self.republish.get() {
                break;
            }
        }
    }
}
