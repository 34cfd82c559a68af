use std::cell::Cell;
use std::rc::Rc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use lapse_engine::logging::{init_logging, LoggingConfig};
use lapse_engine::time::{FrameQueue, SystemClock};
use lapse_engine::timer::{TimerConfig, TimerEngine, TimerSnapshot};

/// Stopwatch shown in the window title.
///
/// The winit loop is the display-refresh scheduler: every redraw drains the
/// `FrameQueue`, and a redraw is requested whenever callbacks are pending.
struct Stopwatch {
    timer: TimerEngine,
    frames: Rc<FrameQueue>,
    latest: Rc<Cell<TimerSnapshot>>,
    shown: Option<TimerSnapshot>,
    window: Option<Window>,
}

impl Stopwatch {
    fn new(fps: f64) -> Result<Self> {
        let frames = Rc::new(FrameQueue::new());
        let timer = TimerEngine::new(
            Rc::new(SystemClock::new()),
            Rc::clone(&frames),
            TimerConfig::new().fps(fps),
        )
        .context("failed to build timer")?;

        let latest = Rc::new(Cell::new(timer.snapshot()));
        let sink = Rc::clone(&latest);
        timer.subscribe(move |snapshot| sink.set(snapshot));

        Ok(Self {
            timer,
            frames,
            latest,
            shown: None,
            window: None,
        })
    }

    fn on_key(&mut self, key: KeyCode, event_loop: &ActiveEventLoop) {
        match key {
            KeyCode::Space => {
                if self.timer.is_running() {
                    self.timer.stop();
                } else {
                    self.timer.start();
                }
            }
            KeyCode::KeyR => self.timer.reset(),
            KeyCode::Escape => {
                self.timer.stop();
                event_loop.exit();
            }
            _ => {}
        }
    }

    fn update_title(&mut self) {
        let snapshot = self.latest.get();
        if self.shown == Some(snapshot) {
            return;
        }
        if let Some(window) = &self.window {
            let marker = if snapshot.running { ">" } else { "||" };
            window.set_title(&format!("{marker} {}", format_elapsed(snapshot.elapsed_ms)));
        }
        self.shown = Some(snapshot);
    }
}

impl ApplicationHandler for Stopwatch {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(format_elapsed(0.0))
            .with_inner_size(LogicalSize::new(360.0, 80.0));

        match event_loop.create_window(attrs) {
            Ok(window) => {
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                log::error!("failed to create window: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Keep presenting frames only while the timer has a callback queued.
        if self.frames.has_pending() {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.timer.stop();
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.on_key(code, event_loop);
                self.update_title();
            }

            WindowEvent::RedrawRequested => {
                self.frames.run_frame();
                self.update_title();
                if let Some(window) = &self.window {
                    window.pre_present_notify();
                }
            }

            _ => {}
        }
    }
}

/// `mm:ss.mmm`, minutes unbounded.
fn format_elapsed(ms: f64) -> String {
    let total = ms.max(0.0) as u64;
    let minutes = total / 60_000;
    let seconds = (total / 1000) % 60;
    let millis = total % 1000;
    format!("{minutes:02}:{seconds:02}.{millis:03}")
}

fn parse_fps(arg: Option<String>) -> Result<f64> {
    match arg {
        None => Ok(0.0),
        Some(raw) => raw
            .parse::<f64>()
            .with_context(|| format!("invalid fps argument {raw:?}")),
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let fps = parse_fps(std::env::args().nth(1))?;
    log::info!("lapse studio: space = start/stop, r = reset, esc = quit (fps {fps})");

    let mut app = Stopwatch::new(fps)?;
    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    event_loop
        .run_app(&mut app)
        .context("winit event loop terminated with error")?;

    log::info!("final time {}", format_elapsed(app.timer.elapsed_ms()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_seconds_millis() {
        assert_eq!(format_elapsed(0.0), "00:00.000");
        assert_eq!(format_elapsed(61_234.9), "01:01.234");
        assert_eq!(format_elapsed(3_600_000.0), "60:00.000");
    }

    #[test]
    fn fps_argument() {
        assert_eq!(parse_fps(None).unwrap(), 0.0);
        assert_eq!(parse_fps(Some("30".into())).unwrap(), 30.0);
        assert!(parse_fps(Some("fast".into())).is_err());
    }
}
