use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;

/// One-shot callback run before the next frame is presented.
pub type FrameCallback = Box<dyn FnOnce()>;

/// Identifies a pending frame registration.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    /// Wraps a host-defined identifier (e.g. a platform request id).
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Per-frame scheduling primitive.
///
/// Contract:
/// - `request_frame` never runs `callback` synchronously; it runs at most once,
///   on a later frame
/// - `cancel_frame` with an unknown or already-fired handle does nothing
pub trait FrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle;

    fn cancel_frame(&self, handle: FrameHandle);
}

/// Queue-backed scheduler driven by the host loop.
///
/// Call `run_frame()` once per presented frame. Callbacks registered while a
/// frame runs are deferred to the next frame, so a callback that re-registers
/// itself runs exactly once per frame.
#[derive(Default)]
pub struct FrameQueue {
    pending: RefCell<Vec<(FrameHandle, FrameCallback)>>,
    firing: RefCell<VecDeque<(FrameHandle, FrameCallback)>>,
    next_id: Cell<u64>,
    frame_index: Cell<u64>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registrations waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Number of frames run so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index.get()
    }

    /// Runs every callback registered before this call and returns how many ran.
    pub fn run_frame(&self) -> usize {
        {
            let mut firing = self.firing.borrow_mut();
            firing.extend(self.pending.borrow_mut().drain(..));
        }

        let mut ran = 0;
        loop {
            // Borrow is released before the callback runs; callbacks may
            // register or cancel frames.
            let next = self.firing.borrow_mut().pop_front();
            let Some((_, callback)) = next else {
                break;
            };
            callback();
            ran += 1;
        }

        self.frame_index.set(self.frame_index.get().wrapping_add(1));
        ran
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let id = self.next_id.get().wrapping_add(1);
        self.next_id.set(id);

        let handle = FrameHandle(id);
        self.pending.borrow_mut().push((handle, callback));
        handle
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.pending.borrow_mut().retain(|(h, _)| *h != handle);
        // A callback cancelled by an earlier callback of the same frame must not run.
        self.firing.borrow_mut().retain(|(h, _)| *h != handle);
    }
}

impl fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameQueue")
            .field("pending", &self.pending())
            .field("frame_index", &self.frame_index())
            .finish()
    }
}
