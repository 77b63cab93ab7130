//! Frame-aligned update scheduling.
//!
//! Inputs only mark the grid dirty; the actual layout/cull/recycle pass runs
//! at most once per animation frame. At most one frame request is
//! outstanding at a time, and re-scheduling cancels the unrun request first.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::closure::Closure;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsCast;

/// Source of frame callbacks (the browser's `requestAnimationFrame`, or a
/// test double).
pub trait FrameRequester {
    /// Ask for a callback on the next frame. Returns a handle for
    /// cancellation, or `None` if the request could not be made.
    fn request(&mut self) -> Option<i32>;

    fn cancel(&mut self, handle: i32);
}

pub struct FrameScheduler<R: FrameRequester> {
    requester: R,
    pending: Option<i32>,
    dirty: bool,
    frames: u64,
}

impl<R: FrameRequester> FrameScheduler<R> {
    pub fn new(requester: R) -> Self {
        Self {
            requester,
            pending: None,
            dirty: false,
            frames: 0,
        }
    }

    /// Mark the grid as needing an update and make sure a frame is coming.
    pub fn invalidate(&mut self) {
        self.dirty = true;
        if self.pending.is_none() {
            self.pending = self.requester.request();
        }
    }

    /// Replace any unrun request with a fresh one. Used by high-frequency
    /// input (pointer move, wheel) so only the latest input is processed.
    pub fn reschedule(&mut self) {
        self.dirty = true;
        if let Some(handle) = self.pending.take() {
            self.requester.cancel(handle);
        }
        self.pending = self.requester.request();
    }

    /// Request another frame without marking dirty (animations).
    pub fn keep_alive(&mut self) {
        if self.pending.is_none() {
            self.pending = self.requester.request();
        }
    }

    /// Called from the frame callback. Returns whether an update should run;
    /// the dirty flag is consumed either way.
    pub fn begin_frame(&mut self) -> bool {
        self.pending = None;
        self.frames += 1;
        std::mem::take(&mut self.dirty)
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.requester.cancel(handle);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn requester(&self) -> &R {
        &self.requester
    }
}

/// `requestAnimationFrame` requester. The closure is owned here so it lives
/// as long as the scheduler.
#[cfg(target_arch = "wasm32")]
pub struct AnimationFrames {
    callback: Closure<dyn FnMut(f64)>,
}

#[cfg(target_arch = "wasm32")]
impl AnimationFrames {
    pub fn new(callback: Closure<dyn FnMut(f64)>) -> Self {
        Self { callback }
    }
}

#[cfg(target_arch = "wasm32")]
impl FrameRequester for AnimationFrames {
    fn request(&mut self) -> Option<i32> {
        let window = web_sys::window()?;
        window
            .request_animation_frame(self.callback.as_ref().unchecked_ref())
            .ok()
    }

    fn cancel(&mut self, handle: i32) {
        if let Some(window) = web_sys::window() {
            let _ = window.cancel_animation_frame(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counting {
        next: i32,
        requested: usize,
        cancelled: Vec<i32>,
    }

    impl FrameRequester for Counting {
        fn request(&mut self) -> Option<i32> {
            self.next += 1;
            self.requested += 1;
            Some(self.next)
        }

        fn cancel(&mut self, handle: i32) {
            self.cancelled.push(handle);
        }
    }

    #[test]
    fn test_invalidate_coalesces_within_frame() {
        let mut scheduler = FrameScheduler::new(Counting::default());
        scheduler.invalidate();
        scheduler.invalidate();
        scheduler.invalidate();
        assert_eq!(scheduler.requester().requested, 1);
        assert!(scheduler.begin_frame());
        assert!(!scheduler.begin_frame());
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_reschedule_cancels_unrun_request() {
        let mut scheduler = FrameScheduler::new(Counting::default());
        scheduler.reschedule();
        scheduler.reschedule();
        assert_eq!(scheduler.requester().cancelled, vec![1]);
        assert_eq!(scheduler.requester().requested, 2);
        assert!(scheduler.is_pending());
    }

    #[test]
    fn test_keep_alive_does_not_dirty() {
        let mut scheduler = FrameScheduler::new(Counting::default());
        scheduler.keep_alive();
        assert!(scheduler.is_pending());
        assert!(!scheduler.begin_frame());
        assert_eq!(scheduler.frames(), 1);
    }
}
