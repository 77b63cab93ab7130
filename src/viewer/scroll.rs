//! Scroll controller.
//!
//! Owns the viewport's scroll offsets and turns wheel, pointer, touch and
//! scrollbar input into clamped offset changes. Timestamps are milliseconds
//! from the host clock (`performance.now()` in the browser), so the state
//! machine runs identically in native tests.

use serde::Serialize;

use crate::config::Platform;
use crate::layout::Viewport;

/// Multiplicative velocity decay applied each momentum frame.
pub const MOMENTUM_DECAY: f32 = 0.95;
/// Momentum stops below this speed (px per frame).
pub const MOMENTUM_EPSILON: f32 = 0.1;
/// Release speed (px per frame) required to start momentum.
pub const MIN_RELEASE_VELOCITY: f32 = 1.0;
/// Scrollbar thumbs never shrink below this length.
pub const MIN_THUMB_SIZE: f32 = 20.0;
/// Width of the edge zone that triggers auto-scroll during a drag.
pub const AUTO_SCROLL_EDGE: f32 = 40.0;
/// Auto-scroll speed at the very edge (px per frame).
pub const AUTO_SCROLL_MAX_SPEED: f32 = 20.0;

/// Nominal frame duration used to turn px/ms into px/frame.
const FRAME_MS: f32 = 16.0;
/// Pointer samples older than this are ignored for release velocity.
const HISTORY_WINDOW_MS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScrollState {
    #[default]
    Idle,
    /// Following a pointer or finger.
    Dragging,
    /// Decaying after a touch release.
    Momentum,
    ThumbDragging(Axis),
}

/// Applied offset change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScrollChange {
    pub dx: f32,
    pub dy: f32,
    pub x: f32,
    pub y: f32,
}

/// Scrollbar thumb geometry along its track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thumb {
    pub offset: f32,
    pub size: f32,
}

#[derive(Debug, Clone, Copy)]
struct ThumbDrag {
    pointer: f32,
    scroll: f32,
}

#[derive(Debug, Clone)]
pub struct ScrollController {
    viewport: Viewport,
    content_width: f32,
    content_height: f32,
    platform: Platform,
    state: ScrollState,
    /// Momentum velocity in px per frame, in scroll direction.
    velocity: (f32, f32),
    /// Auto-scroll velocity in px per frame. Non-zero while the pointer of
    /// a drag-select or reorder sits in an edge zone, whatever the state.
    auto_velocity: (f32, f32),
    history: Vec<(f32, f32, f64)>,
    drag_start: Option<(f32, f32)>,
    drag_start_scroll: (f32, f32),
    thumb_drag: Option<ThumbDrag>,
}

impl ScrollController {
    pub fn new(viewport: Viewport, platform: Platform) -> Self {
        Self {
            viewport,
            content_width: 0.0,
            content_height: 0.0,
            platform,
            state: ScrollState::Idle,
            velocity: (0.0, 0.0),
            auto_velocity: (0.0, 0.0),
            history: Vec::with_capacity(10),
            drag_start: None,
            drag_start_scroll: (0.0, 0.0),
            thumb_drag: None,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    pub fn scroll_x(&self) -> f32 {
        self.viewport.scroll_x
    }

    pub fn scroll_y(&self) -> f32 {
        self.viewport.scroll_y
    }

    pub fn content_size(&self) -> (f32, f32) {
        (self.content_width, self.content_height)
    }

    pub fn max_scroll(&self) -> (f32, f32) {
        self.viewport
            .max_scroll(self.content_width, self.content_height)
    }

    pub fn is_auto_scrolling(&self) -> bool {
        self.auto_velocity != (0.0, 0.0)
    }

    /// Whether the controller needs another frame to make progress.
    pub fn is_animating(&self) -> bool {
        self.state == ScrollState::Momentum || self.is_auto_scrolling()
    }

    /// Update content extents after a layout pass, re-clamping the offsets.
    pub fn set_content_size(&mut self, width: f32, height: f32) -> Option<ScrollChange> {
        self.content_width = width.max(0.0);
        self.content_height = height.max(0.0);
        self.reclamp()
    }

    pub fn resize(&mut self, width: f32, height: f32) -> Option<ScrollChange> {
        self.viewport.resize(width, height);
        self.reclamp()
    }

    fn reclamp(&mut self) -> Option<ScrollChange> {
        let (x, y) = (self.viewport.scroll_x, self.viewport.scroll_y);
        self.viewport
            .clamp_scroll(self.content_width, self.content_height)
            .then(|| ScrollChange {
                dx: self.viewport.scroll_x - x,
                dy: self.viewport.scroll_y - y,
                x: self.viewport.scroll_x,
                y: self.viewport.scroll_y,
            })
    }

    /// Move to an absolute offset, clamped. Returns `None` when nothing
    /// moved.
    fn apply(&mut self, x: f32, y: f32) -> Option<ScrollChange> {
        let (max_x, max_y) = self.max_scroll();
        let new_x = x.clamp(0.0, max_x);
        let new_y = y.clamp(0.0, max_y);
        let dx = new_x - self.viewport.scroll_x;
        let dy = new_y - self.viewport.scroll_y;
        if dx.abs() > f32::EPSILON || dy.abs() > f32::EPSILON {
            self.viewport.scroll_x = new_x;
            self.viewport.scroll_y = new_y;
            Some(ScrollChange {
                dx,
                dy,
                x: new_x,
                y: new_y,
            })
        } else {
            None
        }
    }

    pub fn scroll_by(&mut self, dx: f32, dy: f32) -> Option<ScrollChange> {
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        self.apply(self.viewport.scroll_x + dx, self.viewport.scroll_y + dy)
    }

    /// Jump to an offset. Always ends any drag, momentum or auto-scroll.
    pub fn scroll_to(&mut self, x: f32, y: f32) -> Option<ScrollChange> {
        self.reset();
        self.apply(x, y)
    }

    /// Wheel input. With shift held, a purely vertical delta scrolls
    /// horizontally, except on macOS where the OS already swapped the axes.
    pub fn wheel(&mut self, delta_x: f32, delta_y: f32, shift: bool) -> Option<ScrollChange> {
        let (dx, dy) = if shift && self.platform != Platform::Mac && delta_x == 0.0 {
            (delta_y, 0.0)
        } else {
            (delta_x, delta_y)
        };
        if self.state == ScrollState::Momentum {
            self.reset();
        }
        self.scroll_by(dx, dy)
    }

    /// Pointer or finger down inside the content. Cancels momentum.
    pub fn pointer_down(&mut self, x: f32, y: f32, now: f64) {
        self.reset();
        self.state = ScrollState::Dragging;
        self.drag_start = Some((x, y));
        self.drag_start_scroll = (self.viewport.scroll_x, self.viewport.scroll_y);
        self.record(x, y, now);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32, now: f64) -> Option<ScrollChange> {
        match self.state {
            ScrollState::Dragging => {
                self.record(x, y, now);
                let (start_x, start_y) = self.drag_start?;
                self.apply(
                    self.drag_start_scroll.0 + (start_x - x),
                    self.drag_start_scroll.1 + (start_y - y),
                )
            }
            ScrollState::ThumbDragging(axis) => {
                let pointer = match axis {
                    Axis::Horizontal => x,
                    Axis::Vertical => y,
                };
                self.thumb_move(axis, pointer)
            }
            _ => None,
        }
    }

    /// Pointer released. A touch release with enough velocity starts
    /// momentum; everything else returns to idle.
    pub fn pointer_up(&mut self, now: f64, touch: bool) {
        let velocity = self.release_velocity(now);
        let was_dragging = self.state == ScrollState::Dragging;
        self.reset();
        if was_dragging
            && touch
            && (velocity.0.abs() >= MIN_RELEASE_VELOCITY || velocity.1.abs() >= MIN_RELEASE_VELOCITY)
        {
            self.velocity = velocity;
            self.state = ScrollState::Momentum;
        }
    }

    fn record(&mut self, x: f32, y: f32, now: f64) {
        self.history.retain(|(_, _, t)| now - *t <= HISTORY_WINDOW_MS);
        self.history.push((x, y, now));
    }

    #[allow(clippy::cast_possible_truncation)]
    fn release_velocity(&self, now: f64) -> (f32, f32) {
        let recent: Vec<&(f32, f32, f64)> = self
            .history
            .iter()
            .filter(|(_, _, t)| now - *t <= HISTORY_WINDOW_MS)
            .collect();
        let (Some(first), Some(last)) = (recent.first(), recent.last()) else {
            return (0.0, 0.0);
        };
        let dt = (last.2 - first.2) as f32;
        if dt < 1.0 {
            return (0.0, 0.0);
        }
        // Scroll moves opposite to the finger.
        (
            -(last.0 - first.0) / dt * FRAME_MS,
            -(last.1 - first.1) / dt * FRAME_MS,
        )
    }

    /// Advance one animation frame.
    pub fn tick(&mut self) -> Option<ScrollChange> {
        if self.is_auto_scrolling() {
            let (vx, vy) = self.auto_velocity;
            let change = self.scroll_by(vx, vy);
            if let (Some(change), ScrollState::Dragging) = (change, self.state) {
                // Keep the pointer anchored to the content it grabbed.
                self.drag_start_scroll.0 += change.dx;
                self.drag_start_scroll.1 += change.dy;
            }
            return change;
        }
        match self.state {
            ScrollState::Momentum => {
                let (vx, vy) = self.velocity;
                let change = self.scroll_by(vx, vy);
                self.velocity = (vx * MOMENTUM_DECAY, vy * MOMENTUM_DECAY);
                let slow = self.velocity.0.abs() < MOMENTUM_EPSILON
                    && self.velocity.1.abs() < MOMENTUM_EPSILON;
                if slow || change.is_none() {
                    self.reset();
                }
                change
            }
            _ => None,
        }
    }

    /// Feed the pointer position of an ongoing drag-select or reorder.
    /// Inside an edge zone the controller auto-scrolls each frame, faster
    /// the closer the pointer is to the edge.
    pub fn auto_scroll(&mut self, x: f32, y: f32) {
        let vx = edge_speed(x, self.viewport.width);
        let vy = edge_speed(y, self.viewport.height);
        self.auto_velocity = (vx, vy);
        if self.is_auto_scrolling() && self.state == ScrollState::Momentum {
            self.velocity = (0.0, 0.0);
            self.state = ScrollState::Idle;
        }
    }

    pub fn stop_auto_scroll(&mut self) {
        self.auto_velocity = (0.0, 0.0);
    }

    fn reset(&mut self) {
        self.state = ScrollState::Idle;
        self.velocity = (0.0, 0.0);
        self.auto_velocity = (0.0, 0.0);
        self.history.clear();
        self.drag_start = None;
        self.thumb_drag = None;
    }

    /// Thumb geometry along an axis, or `None` when the content fits.
    pub fn thumb(&self, axis: Axis) -> Option<Thumb> {
        let (track, content, scroll, max) = self.axis_metrics(axis);
        if max <= 0.0 || content <= 0.0 {
            return None;
        }
        let size = (track * track / content).clamp(MIN_THUMB_SIZE.min(track), track);
        let offset = (track - size) * (scroll / max);
        Some(Thumb { offset, size })
    }

    fn axis_metrics(&self, axis: Axis) -> (f32, f32, f32, f32) {
        let (max_x, max_y) = self.max_scroll();
        match axis {
            Axis::Horizontal => (
                self.viewport.width,
                self.content_width,
                self.viewport.scroll_x,
                max_x,
            ),
            Axis::Vertical => (
                self.viewport.height,
                self.content_height,
                self.viewport.scroll_y,
                max_y,
            ),
        }
    }

    /// Start dragging a scrollbar thumb at track position `pointer`.
    pub fn thumb_down(&mut self, axis: Axis, pointer: f32) {
        self.reset();
        let (_, _, scroll, _) = self.axis_metrics(axis);
        self.state = ScrollState::ThumbDragging(axis);
        self.thumb_drag = Some(ThumbDrag { pointer, scroll });
    }

    fn thumb_move(&mut self, axis: Axis, pointer: f32) -> Option<ScrollChange> {
        let drag = self.thumb_drag?;
        let thumb = self.thumb(axis)?;
        let (track, _, _, max) = self.axis_metrics(axis);
        let free = track - thumb.size;
        if free <= 0.0 {
            return None;
        }
        let target = drag.scroll + (pointer - drag.pointer) * max / free;
        match axis {
            Axis::Horizontal => self.apply(target, self.viewport.scroll_y),
            Axis::Vertical => self.apply(self.viewport.scroll_x, target),
        }
    }
}

/// Signed auto-scroll speed for a pointer at `pos` along an axis of length
/// `extent`.
fn edge_speed(pos: f32, extent: f32) -> f32 {
    if extent <= 2.0 * AUTO_SCROLL_EDGE {
        return 0.0;
    }
    if pos < AUTO_SCROLL_EDGE {
        let depth = (AUTO_SCROLL_EDGE - pos).min(AUTO_SCROLL_EDGE);
        -AUTO_SCROLL_MAX_SPEED * depth / AUTO_SCROLL_EDGE
    } else if pos > extent - AUTO_SCROLL_EDGE {
        let depth = (pos - (extent - AUTO_SCROLL_EDGE)).min(AUTO_SCROLL_EDGE);
        AUTO_SCROLL_MAX_SPEED * depth / AUTO_SCROLL_EDGE
    } else {
        0.0
    }
}
