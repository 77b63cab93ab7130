//! Viewport state: scroll position and visible size.

/// Viewport state - represents the visible area of the grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Horizontal scroll offset of the scrollable columns
    pub scroll_x: f32,
    /// Vertical scroll offset in content coordinates
    pub scroll_y: f32,
    /// Viewport width in pixels
    pub width: f32,
    /// Viewport height in pixels
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            scroll_x: 0.0,
            scroll_y: 0.0,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Resize the viewport
    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    /// Largest scroll offsets for a content size; 0 when the content fits.
    pub fn max_scroll(&self, content_width: f32, content_height: f32) -> (f32, f32) {
        (
            (content_width - self.width).max(0.0),
            (content_height - self.height).max(0.0),
        )
    }

    /// Clamp scroll position to `[0, max]` on both axes.
    ///
    /// Returns true when either offset changed.
    pub fn clamp_scroll(&mut self, content_width: f32, content_height: f32) -> bool {
        let (max_x, max_y) = self.max_scroll(content_width, content_height);
        let x = self.scroll_x.clamp(0.0, max_x);
        let y = self.scroll_y.clamp(0.0, max_y);
        let changed =
            (x - self.scroll_x).abs() > f32::EPSILON || (y - self.scroll_y).abs() > f32::EPSILON;
        self.scroll_x = x;
        self.scroll_y = y;
        changed
    }

    /// Content-space vertical range currently on screen.
    pub fn visible_y(&self) -> (f32, f32) {
        (self.scroll_y, self.scroll_y + self.height)
    }

    /// Content-space horizontal range of the scrollable columns on screen.
    ///
    /// Frozen columns occupy the screen up to `frozen_width`, so scrollable
    /// columns are visible from `frozen_width + scroll_x` onwards.
    pub fn visible_x(&self, frozen_width: f32) -> (f32, f32) {
        (frozen_width + self.scroll_x, self.scroll_x + self.width)
    }

    /// Convert content coordinates to screen coordinates.
    ///
    /// Frozen columns render at their layout position regardless of
    /// horizontal scroll.
    pub fn to_screen(&self, x: f32, y: f32, frozen: bool) -> (f32, f32) {
        let screen_x = if frozen { x } else { x - self.scroll_x };
        (screen_x, y - self.scroll_y)
    }

    /// Convert screen coordinates to content coordinates.
    pub fn to_content(&self, screen_x: f32, screen_y: f32, frozen_width: f32) -> (f32, f32) {
        let x = if screen_x < frozen_width {
            screen_x
        } else {
            screen_x + self.scroll_x
        };
        (x, screen_y + self.scroll_y)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_scroll() {
        let mut viewport = Viewport::new(400.0, 300.0);
        viewport.scroll_y = 5_000.0;
        viewport.scroll_x = -20.0;
        assert!(viewport.clamp_scroll(1_000.0, 2_000.0));
        assert_eq!(viewport.scroll_x, 0.0);
        assert_eq!(viewport.scroll_y, 1_700.0);
        assert!(!viewport.clamp_scroll(1_000.0, 2_000.0));
    }

    #[test]
    fn test_content_fits_pins_to_zero() {
        let mut viewport = Viewport::new(400.0, 300.0);
        viewport.scroll_y = 50.0;
        viewport.clamp_scroll(100.0, 100.0);
        assert_eq!(viewport.scroll_y, 0.0);
        assert_eq!(viewport.max_scroll(100.0, 100.0), (0.0, 0.0));
    }

    #[test]
    fn test_frozen_coordinates() {
        let mut viewport = Viewport::new(400.0, 300.0);
        viewport.scroll_x = 100.0;
        viewport.scroll_y = 40.0;
        assert_eq!(viewport.to_screen(50.0, 40.0, true), (50.0, 0.0));
        assert_eq!(viewport.to_screen(250.0, 40.0, false), (150.0, 0.0));
        assert_eq!(viewport.to_content(50.0, 0.0, 120.0), (50.0, 40.0));
        assert_eq!(viewport.to_content(150.0, 0.0, 120.0), (250.0, 40.0));
        assert_eq!(viewport.visible_x(120.0), (220.0, 500.0));
    }
}
