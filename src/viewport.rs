//! Pan/zoom transform between screen pixels and world coordinates.

use crate::constants::{DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};
use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// Current view onto the drawing: `screen = world * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Horizontal pan offset in screen pixels
    pub pan_x: f64,
    /// Vertical pan offset in screen pixels
    pub pan_y: f64,
    /// Current zoom level (1.0 = one world unit per pixel)
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl Viewport {
    /// Creates a viewport with an explicit pan and zoom.
    pub fn new(pan_x: f64, pan_y: f64, zoom: f64) -> Self {
        Self {
            pan_x,
            pan_y,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// Converts screen coordinates to world coordinates accounting for zoom and pan.
    ///
    /// # Arguments
    ///
    /// * `screen` - Position in screen space (device pixels)
    ///
    /// # Returns
    ///
    /// The corresponding position in world space
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan_x) / self.zoom,
            (screen.y - self.pan_y) / self.zoom,
        )
    }

    /// Converts world coordinates to screen coordinates accounting for zoom and pan.
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(
            world.x * self.zoom + self.pan_x,
            world.y * self.zoom + self.pan_y,
        )
    }

    /// Converts a screen-pixel tolerance into world units at the current zoom.
    pub fn world_radius(&self, screen_pixels: f64) -> f64 {
        screen_pixels / self.zoom
    }

    /// Shifts the view by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Zooms one wheel notch in or out while keeping the world point under `screen` fixed.
    ///
    /// Zoom range is clamped between [`MIN_ZOOM`] and [`MAX_ZOOM`].
    pub fn zoom_at(&mut self, screen: Point, zoom_in: bool) {
        let world = self.screen_to_world(screen);
        let target = if zoom_in {
            self.zoom * ZOOM_STEP
        } else {
            self.zoom / ZOOM_STEP
        };
        let zoom = target.clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan_x = screen.x - world.x * zoom;
        self.pan_y = screen.y - world.y * zoom;
        self.zoom = zoom;
    }
}

/// Relation between the canvas bitmap and its on-screen display size.
///
/// Pointer positions arrive in display units and must be scaled into bitmap pixels
/// before any world-coordinate math.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasMetrics {
    pub bitmap_width: f64,
    pub bitmap_height: f64,
    pub display_width: f64,
    pub display_height: f64,
}

impl CanvasMetrics {
    /// Metrics for a canvas drawn at `pixels_per_point` device pixels per display unit.
    pub fn from_display(display_width: f64, display_height: f64, pixels_per_point: f64) -> Self {
        Self {
            bitmap_width: display_width * pixels_per_point,
            bitmap_height: display_height * pixels_per_point,
            display_width,
            display_height,
        }
    }

    /// Scales a display-relative position into bitmap pixels.
    pub fn to_bitmap(&self, display: Point) -> Point {
        let sx = if self.display_width > 0.0 {
            self.bitmap_width / self.display_width
        } else {
            1.0
        };
        let sy = if self.display_height > 0.0 {
            self.bitmap_height / self.display_height
        } else {
            1.0
        };
        Point::new(display.x * sx, display.y * sy)
    }

    /// Size of the bitmap in device pixels.
    pub fn bitmap_size(&self) -> (f64, f64) {
        (self.bitmap_width, self.bitmap_height)
    }
}
