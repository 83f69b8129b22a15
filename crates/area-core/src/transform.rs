//! Screen ↔ logical coordinate mapping for a panned and zoomed stage.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Pan offset and zoom of the rendering surface.
///
/// Owned by the view; the engine reads a snapshot of it per event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageTransform {
    pub pan_x: f64,
    pub pan_y: f64,
    /// Zoom factor (1.0 = unscaled, >1.0 = zoomed in).
    pub scale: f64,
}

impl Default for StageTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl StageTransform {
    pub const IDENTITY: StageTransform = StageTransform {
        pan_x: 0.0,
        pan_y: 0.0,
        scale: 1.0,
    };

    pub const fn new(pan_x: f64, pan_y: f64, scale: f64) -> Self {
        Self {
            pan_x,
            pan_y,
            scale,
        }
    }

    /// A stage whose scale cannot be inverted.
    pub fn is_degenerate(&self) -> bool {
        !self.scale.is_finite()
            || self.scale <= 0.0
            || !self.pan_x.is_finite()
            || !self.pan_y.is_finite()
    }

    /// Convert a screen-space length (e.g. a handle radius in pixels) to
    /// logical units at the current zoom.
    pub fn screen_distance_to_logical(&self, pixels: f64) -> f64 {
        if self.is_degenerate() {
            return pixels;
        }
        pixels / self.scale
    }
}

/// Map a pointer position on the surface to logical map coordinates.
///
/// Returns [`Point::ORIGIN`] when there is no pointer position or the stage
/// cannot be inverted. That origin is a placeholder, not a click; callers
/// that can tell the pointer was missing should drop the event instead.
pub fn screen_to_logical(pointer: Option<Point>, stage: &StageTransform) -> Point {
    let Some(screen) = pointer else {
        tracing::debug!("[transform] no pointer position, falling back to origin");
        return Point::ORIGIN;
    };

    if stage.is_degenerate() {
        tracing::warn!(
            scale = stage.scale,
            "[transform] degenerate stage, falling back to origin"
        );
        return Point::ORIGIN;
    }

    Point::new(
        (screen.x - stage.pan_x) / stage.scale,
        (screen.y - stage.pan_y) / stage.scale,
    )
}

/// Forward projection: where a logical point is drawn on the surface.
pub fn logical_to_screen(point: Point, stage: &StageTransform) -> Point {
    Point::new(
        point.x * stage.scale + stage.pan_x,
        point.y * stage.scale + stage.pan_y,
    )
}
