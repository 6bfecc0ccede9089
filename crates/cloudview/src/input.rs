//! Device-agnostic input delivered by the host once per frame.

use glam::Vec2;

/// What a drag gesture does this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragMode {
    #[default]
    None,
    /// Rotate around the pivot (primary button).
    Orbit,
    /// Slide the pivot in the view plane (modifier + primary, or middle button).
    Pan,
}

/// Discrete key/button events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerKey {
    ResetCamera,
    /// Pull in to a close-up of the last framed bounds.
    FocusNear,
    /// Back off to an overview of the last framed bounds.
    Overview,
    PointSizeUp,
    PointSizeDown,
    PointSizeReset,
}

/// Accumulated input for one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputFrame {
    /// Scroll wheel delta; positive zooms in.
    pub scroll: f32,
    /// Pointer movement while dragging, in the host's axis units.
    pub drag: Vec2,
    pub drag_mode: DragMode,
    pub keys: Vec<ViewerKey>,
}

impl InputFrame {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn scroll(delta: f32) -> Self {
        Self {
            scroll: delta,
            ..Self::default()
        }
    }

    pub fn orbit(dx: f32, dy: f32) -> Self {
        Self {
            drag: Vec2::new(dx, dy),
            drag_mode: DragMode::Orbit,
            ..Self::default()
        }
    }

    pub fn pan(dx: f32, dy: f32) -> Self {
        Self {
            drag: Vec2::new(dx, dy),
            drag_mode: DragMode::Pan,
            ..Self::default()
        }
    }

    pub fn key(key: ViewerKey) -> Self {
        Self {
            keys: vec![key],
            ..Self::default()
        }
    }

    pub fn pressed(&self, key: ViewerKey) -> bool {
        self.keys.contains(&key)
    }
}
