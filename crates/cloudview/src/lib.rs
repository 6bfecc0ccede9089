// src/lib.rs
//! Headless core of the point-cloud viewer driven by the Qt controller.
//!
//! The crate owns no window, GPU device or socket. A host loop feeds it
//! inbound payloads and per-frame input, and gets back a camera pose plus a
//! bounded batch of point-placement commands each tick:
//!
//! - [`budget`] decides how many points of a cloud are worth drawing.
//! - [`bounds`] validates (or recomputes) the bounding box sent with a cloud.
//! - [`camera`] is the orbit camera with adaptive zoom and damped framing.
//! - [`layout`] turns a decimated cloud into generation-tagged batches.
//! - [`viewer`] ties the above together behind `new` / `load` / `tick`.

pub mod bounds;
pub mod budget;
pub mod camera;
pub mod config;
pub mod data;
pub mod error;
pub mod input;
pub mod layout;
pub mod protocol;
pub mod render;
pub mod viewer;

pub use bounds::{validate_bounds, BoundingBox, BoundsCheck};
pub use budget::{adaptive_point_size, select_budget, BudgetTier, DisplayBudget};
pub use camera::{CameraPose, OrbitCamera};
pub use config::{CameraConfig, LayoutConfig, ViewerConfig};
pub use data::{PointInstance, PointRecord, PointSet, Rgb};
pub use error::{Error, Result};
pub use input::{DragMode, InputFrame, ViewerKey};
pub use layout::{LayoutBatch, LayoutJob};
pub use render::{Frame, PointArena, RenderCommand, Renderer};
pub use viewer::{LoadStats, LoadSummary, Viewer};
