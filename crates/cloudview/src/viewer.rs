//! The headless viewer: one loaded cloud, one camera, one in-flight layout.

use crate::bounds::{validate_bounds, BoundingBox};
use crate::budget::{adaptive_point_size, select_budget, DisplayBudget};
use crate::camera::{CameraPose, OrbitCamera};
use crate::config::ViewerConfig;
use crate::data::{PointSet, Rgb};
use crate::error::Result;
use crate::input::{InputFrame, ViewerKey};
use crate::layout::LayoutJob;
use crate::protocol::{CameraCommand, PointCloudPayload};
use crate::render::{Frame, RenderCommand};
use serde::Serialize;
use std::sync::Arc;

const POINT_SIZE_STEP_UP: f32 = 1.2;
const POINT_SIZE_STEP_DOWN: f32 = 0.8;
const MAX_POINT_SIZE_MULTIPLIER: f32 = 5.0;
const MIN_POINT_SIZE_MULTIPLIER: f32 = 0.1;

/// What a load decided.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSummary {
    pub generation: u64,
    pub name: String,
    pub total_points: usize,
    pub budget: DisplayBudget,
    /// Records the layout job will place.
    pub display_points: usize,
    /// Adaptive point size before the user multiplier.
    pub point_size: f32,
    pub bounds: Option<BoundingBox>,
    pub bounds_recomputed: bool,
    /// Triples discarded during ingestion.
    pub dropped: usize,
}

/// Snapshot of the current load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadStats {
    pub generation: u64,
    pub name: String,
    pub total_points: usize,
    pub budget: DisplayBudget,
    pub placed: usize,
    pub complete: bool,
    pub bounds: Option<BoundingBox>,
    pub point_scale: f32,
}

#[derive(Debug)]
struct Loaded {
    name: String,
    points: Arc<PointSet>,
    bounds: Option<BoundingBox>,
    budget: DisplayBudget,
    base_size: f32,
    placed: usize,
    complete: bool,
}

/// Drives the camera and the layout of the current cloud, one tick at a time.
#[derive(Debug)]
pub struct Viewer {
    config: ViewerConfig,
    camera: OrbitCamera,
    generation: u64,
    loaded: Option<Loaded>,
    job: Option<LayoutJob>,
    size_multiplier: f32,
    /// Replaces per-point and default colours once set.
    color_override: Option<Rgb>,
    visible: bool,
    pending: Vec<RenderCommand>,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Result<Self> {
        config.validate()?;
        let camera = OrbitCamera::new(config.camera.clone())?;
        Ok(Self {
            config,
            camera,
            generation: 0,
            loaded: None,
            job: None,
            size_multiplier: 1.0,
            color_override: None,
            visible: true,
            pending: Vec::new(),
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    /// Generation of the most recent load or clear.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_laying_out(&self) -> bool {
        self.job.is_some()
    }

    pub fn point_size_multiplier(&self) -> f32 {
        self.size_multiplier
    }

    pub fn point_color(&self) -> Option<Rgb> {
        self.color_override
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Replaces the current cloud.
    ///
    /// Any in-flight layout is abandoned. Bounds are validated against the full
    /// set, and the camera is framed on them right away.
    pub fn load(
        &mut self,
        points: PointSet,
        claimed: Option<BoundingBox>,
        name: impl Into<String>,
    ) -> LoadSummary {
        let name = name.into();
        let check = validate_bounds(claimed, &points);
        let bounds = check.map(|c| c.bounds);
        let max_dimension = bounds.map(|b| b.max_dimension()).unwrap_or(0.0);

        self.generation += 1;
        self.job = None;
        self.discard_pending();
        self.pending.push(RenderCommand::ClearAll);

        let budget = select_budget(points.len(), max_dimension);
        let base_size = adaptive_point_size(max_dimension);
        let batch_size = self.config.layout.batch_size_for(budget.max_display_points());
        let total_points = points.len();
        let points = Arc::new(points);

        let mut job = LayoutJob::new(
            Arc::clone(&points),
            budget,
            self.generation,
            batch_size,
            base_size * self.size_multiplier,
            self.config.layout.default_color,
        );
        if let Some(color) = self.color_override {
            job.set_color(color);
        }
        let display_points = job.target();
        self.job = Some(job);

        if let Some(bounds) = bounds {
            if self.config.layout.show_bounds {
                self.pending.push(RenderCommand::DrawBounds(bounds));
            }
            if bounds.is_degenerate() {
                self.camera.focus_on(bounds.center(), None);
            } else {
                self.camera.focus_on_bounds(&bounds);
            }
        }

        log::info!(
            "loaded '{}' (generation {}): {} points, displaying {} (stride {}, {:?}), point size {:.2}",
            name,
            self.generation,
            total_points,
            display_points,
            budget.stride(),
            budget.tier(),
            base_size
        );

        self.loaded = Some(Loaded {
            name: name.clone(),
            points,
            bounds,
            budget,
            base_size,
            placed: 0,
            complete: false,
        });

        LoadSummary {
            generation: self.generation,
            name,
            total_points,
            budget,
            display_points,
            point_size: base_size,
            bounds,
            bounds_recomputed: check.is_some_and(|c| c.recomputed),
            dropped: 0,
        }
    }

    /// Ingests a wire payload and loads it. On error the current load is kept.
    pub fn load_payload(&mut self, payload: PointCloudPayload) -> Result<LoadSummary> {
        let ingested = payload.into_point_set(self.config.layout.default_color)?;
        let mut summary = self.load(ingested.points, ingested.claimed, ingested.name);
        summary.dropped = ingested.dropped;
        Ok(summary)
    }

    /// Drops the current cloud and any in-flight layout.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.job = None;
        self.loaded = None;
        self.discard_pending();
        self.pending.push(RenderCommand::ClearAll);
        log::info!("point cloud cleared (generation {})", self.generation);
    }

    /// Applies a controller camera command and returns the pose the camera
    /// settles at, which smoothing reaches over the following ticks.
    pub fn apply_camera_command(&mut self, command: &CameraCommand) -> CameraPose {
        match *command {
            CameraCommand::Reset => self.camera.reset(),
            CameraCommand::Focus { point, distance } => self.camera.focus_on(point, distance),
            CameraCommand::FocusBounds => match self.loaded.as_ref().and_then(|l| l.bounds) {
                Some(bounds) if !bounds.is_degenerate() => self.camera.focus_on_bounds(&bounds),
                Some(bounds) => self.camera.focus_on(bounds.center(), None),
                None => log::warn!("focus_bounds without a loaded cloud"),
            },
            CameraCommand::SetRotation { yaw, pitch } => self.camera.set_rotation(yaw, pitch),
            CameraCommand::SetDistance { distance } => self.camera.set_distance(distance),
            CameraCommand::FocusNear => self.camera.focus_near(),
            CameraCommand::Overview => self.camera.overview(),
        }
        self.camera.target_pose()
    }

    /// Drops queued commands of the outgoing generation; visibility toggles
    /// are not tied to a generation and stay queued.
    fn discard_pending(&mut self) {
        self.pending.retain(|c| matches!(c, RenderCommand::SetVisible(_)));
    }

    /// Shows or hides the cloud without touching the layout.
    pub fn set_visible(&mut self, visible: bool) {
        if visible == self.visible {
            return;
        }
        self.visible = visible;
        self.pending.push(RenderCommand::SetVisible(visible));
        log::debug!("point cloud {}", if visible { "shown" } else { "hidden" });
    }

    /// Paints the current cloud and every later load with `color`.
    pub fn set_point_color(&mut self, color: Rgb) {
        self.color_override = Some(color);
        if let Some(job) = self.job.as_mut() {
            job.set_color(color);
        }
        if self.loaded.is_some() {
            self.pending.push(RenderCommand::Recolor {
                generation: self.generation,
                color,
            });
        }
        log::debug!("point colour set to {color:?}");
    }

    /// Advances one frame: point-size keys, camera, and at most one layout batch.
    pub fn tick(&mut self, input: &InputFrame, dt: f32) -> Frame {
        for key in &input.keys {
            let multiplier = match key {
                ViewerKey::PointSizeUp => {
                    (self.size_multiplier * POINT_SIZE_STEP_UP).min(MAX_POINT_SIZE_MULTIPLIER)
                }
                ViewerKey::PointSizeDown => {
                    (self.size_multiplier * POINT_SIZE_STEP_DOWN).max(MIN_POINT_SIZE_MULTIPLIER)
                }
                ViewerKey::PointSizeReset => 1.0,
                _ => continue,
            };
            self.set_point_size_multiplier(multiplier);
        }

        let pose = self.camera.update(input, dt);
        let mut commands = std::mem::take(&mut self.pending);

        if let Some(job) = self.job.as_mut() {
            if let Some(batch) = job.next() {
                if let Some(loaded) = self.loaded.as_mut() {
                    loaded.placed = batch.placed;
                }
                commands.push(RenderCommand::PlacePoints {
                    generation: batch.generation,
                    points: batch.records,
                });
            }
            if job.is_finished() {
                let placed = job.placed();
                let generation = job.generation();
                self.job = None;
                if let Some(loaded) = self.loaded.as_mut() {
                    loaded.complete = true;
                }
                log::debug!("layout of generation {generation} complete: {placed} points");
                commands.push(RenderCommand::LayoutComplete { generation, placed });
            }
        }

        Frame { pose, commands }
    }

    fn set_point_size_multiplier(&mut self, multiplier: f32) {
        if multiplier == self.size_multiplier {
            return;
        }
        self.size_multiplier = multiplier;
        let Some(loaded) = self.loaded.as_ref() else {
            return;
        };
        let scale = loaded.base_size * multiplier;
        if let Some(job) = self.job.as_mut() {
            job.set_scale(scale);
        }
        self.pending.push(RenderCommand::Rescale {
            generation: self.generation,
            scale,
        });
        log::debug!("point size multiplier {multiplier:.2} (scale {scale:.3})");
    }

    pub fn stats(&self) -> Option<LoadStats> {
        self.loaded.as_ref().map(|loaded| LoadStats {
            generation: self.generation,
            name: loaded.name.clone(),
            total_points: loaded.points.len(),
            budget: loaded.budget,
            placed: loaded.placed,
            complete: loaded.complete,
            bounds: loaded.bounds,
            point_scale: loaded.base_size * self.size_multiplier,
        })
    }
}
