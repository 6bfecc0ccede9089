//! Presentation contract between the viewer core and whatever draws the points.

use crate::bounds::BoundingBox;
use crate::camera::CameraPose;
use crate::data::{PointInstance, PointRecord, Rgb};

/// Instruction produced by a tick, replayed in order by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// Destroy every drawable from earlier loads.
    ClearAll,
    PlacePoints {
        generation: u64,
        points: Vec<PointRecord>,
    },
    /// New uniform scale for every point of `generation`.
    Rescale { generation: u64, scale: f32 },
    /// Repaint every point of `generation` with one colour.
    Recolor { generation: u64, color: Rgb },
    /// Show or hide the whole cloud.
    SetVisible(bool),
    DrawBounds(BoundingBox),
    /// The layout job of `generation` has emitted its last batch.
    LayoutComplete { generation: u64, placed: usize },
}

/// Output of one [`crate::Viewer::tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub pose: CameraPose,
    pub commands: Vec<RenderCommand>,
}

impl Frame {
    /// Generation/placement pair when this frame finished a layout job.
    pub fn completed_layout(&self) -> Option<(u64, usize)> {
        self.commands.iter().find_map(|c| match c {
            RenderCommand::LayoutComplete { generation, placed } => Some((*generation, *placed)),
            _ => None,
        })
    }

    /// Records placed by this frame.
    pub fn placed_points(&self) -> usize {
        self.commands
            .iter()
            .map(|c| match c {
                RenderCommand::PlacePoints { points, .. } => points.len(),
                _ => 0,
            })
            .sum()
    }

    /// Replays the commands into `renderer`, skipping anything tagged with a
    /// generation other than `active_generation`.
    pub fn apply<R: Renderer + ?Sized>(&self, renderer: &mut R, active_generation: u64) {
        for command in &self.commands {
            match command {
                RenderCommand::ClearAll => renderer.clear_all(),
                RenderCommand::PlacePoints { generation, points } => {
                    if *generation != active_generation {
                        log::trace!("skipping {} stale points of generation {generation}", points.len());
                        continue;
                    }
                    for point in points {
                        renderer.place_point(point);
                    }
                }
                RenderCommand::Rescale { generation, scale } => {
                    if *generation == active_generation {
                        renderer.set_point_scale(*generation, *scale);
                    }
                }
                RenderCommand::Recolor { generation, color } => {
                    if *generation == active_generation {
                        renderer.set_point_color(*generation, *color);
                    }
                }
                RenderCommand::SetVisible(visible) => renderer.set_visible(*visible),
                RenderCommand::DrawBounds(bounds) => renderer.draw_bounds(bounds),
                RenderCommand::LayoutComplete { .. } => {}
            }
        }
    }
}

/// Host-side drawing surface.
pub trait Renderer {
    fn place_point(&mut self, record: &PointRecord);
    fn clear_all(&mut self);
    fn draw_bounds(&mut self, _bounds: &BoundingBox) {}
    fn set_point_scale(&mut self, _generation: u64, _scale: f32) {}
    fn set_point_color(&mut self, _generation: u64, _color: Rgb) {}
    fn set_visible(&mut self, _visible: bool) {}
}

/// Opaque id of a placed point inside a [`PointArena`].
pub type PointHandle = u32;

/// Flat arena of placed points, the reference presentation layer.
///
/// Only one generation is live at a time: placing a record from a newer
/// generation destroys the older points, and records from older generations
/// are refused. The bounds box is only removed by `clear_all`.
#[derive(Debug, Default)]
pub struct PointArena {
    points: Vec<(PointHandle, PointRecord)>,
    next_handle: PointHandle,
    generation: u64,
    bounds: Option<BoundingBox>,
    hidden: bool,
}

impl PointArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    pub fn is_visible(&self) -> bool {
        !self.hidden
    }

    pub fn records(&self) -> impl Iterator<Item = &PointRecord> {
        self.points.iter().map(|(_, r)| r)
    }

    pub fn handles(&self) -> impl Iterator<Item = PointHandle> + '_ {
        self.points.iter().map(|(h, _)| *h)
    }

    /// Packed instance data ready for upload; empty while hidden.
    pub fn instances(&self) -> Vec<PointInstance> {
        if self.hidden {
            return Vec::new();
        }
        self.points.iter().map(|(_, r)| r.to_instance()).collect()
    }

    /// Raw bytes of [`Self::instances`].
    pub fn instance_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.instances()).to_vec()
    }
}

impl Renderer for PointArena {
    fn place_point(&mut self, record: &PointRecord) {
        if record.generation < self.generation {
            return;
        }
        if record.generation > self.generation {
            self.points.clear();
            self.generation = record.generation;
        }
        let handle = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1);
        self.points.push((handle, *record));
    }

    fn clear_all(&mut self) {
        log::debug!("arena cleared ({} points)", self.points.len());
        self.points.clear();
        self.bounds = None;
    }

    fn draw_bounds(&mut self, bounds: &BoundingBox) {
        self.bounds = Some(*bounds);
    }

    fn set_point_scale(&mut self, generation: u64, scale: f32) {
        for (_, record) in self.points.iter_mut().filter(|(_, r)| r.generation == generation) {
            record.scale = scale;
        }
    }

    fn set_point_color(&mut self, generation: u64, color: Rgb) {
        for (_, record) in self.points.iter_mut().filter(|(_, r)| r.generation == generation) {
            record.color = color;
        }
    }

    fn set_visible(&mut self, visible: bool) {
        self.hidden = !visible;
    }
}
