//! Core data types for the viewer, from loaded point sets down to GPU instances.

use glam::Vec3;

/// Linear RGB colour, components in `[0, 1]`.
pub type Rgb = [f32; 3];

/// An ordered point cloud with optional per-point colours.
///
/// Built once per load and never mutated afterwards. Colours are either
/// absent or exactly parallel to `positions`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    positions: Vec<Vec3>,
    colors: Vec<Rgb>,
}

impl PointSet {
    /// Creates an uncoloured point set.
    pub fn new(positions: Vec<Vec3>) -> Self {
        Self {
            positions,
            colors: Vec::new(),
        }
    }

    /// Creates a coloured point set. Returns `None` when the lengths differ.
    pub fn with_colors(positions: Vec<Vec3>, colors: Vec<Rgb>) -> Option<Self> {
        if !colors.is_empty() && colors.len() != positions.len() {
            return None;
        }
        Some(Self { positions, colors })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[inline]
    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty()
    }

    /// Colour of point `index`, if the set carries colours.
    #[inline]
    pub fn color(&self, index: usize) -> Option<Rgb> {
        self.colors.get(index).copied()
    }
}

/// One point the presentation layer should draw.
///
/// Records are flat values; the host maps them to whatever drawable handle it
/// uses and discards every record whose `generation` is no longer current.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRecord {
    pub position: Vec3,
    /// Uniform scale of the point primitive in scene units.
    pub scale: f32,
    pub color: Rgb,
    /// Load generation that produced this record.
    pub generation: u64,
}

impl PointRecord {
    /// Packs the record into the per-instance layout used by instanced renderers.
    pub fn to_instance(&self) -> PointInstance {
        PointInstance {
            position: self.position.to_array(),
            scale: self.scale,
            color: [self.color[0], self.color[1], self.color[2], 1.0],
        }
    }
}

/// Per-instance data for a GPU vertex buffer (std430-friendly, 32 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointInstance {
    pub position: [f32; 3],
    pub scale: f32,
    pub color: [f32; 4],
}
