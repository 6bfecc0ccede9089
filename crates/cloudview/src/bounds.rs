//! Axis-aligned bounds and the check applied to the box a payload claims.

use crate::data::PointSet;
use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Claimed boxes with a shorter diagonal than this are recomputed from the points.
pub const MIN_TRUSTED_DIAGONAL: f32 = 0.1;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centred on `center` with full extents `size`.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Tight box around every position in `points`; `None` when empty.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let (min, max) = points
            .par_iter()
            .map(|p| (*p, *p))
            .reduce(
                || (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
                |(a_min, a_max), (b_min, b_max)| (a_min.min(b_min), a_max.max(b_max)),
            );

        Some(Self { min, max })
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Length of the min-to-max diagonal.
    #[inline]
    pub fn diagonal(&self) -> f32 {
        self.size().length()
    }

    /// Largest extent along any axis.
    #[inline]
    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// True when the box has zero extent on every axis.
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    fn is_trustworthy(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.min.cmple(self.max).all()
            && self.diagonal() >= MIN_TRUSTED_DIAGONAL
    }
}

/// Outcome of [`validate_bounds`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundsCheck {
    pub bounds: BoundingBox,
    /// The claimed box was replaced by a scan of the point set.
    pub recomputed: bool,
}

/// Accepts `claimed` when it looks sane, otherwise scans the full point set.
///
/// The scan always covers every loaded point, never a decimated subset, so the
/// result does not depend on the display budget. Returns `None` only when the
/// box is untrustworthy and `points` is empty.
pub fn validate_bounds(claimed: Option<BoundingBox>, points: &PointSet) -> Option<BoundsCheck> {
    if let Some(bounds) = claimed.filter(BoundingBox::is_trustworthy) {
        return Some(BoundsCheck {
            bounds,
            recomputed: false,
        });
    }

    let bounds = BoundingBox::from_points(points.positions())?;
    log::debug!(
        "claimed bounds {:?} untrusted; recomputed min({:.2},{:.2},{:.2}) max({:.2},{:.2},{:.2}) from {} points",
        claimed,
        bounds.min.x, bounds.min.y, bounds.min.z,
        bounds.max.x, bounds.max.y, bounds.max.z,
        points.len()
    );

    Some(BoundsCheck {
        bounds,
        recomputed: true,
    })
}
