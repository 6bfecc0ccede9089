use crate::bounds::BoundingBox;
use crate::data::types::{PointSet, Rgb};
use crate::error::{Error, Result};
use crate::protocol::PointCloudPayload;
use glam::Vec3;

/// A payload converted into a loadable point set.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    pub name: String,
    pub points: PointSet,
    /// Box sent with the payload, not yet validated.
    pub claimed: Option<BoundingBox>,
    /// Triples discarded for non-finite coordinates.
    pub dropped: usize,
}

#[inline(always)]
fn vec3_from(slice: &[f32]) -> Option<Vec3> {
    match slice {
        [x, y, z, ..] => Some(Vec3::new(*x, *y, *z)),
        _ => None,
    }
}

impl PointCloudPayload {
    /// Box the sender claims, when both corners carry three components.
    pub fn claimed_bounds(&self) -> Option<BoundingBox> {
        Some(BoundingBox::new(
            vec3_from(&self.bounding_box_min)?,
            vec3_from(&self.bounding_box_max)?,
        ))
    }

    /// Decodes the flat coordinate arrays.
    ///
    /// Triples with any non-finite component are dropped together with their
    /// colour. When the payload carries colours, points past the end of the
    /// colour array get `default_color`; a trailing partial triple is ignored.
    pub fn into_point_set(self, default_color: Rgb) -> Result<Ingested> {
        if self.points.len() < 3 {
            return Err(Error::EmptyPayload);
        }

        let submitted = self.points.len() / 3;
        let with_colors = !self.colors.is_empty();
        let colors: Vec<Rgb> = self
            .colors
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();

        let mut positions = Vec::with_capacity(submitted);
        let mut kept_colors = Vec::with_capacity(if with_colors { submitted } else { 0 });

        for (index, xyz) in self.points.chunks_exact(3).enumerate() {
            let p = Vec3::new(xyz[0], xyz[1], xyz[2]);
            if !p.is_finite() {
                continue;
            }
            positions.push(p);
            if with_colors {
                kept_colors.push(colors.get(index).copied().unwrap_or(default_color));
            }
        }

        if positions.is_empty() {
            return Err(Error::NoValidPoints { submitted });
        }

        let dropped = submitted - positions.len();
        if dropped > 0 {
            log::warn!(
                "{}: dropped {} of {} points with non-finite coordinates",
                self.file_name,
                dropped,
                submitted
            );
        }
        if self.point_count != 0 && self.point_count as usize != submitted {
            log::debug!(
                "{}: header claims {} points, payload carries {}",
                self.file_name,
                self.point_count,
                submitted
            );
        }

        let points = PointSet::with_colors(positions, kept_colors).ok_or(Error::EmptyPayload)?;

        Ok(Ingested {
            claimed: self.claimed_bounds(),
            name: self.file_name,
            points,
            dropped,
        })
    }
}
