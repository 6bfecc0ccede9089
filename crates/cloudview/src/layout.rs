//! Incremental layout of a decimated cloud into bounded batches.

use crate::budget::DisplayBudget;
use crate::data::{PointRecord, PointSet, Rgb};
use std::iter::FusedIterator;
use std::sync::Arc;

/// One tick's worth of point placements.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBatch {
    pub generation: u64,
    pub records: Vec<PointRecord>,
    /// Records emitted by the job so far, this batch included.
    pub placed: usize,
}

/// Walks a [`PointSet`] with the budget's stride and yields at most
/// `batch_size` records per call to `next`.
///
/// The job is fused. Dropping it cancels the remaining work; consumers filter
/// anything already emitted by generation.
#[derive(Debug)]
pub struct LayoutJob {
    points: Arc<PointSet>,
    budget: DisplayBudget,
    generation: u64,
    batch_size: usize,
    scale: f32,
    default_color: Rgb,
    color_override: Option<Rgb>,
    next_index: usize,
    placed: usize,
}

impl LayoutJob {
    pub fn new(
        points: Arc<PointSet>,
        budget: DisplayBudget,
        generation: u64,
        batch_size: usize,
        scale: f32,
        default_color: Rgb,
    ) -> Self {
        Self {
            points,
            budget,
            generation,
            batch_size: batch_size.max(1),
            scale,
            default_color,
            color_override: None,
            next_index: 0,
            placed: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn budget(&self) -> DisplayBudget {
        self.budget
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn placed(&self) -> usize {
        self.placed
    }

    /// Records the job will emit in total.
    pub fn target(&self) -> usize {
        self.budget.displayed_count(self.points.len())
    }

    pub fn is_finished(&self) -> bool {
        self.placed >= self.budget.max_display_points() || self.next_index >= self.points.len()
    }

    /// Scale applied to records not yet emitted.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Paints every record not yet emitted with `color`, per-point colours included.
    pub fn set_color(&mut self, color: Rgb) {
        self.color_override = Some(color);
    }

    fn color_of(&self, index: usize) -> Rgb {
        self.color_override
            .or_else(|| self.points.color(index))
            .unwrap_or(self.default_color)
    }
}

impl Iterator for LayoutJob {
    type Item = LayoutBatch;

    fn next(&mut self) -> Option<LayoutBatch> {
        if self.is_finished() {
            return None;
        }

        let remaining = self.budget.max_display_points() - self.placed;
        let take = remaining.min(self.batch_size);
        let positions = self.points.positions();

        let mut records = Vec::with_capacity(take);
        while records.len() < take && self.next_index < positions.len() {
            let index = self.next_index;
            records.push(PointRecord {
                position: positions[index],
                scale: self.scale,
                color: self.color_of(index),
                generation: self.generation,
            });
            self.next_index += self.budget.stride();
        }

        self.placed += records.len();
        Some(LayoutBatch {
            generation: self.generation,
            records,
            placed: self.placed,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.target().saturating_sub(self.placed);
        let batches = left.div_ceil(self.batch_size);
        (batches, Some(batches))
    }
}

impl FusedIterator for LayoutJob {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::select_budget;
    use glam::Vec3;

    fn line(n: usize) -> Arc<PointSet> {
        Arc::new(PointSet::new(
            (0..n).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect(),
        ))
    }

    #[test]
    fn batches_are_bounded_and_tagged() {
        let points = line(20_000);
        let budget = select_budget(points.len(), 100.0);
        let job = LayoutJob::new(points, budget, 7, 50, 0.3, [1.0; 3]);
        assert_eq!(job.batch_size(), 50);
        assert_eq!(job.size_hint(), (100, Some(100)));

        let batches: Vec<_> = job.collect();
        assert_eq!(batches.len(), 100);
        assert!(batches.iter().all(|b| b.records.len() <= 50));
        assert!(batches.iter().flat_map(|b| &b.records).all(|r| r.generation == 7));
        assert_eq!(batches.last().map(|b| b.placed), Some(5000));
    }

    #[test]
    fn walks_stride_spaced_indices_in_order() {
        let points = line(20_000);
        let budget = select_budget(points.len(), 100.0);
        let mut job = LayoutJob::new(points, budget, 1, 50, 1.0, [1.0; 3]);
        let first = job.next().unwrap();
        let xs: Vec<f32> = first.records.iter().take(3).map(|r| r.position.x).collect();
        assert_eq!(xs, vec![0.0, 4.0, 8.0]);
    }

    #[test]
    fn short_input_ends_before_budget() {
        // 1000 points, budget 4000, stride 1: everything is placed.
        let points = line(1000);
        let budget = select_budget(points.len(), 10.0);
        let job = LayoutJob::new(points, budget, 1, 50, 1.0, [1.0; 3]);
        let total: usize = job.map(|b| b.records.len()).sum();
        assert_eq!(total, 1000);
    }

    #[test]
    fn fused_after_exhaustion() {
        let points = line(3);
        let budget = select_budget(points.len(), 1.0);
        let mut job = LayoutJob::new(points, budget, 1, 50, 1.0, [1.0; 3]);
        assert_eq!(job.next().map(|b| b.records.len()), Some(3));
        assert!(job.is_finished());
        assert!(job.next().is_none());
        assert!(job.next().is_none());
    }

    #[test]
    fn empty_set_yields_nothing() {
        let points = Arc::new(PointSet::default());
        let budget = select_budget(0, 0.0);
        let mut job = LayoutJob::new(points, budget, 1, 50, 1.0, [1.0; 3]);
        assert!(job.next().is_none());
    }

    #[test]
    fn colours_fall_back_to_default() {
        let coloured = Arc::new(
            PointSet::with_colors(vec![Vec3::ZERO, Vec3::X], vec![[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]])
                .unwrap(),
        );
        let budget = select_budget(2, 1.0);
        let records = LayoutJob::new(coloured, budget, 1, 50, 1.0, [0.5; 3])
            .next()
            .unwrap()
            .records;
        assert_eq!(records[1].color, [0.0, 0.0, 1.0]);

        let plain = line(2);
        let records = LayoutJob::new(plain, budget, 1, 50, 1.0, [0.5; 3])
            .next()
            .unwrap()
            .records;
        assert_eq!(records[0].color, [0.5; 3]);
    }

    #[test]
    fn rescale_applies_to_remaining_records() {
        let points = line(200);
        let budget = select_budget(points.len(), 1.0);
        let mut job = LayoutJob::new(points, budget, 1, 50, 1.0, [1.0; 3]);
        let first = job.next().unwrap();
        job.set_scale(2.0);
        assert_eq!(job.scale(), 2.0);
        let second = job.next().unwrap();
        assert!(first.records.iter().all(|r| r.scale == 1.0));
        assert!(second.records.iter().all(|r| r.scale == 2.0));
    }

    #[test]
    fn zero_batch_size_still_makes_progress() {
        let points = line(3);
        let budget = select_budget(points.len(), 1.0);
        let mut job = LayoutJob::new(points, budget, 1, 0, 1.0, [1.0; 3]);
        assert_eq!(job.batch_size(), 1);
        assert_eq!(job.next().map(|b| b.records.len()), Some(1));
        assert_eq!(job.count(), 2);
    }

    #[test]
    fn recolour_overrides_remaining_records() {
        let coloured = Arc::new(
            PointSet::with_colors(
                (0..4).map(|i| Vec3::splat(i as f32)).collect(),
                vec![[1.0, 0.0, 0.0]; 4],
            )
            .unwrap(),
        );
        let budget = select_budget(4, 1.0);
        let mut job = LayoutJob::new(coloured, budget, 1, 2, 1.0, [0.5; 3]);
        let first = job.next().unwrap();
        job.set_color([0.0, 1.0, 0.0]);
        let second = job.next().unwrap();
        assert!(first.records.iter().all(|r| r.color == [1.0, 0.0, 0.0]));
        assert!(second.records.iter().all(|r| r.color == [0.0, 1.0, 0.0]));
    }
}
