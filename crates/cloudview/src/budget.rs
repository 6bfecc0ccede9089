//! Display budget: how many points of a cloud to draw, and how large.
//!
//! Big or physically large clouds are thinned harder. Tier boundaries and clamp
//! ranges are empirical.

use serde::Serialize;

/// Which row of the budget table matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTier {
    Empty,
    Huge,
    Large,
    WideExtent,
    MediumExtent,
    Small,
}

impl BudgetTier {
    /// `(divisor, clamp_min, clamp_max)` of the tier.
    const fn params(self) -> (usize, usize, usize) {
        match self {
            BudgetTier::Empty => (1, 0, 0),
            BudgetTier::Huge => (50, 1000, 2000),
            BudgetTier::Large => (20, 2000, 3000),
            BudgetTier::WideExtent => (8, 2000, 4000),
            BudgetTier::MediumExtent => (6, 3000, 6000),
            BudgetTier::Small => (4, 4000, 8000),
        }
    }

    /// Lower bound of the tier's clamp range.
    pub const fn floor(self) -> usize {
        self.params().1
    }

    fn classify(total_points: usize, max_dimension: f32) -> Self {
        if total_points == 0 {
            BudgetTier::Empty
        } else if total_points > 500_000 {
            BudgetTier::Huge
        } else if total_points > 100_000 {
            BudgetTier::Large
        } else if max_dimension > 1000.0 {
            BudgetTier::WideExtent
        } else if max_dimension > 500.0 {
            BudgetTier::MediumExtent
        } else {
            BudgetTier::Small
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayBudget {
    max_display_points: usize,
    stride: usize,
    tier: BudgetTier,
}

impl DisplayBudget {
    /// A zero `stride` is raised to 1.
    pub fn new(max_display_points: usize, stride: usize, tier: BudgetTier) -> Self {
        Self {
            max_display_points,
            stride: stride.max(1),
            tier,
        }
    }

    pub fn max_display_points(&self) -> usize {
        self.max_display_points
    }

    /// Step between consecutive sampled indices, always >= 1.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn tier(&self) -> BudgetTier {
        self.tier
    }

    /// Number of points a uniform-stride walk over `total_points` will emit.
    pub fn displayed_count(&self, total_points: usize) -> usize {
        total_points.div_ceil(self.stride).min(self.max_display_points)
    }

    /// Indices of the sampled points, in original order.
    pub fn sample_indices(&self, total_points: usize) -> impl Iterator<Item = usize> {
        (0..total_points)
            .step_by(self.stride)
            .take(self.max_display_points)
    }
}

/// Picks the display budget for a cloud of `total_points` whose bounding box
/// has largest extent `max_dimension`.
pub fn select_budget(total_points: usize, max_dimension: f32) -> DisplayBudget {
    let tier = BudgetTier::classify(total_points, max_dimension);
    if tier == BudgetTier::Empty {
        return DisplayBudget::new(0, 1, tier);
    }

    let (divisor, lo, hi) = tier.params();
    let max_display_points = (total_points / divisor).clamp(lo, hi);
    DisplayBudget::new(max_display_points, total_points / max_display_points, tier)
}

/// Scale of a single point primitive for a cloud of the given extent.
pub fn adaptive_point_size(max_dimension: f32) -> f32 {
    if !max_dimension.is_finite() {
        return 0.3;
    }
    (max_dimension / 800.0).clamp(0.3, 5.0)
}
