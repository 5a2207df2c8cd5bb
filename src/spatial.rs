//! Point geometry and the spatial index over a LiDAR point cloud.
//!
//! The index is an R*-tree ([`rstar`]) bulk-loaded from a lazily filtered
//! view of the raw point list: points with non-finite coordinates and points
//! below a minimum (above-ground) height never reach the tree. Kernel
//! queries then ask for everything inside a vertical cylinder.

use rstar::{RTree, AABB};

use crate::raster::ScalarField;

/// A 3D point: (x, y, z) in map units, z = height.
pub type Point3D = [f64; 3];

// ---------------------------------------------------------------------------
// Geometry helpers
// ---------------------------------------------------------------------------

/// True iff all three coordinates are finite (no NaN, no ±Inf).
///
/// z is tested first; in LiDAR tables it is the coordinate most likely to
/// carry a non-finite value.
#[inline]
pub fn is_finite_point(p: &Point3D) -> bool {
    p[2].is_finite() && p[0].is_finite() && p[1].is_finite()
}

/// The canonical "no result" point.
#[inline]
pub fn nan_point() -> Point3D {
    [f64::NAN, f64::NAN, f64::NAN]
}

/// Euclidean distance between two 3D points.
#[inline]
pub fn distance_3d(a: &Point3D, b: &Point3D) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Squared distance between `(x, y)` and the xy-projection of `p`.
#[inline]
pub fn squared_distance_xy(x: f64, y: f64, p: &Point3D) -> f64 {
    let dx = p[0] - x;
    let dy = p[1] - y;
    dx * dx + dy * dy
}

/// Weighted arithmetic mean of a set of points: `Σ wᵢ·pᵢ / Σ wᵢ`.
///
/// Weights must be non-negative and at least one must be positive,
/// otherwise the result is NaN-valued. The kernel guarantees this by
/// construction; other callers have to check beforehand.
pub fn weighted_mean(points: &[Point3D], weights: &[f64]) -> Point3D {
    debug_assert_eq!(points.len(), weights.len());

    let mut sum = [0.0_f64; 3];
    let mut weight_sum = 0.0_f64;
    for (p, w) in points.iter().zip(weights) {
        sum[0] += w * p[0];
        sum[1] += w * p[1];
        sum[2] += w * p[2];
        weight_sum += w;
    }

    [sum[0] / weight_sum, sum[1] / weight_sum, sum[2] / weight_sum]
}

// ---------------------------------------------------------------------------
// Filtered index construction
// ---------------------------------------------------------------------------

/// The qualification predicate applied while feeding points into the index.
///
/// The three variants differ only in where the minimum height and the
/// ground height come from; the skip logic is shared.
#[derive(Debug, Clone)]
pub enum HeightFilter<'a> {
    /// Keep points whose z is at or above a fixed threshold. Used when the
    /// cloud's z values are already heights above ground.
    AboveHeight(f64),
    /// Keep points whose height above `ground` is at or above a fixed
    /// threshold.
    AboveGround {
        min_height: f64,
        ground: &'a ScalarField,
    },
    /// Keep points whose height above `ground` is at or above a per-cell
    /// minimum.
    AboveHeightGrid {
        min_height: &'a ScalarField,
        ground: &'a ScalarField,
    },
}

impl HeightFilter<'_> {
    /// Whether `p` belongs in the index.
    ///
    /// Non-finite points never qualify. Where a field lookup is needed, a
    /// location outside the field's extent or a non-finite field value
    /// disqualifies the point as well.
    pub fn qualifies(&self, p: &Point3D) -> bool {
        if !is_finite_point(p) {
            return false;
        }

        match self {
            Self::AboveHeight(min_height) => p[2] >= *min_height,
            Self::AboveGround { min_height, ground } => {
                let Ok(ground_height) = ground.value_at(p[0], p[1]) else {
                    return false;
                };
                let height_above_ground = p[2] - ground_height;
                height_above_ground.is_finite() && height_above_ground >= *min_height
            }
            Self::AboveHeightGrid { min_height, ground } => {
                let Ok(ground_height) = ground.value_at(p[0], p[1]) else {
                    return false;
                };
                let Ok(min_height) = min_height.value_at(p[0], p[1]) else {
                    return false;
                };
                let height_above_ground = p[2] - ground_height;
                height_above_ground.is_finite()
                    && min_height.is_finite()
                    && height_above_ground >= min_height
            }
        }
    }
}

/// Lazy single-pass view of `points` with disqualified elements skipped.
///
/// The bulk-load constructor below consumes this; nothing else allocates
/// before the tree does.
pub fn qualifying_points<'a>(
    points: &'a [Point3D],
    filter: &'a HeightFilter<'a>,
) -> impl Iterator<Item = Point3D> + 'a {
    points.iter().copied().filter(move |p| filter.qualifies(p))
}

// ---------------------------------------------------------------------------
// PointCloudIndex
// ---------------------------------------------------------------------------

/// An immutable R*-tree over the qualifying subset of a point cloud.
///
/// Built once per batch with [`RTree::bulk_load`] (bulk construction gives
/// both better build times and better-balanced trees than one-by-one
/// insertion), then only queried.
#[derive(Debug)]
pub struct PointCloudIndex {
    tree: RTree<Point3D>,
}

impl PointCloudIndex {
    /// Index the finite points at or above `min_height` (z values are
    /// heights above ground already).
    pub fn from_finite_points_above(points: &[Point3D], min_height: f64) -> Self {
        Self::from_filtered(points, &HeightFilter::AboveHeight(min_height))
    }

    /// Index the finite points whose height above `ground` is at or above
    /// `min_height_above_ground`.
    pub fn from_points_above_ground(
        points: &[Point3D],
        min_height_above_ground: f64,
        ground: &ScalarField,
    ) -> Self {
        Self::from_filtered(
            points,
            &HeightFilter::AboveGround {
                min_height: min_height_above_ground,
                ground,
            },
        )
    }

    /// Index the finite points whose height above `ground` is at or above a
    /// per-cell minimum.
    pub fn from_points_above_height_grid(
        points: &[Point3D],
        min_height: &ScalarField,
        ground: &ScalarField,
    ) -> Self {
        Self::from_filtered(points, &HeightFilter::AboveHeightGrid { min_height, ground })
    }

    /// Shared bulk-load path for all three filter variants.
    pub fn from_filtered(points: &[Point3D], filter: &HeightFilter<'_>) -> Self {
        let qualifying: Vec<Point3D> = qualifying_points(points, filter).collect();
        log::debug!(
            "indexing {} of {} points after height filtering",
            qualifying.len(),
            points.len()
        );
        Self {
            tree: RTree::bulk_load(qualifying),
        }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// All indexed points inside the vertical cylinder with the given
    /// horizontal center, radius, and z-range.
    ///
    /// The tree answers with everything in the cylinder's bounding box;
    /// that superset is then filtered exactly. Both the radius and the
    /// z-bounds are inclusive, so a point exactly on the boundary is
    /// returned (it will carry a boundary weight in the kernel).
    pub fn points_in_cylinder(
        &self,
        x_center: f64,
        y_center: f64,
        radius: f64,
        bottom_height: f64,
        top_height: f64,
    ) -> Vec<Point3D> {
        let envelope = AABB::from_corners(
            [x_center - radius, y_center - radius, bottom_height],
            [x_center + radius, y_center + radius, top_height],
        );
        let radius_squared = radius * radius;

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|p| {
                squared_distance_xy(x_center, y_center, p) <= radius_squared
                    && bottom_height <= p[2]
                    && p[2] <= top_height
            })
            .copied()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
