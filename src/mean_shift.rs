//! Adaptive mean shift (AMS3D) mode finding for tree crowns.
//!
//! For every point of a LiDAR point cloud the algorithm looks for the mode
//! the point drifts toward, following Ferraz et al. 2012/2016:
//!
//! 1. Construct a kernel — a vertical cylinder centered on the point whose
//!    radius and height scale with the point's height above ground.
//! 2. Truncate the lower quarter of the cylinder (understory returns below
//!    the crown would otherwise drag the centroid down).
//! 3. Collect the indexed points intersecting the truncated kernel and
//!    compute their weighted centroid; weights fall off with horizontal
//!    distance (Epanechnikov profile) and vertical distance (Gaussian
//!    profile) from the kernel's center.
//! 4. Re-center the kernel on the centroid and repeat until consecutive
//!    centroids converge or an iteration cap is hit.
//!
//! Modes of points belonging to the same crown cluster shortly below the
//! crown apex; clustering those modes into crown IDs is a separate step and
//! not part of this module.
//!
//! Per-point failures (non-finite coordinates, points below the minimum
//! height, kernels that collect nothing, NaN ground or ratio values along
//! the way) are signaled by an all-NaN mode with an empty centroid trail,
//! never by an error — LiDAR batches routinely contain ground and noise
//! returns that must be skipped silently.

use crate::raster::{Raster, ScalarField};
use crate::spatial::{
    distance_3d, is_finite_point, nan_point, squared_distance_xy, weighted_mean, Point3D,
    PointCloudIndex,
};

// ---------------------------------------------------------------------------
// Profile functions
// ---------------------------------------------------------------------------

/// Decay rate of the vertical (Gaussian) kernel profile; equation (11) in
/// Ferraz et al. 2012.
const GAUSSIAN_GAMMA: f64 = -5.0;

/// The Gaussian profile `f(x) = exp(GAUSSIAN_GAMMA · x²)`, but taking an
/// already-squared argument. Distance calculations square their inputs
/// anyway, so the sqrt/square round trip is skipped.
#[inline]
fn gauss_unsquared(x: f64) -> f64 {
    (GAUSSIAN_GAMMA * x).exp()
}

/// The Epanechnikov profile `f(x) = 1 − x²`, again without the squaring;
/// part of equation (14) in Ferraz et al. 2012.
#[inline]
fn epanechnikov_unsquared(x: f64) -> f64 {
    1.0 - x
}

// ---------------------------------------------------------------------------
// Kernel
// ---------------------------------------------------------------------------

/// The truncated-cylinder search-and-weight volume of one iteration.
///
/// Geometry: with `h` the center point's height above ground and `H = h ·
/// crown_height_ratio` the height of the notionally symmetric kernel, the
/// cylinder is centered on the point, reaches up to `z + H/2`, and is cut
/// off at `z − H/4` — the usable span is the upper three quarters. Its
/// radius is `h · crown_diameter_ratio / 2`. The bottom never reaches below
/// the ground surface.
///
/// Kernels are throwaway values; one is built per iteration and the derived
/// quantities used by the weighting are precomputed here.
#[derive(Debug, Clone, Copy)]
pub struct Kernel {
    x_center: f64,
    y_center: f64,
    radius: f64,
    radius_squared: f64,
    half_height: f64,
    half_height_squared: f64,
    center_height: f64,
    top_height: f64,
    bottom_height: f64,
}

impl Kernel {
    /// Kernel around a point whose z coordinate already is a height above
    /// ground.
    pub fn from_height_above_ground(
        center: &Point3D,
        crown_diameter_ratio: f64,
        crown_height_ratio: f64,
    ) -> Self {
        Self::above_ground(center, 0.0, crown_diameter_ratio, crown_height_ratio)
    }

    /// Kernel around a point with an absolute z coordinate, given the
    /// ground height at the point's xy-location.
    pub fn above_ground(
        center: &Point3D,
        ground_height: f64,
        crown_diameter_ratio: f64,
        crown_height_ratio: f64,
    ) -> Self {
        let height_above_ground = center[2] - ground_height;
        let full_height = height_above_ground * crown_height_ratio;
        let half_height = full_height / 2.0;
        let radius = height_above_ground * crown_diameter_ratio / 2.0;

        // Lower quarter truncated, floored at the ground surface.
        let bottom_above_ground = (height_above_ground - full_height * 0.25).max(0.0);

        Self {
            x_center: center[0],
            y_center: center[1],
            radius,
            radius_squared: radius * radius,
            half_height,
            half_height_squared: half_height * half_height,
            center_height: center[2],
            top_height: center[2] + half_height,
            bottom_height: ground_height + bottom_above_ground,
        }
    }

    /// Squared horizontal distance of `p` to the kernel axis, normalized by
    /// the squared radius; the argument to the Epanechnikov profile.
    #[inline]
    fn squared_relative_horizontal_distance_to(&self, p: &Point3D) -> f64 {
        squared_distance_xy(self.x_center, self.y_center, p) / self.radius_squared
    }

    /// Squared vertical distance of `p` to the kernel center, normalized by
    /// the squared half-height; the argument to the Gaussian profile.
    #[inline]
    fn squared_relative_vertical_distance_to(&self, p: &Point3D) -> f64 {
        let dz = p[2] - self.center_height;
        dz * dz / self.half_height_squared
    }

    /// Weight of an intersecting point under the kernel's two profiles.
    #[inline]
    fn point_weight_of(&self, p: &Point3D) -> f64 {
        epanechnikov_unsquared(self.squared_relative_horizontal_distance_to(p))
            * gauss_unsquared(self.squared_relative_vertical_distance_to(p))
    }

    /// The weighted centroid of the indexed points intersecting the kernel.
    ///
    /// `None` when nothing intersects, or when no intersecting point
    /// carries positive weight (every hit exactly on the radius); the
    /// driver treats both as a terminal NaN mode.
    pub fn centroid_in(&self, point_cloud: &PointCloudIndex) -> Option<Point3D> {
        let points = point_cloud.points_in_cylinder(
            self.x_center,
            self.y_center,
            self.radius,
            self.bottom_height,
            self.top_height,
        );
        if points.is_empty() {
            return None;
        }

        let weights: Vec<f64> = points.iter().map(|p| self.point_weight_of(p)).collect();
        let weight_sum: f64 = weights.iter().sum();

        (weight_sum > 0.0).then(|| weighted_mean(&points, &weights))
    }
}

// ---------------------------------------------------------------------------
// Search parameters
// ---------------------------------------------------------------------------

/// Parameters of one mode search batch.
///
/// The ground height and the two crown ratios are [`ScalarField`]s, so each
/// may independently be one constant or a per-cell grid; a constant field
/// and a single-cell grid with the same value behave identically. All
/// fields are re-resolved at the kernel's location on every iteration.
#[derive(Debug, Clone)]
pub struct ModeSearchParams {
    /// Points (and centroids' kernels) below this height above ground are
    /// not searched; their mode is NaN.
    pub min_height_above_ground: f64,
    /// Ground height model. `Constant(0.0)` means z values already are
    /// heights above ground.
    pub ground_height: ScalarField,
    /// Estimated crown diameter / tree height ratio.
    pub crown_diameter_ratio: ScalarField,
    /// Estimated crown height / tree height ratio.
    pub crown_height_ratio: ScalarField,
    /// Converged once consecutive centroids are closer than this (3D
    /// Euclidean distance, must be positive).
    pub convergence_distance: f64,
    /// Hard cap on centroids per mode (must be at least 1); reaching it
    /// truncates the search without an error.
    pub max_centroids_per_mode: usize,
}

impl ModeSearchParams {
    /// Point heights are already normalized to heights above ground and
    /// both crown ratios are scene-wide constants.
    pub fn normalized(
        min_height_above_ground: f64,
        crown_diameter_ratio: f64,
        crown_height_ratio: f64,
        convergence_distance: f64,
        max_centroids_per_mode: usize,
    ) -> Self {
        Self::with_fields(
            min_height_above_ground,
            ScalarField::Constant(0.0),
            ScalarField::Constant(crown_diameter_ratio),
            ScalarField::Constant(crown_height_ratio),
            convergence_distance,
            max_centroids_per_mode,
        )
    }

    /// Absolute point heights with a ground-height grid and constant crown
    /// ratios.
    pub fn above_ground(
        min_height_above_ground: f64,
        ground_height_grid: Raster,
        crown_diameter_ratio: f64,
        crown_height_ratio: f64,
        convergence_distance: f64,
        max_centroids_per_mode: usize,
    ) -> Self {
        Self::with_fields(
            min_height_above_ground,
            ScalarField::Grid(ground_height_grid),
            ScalarField::Constant(crown_diameter_ratio),
            ScalarField::Constant(crown_height_ratio),
            convergence_distance,
            max_centroids_per_mode,
        )
    }

    /// Fully field-valued variant: ground height and both ratios may each
    /// be constant or gridded.
    ///
    /// # Panics
    /// Panics unless `convergence_distance` is positive and
    /// `max_centroids_per_mode` is at least 1 (caller contract).
    pub fn with_fields(
        min_height_above_ground: f64,
        ground_height: ScalarField,
        crown_diameter_ratio: ScalarField,
        crown_height_ratio: ScalarField,
        convergence_distance: f64,
        max_centroids_per_mode: usize,
    ) -> Self {
        assert!(convergence_distance > 0.0, "convergence distance must be positive");
        assert!(max_centroids_per_mode >= 1, "at least one centroid per mode is required");
        Self {
            min_height_above_ground,
            ground_height,
            crown_diameter_ratio,
            crown_height_ratio,
            convergence_distance,
            max_centroids_per_mode,
        }
    }
}

// ---------------------------------------------------------------------------
// Mode-finding driver
// ---------------------------------------------------------------------------

/// Field value at `(x, y)`, or `None` when the location lies outside the
/// field's extent or the cell value is non-finite. Coordinates are known
/// finite here, so the unchecked accessor is safe.
#[inline]
fn resolve(field: &ScalarField, x: f64, y: f64) -> Option<f64> {
    if !field.has_value_at(x, y) {
        return None;
    }
    let value = field.value_at_unchecked(x, y);
    value.is_finite().then_some(value)
}

/// Ground height and both ratios at `(x, y)`; `None` as soon as any of the
/// three is unresolvable, which terminates the search for this point.
#[inline]
fn resolve_kernel_inputs(params: &ModeSearchParams, x: f64, y: f64) -> Option<(f64, f64, f64)> {
    Some((
        resolve(&params.ground_height, x, y)?,
        resolve(&params.crown_diameter_ratio, x, y)?,
        resolve(&params.crown_height_ratio, x, y)?,
    ))
}

/// The shared convergence loop behind all public entry points.
fn run_mode_search(
    point: &Point3D,
    point_cloud: &PointCloudIndex,
    params: &ModeSearchParams,
    collect_trail: bool,
) -> (Point3D, Vec<Point3D>) {
    let rejected = || (nan_point(), Vec::new());

    if !is_finite_point(point) {
        return rejected();
    }
    let Some((ground, d_ratio, h_ratio)) = resolve_kernel_inputs(params, point[0], point[1])
    else {
        return rejected();
    };
    if point[2] - ground < params.min_height_above_ground {
        return rejected();
    }

    let kernel = Kernel::above_ground(point, ground, d_ratio, h_ratio);
    let Some(mut centroid) = kernel.centroid_in(point_cloud) else {
        return rejected();
    };

    let mut trail = Vec::new();
    if collect_trail {
        trail.push(centroid);
    }
    let mut num_centroids = 1;

    while num_centroids < params.max_centroids_per_mode {
        // The centroid moved, so ground and ratios are looked up anew.
        let Some((ground, d_ratio, h_ratio)) =
            resolve_kernel_inputs(params, centroid[0], centroid[1])
        else {
            return rejected();
        };

        let kernel = Kernel::above_ground(&centroid, ground, d_ratio, h_ratio);
        let Some(next) = kernel.centroid_in(point_cloud) else {
            return rejected();
        };

        num_centroids += 1;
        if collect_trail {
            trail.push(next);
        }

        let step = distance_3d(&next, &centroid);
        centroid = next;
        if step < params.convergence_distance {
            break;
        }
    }

    (centroid, trail)
}

/// The mode `point` converges to within `point_cloud`.
///
/// All-NaN when the point is rejected (non-finite coordinates, below the
/// minimum height, unresolvable field value) or the search dies along the
/// way; see the module docs.
pub fn calculate_mode(
    point: &Point3D,
    point_cloud: &PointCloudIndex,
    params: &ModeSearchParams,
) -> Point3D {
    run_mode_search(point, point_cloud, params, false).0
}

/// Same as [`calculate_mode`], but also returns the ordered centroid trail.
///
/// The trail holds every centroid computed before convergence or
/// truncation (so its length equals `max_centroids_per_mode` exactly when
/// the search was truncated) and is empty whenever the mode is NaN.
pub fn calculate_mode_with_centroids(
    point: &Point3D,
    point_cloud: &PointCloudIndex,
    params: &ModeSearchParams,
) -> (Point3D, Vec<Point3D>) {
    run_mode_search(point, point_cloud, params, true)
}

// ---------------------------------------------------------------------------
// Batch surface
// ---------------------------------------------------------------------------

/// Modes calculated between two progress log lines.
pub const MODES_PER_PROGRESS_TICK: usize = 2000;

/// Result of a batch mode search.
#[derive(Debug, Clone)]
pub struct ModeSearchResult {
    /// One mode per query point, in input order; all-NaN entries mark
    /// rejected points.
    pub modes: Vec<Point3D>,
    /// Centroid trails in input order, when requested.
    pub centroid_trails: Option<Vec<Vec<Point3D>>>,
}

/// Calculate the mode of every query point, in order.
///
/// Each point is an independent, repeatable computation; callers that want
/// parallelism can equally map [`calculate_mode`] over the points
/// themselves, the index and parameters are read-only.
pub fn calculate_modes(
    points: &[Point3D],
    point_cloud: &PointCloudIndex,
    params: &ModeSearchParams,
    return_centroids: bool,
) -> ModeSearchResult {
    let mut modes = Vec::with_capacity(points.len());
    let mut trails = return_centroids.then(|| Vec::with_capacity(points.len()));

    for (i, point) in points.iter().enumerate() {
        let (mode, trail) = run_mode_search(point, point_cloud, params, return_centroids);
        modes.push(mode);
        if let Some(trails) = trails.as_mut() {
            trails.push(trail);
        }
        if (i + 1) % MODES_PER_PROGRESS_TICK == 0 {
            log::debug!("calculated {} of {} modes", i + 1, points.len());
        }
    }

    ModeSearchResult {
        modes,
        centroid_trails: trails,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Raster, ScalarField};
    use crate::spatial::PointCloudIndex;

    fn index_of(points: &[Point3D]) -> PointCloudIndex {
        PointCloudIndex::from_finite_points_above(points, 0.0)
    }

    #[test]
    fn test_profiles_at_center_and_boundary() {
        // Arguments are already squared relative distances: 0 = kernel
        // center, 1 = boundary.
        assert_eq!(epanechnikov_unsquared(0.0), 1.0);
        assert_eq!(epanechnikov_unsquared(1.0), 0.0);
        assert_eq!(gauss_unsquared(0.0), 1.0);
        assert_eq!(gauss_unsquared(1.0), (-5.0_f64).exp());
        assert!(gauss_unsquared(1.0) < 0.01);
    }

    #[test]
    fn test_kernel_geometry() {
        // 10 m above ground, diameter ratio 0.5, height ratio 0.4:
        // radius 2.5, symmetric height 4, top at 12, lower quarter cut at 9.
        let k = Kernel::from_height_above_ground(&[3.0, 4.0, 10.0], 0.5, 0.4);
        assert_eq!(k.x_center, 3.0);
        assert_eq!(k.y_center, 4.0);
        assert_eq!(k.radius, 2.5);
        assert_eq!(k.half_height, 2.0);
        assert_eq!(k.center_height, 10.0);
        assert_eq!(k.top_height, 12.0);
        assert_eq!(k.bottom_height, 9.0);
    }

    #[test]
    fn test_kernel_with_ground_offset() {
        // Same kernel shifted by a 100 m ground height.
        let k = Kernel::above_ground(&[3.0, 4.0, 110.0], 100.0, 0.5, 0.4);
        assert_eq!(k.radius, 2.5);
        assert_eq!(k.center_height, 110.0);
        assert_eq!(k.top_height, 112.0);
        assert_eq!(k.bottom_height, 109.0);
    }

    #[test]
    fn test_kernel_bottom_floored_at_ground() {
        // Height ratio > 4 pushes the truncated bottom below the ground;
        // it must stop at the ground surface.
        let k = Kernel::above_ground(&[0.0, 0.0, 102.0], 100.0, 0.5, 5.0);
        assert_eq!(k.bottom_height, 100.0);
    }

    #[test]
    fn test_point_weights_at_center_and_boundaries() {
        let k = Kernel::from_height_above_ground(&[0.0, 0.0, 10.0], 0.5, 0.4);

        // Exactly at the center: both profiles contribute 1.
        assert_eq!(k.point_weight_of(&[0.0, 0.0, 10.0]), 1.0);
        // Exactly on the radius: the Epanechnikov profile zeroes it out.
        assert_eq!(k.point_weight_of(&[2.5, 0.0, 10.0]), 0.0);
        // At the vertical half-height bound the Gaussian is exp(γ), near
        // zero but not zero.
        let w = k.point_weight_of(&[0.0, 0.0, 12.0]);
        assert_eq!(w, (-5.0_f64).exp());
        assert!(w > 0.0 && w < 0.01);
    }

    #[test]
    fn test_nonfinite_query_points_are_rejected() {
        let points = vec![[0.0, 0.0, 10.0]];
        let index = index_of(&points);
        let params = ModeSearchParams::normalized(0.0, 0.5, 0.5, 0.01, 50);

        for bad in [
            [f64::NAN, 0.0, 10.0],
            [0.0, f64::INFINITY, 10.0],
            [0.0, 0.0, f64::NAN],
        ] {
            let (mode, trail) = calculate_mode_with_centroids(&bad, &index, &params);
            assert!(mode.iter().all(|c| c.is_nan()));
            assert!(trail.is_empty());
        }
    }

    #[test]
    fn test_points_below_minimum_height_are_rejected() {
        let points = vec![[0.0, 0.0, 10.0], [0.0, 0.0, 3.0]];
        let index = index_of(&points);
        let params = ModeSearchParams::normalized(5.0, 0.5, 0.5, 0.01, 50);

        let (mode, trail) = calculate_mode_with_centroids(&[0.0, 0.0, 3.0], &index, &params);
        assert!(mode.iter().all(|c| c.is_nan()));
        assert!(trail.is_empty());

        // The point at 10 m is fine.
        let mode = calculate_mode(&[0.0, 0.0, 10.0], &index, &params);
        assert!(mode.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_nan_ground_at_query_point_rejects() {
        let ground = ScalarField::grid(vec![f64::NAN], 1, 1, -10.0, 10.0, -10.0, 10.0);
        let points = vec![[0.0, 0.0, 10.0]];
        let index = index_of(&points);
        let params = ModeSearchParams::with_fields(
            0.0,
            ground,
            ScalarField::Constant(0.5),
            ScalarField::Constant(0.5),
            0.01,
            50,
        );

        let (mode, trail) = calculate_mode_with_centroids(&[0.0, 0.0, 10.0], &index, &params);
        assert!(mode.iter().all(|c| c.is_nan()));
        assert!(trail.is_empty());
    }

    #[test]
    fn test_empty_kernel_yields_nan_mode() {
        let index = index_of(&[]);
        let params = ModeSearchParams::normalized(0.0, 0.5, 0.5, 0.01, 50);

        let (mode, trail) = calculate_mode_with_centroids(&[0.0, 0.0, 10.0], &index, &params);
        assert!(mode.iter().all(|c| c.is_nan()));
        assert!(trail.is_empty());
    }

    #[test]
    fn test_truncation_at_centroid_cap() {
        let points = vec![[0.0, 0.0, 10.0], [1.0, 0.0, 10.5], [0.0, 1.0, 9.5]];
        let index = index_of(&points);
        // Cap of one centroid: the first one is returned as the mode, and
        // the trail length equals the cap (the truncation marker).
        let params = ModeSearchParams::normalized(0.0, 0.6, 0.5, 1e-9, 1);

        let (mode, trail) = calculate_mode_with_centroids(&[0.0, 0.0, 10.0], &index, &params);
        assert!(mode.iter().all(|c| c.is_finite()));
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0], mode);
    }

    #[test]
    fn test_converged_trail_ends_with_a_small_step() {
        let points = vec![[0.0, 0.0, 10.0], [0.3, 0.0, 10.2], [0.0, 0.2, 9.9]];
        let index = index_of(&points);
        let params = ModeSearchParams::normalized(0.0, 0.6, 0.5, 0.01, 50);

        let (mode, trail) = calculate_mode_with_centroids(&[0.0, 0.0, 10.0], &index, &params);
        assert!(!trail.is_empty());
        assert!(trail.len() < 50, "tight cluster should converge well before the cap");
        assert_eq!(*trail.last().unwrap(), mode);
        let last_step = distance_3d(&trail[trail.len() - 1], &trail[trail.len() - 2]);
        assert!(last_step < 0.01);
    }

    #[test]
    fn test_repeat_runs_are_bit_identical() {
        let points = vec![
            [0.0, 0.0, 18.0],
            [0.4, 0.1, 17.5],
            [-0.2, 0.3, 18.2],
            [5.0, 5.0, 12.0],
        ];
        let index = index_of(&points);
        let params = ModeSearchParams::normalized(0.0, 0.6, 0.5, 0.01, 50);

        let first = calculate_modes(&points, &index, &params, true);
        let second = calculate_modes(&points, &index, &params, true);
        assert_eq!(first.modes, second.modes);
        assert_eq!(first.centroid_trails, second.centroid_trails);
    }

    #[test]
    fn test_clustered_points_share_a_mode() {
        // Three returns near one apex, two isolated returns far away.
        let points = vec![
            [10.0, 10.0, 20.0],
            [10.1, 10.0, 19.8],
            [10.0, 10.1, 19.9],
            [50.0, 50.0, 15.0],
            [80.0, 20.0, 10.0],
        ];
        let index = index_of(&points);
        let params = ModeSearchParams::normalized(0.0, 0.5, 0.5, 0.01, 50);
        let result = calculate_modes(&points, &index, &params, false);

        let modes = &result.modes;
        for m in modes {
            assert!(m.iter().all(|c| c.is_finite()));
        }
        // The cluster's modes coincide (within twice the convergence
        // distance of each other)...
        for i in 0..3 {
            for j in (i + 1)..3 {
                assert!(distance_3d(&modes[i], &modes[j]) < 0.02);
            }
        }
        // ...and the far points' modes do not land on the cluster.
        assert!(distance_3d(&modes[3], &modes[0]) > 1.0);
        assert!(distance_3d(&modes[4], &modes[0]) > 1.0);
    }

    #[test]
    fn test_constant_and_single_cell_grid_match_exactly() {
        let points = vec![
            [10.0, 10.0, 20.0],
            [10.1, 10.0, 19.8],
            [10.0, 10.1, 19.9],
            [50.0, 50.0, 15.0],
        ];
        let index = index_of(&points);

        let constant = ModeSearchParams::normalized(0.0, 0.5, 0.5, 0.01, 50);
        // The same parameters expressed as single-cell grids covering the
        // whole scene; the grid path must be a generalization, not a
        // different algorithm.
        let single_cell = |v: f64| ScalarField::grid(vec![v], 1, 1, -100.0, 200.0, -100.0, 200.0);
        let gridded = ModeSearchParams::with_fields(
            0.0,
            single_cell(0.0),
            single_cell(0.5),
            single_cell(0.5),
            0.01,
            50,
        );

        let a = calculate_modes(&points, &index, &constant, true);
        let b = calculate_modes(&points, &index, &gridded, true);
        assert_eq!(a.modes, b.modes);
        assert_eq!(a.centroid_trails, b.centroid_trails);
    }

    #[test]
    fn test_unresolvable_field_mid_iteration_clears_the_trail() {
        // Ground model only covers x < 2 with a value; the cell east of it
        // is NaN. The extra weight at x = 3 drags the first centroid past
        // x = 2, where the ground lookup dies.
        let ground = Raster::new(vec![0.0, f64::NAN], 1, 2, 0.0, 4.0, -5.0, 5.0);
        let points = vec![
            [1.0, 0.0, 10.0],
            [3.0, 0.0, 10.0],
            [3.0, 0.0, 10.0],
        ];
        let index = index_of(&points);
        let params = ModeSearchParams::above_ground(0.0, ground, 0.8, 0.5, 1e-6, 50);

        let query = [1.0, 0.0, 10.0];
        let (mode, trail) = calculate_mode_with_centroids(&query, &index, &params);
        assert!(mode.iter().all(|c| c.is_nan()));
        assert!(trail.is_empty());
    }
}
