//! # crownshift — adaptive mean shift (AMS3D) for LiDAR tree crowns
//!
//! Locates, for every point of an airborne-LiDAR point cloud over a forest
//! canopy, the mode a vertically-asymmetric mean shift converges to. Points
//! whose modes cluster together belong to the same tree crown; clustering
//! the modes into crown IDs (e.g. with DBSCAN) is a downstream step outside
//! this crate.
//!
//! This crate provides:
//! - **Parameter fields**: constant or gridded ground heights and crown
//!   ratios — `ScalarField`, `Raster`
//! - **Spatial indexing**: height-filtered R*-tree construction and
//!   cylinder queries — `PointCloudIndex`, `HeightFilter`
//! - **Mode finding**: kernel geometry, weighting profiles, and the
//!   convergence loop — `calculate_mode`, `calculate_mode_with_centroids`,
//!   `calculate_modes`
//!
//! Reference: Ferraz, A. et al. 2012. *3-D mapping of a multi-layered
//! Mediterranean forest using ALS data.* Remote Sensing of Environment;
//! and Ferraz, A. et al. 2016 (AMS3D).

pub mod mean_shift;
pub mod raster;
pub mod spatial;

pub use mean_shift::{
    calculate_mode, calculate_mode_with_centroids, calculate_modes, Kernel, ModeSearchParams,
    ModeSearchResult,
};
pub use raster::{Raster, RasterError, ScalarField};
pub use spatial::{HeightFilter, Point3D, PointCloudIndex};
