#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Camera intrinsics, lens models and coordinate conventions.
pub mod camera;

/// Grayscale color ramps for depth visualization.
pub mod color;

/// Depth sample semantics and calibration.
pub mod depth;

/// Error types for the depth to point cloud engine.
pub mod error;

/// Camera configuration supplied by the caller.
pub mod params;

/// End to end depth image to point cloud conversion.
pub mod pipeline;

/// The emitted point cloud buffers.
pub mod pointcloud;

/// Per-pixel back-projection of calibrated depth samples.
pub mod projection;

pub use crate::error::DepthError;
pub use crate::pipeline::{depth_to_pointcloud, depth_to_pointcloud_with};
pub use crate::pointcloud::{PointCloudResult, ProjectionStats};
