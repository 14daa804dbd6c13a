use std::sync::atomic::AtomicBool;

use depthcloud_image::DepthImage;

use crate::{
    depth::{normalize_depth, DepthMetadata},
    error::DepthError,
    params::{CameraParams, ProjectionParams},
    pointcloud::PointCloudResult,
    projection::{project_depth, project_depth_with, ExecutionStrategy},
};

/// Resolve the effective metadata and projection parameters of one call.
fn resolve(
    image: &DepthImage,
    meta: &DepthMetadata,
    params: &CameraParams,
) -> Result<(DepthMetadata, ProjectionParams), DepthError> {
    let merged = params.apply_to(meta);
    // camera errors surface before any sample is touched
    let projection =
        ProjectionParams::from_metadata(&merged, merged.kind.normalized(), image.size())?;
    Ok((merged, projection))
}

/// Convert a raw depth, disparity or inverse depth image into a point cloud.
///
/// The caller parameters are layered over the reader metadata, the samples are
/// normalized to meters and the result is back-projected through the camera model.
///
/// # Arguments
///
/// * `image` - The raw samples as read from the file.
/// * `meta` - The metadata the reader found in the file.
/// * `params` - The caller configuration, overriding `meta` where set.
///
/// # Returns
///
/// The packed point cloud with grayscale colors.
///
/// # Errors
///
/// Fails when the focal length is missing or invalid, when disparity samples come
/// without a focal length and baseline, or when the clamp range is empty.
///
/// # Example
///
/// ```
/// use depthcloud_3d::depth::{DepthKind, DepthMetadata};
/// use depthcloud_3d::params::CameraParams;
/// use depthcloud_3d::depth_to_pointcloud;
/// use depthcloud_image::DepthImage;
///
/// let disparity = DepthImage::new([3, 1].into(), vec![25.0, 0.0, 50.0]).unwrap();
/// let params = CameraParams {
///     fx: Some(500.0),
///     baseline: Some(0.1),
///     depth_type: Some(DepthKind::Disparity),
///     ..Default::default()
/// };
///
/// let cloud = depth_to_pointcloud(&disparity, &DepthMetadata::default(), &params).unwrap();
/// assert_eq!(cloud.point_count(), 2);
/// assert_eq!(cloud.stats().depth_range, Some((1.0, 2.0)));
/// ```
pub fn depth_to_pointcloud(
    image: &DepthImage,
    meta: &DepthMetadata,
    params: &CameraParams,
) -> Result<PointCloudResult, DepthError> {
    let (merged, projection) = resolve(image, meta, params)?;
    let normalized = normalize_depth(image, &merged)?;
    Ok(project_depth(&normalized.image, &projection))
}

/// Same as [`depth_to_pointcloud`] with an explicit execution strategy and an optional
/// cancellation token.
pub fn depth_to_pointcloud_with(
    image: &DepthImage,
    meta: &DepthMetadata,
    params: &CameraParams,
    strategy: ExecutionStrategy,
    cancel: Option<&AtomicBool>,
) -> Result<PointCloudResult, DepthError> {
    let (merged, projection) = resolve(image, meta, params)?;
    let normalized = normalize_depth(image, &merged)?;
    project_depth_with(&normalized.image, &projection, strategy, cancel)
}
