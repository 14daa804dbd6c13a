use std::{
    ops::Range,
    sync::atomic::{AtomicBool, Ordering},
};

use depthcloud_image::DepthImage;
use rayon::prelude::*;

use crate::{
    camera::ray::RayCaster,
    color::LogDepthRange,
    depth::CalibratedKind,
    error::DepthError,
    params::ProjectionParams,
    pointcloud::{PointCloudResult, ProjectionStats},
};

/// Rows per chunk used by strategies that do not set one.
pub const DEFAULT_CHUNK_ROWS: usize = 64;

/// Controls how the projection is executed.
///
/// Every strategy emits the same points in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Run sequentially on the current thread.
    #[default]
    Serial,

    /// Use the global Rayon thread pool to process chunks of rows in parallel.
    ///
    /// You must provide the number of rows per chunk.
    AutoRows(usize),

    /// Run on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call.
    Fixed(usize),
}

/// Points, log depths and diagnostics of a contiguous band of rows.
#[derive(Debug, Default)]
struct RowsOutput {
    vertices: Vec<f32>,
    log_depths: Vec<f64>,
    stats: ProjectionStats,
}

impl RowsOutput {
    fn with_capacity(num_pixels: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(num_pixels * 3),
            log_depths: Vec::with_capacity(num_pixels),
            stats: ProjectionStats::default(),
        }
    }

    fn append(&mut self, mut other: RowsOutput) {
        self.vertices.append(&mut other.vertices);
        self.log_depths.append(&mut other.log_depths);
        self.stats = self.stats.merge(other.stats);
    }
}

/// Back-project the valid pixels of `rows` into `out`, in raster order.
fn project_rows(
    image: &DepthImage,
    caster: &RayCaster,
    kind: CalibratedKind,
    rows: Range<usize>,
    out: &mut RowsOutput,
) {
    let mut stats = ProjectionStats::default();
    let mut depth_min = f64::INFINITY;
    let mut depth_max = f64::NEG_INFINITY;

    for v in rows {
        for (u, &sample) in image.row(v).iter().enumerate() {
            if !sample.is_finite() || sample <= 0.0 {
                stats.skipped_pixels += 1;
                continue;
            }
            let val = sample as f64;

            let ray = caster.cast(u as f64, v as f64);
            let [x, y, z] = match kind {
                CalibratedKind::Z => ray.point_at_z(val),
                CalibratedKind::Depth => ray.point_at_range(val),
            };

            if let Some(solve) = ray.theta_solve {
                stats.theta_solves += 1;
                stats.max_iterations = stats.max_iterations.max(solve.iterations);
                stats.max_residual = stats.max_residual.max(solve.residual);
                if !solve.converged {
                    stats.non_converged += 1;
                }
            }

            out.vertices.extend_from_slice(&[x as f32, y as f32, z as f32]);
            out.log_depths.push(val.ln());
            depth_min = depth_min.min(val);
            depth_max = depth_max.max(val);
            stats.valid_pixels += 1;
        }
    }

    if stats.valid_pixels > 0 {
        stats.depth_range = Some((depth_min, depth_max));
    }
    out.stats = out.stats.merge(stats);
}

/// Apply the convention and synthesize colors once all rows are projected.
fn finalize(image: &DepthImage, params: &ProjectionParams, out: RowsOutput) -> PointCloudResult {
    let RowsOutput {
        mut vertices,
        log_depths,
        stats,
    } = out;

    vertices.shrink_to_fit();
    params.convention.apply_in_place(&mut vertices);

    let colors = params.color.map(|ramp| match stats.depth_range {
        Some((min_depth, max_depth)) => {
            ramp.colorize(&log_depths, &LogDepthRange::from_depths(min_depth, max_depth))
        }
        None => Vec::new(),
    });

    log::debug!(
        "projected {} {} samples with {}: {} points, {} skipped, depth range {:?}",
        image.size(),
        match params.kind {
            CalibratedKind::Depth => "range",
            CalibratedKind::Z => "z",
        },
        params.model,
        stats.valid_pixels,
        stats.skipped_pixels,
        stats.depth_range,
    );

    if stats.non_converged > 0 {
        log::warn!(
            "{} of {} kannala-brandt solves did not converge (max residual {:e})",
            stats.non_converged,
            stats.theta_solves,
            stats.max_residual,
        );
    }

    PointCloudResult::new(vertices, colors, Some(image.size()), stats)
}

/// Back-project a calibrated depth image into a point cloud.
///
/// Pixels are visited in raster order; a pixel whose sample is not finite or not
/// positive is skipped, every other pixel emits exactly one point. Points are packed
/// without holes, so point `i` belongs to the `i`-th valid pixel.
///
/// # Arguments
///
/// * `image` - The calibrated samples in meters.
/// * `params` - The resolved camera parameters.
///
/// # Returns
///
/// The packed vertices, the optional grayscale colors and the projection statistics.
///
/// # Example
///
/// ```
/// use depthcloud_3d::camera::CameraIntrinsic;
/// use depthcloud_3d::depth::CalibratedKind;
/// use depthcloud_3d::params::ProjectionParams;
/// use depthcloud_3d::projection::project_depth;
/// use depthcloud_image::DepthImage;
///
/// let image = DepthImage::from_size_val([101, 101].into(), 5.0).unwrap();
/// let params = ProjectionParams::new(CameraIntrinsic {
///     fx: 100.0,
///     fy: 100.0,
///     cx: 50.0,
///     cy: 50.0,
/// })
/// .with_kind(CalibratedKind::Z);
///
/// let cloud = project_depth(&image, &params);
/// assert_eq!(cloud.point_count(), 101 * 101);
/// assert_eq!(cloud.points().nth(50 * 101 + 50), Some([0.0, 0.0, 5.0]));
/// ```
pub fn project_depth(image: &DepthImage, params: &ProjectionParams) -> PointCloudResult {
    let caster = caster(params);
    let mut out = RowsOutput::with_capacity(image.num_pixels());
    project_rows(image, &caster, params.kind, 0..image.height(), &mut out);
    finalize(image, params, out)
}

/// Back-project a calibrated depth image with an explicit execution strategy.
///
/// The image is processed in bands of rows. The cancellation token, if any, is checked
/// before each band; once it is set the call returns [`DepthError::Cancelled`]. The
/// emitted points are identical to [`project_depth`] for every strategy.
///
/// # Errors
///
/// Fails when cancelled, when a chunk size or thread count is zero, or when the local
/// thread pool cannot be built.
pub fn project_depth_with(
    image: &DepthImage,
    params: &ProjectionParams,
    strategy: ExecutionStrategy,
    cancel: Option<&AtomicBool>,
) -> Result<PointCloudResult, DepthError> {
    let caster = caster(params);
    let out = match strategy {
        ExecutionStrategy::Serial => {
            project_serial(image, &caster, params.kind, DEFAULT_CHUNK_ROWS, cancel)?
        }
        ExecutionStrategy::AutoRows(rows_per_chunk) => {
            if rows_per_chunk == 0 {
                return Err(DepthError::InvalidChunkRows);
            }
            project_parallel(image, &caster, params.kind, rows_per_chunk, cancel)?
        }
        ExecutionStrategy::Fixed(num_threads) => {
            if num_threads == 0 {
                return Err(DepthError::InvalidThreadCount(num_threads));
            }
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build()
                .map_err(|e| DepthError::ThreadPool(e.to_string()))?;
            pool.install(|| {
                project_parallel(image, &caster, params.kind, DEFAULT_CHUNK_ROWS, cancel)
            })?
        }
    };
    Ok(finalize(image, params, out))
}

fn caster(params: &ProjectionParams) -> RayCaster {
    RayCaster {
        criteria: params.criteria,
        ..RayCaster::new(params.model, params.intrinsic, params.distortion)
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Relaxed))
}

fn chunk_rows(height: usize, rows_per_chunk: usize) -> impl Iterator<Item = Range<usize>> {
    (0..height)
        .step_by(rows_per_chunk)
        .map(move |start| start..(start + rows_per_chunk).min(height))
}

fn project_serial(
    image: &DepthImage,
    caster: &RayCaster,
    kind: CalibratedKind,
    rows_per_chunk: usize,
    cancel: Option<&AtomicBool>,
) -> Result<RowsOutput, DepthError> {
    let mut out = RowsOutput::with_capacity(image.num_pixels());
    for rows in chunk_rows(image.height(), rows_per_chunk) {
        if is_cancelled(cancel) {
            return Err(DepthError::Cancelled {
                rows_done: rows.start,
                rows_total: image.height(),
            });
        }
        project_rows(image, caster, kind, rows, &mut out);
    }
    Ok(out)
}

fn project_parallel(
    image: &DepthImage,
    caster: &RayCaster,
    kind: CalibratedKind,
    rows_per_chunk: usize,
    cancel: Option<&AtomicBool>,
) -> Result<RowsOutput, DepthError> {
    let bands: Vec<Range<usize>> = chunk_rows(image.height(), rows_per_chunk).collect();

    // indexed collect keeps the bands in raster order
    let outputs: Vec<Option<RowsOutput>> = bands
        .par_iter()
        .map(|rows| {
            if is_cancelled(cancel) {
                return None;
            }
            let mut band = RowsOutput::with_capacity(rows.len() * image.width());
            project_rows(image, caster, kind, rows.clone(), &mut band);
            Some(band)
        })
        .collect();

    if outputs.iter().any(Option::is_none) {
        let rows_done = bands
            .iter()
            .zip(&outputs)
            .filter(|(_, band)| band.is_some())
            .map(|(rows, _)| rows.len())
            .sum();
        return Err(DepthError::Cancelled {
            rows_done,
            rows_total: image.height(),
        });
    }

    let mut out = RowsOutput::with_capacity(0);
    outputs.into_iter().flatten().for_each(|band| out.append(band));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{distortion::PolynomialDistortion, CameraIntrinsic, CameraModel, Convention};
    use approx::assert_relative_eq;
    use depthcloud_image::ImageError;

    fn params() -> ProjectionParams {
        ProjectionParams::new(CameraIntrinsic {
            fx: 100.0,
            fy: 100.0,
            cx: 50.0,
            cy: 50.0,
        })
    }

    #[test]
    fn test_pinhole_z_center_pixel() -> Result<(), ImageError> {
        let image = DepthImage::from_size_val([101, 101].into(), 5.0)?;
        let cloud = project_depth(&image, &params().with_kind(CalibratedKind::Z));
        assert_eq!(cloud.point_count(), 101 * 101);
        assert_eq!(cloud.points().nth(50 * 101 + 50), Some([0.0, 0.0, 5.0]));
        Ok(())
    }

    #[test]
    fn test_skips_invalid_pixels_and_packs_points() -> Result<(), ImageError> {
        let image = DepthImage::new(
            [3, 2].into(),
            vec![1.0, f32::NAN, 2.0, 0.0, -1.0, f32::INFINITY],
        )?;
        let cloud = project_depth(&image, &params().with_kind(CalibratedKind::Z));
        assert_eq!(cloud.point_count(), 2);
        assert_eq!(cloud.vertices().len(), 6);
        assert_eq!(cloud.colors().map(<[f32]>::len), Some(6));
        assert_eq!(cloud.stats().valid_pixels, 2);
        assert_eq!(cloud.stats().skipped_pixels, 4);
        assert_eq!(cloud.stats().depth_range, Some((1.0, 2.0)));

        // pixel (0, 0) then pixel (2, 0)
        let points: Vec<[f32; 3]> = cloud.points().collect();
        assert_relative_eq!(points[0][0], -0.5, epsilon = 1e-6);
        assert_relative_eq!(points[1][0], -0.96, epsilon = 1e-6);
        assert_eq!(points[1][2], 2.0);
        Ok(())
    }

    #[test]
    fn test_range_kind_has_sample_norm() -> Result<(), ImageError> {
        let image = DepthImage::from_size_val([8, 6].into(), 3.0)?;
        for model in CameraModel::ALL {
            let cloud = project_depth(&image, &params().with_model(model));
            for [x, y, z] in cloud.points() {
                assert_relative_eq!((x * x + y * y + z * z).sqrt(), 3.0, epsilon = 1e-5);
            }
        }
        Ok(())
    }

    #[test]
    fn test_opengl_convention() -> Result<(), ImageError> {
        let image = DepthImage::from_fn([5, 4].into(), |u, v| 1.0 + (u + v) as f32)?;
        let base = params().with_model(CameraModel::FisheyeEquidistant);
        let opencv = project_depth(&image, &base);
        let opengl = project_depth(&image, &base.with_convention(Convention::Opengl));
        for (a, b) in opencv.points().zip(opengl.points()) {
            assert_eq!([a[0], -a[1], -a[2]], b);
        }
        assert_eq!(opencv.colors(), opengl.colors());
        Ok(())
    }

    #[test]
    fn test_single_pixel_is_white() -> Result<(), ImageError> {
        let image = DepthImage::from_size_val([1, 1].into(), 0.7)?;
        for model in CameraModel::ALL {
            let cloud = project_depth(&image, &params().with_model(model));
            assert_eq!(cloud.point_count(), 1);
            assert_eq!(cloud.colors(), Some(&[1.0f32, 1.0, 1.0][..]));
        }
        Ok(())
    }

    #[test]
    fn test_no_colors() -> Result<(), ImageError> {
        let image = DepthImage::from_size_val([2, 2].into(), 1.0)?;
        let cloud = project_depth(&image, &params().with_color(None));
        assert!(cloud.colors().is_none());
        Ok(())
    }

    #[test]
    fn test_empty_cloud() -> Result<(), ImageError> {
        let image = DepthImage::from_size_val([4, 4].into(), f32::NAN)?;
        let cloud = project_depth(&image, &params());
        assert!(cloud.is_empty());
        assert_eq!(cloud.colors(), Some(&[][..]));
        assert_eq!(cloud.stats().depth_range, None);
        Ok(())
    }

    #[test]
    fn test_kannala_brandt_stats() -> Result<(), ImageError> {
        let image = DepthImage::from_size_val([3, 3].into(), 1.0)?;

        // zero polynomial never converges, every off-center pixel falls back to r / fx
        let cloud = project_depth(
            &image,
            &params().with_model(CameraModel::FisheyeKannalaBrandt),
        );
        assert_eq!(cloud.stats().theta_solves, 9);
        assert_eq!(cloud.stats().non_converged, 9);
        assert_eq!(cloud.stats().max_iterations, 0);

        let equidistant = project_depth(
            &image,
            &params().with_model(CameraModel::FisheyeEquidistant),
        );
        assert_eq!(cloud.vertices(), equidistant.vertices());

        let distortion = PolynomialDistortion {
            k1: 100.0,
            k2: -2.0,
            ..Default::default()
        };
        let cloud = project_depth(
            &image,
            &params()
                .with_model(CameraModel::FisheyeKannalaBrandt)
                .with_distortion(distortion),
        );
        assert_eq!(cloud.stats().non_converged, 0);
        assert!(cloud.stats().max_iterations <= 10);
        Ok(())
    }

    #[test]
    fn test_strategies_match_serial() -> Result<(), DepthError> {
        let image = DepthImage::from_fn([37, 29].into(), |u, v| {
            if (u * 7 + v * 3) % 5 == 0 {
                f32::NAN
            } else {
                0.5 + (u as f32 * 0.1) + (v as f32 * 0.05)
            }
        })?;
        let params = params()
            .with_model(CameraModel::PinholeOpencv)
            .with_distortion(PolynomialDistortion {
                k1: -0.1,
                p1: 0.001,
                ..Default::default()
            });
        let serial = project_depth(&image, &params);

        for strategy in [
            ExecutionStrategy::Serial,
            ExecutionStrategy::AutoRows(1),
            ExecutionStrategy::AutoRows(4),
            ExecutionStrategy::AutoRows(100),
            ExecutionStrategy::Fixed(2),
        ] {
            let cloud = project_depth_with(&image, &params, strategy, None)?;
            assert_eq!(cloud, serial, "{strategy:?}");
        }
        Ok(())
    }

    #[test]
    fn test_cancelled() -> Result<(), ImageError> {
        let image = DepthImage::from_size_val([16, 16].into(), 1.0)?;
        let cancel = AtomicBool::new(true);
        for strategy in [ExecutionStrategy::Serial, ExecutionStrategy::AutoRows(4)] {
            let res = project_depth_with(&image, &params(), strategy, Some(&cancel));
            assert_eq!(
                res,
                Err(DepthError::Cancelled {
                    rows_done: 0,
                    rows_total: 16,
                })
            );
        }
        Ok(())
    }

    #[test]
    fn test_invalid_strategy() -> Result<(), ImageError> {
        let image = DepthImage::from_size_val([2, 2].into(), 1.0)?;
        assert_eq!(
            project_depth_with(&image, &params(), ExecutionStrategy::AutoRows(0), None),
            Err(DepthError::InvalidChunkRows)
        );
        assert_eq!(
            project_depth_with(&image, &params(), ExecutionStrategy::Fixed(0), None),
            Err(DepthError::InvalidThreadCount(0))
        );
        Ok(())
    }
}
