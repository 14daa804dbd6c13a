use depthcloud_image::ImageSize;
use glam::Vec3;

/// Diagnostics gathered while projecting one depth image.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProjectionStats {
    /// Pixels that produced a point.
    pub valid_pixels: usize,
    /// Pixels skipped because the sample was not finite or not positive.
    pub skipped_pixels: usize,
    /// Smallest and largest sample over the emitted points.
    pub depth_range: Option<(f64, f64)>,
    /// Number of Kannala-Brandt solves.
    pub theta_solves: usize,
    /// Number of Kannala-Brandt solves that stopped without converging.
    pub non_converged: usize,
    /// Largest number of Newton updates used by a single solve.
    pub max_iterations: usize,
    /// Largest final residual over all solves.
    pub max_residual: f64,
}

impl ProjectionStats {
    /// Combine the statistics of two disjoint sets of pixels.
    pub fn merge(self, other: Self) -> Self {
        let depth_range = match (self.depth_range, other.depth_range) {
            (Some((a_min, a_max)), Some((b_min, b_max))) => {
                Some((a_min.min(b_min), a_max.max(b_max)))
            }
            (a, b) => a.or(b),
        };
        Self {
            valid_pixels: self.valid_pixels + other.valid_pixels,
            skipped_pixels: self.skipped_pixels + other.skipped_pixels,
            depth_range,
            theta_solves: self.theta_solves + other.theta_solves,
            non_converged: self.non_converged + other.non_converged,
            max_iterations: self.max_iterations.max(other.max_iterations),
            max_residual: self.max_residual.max(other.max_residual),
        }
    }
}

/// The point cloud emitted for one depth image.
///
/// Points are packed in the raster order of the valid pixels: point `i` is the `i`-th
/// pixel, scanning rows top to bottom, whose calibrated sample was finite and positive.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudResult {
    vertices: Vec<f32>,
    colors: Option<Vec<f32>>,
    size: Option<ImageSize>,
    stats: ProjectionStats,
}

impl PointCloudResult {
    pub(crate) fn new(
        vertices: Vec<f32>,
        colors: Option<Vec<f32>>,
        size: Option<ImageSize>,
        stats: ProjectionStats,
    ) -> Self {
        debug_assert_eq!(vertices.len() % 3, 0);
        debug_assert!(colors.as_ref().map_or(true, |c| c.len() == vertices.len()));
        Self {
            vertices,
            colors,
            size,
            stats,
        }
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn point_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.point_count()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Packed `xyz` coordinates, `3 * point_count` values.
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// Packed `rgb` colors in `[0, 1]`, if synthesized.
    pub fn colors(&self) -> Option<&[f32]> {
        self.colors.as_deref()
    }

    /// Size of the source image.
    pub fn size(&self) -> Option<ImageSize> {
        self.size
    }

    /// Diagnostics of the projection.
    pub fn stats(&self) -> &ProjectionStats {
        &self.stats
    }

    /// Iterate over the points as `[x, y, z]`.
    pub fn points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.vertices.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }

    /// Colors quantized to 8 bits per channel for exporters.
    pub fn colors_u8(&self) -> Option<Vec<[u8; 3]>> {
        let quantize = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
        self.colors.as_ref().map(|colors| {
            colors
                .chunks_exact(3)
                .map(|c| [quantize(c[0]), quantize(c[1]), quantize(c[2])])
                .collect()
        })
    }

    /// Get the minimum and maximum corners of the point cloud.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut points = self.points().map(Vec3::from_array);
        let first = points.next()?;
        Some(points.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    /// Consume the result and return the vertex and color buffers.
    pub fn into_buffers(self) -> (Vec<f32>, Option<Vec<f32>>) {
        (self.vertices, self.colors)
    }
}
