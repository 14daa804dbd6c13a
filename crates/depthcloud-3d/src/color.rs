/// Grayscale ramp over log depth.
///
/// The closest point maps to `min_gray` and the farthest to white, so that after the
/// renderer's own attenuation near points read bright and far points dim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthColorRamp {
    /// Gray level of the smallest depth, in `[0, 1]`.
    pub min_gray: f32,
    /// Exponent applied to the normalized log depth.
    pub gamma: f32,
}

impl Default for DepthColorRamp {
    fn default() -> Self {
        Self {
            min_gray: 0.2,
            gamma: 1.0,
        }
    }
}

/// Log depth bounds of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogDepthRange {
    /// Natural log of the smallest depth.
    pub log_min: f64,
    /// Natural log of the largest depth.
    pub log_max: f64,
}

impl LogDepthRange {
    /// Bounds from the smallest and largest depth.
    pub fn from_depths(min_depth: f64, max_depth: f64) -> Self {
        Self {
            log_min: min_depth.ln(),
            log_max: max_depth.ln(),
        }
    }

    /// Position of `log_depth` in the range, `1.0` when the range is empty.
    #[inline]
    pub fn normalize(&self, log_depth: f64) -> f64 {
        let denom = self.log_max - self.log_min;
        if denom > 0.0 {
            ((log_depth - self.log_min) / denom).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

impl DepthColorRamp {
    /// Gray level of one point.
    #[inline]
    pub fn gray(&self, log_depth: f64, range: &LogDepthRange) -> f32 {
        let mut s = range.normalize(log_depth);
        if self.gamma != 1.0 {
            s = s.powf(self.gamma as f64);
        }
        let min_gray = self.min_gray as f64;
        (min_gray + (1.0 - min_gray) * s) as f32
    }

    /// Packed `rgb` colors for a list of log depths.
    ///
    /// # Arguments
    ///
    /// * `log_depths` - The natural log of each point depth, in emission order.
    /// * `range` - The log depth bounds over all points.
    ///
    /// # Returns
    ///
    /// A buffer of `3 * log_depths.len()` values in `[0, 1]`.
    pub fn colorize(&self, log_depths: &[f64], range: &LogDepthRange) -> Vec<f32> {
        let mut colors = Vec::with_capacity(log_depths.len() * 3);
        for &log_depth in log_depths {
            let gray = self.gray(log_depth, range);
            colors.extend_from_slice(&[gray, gray, gray]);
        }
        colors
    }
}
