use depthcloud_image::DepthImage;

use super::{CalibratedKind, DepthClamp, DepthKind, DepthMetadata};
use crate::error::DepthError;

/// Disparity denominators at or below this value produce an invalid sample.
pub const DISPARITY_EPSILON: f64 = 1e-8;

/// A depth image holding calibrated distances in meters.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDepth {
    /// The calibrated samples. Invalid samples are NaN.
    pub image: DepthImage,
    /// How the samples must be back-projected.
    pub kind: CalibratedKind,
}

#[derive(Debug, Clone, Copy)]
enum KindConversion {
    None,
    Disparity { focal_baseline: f64, offset: f64 },
    InverseDepth { factor: f64 },
}

/// The per-sample calibration resolved from the metadata.
#[derive(Debug, Clone, Copy)]
struct SampleTransform {
    unit_factor: Option<f64>,
    affine: Option<(f64, f64)>,
    conversion: KindConversion,
    clamp: Option<DepthClamp>,
}

impl SampleTransform {
    fn from_metadata(meta: &DepthMetadata) -> Result<Self, DepthError> {
        let clamp = meta.depth_clamp.filter(DepthClamp::is_bounded);
        if let Some(clamp) = clamp {
            clamp.validate()?;
        }

        let unit_factor = match meta.kind {
            DepthKind::Depth | DepthKind::Z => meta.unit_factor(),
            DepthKind::Disparity | DepthKind::InverseDepth => None,
        };

        let affine = match (meta.depth_scale, meta.depth_bias) {
            (None, None) => None,
            (scale, bias) => Some((scale.unwrap_or(1.0), bias.unwrap_or(0.0))),
        };

        let conversion = match meta.kind {
            DepthKind::Depth | DepthKind::Z => KindConversion::None,
            DepthKind::Disparity => match (meta.fx, meta.baseline) {
                (Some(fx), Some(baseline))
                    if fx.is_finite() && fx > 0.0 && baseline.is_finite() && baseline > 0.0 =>
                {
                    KindConversion::Disparity {
                        focal_baseline: fx * baseline,
                        offset: meta.disparity_offset.unwrap_or(0.0),
                    }
                }
                (fx, baseline) => return Err(DepthError::MissingDisparityParams { fx, baseline }),
            },
            DepthKind::InverseDepth => KindConversion::InverseDepth {
                factor: meta.unit_factor().unwrap_or(1.0),
            },
        };

        Ok(Self {
            unit_factor,
            affine,
            conversion,
            clamp,
        })
    }

    #[inline]
    fn apply(&self, sample: f32) -> f32 {
        let mut x = sample as f64;

        if let Some(factor) = self.unit_factor {
            x *= factor;
        }

        if let Some((scale, bias)) = self.affine {
            if x.is_finite() {
                x = x * scale + bias;
            }
        }

        x = match self.conversion {
            KindConversion::None => x,
            KindConversion::Disparity {
                focal_baseline,
                offset,
            } => {
                let denom = x + offset;
                // also rejects NaN
                if denom > DISPARITY_EPSILON {
                    focal_baseline / denom
                } else {
                    f64::NAN
                }
            }
            KindConversion::InverseDepth { factor } => {
                let inverse = x * factor;
                if inverse > 0.0 {
                    1.0 / inverse
                } else {
                    f64::NAN
                }
            }
        };

        if let Some(clamp) = self.clamp {
            if !clamp.contains(x) {
                x = f64::NAN;
            }
        }

        x as f32
    }
}

/// Convert raw samples into calibrated depth in meters.
///
/// The steps run in a fixed order, each only when its inputs are present:
///
/// 1. unit and scale, for `depth` and `z` samples;
/// 2. affine calibration `sample * depth_scale + depth_bias` on finite samples;
/// 3. kind conversion, `fx * baseline / (disparity + offset)` for disparity and
///    `1 / (inverse * unit_factor)` for inverse depth;
/// 4. range clamp, samples outside the clamp become NaN.
///
/// # Arguments
///
/// * `image` - The raw samples. The image is left untouched.
/// * `meta` - The metadata describing the samples.
///
/// # Errors
///
/// Disparity samples without a positive `fx` and `baseline` are rejected with
/// [`DepthError::MissingDisparityParams`]; an empty clamp range is rejected with
/// [`DepthError::InvalidClamp`].
///
/// # Example
///
/// ```
/// use depthcloud_3d::depth::{normalize_depth, DepthKind, DepthMetadata};
/// use depthcloud_image::DepthImage;
///
/// let disparity = DepthImage::new([2, 1].into(), vec![25.0, 0.0]).unwrap();
/// let meta = DepthMetadata {
///     fx: Some(500.0),
///     baseline: Some(0.1),
///     ..DepthMetadata::new(DepthKind::Disparity)
/// };
///
/// let depth = normalize_depth(&disparity, &meta).unwrap();
/// assert_eq!(depth.image.as_slice()[0], 2.0);
/// assert!(depth.image.as_slice()[1].is_nan());
/// ```
pub fn normalize_depth(
    image: &DepthImage,
    meta: &DepthMetadata,
) -> Result<NormalizedDepth, DepthError> {
    let transform = SampleTransform::from_metadata(meta)?;

    log::debug!(
        "normalizing {} {} samples: unit_factor={:?} affine={:?} conversion={:?} clamp={:?}",
        image.size(),
        meta.kind,
        transform.unit_factor,
        transform.affine,
        transform.conversion,
        transform.clamp,
    );

    let calibrated = image.map(|sample| transform.apply(sample));

    if log::log_enabled!(log::Level::Trace) {
        let invalid_before = image.as_slice().iter().filter(|x| !x.is_finite()).count();
        let invalid_after = calibrated
            .as_slice()
            .iter()
            .filter(|x| !x.is_finite())
            .count();
        log::trace!(
            "normalization invalidated {} samples ({} already invalid)",
            invalid_after.saturating_sub(invalid_before),
            invalid_before,
        );
    }

    Ok(NormalizedDepth {
        image: calibrated,
        kind: meta.kind.normalized(),
    })
}
