use std::{fmt, str::FromStr};

use crate::{
    camera::{distortion::PolynomialDistortion, CameraModel, Convention},
    error::DepthError,
};

mod normalize;

pub use normalize::{normalize_depth, NormalizedDepth, DISPARITY_EPSILON};

/// The physical meaning of a raw depth sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthKind {
    /// Euclidean distance from the camera center along the pixel ray.
    #[default]
    Depth,
    /// Stereo disparity in pixels.
    Disparity,
    /// Reciprocal of the distance.
    #[serde(alias = "inverse-depth")]
    InverseDepth,
    /// Distance measured along the optical axis.
    Z,
}

impl DepthKind {
    /// The canonical name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            DepthKind::Depth => "depth",
            DepthKind::Disparity => "disparity",
            DepthKind::InverseDepth => "inverse_depth",
            DepthKind::Z => "z",
        }
    }

    /// The kind the samples have after normalization.
    pub fn normalized(&self) -> CalibratedKind {
        match self {
            DepthKind::Z => CalibratedKind::Z,
            DepthKind::Depth | DepthKind::Disparity | DepthKind::InverseDepth => {
                CalibratedKind::Depth
            }
        }
    }
}

impl fmt::Display for DepthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepthKind {
    type Err = DepthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "depth" => Ok(DepthKind::Depth),
            "disparity" => Ok(DepthKind::Disparity),
            "inverse_depth" | "inverse-depth" => Ok(DepthKind::InverseDepth),
            "z" => Ok(DepthKind::Z),
            _ => Err(DepthError::UnknownDepthKind(s.to_string())),
        }
    }
}

/// Depth kinds the projector accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalibratedKind {
    /// The sample is a range along the pixel ray.
    Depth,
    /// The sample is a distance along the optical axis.
    Z,
}

impl TryFrom<DepthKind> for CalibratedKind {
    type Error = DepthError;

    fn try_from(kind: DepthKind) -> Result<Self, Self::Error> {
        match kind {
            DepthKind::Depth => Ok(CalibratedKind::Depth),
            DepthKind::Z => Ok(CalibratedKind::Z),
            DepthKind::Disparity | DepthKind::InverseDepth => {
                Err(DepthError::UnconvertedKind(kind))
            }
        }
    }
}

impl From<CalibratedKind> for DepthKind {
    fn from(kind: CalibratedKind) -> Self {
        match kind {
            CalibratedKind::Depth => DepthKind::Depth,
            CalibratedKind::Z => DepthKind::Z,
        }
    }
}

/// Length unit of raw depth samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthUnit {
    /// Meters.
    #[default]
    #[serde(alias = "m")]
    Meter,
    /// Millimeters.
    #[serde(alias = "mm")]
    Millimeter,
}

impl DepthUnit {
    /// Factor converting a sample in this unit to meters.
    pub fn to_meters(&self) -> f64 {
        match self {
            DepthUnit::Meter => 1.0,
            DepthUnit::Millimeter => 1.0 / 1000.0,
        }
    }
}

impl FromStr for DepthUnit {
    type Err = DepthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "meter" | "m" => Ok(DepthUnit::Meter),
            "millimeter" | "mm" => Ok(DepthUnit::Millimeter),
            _ => Err(DepthError::UnknownDepthUnit(s.to_string())),
        }
    }
}

/// Valid depth range; samples outside become invalid.
///
/// Both bounds are inclusive and independently optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DepthClamp {
    /// Smallest valid depth.
    pub min: Option<f64>,
    /// Largest valid depth.
    pub max: Option<f64>,
}

impl DepthClamp {
    /// Check that the range is not empty.
    pub fn validate(&self) -> Result<(), DepthError> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min > max => Err(DepthError::InvalidClamp { min, max }),
            _ => Ok(()),
        }
    }

    /// Whether the sample lies within the range.
    ///
    /// NaN never lies within a range that has at least one bound.
    #[inline]
    pub fn contains(&self, sample: f64) -> bool {
        self.min.map_or(true, |min| sample >= min) && self.max.map_or(true, |max| sample <= max)
    }

    /// Whether any bound is set.
    pub fn is_bounded(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }
}

/// Metadata describing how raw samples of a depth image must be interpreted.
///
/// Readers fill in what the file carries; [`crate::params::CameraParams::apply_to`] layers
/// the caller configuration on top.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DepthMetadata {
    /// The meaning of the raw samples.
    #[serde(alias = "depthType")]
    pub kind: DepthKind,
    /// The unit of depth-like samples.
    pub unit: Option<DepthUnit>,
    /// Extra multiplicative scale applied together with the unit.
    pub scale: Option<f64>,
    /// Affine calibration gain.
    pub depth_scale: Option<f64>,
    /// Affine calibration offset.
    pub depth_bias: Option<f64>,
    /// Stereo baseline in meters.
    pub baseline: Option<f64>,
    /// Offset added to disparity samples before conversion.
    pub disparity_offset: Option<f64>,
    /// Valid depth range.
    pub depth_clamp: Option<DepthClamp>,
    /// Focal length along x in pixels.
    pub fx: Option<f64>,
    /// Focal length along y in pixels.
    pub fy: Option<f64>,
    /// Principal point x in pixels.
    pub cx: Option<f64>,
    /// Principal point y in pixels.
    pub cy: Option<f64>,
    /// Lens distortion coefficients.
    #[serde(flatten)]
    pub distortion: PolynomialDistortion,
    /// The camera model.
    pub camera_model: Option<CameraModel>,
    /// The output coordinate convention.
    pub convention: Option<Convention>,
}

impl DepthMetadata {
    /// Metadata for samples of the given kind with everything else unset.
    pub fn new(kind: DepthKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Combined unit and scale factor, when either is present.
    pub fn unit_factor(&self) -> Option<f64> {
        if self.unit.is_none() && self.scale.is_none() {
            return None;
        }
        let unit = self.unit.map_or(1.0, |unit| unit.to_meters());
        Some(unit * self.scale.unwrap_or(1.0))
    }
}
