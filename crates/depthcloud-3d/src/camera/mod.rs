use std::{fmt, str::FromStr};

use crate::error::DepthError;

/// Lens distortion models and their inversion.
pub mod distortion;

/// Pixel to ray back-projection for every camera model.
pub mod ray;

/// Represents the instrinsic parameters of a pinhole camera
///
/// # Fields
///
/// * `fx` - The focal length in the x direction
/// * `fy` - The focal length in the y direction
/// * `cx` - The x coordinate of the principal point
/// * `cy` - The y coordinate of the principal point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsic {
    /// The focal length in the x direction
    pub fx: f64,
    /// The focal length in the y direction
    pub fy: f64,
    /// The x coordinate of the principal point
    pub cx: f64,
    /// The y coordinate of the principal point
    pub cy: f64,
}

impl CameraIntrinsic {
    /// Normalized image plane coordinates of the pixel `(u, v)`.
    #[inline]
    pub fn normalize(&self, u: f64, v: f64) -> (f64, f64) {
        ((u - self.cx) / self.fx, (v - self.cy) / self.fy)
    }
}

/// The lens projection used to turn a pixel into a viewing ray.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraModel {
    /// Rectilinear projection without distortion.
    #[default]
    PinholeIdeal,
    /// Rectilinear projection with OpenCV radial and tangential correction.
    PinholeOpencv,
    /// Fisheye with `theta = r / fx`.
    FisheyeEquidistant,
    /// Equidistant fisheye with an OpenCV style radial correction.
    FisheyeOpencv,
    /// Fisheye with the Kannala-Brandt odd polynomial, inverted numerically.
    FisheyeKannalaBrandt,
}

impl CameraModel {
    /// All supported camera models.
    pub const ALL: [CameraModel; 5] = [
        CameraModel::PinholeIdeal,
        CameraModel::PinholeOpencv,
        CameraModel::FisheyeEquidistant,
        CameraModel::FisheyeOpencv,
        CameraModel::FisheyeKannalaBrandt,
    ];

    /// The canonical name of the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraModel::PinholeIdeal => "pinhole-ideal",
            CameraModel::PinholeOpencv => "pinhole-opencv",
            CameraModel::FisheyeEquidistant => "fisheye-equidistant",
            CameraModel::FisheyeOpencv => "fisheye-opencv",
            CameraModel::FisheyeKannalaBrandt => "fisheye-kannala-brandt",
        }
    }

    /// Whether the model is one of the fisheye variants.
    pub fn is_fisheye(&self) -> bool {
        !matches!(self, CameraModel::PinholeIdeal | CameraModel::PinholeOpencv)
    }
}

impl fmt::Display for CameraModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraModel {
    type Err = DepthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        CameraModel::ALL
            .into_iter()
            .find(|model| model.as_str() == name)
            .ok_or_else(|| DepthError::UnknownCameraModel(s.to_string()))
    }
}

/// Orientation of the emitted coordinate axes.
///
/// Points are computed in the OpenCV camera frame (X right, Y down, Z forward).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Convention {
    /// X right, Y up, Z backward.
    Opengl,
    /// X right, Y down, Z forward.
    #[default]
    Opencv,
}

impl Convention {
    /// Express a point given in the OpenCV camera frame in this convention.
    ///
    /// The transform is its own inverse.
    #[inline]
    pub fn apply(&self, point: [f32; 3]) -> [f32; 3] {
        match self {
            Convention::Opengl => [point[0], -point[1], -point[2]],
            Convention::Opencv => point,
        }
    }

    /// Apply the convention to a packed `xyz` vertex buffer in place.
    pub fn apply_in_place(&self, vertices: &mut [f32]) {
        if *self == Convention::Opencv {
            return;
        }
        vertices.chunks_exact_mut(3).for_each(|p| {
            let [x, y, z] = self.apply([p[0], p[1], p[2]]);
            p.copy_from_slice(&[x, y, z]);
        });
    }
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Convention::Opengl => f.write_str("opengl"),
            Convention::Opencv => f.write_str("opencv"),
        }
    }
}

impl FromStr for Convention {
    type Err = DepthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "opengl" => Ok(Convention::Opengl),
            "opencv" => Ok(Convention::Opencv),
            _ => Err(DepthError::UnknownConvention(s.to_string())),
        }
    }
}
