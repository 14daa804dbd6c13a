use super::{
    distortion::{
        correct_normalized_opencv, fisheye_opencv_theta, kannala_brandt_theta,
        PolynomialDistortion, TermCriteria, ThetaSolve,
    },
    CameraIntrinsic, CameraModel,
};

/// Rays whose optical axis component is below this value cannot be scaled to a z-depth.
const MIN_RAY_Z: f64 = 1e-8;

/// The viewing ray through one pixel.
///
/// Pinhole rays are kept on the `z = 1` plane so that z-depth scaling is exact; fisheye
/// rays are unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRay {
    /// The ray direction in the OpenCV camera frame.
    pub direction: [f64; 3],
    /// The Kannala-Brandt solve that produced the ray, if any.
    pub theta_solve: Option<ThetaSolve>,
}

impl PixelRay {
    fn new(direction: [f64; 3]) -> Self {
        Self {
            direction,
            theta_solve: None,
        }
    }

    fn from_theta(du: f64, dv: f64, r: f64, theta: f64) -> Self {
        let (sin_theta, cos_theta) = theta.sin_cos();
        Self::new([du / r * sin_theta, dv / r * sin_theta, cos_theta])
    }

    /// The unit length direction of the ray.
    pub fn unit_direction(&self) -> [f64; 3] {
        let [x, y, z] = self.direction;
        let norm = (x * x + y * y + z * z).sqrt();
        [x / norm, y / norm, z / norm]
    }

    /// The point at Euclidean distance `range` from the camera center.
    pub fn point_at_range(&self, range: f64) -> [f64; 3] {
        let [x, y, z] = self.unit_direction();
        [x * range, y * range, z * range]
    }

    /// The point whose coordinate along the optical axis is `depth`.
    ///
    /// Rays at or beyond 90 degrees from the optical axis never reach that plane; for those
    /// the sample is used as a range instead.
    pub fn point_at_z(&self, depth: f64) -> [f64; 3] {
        let [x, y, z] = self.direction;
        if z <= MIN_RAY_Z {
            return self.point_at_range(depth);
        }
        let s = depth / z;
        [x * s, y * s, z * s]
    }
}

/// Casts viewing rays through pixels for a fixed camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCaster {
    /// The camera model.
    pub model: CameraModel,
    /// The camera intrinsics.
    pub intrinsic: CameraIntrinsic,
    /// The lens distortion coefficients.
    pub distortion: PolynomialDistortion,
    /// Termination criteria of the Kannala-Brandt solve.
    pub criteria: TermCriteria,
}

impl RayCaster {
    /// Create a ray caster with the default Kannala-Brandt termination criteria.
    pub fn new(
        model: CameraModel,
        intrinsic: CameraIntrinsic,
        distortion: PolynomialDistortion,
    ) -> Self {
        Self {
            model,
            intrinsic,
            distortion,
            criteria: TermCriteria::default(),
        }
    }

    /// Cast the ray through pixel `(u, v)`.
    pub fn cast(&self, u: f64, v: f64) -> PixelRay {
        match self.model {
            CameraModel::PinholeIdeal => {
                let (xn, yn) = self.intrinsic.normalize(u, v);
                PixelRay::new([xn, yn, 1.0])
            }
            CameraModel::PinholeOpencv => {
                let (xn, yn) = self.intrinsic.normalize(u, v);
                let (x, y) = correct_normalized_opencv(xn, yn, &self.distortion);
                PixelRay::new([x, y, 1.0])
            }
            CameraModel::FisheyeEquidistant => self.cast_fisheye(u, v, |r| r / self.intrinsic.fx),
            CameraModel::FisheyeOpencv => self.cast_fisheye(u, v, |r| {
                fisheye_opencv_theta(r / self.intrinsic.fx, &self.distortion)
            }),
            CameraModel::FisheyeKannalaBrandt => {
                let (du, dv) = (u - self.intrinsic.cx, v - self.intrinsic.cy);
                let r = du.hypot(dv);
                if r == 0.0 {
                    return PixelRay::new([0.0, 0.0, 1.0]);
                }
                let solve =
                    kannala_brandt_theta(r, r / self.intrinsic.fx, &self.distortion, &self.criteria);
                PixelRay {
                    theta_solve: Some(solve),
                    ..PixelRay::from_theta(du, dv, r, solve.theta)
                }
            }
        }
    }

    fn cast_fisheye(&self, u: f64, v: f64, theta_of: impl Fn(f64) -> f64) -> PixelRay {
        let (du, dv) = (u - self.intrinsic.cx, v - self.intrinsic.cy);
        let r = du.hypot(dv);
        if r == 0.0 {
            return PixelRay::new([0.0, 0.0, 1.0]);
        }
        PixelRay::from_theta(du, dv, r, theta_of(r))
    }
}
