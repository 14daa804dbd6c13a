/// Represents the polynomial distortion parameters of a camera
///
/// The same coefficients are read differently depending on the camera model:
///
/// * `pinhole-opencv` uses `k1..k3` radial and `p1, p2` tangential terms.
/// * `fisheye-opencv` uses `k1..k4` as even radial terms.
/// * `fisheye-kannala-brandt` uses `k1..k5` as the odd polynomial `r(theta)`.
///
/// Every coefficient defaults to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PolynomialDistortion {
    /// The first radial distortion coefficient
    pub k1: f64,
    /// The second radial distortion coefficient
    pub k2: f64,
    /// The third radial distortion coefficient
    pub k3: f64,
    /// The fourth radial distortion coefficient
    pub k4: f64,
    /// The fifth radial distortion coefficient
    pub k5: f64,
    /// The first tangential distortion coefficient
    pub p1: f64,
    /// The second tangential distortion coefficient
    pub p2: f64,
}

impl PolynomialDistortion {
    /// Check if there is any distortion.
    pub fn has_distortion(&self) -> bool {
        [self.k1, self.k2, self.k3, self.k4, self.k5, self.p1, self.p2]
            .iter()
            .any(|&k| k != 0.0)
    }
}

/// Termination criteria of an iterative solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermCriteria {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Residual and derivative magnitude tolerance.
    pub eps: f64,
}

impl Default for TermCriteria {
    fn default() -> Self {
        Self {
            max_iter: 10,
            eps: 1e-12,
        }
    }
}

/// Outcome of inverting the Kannala-Brandt polynomial for one radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThetaSolve {
    /// The incidence angle estimate in radians.
    pub theta: f64,
    /// Number of Newton updates applied.
    pub iterations: usize,
    /// `|r(theta) - r|` at the returned estimate.
    pub residual: f64,
    /// Whether the residual dropped below the tolerance.
    pub converged: bool,
}

/// Single-step OpenCV style correction of normalized pinhole coordinates.
///
/// This is not an iterative undistortion: the radial factor and the tangential terms are
/// evaluated once at `(xn, yn)`.
///
/// # Arguments
///
/// * `xn` - The normalized x coordinate `(u - cx) / fx`
/// * `yn` - The normalized y coordinate `(v - cy) / fy`
/// * `distortion` - The distortion parameters of the camera
///
/// # Returns
///
/// The corrected normalized coordinates.
pub fn correct_normalized_opencv(
    xn: f64,
    yn: f64,
    distortion: &PolynomialDistortion,
) -> (f64, f64) {
    let PolynomialDistortion { k1, k2, k3, p1, p2, .. } = *distortion;

    let r2 = xn * xn + yn * yn;

    // radial distortion
    let kr = 1.0 + k1 * r2 + k2 * r2 * r2 + k3 * r2 * r2 * r2;

    // tangential distortion
    let dx = 2.0 * p1 * xn * yn + p2 * (r2 + 2.0 * xn * xn);
    let dy = p1 * (r2 + 2.0 * yn * yn) + 2.0 * p2 * xn * yn;

    (xn * kr + dx, yn * kr + dy)
}

/// Incidence angle of an OpenCV fisheye pixel at normalized radius `rn = r / fx`.
///
/// `theta = rn * (1 + k1 rn^2 + k2 rn^4 + k3 rn^6 + k4 rn^8)`
pub fn fisheye_opencv_theta(rn: f64, distortion: &PolynomialDistortion) -> f64 {
    let PolynomialDistortion { k1, k2, k3, k4, .. } = *distortion;
    let r2 = rn * rn;
    let r4 = r2 * r2;
    rn * (1.0 + k1 * r2 + k2 * r4 + k3 * r4 * r2 + k4 * r4 * r4)
}

/// Evaluate the Kannala-Brandt polynomial and its derivative at `theta`.
///
/// `r(theta) = k1 theta + k2 theta^3 + k3 theta^5 + k4 theta^7 + k5 theta^9`
///
/// # Returns
///
/// The tuple `(r(theta), r'(theta))`.
pub fn kannala_brandt_radius(theta: f64, distortion: &PolynomialDistortion) -> (f64, f64) {
    let PolynomialDistortion { k1, k2, k3, k4, k5, .. } = *distortion;
    let t2 = theta * theta;

    // horner in theta^2
    let r = theta * (k1 + t2 * (k2 + t2 * (k3 + t2 * (k4 + t2 * k5))));
    let dr = k1 + t2 * (3.0 * k2 + t2 * (5.0 * k3 + t2 * (7.0 * k4 + t2 * 9.0 * k5)));

    (r, dr)
}

/// Invert the Kannala-Brandt polynomial with Newton-Raphson.
///
/// The solve starts at `theta0` and stops when `|r(theta) - r| < eps`, when the derivative
/// magnitude drops below `eps` or after `max_iter` updates. The last finite estimate is
/// returned in every case; `converged` tells the caller which exit was taken.
///
/// # Arguments
///
/// * `r` - The observed radius
/// * `theta0` - The initial guess, typically `r / fx`
/// * `distortion` - The polynomial coefficients `k1..k5`
/// * `criteria` - The termination criteria
pub fn kannala_brandt_theta(
    r: f64,
    theta0: f64,
    distortion: &PolynomialDistortion,
    criteria: &TermCriteria,
) -> ThetaSolve {
    let mut theta = theta0;
    let mut iterations = 0;

    loop {
        let (r_theta, dr) = kannala_brandt_radius(theta, distortion);
        let residual = (r_theta - r).abs();

        if residual < criteria.eps {
            return ThetaSolve {
                theta,
                iterations,
                residual,
                converged: true,
            };
        }

        if iterations >= criteria.max_iter || dr.abs() < criteria.eps {
            return ThetaSolve {
                theta,
                iterations,
                residual,
                converged: false,
            };
        }

        let next = theta - (r_theta - r) / dr;
        if !next.is_finite() {
            return ThetaSolve {
                theta,
                iterations,
                residual,
                converged: false,
            };
        }

        theta = next;
        iterations += 1;
    }
}
