use depthcloud_image::ImageSize;

use crate::{
    camera::{
        distortion::{PolynomialDistortion, TermCriteria},
        CameraIntrinsic, CameraModel, Convention,
    },
    color::DepthColorRamp,
    depth::{CalibratedKind, DepthClamp, DepthKind, DepthMetadata, DepthUnit},
    error::DepthError,
};

/// Camera configuration supplied by the caller, e.g. a settings form or CLI flags.
///
/// Every field is optional; set fields override what the reader found in the file.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraParams {
    /// Focal length along x in pixels. Required by the time the image is projected.
    pub fx: Option<f64>,
    /// Focal length along y in pixels. Defaults to `fx`.
    pub fy: Option<f64>,
    /// Principal point x in pixels. Defaults to `(width - 1) / 2`.
    pub cx: Option<f64>,
    /// Principal point y in pixels. Defaults to `(height - 1) / 2`.
    pub cy: Option<f64>,
    /// The camera model.
    pub camera_model: Option<CameraModel>,
    /// The meaning of the raw samples.
    pub depth_type: Option<DepthKind>,
    /// The output coordinate convention.
    pub convention: Option<Convention>,
    /// The unit of depth-like samples.
    pub unit: Option<DepthUnit>,
    /// Extra multiplicative scale applied together with the unit.
    pub scale: Option<f64>,
    /// Stereo baseline in meters, required for disparity.
    pub baseline: Option<f64>,
    /// Offset added to disparity samples before conversion.
    pub disparity_offset: Option<f64>,
    /// Radial coefficient k1.
    pub k1: Option<f64>,
    /// Radial coefficient k2.
    pub k2: Option<f64>,
    /// Radial coefficient k3.
    pub k3: Option<f64>,
    /// Radial coefficient k4.
    pub k4: Option<f64>,
    /// Radial coefficient k5.
    pub k5: Option<f64>,
    /// Tangential coefficient p1.
    pub p1: Option<f64>,
    /// Tangential coefficient p2.
    pub p2: Option<f64>,
    /// Affine calibration gain.
    pub depth_scale: Option<f64>,
    /// Affine calibration offset.
    pub depth_bias: Option<f64>,
    /// Valid depth range.
    pub depth_clamp: Option<DepthClamp>,
}

impl CameraParams {
    /// Layer these parameters on top of reader supplied metadata.
    ///
    /// Fields set here win; unset fields keep the metadata value.
    pub fn apply_to(&self, meta: &DepthMetadata) -> DepthMetadata {
        let d = meta.distortion;
        DepthMetadata {
            kind: self.depth_type.unwrap_or(meta.kind),
            unit: self.unit.or(meta.unit),
            scale: self.scale.or(meta.scale),
            depth_scale: self.depth_scale.or(meta.depth_scale),
            depth_bias: self.depth_bias.or(meta.depth_bias),
            baseline: self.baseline.or(meta.baseline),
            disparity_offset: self.disparity_offset.or(meta.disparity_offset),
            depth_clamp: self.depth_clamp.or(meta.depth_clamp),
            fx: self.fx.or(meta.fx),
            fy: self.fy.or(meta.fy),
            cx: self.cx.or(meta.cx),
            cy: self.cy.or(meta.cy),
            distortion: PolynomialDistortion {
                k1: self.k1.unwrap_or(d.k1),
                k2: self.k2.unwrap_or(d.k2),
                k3: self.k3.unwrap_or(d.k3),
                k4: self.k4.unwrap_or(d.k4),
                k5: self.k5.unwrap_or(d.k5),
                p1: self.p1.unwrap_or(d.p1),
                p2: self.p2.unwrap_or(d.p2),
            },
            camera_model: self.camera_model.or(meta.camera_model),
            convention: self.convention.or(meta.convention),
        }
    }
}

/// Fully resolved parameters of one projection call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParams {
    /// The camera intrinsics.
    pub intrinsic: CameraIntrinsic,
    /// The camera model.
    pub model: CameraModel,
    /// The lens distortion coefficients.
    pub distortion: PolynomialDistortion,
    /// Whether samples are ranges or z-depths.
    pub kind: CalibratedKind,
    /// The output coordinate convention.
    pub convention: Convention,
    /// Termination criteria of the Kannala-Brandt solve.
    pub criteria: TermCriteria,
    /// The color ramp, or `None` to skip color synthesis.
    pub color: Option<DepthColorRamp>,
}

impl ProjectionParams {
    /// Ideal pinhole parameters over range samples with the default color ramp.
    pub fn new(intrinsic: CameraIntrinsic) -> Self {
        Self {
            intrinsic,
            model: CameraModel::default(),
            distortion: PolynomialDistortion::default(),
            kind: CalibratedKind::Depth,
            convention: Convention::default(),
            criteria: TermCriteria::default(),
            color: Some(DepthColorRamp::default()),
        }
    }

    /// Set the camera model.
    pub fn with_model(mut self, model: CameraModel) -> Self {
        self.model = model;
        self
    }

    /// Set the distortion coefficients.
    pub fn with_distortion(mut self, distortion: PolynomialDistortion) -> Self {
        self.distortion = distortion;
        self
    }

    /// Set the sample kind.
    pub fn with_kind(mut self, kind: CalibratedKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the output convention.
    pub fn with_convention(mut self, convention: Convention) -> Self {
        self.convention = convention;
        self
    }

    /// Set or disable the color ramp.
    pub fn with_color(mut self, color: Option<DepthColorRamp>) -> Self {
        self.color = color;
        self
    }

    /// Resolve the projection parameters from metadata.
    ///
    /// `fy` defaults to `fx`, and the principal point defaults to the image center
    /// `((width - 1) / 2, (height - 1) / 2)`.
    ///
    /// # Errors
    ///
    /// Fails when `fx` is missing, when a focal length is not finite and positive, or
    /// when the principal point is not finite.
    pub fn from_metadata(
        meta: &DepthMetadata,
        kind: CalibratedKind,
        size: ImageSize,
    ) -> Result<Self, DepthError> {
        let fx = meta.fx.ok_or(DepthError::MissingFocalLength)?;
        let fy = meta.fy.unwrap_or(fx);
        for f in [fx, fy] {
            if !f.is_finite() || f <= 0.0 {
                return Err(DepthError::InvalidFocalLength(f));
            }
        }

        let cx = meta.cx.unwrap_or((size.width as f64 - 1.0) / 2.0);
        let cy = meta.cy.unwrap_or((size.height as f64 - 1.0) / 2.0);
        if !cx.is_finite() || !cy.is_finite() {
            return Err(DepthError::InvalidPrincipalPoint(cx, cy));
        }

        Ok(Self {
            model: meta.camera_model.unwrap_or_default(),
            distortion: meta.distortion,
            kind,
            convention: meta.convention.unwrap_or_default(),
            ..Self::new(CameraIntrinsic { fx, fy, cx, cy })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() -> Result<(), DepthError> {
        let meta = DepthMetadata {
            fx: Some(100.0),
            ..Default::default()
        };
        let params =
            ProjectionParams::from_metadata(&meta, CalibratedKind::Z, [101, 51].into())?;
        assert_eq!(
            params.intrinsic,
            CameraIntrinsic {
                fx: 100.0,
                fy: 100.0,
                cx: 50.0,
                cy: 25.0,
            }
        );
        assert_eq!(params.model, CameraModel::PinholeIdeal);
        assert_eq!(params.convention, Convention::Opencv);
        assert_eq!(params.kind, CalibratedKind::Z);
        assert!(params.color.is_some());
        Ok(())
    }

    #[test]
    fn test_resolve_rejects_bad_focal() {
        let size = [4, 4].into();
        let meta = DepthMetadata::default();
        assert_eq!(
            ProjectionParams::from_metadata(&meta, CalibratedKind::Depth, size),
            Err(DepthError::MissingFocalLength)
        );

        let meta = DepthMetadata {
            fx: Some(-1.0),
            ..Default::default()
        };
        assert_eq!(
            ProjectionParams::from_metadata(&meta, CalibratedKind::Depth, size),
            Err(DepthError::InvalidFocalLength(-1.0))
        );

        let meta = DepthMetadata {
            fx: Some(10.0),
            fy: Some(0.0),
            ..Default::default()
        };
        assert_eq!(
            ProjectionParams::from_metadata(&meta, CalibratedKind::Depth, size),
            Err(DepthError::InvalidFocalLength(0.0))
        );
    }

    #[test]
    fn test_apply_to_overrides() {
        let meta = DepthMetadata {
            fx: Some(500.0),
            cx: Some(10.0),
            baseline: Some(0.2),
            distortion: PolynomialDistortion {
                k1: 0.1,
                p1: 0.01,
                ..Default::default()
            },
            camera_model: Some(CameraModel::PinholeOpencv),
            ..DepthMetadata::new(DepthKind::Disparity)
        };
        let params = CameraParams {
            fx: Some(600.0),
            k1: Some(0.3),
            depth_type: Some(DepthKind::Disparity),
            convention: Some(Convention::Opengl),
            ..Default::default()
        };

        let merged = params.apply_to(&meta);
        assert_eq!(merged.fx, Some(600.0));
        assert_eq!(merged.cx, Some(10.0));
        assert_eq!(merged.baseline, Some(0.2));
        assert_eq!(merged.distortion.k1, 0.3);
        assert_eq!(merged.distortion.p1, 0.01);
        assert_eq!(merged.camera_model, Some(CameraModel::PinholeOpencv));
        assert_eq!(merged.convention, Some(Convention::Opengl));
        assert_eq!(merged.kind, DepthKind::Disparity);
    }

    #[test]
    fn test_camera_params_json() -> Result<(), serde_json::Error> {
        let params: CameraParams = serde_json::from_str(
            r#"{
                "fx": 525.0,
                "cameraModel": "fisheye-kannala-brandt",
                "depthType": "inverse_depth",
                "convention": "opencv",
                "k5": 0.002,
                "depthClamp": {"min": 0.1}
            }"#,
        )?;
        assert_eq!(params.fx, Some(525.0));
        assert_eq!(params.camera_model, Some(CameraModel::FisheyeKannalaBrandt));
        assert_eq!(params.depth_type, Some(DepthKind::InverseDepth));
        assert_eq!(params.k5, Some(0.002));
        assert_eq!(params.depth_clamp.and_then(|c| c.min), Some(0.1));
        assert!(params.fy.is_none());

        assert!(serde_json::from_str::<CameraParams>(r#"{"cameraModel": "fisheye"}"#).is_err());
        Ok(())
    }
}
