use depthcloud_image::ImageError;

use crate::depth::DepthKind;

/// An error type for the depth to point cloud engine.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DepthError {
    /// The input image is malformed.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// No focal length was supplied.
    #[error("Focal length fx is required")]
    MissingFocalLength,

    /// The focal length is not finite or not positive.
    #[error("Focal length must be finite and > 0, got {0}")]
    InvalidFocalLength(f64),

    /// The principal point is not finite.
    #[error("Principal point must be finite, got ({0}, {1})")]
    InvalidPrincipalPoint(f64, f64),

    /// Disparity samples cannot be converted without a focal length and a baseline.
    #[error("Disparity to depth requires fx > 0 and baseline > 0, got fx={fx:?} baseline={baseline:?}")]
    MissingDisparityParams {
        /// The focal length that was supplied, if any.
        fx: Option<f64>,
        /// The stereo baseline that was supplied, if any.
        baseline: Option<f64>,
    },

    /// The samples still hold a kind the projector cannot interpret.
    #[error("Samples of kind {0} must be converted to depth before projection")]
    UnconvertedKind(DepthKind),

    /// The clamp range is empty.
    #[error("Invalid depth clamp: min ({min}) is greater than max ({max})")]
    InvalidClamp {
        /// Lower bound of the clamp.
        min: f64,
        /// Upper bound of the clamp.
        max: f64,
    },

    /// The camera model name is not one of the supported models.
    #[error("Unknown camera model: {0}")]
    UnknownCameraModel(String),

    /// The depth kind name is not one of the supported kinds.
    #[error("Unknown depth kind: {0}")]
    UnknownDepthKind(String),

    /// The depth unit name is not one of the supported units.
    #[error("Unknown depth unit: {0}")]
    UnknownDepthUnit(String),

    /// The convention name is not one of the supported conventions.
    #[error("Unknown coordinate convention: {0}")]
    UnknownConvention(String),

    /// The projection was cancelled by the caller.
    #[error("Projection cancelled after {rows_done} of {rows_total} rows")]
    Cancelled {
        /// Number of rows processed before cancellation was observed.
        rows_done: usize,
        /// Number of rows in the image.
        rows_total: usize,
    },

    /// The chunk size of a row based strategy is zero.
    #[error("Rows per chunk must be > 0")]
    InvalidChunkRows,

    /// The requested thread count is invalid.
    #[error("Thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),

    /// The local thread pool failed to build.
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(String),
}
