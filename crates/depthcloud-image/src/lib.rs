#![deny(missing_docs)]
//! Depth image types shared by the readers and the projection engine.

/// depth image representation.
pub mod image;

/// Error types for the image module.
pub mod error;

pub use crate::error::ImageError;
pub use crate::image::{DepthImage, ImageSize};
