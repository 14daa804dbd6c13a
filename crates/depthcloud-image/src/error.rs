/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when the data length does not match the image size.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when one of the image dimensions is zero.
    #[error("Invalid image size {0}x{1}, both dimensions must be non-zero")]
    InvalidImageSize(usize, usize),

    /// Error when a pixel coordinate lies outside the image.
    #[error("Pixel ({0}, {1}) is out of bounds for a {2}x{3} image")]
    PixelIndexOutOfBounds(usize, usize, usize, usize),
}
