use crate::error::ImageError;

/// Image size in pixels
///
/// A struct to represent the size of an image in pixels.
///
/// # Examples
///
/// ```
/// use depthcloud_image::ImageSize;
///
/// let image_size = ImageSize {
///   width: 10,
///   height: 20,
/// };
///
/// assert_eq!(image_size.width, 10);
/// assert_eq!(image_size.height, 20);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageSize {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
}

impl ImageSize {
    /// Number of pixels covered by this size.
    #[inline]
    pub fn num_pixels(&self) -> usize {
        self.width * self.height
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "ImageSize {{ width: {}, height: {} }}",
            self.width, self.height
        )
    }
}

impl From<[usize; 2]> for ImageSize {
    fn from(size: [usize; 2]) -> Self {
        ImageSize {
            width: size[0],
            height: size[1],
        }
    }
}

/// A single channel image of `f32` samples.
///
/// The samples are stored row-major with the origin at the top-left corner, so pixel
/// `(u, v)` lives at index `v * width + u`. The meaning of the samples (depth, disparity,
/// inverse depth, ...) is carried separately by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthImage {
    size: ImageSize,
    data: Vec<f32>,
}

impl DepthImage {
    /// Create a new depth image from raster data.
    ///
    /// # Arguments
    ///
    /// * `size` - The size of the image in pixels.
    /// * `data` - The samples in row-major order.
    ///
    /// # Errors
    ///
    /// If one of the dimensions is zero or the length of the data does not match the
    /// image size, an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use depthcloud_image::{DepthImage, ImageSize};
    ///
    /// let image = DepthImage::new(
    ///     ImageSize {
    ///         width: 4,
    ///         height: 2,
    ///     },
    ///     vec![1.0f32; 8],
    /// ).unwrap();
    ///
    /// assert_eq!(image.width(), 4);
    /// assert_eq!(image.height(), 2);
    /// ```
    pub fn new(size: ImageSize, data: Vec<f32>) -> Result<Self, ImageError> {
        if size.width == 0 || size.height == 0 {
            return Err(ImageError::InvalidImageSize(size.width, size.height));
        }

        if data.len() != size.num_pixels() {
            return Err(ImageError::InvalidChannelShape(
                data.len(),
                size.num_pixels(),
            ));
        }

        Ok(Self { size, data })
    }

    /// Create a new depth image filled with the same value.
    pub fn from_size_val(size: ImageSize, val: f32) -> Result<Self, ImageError> {
        Self::new(size, vec![val; size.num_pixels()])
    }

    /// Create a new depth image by evaluating `f(u, v)` at every pixel.
    pub fn from_fn(
        size: ImageSize,
        f: impl Fn(usize, usize) -> f32,
    ) -> Result<Self, ImageError> {
        let data = (0..size.height)
            .flat_map(|v| (0..size.width).map(move |u| (u, v)))
            .map(|(u, v)| f(u, v))
            .collect();
        Self::new(size, data)
    }

    /// Get the size of the image in pixels.
    #[inline]
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Get the width of the image in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// Get the height of the image in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// Get the number of pixels in the image.
    #[inline]
    pub fn num_pixels(&self) -> usize {
        self.data.len()
    }

    /// Get the samples as a slice in row-major order.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Get a single row of samples.
    ///
    /// PRECONDITION: `v < height`.
    #[inline]
    pub fn row(&self, v: usize) -> &[f32] {
        let start = v * self.size.width;
        &self.data[start..start + self.size.width]
    }

    /// Get the sample at pixel `(u, v)`.
    pub fn get(&self, u: usize, v: usize) -> Result<f32, ImageError> {
        if u >= self.size.width || v >= self.size.height {
            return Err(ImageError::PixelIndexOutOfBounds(
                u,
                v,
                self.size.width,
                self.size.height,
            ));
        }
        Ok(self.data[v * self.size.width + u])
    }

    /// Apply `f` to every sample, producing a new image of the same size.
    ///
    /// The input image is left untouched.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            size: self.size,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Consume the image and return the raw samples.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}
