use std::str::FromStr;

use depthcloud::image::{DepthImage, ImageError, ImageSize};
use rand::Rng;

/// Focal length used to synthesize the disparity scene.
pub const DISPARITY_FX: f64 = 525.0;

/// Stereo baseline used to synthesize the disparity scene.
pub const DISPARITY_BASELINE: f64 = 0.1;

/// Synthetic depth scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scene {
    /// Stepped pyramid, nearest at the border and farthest in the center.
    Pyramid,
    /// Radial gradient growing from the center, with optional noise.
    Radial,
    /// The radial scene expressed as stereo disparity.
    Disparity,
    /// A fronto-parallel plane.
    Plane,
}

impl FromStr for Scene {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pyramid" => Ok(Scene::Pyramid),
            "radial" => Ok(Scene::Radial),
            "disparity" => Ok(Scene::Disparity),
            "plane" => Ok(Scene::Plane),
            _ => Err(format!(
                "unknown scene '{s}', expected pyramid, radial, disparity or plane"
            )),
        }
    }
}

/// Approximately normal noise from the sum of four uniform samples.
fn gaussian_noise(rng: &mut impl Rng, sigma: f64) -> f64 {
    let sum: f64 = (0..4).map(|_| rng.random_range(-1.0f64..1.0)).sum();
    // variance of the sum is 4/3
    sum * sigma * (3.0f64 / 4.0).sqrt()
}

/// Radial depth `1 + 2 * hypot(x - 0.5, y - 0.5)` over a unit grid, floored at 0.1.
fn radial(size: ImageSize, noise: f64) -> Result<DepthImage, ImageError> {
    let mut rng = rand::rng();
    let step = |n: usize| if n > 1 { 1.0 / (n - 1) as f64 } else { 0.0 };
    let (sx, sy) = (step(size.width), step(size.height));

    let data = (0..size.height)
        .flat_map(|v| (0..size.width).map(move |u| (u, v)))
        .map(|(u, v)| {
            let (x, y) = (u as f64 * sx, v as f64 * sy);
            let mut depth = 1.0 + 2.0 * (x - 0.5).hypot(y - 0.5);
            if noise > 0.0 {
                depth += gaussian_noise(&mut rng, noise);
            }
            depth.max(0.1) as f32
        })
        .collect();

    DepthImage::new(size, data)
}

/// Generate the raw samples of a scene.
///
/// # Arguments
///
/// * `scene` - The scene to generate.
/// * `size` - The image size.
/// * `noise` - Standard deviation of the noise added to the radial scenes, in meters.
pub fn generate(scene: Scene, size: ImageSize, noise: f64) -> Result<DepthImage, ImageError> {
    match scene {
        Scene::Pyramid => {
            let (cx, cy) = (size.width / 2, size.height / 2);
            let max_dist = cx.max(cy) as f32;
            DepthImage::from_fn(size, |u, v| {
                let dist = u.abs_diff(cx).max(v.abs_diff(cy)) as f32;
                1.0 + (max_dist - dist) * 0.5
            })
        }
        Scene::Radial => radial(size, noise),
        Scene::Disparity => {
            let focal_baseline = (DISPARITY_FX * DISPARITY_BASELINE) as f32;
            Ok(radial(size, noise)?.map(|depth| focal_baseline / depth))
        }
        Scene::Plane => DepthImage::from_size_val(size, 2.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pyramid() -> Result<(), ImageError> {
        let image = generate(Scene::Pyramid, [20, 20].into(), 0.0)?;
        assert_eq!(image.get(10, 10)?, 6.0);
        assert_eq!(image.get(0, 0)?, 1.0);
        assert_eq!(image.get(19, 10)?, 1.5);
        Ok(())
    }

    #[test]
    fn test_radial_and_disparity() -> Result<(), ImageError> {
        let size = [5, 5].into();
        let depth = generate(Scene::Radial, size, 0.0)?;
        assert_eq!(depth.get(2, 2)?, 1.0);

        let disparity = generate(Scene::Disparity, size, 0.0)?;
        assert!((disparity.get(2, 2)? - 52.5).abs() < 1e-4);

        let noisy = generate(Scene::Radial, size, 0.5)?;
        assert!(noisy.as_slice().iter().all(|&d| d >= 0.1));
        Ok(())
    }

    #[test]
    fn test_parse_scene() {
        assert_eq!("plane".parse::<Scene>(), Ok(Scene::Plane));
        assert!("cube".parse::<Scene>().is_err());
    }
}
