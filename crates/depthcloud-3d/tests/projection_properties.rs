use approx::assert_relative_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};

use depthcloud_3d::{
    camera::{
        distortion::{kannala_brandt_radius, PolynomialDistortion},
        ray::RayCaster,
        CameraIntrinsic, CameraModel, Convention,
    },
    depth::{CalibratedKind, DepthKind, DepthMetadata},
    depth_to_pointcloud,
    params::{CameraParams, ProjectionParams},
    projection::project_depth,
    DepthError,
};
use depthcloud_image::DepthImage;

fn intrinsic() -> CameraIntrinsic {
    CameraIntrinsic {
        fx: 120.0,
        fy: 110.0,
        cx: 31.5,
        cy: 23.5,
    }
}

fn kannala_brandt() -> PolynomialDistortion {
    PolynomialDistortion {
        k1: 120.0,
        k2: -4.0,
        k3: 0.6,
        k4: -0.05,
        k5: 0.002,
        ..Default::default()
    }
}

/// Random samples with a share of NaN, infinite, zero and negative pixels.
fn noisy_image(width: usize, height: usize, seed: u64) -> Result<DepthImage, DepthError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..width * height)
        .map(|_| match rng.random_range(0..10) {
            0 => f32::NAN,
            1 => f32::INFINITY,
            2 => 0.0,
            3 => -rng.random_range(0.1..5.0),
            _ => rng.random_range(0.2..20.0),
        })
        .collect();
    Ok(DepthImage::new([width, height].into(), data)?)
}

#[test]
fn valid_pixels_emit_exactly_one_point() -> Result<(), DepthError> {
    let image = noisy_image(64, 48, 7)?;
    let expected = image
        .as_slice()
        .iter()
        .filter(|x| x.is_finite() && **x > 0.0)
        .count();

    for model in CameraModel::ALL {
        for kind in [CalibratedKind::Depth, CalibratedKind::Z] {
            let params = ProjectionParams::new(intrinsic())
                .with_model(model)
                .with_kind(kind)
                .with_distortion(kannala_brandt());
            let cloud = project_depth(&image, &params);

            assert_eq!(cloud.point_count(), expected, "{model} {kind:?}");
            assert_eq!(cloud.vertices().len(), 3 * expected);
            assert_eq!(cloud.colors().map(<[f32]>::len), Some(3 * expected));
            assert_eq!(
                cloud.stats().valid_pixels + cloud.stats().skipped_pixels,
                image.num_pixels()
            );
            assert!(cloud.vertices().iter().all(|x| x.is_finite()));
        }
    }
    Ok(())
}

#[test]
fn convention_is_an_involution() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..100 {
        let p: [f32; 3] = [
            rng.random_range(-10.0..10.0),
            rng.random_range(-10.0..10.0),
            rng.random_range(-10.0..10.0),
        ];
        for convention in [Convention::Opencv, Convention::Opengl] {
            let q = convention.apply(convention.apply(p));
            for i in 0..3 {
                assert_relative_eq!(q[i], p[i], epsilon = 1e-6);
            }
        }
    }
}

#[test]
fn pinhole_z_reprojects_to_its_pixel() -> Result<(), DepthError> {
    let image = DepthImage::from_fn([64, 48].into(), |u, v| 0.5 + (u + 2 * v) as f32 * 0.05)?;
    let params = ProjectionParams::new(intrinsic()).with_kind(CalibratedKind::Z);
    let cloud = project_depth(&image, &params);
    assert_eq!(cloud.point_count(), image.num_pixels());

    let k = intrinsic();
    for (i, [x, y, z]) in cloud.points().enumerate() {
        let (u, v) = ((i % 64) as f64, (i / 64) as f64);
        assert_relative_eq!(z, image.as_slice()[i], epsilon = 1e-6);
        assert_relative_eq!(k.fx * x as f64 / z as f64 + k.cx, u, epsilon = 1e-3);
        assert_relative_eq!(k.fy * y as f64 / z as f64 + k.cy, v, epsilon = 1e-3);
    }
    Ok(())
}

#[test]
fn kannala_brandt_rays_are_self_consistent() {
    let caster = RayCaster::new(CameraModel::FisheyeKannalaBrandt, intrinsic(), kannala_brandt());
    let k = intrinsic();

    for v in (0..48).step_by(3) {
        for u in (0..64).step_by(3) {
            let ray = caster.cast(u as f64, v as f64);
            let (du, dv) = (u as f64 - k.cx, v as f64 - k.cy);
            let r = du.hypot(dv);

            let [x, y, z] = ray.unit_direction();
            let theta = x.hypot(y).atan2(z);
            let (r_theta, _) = kannala_brandt_radius(theta, &kannala_brandt());
            assert_relative_eq!(r_theta, r, epsilon = 1e-6);

            // the ray keeps the azimuth of the pixel
            assert_relative_eq!(y.atan2(x), dv.atan2(du), epsilon = 1e-9);

            let solve = ray.theta_solve.expect("off-center pixels run the solve");
            assert!(solve.converged);
        }
    }
}

#[test]
fn colors_follow_depth_order() -> Result<(), DepthError> {
    let image = noisy_image(32, 32, 11)?;
    let cloud = project_depth(&image, &ProjectionParams::new(intrinsic()));

    let depths: Vec<f32> = image
        .as_slice()
        .iter()
        .copied()
        .filter(|x| x.is_finite() && *x > 0.0)
        .collect();
    let colors = cloud.colors().expect("colors are synthesized by default");

    let mut pairs: Vec<(f32, f32)> = depths
        .iter()
        .zip(colors.chunks_exact(3))
        .map(|(&d, c)| {
            assert!(c[0] == c[1] && c[1] == c[2]);
            assert!((0.0..=1.0).contains(&c[0]));
            (d, c[0])
        })
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    assert!(pairs.windows(2).all(|w| w[0].1 <= w[1].1));
    assert_relative_eq!(pairs[0].1, 0.2, epsilon = 1e-6);
    assert_relative_eq!(pairs[pairs.len() - 1].1, 1.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn single_pixel_image() -> Result<(), DepthError> {
    let image = DepthImage::from_size_val([1, 1].into(), 4.0)?;
    let params = CameraParams {
        fx: Some(50.0),
        depth_type: Some(DepthKind::Z),
        ..Default::default()
    };
    let cloud = depth_to_pointcloud(&image, &DepthMetadata::default(), &params)?;
    assert_eq!(cloud.vertices(), &[0.0f32, 0.0, 4.0][..]);
    assert_eq!(cloud.colors(), Some(&[1.0f32, 1.0, 1.0][..]));
    Ok(())
}

#[test]
fn disparity_converts_to_depth() -> Result<(), DepthError> {
    let image = DepthImage::new([4, 1].into(), vec![25.0, 0.0, -3.0, f32::NAN])?;
    let params = CameraParams {
        fx: Some(500.0),
        baseline: Some(0.1),
        depth_type: Some(DepthKind::Disparity),
        ..Default::default()
    };
    let cloud = depth_to_pointcloud(&image, &DepthMetadata::default(), &params)?;
    assert_eq!(cloud.point_count(), 1);
    let [x, y, z] = cloud.points().next().expect("one valid pixel");
    assert_relative_eq!((x * x + y * y + z * z).sqrt(), 2.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn rejects_unknown_model_names() {
    assert_eq!(
        "fisheye".parse::<CameraModel>(),
        Err(DepthError::UnknownCameraModel("fisheye".to_string()))
    );
    assert!("left-handed".parse::<Convention>().is_err());
}
