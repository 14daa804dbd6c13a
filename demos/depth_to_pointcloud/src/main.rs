use argh::FromArgs;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use depthcloud::k3d::{
    camera::{CameraModel, Convention},
    depth::{DepthKind, DepthMetadata},
    params::CameraParams,
    pipeline::depth_to_pointcloud_with,
    projection::{ExecutionStrategy, DEFAULT_CHUNK_ROWS},
};

mod scene;

use scene::{Scene, DISPARITY_BASELINE, DISPARITY_FX};

#[derive(FromArgs)]
/// Synthesize a depth scene and back-project it into a colored point cloud
struct Args {
    /// the scene to synthesize: pyramid, radial, disparity or plane
    #[argh(option, short = 's', default = "Scene::Radial")]
    scene: Scene,

    /// the image width
    #[argh(option, default = "640")]
    width: usize,

    /// the image height
    #[argh(option, default = "480")]
    height: usize,

    /// noise standard deviation of the radial scenes, in meters
    #[argh(option, default = "0.05")]
    noise: f64,

    /// path to a json file with the camera parameters
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// focal length along x in pixels
    #[argh(option)]
    fx: Option<f64>,

    /// focal length along y in pixels
    #[argh(option)]
    fy: Option<f64>,

    /// principal point x in pixels
    #[argh(option)]
    cx: Option<f64>,

    /// principal point y in pixels
    #[argh(option)]
    cy: Option<f64>,

    /// the camera model, e.g. pinhole-ideal or fisheye-kannala-brandt
    #[argh(option, short = 'm')]
    camera_model: Option<CameraModel>,

    /// the output convention: opengl or opencv
    #[argh(option)]
    convention: Option<Convention>,

    /// the meaning of the samples: depth, z, disparity or inverse_depth
    #[argh(option)]
    depth_type: Option<DepthKind>,

    /// stereo baseline in meters
    #[argh(option)]
    baseline: Option<f64>,

    /// radial coefficient k1
    #[argh(option)]
    k1: Option<f64>,

    /// radial coefficient k2
    #[argh(option)]
    k2: Option<f64>,

    /// radial coefficient k3
    #[argh(option)]
    k3: Option<f64>,

    /// radial coefficient k4
    #[argh(option)]
    k4: Option<f64>,

    /// radial coefficient k5
    #[argh(option)]
    k5: Option<f64>,

    /// tangential coefficient p1
    #[argh(option)]
    p1: Option<f64>,

    /// tangential coefficient p2
    #[argh(option)]
    p2: Option<f64>,

    /// number of threads, 0 uses the global pool and 1 runs serially
    #[argh(option, short = 't', default = "0")]
    threads: usize,
}

impl Args {
    /// Layer the command line flags over the json configuration.
    fn camera_params(&self) -> Result<CameraParams, Box<dyn std::error::Error>> {
        let base = match &self.config {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => CameraParams::default(),
        };

        Ok(CameraParams {
            fx: self.fx.or(base.fx),
            fy: self.fy.or(base.fy),
            cx: self.cx.or(base.cx),
            cy: self.cy.or(base.cy),
            camera_model: self.camera_model.or(base.camera_model),
            depth_type: self.depth_type.or(base.depth_type),
            convention: self.convention.or(base.convention),
            baseline: self.baseline.or(base.baseline),
            k1: self.k1.or(base.k1),
            k2: self.k2.or(base.k2),
            k3: self.k3.or(base.k3),
            k4: self.k4.or(base.k4),
            k5: self.k5.or(base.k5),
            p1: self.p1.or(base.p1),
            p2: self.p2.or(base.p2),
            ..base
        })
    }

    fn strategy(&self) -> ExecutionStrategy {
        match self.threads {
            0 => ExecutionStrategy::AutoRows(DEFAULT_CHUNK_ROWS),
            1 => ExecutionStrategy::Serial,
            n => ExecutionStrategy::Fixed(n),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Args = argh::from_env();
    let params = args.camera_params()?;

    // synthesize the raw samples and what a reader would report about them
    let image = scene::generate(args.scene, [args.width, args.height].into(), args.noise)?;
    let meta = match args.scene {
        Scene::Disparity => DepthMetadata {
            baseline: Some(DISPARITY_BASELINE),
            fx: Some(DISPARITY_FX),
            ..DepthMetadata::new(DepthKind::Disparity)
        },
        _ => DepthMetadata {
            fx: Some(DISPARITY_FX),
            ..DepthMetadata::new(DepthKind::Depth)
        },
    };

    // create a cancel token to stop the projection
    let cancel_token = Arc::new(AtomicBool::new(false));

    ctrlc::set_handler({
        let cancel_token = cancel_token.clone();
        move || {
            println!("Received Ctrl-C signal. Sending cancel signal !!");
            cancel_token.store(true, Ordering::SeqCst);
        }
    })?;

    log::info!(
        "projecting {:?} scene of {} with {:?}",
        args.scene,
        image.size(),
        args.strategy()
    );

    let now = std::time::Instant::now();
    let cloud = depth_to_pointcloud_with(
        &image,
        &meta,
        &params,
        args.strategy(),
        Some(cancel_token.as_ref()),
    )?;
    let elapsed = now.elapsed();

    let stats = cloud.stats();
    println!("Elapsed time: {:?}", elapsed);
    println!(
        "Points: {} ({} skipped)",
        cloud.point_count(),
        stats.skipped_pixels
    );
    if let Some((min_depth, max_depth)) = stats.depth_range {
        println!("Depth range: {min_depth:.3} - {max_depth:.3} m");
    }
    if let Some((lo, hi)) = cloud.bounds() {
        println!("Bounds: {lo} - {hi}");
    }
    if stats.theta_solves > 0 {
        println!(
            "Kannala-Brandt solves: {} ({} not converged, max {} iterations, max residual {:e})",
            stats.theta_solves, stats.non_converged, stats.max_iterations, stats.max_residual
        );
    }

    Ok(())
}
