use sahtrace::core::integrator::Integrator;
use sahtrace::core::rng::SampleRng;
use sahtrace::core::scene_loader::load_scene_with_settings;
use sahtrace::core::sensor::Sensor;
use sahtrace::integrators::path::{PathIntegrator, DEFAULT_RR_PROBABILITY};
use sahtrace::math::constants::{Float, Vector2f, Vector3f};
use std::env;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <scene.xml> <x> <y> [--spp N] [--max-depth N] [--seed N]", args[0]);
        std::process::exit(1);
    }

    let scene_path = &args[1];
    let (x, y) = match (args[2].parse::<usize>(), args[3].parse::<usize>()) {
        (Ok(x), Ok(y)) => (x, y),
        _ => {
            eprintln!("Pixel coordinates must be non-negative integers.");
            std::process::exit(1);
        }
    };

    let mut spp: u32 = 64;
    let mut max_depth: u32 = 8;
    let mut seed: u64 = 0;

    let mut i = 4;
    while i < args.len() {
        match args[i].as_str() {
            "--spp" => {
                i += 1;
                spp = args.get(i).and_then(|v| v.parse::<u32>().ok()).unwrap_or(spp);
            }
            "--max-depth" => {
                i += 1;
                max_depth = args.get(i).and_then(|v| v.parse::<u32>().ok()).unwrap_or(max_depth);
            }
            "--seed" => {
                i += 1;
                seed = args.get(i).and_then(|v| v.parse::<u64>().ok()).unwrap_or(seed);
            }
            other => log::warn!("Ignoring unknown argument '{}'.", other),
        }
        i += 1;
    }

    let load_result = match load_scene_with_settings(scene_path) {
        Ok(result) => result,
        Err(e) => {
            log::error!("failed to load scene: {}", e);
            std::process::exit(1);
        }
    };
    let sensor = match load_result.camera {
        Some(camera) => camera,
        None => {
            log::error!("scene has no sensor");
            std::process::exit(1);
        }
    };
    let mut scene = load_result.scene;
    scene.build_bvh();

    if x >= sensor.width() || y >= sensor.height() {
        eprintln!("Pixel out of bounds: ({}, {}) for size {}x{}", x, y, sensor.width(), sensor.height());
        std::process::exit(2);
    }

    let rr_probability = load_result.rr_probability.unwrap_or(DEFAULT_RR_PROBABILITY);
    let integrator = PathIntegrator::new(max_depth, spp).with_rr_probability(rr_probability);
    let pixel = Vector2f::new(x as Float, y as Float);
    let mut rng = SampleRng::for_pixel(seed, x, y);

    let mut accum = Vector3f::zeros();
    for _ in 0..spp {
        let rgb = integrator.trace_ray_forward(&scene, &sensor, pixel, &mut rng);
        accum += rgb.to_vector();
    }

    let inv_spp = 1.0 / (spp.max(1) as Float);
    let avg = accum * inv_spp;
    println!(
        "pixel ({}, {}) spp={} depth={} -> R {:.6}, G {:.6}, B {:.6}",
        x, y, spp, max_depth, avg.x, avg.y, avg.z
    );
}
