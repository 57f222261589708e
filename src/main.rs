// Copyright 2020 TwoCookingMice

use sahtrace::core::bvh::SplitMethod;
use sahtrace::core::scene_loader::load_scene_with_settings;
use sahtrace::core::sensor::Sensor;
use sahtrace::integrators::path::{PathIntegrator, DEFAULT_MAX_DEPTH, DEFAULT_RR_PROBABILITY};
use sahtrace::io::image_utils::write_image;
use sahtrace::math::constants::Float;
use sahtrace::renderers::simple::{ Renderer, SimpleRenderer };

use std::env;
use std::error::Error;
use std::str::FromStr;

struct Options {
    input_path: String,
    output_path: String,
    spp: Option<u32>,
    max_depth: Option<u32>,
    rr_probability: Option<Float>,
    seed: u64,
    split_method: SplitMethod,
}

fn flag_value<T: FromStr>(args: &[String], i: usize, flag: &str) -> Result<T, String> {
    let raw = args.get(i).ok_or_else(|| format!("{} expects a value", flag))?;
    raw.parse::<T>().map_err(|_| format!("invalid value for {}: {}", flag, raw))
}

fn parse_options(args: &[String]) -> Result<Options, String> {
    if args.len() < 3 {
        return Err(format!(
            "Usage: {} <scene.xml> <output.{{exr,png}}> [--spp N] [--max-depth N] [--rr P] [--seed N] [--split sah|middle]",
            args.first().map(String::as_str).unwrap_or("sahtrace")));
    }

    let mut options = Options {
        input_path: args[1].clone(),
        output_path: args[2].clone(),
        spp: None,
        max_depth: None,
        rr_probability: None,
        seed: 0,
        split_method: SplitMethod::Sah,
    };

    let mut i = 3;
    while i < args.len() {
        let flag = args[i].as_str();
        i += 1;
        match flag {
            "--spp" => options.spp = Some(flag_value(args, i, flag)?),
            "--max-depth" => options.max_depth = Some(flag_value(args, i, flag)?),
            "--rr" => options.rr_probability = Some(flag_value(args, i, flag)?),
            "--seed" => options.seed = flag_value(args, i, flag)?,
            "--split" => {
                options.split_method = match flag_value::<String>(args, i, flag)?.as_str() {
                    "sah" => SplitMethod::Sah,
                    "middle" => SplitMethod::Middle,
                    other => return Err(format!("unknown split method: {}", other)),
                }
            }
            other => {
                log::warn!("Ignoring unknown argument '{}'.", other);
                continue;
            }
        }
        i += 1;
    }

    Ok(options)
}

fn run(options: Options) -> Result<(), Box<dyn Error>> {
    let load_result = load_scene_with_settings(&options.input_path)?;
    let camera = load_result.camera.ok_or("scene has no sensor")?;

    let mut scene = load_result.scene;
    scene.set_split_method(options.split_method);
    scene.build_bvh();

    let spp = options.spp.or(load_result.samples_per_pixel).unwrap_or(1);
    let max_depth = options.max_depth.or(load_result.max_depth).unwrap_or(DEFAULT_MAX_DEPTH);
    let rr_probability = options.rr_probability
        .or(load_result.rr_probability)
        .unwrap_or(DEFAULT_RR_PROBABILITY);
    let integrator = PathIntegrator::new(max_depth, spp).with_rr_probability(rr_probability);
    log::info!("{}, spp = {}, max depth = {}, rr = {}.", camera.describe(), spp, max_depth, rr_probability);

    let renderer = SimpleRenderer::new(Box::new(integrator), options.seed);
    let image = renderer.render(&scene, &camera);
    write_image(&image, &options.output_path)?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let options = match parse_options(&args) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("{}", msg);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(options) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
