// Copyright @yucwang 2021

use crate::core::integrator::Integrator;
use crate::core::rng::SampleRng;
use crate::core::scene::Scene;
use crate::core::sensor::Sensor;
use crate::math::bitmap::Bitmap;
use crate::math::constants::{Float, Vector2f, Vector3f};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

pub use super::renderer::Renderer;

const BLOCK_SIZE: usize = 32;

struct Block {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
    pixels: Vec<Vector3f>,
}

/// Splits the image into square blocks handed out to one worker per core.
/// Every pixel draws from its own RNG stream, so the image only depends on
/// the seed and not on scheduling.
pub struct SimpleRenderer {
    integrator: Box<dyn Integrator>,
    seed: u64,
    thread_count: usize,
    show_progress: bool,
}

impl Renderer for SimpleRenderer {
    fn render(&self, scene: &Scene, sensor: &dyn Sensor) -> Bitmap {
        let (width, height) = (sensor.width(), sensor.height());
        if width == 0 || height == 0 {
            log::warn!("Sensor has an empty film, nothing to render.");
            return Bitmap::new(width, height);
        }
        let spp = match self.integrator.samples_per_pixel() {
            0 => 1,
            v => v,
        };
        let inv_spp = 1.0 / (spp as Float);

        let blocks_x = (width + BLOCK_SIZE - 1) / BLOCK_SIZE;
        let blocks_y = (height + BLOCK_SIZE - 1) / BLOCK_SIZE;
        let total_blocks = blocks_x * blocks_y;
        let integrator: &dyn Integrator = self.integrator.as_ref();

        log::info!("Rendering {}x{} at {} spp on {} threads.", width, height, spp, self.thread_count);
        let start_time = Instant::now();

        let progress = if self.show_progress {
            ProgressBar::new(total_blocks as u64)
        } else {
            ProgressBar::hidden()
        };
        progress.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} blocks")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let next_block = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<Block>();
        let mut output = Bitmap::new(width, height);

        thread::scope(|scope| {
            for _ in 0..self.thread_count {
                let next_block = &next_block;
                let tx = tx.clone();
                scope.spawn(move || {
                    loop {
                        let block_index = next_block.fetch_add(1, Ordering::Relaxed);
                        if block_index >= total_blocks {
                            break;
                        }

                        let x0 = (block_index % blocks_x) * BLOCK_SIZE;
                        let y0 = (block_index / blocks_x) * BLOCK_SIZE;
                        let x1 = (x0 + BLOCK_SIZE).min(width);
                        let y1 = (y0 + BLOCK_SIZE).min(height);

                        let mut pixels = Vec::with_capacity((x1 - x0) * (y1 - y0));
                        for y in y0..y1 {
                            for x in x0..x1 {
                                let pixel = Vector2f::new(x as Float, y as Float);
                                let mut rng = SampleRng::for_pixel(self.seed, x, y);
                                let mut color = Vector3f::zeros();
                                for _sample in 0..spp {
                                    let rgb = integrator.trace_ray_forward(scene, sensor, pixel, &mut rng);
                                    color += rgb.to_vector();
                                }
                                pixels.push(color * inv_spp);
                            }
                        }
                        if tx.send(Block { x0, y0, x1, y1, pixels }).is_err() {
                            break;
                        }
                    }
                });
            }

            drop(tx);
            for block in rx.iter() {
                let block_width = block.x1 - block.x0;
                for y in block.y0..block.y1 {
                    for x in block.x0..block.x1 {
                        output[(x, y)] = block.pixels[(x - block.x0) + block_width * (y - block.y0)];
                    }
                }
                progress.inc(1);
            }
        });
        progress.finish_and_clear();

        log::info!("Rendering finished in {:.2}s.", start_time.elapsed().as_secs_f64());
        output
    }
}

impl SimpleRenderer {
    pub fn new(integrator: Box<dyn Integrator>, seed: u64) -> Self {
        let thread_count = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            integrator,
            seed,
            thread_count,
            show_progress: true,
        }
    }

    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count.max(1);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}
