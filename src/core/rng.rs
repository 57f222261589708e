// Copyright @yucwang 2026

use crate::math::constants::{Float, Vector2f};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Per-thread random source. Never shared: each worker owns one and passes
/// it down by `&mut`.
pub struct SampleRng {
    inner: StdRng,
}

impl SampleRng {
    pub fn new(seed: u64) -> Self {
        Self { inner: StdRng::seed_from_u64(seed) }
    }

    /// Deterministic stream for one pixel of a render seeded with `seed`.
    pub fn for_pixel(seed: u64, x: usize, y: usize) -> Self {
        let pixel_seed = ((seed & 0xFFFF_FFFF) << 32)
            | (((y as u64) & 0xFFFF) << 16)
            | ((x as u64) & 0xFFFF);
        Self::new(pixel_seed)
    }

    /// Uniform in [0, 1).
    pub fn next_f32(&mut self) -> Float {
        self.inner.gen::<Float>()
    }

    pub fn next_2d(&mut self) -> Vector2f {
        Vector2f::new(self.next_f32(), self.next_f32())
    }
}
