// Copyright @yucwang 2026

use crate::core::bsdf::BSDF;
use crate::core::integrator::Integrator;
use crate::core::interaction::{intersection_distance, SurfaceIntersection};
use crate::core::rng::SampleRng;
use crate::core::scene::Scene;
use crate::core::sensor::Sensor;
use crate::math::constants::{Float, Vector2f, Vector3f, EPSILON};
use crate::math::ray::Ray3f;
use crate::math::spectrum::RGBSpectrum;

pub const DEFAULT_MAX_DEPTH: u32 = 16;
pub const DEFAULT_RR_PROBABILITY: Float = 0.8;
/// Below this density a BSDF sample is dropped instead of traced.
pub const MIN_BSDF_PDF: Float = 0.001;
const SHADOW_TOLERANCE: Float = 0.001;

/// Unidirectional path tracer: next-event estimation for direct light, a
/// BSDF-sampled bounce for indirect light, terminated by Russian roulette
/// and a hard depth ceiling.
pub struct PathIntegrator {
    pub max_depth: u32,
    pub samples_per_pixel: u32,
    pub rr_probability: Float,
}

impl Default for PathIntegrator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, 1)
    }
}

impl PathIntegrator {
    pub fn new(max_depth: u32, samples_per_pixel: u32) -> Self {
        Self { max_depth, samples_per_pixel, rr_probability: DEFAULT_RR_PROBABILITY }
    }

    pub fn with_rr_probability(mut self, rr_probability: Float) -> Self {
        self.rr_probability = rr_probability.max(0.0).min(1.0);
        self
    }

    /// Radiance arriving at the ray origin along `-ray.dir()`.
    pub fn cast_ray(&self, scene: &Scene, ray: &Ray3f, rng: &mut SampleRng) -> RGBSpectrum {
        match scene.ray_intersection(ray) {
            Some(hit) => self.shade(scene, &hit, &(-ray.dir()), 0, rng),
            None => RGBSpectrum::default(),
        }
    }

    /// Outgoing radiance at `hit` towards `wo`. Emitters return their own
    /// radiance without sampling.
    pub fn shade(&self,
                 scene: &Scene,
                 hit: &SurfaceIntersection,
                 wo: &Vector3f,
                 depth: u32,
                 rng: &mut SampleRng) -> RGBSpectrum {
        if hit.is_emitter() {
            return hit.le();
        }

        let bsdf = match hit.material() {
            Some(bsdf) => bsdf,
            None => return RGBSpectrum::default(),
        };

        let direct = self.direct_lighting(scene, hit, bsdf, wo, rng);
        let indirect = self.indirect_lighting(scene, hit, bsdf, wo, depth, rng);
        direct + indirect
    }

    /// One light sample, weighted by the area pdf of the whole light set.
    pub fn direct_lighting(&self,
                           scene: &Scene,
                           hit: &SurfaceIntersection,
                           bsdf: &dyn BSDF,
                           wo: &Vector3f,
                           rng: &mut SampleRng) -> RGBSpectrum {
        let light = match scene.sample_light(rng) {
            Some(light) => light,
            None => return RGBSpectrum::default(),
        };
        if !(light.pdf() > 0.0) {
            return RGBSpectrum::default();
        }

        let light_point = light.intersection();
        let origin = hit.offset_origin(&(light_point.p() - hit.p()));
        let to_light = light_point.p() - origin;
        let dist2 = to_light.norm_squared();
        if !(dist2 > 0.0) {
            return RGBSpectrum::default();
        }
        let dist = dist2.sqrt();
        let wi = to_light / dist;

        let shadow_ray = Ray3f::new(origin, wi, Some(EPSILON), None);
        let blocker = intersection_distance(&scene.ray_intersection(&shadow_ray));
        if blocker + SHADOW_TOLERANCE <= dist {
            return RGBSpectrum::default();
        }

        let n = hit.geo_normal();
        let cos_theta = wi.dot(&n).abs();
        // Area lights emit from the front face only.
        let cos_light = light_point.geo_normal().dot(&(-wi)).max(0.0);
        let f = bsdf.eval(&wi, wo, &n);

        light_point.le() * f * (cos_theta * cos_light / dist2 / light.pdf())
    }

    /// One BSDF-sampled bounce. Hits on emitters are skipped since the direct
    /// term already accounts for them.
    pub fn indirect_lighting(&self,
                             scene: &Scene,
                             hit: &SurfaceIntersection,
                             bsdf: &dyn BSDF,
                             wo: &Vector3f,
                             depth: u32,
                             rng: &mut SampleRng) -> RGBSpectrum {
        if depth + 1 >= self.max_depth {
            return RGBSpectrum::default();
        }
        let rr_weight = match self.roulette_weight(rng.next_f32()) {
            Some(weight) => weight,
            None => return RGBSpectrum::default(),
        };

        let n = hit.geo_normal();
        let sample = bsdf.sample_and_eval(&rng.next_2d(), wo, &n);
        if !(sample.pdf > MIN_BSDF_PDF) {
            return RGBSpectrum::default();
        }

        let wi = sample.wi;
        let bounce = hit.spawn_ray(&wi);
        match scene.ray_intersection(&bounce) {
            Some(next) if !next.is_emitter() => {
                let cos_theta = wi.dot(&n).abs();
                self.shade(scene, &next, &(-wi), depth + 1, rng) * sample.value * (cos_theta / sample.pdf * rr_weight)
            }
            _ => RGBSpectrum::default(),
        }
    }

    /// Survives when `u < rr_probability`, returning the compensation factor.
    pub fn roulette_weight(&self, u: Float) -> Option<Float> {
        if u < self.rr_probability {
            Some(1.0 / self.rr_probability)
        } else {
            None
        }
    }
}

impl Integrator for PathIntegrator {
    fn trace_ray_forward(&self, scene: &Scene, sensor: &dyn Sensor, pixel: Vector2f, rng: &mut SampleRng) -> RGBSpectrum {
        let jitter = rng.next_2d();
        let u = Vector2f::new((pixel.x + jitter.x) / sensor.width() as Float,
                              (pixel.y + jitter.y) / sensor.height() as Float);
        let ray = sensor.sample_ray(&u);
        self.cast_ray(scene, &ray, rng)
    }

    fn samples_per_pixel(&self) -> u32 {
        self.samples_per_pixel
    }
}
