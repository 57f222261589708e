// Copyright @yucwang 2026

use crate::core::bsdf::BSDF;
use crate::core::bvh::{BVH, SplitMethod};
use crate::core::interaction::{SurfaceIntersection, SurfaceSampleRecord};
use crate::core::rng::SampleRng;
use crate::core::shape::Shape;
use crate::math::constants::Float;
use crate::math::ray::Ray3f;
use crate::math::spectrum::RGBSpectrum;
use std::sync::Arc;

pub struct SceneObject {
    pub shape: Arc<dyn Shape>,
    pub material: Arc<dyn BSDF>,
    pub emission: RGBSpectrum,
}

impl SceneObject {
    pub fn new(shape: Arc<dyn Shape>, material: Arc<dyn BSDF>) -> Self {
        Self { shape, material, emission: RGBSpectrum::default() }
    }

    pub fn with_emission(shape: Arc<dyn Shape>, material: Arc<dyn BSDF>, emission: RGBSpectrum) -> Self {
        Self { shape, material, emission }
    }

    pub fn has_emit(&self) -> bool {
        !self.emission.is_black()
    }
}

/// Objects plus the BVH over them. Add every object, call `build_bvh` once,
/// then share the scene read-only across threads.
pub struct Scene {
    objects: Vec<SceneObject>,
    split_method: SplitMethod,
    bvh: Option<BVH>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            split_method: SplitMethod::default(),
            bvh: None,
        }
    }

    pub fn with_objects(objects: Vec<SceneObject>) -> Self {
        Self { objects, ..Self::new() }
    }

    /// Invalidates any previously built BVH.
    pub fn add_object(&mut self, object: SceneObject) {
        self.objects.push(object);
        self.bvh = None;
    }

    pub fn objects(&self) -> &Vec<SceneObject> {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn set_split_method(&mut self, split_method: SplitMethod) {
        self.split_method = split_method;
        self.bvh = None;
    }

    pub fn split_method(&self) -> SplitMethod {
        self.split_method
    }

    pub fn has_bvh(&self) -> bool {
        self.bvh.is_some()
    }

    pub fn build_bvh(&mut self) {
        let prim_bounds = self.objects.iter().map(|obj| obj.shape.bounding_box()).collect();
        self.bvh = Some(BVH::with_settings(prim_bounds, 1, self.split_method));
    }

    /// Nearest hit with the object's emission, material and index attached.
    /// `None` on a miss, and also when no BVH has been built.
    pub fn ray_intersection(&self, ray: &Ray3f) -> Option<SurfaceIntersection> {
        let bvh = match &self.bvh {
            Some(bvh) => bvh,
            None => {
                log::debug!("Scene queried before build_bvh.");
                return None;
            }
        };

        bvh.ray_intersection(ray, |prim_idx, ray| {
            self.objects[prim_idx].shape.ray_intersection(ray).map(|h| {
                let t = h.t();
                (h, t)
            })
        })
        .map(|(idx, hit)| self.attach_object(idx, hit))
    }

    /// Linear scan over every object, independent of the BVH.
    pub fn ray_intersection_naive(&self, ray: &Ray3f) -> Option<SurfaceIntersection> {
        let mut closest: Option<(usize, SurfaceIntersection)> = None;
        for (idx, object) in self.objects.iter().enumerate() {
            if let Some(hit) = object.shape.ray_intersection(ray) {
                let closer = match &closest {
                    Some((_, best)) => hit.t() < best.t(),
                    None => true,
                };
                if closer {
                    closest = Some((idx, hit));
                }
            }
        }

        closest.map(|(idx, hit)| self.attach_object(idx, hit))
    }

    fn attach_object(&self, idx: usize, hit: SurfaceIntersection) -> SurfaceIntersection {
        let object = &self.objects[idx];
        hit.with_le(object.emission)
            .with_material(object.material.clone())
            .with_object_index(Some(idx))
    }

    /// Total surface area of the emissive objects.
    pub fn emitter_area(&self) -> Float {
        self.objects
            .iter()
            .filter(|o| o.has_emit())
            .map(|o| o.shape.surface_area())
            .sum()
    }

    /// Picks an emissive object with probability proportional to its area and
    /// a point on it. The pdf is per unit area over the union of all lights.
    pub fn sample_light(&self, rng: &mut SampleRng) -> Option<SurfaceSampleRecord> {
        let total_area = self.emitter_area();
        if !(total_area > 0.0) {
            return None;
        }

        let p = rng.next_f32() * total_area;
        let mut accum = 0.0;
        let mut chosen: Option<(usize, Float)> = None;
        for (idx, object) in self.objects.iter().enumerate() {
            if !object.has_emit() {
                continue;
            }
            let area = object.shape.surface_area();
            accum += area;
            chosen = Some((idx, area));
            if p <= accum {
                break;
            }
        }

        let (idx, area) = chosen?;
        let object = &self.objects[idx];
        let mut record = object.shape.sample(&rng.next_2d());
        let pdf = record.pdf() * area / total_area;
        record.set_pdf(pdf);
        Some(record.with_le(object.emission))
    }
}
