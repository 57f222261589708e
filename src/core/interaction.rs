// Copyright @yucwang 2023

use crate::core::bsdf::BSDF;
use crate::math::constants::{ EPSILON, Float, Vector2f, Vector3f };
use crate::math::ray::Ray3f;
use crate::math::spectrum::RGBSpectrum;
use std::sync::Arc;

#[derive(Clone)]
pub struct SurfaceIntersection {
    p: Vector3f,
    geo_normal: Vector3f,
    uv: Vector2f,
    t: Float,
    le: RGBSpectrum,
    material: Option<Arc<dyn BSDF>>,
    object_index: Option<usize>,
}

pub struct SurfaceSampleRecord {
    intersection: SurfaceIntersection,
    pdf: Float,
}

impl SurfaceIntersection {
    pub fn new(new_p: Vector3f,
               new_geo_normal: Vector3f,
               new_uv: Vector2f,
               new_t: Float) -> Self {
        Self { p: new_p, geo_normal: new_geo_normal, uv: new_uv, t: new_t,
               le: RGBSpectrum::default(), material: None, object_index: None }
    }

    pub fn t(&self) -> Float {
        self.t
    }

    pub fn le(&self) -> RGBSpectrum {
        self.le
    }

    pub fn p(&self) -> Vector3f {
        self.p
    }

    pub fn uv(&self) -> Vector2f {
        self.uv
    }

    pub fn geo_normal(&self) -> Vector3f {
        self.geo_normal
    }

    /// Surfaces with non-black emitted radiance are light sources.
    pub fn is_emitter(&self) -> bool {
        !self.le.is_black()
    }

    pub fn with_le(mut self, new_le: RGBSpectrum) -> Self {
        self.le = new_le;
        self
    }

    pub fn material(&self) -> Option<&dyn BSDF> {
        self.material.as_deref()
    }

    pub fn with_material(mut self, new_material: Arc<dyn BSDF>) -> Self {
        self.material = Some(new_material);
        self
    }

    pub fn object_index(&self) -> Option<usize> {
        self.object_index
    }

    pub fn with_object_index(mut self, object_index: Option<usize>) -> Self {
        self.object_index = object_index;
        self
    }

    /// `p` pushed off the surface along the normal, onto the side `w` points
    /// to. The push grows with the largest coordinate of `p` so that it stays
    /// above f32 rounding in large scenes.
    pub fn offset_origin(&self, w: &Vector3f) -> Vector3f {
        let offset = self.geo_normal * (EPSILON * self.p.amax().max(1.0));
        if w.dot(&self.geo_normal) < 0.0 {
            self.p - offset
        } else {
            self.p + offset
        }
    }

    /// Ray leaving the surface in direction `w`.
    pub fn spawn_ray(&self, w: &Vector3f) -> Ray3f {
        Ray3f::new(self.offset_origin(w), *w, Some(EPSILON), None)
    }
}

/// Distance of the nearest hit, `+inf` for a miss.
pub fn intersection_distance(hit: &Option<SurfaceIntersection>) -> Float {
    hit.as_ref().map_or(Float::INFINITY, |h| h.t())
}

impl SurfaceSampleRecord {
    pub fn new(new_intersection: SurfaceIntersection,
               new_pdf: Float) -> Self {
        Self { intersection: new_intersection, pdf: new_pdf }
    }

    pub fn intersection(&self) -> &SurfaceIntersection {
        &self.intersection
    }

    pub fn pdf(&self) -> Float {
        self.pdf
    }

    pub fn set_pdf(&mut self, pdf: Float) {
        self.pdf = pdf;
    }

    pub fn with_le(self, le: RGBSpectrum) -> Self {
        Self { intersection: self.intersection.with_le(le), pdf: self.pdf }
    }
}
