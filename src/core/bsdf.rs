// Copyright @yucwang 2023

use crate::math::constants::{ Float, Vector2f, Vector3f };
use crate::math::spectrum::RGBSpectrum;

pub type BSDFValue = RGBSpectrum;

#[derive(Debug, PartialEq)]
pub struct BSDFSampleRecord {
    pub wi: Vector3f,
    pub value: BSDFValue,
    pub pdf: Float,
}

/// Surface scattering in world space. Every direction points away from the
/// surface: `wo` towards the viewer, `wi` towards the light.
pub trait BSDF: Send + Sync {
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
    fn eval(&self, wi: &Vector3f, wo: &Vector3f, n: &Vector3f) -> BSDFValue;
    fn sample(&self, u: &Vector2f, wo: &Vector3f, n: &Vector3f) -> Vector3f;
    fn pdf(&self, wi: &Vector3f, wo: &Vector3f, n: &Vector3f) -> Float;

    fn sample_and_eval(&self, u: &Vector2f, wo: &Vector3f, n: &Vector3f) -> BSDFSampleRecord {
        let wi = self.sample(u, wo, n);
        BSDFSampleRecord {
            wi,
            value: self.eval(&wi, wo, n),
            pdf: self.pdf(&wi, wo, n),
        }
    }
}

impl Default for BSDFSampleRecord {
    fn default() -> Self {
        Self {
            wi: Vector3f::zeros(),
            value: BSDFValue::default(),
            pdf: 0.0,
        }
    }
}
