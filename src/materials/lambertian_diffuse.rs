// Copyright @yucwang 2023

use crate::core::bsdf::{ BSDFValue, BSDF };
use crate::core::tangent_frame::{ build_tangent_frame, local_to_world };
use crate::math::constants::{ Float, INV_PI, Vector2f, Vector3f };
use crate::math::spectrum::RGBSpectrum;
use crate::math::warp::{ sample_cosine_hemisphere, sample_cosine_hemisphere_pdf };

/// Two-sided diffuse reflector: scatters into whichever hemisphere `wo` is in.
pub struct LambertianDiffuseBSDF {
    color: RGBSpectrum
}

impl BSDF for LambertianDiffuseBSDF {
    fn eval(&self, wi: &Vector3f, wo: &Vector3f, n: &Vector3f) -> BSDFValue {
        if same_hemisphere(wi, wo, n) {
            self.color * INV_PI
        } else {
            BSDFValue::default()
        }
    }

    fn sample(&self, u: &Vector2f, wo: &Vector3f, n: &Vector3f) -> Vector3f {
        let n = if wo.dot(n) < 0.0 { -n } else { *n };
        let (tangent, bitangent) = build_tangent_frame(&n);
        let wi_local = sample_cosine_hemisphere(u);

        local_to_world(&wi_local, &tangent, &bitangent, &n).normalize()
    }

    fn pdf(&self, wi: &Vector3f, wo: &Vector3f, n: &Vector3f) -> Float {
        if same_hemisphere(wi, wo, n) {
            sample_cosine_hemisphere_pdf(wi.dot(n).abs())
        } else {
            0.0
        }
    }
}

impl LambertianDiffuseBSDF {
    pub fn new(rgb: RGBSpectrum) -> Self {
        Self {
            color: rgb,
        }
    }
}

fn same_hemisphere(wi: &Vector3f, wo: &Vector3f, n: &Vector3f) -> bool {
    wi.dot(n) * wo.dot(n) > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::constants::PI;

    #[test]
    fn test_eval_is_albedo_over_pi_on_both_sides() {
        let bsdf = LambertianDiffuseBSDF::new(RGBSpectrum::new(0.5, 0.25, 1.0));
        let n = Vector3f::new(0.0, 1.0, 0.0);
        let wi = Vector3f::new(0.0, 1.0, 0.0);
        let wo = Vector3f::new(0.6, 0.8, 0.0);

        let f = bsdf.eval(&wi, &wo, &n);
        assert!((f[0] - 0.5 / PI).abs() < 1e-6);
        assert!((f[2] - 1.0 / PI).abs() < 1e-6);

        let f_back = bsdf.eval(&-wi, &-wo, &n);
        assert_eq!(f, f_back);

        assert!(bsdf.eval(&wi, &-wo, &n).is_black());
        assert_eq!(bsdf.pdf(&wi, &-wo, &n), 0.0);
    }

    #[test]
    fn test_sample_follows_wo_side() {
        let bsdf = LambertianDiffuseBSDF::new(RGBSpectrum::splat(0.5));
        let n = Vector3f::new(0.0, 0.0, 1.0);
        for &(a, b) in &[(0.1, 0.9), (0.5, 0.5), (0.99, 0.01)] {
            let u = Vector2f::new(a, b);

            let wo = Vector3f::new(0.0, 0.6, 0.8);
            let wi = bsdf.sample(&u, &wo, &n);
            assert!(wi.z > 0.0);
            assert!((wi.norm() - 1.0).abs() < 1e-5);
            assert!((bsdf.pdf(&wi, &wo, &n) - wi.z * INV_PI).abs() < 1e-5);

            let wo = Vector3f::new(0.0, 0.6, -0.8);
            let wi = bsdf.sample(&u, &wo, &n);
            assert!(wi.z < 0.0);
            assert!(bsdf.pdf(&wi, &wo, &n) > 0.0);
        }
    }
}
