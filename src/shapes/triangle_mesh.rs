// Copyright @yucwang 2023

use super::triangle::Triangle;

use crate::core::interaction::{SurfaceIntersection, SurfaceSampleRecord};
use crate::core::shape::Shape;
use crate::core::bvh::BVH;
use crate::io::obj_utils;
use crate::io::obj_utils::ObjLoadError;
use crate::math::aabb::AABB;
use crate::math::constants::{ Float, Vector2f, Vector3f };
use crate::math::ray::Ray3f;

use std::path::Path;

/// Triangle soup with its own BVH, treated by the scene as one object.
pub struct TriangleMesh {
    triangles: Vec<Triangle>,
    area_cdf: Vec<Float>,
    total_area: Float,
    bounds: AABB,
    bvh: BVH,
}

impl TriangleMesh {
    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        let mut area_cdf = Vec::with_capacity(triangles.len());
        let mut total_area = 0.0;
        let mut bounds = AABB::default();
        let mut prim_bounds = Vec::with_capacity(triangles.len());
        for tri in &triangles {
            total_area += tri.surface_area();
            area_cdf.push(total_area);
            let tri_bounds = tri.bounding_box();
            bounds.expand_by_aabb(&tri_bounds);
            prim_bounds.push(tri_bounds);
        }

        Self {
            triangles,
            area_cdf,
            total_area,
            bounds,
            bvh: BVH::new(prim_bounds),
        }
    }

    pub fn from_obj<P: AsRef<Path>>(path: P) -> Result<Self, ObjLoadError> {
        let obj_set = obj_utils::load_obj_from_file(path.as_ref())?;
        let triangles: Vec<Triangle> = obj_utils::obj_triangles(&obj_set)
            .into_iter()
            .map(|[p0, p1, p2]| Triangle::new(p0, p1, p2))
            .collect();
        log::info!("Loaded {} triangles from {}.", triangles.len(), path.as_ref().display());
        Ok(Self::from_triangles(triangles))
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }
}

impl Shape for TriangleMesh {
    fn bounding_box(&self) -> AABB {
        self.bounds
    }

    fn ray_intersection(&self, ray: &Ray3f) -> Option<SurfaceIntersection> {
        self.bvh
            .ray_intersection(ray, |prim_idx, ray| {
                self.triangles[prim_idx].ray_intersection(ray).map(|h| {
                    let t = h.t();
                    (h, t)
                })
            })
            .map(|(_, hit)| hit)
    }

    /// Picks a triangle proportionally to its area, then a uniform point on
    /// it, so the density is uniform over the whole mesh.
    fn sample(&self, u: &Vector2f) -> SurfaceSampleRecord {
        if self.triangles.is_empty() || self.total_area <= 0.0 {
            let n = Vector3f::new(0.0, 0.0, 1.0);
            let intersection = SurfaceIntersection::new(Vector3f::zeros(), n, Vector2f::zeros(), 0.0);
            return SurfaceSampleRecord::new(intersection, 0.0);
        }

        let target = u.x * self.total_area;
        let idx = self
            .area_cdf
            .partition_point(|c| *c < target)
            .min(self.triangles.len() - 1);
        let prev = if idx == 0 { 0.0 } else { self.area_cdf[idx - 1] };
        let tri_area = (self.area_cdf[idx] - prev).max(1e-12);
        let local_u = Vector2f::new(((target - prev) / tri_area).max(0.0).min(0.999_999), u.y);

        let mut record = self.triangles[idx].sample(&local_u);
        record.set_pdf(1.0 / self.total_area);
        record
    }

    fn surface_area(&self) -> Float {
        self.total_area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn two_squares() -> TriangleMesh {
        // Unit square at z = 0 and a 2x2 square at z = 5.
        let a = |x: Float, y: Float, z: Float| Vector3f::new(x, y, z);
        TriangleMesh::from_triangles(vec![
            Triangle::new(a(0.0, 0.0, 0.0), a(1.0, 0.0, 0.0), a(1.0, 1.0, 0.0)),
            Triangle::new(a(0.0, 0.0, 0.0), a(1.0, 1.0, 0.0), a(0.0, 1.0, 0.0)),
            Triangle::new(a(0.0, 0.0, 5.0), a(2.0, 0.0, 5.0), a(2.0, 2.0, 5.0)),
            Triangle::new(a(0.0, 0.0, 5.0), a(2.0, 2.0, 5.0), a(0.0, 2.0, 5.0)),
        ])
    }

    #[test]
    fn test_area_and_bounds() {
        let mesh = two_squares();
        assert_eq!(mesh.triangle_count(), 4);
        assert!((mesh.surface_area() - 5.0).abs() < 1e-5);
        assert_eq!(mesh.bounding_box().p_min, Vector3f::new(0.0, 0.0, 0.0));
        assert_eq!(mesh.bounding_box().p_max, Vector3f::new(2.0, 2.0, 5.0));
    }

    #[test]
    fn test_sample_pdf_is_inverse_total_area() {
        let mesh = two_squares();
        let mut rng = StdRng::seed_from_u64(11);
        let mut near = 0usize;
        let n = 20000;
        for _ in 0..n {
            let u = Vector2f::new(rng.gen(), rng.gen());
            let record = mesh.sample(&u);
            assert!((record.pdf() - 0.2).abs() < 1e-6);
            let p = record.intersection().p();
            assert!(p.z.abs() < 1e-5 || (p.z - 5.0).abs() < 1e-5);
            if p.z < 2.5 {
                near += 1;
            }
        }
        // One fifth of the area sits at z = 0.
        let fraction = near as f64 / n as f64;
        assert!((fraction - 0.2).abs() < 0.015, "fraction {}", fraction);
    }

    #[test]
    fn test_intersection_is_nearest_triangle() {
        let mesh = two_squares();
        let ray = Ray3f::new(Vector3f::new(0.5, 0.25, 10.0), Vector3f::new(0.0, 0.0, -1.0), None, None);
        let hit = mesh.ray_intersection(&ray).expect("expected a hit");
        assert!((hit.t() - 5.0).abs() < 1e-4);

        let ray = Ray3f::new(Vector3f::new(0.5, 0.25, -10.0), Vector3f::new(0.0, 0.0, 1.0), None, None);
        let hit = mesh.ray_intersection(&ray).expect("expected a hit");
        assert!((hit.t() - 10.0).abs() < 1e-4);

        let ray = Ray3f::new(Vector3f::new(3.0, 3.0, 10.0), Vector3f::new(0.0, 0.0, -1.0), None, None);
        assert!(mesh.ray_intersection(&ray).is_none());
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = TriangleMesh::from_triangles(Vec::new());
        assert_eq!(mesh.surface_area(), 0.0);
        assert_eq!(mesh.sample(&Vector2f::new(0.5, 0.5)).pdf(), 0.0);
        let ray = Ray3f::new(Vector3f::zeros(), Vector3f::new(0.0, 0.0, 1.0), None, None);
        assert!(mesh.ray_intersection(&ray).is_none());
    }
}
