// Copyright @yucwang 2023

use crate::core::shape::Shape;
use crate::core::interaction::{ SurfaceIntersection, SurfaceSampleRecord };
use crate::math::aabb::AABB;
use crate::math::constants::{ EPSILON, Float, Vector2f, Vector3f };
use crate::math::ray::Ray3f;
use crate::math::warp::square_to_triangle;

#[derive(Debug, Clone)]
pub struct Triangle {
    p0: Vector3f,
    p1: Vector3f,
    p2: Vector3f
}

impl Shape for Triangle {
    fn bounding_box(&self) -> AABB {
        let mut bound = AABB::new(self.p0, self.p1);
        bound.expand_by_point(&self.p2);

        bound
    }

    /// Two-sided: the reported normal is the winding normal regardless of
    /// which side the ray arrives from.
    fn ray_intersection(&self, ray: &Ray3f) -> Option<SurfaceIntersection> {
        let geo_normal = self.geometric_normal();
        let n_dot_dir = geo_normal.dot(&ray.dir());

        // Parallel to the plane, or degenerate (zero-area) triangle.
        if !(n_dot_dir.abs() >= EPSILON * EPSILON) {
            return None;
        }

        let plane_d = geo_normal.dot(&self.p0);
        let t = (plane_d - geo_normal.dot(&ray.origin())) / n_dot_dir;
        if t < ray.min_t || t > ray.max_t {
            return None;
        }

        let intersection_p = ray.at(t);
        if !self.is_in_triangle(&intersection_p) {
            return None;
        }

        let bary = self.barycentric(&intersection_p);
        let uv = Vector2f::new(bary.y, bary.z);
        Some(SurfaceIntersection::new(intersection_p, geo_normal, uv, t))
    }

    fn sample(&self, u: &Vector2f) -> SurfaceSampleRecord {
        let bary = square_to_triangle(u);
        let p = self.p0 * bary.x + self.p1 * bary.y + self.p2 * bary.z;
        let n = self.geometric_normal();

        let interaction = SurfaceIntersection::new(p, n, Vector2f::new(bary.y, bary.z), 0.0);

        SurfaceSampleRecord::new(interaction, 1.0 / self.surface_area())
    }

    fn surface_area(&self) -> Float {
        0.5 * ((self.p1 - self.p0).cross(&(self.p2 - self.p0))).norm()
    }
}

impl Triangle {
    pub fn new(new_p0: Vector3f, new_p1: Vector3f, new_p2: Vector3f) -> Self {
        Triangle {
            p0: new_p0,
            p1: new_p1,
            p2: new_p2,
        }
    }

    fn is_in_triangle(&self, p: &Vector3f) -> bool {
        let edge0 = self.p1 - self.p0;
        let edge1 = self.p2 - self.p0;
        let geo_normal = edge0.cross(&edge1);

        let n0 = (self.p1 - self.p0).cross(&(p - self.p0));
        let n1 = (self.p2 - self.p1).cross(&(p - self.p1));
        let n2 = (self.p0 - self.p2).cross(&(p - self.p2));

        (n0.dot(&geo_normal) >= 0.0) && (n1.dot(&geo_normal) >= 0.0) && (n2.dot(&geo_normal) >= 0.0)
    }

    pub fn geometric_normal(&self) -> Vector3f {
        let edge0 = self.p1 - self.p0;
        let edge1 = self.p2 - self.p0;
        edge0.cross(&edge1).normalize()
    }

    pub fn vertices(&self) -> (Vector3f, Vector3f, Vector3f) {
        (self.p0, self.p1, self.p2)
    }

    pub fn barycentric(&self, p: &Vector3f) -> Vector3f {
        let v0 = self.p1 - self.p0;
        let v1 = self.p2 - self.p0;
        let v2 = *p - self.p0;

        let d00 = v0.dot(&v0);
        let d01 = v0.dot(&v1);
        let d11 = v1.dot(&v1);
        let d20 = v2.dot(&v0);
        let d21 = v2.dot(&v1);
        let denom = d00 * d11 - d01 * d01;
        if denom.abs() < EPSILON * EPSILON {
            return Vector3f::new(1.0, 0.0, 0.0);
        }

        let v = (d11 * d20 - d01 * d21) / denom;
        let w = (d00 * d21 - d01 * d20) / denom;
        Vector3f::new(1.0 - v - w, v, w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Triangle {
        Triangle::new(Vector3f::new(1.0, 1.0, 0.0),
                      Vector3f::new(2.0, 2.0, 0.0),
                      Vector3f::new(2.0, 1.0, 0.0))
    }

    #[test]
    fn test_bounding_box1() {
        let p0 = Vector3f::new(1.0, 1.0, 1.0);
        let p1 = Vector3f::new(1.5, 4.0, -1.0);
        let p2 = Vector3f::new(-1.0, 2.0, 2.5);

        let triangle = Triangle::new(p0, p1, p2);
        let bounding_box = triangle.bounding_box();

        assert_eq!(bounding_box.p_min, Vector3f::new(-1.0, 1.0, -1.0));
        assert_eq!(bounding_box.p_max, Vector3f::new(1.5, 4.0, 2.5));
    }

    #[test]
    fn test_is_in_triangle1() {
        let triangle = unit_triangle();

        assert!(triangle.is_in_triangle(&Vector3f::new(1.5, 1.1, 0.0)));
        assert!(!triangle.is_in_triangle(&Vector3f::new(1.5, 2.0, 0.0)));
    }

    #[test]
    fn test_ray_intersection_both_sides() {
        let triangle = unit_triangle();

        let from_above = Ray3f::new(Vector3f::new(1.5, 1.1, 3.0),
            Vector3f::new(0.0, 0.0, -1.0), None, None);
        let from_below = Ray3f::new(Vector3f::new(1.5, 1.1, -2.0),
            Vector3f::new(0.0, 0.0, 1.0), None, None);
        let away = Ray3f::new(Vector3f::new(1.5, 1.1, 3.0),
            Vector3f::new(0.0, 0.0, 1.0), None, None);

        let hit = triangle.ray_intersection(&from_above).expect("hit from above");
        assert!((hit.t() - 3.0).abs() < 1e-5);
        assert!((hit.p() - Vector3f::new(1.5, 1.1, 0.0)).norm() < 1e-5);
        assert!((hit.uv() - Vector2f::new(0.1, 0.4)).norm() < 1e-5);

        let hit = triangle.ray_intersection(&from_below).expect("hit from below");
        assert!((hit.t() - 2.0).abs() < 1e-5);

        assert!(triangle.ray_intersection(&away).is_none());
    }

    #[test]
    fn test_ray_intersection_respects_range() {
        let triangle = unit_triangle();
        let short = Ray3f::new(Vector3f::new(1.5, 1.1, 3.0),
            Vector3f::new(0.0, 0.0, -1.0), None, Some(2.5));
        assert!(triangle.ray_intersection(&short).is_none());

        let parallel = Ray3f::new(Vector3f::new(0.0, 1.5, 0.0),
            Vector3f::new(1.0, 0.0, 0.0), None, None);
        assert!(triangle.ray_intersection(&parallel).is_none());
    }

    #[test]
    fn test_sample_on_surface() {
        let triangle = unit_triangle();
        assert!((triangle.surface_area() - 0.5).abs() < 1e-6);

        for &(a, b) in &[(0.1, 0.2), (0.5, 0.5), (0.9, 0.01), (0.0, 0.0)] {
            let record = triangle.sample(&Vector2f::new(a, b));
            assert!((record.pdf() - 2.0).abs() < 1e-5);
            let p = record.intersection().p();
            assert!(p.z.abs() < 1e-6);
            let bary = triangle.barycentric(&p);
            assert!(bary.iter().all(|c| *c >= -1e-4));
        }
    }
}
