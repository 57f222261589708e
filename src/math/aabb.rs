// Copyright 2020 @TwoCookingMice

use super::constants::{ Float, Vector3f,
                       FLOAT_MIN, FLOAT_MAX };
use super::ray::{ Ray3f };

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AABB {
    pub p_min: Vector3f,
    pub p_max: Vector3f
}

/// The empty box: identity element of `union`.
impl Default for AABB {
    fn default() -> Self {
        Self { p_min: Vector3f::new(FLOAT_MAX, FLOAT_MAX, FLOAT_MAX),
               p_max: Vector3f::new(FLOAT_MIN, FLOAT_MIN, FLOAT_MIN) }
    }
}

impl AABB {
    pub fn new(p_min: Vector3f, p_max: Vector3f) -> Self {
        let mut min = Vector3f::new(0.0, 0.0, 0.0);
        let mut max = Vector3f::new(0.0, 0.0, 0.0);
        for idx in 0..3 {
            min[idx] = p_min[idx].min(p_max[idx]);
            max[idx] = p_max[idx].max(p_min[idx]);
        }
        Self { p_min: min, p_max: max }
    }

    pub fn union(a: &AABB, b: &AABB) -> AABB {
        let mut result = *a;
        result.expand_by_aabb(b);
        result
    }

    pub fn center(&self) -> Vector3f {
        0.5f32 * self.p_min + 0.5f32 * self.p_max
    }

    pub fn expand_by_point(&mut self, p: &Vector3f) {
        for idx in 0..3 {
            self.p_min[idx] = self.p_min[idx].min(p[idx]);
            self.p_max[idx] = self.p_max[idx].max(p[idx]);
        }
    }

    pub fn expand_by_aabb(&mut self, other: &AABB) {
        for idx in 0..3 {
            self.p_min[idx] = self.p_min[idx].min(other.p_min[idx]);
            self.p_max[idx] = self.p_max[idx].max(other.p_max[idx]);
        }
    }

    /// True when `other` lies entirely inside this box. The empty box is
    /// contained in everything.
    pub fn contains(&self, other: &AABB) -> bool {
        if !other.is_valid() {
            return true;
        }
        (0..3).all(|idx| self.p_min[idx] <= other.p_min[idx] && other.p_max[idx] <= self.p_max[idx])
    }

    /// Slab test against the three pairs of axis-aligned planes.
    ///
    /// `inv_dir` and `dir_is_neg` are computed once per ray; the near and far
    /// plane of each slab are picked from the sign so that no swap is needed.
    /// An axis whose direction component is zero yields infinities (or NaN
    /// when the origin lies on the plane), which `max`/`min` absorb.
    pub fn ray_intersect_p(&self, ray: &Ray3f, inv_dir: &Vector3f, dir_is_neg: [bool; 3]) -> bool {
        if !self.is_valid() {
            return false;
        }

        let o = ray.origin();
        let mut t_enter = ray.min_t;
        let mut t_exit = ray.max_t;

        for idx in 0..3 {
            let (near, far) = if dir_is_neg[idx] {
                (self.p_max[idx], self.p_min[idx])
            } else {
                (self.p_min[idx], self.p_max[idx])
            };

            let t0 = (near - o[idx]) * inv_dir[idx];
            let t1 = (far - o[idx]) * inv_dir[idx];
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_exit < t_enter {
                return false;
            }
        }

        true
    }

    pub fn ray_intersect(&self, ray: &Ray3f) -> bool {
        self.ray_intersect_p(ray, &ray.inv_dir(), ray.dir_is_neg())
    }

    pub fn surface_area(&self) -> Float {
        if !self.is_valid() {
            return 0.0;
        }

        let d = self.diagonal();
        2.0f32 * (d[0] * d[1] + d[0] * d[2] + d[1] * d[2])
    }

    pub fn diagonal(&self) -> Vector3f {
        self.p_max - self.p_min
    }

    pub fn max_extent(&self) -> usize {
        let diagonal = self.diagonal();
        if diagonal[0] > diagonal[1] && diagonal[0] > diagonal[2] {
            0
        } else if diagonal[1] > diagonal[2] {
            1
        } else {
            2
        }
    }

    pub fn is_valid(&self) -> bool {
        (0..3).all(|idx| self.p_min[idx] <= self.p_max[idx])
    }
}

/* Test for AABB */
