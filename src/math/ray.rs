// Copyright 2020 @TwoCookingMice

use super::constants::{Float, Vector3f};

#[derive(Debug, Clone, Copy)]
pub struct Ray3f {
    origin: Vector3f,
    dir: Vector3f,
    inv_dir: Vector3f,
    dir_is_neg: [bool; 3],
    pub min_t: Float,
    pub max_t: Float
}

impl Ray3f {
    /// The direction is normalized; its reciprocal and per-axis sign are
    /// cached for the slab test.
    pub fn new(o: Vector3f, d: Vector3f,
               min_t: Option<Float>, max_t: Option<Float>) -> Self {
        let dir = d.normalize();
        let inv_dir = Vector3f::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);
        Self { origin: o, dir,
               inv_dir,
               dir_is_neg: [inv_dir.x < 0.0, inv_dir.y < 0.0, inv_dir.z < 0.0],
               min_t: min_t.unwrap_or(0.0),
               max_t: max_t.unwrap_or(Float::INFINITY) }
    }

    pub fn origin(&self) -> Vector3f {
        self.origin
    }

    pub fn dir(&self) -> Vector3f {
        self.dir
    }

    pub fn inv_dir(&self) -> Vector3f {
        self.inv_dir
    }

    pub fn dir_is_neg(&self) -> [bool; 3] {
        self.dir_is_neg
    }

    pub fn at(&self, t: Float) -> Vector3f {
        self.origin + self.dir * t
    }

    pub fn update(&mut self, t: Float) -> bool {
        if t < self.min_t || t > self.max_t {
            false
        } else {
            self.max_t = t;
            true
        }
    }
}

/* Tests for Ray */

#[cfg(test)]
mod tests {
    use super::Vector3f;
    use super::Ray3f;

    #[test]
    fn test_ray3f() {
        let o = Vector3f::new(0.0, 0.0, 0.0);
        let d = Vector3f::new(1.0, 0.0, 1.0);
        let mut ray = Ray3f::new(o, d, None, None);
        assert_eq!(o, ray.origin());

        let v1 = ray.at(2.0);
        assert!((v1[0] - std::f32::consts::SQRT_2).abs() < 1e-5);
        assert!(v1[1].abs() < 1e-6);
        assert!((v1[2] - std::f32::consts::SQRT_2).abs() < 1e-5);

        let status1 = ray.update(100.0);
        let status2 = ray.update(105.0);
        assert_eq!(status1, true);
        assert_eq!(status2, false);
    }

    #[test]
    fn test_ray3f_cached_inverse_direction() {
        let ray = Ray3f::new(Vector3f::zeros(), Vector3f::new(0.0, -2.0, 0.0), None, None);

        assert_eq!(ray.dir(), Vector3f::new(0.0, -1.0, 0.0));
        assert_eq!(ray.inv_dir().y, -1.0);
        assert!(ray.inv_dir().x.is_infinite());
        assert_eq!(ray.dir_is_neg(), [false, true, false]);
        assert_eq!(ray.min_t, 0.0);
        assert!(ray.max_t.is_infinite());
    }
}
