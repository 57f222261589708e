// Copyright @yucwang 2026

use crate::math::constants::Vector2f;
use crate::math::ray::Ray3f;

/// Maps a point on the film to a primary ray. `u` is in [0, 1]^2 with the
/// origin at the top-left corner of the image.
pub trait Sensor: Sync {
    fn sample_ray(&self, u: &Vector2f) -> Ray3f;
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn describe(&self) -> String {
        String::from("Sensor")
    }
}
