// Copyright @yucwang 2026

use crate::math::constants::Vector3f;

pub fn build_tangent_frame(n: &Vector3f) -> (Vector3f, Vector3f) {
    let up = if n.z.abs() < 0.999 {
        Vector3f::new(0.0, 0.0, 1.0)
    } else {
        Vector3f::new(1.0, 0.0, 0.0)
    };
    let tangent = n.cross(&up).normalize();
    let bitangent = n.cross(&tangent).normalize();
    (tangent, bitangent)
}

pub fn world_to_local(v: &Vector3f, t: &Vector3f, b: &Vector3f, n: &Vector3f) -> Vector3f {
    Vector3f::new(v.dot(t), v.dot(b), v.dot(n))
}

pub fn local_to_world(v: &Vector3f, t: &Vector3f, b: &Vector3f, n: &Vector3f) -> Vector3f {
    t * v.x + b * v.y + n * v.z
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_is_orthonormal_and_round_trips() {
        let normals = [
            Vector3f::new(0.0, 0.0, 1.0),
            Vector3f::new(0.0, 0.0, -1.0),
            Vector3f::new(0.0, 1.0, 0.0),
            Vector3f::new(1.0, 2.0, -3.0).normalize(),
        ];
        for n in &normals {
            let (t, b) = build_tangent_frame(n);
            assert!(t.dot(n).abs() < 1e-5);
            assert!(b.dot(n).abs() < 1e-5);
            assert!(t.dot(&b).abs() < 1e-5);
            assert!((t.norm() - 1.0).abs() < 1e-5);

            let v = Vector3f::new(0.3, -0.4, 0.5);
            let back = local_to_world(&world_to_local(&v, &t, &b, n), &t, &b, n);
            assert!((back - v).norm() < 1e-5);
            assert!((local_to_world(&Vector3f::new(0.0, 0.0, 1.0), &t, &b, n) - n).norm() < 1e-5);
        }
    }
}
