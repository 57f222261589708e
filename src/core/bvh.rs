// Copyright @yucwang 2026

use crate::math::aabb::AABB;
use crate::math::constants::{Float, Vector3f};
use crate::math::ray::Ray3f;

use std::cmp::Ordering;
use std::time::Instant;

const SAH_BUCKETS: usize = 4;
const MAX_LEAF_SIZE_LIMIT: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMethod {
    /// Half of the sorted primitives on each side.
    Middle,
    /// Binned surface area heuristic over the centroid range.
    Sah,
}

impl Default for SplitMethod {
    fn default() -> Self {
        SplitMethod::Sah
    }
}

#[derive(Debug, Clone)]
enum BVHNode {
    Leaf { bounds: AABB, primitive: usize },
    Interior { bounds: AABB, left: usize, right: usize },
}

impl BVHNode {
    fn leaf(bounds: AABB, primitive: usize) -> Self {
        BVHNode::Leaf { bounds, primitive }
    }

    fn interior(bounds: AABB, left: usize, right: usize) -> Self {
        BVHNode::Interior { bounds, left, right }
    }

    fn bounds(&self) -> &AABB {
        match self {
            BVHNode::Leaf { bounds, .. } => bounds,
            BVHNode::Interior { bounds, .. } => bounds,
        }
    }

    fn is_leaf(&self) -> bool {
        matches!(self, BVHNode::Leaf { .. })
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    count: usize,
    bounds: AABB,
}

/// Binary BVH over primitive bounds, one primitive per leaf.
///
/// The tree stores only bounds; intersection is delegated to the caller
/// through a callback, so the same structure serves the scene (over
/// objects) and meshes (over triangles). Nodes live in an arena with the
/// root at index 0.
pub struct BVH {
    nodes: Vec<BVHNode>,
    indices: Vec<usize>,
    prim_bounds: Vec<AABB>,
    prim_centroids: Vec<Vector3f>,
    max_leaf_size: usize,
    split_method: SplitMethod,
}

impl BVH {
    pub fn new(prim_bounds: Vec<AABB>) -> Self {
        Self::with_settings(prim_bounds, 1, SplitMethod::default())
    }

    /// `max_leaf_size` is recorded (clamped to 1..=255) but leaves always hold
    /// a single primitive, including in the two-primitive case.
    pub fn with_settings(
        prim_bounds: Vec<AABB>,
        max_leaf_size: usize,
        split_method: SplitMethod,
    ) -> Self {
        let start_time = Instant::now();
        let prim_centroids = prim_bounds.iter().map(|b| b.center()).collect();
        let mut bvh = Self {
            nodes: Vec::with_capacity(2 * prim_bounds.len()),
            indices: (0..prim_bounds.len()).collect(),
            prim_bounds,
            prim_centroids,
            max_leaf_size: max_leaf_size.max(1).min(MAX_LEAF_SIZE_LIMIT),
            split_method,
        };

        if bvh.indices.is_empty() {
            log::debug!("BVH requested over zero primitives, tree left empty.");
            return bvh;
        }

        bvh.build(0, bvh.indices.len());

        log::info!(
            "BVH generation complete: {} primitives, {} nodes, {:?} split, {:.3}s.",
            bvh.indices.len(),
            bvh.nodes.len(),
            bvh.split_method,
            start_time.elapsed().as_secs_f64()
        );

        bvh
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    pub fn max_leaf_size(&self) -> usize {
        self.max_leaf_size
    }

    pub fn split_method(&self) -> SplitMethod {
        self.split_method
    }

    /// Root bounds, or the empty box for an empty tree.
    pub fn bounds(&self) -> AABB {
        self.nodes.first().map(|n| *n.bounds()).unwrap_or_default()
    }

    /// Nearest hit reported by `hit_fn` among the leaves whose ancestors'
    /// bounds the ray crosses. Both children of an interior node are
    /// visited, left first; on equal distances the left hit is kept.
    pub fn ray_intersection<F, T>(&self, ray: &Ray3f, mut hit_fn: F) -> Option<(usize, T)>
    where
        F: FnMut(usize, &Ray3f) -> Option<(T, Float)>,
    {
        if self.nodes.is_empty() {
            return None;
        }

        let inv_dir = ray.inv_dir();
        let dir_is_neg = ray.dir_is_neg();

        let mut closest: Option<(usize, T)> = None;
        let mut closest_t = Float::INFINITY;
        let mut stack = Vec::with_capacity(64);
        stack.push(0usize);

        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            if !node.bounds().ray_intersect_p(ray, &inv_dir, dir_is_neg) {
                continue;
            }

            match node {
                BVHNode::Leaf { primitive, .. } => {
                    if let Some((hit, t)) = hit_fn(*primitive, ray) {
                        if t < closest_t {
                            closest_t = t;
                            closest = Some((*primitive, hit));
                        }
                    }
                }
                BVHNode::Interior { left, right, .. } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        closest
    }

    fn build(&mut self, start: usize, end: usize) -> usize {
        let node_idx = self.nodes.len();
        if end - start == 1 {
            let prim_idx = self.indices[start];
            self.nodes.push(BVHNode::leaf(self.prim_bounds[prim_idx], prim_idx));
            return node_idx;
        }

        // Reserve the slot so the parent precedes its subtrees.
        self.nodes.push(BVHNode::interior(AABB::default(), 0, 0));

        let mid = if end - start == 2 {
            start + 1
        } else {
            self.partition(start, end)
        };

        let left = self.build(start, mid);
        let right = self.build(mid, end);
        let bounds = AABB::union(self.nodes[left].bounds(), self.nodes[right].bounds());
        self.nodes[node_idx] = BVHNode::interior(bounds, left, right);
        node_idx
    }

    /// Sorts `indices[start..end]` along the widest centroid axis and returns
    /// the index where the right child begins.
    fn partition(&mut self, start: usize, end: usize) -> usize {
        let count = end - start;
        let mut centroid_bounds = AABB::default();
        for &idx in &self.indices[start..end] {
            centroid_bounds.expand_by_point(&self.prim_centroids[idx]);
        }

        let axis = centroid_bounds.max_extent();
        let centroids = &self.prim_centroids;
        self.indices[start..end].sort_by(|a, b| {
            centroids[*a][axis]
                .partial_cmp(&centroids[*b][axis])
                .unwrap_or(Ordering::Equal)
        });

        let split_count = match self.split_method {
            SplitMethod::Middle => count / 2,
            SplitMethod::Sah => {
                let axis_min = centroid_bounds.p_min[axis];
                let extent = centroid_bounds.p_max[axis] - axis_min;
                if !(extent > Float::EPSILON) {
                    log::debug!("Coincident centroids over {} primitives, median split.", count);
                    count / 2
                } else {
                    let buckets = self.fill_buckets(start, end, axis, axis_min, extent);
                    let split = best_split_count(&buckets);
                    if split == 0 || split >= count {
                        count / 2
                    } else {
                        split
                    }
                }
            }
        };

        start + split_count
    }

    fn fill_buckets(
        &self,
        start: usize,
        end: usize,
        axis: usize,
        axis_min: Float,
        extent: Float,
    ) -> [Bucket; SAH_BUCKETS] {
        let mut buckets = [Bucket::default(); SAH_BUCKETS];
        for &idx in &self.indices[start..end] {
            let c = self.prim_centroids[idx][axis];
            let b = (((c - axis_min) / extent * SAH_BUCKETS as Float) as usize).min(SAH_BUCKETS - 1);
            buckets[b].count += 1;
            buckets[b].bounds.expand_by_aabb(&self.prim_bounds[idx]);
        }
        buckets
    }
}

/// Cost of cutting after bucket `boundary`, and the primitive count on the
/// left. Left and right bounds are accumulated independently.
fn split_cost(buckets: &[Bucket], boundary: usize) -> (Float, usize) {
    let mut left = AABB::default();
    let mut right = AABB::default();
    let mut count_left = 0usize;
    let mut count_right = 0usize;

    for bucket in &buckets[..=boundary] {
        left.expand_by_aabb(&bucket.bounds);
        count_left += bucket.count;
    }
    for bucket in &buckets[boundary + 1..] {
        right.expand_by_aabb(&bucket.bounds);
        count_right += bucket.count;
    }

    let cost = left.surface_area() * count_left as Float
        + right.surface_area() * count_right as Float;
    (cost, count_left)
}

fn best_split_count(buckets: &[Bucket]) -> usize {
    let mut min_cost = Float::INFINITY;
    let mut split_count = 0usize;
    for boundary in 0..(buckets.len() - 1) {
        let (cost, count_left) = split_cost(buckets, boundary);
        if cost < min_cost {
            min_cost = cost;
            split_count = count_left;
        }
    }
    split_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shape::Shape;
    use crate::math::constants::{Float, Vector3f};
    use crate::math::ray::Ray3f;
    use crate::shapes::triangle::Triangle;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_triangles(rng: &mut StdRng, n: usize) -> Vec<Triangle> {
        (0..n)
            .map(|_| {
                let c = Vector3f::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                );
                let mut jitter = || {
                    Vector3f::new(
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                    )
                };
                Triangle::new(c + jitter(), c + jitter(), c + jitter())
            })
            .collect()
    }

    fn build(triangles: &[Triangle], split_method: SplitMethod) -> BVH {
        let bounds = triangles.iter().map(|t| t.bounding_box()).collect();
        BVH::with_settings(bounds, 1, split_method)
    }

    fn intersect(bvh: &BVH, triangles: &[Triangle], ray: &Ray3f) -> Option<(usize, Float)> {
        bvh.ray_intersection(ray, |prim_idx, ray| {
            triangles[prim_idx].ray_intersection(ray).map(|h| (h.t(), h.t()))
        })
    }

    fn naive(triangles: &[Triangle], ray: &Ray3f) -> Option<(usize, Float)> {
        let mut closest: Option<(usize, Float)> = None;
        for (i, tri) in triangles.iter().enumerate() {
            if let Some(hit) = tri.ray_intersection(ray) {
                if closest.map_or(true, |(_, t)| hit.t() < t) {
                    closest = Some((i, hit.t()));
                }
            }
        }
        closest
    }

    /// Returns the primitives under `node_idx` and checks containment and
    /// the binary shape on the way up.
    fn check_subtree(bvh: &BVH, node_idx: usize, leaves: &mut usize, interiors: &mut usize) -> Vec<usize> {
        match &bvh.nodes[node_idx] {
            BVHNode::Leaf { bounds, primitive } => {
                *leaves += 1;
                assert_eq!(*bounds, bvh.prim_bounds[*primitive]);
                vec![*primitive]
            }
            BVHNode::Interior { bounds, left, right } => {
                *interiors += 1;
                assert_ne!(left, right);
                let mut prims = check_subtree(bvh, *left, leaves, interiors);
                prims.extend(check_subtree(bvh, *right, leaves, interiors));
                for p in &prims {
                    assert!(bounds.contains(&bvh.prim_bounds[*p]), "node {} misses primitive {}", node_idx, p);
                }
                assert_eq!(
                    *bounds,
                    AABB::union(bvh.nodes[*left].bounds(), bvh.nodes[*right].bounds())
                );
                prims
            }
        }
    }

    fn check_structure(bvh: &BVH, n: usize) {
        let mut leaves = 0;
        let mut interiors = 0;
        let mut prims = check_subtree(bvh, 0, &mut leaves, &mut interiors);
        prims.sort_unstable();
        assert_eq!(prims, (0..n).collect::<Vec<_>>());
        assert_eq!(leaves, n);
        assert_eq!(interiors, n - 1);
        assert_eq!(bvh.node_count(), 2 * n - 1);
        assert_eq!(bvh.leaf_count(), n);
    }

    #[test]
    fn test_bvh_empty() {
        let bvh = BVH::new(Vec::new());
        assert!(bvh.is_empty());
        assert!(!bvh.bounds().is_valid());

        let ray = Ray3f::new(Vector3f::zeros(), Vector3f::new(0.0, 0.0, 1.0), None, None);
        let hit: Option<(usize, Float)> = bvh.ray_intersection(&ray, |_, _| Some((0.0, 0.0)));
        assert!(hit.is_none());
    }

    #[test]
    fn test_bvh_two_triangles() {
        let triangles = vec![
            Triangle::new(Vector3f::new(0.0, 0.0, 0.0), Vector3f::new(1.0, 0.0, 0.0), Vector3f::new(0.0, 1.0, 0.0)),
            Triangle::new(Vector3f::new(5.0, 0.0, 2.0), Vector3f::new(6.0, 0.0, 2.0), Vector3f::new(5.0, 1.0, 3.0)),
        ];
        let bvh = build(&triangles, SplitMethod::Sah);

        assert_eq!(bvh.node_count(), 3);
        match &bvh.nodes[0] {
            BVHNode::Interior { bounds, left, right } => {
                assert!(bvh.nodes[*left].is_leaf());
                assert!(bvh.nodes[*right].is_leaf());
                let expected = AABB::union(&triangles[0].bounding_box(), &triangles[1].bounding_box());
                assert_eq!(*bounds, expected);
            }
            BVHNode::Leaf { .. } => panic!("root of two primitives must be interior"),
        }
    }

    #[test]
    fn test_bvh_single_primitive_is_leaf() {
        let triangles = vec![Triangle::new(
            Vector3f::new(0.0, 0.0, 0.0),
            Vector3f::new(1.0, 0.0, 0.0),
            Vector3f::new(0.0, 1.0, 0.0),
        )];
        let bvh = build(&triangles, SplitMethod::Sah);
        assert_eq!(bvh.node_count(), 1);
        assert!(bvh.nodes[0].is_leaf());
        assert_eq!(bvh.bounds(), triangles[0].bounding_box());
    }

    #[test]
    fn test_bvh_structure_and_containment() {
        let mut rng = StdRng::seed_from_u64(17);
        for &split_method in &[SplitMethod::Sah, SplitMethod::Middle] {
            for n in 1..60 {
                let triangles = random_triangles(&mut rng, n);
                let bvh = build(&triangles, split_method);
                check_structure(&bvh, n);

                let mut all = AABB::default();
                for tri in &triangles {
                    all.expand_by_aabb(&tri.bounding_box());
                }
                assert_eq!(bvh.bounds(), all);
            }
        }
    }

    #[test]
    fn test_bvh_coincident_centroids_fall_back_to_median() {
        let tri = || Triangle::new(
            Vector3f::new(0.0, 0.0, 0.0),
            Vector3f::new(1.0, 0.0, 0.0),
            Vector3f::new(0.0, 1.0, 0.0),
        );
        let triangles: Vec<Triangle> = (0..10).map(|_| tri()).collect();
        let bvh = build(&triangles, SplitMethod::Sah);
        check_structure(&bvh, 10);

        // Median split keeps the depth logarithmic.
        match &bvh.nodes[0] {
            BVHNode::Interior { left, .. } => assert_eq!(*left, 1),
            BVHNode::Leaf { .. } => panic!("expected interior root"),
        }
        let ray = Ray3f::new(Vector3f::new(0.2, 0.2, 1.0), Vector3f::new(0.0, 0.0, -1.0), None, None);
        let hit = intersect(&bvh, &triangles, &ray).expect("expected a hit");
        assert!((hit.1 - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_split_cost_uses_dedicated_right_bounds() {
        let unit = AABB::new(Vector3f::new(0.0, 0.0, 0.0), Vector3f::new(1.0, 1.0, 1.0));
        let far = AABB::new(Vector3f::new(9.0, 0.0, 0.0), Vector3f::new(10.0, 1.0, 1.0));
        let buckets = [
            Bucket { count: 2, bounds: unit },
            Bucket::default(),
            Bucket::default(),
            Bucket { count: 1, bounds: far },
        ];

        // 6 * 2 on the left, 6 * 1 on the right. Re-unioning the right side
        // with the left accumulator would give 12 + 42 instead.
        let (cost, count_left) = split_cost(&buckets, 0);
        assert_eq!(count_left, 2);
        assert!((cost - 18.0).abs() < 1e-4);

        let (cost, count_left) = split_cost(&buckets, 2);
        assert_eq!(count_left, 2);
        assert!((cost - 18.0).abs() < 1e-4);

        assert_eq!(best_split_count(&buckets), 2);
    }

    #[test]
    fn test_sah_separates_clusters() {
        // Three tight triangles near x = 0 and one at x = 100: the cheapest
        // cut isolates the far one rather than halving the list.
        let at = |x: Float| Triangle::new(
            Vector3f::new(x, 0.0, 0.0),
            Vector3f::new(x + 0.1, 0.0, 0.0),
            Vector3f::new(x, 0.1, 0.0),
        );
        let triangles = vec![at(0.0), at(0.2), at(0.4), at(100.0)];
        let bvh = build(&triangles, SplitMethod::Sah);
        check_structure(&bvh, 4);

        match &bvh.nodes[0] {
            BVHNode::Interior { right, .. } => match &bvh.nodes[*right] {
                BVHNode::Leaf { primitive, .. } => assert_eq!(*primitive, 3),
                BVHNode::Interior { .. } => panic!("far triangle should sit alone on the right"),
            },
            BVHNode::Leaf { .. } => panic!("expected interior root"),
        }
    }

    #[test]
    fn test_bvh_vs_naive_triangles() {
        let mut rng = StdRng::seed_from_u64(2026);
        for &split_method in &[SplitMethod::Sah, SplitMethod::Middle] {
            let triangles = random_triangles(&mut rng, 200);
            let bvh = build(&triangles, split_method);

            let mut hits = 0;
            for _ in 0..500 {
                let origin = Vector3f::new(
                    rng.gen_range(-15.0..15.0),
                    rng.gen_range(-15.0..15.0),
                    rng.gen_range(-15.0..15.0),
                );
                let target = Vector3f::new(
                    rng.gen_range(-8.0..8.0),
                    rng.gen_range(-8.0..8.0),
                    rng.gen_range(-8.0..8.0),
                );
                let ray = Ray3f::new(origin, target - origin, None, None);

                let bvh_hit = intersect(&bvh, &triangles, &ray);
                let naive_hit = naive(&triangles, &ray);
                match (bvh_hit, naive_hit) {
                    (Some((_, bvh_t)), Some((_, naive_t))) => {
                        hits += 1;
                        assert!((bvh_t - naive_t).abs() < 1e-4, "{} vs {}", bvh_t, naive_t);
                    }
                    (None, None) => {}
                    (b, n) => panic!("BVH {:?} disagrees with linear scan {:?}", b, n),
                }
            }
            assert!(hits > 0);
        }
    }

    #[test]
    fn test_bvh_root_miss_returns_none() {
        let mut rng = StdRng::seed_from_u64(5);
        let triangles = random_triangles(&mut rng, 32);
        let bvh = build(&triangles, SplitMethod::Sah);

        let mut calls = 0;
        let ray = Ray3f::new(Vector3f::new(100.0, 100.0, 100.0), Vector3f::new(1.0, 0.0, 0.0), None, None);
        let hit: Option<(usize, Float)> = bvh.ray_intersection(&ray, |_, _| {
            calls += 1;
            None
        });
        assert!(hit.is_none());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_max_leaf_size_is_clamped() {
        let bvh = BVH::with_settings(Vec::new(), 1000, SplitMethod::Middle);
        assert_eq!(bvh.max_leaf_size(), 255);
        assert_eq!(bvh.split_method(), SplitMethod::Middle);
        let bvh = BVH::with_settings(Vec::new(), 0, SplitMethod::Sah);
        assert_eq!(bvh.max_leaf_size(), 1);
    }
}
