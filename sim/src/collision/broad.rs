use rapier3d::parry::partitioning::{Bvh, BvhBuildStrategy};

use super::{
    narrow_phase::{aabb_intersects_aabb, resolve_contacts},
    types::{Aabb, Capsule, Penetration, StaticCollider, Triangle, TriangleFilter},
};
use crate::{
    error::SceneError,
    four_d::W4dTable,
    scene::{EntityId, SceneGraph},
};

/// Mesh collider over merged static triangles, backed by parry's BVH.
///
/// Notes:
/// - One leaf per triangle; leaf `i` is the world-space AABB of `triangles[i]`.
/// - Interchangeable with the octree in the physics step through [`StaticCollider`].
pub struct TriangleBvh {
    bvh: Bvh,
    triangles: Vec<Triangle>,
}

impl TriangleBvh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        let aabbs: Vec<Aabb> = triangles.iter().map(Triangle::aabb).collect();
        let bvh = Bvh::from_leaves(BvhBuildStrategy::Binned, &aabbs);
        log::debug!("triangle bvh built over {} triangles", triangles.len());
        Self { bvh, triangles }
    }

    /// Merge every mesh under `root` into one world-space collider.
    pub fn from_scene(
        graph: &impl SceneGraph,
        root: EntityId,
        tags: &W4dTable,
    ) -> Result<Self, SceneError> {
        Ok(Self::new(super::scene_triangles(graph, root, tags)?))
    }

    /// Return true if this collider has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Visit every triangle whose AABB overlaps `bounds`.
    ///
    /// `visit` returns `true` to stop early; the return value reports whether
    /// the traversal was stopped.
    pub fn shapecast<'a>(
        &'a self,
        bounds: &Aabb,
        mut visit: impl FnMut(u32, &'a Triangle) -> bool,
    ) -> bool {
        if self.is_empty() {
            return false;
        }
        for leaf in self.bvh.intersect_aabb(bounds) {
            let triangle = &self.triangles[leaf as usize];
            // The BVH prunes by node; recheck the leaf box itself.
            if aabb_intersects_aabb(&triangle.aabb(), bounds) && visit(leaf, triangle) {
                return true;
            }
        }
        false
    }

    /// Net push that moves `capsule` out of every triangle it overlaps.
    pub fn capsule_intersect(
        &self,
        capsule: &Capsule,
        filter: Option<TriangleFilter<'_>>,
    ) -> Option<Penetration> {
        let mut candidates: Vec<(u32, &Triangle)> = Vec::new();
        self.shapecast(&capsule.aabb(), |leaf, t| {
            if filter.is_none_or(|f| f(t)) {
                candidates.push((leaf, t));
            }
            false
        });
        // Stable candidate order independent of traversal order.
        candidates.sort_unstable_by_key(|&(leaf, _)| leaf);
        let candidates: Vec<&Triangle> = candidates.into_iter().map(|(_, t)| t).collect();
        resolve_contacts(capsule, &candidates)
    }
}

impl StaticCollider for TriangleBvh {
    #[inline]
    fn capsule_intersect(
        &self,
        capsule: &Capsule,
        filter: Option<TriangleFilter<'_>>,
    ) -> Option<Penetration> {
        TriangleBvh::capsule_intersect(self, capsule, filter)
    }

    #[inline]
    fn triangle_count(&self) -> usize {
        self.len()
    }
}
