/*!
Static octree over world triangles.

Triangles are added one at a time to an [`OctreeBuilder`], which tracks their
running bounds; [`OctreeBuilder::build`] then freezes them into an [`Octree`].
The tree is immutable: to change the level, discard it and build a new one.

Layout
- Triangles live in one arena; nodes store `u32` indices into it.
- The root box is the triangle bounds with its minimum corner nudged outward
  by `ROOT_BOX_EPSILON`, which keeps grid-aligned geometry off split planes.
- Nodes with more than `LEAF_THRESHOLD` triangles split into eight equal
  octants down to `MAX_DEPTH`. A triangle is referenced by every octant its
  surface touches, and empty octants are dropped.

Queries prune by node box, collect and deduplicate candidate indices, then
run the narrow phase from [`super::narrow_phase`].
*/

use rapier3d::parry::query::RayCast;

use super::{
    narrow_phase::{
        aabb_intersects_triangle, capsule_intersects_aabb, ray_triangle_toi, resolve_contacts,
        sphere_intersects_aabb,
    },
    settings::{LEAF_THRESHOLD, MAX_DEPTH, MAX_STALLED_SPLITS, OCTANT_SLOP, ROOT_BOX_EPSILON},
    types::{
        Aabb, Capsule, Penetration, Point3, Ray, RayHit, Sphere, StaticCollider, Triangle,
        TriangleFilter, Vec3,
    },
};
use crate::{
    error::SceneError,
    four_d::W4dTable,
    scene::{EntityId, SceneGraph},
};

/// Collects triangles before the octree is built.
#[derive(Clone, Debug, Default)]
pub struct OctreeBuilder {
    triangles: Vec<Triangle>,
    bounds: Option<Aabb>,
}

impl OctreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
            bounds: None,
        }
    }

    /// Store `triangle` and grow the running bounds.
    pub fn add_triangle(&mut self, triangle: Triangle) -> &mut Self {
        let tb = triangle.aabb();
        self.bounds = Some(match self.bounds {
            Some(b) => Aabb::new(b.mins.inf(&tb.mins), b.maxs.sup(&tb.maxs)),
            None => tb,
        });
        self.triangles.push(triangle);
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Tight bounds of everything added so far.
    #[inline]
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    pub fn build(self) -> Octree {
        let Some(bounds) = self.bounds else {
            return Octree::default();
        };

        let root_box = Aabb::new(bounds.mins - Vec3::repeat(ROOT_BOX_EPSILON), bounds.maxs);
        let mut nodes = vec![OctreeNode {
            aabb: root_box,
            triangles: (0..self.triangles.len() as u32).collect(),
            children: Vec::new(),
        }];
        split(&mut nodes, &self.triangles, 0, 0, 0);

        let tree = Octree {
            triangles: self.triangles,
            nodes,
        };
        log::debug!(
            "octree built: {} triangles, {} nodes, depth {}",
            tree.len(),
            tree.node_count(),
            tree.depth()
        );
        tree
    }
}

#[derive(Clone, Debug)]
struct OctreeNode {
    aabb: Aabb,
    /// Arena indices; empty on interior nodes.
    triangles: Vec<u32>,
    /// Node indices; empty on leaves.
    children: Vec<u32>,
}

/// Split `node` into its non-empty octants and recurse into crowded ones.
///
/// `stalled` counts consecutive splits whose child kept every triangle of its
/// parent; such chains stop after `MAX_STALLED_SPLITS`.
fn split(nodes: &mut Vec<OctreeNode>, triangles: &[Triangle], node: usize, level: u32, stalled: u32) {
    let parent_box = nodes[node].aabb;
    let owned = std::mem::take(&mut nodes[node].triangles);
    let half = (parent_box.maxs - parent_box.mins) * 0.5;

    for x in 0..2u8 {
        for y in 0..2u8 {
            for z in 0..2u8 {
                let offset = half.component_mul(&Vec3::new(x.into(), y.into(), z.into()));
                let mins = parent_box.mins + offset;
                let aabb = Aabb::new(mins, mins + half);
                let slop = Vec3::repeat(OCTANT_SLOP);
                let loose = Aabb::new(aabb.mins - slop, aabb.maxs + slop);

                let members: Vec<u32> = owned
                    .iter()
                    .copied()
                    .filter(|&i| aabb_intersects_triangle(&loose, &triangles[i as usize]))
                    .collect();
                if members.is_empty() {
                    continue;
                }

                let count = members.len();
                let child = nodes.len();
                nodes.push(OctreeNode {
                    aabb,
                    triangles: members,
                    children: Vec::new(),
                });
                nodes[node].children.push(child as u32);

                let stalled = if count == owned.len() { stalled + 1 } else { 0 };
                if count > LEAF_THRESHOLD && level < MAX_DEPTH && stalled < MAX_STALLED_SPLITS {
                    split(nodes, triangles, child, level + 1, stalled);
                }
            }
        }
    }
}

/// Immutable triangle octree. See the module docs for layout.
#[derive(Clone, Debug, Default)]
pub struct Octree {
    triangles: Vec<Triangle>,
    /// `nodes[0]` is the root when non-empty.
    nodes: Vec<OctreeNode>,
}

impl Octree {
    /// Index every mesh under `root`, in world space. Triangles of 4D-tagged
    /// meshes carry their entity as `source`.
    pub fn from_scene(
        graph: &impl SceneGraph,
        root: EntityId,
        tags: &W4dTable,
    ) -> Result<Self, SceneError> {
        let triangles = super::scene_triangles(graph, root, tags)?;
        Ok(Self::from_triangles(triangles))
    }

    pub fn from_triangles(triangles: impl IntoIterator<Item = Triangle>) -> Self {
        let triangles = triangles.into_iter();
        let mut builder = OctreeBuilder::with_capacity(triangles.size_hint().0);
        for t in triangles {
            builder.add_triangle(t);
        }
        builder.build()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Root box, `None` when empty.
    #[inline]
    pub fn bounds(&self) -> Option<Aabb> {
        self.nodes.first().map(|n| n.aabb)
    }

    /// Levels below the root of the deepest leaf.
    pub fn depth(&self) -> u32 {
        let mut deepest = 0;
        let mut stack: Vec<(u32, u32)> = if self.nodes.is_empty() {
            Vec::new()
        } else {
            vec![(0, 0)]
        };
        while let Some((node, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(self.nodes[node as usize].children.iter().map(|&c| (c, level + 1)));
        }
        deepest
    }

    /// Deduplicated indices of triangles in every node whose box passes `overlaps`.
    fn candidates(&self, overlaps: impl Fn(&Aabb) -> bool) -> Vec<u32> {
        let mut out = Vec::new();
        let mut stack: Vec<u32> = if self.nodes.is_empty() {
            Vec::new()
        } else {
            vec![0]
        };
        while let Some(i) = stack.pop() {
            let node = &self.nodes[i as usize];
            if !overlaps(&node.aabb) {
                continue;
            }
            out.extend_from_slice(&node.triangles);
            stack.extend_from_slice(&node.children);
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Triangle indices whose leaf boxes the ray passes through.
    pub fn ray_candidates(&self, ray: &Ray) -> Vec<u32> {
        self.candidates(|b| b.intersects_local_ray(ray, f32::MAX))
    }

    pub fn sphere_candidates(&self, sphere: &Sphere) -> Vec<u32> {
        self.candidates(|b| sphere_intersects_aabb(sphere, b))
    }

    pub fn capsule_candidates(&self, capsule: &Capsule) -> Vec<u32> {
        self.candidates(|b| capsule_intersects_aabb(capsule, b))
    }

    /// Nearest front-face hit along `ray`. A zero-length direction never hits.
    pub fn ray_intersect(&self, ray: &Ray) -> Option<RayHit> {
        if ray.dir.norm_squared() == 0.0 {
            return None;
        }

        let mut best: Option<RayHit> = None;
        for i in self.ray_candidates(ray) {
            let triangle = &self.triangles[i as usize];
            let Some(toi) = ray_triangle_toi(ray, triangle) else {
                continue;
            };
            let point: Point3 = ray.point_at(toi);
            let distance = (point - ray.origin).norm();
            if best.is_none_or(|b| distance < b.distance) {
                best = Some(RayHit {
                    distance,
                    triangle: *triangle,
                    point,
                });
            }
        }
        best
    }

    /// Net push that moves `sphere` out of every triangle it overlaps.
    pub fn sphere_intersect(&self, sphere: &Sphere) -> Option<Penetration> {
        let candidates: Vec<&Triangle> = self
            .sphere_candidates(sphere)
            .into_iter()
            .map(|i| &self.triangles[i as usize])
            .collect();
        resolve_contacts(sphere, &candidates)
    }

    /// Net push that moves `capsule` out of every triangle it overlaps.
    /// Triangles rejected by `filter` are ignored.
    pub fn capsule_intersect(
        &self,
        capsule: &Capsule,
        filter: Option<TriangleFilter<'_>>,
    ) -> Option<Penetration> {
        let candidates: Vec<&Triangle> = self
            .capsule_candidates(capsule)
            .into_iter()
            .map(|i| &self.triangles[i as usize])
            .filter(|t| filter.is_none_or(|f| f(t)))
            .collect();
        resolve_contacts(capsule, &candidates)
    }
}

impl StaticCollider for Octree {
    #[inline]
    fn capsule_intersect(
        &self,
        capsule: &Capsule,
        filter: Option<TriangleFilter<'_>>,
    ) -> Option<Penetration> {
        Octree::capsule_intersect(self, capsule, filter)
    }

    #[inline]
    fn triangle_count(&self) -> usize {
        self.len()
    }
}
