/*!
Collision root module.

Static triangle-mesh collision for the first-person controller. The code is
split for clarity:

- types:        shared data types (Triangle, Capsule, Sphere, Penetration, StaticCollider)
- settings:     index and tolerance constants
- narrow_phase: triangle vs capsule / sphere / ray, box overlap, contact relaxation
- octree:       static octree index with ray / sphere / capsule queries
- broad:        BVH mesh collider over the same triangles
*/

pub mod broad;
pub mod narrow_phase;
pub mod octree;
pub mod settings;
pub mod types;

// Re-export commonly used types.
pub use broad::TriangleBvh;
pub use octree::{Octree, OctreeBuilder};
pub use types::{
    Aabb, Capsule, Contact, Penetration, Plane, Point3, Ray, RayHit, Sphere, StaticCollider,
    Triangle, TriangleFilter, Vec3,
};

use crate::{
    error::SceneError,
    four_d::W4dTable,
    scene::{EntityId, SceneGraph},
};

/// World-space triangles of every mesh under `root` (inclusive), in depth-first
/// scene order. Triangles of 4D-tagged meshes carry the mesh as `source`.
pub fn scene_triangles(
    graph: &impl SceneGraph,
    root: EntityId,
    tags: &W4dTable,
) -> Result<Vec<Triangle>, SceneError> {
    let mut out = Vec::new();
    let mut stack = vec![(root, graph.world_transform(root)?)];
    while let Some((id, world)) = stack.pop() {
        if let Some(geometry) = graph.geometry(id) {
            let source = tags.is_tagged(id).then_some(id);
            out.extend(geometry.triangles()?.into_iter().map(|[a, b, c]| {
                Triangle::new(
                    world.transform_point(&a),
                    world.transform_point(&b),
                    world.transform_point(&c),
                )
                .with_source(source)
            }));
        }
        stack.extend(
            graph
                .children(id)
                .iter()
                .rev()
                .map(|&child| (child, world * graph.local_transform(child))),
        );
    }
    Ok(out)
}
