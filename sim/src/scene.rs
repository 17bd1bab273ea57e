//! Minimal scene-graph surface the collision core reads from.
//!
//! Renderers and asset loaders live elsewhere; all the core needs is a tree of
//! entities with local transforms and (optionally) triangle geometry. Any
//! engine can implement [`SceneGraph`]; [`SceneTree`] is a small arena
//! implementation used by tools and tests.

use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::SceneError;

/// Stable identifier of a scene entity (also the key of the 4D side table).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Raw triangle geometry, optionally indexed.
#[derive(Clone, Debug, Default)]
pub struct MeshGeometry {
    pub positions: Vec<Point3<f32>>,
    /// When present, every three indices form one triangle.
    pub indices: Option<Vec<u32>>,
}

impl MeshGeometry {
    pub fn new(positions: Vec<Point3<f32>>) -> Self {
        Self {
            positions,
            indices: None,
        }
    }

    pub fn indexed(positions: Vec<Point3<f32>>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices: Some(indices),
        }
    }

    /// Expand into independent triangles (local space).
    pub fn triangles(&self) -> Result<Vec<[Point3<f32>; 3]>, SceneError> {
        match &self.indices {
            None => {
                if self.positions.len() % 3 != 0 {
                    return Err(SceneError::IncompleteTriangle {
                        count: self.positions.len(),
                    });
                }
                Ok(self
                    .positions
                    .chunks_exact(3)
                    .map(|c| [c[0], c[1], c[2]])
                    .collect())
            }
            Some(indices) => {
                if indices.len() % 3 != 0 {
                    return Err(SceneError::IncompleteTriangle {
                        count: indices.len(),
                    });
                }
                let vertex = |i: u32| {
                    self.positions
                        .get(i as usize)
                        .copied()
                        .ok_or(SceneError::IndexOutOfRange {
                            index: i,
                            vertex_count: self.positions.len(),
                        })
                };
                indices
                    .chunks_exact(3)
                    .map(|c| Ok([vertex(c[0])?, vertex(c[1])?, vertex(c[2])?]))
                    .collect()
            }
        }
    }

    /// Horizontal grid in the XZ plane centered at the origin, faces pointing +Y.
    pub fn plane_xz(width: f32, depth: f32, segments_x: u32, segments_z: u32) -> Self {
        let sx = segments_x.max(1);
        let sz = segments_z.max(1);
        let dx = width / sx as f32;
        let dz = depth / sz as f32;
        let mut positions = Vec::with_capacity((sx * sz * 6) as usize);
        for ix in 0..sx {
            for iz in 0..sz {
                let origin = Point3::new(
                    -0.5 * width + ix as f32 * dx,
                    0.0,
                    -0.5 * depth + iz as f32 * dz,
                );
                push_quad(
                    &mut positions,
                    origin,
                    Vector3::new(0.0, 0.0, dz),
                    Vector3::new(dx, 0.0, 0.0),
                );
            }
        }
        Self::new(positions)
    }

    /// Axis-aligned cube of edge `size` centered at the origin, faces pointing outward.
    pub fn cuboid(size: f32) -> Self {
        let h = 0.5 * size;
        let x = Vector3::new(size, 0.0, 0.0);
        let y = Vector3::new(0.0, size, 0.0);
        let z = Vector3::new(0.0, 0.0, size);
        let mut positions = Vec::with_capacity(36);
        push_quad(&mut positions, Point3::new(-h, h, -h), z, x); // +Y
        push_quad(&mut positions, Point3::new(-h, -h, -h), x, z); // -Y
        push_quad(&mut positions, Point3::new(h, -h, -h), y, z); // +X
        push_quad(&mut positions, Point3::new(-h, -h, -h), z, y); // -X
        push_quad(&mut positions, Point3::new(-h, -h, h), x, y); // +Z
        push_quad(&mut positions, Point3::new(-h, -h, -h), y, x); // -Z
        Self::new(positions)
    }
}

/// Two counter-clockwise triangles spanning `origin + [0,1]*s + [0,1]*t`.
/// The face normal points along `s × t`.
fn push_quad(out: &mut Vec<Point3<f32>>, origin: Point3<f32>, s: Vector3<f32>, t: Vector3<f32>) {
    out.extend_from_slice(&[origin, origin + s, origin + t]);
    out.extend_from_slice(&[origin + t, origin + s, origin + s + t]);
}

/// Read access to an external scene graph.
pub trait SceneGraph {
    fn contains(&self, id: EntityId) -> bool;
    fn parent(&self, id: EntityId) -> Option<EntityId>;
    fn children(&self, id: EntityId) -> &[EntityId];
    /// Transform of `id` relative to its parent.
    fn local_transform(&self, id: EntityId) -> Matrix4<f32>;
    fn geometry(&self, id: EntityId) -> Option<&MeshGeometry>;

    /// Accumulated transform from `id` up to the root.
    fn world_transform(&self, id: EntityId) -> Result<Matrix4<f32>, SceneError> {
        if !self.contains(id) {
            return Err(SceneError::UnknownEntity(id));
        }
        let mut world = self.local_transform(id);
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            world = self.local_transform(p) * world;
            cursor = self.parent(p);
        }
        Ok(world)
    }
}

#[derive(Clone, Debug)]
struct SceneNode {
    name: String,
    parent: Option<EntityId>,
    local: Matrix4<f32>,
    geometry: Option<MeshGeometry>,
    children: Vec<EntityId>,
}

/// Arena-backed scene tree. Entity 0 is the root group.
#[derive(Clone, Debug)]
pub struct SceneTree {
    nodes: Vec<SceneNode>,
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![SceneNode {
                name: "root".into(),
                parent: None,
                local: Matrix4::identity(),
                geometry: None,
                children: Vec::new(),
            }],
        }
    }

    #[inline]
    pub fn root(&self) -> EntityId {
        EntityId(0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_group(
        &mut self,
        parent: EntityId,
        name: impl Into<String>,
        local: Matrix4<f32>,
    ) -> Result<EntityId, SceneError> {
        self.insert(parent, name.into(), local, None)
    }

    pub fn add_mesh(
        &mut self,
        parent: EntityId,
        name: impl Into<String>,
        local: Matrix4<f32>,
        geometry: MeshGeometry,
    ) -> Result<EntityId, SceneError> {
        self.insert(parent, name.into(), local, Some(geometry))
    }

    fn insert(
        &mut self,
        parent: EntityId,
        name: String,
        local: Matrix4<f32>,
        geometry: Option<MeshGeometry>,
    ) -> Result<EntityId, SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::UnknownEntity(parent));
        }
        let id = EntityId(self.nodes.len() as u32);
        self.nodes.push(SceneNode {
            name,
            parent: Some(parent),
            local,
            geometry,
            children: Vec::new(),
        });
        self.nodes[parent.0 as usize].children.push(id);
        Ok(id)
    }

    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.nodes.get(id.0 as usize).map(|n| n.name.as_str())
    }
}

impl SceneGraph for SceneTree {
    fn contains(&self, id: EntityId) -> bool {
        (id.0 as usize) < self.nodes.len()
    }

    fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.nodes.get(id.0 as usize).and_then(|n| n.parent)
    }

    fn children(&self, id: EntityId) -> &[EntityId] {
        self.nodes
            .get(id.0 as usize)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    fn local_transform(&self, id: EntityId) -> Matrix4<f32> {
        self.nodes
            .get(id.0 as usize)
            .map(|n| n.local)
            .unwrap_or_else(Matrix4::identity)
    }

    fn geometry(&self, id: EntityId) -> Option<&MeshGeometry> {
        self.nodes.get(id.0 as usize).and_then(|n| n.geometry.as_ref())
    }
}
