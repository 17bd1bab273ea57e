/*!
Core collision types and math aliases shared by the collision submodules.

This module intentionally contains no algorithms beyond small per-type
helpers. It defines the data exchanged between:
- the octree and BVH indices (broad phase: box pruning, candidate lists)
- narrow_phase (triangle vs capsule / sphere / ray, box overlap tests)
- the physics step, which only sees [`StaticCollider`] and [`Penetration`]

Bounding boxes and rays are parry's (re-exported through rapier3d) so the
indices can use parry's ray-vs-box test and BVH directly.
*/

use nalgebra as na;

use crate::scene::EntityId;

pub use rapier3d::parry::{bounding_volume::Aabb, query::Ray};

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Point3 = na::Point3<f32>;

/// World-space triangle. Winding is counter-clockwise seen from the front face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub a: Point3,
    pub b: Point3,
    pub c: Point3,
    /// Owning 4D-tagged entity, if any.
    pub source: Option<EntityId>,
}

impl Triangle {
    #[inline]
    pub fn new(a: Point3, b: Point3, c: Point3) -> Self {
        Self {
            a,
            b,
            c,
            source: None,
        }
    }

    #[inline]
    pub fn with_source(mut self, source: Option<EntityId>) -> Self {
        self.source = source;
        self
    }

    #[inline]
    pub fn vertices(&self) -> [Point3; 3] {
        [self.a, self.b, self.c]
    }

    /// Edges as `(start, end)` in winding order.
    #[inline]
    pub fn edges(&self) -> [(Point3, Point3); 3] {
        [(self.a, self.b), (self.b, self.c), (self.c, self.a)]
    }

    /// Unit front-face normal, or `None` for a degenerate triangle.
    pub fn normal(&self) -> Option<Vec3> {
        (self.c - self.b)
            .cross(&(self.a - self.b))
            .try_normalize(f32::EPSILON)
    }

    pub fn plane(&self) -> Option<Plane> {
        Plane::from_point_normal(self.a, self.normal()?)
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::new(
            self.a.inf(&self.b).inf(&self.c),
            self.a.sup(&self.b).sup(&self.c),
        )
    }

    /// Barycentric containment of a point assumed to lie in the triangle's plane.
    pub fn contains_point(&self, p: &Point3) -> bool {
        let v0 = self.c - self.a;
        let v1 = self.b - self.a;
        let v2 = p - self.a;

        let dot00 = v0.dot(&v0);
        let dot01 = v0.dot(&v1);
        let dot02 = v0.dot(&v2);
        let dot11 = v1.dot(&v1);
        let dot12 = v1.dot(&v2);

        let denom = dot00 * dot11 - dot01 * dot01;
        if denom == 0.0 {
            return false;
        }
        let inv = 1.0 / denom;
        let u = (dot11 * dot02 - dot01 * dot12) * inv;
        let v = (dot00 * dot12 - dot01 * dot02) * inv;
        u >= 0.0 && v >= 0.0 && u + v <= 1.0
    }
}

/// Infinite plane `normal · x + constant = 0` with a unit normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub constant: f32,
}

impl Plane {
    pub fn from_point_normal(point: Point3, normal: Vec3) -> Option<Self> {
        let normal = normal.try_normalize(f32::EPSILON)?;
        Some(Self {
            normal,
            constant: -normal.dot(&point.coords),
        })
    }

    /// Signed distance, positive on the front side.
    #[inline]
    pub fn distance_to_point(&self, p: &Point3) -> f32 {
        self.normal.dot(&p.coords) + self.constant
    }

    #[inline]
    pub fn project_point(&self, p: &Point3) -> Point3 {
        p - self.normal * self.distance_to_point(p)
    }
}

/// Capsule as a core segment swept by a sphere of `radius`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Capsule {
    pub start: Point3,
    pub end: Point3,
    pub radius: f32,
}

impl Capsule {
    #[inline]
    pub fn new(start: Point3, end: Point3, radius: f32) -> Self {
        Self { start, end, radius }
    }

    #[inline]
    pub fn center(&self) -> Point3 {
        na::center(&self.start, &self.end)
    }

    #[inline]
    pub fn translate(&mut self, v: &Vec3) {
        self.start += v;
        self.end += v;
    }

    pub fn aabb(&self) -> Aabb {
        let r = Vec3::repeat(self.radius);
        Aabb::new(
            self.start.inf(&self.end) - r,
            self.start.sup(&self.end) + r,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    pub center: Point3,
    pub radius: f32,
}

impl Sphere {
    #[inline]
    pub fn new(center: Point3, radius: f32) -> Self {
        Self { center, radius }
    }

    #[inline]
    pub fn translate(&mut self, v: &Vec3) {
        self.center += v;
    }

    pub fn aabb(&self) -> Aabb {
        let r = Vec3::repeat(self.radius);
        Aabb::new(self.center - r, self.center + r)
    }
}

/// A single triangle contact: push the moving shape along `normal` by `depth`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    pub normal: Vec3,
    pub depth: f32,
}

/// Net correction after resolving every contact of a query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Penetration {
    /// Unit direction the shape was pushed.
    pub normal: Vec3,
    /// Distance the shape was pushed.
    pub depth: f32,
    /// Largest `normal.y` among the individual contacts applied. Stays high
    /// while standing on a floor even when a wall tilts the net direction.
    pub max_normal_y: f32,
}

/// Nearest ray hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub triangle: Triangle,
    pub point: Point3,
}

/// Per-triangle gate deciding whether a triangle takes part in a query.
pub type TriangleFilter<'a> = &'a dyn Fn(&Triangle) -> bool;

/// A static triangle collider the physics step can push a capsule out of.
pub trait StaticCollider {
    /// Resolve `capsule` against every colliding triangle that passes `filter`.
    fn capsule_intersect(
        &self,
        capsule: &Capsule,
        filter: Option<TriangleFilter<'_>>,
    ) -> Option<Penetration>;

    /// Number of stored triangles.
    fn triangle_count(&self) -> usize;
}
