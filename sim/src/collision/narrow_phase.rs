use super::{
    settings::{DIST_EPS, NORMAL_EPS_SQ},
    types::{Aabb, Capsule, Contact, Penetration, Point3, Ray, Sphere, Triangle, Vec3},
};

/// A shape that can be pushed out of triangles one contact at a time.
pub trait MovingShape: Copy {
    /// Contact of this shape against one triangle, if they overlap.
    fn contact(&self, triangle: &Triangle) -> Option<Contact>;
    fn translate(&mut self, v: &Vec3);
    /// Reference point whose displacement is reported as the net penetration.
    fn center(&self) -> Point3;
}

impl MovingShape for Capsule {
    #[inline]
    fn contact(&self, triangle: &Triangle) -> Option<Contact> {
        triangle_capsule_contact(triangle, self)
    }

    #[inline]
    fn translate(&mut self, v: &Vec3) {
        Capsule::translate(self, v);
    }

    #[inline]
    fn center(&self) -> Point3 {
        Capsule::center(self)
    }
}

impl MovingShape for Sphere {
    #[inline]
    fn contact(&self, triangle: &Triangle) -> Option<Contact> {
        triangle_sphere_contact(triangle, self)
    }

    #[inline]
    fn translate(&mut self, v: &Vec3) {
        Sphere::translate(self, v);
    }

    #[inline]
    fn center(&self) -> Point3 {
        self.center
    }
}

/// Push `shape` out of `candidates`, deepest contact first.
///
/// Each round re-tests the remaining triangles against the already-moved shape
/// and applies only the deepest contact, so the result does not depend on the
/// order the candidates were collected in. A triangle is resolved at most once.
/// Returns the net displacement of the shape's center, or `None` when nothing
/// touched.
pub fn resolve_contacts<S: MovingShape>(shape: &S, candidates: &[&Triangle]) -> Option<Penetration> {
    let mut moved = *shape;
    let mut pending: Vec<&Triangle> = candidates.to_vec();
    let mut last_normal = None;
    let mut max_normal_y = f32::NEG_INFINITY;

    loop {
        let deepest = pending
            .iter()
            .enumerate()
            .filter_map(|(i, t)| moved.contact(t).map(|c| (i, c)))
            .filter(|(_, c)| c.depth > 0.0)
            .max_by(|(_, a), (_, b)| a.depth.total_cmp(&b.depth));

        let Some((i, contact)) = deepest else { break };
        moved.translate(&(contact.normal * contact.depth));
        last_normal = Some(contact.normal);
        max_normal_y = max_normal_y.max(contact.normal.y);
        pending.swap_remove(i);
    }

    let last_normal = last_normal?;
    let displacement = moved.center() - shape.center();
    let depth = displacement.norm();
    // Opposing contacts can cancel out; fall back to the last applied normal.
    let normal = if depth * depth > NORMAL_EPS_SQ {
        displacement / depth
    } else {
        last_normal
    };
    Some(Penetration {
        normal,
        depth,
        max_normal_y,
    })
}

/// Capsule vs triangle.
///
/// Face contact when the capsule axis crosses the slab `radius` in front of the
/// plane at a point inside the triangle; otherwise the closest approach between
/// the axis and each edge.
pub fn triangle_capsule_contact(triangle: &Triangle, capsule: &Capsule) -> Option<Contact> {
    let plane = triangle.plane()?;
    let r = capsule.radius;
    let d1 = plane.distance_to_point(&capsule.start) - r;
    let d2 = plane.distance_to_point(&capsule.end) - r;
    if (d1 > 0.0 && d2 > 0.0) || (d1 < -r && d2 < -r) {
        return None;
    }

    let span = d1.abs() + d2.abs();
    let t = if span > 0.0 { (d1 / span).abs() } else { 0.0 };
    let crossing = capsule.start + (capsule.end - capsule.start) * t;
    if triangle.contains_point(&crossing) {
        return Some(Contact {
            normal: plane.normal,
            depth: d1.min(d2).abs(),
        });
    }

    let r2 = r * r;
    for (a, b) in triangle.edges() {
        let (on_axis, on_edge) = segment_closest_points(&capsule.start, &capsule.end, &a, &b);
        let offset = on_axis - on_edge;
        let dist2 = offset.norm_squared();
        if dist2 < r2 {
            let dist = dist2.sqrt();
            let normal = if dist2 > NORMAL_EPS_SQ {
                offset / dist
            } else {
                plane.normal
            };
            return Some(Contact {
                normal,
                depth: r - dist,
            });
        }
    }
    None
}

/// Sphere vs triangle. Face contact when the center projects inside the
/// triangle, otherwise the nearest edge point within `radius`.
pub fn triangle_sphere_contact(triangle: &Triangle, sphere: &Sphere) -> Option<Contact> {
    let plane = triangle.plane()?;
    let dist = plane.distance_to_point(&sphere.center);
    if dist.abs() > sphere.radius {
        return None;
    }

    let projected = plane.project_point(&sphere.center);
    if triangle.contains_point(&projected) {
        return Some(Contact {
            normal: plane.normal,
            depth: (dist - sphere.radius).abs(),
        });
    }

    let slice_r2 = sphere.radius * sphere.radius - dist * dist;
    for (a, b) in triangle.edges() {
        let closest = closest_point_on_segment(&a, &b, &projected);
        let offset = sphere.center - closest;
        let d2 = offset.norm_squared();
        if d2 < slice_r2 {
            let d = d2.sqrt();
            let normal = if d2 > NORMAL_EPS_SQ {
                offset / d
            } else {
                plane.normal
            };
            return Some(Contact {
                normal,
                depth: sphere.radius - d,
            });
        }
    }
    None
}

/// Closest point to `p` on segment `[a, b]`.
pub fn closest_point_on_segment(a: &Point3, b: &Point3, p: &Point3) -> Point3 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= DIST_EPS * DIST_EPS {
        return *a;
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest points between segments `[p1, q1]` and `[p2, q2]`, as
/// `(on_first, on_second)`.
pub fn segment_closest_points(p1: &Point3, q1: &Point3, p2: &Point3, q2: &Point3) -> (Point3, Point3) {
    const EPS: f32 = DIST_EPS * DIST_EPS;

    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    if a <= EPS && e <= EPS {
        return (*p1, *p2);
    }

    let (s, t) = if a <= EPS {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= EPS {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            // Parallel segments: any s works, start from the first endpoint.
            let s = if denom != 0.0 {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let t = (b * s + f) / e;
            if t < 0.0 {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else if t > 1.0 {
                (((b - c) / a).clamp(0.0, 1.0), 1.0)
            } else {
                (s, t)
            }
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}

/// Ray parameter of the hit against the front face of `triangle`, if any.
///
/// Back faces (ray travelling along the face normal) are ignored. The returned
/// parameter is in units of `ray.dir`, not necessarily meters.
pub fn ray_triangle_toi(ray: &Ray, triangle: &Triangle) -> Option<f32> {
    let edge1 = triangle.b - triangle.a;
    let edge2 = triangle.c - triangle.a;
    let normal = edge1.cross(&edge2);

    let ddn = ray.dir.dot(&normal);
    if ddn >= 0.0 {
        // Back face, or parallel to the plane.
        return None;
    }
    let ddn = -ddn;

    let diff = ray.origin - triangle.a;
    let b1 = -ray.dir.dot(&diff.cross(&edge2));
    if b1 < 0.0 {
        return None;
    }
    let b2 = -ray.dir.dot(&edge1.cross(&diff));
    if b2 < 0.0 || b1 + b2 > ddn {
        return None;
    }

    let qdn = diff.dot(&normal);
    if qdn < 0.0 {
        // Triangle is behind the ray origin.
        return None;
    }
    Some(qdn / ddn)
}

#[inline]
pub fn aabb_intersects_aabb(a: &Aabb, b: &Aabb) -> bool {
    a.mins.x <= b.maxs.x
        && a.maxs.x >= b.mins.x
        && a.mins.y <= b.maxs.y
        && a.maxs.y >= b.mins.y
        && a.mins.z <= b.maxs.z
        && a.maxs.z >= b.mins.z
}

pub fn sphere_intersects_aabb(sphere: &Sphere, aabb: &Aabb) -> bool {
    let clamped = sphere.center.sup(&aabb.mins).inf(&aabb.maxs);
    (clamped - sphere.center).norm_squared() <= sphere.radius * sphere.radius
}

/// Conservative: tests the capsule's own bounding box.
#[inline]
pub fn capsule_intersects_aabb(capsule: &Capsule, aabb: &Aabb) -> bool {
    aabb_intersects_aabb(&capsule.aabb(), aabb)
}

/// Separating-axis test between a box and a triangle: the three box axes, the
/// triangle normal and the nine edge cross products.
pub fn aabb_intersects_triangle(aabb: &Aabb, triangle: &Triangle) -> bool {
    if aabb.mins.x > aabb.maxs.x || aabb.mins.y > aabb.maxs.y || aabb.mins.z > aabb.maxs.z {
        return false;
    }

    let center = nalgebra::center(&aabb.mins, &aabb.maxs);
    let extents = (aabb.maxs - aabb.mins) * 0.5;

    let v0 = triangle.a - center;
    let v1 = triangle.b - center;
    let v2 = triangle.c - center;
    let f0 = v1 - v0;
    let f1 = v2 - v1;
    let f2 = v0 - v2;

    let separated = |axis: Vec3| {
        let p0 = v0.dot(&axis);
        let p1 = v1.dot(&axis);
        let p2 = v2.dot(&axis);
        let r = extents.dot(&axis.abs());
        (-p0.max(p1).max(p2)).max(p0.min(p1).min(p2)) > r
    };

    let box_axes = [Vec3::x(), Vec3::y(), Vec3::z()];
    for u in &box_axes {
        for f in [f0, f1, f2] {
            if separated(u.cross(&f)) {
                return false;
            }
        }
    }
    if box_axes.iter().any(|&u| separated(u)) {
        return false;
    }
    !separated(f0.cross(&f1))
}
