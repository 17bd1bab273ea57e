//! 4D tagging: a hidden angular `w` coordinate attached to scene entities.
//!
//! Tags live in a side table keyed by [`EntityId`] instead of on the entities
//! themselves. An entity's global w is its own local w plus the global w of its
//! tagged parent chain, always canonicalized into `[0, TAU)`.
//!
//! Two consumers read this table:
//! - the renderer, through [`W4dTable::visibility_alpha`] / [`W4dTable::opacity_pass`]
//!   (close in w = nearly opaque, far = faded);
//! - collision, through [`W4dTable::is_substantial`], which keeps triangles
//!   outside the substance band out of the physics step.

use std::collections::HashMap;

use crate::{
    angle::{angular_distance01, canonicalize},
    constants::{ALPHA_CAP, FADE_NEAR_SLOPE, FADE_PAST_THRESHOLD_SLOPE},
    scene::{EntityId, SceneGraph},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct W4dTag {
    /// Local w, always canonical.
    pub w_local: f32,
    /// Lookup-only back-reference to the 4D parent.
    pub parent: Option<EntityId>,
}

#[derive(Clone, Debug, Default)]
pub struct W4dTable {
    tags: HashMap<EntityId, W4dTag>,
    /// Every tagged entity in first-tagged order. Which of them are top level
    /// is decided when read, since parents may be tagged after their children.
    order: Vec<EntityId>,
}

impl W4dTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Mark `entity` as 4D-aware with local w = 0. Re-tagging resets w.
    pub fn tag(&mut self, entity: EntityId, parent: Option<EntityId>) {
        let tag = W4dTag {
            w_local: 0.0,
            parent,
        };
        if self.tags.insert(entity, tag).is_none() {
            self.order.push(entity);
        }
    }

    /// Tagged entities whose parent is untagged or absent, in tagging order.
    pub fn top_level(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.order.iter().copied().filter(|&e| {
            self.tags
                .get(&e)
                .and_then(|t| t.parent)
                .is_none_or(|p| !self.is_tagged(p))
        })
    }

    /// Tag `root` and every descendant; each descendant's 4D parent is its scene parent.
    pub fn tag_tree(&mut self, graph: &impl SceneGraph, root: EntityId, parent: Option<EntityId>) {
        let mut stack = vec![(root, parent)];
        while let Some((id, parent)) = stack.pop() {
            self.tag(id, parent);
            // Reverse so siblings are tagged in scene order.
            stack.extend(graph.children(id).iter().rev().map(|&child| (child, Some(id))));
        }
    }

    #[inline]
    pub fn is_tagged(&self, entity: EntityId) -> bool {
        self.tags.contains_key(&entity)
    }

    #[inline]
    pub fn get(&self, entity: EntityId) -> Option<&W4dTag> {
        self.tags.get(&entity)
    }

    /// Local w, or 0 when untagged.
    #[inline]
    pub fn local_w(&self, entity: EntityId) -> f32 {
        self.tags.get(&entity).map_or(0.0, |t| t.w_local)
    }

    /// Store a canonicalized local w. Returns the stored value, or `None` if untagged.
    pub fn set_local_w(&mut self, entity: EntityId, value: f32) -> Option<f32> {
        let tag = self.tags.get_mut(&entity)?;
        tag.w_local = canonicalize(value);
        Some(tag.w_local)
    }

    pub fn add_local_w(&mut self, entity: EntityId, delta: f32) -> Option<f32> {
        let current = self.tags.get(&entity)?.w_local;
        self.set_local_w(entity, current + delta)
    }

    /// Sum of local w along the tagged parent chain, canonicalized.
    pub fn global_w(&self, entity: EntityId) -> f32 {
        let mut sum = 0.0;
        let mut cursor = Some(entity);
        // A chain can never be longer than the table; anything more is a parent cycle.
        for _ in 0..=self.tags.len() {
            let Some(tag) = cursor.and_then(|e| self.tags.get(&e)) else {
                return canonicalize(sum);
            };
            sum += tag.w_local;
            cursor = tag.parent;
        }
        log::warn!("4D parent cycle detected starting at {entity:?}");
        canonicalize(sum)
    }

    /// Normalized w distance (`[0, 1]`) between `entity` and the camera.
    #[inline]
    pub fn distance_w01(&self, entity: EntityId, camera_w: f32) -> f32 {
        angular_distance01(self.global_w(entity), camera_w)
    }

    /// Render opacity for `entity` seen from a camera at `camera_w`.
    pub fn visibility_alpha(&self, entity: EntityId, camera_w: f32, substance_threshold: f32) -> f32 {
        alpha_from_distance(self.distance_w01(entity, camera_w), substance_threshold)
    }

    /// Collision predicate: untagged geometry is always solid, tagged geometry only
    /// while its w distance stays under the substance threshold.
    pub fn is_substantial(
        &self,
        source: Option<EntityId>,
        camera_w: f32,
        substance_threshold: f32,
    ) -> bool {
        match source {
            Some(e) if self.is_tagged(e) => self.distance_w01(e, camera_w) < substance_threshold,
            _ => true,
        }
    }

    /// Opacity of every top-level tagged entity for this frame.
    pub fn opacity_pass(&self, camera_w: f32, substance_threshold: f32) -> Vec<(EntityId, f32)> {
        self.top_level()
            .map(|e| (e, self.visibility_alpha(e, camera_w, substance_threshold)))
            .collect()
    }
}

/// `clamp(1 - 0.5 d - (d > threshold ? 1.5 d : 0), 0, 0.99)` for a normalized distance `d`.
#[inline]
pub fn alpha_from_distance(d: f32, substance_threshold: f32) -> f32 {
    let penalty = if d > substance_threshold {
        FADE_PAST_THRESHOLD_SLOPE * d
    } else {
        0.0
    };
    (1.0 - FADE_NEAR_SLOPE * d - penalty).clamp(0.0, ALPHA_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        angle::{PI, TAU},
        scene::{MeshGeometry, SceneTree},
    };
    use nalgebra::Matrix4;

    const EPS: f32 = 1.0e-4;

    #[test]
    fn untagged_entities_sit_at_zero() {
        let table = W4dTable::new();
        assert!(!table.is_tagged(EntityId(3)));
        assert_eq!(table.global_w(EntityId(3)), 0.0);
        assert_eq!(table.local_w(EntityId(3)), 0.0);
    }

    #[test]
    fn set_and_add_canonicalize() {
        let mut table = W4dTable::new();
        let e = EntityId(1);
        assert_eq!(table.set_local_w(e, 1.0), None);

        table.tag(e, None);
        let w = table.set_local_w(e, -1.0).unwrap();
        assert!((w - (TAU - 1.0)).abs() < EPS);
        let w = table.add_local_w(e, 2.0).unwrap();
        assert!((w - 1.0).abs() < EPS);

        // Re-tagging resets to zero.
        table.tag(e, None);
        assert_eq!(table.local_w(e), 0.0);
    }

    #[test]
    fn global_w_sums_the_parent_chain() {
        let mut table = W4dTable::new();
        let (a, b, c) = (EntityId(1), EntityId(2), EntityId(3));
        table.tag(a, None);
        table.tag(b, Some(a));
        table.tag(c, Some(b));
        table.set_local_w(a, 4.0);
        table.set_local_w(b, 2.0);
        table.set_local_w(c, 1.0);
        assert!((table.global_w(c) - (7.0 - TAU)).abs() < EPS);
        assert!((table.global_w(b) - 6.0).abs() < EPS);
    }

    #[test]
    fn chain_stops_at_untagged_ancestor() {
        let mut table = W4dTable::new();
        let child = EntityId(2);
        table.tag(child, Some(EntityId(99)));
        table.set_local_w(child, 1.5);
        assert!((table.global_w(child) - 1.5).abs() < EPS);
    }

    #[test]
    fn parent_cycle_terminates() {
        let mut table = W4dTable::new();
        let (a, b) = (EntityId(1), EntityId(2));
        table.tag(a, Some(b));
        table.tag(b, Some(a));
        table.set_local_w(a, 0.5);
        let w = table.global_w(a);
        assert!((0.0..TAU).contains(&w));
    }

    #[test]
    fn alpha_is_capped_and_fades_monotonically() {
        let mut table = W4dTable::new();
        let e = EntityId(1);
        table.tag(e, None);

        assert!((table.visibility_alpha(e, 0.0, 0.25) - ALPHA_CAP).abs() < EPS);

        let mut previous = f32::MAX;
        let steps = 64;
        for i in 0..=steps {
            let w = PI * i as f32 / steps as f32;
            table.set_local_w(e, w);
            let alpha = table.visibility_alpha(e, 0.0, 0.25);
            assert!((0.0..=ALPHA_CAP).contains(&alpha));
            assert!(alpha <= previous + EPS, "alpha rose at w={w}");
            previous = alpha;
        }
        // Opposite side of the circle is the minimum.
        assert!(previous <= alpha_from_distance(0.5, 0.25));
    }

    #[test]
    fn fade_is_sharper_past_the_threshold() {
        let below = alpha_from_distance(0.2, 0.25);
        let above = alpha_from_distance(0.3, 0.25);
        assert!((below - 0.9).abs() < EPS);
        assert!((above - (1.0 - 0.15 - 0.45)).abs() < EPS);
    }

    #[test]
    fn substance_predicate() {
        let mut table = W4dTable::new();
        let near = EntityId(1);
        let far = EntityId(2);
        table.tag(near, None);
        table.tag(far, None);
        table.set_local_w(near, 0.1);
        table.set_local_w(far, PI);

        assert!(table.is_substantial(None, 0.0, 0.25));
        assert!(table.is_substantial(Some(EntityId(77)), 0.0, 0.25));
        assert!(table.is_substantial(Some(near), 0.0, 0.25));
        assert!(!table.is_substantial(Some(far), 0.0, 0.25));
        assert!(table.is_substantial(Some(far), PI, 0.25));
    }

    #[test]
    fn tag_tree_links_scene_parents_and_lists_top_level() {
        let mut scene = SceneTree::new();
        let group = scene
            .add_group(scene.root(), "group", Matrix4::identity())
            .unwrap();
        let mesh = scene
            .add_mesh(group, "box", Matrix4::identity(), MeshGeometry::cuboid(1.0))
            .unwrap();

        let mut table = W4dTable::new();
        table.tag_tree(&scene, group, None);
        assert_eq!(table.get(mesh).and_then(|t| t.parent), Some(group));

        table.set_local_w(group, 1.0);
        table.set_local_w(mesh, 0.5);
        assert!((table.global_w(mesh) - 1.5).abs() < EPS);

        let pass = table.opacity_pass(0.0, 0.25);
        assert_eq!(pass.len(), 1);
        assert_eq!(pass[0].0, group);
    }

    #[test]
    fn parent_tagged_after_child_takes_over_the_top_level() {
        let mut table = W4dTable::new();
        let (parent, child, other) = (EntityId(1), EntityId(2), EntityId(3));
        table.tag(child, Some(parent));
        table.tag(other, None);
        assert_eq!(table.top_level().collect::<Vec<_>>(), vec![child, other]);

        table.tag(parent, None);
        assert_eq!(table.top_level().collect::<Vec<_>>(), vec![other, parent]);

        let pass = table.opacity_pass(0.0, 0.25);
        assert_eq!(pass.len(), 2);
        assert!(pass.iter().all(|&(e, _)| e != child));

        // Re-tagging keeps a single entry.
        table.tag(parent, None);
        assert_eq!(table.top_level().count(), 2);
    }
}
