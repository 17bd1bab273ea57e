//! Demo level: a floor grid with a few boxes, some of them shifted through w.

use freeroam_sim::{EntityId, MeshGeometry, SceneError, SceneTree, W4dTable, angle::PI};
use nalgebra::{Matrix4, Point3, Vector3};

const FLOOR_SIZE: f32 = 40.0;
const FLOOR_SEGMENTS: u32 = 20;
const BOX_SIZE: f32 = 2.0;

pub struct Level {
    pub scene: SceneTree,
    pub w4d: W4dTable,
    pub camera: EntityId,
    pub spawn: Point3<f32>,
}

/// A solid box, two boxes sitting at other w values and a stacked tower.
///
/// Boxes are placed in front of the spawn point (the player faces -Z).
pub fn build() -> Result<Level, SceneError> {
    let mut scene = SceneTree::new();
    let root = scene.root();
    let mut w4d = W4dTable::new();

    scene.add_mesh(
        root,
        "floor",
        Matrix4::identity(),
        MeshGeometry::plane_xz(FLOOR_SIZE, FLOOR_SIZE, FLOOR_SEGMENTS, FLOOR_SEGMENTS),
    )?;

    add_box(&mut scene, root, "solid", Vector3::new(-4.0, 0.0, -6.0))?;

    // Shifted w: both start out of phase with the viewer.
    for (name, x, w) in [("ghost_near", 0.0, 0.25 * PI), ("ghost_far", 4.0, PI)] {
        let group = scene.add_group(root, name, Matrix4::identity())?;
        add_box(&mut scene, group, format!("{name}_mesh"), Vector3::new(x, 0.0, -6.0))?;
        w4d.tag_tree(&scene, group, None);
        w4d.set_local_w(group, w);
    }

    // Tower: a tagged parent with a tagged child offset further in w.
    let tower = scene.add_group(
        root,
        "tower",
        Matrix4::new_translation(&Vector3::new(0.0, 0.0, -12.0)),
    )?;
    add_box(&mut scene, tower, "tower_base", Vector3::zeros())?;
    let top = add_box(&mut scene, tower, "tower_top", Vector3::new(0.0, BOX_SIZE, 0.0))?;
    w4d.tag_tree(&scene, tower, None);
    w4d.set_local_w(tower, 0.5 * PI);
    w4d.set_local_w(top, 0.5 * PI);

    let camera = scene.add_group(root, "camera", Matrix4::identity())?;

    log::debug!("demo level: {} entities, {} tagged", scene.len(), w4d.len());

    Ok(Level {
        scene,
        w4d,
        camera,
        spawn: Point3::new(0.0, 1.0, 0.0),
    })
}

/// Box resting on the floor, its base centered at `base`.
fn add_box(
    scene: &mut SceneTree,
    parent: EntityId,
    name: impl Into<String>,
    base: Vector3<f32>,
) -> Result<EntityId, SceneError> {
    let center = base + Vector3::y() * (0.5 * BOX_SIZE);
    scene.add_mesh(
        parent,
        name,
        Matrix4::new_translation(&center),
        MeshGeometry::cuboid(BOX_SIZE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use freeroam_sim::{Octree, SceneGraph, collision::scene_triangles};

    #[test]
    fn level_builds_and_indexes() {
        let level = build().unwrap();
        let triangles = scene_triangles(&level.scene, level.scene.root(), &level.w4d).unwrap();
        // Floor plus five boxes.
        assert_eq!(
            triangles.len(),
            (FLOOR_SEGMENTS * FLOOR_SEGMENTS * 2) as usize + 5 * 12
        );
        let tagged = triangles.iter().filter(|t| t.source.is_some()).count();
        assert_eq!(tagged, 4 * 12);

        let octree = Octree::from_scene(&level.scene, level.scene.root(), &level.w4d).unwrap();
        assert_eq!(octree.len(), triangles.len());
    }

    #[test]
    fn tower_top_accumulates_w() {
        let level = build().unwrap();
        let tower = level.scene.children(level.scene.root())[4];
        let top = level.scene.children(tower)[1];
        assert_eq!(level.scene.name(top), Some("tower_top"));
        assert!((level.w4d.global_w(top) - PI).abs() < 1.0e-5);
    }
}
