use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::{
    camera::CameraRig,
    collision::{StaticCollider, Triangle},
    constants::FLOOR_CLAMP_SLOP,
    error::SettingsError,
    four_d::W4dTable,
    player::{InputState, PlayerState},
    scene::EntityId,
    settings::ControllerSettings,
};

/// Player, view, static collider and 4D table driven by one fixed-step loop.
///
/// Owns everything the step mutates. The collider is never modified after
/// construction; swap it by building a new simulation.
pub struct Simulation<C, S> {
    settings: ControllerSettings,
    player: PlayerState,
    camera: C,
    camera_entity: EntityId,
    collider: S,
    w4d: W4dTable,
    floor_clamps: u64,
    /// The floor clamp fired on the previous sub-step.
    clamped: bool,
}

impl<C: CameraRig, S: StaticCollider> Simulation<C, S> {
    /// `camera_entity` is the scene entity whose global w is the viewer's w;
    /// it is tagged in the 4D table if it isn't already.
    pub fn new(
        settings: ControllerSettings,
        camera: C,
        camera_entity: EntityId,
        collider: S,
        spawn_foot: Point3<f32>,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        let player = PlayerState::new(spawn_foot, &settings);
        let mut sim = Self {
            settings,
            player,
            camera,
            camera_entity,
            collider,
            w4d: W4dTable::new(),
            floor_clamps: 0,
            clamped: false,
        };
        sim.w4d.tag(camera_entity, None);
        sim.camera.set_position(sim.player.eye_position());
        Ok(sim)
    }

    /// Replace the 4D table, keeping the camera entity tagged.
    pub fn with_w4d(mut self, w4d: W4dTable) -> Self {
        self.w4d = w4d;
        if !self.w4d.is_tagged(self.camera_entity) {
            self.w4d.tag(self.camera_entity, None);
        }
        self
    }

    #[inline]
    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    #[inline]
    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    /// Direct access for teleports and scripted velocity changes.
    #[inline]
    pub fn player_mut(&mut self) -> &mut PlayerState {
        &mut self.player
    }

    #[inline]
    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.player.input
    }

    #[inline]
    pub fn camera(&self) -> &C {
        &self.camera
    }

    #[inline]
    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    #[inline]
    pub fn camera_entity(&self) -> EntityId {
        self.camera_entity
    }

    #[inline]
    pub fn collider(&self) -> &S {
        &self.collider
    }

    #[inline]
    pub fn w4d(&self) -> &W4dTable {
        &self.w4d
    }

    #[inline]
    pub fn w4d_mut(&mut self) -> &mut W4dTable {
        &mut self.w4d
    }

    /// The viewer's global w.
    #[inline]
    pub fn camera_w(&self) -> f32 {
        self.w4d.global_w(self.camera_entity)
    }

    /// Sub-steps on which the floor clamp caught the player.
    #[inline]
    pub fn floor_clamp_count(&self) -> u64 {
        self.floor_clamps
    }

    /// Launch upward if standing on something. Returns whether the jump happened.
    ///
    /// `grounded` is left set; the next step without contact clears it.
    pub fn jump(&mut self) -> bool {
        if !self.player.grounded() {
            return false;
        }
        self.player.velocity.y = self.settings.jump_velocity();
        true
    }

    /// Advance one fixed sub-step of `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        if dt <= 0.0 || !dt.is_finite() {
            return;
        }
        // 1) Rotate the viewer through w.
        self.rotate_w(dt);
        // 2) Integrate velocity from input and gravity, then move.
        self.integrate_motion(dt);
        // 3) Push out of static geometry and derive contact flags.
        self.resolve_collisions();
        // 4) Last-resort floor.
        self.clamp_to_floor();

        self.camera.set_position(self.player.eye_position());
    }

    fn rotate_w(&mut self, dt: f32) {
        let input = self.player.input;
        let direction = f32::from(u8::from(input.rotate_out)) - f32::from(u8::from(input.rotate_in));
        if direction != 0.0 {
            self.w4d.add_local_w(
                self.camera_entity,
                direction * self.settings.w_rotation_rate * dt,
            );
        }
    }

    fn integrate_motion(&mut self, dt: f32) {
        let s = &self.settings;
        let input = self.player.input;
        let to_world = camera_yaw_rotation(&self.camera.azimuthal_direction());
        let top_speed = s.horizontal_cap(input.running);

        // Horizontal until gravity is applied.
        let mut velocity = self.player.velocity;
        let vy_before = velocity.y;
        velocity.y = 0.0;

        let intent = input_vector(&input, s.strafe_multiplier);

        // Decelerate against velocity in the camera frame, except along axes the
        // player is pushing toward, then flip it back into the world frame.
        let mut decel = (to_world.inverse() * velocity).cap_magnitude(1.0);
        decel.x = axis_decel(decel.x, intent.x);
        decel.z = axis_decel(decel.z, intent.z);
        let decel = to_world * -decel;

        // Clamped so diagonal input is no faster than straight input.
        let accel = (to_world * intent).cap_magnitude(1.0);

        velocity += decel * (dt * s.decel_rate()) + accel * (dt * s.accel_rate());
        velocity = velocity.cap_magnitude(top_speed);
        velocity.y = vy_before - dt * s.gravity;
        velocity = velocity.cap_magnitude(s.top_speed_total);

        self.player.velocity = velocity;
        self.player.set_working_vectors(intent, decel, accel);
        self.player.add_scaled_vector(&velocity, dt);
    }

    pub(crate) fn resolve_collisions(&mut self) {
        let camera_w = self.camera_w();
        let threshold = self.settings.substance_threshold;
        let w4d = &self.w4d;
        let substantial = |t: &Triangle| w4d.is_substantial(t.source, camera_w, threshold);

        let hit = self
            .collider
            .capsule_intersect(self.player.capsule(), Some(&substantial))
            .filter(|p| p.depth > 0.0);

        match hit {
            Some(p) => {
                let n = p.normal;
                // Inelastic: drop the velocity component along the contact normal.
                let v = self.player.velocity;
                self.player.velocity = v - n * n.dot(&v);
                self.player.add_scaled_vector(&n, p.depth);
                // Ground on the most upward contact, not the net push, so
                // leaning on a wall doesn't lift the player off the floor.
                self.player
                    .set_contact(true, p.max_normal_y > self.settings.ground_normal_min_y);
            }
            None => self.player.set_contact(false, false),
        }
    }

    fn clamp_to_floor(&mut self) {
        let Some(floor) = self.settings.floor_clamp else {
            return;
        };
        let foot = self.player.foot();
        let dip = floor - foot.y;
        if dip <= 0.0 {
            self.clamped = false;
            return;
        }
        // Rounding-level dips belong to whatever the player stands on, unless
        // the clamp itself is what's holding them up.
        if dip <= FLOOR_CLAMP_SLOP && !self.clamped {
            return;
        }

        if dip > FLOOR_CLAMP_SLOP {
            self.floor_clamps += 1;
            if !self.clamped {
                log::warn!(
                    "player fell through the level at ({:.2}, {:.2}, {:.2}); clamping to floor {floor}",
                    foot.x,
                    foot.y,
                    foot.z
                );
            }
        }
        self.clamped = true;
        self.player.velocity.y = 0.0;
        self.player.foot_set(foot.x, floor, foot.z);
        let colliding = self.player.colliding();
        self.player.set_contact(colliding, true);
    }
}

/// Camera-relative input direction: forward is -Z with weight 1, strafing and
/// backpedaling are weighted by `strafe`.
pub fn input_vector(input: &InputState, strafe: f32) -> Vector3<f32> {
    let flag = |b: bool| f32::from(u8::from(b));
    Vector3::new(
        flag(input.move_right) * strafe - flag(input.move_left) * strafe,
        0.0,
        flag(input.move_backward) * strafe - flag(input.move_forward),
    )
}

/// Rotation about +Y taking camera-frame vectors (forward = -Z) to world frame.
pub fn camera_yaw_rotation(azimuthal: &Vector3<f32>) -> UnitQuaternion<f32> {
    let yaw = (-azimuthal.x).atan2(-azimuthal.z);
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw)
}

/// Keep only the part of a velocity component the input is not already pushing.
#[inline]
fn axis_decel(component: f32, intent: f32) -> f32 {
    if component > 0.0 {
        (component - intent.max(0.0)).max(0.0)
    } else {
        (component - intent.min(0.0)).min(0.0)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        angle::{PI, angular_distance},
        camera::FpsCamera,
        collision::{Octree, TriangleBvh},
        scene::MeshGeometry,
    };

    const CAMERA: EntityId = EntityId(100);
    const FRAME: Duration = Duration::from_micros(16_667);

    fn plane_at(height: f32, source: Option<EntityId>) -> Vec<Triangle> {
        MeshGeometry::plane_xz(40.0, 40.0, 4, 4)
            .triangles()
            .unwrap()
            .into_iter()
            .map(|[a, b, c]| {
                let up = Vector3::y() * height;
                Triangle::new(a + up, b + up, c + up).with_source(source)
            })
            .collect()
    }

    /// Wall in the x = 0 plane facing +X.
    fn wall() -> Vec<Triangle> {
        vec![Triangle::new(
            Point3::new(0.0, -10.0, -20.0),
            Point3::new(0.0, 20.0, -20.0),
            Point3::new(0.0, -10.0, 20.0),
        )]
    }

    fn sim_with(
        settings: ControllerSettings,
        triangles: Vec<Triangle>,
        spawn: Point3<f32>,
    ) -> Simulation<FpsCamera, Octree> {
        Simulation::new(
            settings,
            FpsCamera::default(),
            CAMERA,
            Octree::from_triangles(triangles),
            spawn,
        )
        .unwrap()
    }

    fn run(sim: &mut Simulation<FpsCamera, impl StaticCollider>, frames: usize) {
        for _ in 0..frames {
            sim.update(FRAME);
        }
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = ControllerSettings {
            radius: 0.0,
            ..Default::default()
        };
        let sim = Simulation::new(
            settings,
            FpsCamera::default(),
            CAMERA,
            Octree::default(),
            Point3::origin(),
        );
        assert!(sim.is_err());
    }

    #[test]
    fn falls_onto_a_raised_floor_and_rests_grounded() {
        let mut sim = sim_with(
            ControllerSettings::default(),
            plane_at(2.0, None),
            Point3::new(0.3, 3.0, 0.4),
        );
        assert!(!sim.player().grounded());

        run(&mut sim, 90);

        let p = sim.player();
        assert!(p.grounded());
        assert!(p.colliding());
        assert!(p.velocity.y.abs() < 0.1, "v.y = {}", p.velocity.y);
        assert!((p.foot().y - 2.0).abs() < 0.01, "foot = {}", p.foot().y);
        assert_eq!(sim.floor_clamp_count(), 0);

        // The camera follows the eye.
        assert!((sim.camera().position - p.eye_position()).norm() < 1.0e-6);
    }

    #[test]
    fn bvh_collider_behaves_like_the_octree() {
        let mut sim = Simulation::new(
            ControllerSettings::default(),
            FpsCamera::default(),
            CAMERA,
            TriangleBvh::new(plane_at(2.0, None)),
            Point3::new(0.3, 3.0, 0.4),
        )
        .unwrap();
        run(&mut sim, 90);
        assert!(sim.player().grounded());
        assert!((sim.player().foot().y - 2.0).abs() < 0.01);
    }

    #[test]
    fn wall_cancels_only_the_into_wall_velocity() {
        let settings = ControllerSettings::default();
        let r = settings.radius;
        let mut sim = sim_with(settings, wall(), Point3::new(r - 0.05, 1.0, 0.0));
        sim.player_mut().velocity = Vector3::new(-3.0, 0.0, 2.0);

        sim.resolve_collisions();

        let p = sim.player();
        assert!(p.colliding());
        assert!(!p.grounded());
        assert!(p.velocity.x.abs() < 1.0e-5);
        assert!((p.velocity.z - 2.0).abs() < 1.0e-5);
        assert!((p.foot().x - r).abs() < 1.0e-4);
    }

    #[test]
    fn walking_into_a_wall_keeps_the_capsule_outside() {
        let mut sim = sim_with(ControllerSettings::default(), wall(), Point3::new(2.0, 0.0, 0.0));
        // Face -X and walk forward.
        sim.camera_mut().set_orientation(0.5 * PI, 0.0);
        sim.input_mut().move_forward = true;
        sim.input_mut().running = true;

        run(&mut sim, 120);

        let p = sim.player();
        assert!(p.foot().x >= sim.settings().radius - 1.0e-3);
        assert!(p.velocity.x.abs() < 0.1);
    }

    #[test]
    fn pushing_into_a_wall_stays_grounded() {
        let mut level = plane_at(0.0, None);
        level.extend(wall());
        let mut sim = sim_with(ControllerSettings::default(), level, Point3::new(1.0, 0.0, 0.3));
        sim.camera_mut().set_orientation(0.5 * PI, 0.0);
        sim.input_mut().move_forward = true;
        sim.input_mut().running = true;

        let mut airborne = 0;
        for _ in 0..120 {
            sim.update(FRAME);
            if !sim.player().grounded() {
                airborne += 1;
            }
        }

        let p = sim.player();
        assert_eq!(airborne, 0);
        assert!(p.colliding());
        assert!(p.foot().x >= sim.settings().radius - 1.0e-3);
        assert!(p.foot().y.abs() < 1.0e-3);
        assert_eq!(sim.floor_clamp_count(), 0);
        assert!(sim.jump());
    }

    #[test]
    fn standing_on_a_zero_height_floor_never_clamps() {
        let mut sim = sim_with(
            ControllerSettings::default(),
            plane_at(0.0, None),
            Point3::new(0.3, 0.5, 0.4),
        );
        run(&mut sim, 120);
        assert!(sim.player().grounded());
        assert_eq!(sim.floor_clamp_count(), 0);

        // A rounding-level dip is left to the collider.
        let foot = sim.player().foot();
        sim.player_mut().foot_set(foot.x, -1.0e-5, foot.z);
        sim.clamp_to_floor();
        assert_eq!(sim.player().foot().y, -1.0e-5);
        assert_eq!(sim.floor_clamp_count(), 0);
    }

    #[test]
    fn jump_requires_ground() {
        let mut sim = sim_with(
            ControllerSettings::default(),
            plane_at(0.0, None),
            Point3::new(0.3, 1.0, 0.4),
        );
        let vy = sim.player().velocity.y;
        assert!(!sim.jump());
        assert_eq!(sim.player().velocity.y, vy);

        run(&mut sim, 60);
        assert!(sim.player().grounded());
        assert!(sim.jump());
        assert_eq!(sim.player().velocity.y, sim.settings().jump_velocity());
        assert!(sim.player().grounded());

        // Airborne after the next step; a second jump does nothing.
        sim.update(FRAME);
        assert!(!sim.player().grounded());
        let vy = sim.player().velocity.y;
        assert!(!sim.jump());
        assert_eq!(sim.player().velocity.y, vy);
    }

    #[test]
    fn walking_and_running_are_capped() {
        let mut sim = sim_with(
            ControllerSettings::default(),
            plane_at(0.0, None),
            Point3::new(0.3, 0.0, 0.4),
        );
        sim.input_mut().move_forward = true;
        run(&mut sim, 120);
        let v = sim.player().velocity;
        assert!((v.xz().norm() - 3.2).abs() < 1.0e-3);
        assert!(v.z < 0.0 && v.x.abs() < 1.0e-4);

        sim.input_mut().running = true;
        run(&mut sim, 120);
        assert!((sim.player().velocity.xz().norm() - 8.0).abs() < 1.0e-3);

        // Diagonal input is no faster than straight input.
        sim.input_mut().move_left = true;
        run(&mut sim, 120);
        assert!(sim.player().velocity.xz().norm() <= 8.0 + 1.0e-3);
    }

    #[test]
    fn releasing_input_coasts_to_a_stop() {
        let mut sim = sim_with(
            ControllerSettings::default(),
            plane_at(0.0, None),
            Point3::new(0.3, 0.0, 0.4),
        );
        sim.input_mut().move_forward = true;
        sim.input_mut().running = true;
        run(&mut sim, 120);

        sim.input_mut().move_forward = false;
        run(&mut sim, 45);
        assert!(sim.player().velocity.xz().norm() < 1.0e-3);
    }

    #[test]
    fn movement_follows_camera_yaw() {
        let mut sim = sim_with(
            ControllerSettings::default(),
            plane_at(0.0, None),
            Point3::new(0.3, 0.0, 0.4),
        );
        sim.camera_mut().set_orientation(-0.5 * PI, 0.0);
        sim.input_mut().move_forward = true;
        run(&mut sim, 60);
        let v = sim.player().velocity;
        assert!(v.x > 3.0 && v.z.abs() < 1.0e-3);
    }

    #[test]
    fn floor_clamp_catches_a_fall_through() {
        let mut sim = sim_with(ControllerSettings::default(), Vec::new(), Point3::new(0.0, 1.0, 0.0));
        run(&mut sim, 60);
        let p = sim.player();
        assert!(p.grounded());
        assert_eq!(p.foot().y, 0.0);
        assert_eq!(p.velocity.y, 0.0);
        assert!(sim.floor_clamp_count() > 0);

        // Resting on the clamp is not another fall-through.
        let caught = sim.floor_clamp_count();
        run(&mut sim, 60);
        assert!(sim.player().grounded());
        assert_eq!(sim.player().foot().y, 0.0);
        assert_eq!(sim.floor_clamp_count(), caught);
    }

    #[test]
    fn disabled_floor_clamp_lets_the_player_fall() {
        let settings = ControllerSettings {
            floor_clamp: None,
            ..Default::default()
        };
        let mut sim = sim_with(settings, Vec::new(), Point3::new(0.0, 1.0, 0.0));
        run(&mut sim, 30);
        assert!(sim.player().foot().y < 0.0);
        assert!(!sim.player().grounded());
    }

    #[test]
    fn far_w_geometry_is_not_solid() {
        let floor_entity = EntityId(1);
        let settings = ControllerSettings {
            floor_clamp: None,
            ..Default::default()
        };
        let mut w4d = W4dTable::new();
        w4d.tag(floor_entity, None);
        w4d.set_local_w(floor_entity, PI);

        let mut sim = sim_with(
            settings.clone(),
            plane_at(0.0, Some(floor_entity)),
            Point3::new(0.3, 0.5, 0.4),
        )
        .with_w4d(w4d.clone());
        run(&mut sim, 60);
        assert!(sim.player().foot().y < -0.5);

        // Same level, viewer at the floor's w.
        let mut sim = sim_with(
            settings,
            plane_at(0.0, Some(floor_entity)),
            Point3::new(0.3, 0.5, 0.4),
        )
        .with_w4d(w4d);
        sim.w4d_mut().set_local_w(CAMERA, PI);
        run(&mut sim, 60);
        assert!(sim.player().grounded());
        assert!(sim.player().foot().y.abs() < 0.01);
    }

    #[test]
    fn rotate_keys_move_the_camera_through_w() {
        let mut sim = sim_with(
            ControllerSettings::default(),
            plane_at(0.0, None),
            Point3::new(0.3, 0.0, 0.4),
        );
        sim.input_mut().rotate_out = true;
        let steps = sim.update(Duration::from_millis(100));
        assert!(steps > 0);
        let expected = 0.1 * sim.settings().w_rotation_rate;
        assert!(angular_distance(sim.camera_w(), expected) < 1.0e-3);

        sim.input_mut().rotate_in = true;
        sim.update(Duration::from_millis(100));
        assert!(angular_distance(sim.camera_w(), expected) < 1.0e-3);

        sim.input_mut().rotate_out = false;
        sim.update(Duration::from_millis(100));
        assert!(angular_distance(sim.camera_w(), 0.0) < 1.0e-3);
    }

    #[test]
    fn frame_size_does_not_change_the_outcome() {
        let settings = ControllerSettings {
            floor_clamp: None,
            ..Default::default()
        };
        let spawn = Point3::new(0.3, 1.5, 0.4);
        let mut coarse = sim_with(settings.clone(), plane_at(0.0, None), spawn);
        let mut fine = sim_with(settings, plane_at(0.0, None), spawn);
        for sim in [&mut coarse, &mut fine] {
            sim.input_mut().move_forward = true;
            sim.input_mut().move_right = true;
        }

        for _ in 0..60 {
            coarse.update(Duration::from_millis(20));
        }
        for _ in 0..240 {
            fine.update(Duration::from_millis(5));
        }

        let a = coarse.player().foot();
        let b = fine.player().foot();
        assert!((a - b).norm() < 0.02, "coarse {a:?} vs fine {b:?}");
        assert!(coarse.player().grounded() && fine.player().grounded());
    }

    #[test]
    fn axis_decel_spares_the_pushed_direction() {
        assert_eq!(axis_decel(0.5, 1.0), 0.0);
        assert_eq!(axis_decel(0.5, 0.0), 0.5);
        assert_eq!(axis_decel(0.5, -1.0), 0.5);
        assert_eq!(axis_decel(-0.5, -1.0), 0.0);
        assert_eq!(axis_decel(-0.5, 0.25), -0.5);
    }

    #[test]
    fn input_vector_weights() {
        let input = InputState {
            move_forward: true,
            move_left: true,
            ..Default::default()
        };
        let v = input_vector(&input, 0.65);
        assert_eq!(v, Vector3::new(-0.65, 0.0, -1.0));
    }
}
