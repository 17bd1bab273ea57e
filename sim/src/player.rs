use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{collision::Capsule, settings::ControllerSettings};

/// Latched input flags, written by the input layer and read once per sub-step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputState {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub running: bool,
    pub rotate_in: bool,
    pub rotate_out: bool,
}

/// Kinematic state of the first-person controller.
///
/// The foot position (bottom tip of the capsule) is the only stored position.
/// Every mutator re-derives the capsule from it, so the two never disagree.
#[derive(Clone, Debug)]
pub struct PlayerState {
    foot: Point3<f32>,
    capsule: Capsule,
    height: f32,
    eye_level: f32,

    pub velocity: Vector3<f32>,
    pub input: InputState,

    // Per-step working vectors, kept for inspection.
    intent: Vector3<f32>,
    decel: Vector3<f32>,
    accel: Vector3<f32>,

    grounded: bool,
    colliding: bool,
}

impl PlayerState {
    pub fn new(foot: Point3<f32>, settings: &ControllerSettings) -> Self {
        let mut player = Self {
            foot,
            capsule: Capsule::new(foot, foot, settings.radius),
            height: settings.height,
            eye_level: settings.eye_level,
            velocity: Vector3::zeros(),
            input: InputState::default(),
            intent: Vector3::zeros(),
            decel: Vector3::zeros(),
            accel: Vector3::zeros(),
            grounded: false,
            colliding: false,
        };
        player.sync_capsule();
        player
    }

    fn sync_capsule(&mut self) {
        let r = self.capsule.radius;
        self.capsule.start = self.foot + Vector3::y() * r;
        self.capsule.end = self.foot + Vector3::y() * (self.height - r);
    }

    #[inline]
    pub fn foot(&self) -> Point3<f32> {
        self.foot
    }

    #[inline]
    pub fn capsule(&self) -> &Capsule {
        &self.capsule
    }

    #[inline]
    pub fn eye_position(&self) -> Point3<f32> {
        self.foot + Vector3::y() * self.eye_level
    }

    #[inline]
    pub fn eye_level(&self) -> f32 {
        self.eye_level
    }

    pub fn foot_set(&mut self, x: f32, y: f32, z: f32) {
        self.foot_copy(&Point3::new(x, y, z));
    }

    pub fn foot_copy(&mut self, foot: &Point3<f32>) {
        self.foot = *foot;
        self.sync_capsule();
    }

    /// Place the capsule's lower sphere center at `(x, y, z)`.
    pub fn start_set(&mut self, x: f32, y: f32, z: f32) {
        self.start_copy(&Point3::new(x, y, z));
    }

    pub fn start_copy(&mut self, start: &Point3<f32>) {
        self.foot_copy(&(start - Vector3::y() * self.capsule.radius));
    }

    pub fn translate(&mut self, offset: &Vector3<f32>) {
        self.foot += offset;
        self.sync_capsule();
    }

    pub fn add_scaled_vector(&mut self, v: &Vector3<f32>, scale: f32) {
        self.translate(&(v * scale));
    }

    #[inline]
    pub fn grounded(&self) -> bool {
        self.grounded
    }

    #[inline]
    pub fn colliding(&self) -> bool {
        self.colliding
    }

    /// Camera-relative input vector of the last step (forward is -Z).
    #[inline]
    pub fn intent(&self) -> Vector3<f32> {
        self.intent
    }

    #[inline]
    pub fn decel(&self) -> Vector3<f32> {
        self.decel
    }

    #[inline]
    pub fn accel(&self) -> Vector3<f32> {
        self.accel
    }

    pub(crate) fn set_contact(&mut self, colliding: bool, grounded: bool) {
        self.colliding = colliding;
        self.grounded = grounded;
    }

    pub(crate) fn set_working_vectors(
        &mut self,
        intent: Vector3<f32>,
        decel: Vector3<f32>,
        accel: Vector3<f32>,
    ) {
        self.intent = intent;
        self.decel = decel;
        self.accel = accel;
    }
}
