//! First-person orientation controls.
//!
//! The camera looks down -Z at zero yaw/pitch. Orientation is YXZ Euler: yaw
//! about world +Y, then pitch about the local X axis; there is no roll.

use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::angle::PI;

/// Radians of rotation per pointer unit at `pointer_speed == 1`.
pub const POINTER_RADIANS_PER_UNIT: f32 = 0.002;

/// What the physics step needs from whatever renders the player's view.
pub trait CameraRig {
    /// Horizontal unit forward vector (view direction with pitch removed).
    fn azimuthal_direction(&self) -> Vector3<f32>;
    /// Move the eye to `position` (world space).
    fn set_position(&mut self, position: Point3<f32>);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    /// Orientation changed.
    Change,
    Lock,
    Unlock,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

type Listener = Box<dyn FnMut(ControlEvent)>;

pub struct FpsCamera {
    pub position: Point3<f32>,
    yaw: f32,
    pitch: f32,
    pub pointer_speed: f32,
    /// Lowest allowed angle from straight up (radians).
    pub min_polar_angle: f32,
    /// Highest allowed angle from straight up (radians).
    pub max_polar_angle: f32,
    locked: bool,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u32,
}

impl std::fmt::Debug for FpsCamera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FpsCamera")
            .field("position", &self.position)
            .field("yaw", &self.yaw)
            .field("pitch", &self.pitch)
            .field("locked", &self.locked)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for FpsCamera {
    fn default() -> Self {
        Self::new(Point3::origin())
    }
}

impl FpsCamera {
    pub fn new(position: Point3<f32>) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            pointer_speed: 1.0,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            locked: false,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    #[inline]
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    #[inline]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Set yaw and pitch directly; pitch is clamped to the polar limits.
    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = self.clamp_pitch(pitch);
        self.emit(ControlEvent::Change);
    }

    fn clamp_pitch(&self, pitch: f32) -> f32 {
        let half_pi = 0.5 * PI;
        pitch.clamp(half_pi - self.max_polar_angle, half_pi - self.min_polar_angle)
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Record pointer capture state. Emits `Lock`/`Unlock` when it changes.
    pub fn set_locked(&mut self, locked: bool) {
        if self.locked == locked {
            return;
        }
        self.locked = locked;
        self.emit(if locked {
            ControlEvent::Lock
        } else {
            ControlEvent::Unlock
        });
    }

    /// Apply relative pointer motion. Ignored while unlocked; returns whether
    /// the orientation was updated.
    pub fn pointer_moved(&mut self, dx: f32, dy: f32) -> bool {
        if !self.locked {
            return false;
        }
        let scale = POINTER_RADIANS_PER_UNIT * self.pointer_speed;
        self.yaw -= dx * scale;
        self.pitch = self.clamp_pitch(self.pitch - dy * scale);
        self.emit(ControlEvent::Change);
        true
    }

    pub fn rotation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.yaw)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.pitch)
    }

    /// Unit view direction.
    pub fn direction(&self) -> Vector3<f32> {
        self.rotation() * -Vector3::z()
    }

    /// Register a listener for control events.
    pub fn on(&mut self, listener: impl FnMut(ControlEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: ControlEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

impl CameraRig for FpsCamera {
    /// Forward with pitch removed. Depends on yaw alone, so it stays defined
    /// when looking straight up or down.
    fn azimuthal_direction(&self) -> Vector3<f32> {
        Vector3::new(-self.yaw.sin(), 0.0, -self.yaw.cos())
    }

    #[inline]
    fn set_position(&mut self, position: Point3<f32>) {
        self.position = position;
    }
}
