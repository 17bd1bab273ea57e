//! Runtime tuning for the first-person controller.
//!
//! Every field has a default from [`crate::constants`], so a settings file only
//! needs to name the values it overrides.

use serde::{Deserialize, Serialize};

use crate::{constants::*, error::SettingsError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Capsule height, foot to crown (meters).
    pub height: f32,
    /// Camera height above the foot (meters).
    pub eye_level: f32,
    /// Capsule radius (meters).
    pub radius: f32,
    /// Downward acceleration (m/s²).
    pub gravity: f32,
    /// Jump apex height (meters).
    pub jump_height: f32,
    /// Horizontal speed cap while running (m/s).
    pub top_speed_run: f32,
    /// Walking cap as a fraction of `top_speed_run`.
    pub walk_multiplier: f32,
    /// Cap on total speed, falling included (m/s).
    pub top_speed_total: f32,
    /// Intent weight for strafing and backpedaling.
    pub strafe_multiplier: f32,
    /// Seconds to stop from `top_speed_run` with no input.
    pub decel_time: f32,
    /// Seconds to reach `top_speed_run` from rest.
    pub accel_time: f32,
    /// Camera w change per second while rotating in/out (radians).
    pub w_rotation_rate: f32,
    /// Normalized w distance under which tagged geometry collides.
    pub substance_threshold: f32,
    /// Minimum contact `normal.y` that counts as standing on ground.
    pub ground_normal_min_y: f32,
    /// Last-resort floor height; `None` disables the clamp.
    pub floor_clamp: Option<f32>,
    /// Sub-steps per radius of travel at terminal speed.
    pub substep_safety_factor: f32,
    /// Frames longer than this are truncated (seconds).
    pub max_frame_time: f32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            height: PLAYER_HEIGHT,
            eye_level: PLAYER_EYE_LEVEL,
            radius: PLAYER_RADIUS,
            gravity: PLAYER_GRAVITY,
            jump_height: PLAYER_JUMP_HEIGHT,
            top_speed_run: PLAYER_TOP_SPEED_RUN,
            walk_multiplier: PLAYER_TOP_SPEED_WALK_MULTIPLIER,
            top_speed_total: PLAYER_TOP_SPEED_TOTAL,
            strafe_multiplier: PLAYER_STRAFE_MULTIPLIER,
            decel_time: PLAYER_DECEL_TIME,
            accel_time: PLAYER_ACCEL_TIME,
            w_rotation_rate: PLAYER_W_ROTATION_RATE,
            substance_threshold: SUBSTANCE_THRESHOLD,
            ground_normal_min_y: GROUND_NORMAL_MIN_Y,
            floor_clamp: Some(FLOOR_HEIGHT),
            substep_safety_factor: SUBSTEP_SAFETY_FACTOR,
            max_frame_time: MAX_FRAME_TIME_S,
        }
    }
}

impl ControllerSettings {
    /// Launch speed that reaches `jump_height` under `gravity`.
    #[inline]
    pub fn jump_velocity(&self) -> f32 {
        (2.0 * self.gravity * self.jump_height).sqrt()
    }

    /// Speed lost per second while coasting.
    #[inline]
    pub fn decel_rate(&self) -> f32 {
        self.top_speed_run / self.decel_time
    }

    /// Speed gained per second under full intent. Includes `decel_rate`, which
    /// the same step applies against any velocity off the intent axes.
    #[inline]
    pub fn accel_rate(&self) -> f32 {
        self.top_speed_run / self.accel_time + self.decel_rate()
    }

    /// Longest sub-step that still can't tunnel through a surface at terminal speed.
    #[inline]
    pub fn max_substep(&self) -> f32 {
        self.radius / self.top_speed_total / self.substep_safety_factor
    }

    /// Horizontal speed cap for the current gait.
    #[inline]
    pub fn horizontal_cap(&self, running: bool) -> f32 {
        if running {
            self.top_speed_run
        } else {
            self.top_speed_run * self.walk_multiplier
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        for (field, value) in [
            ("height", self.height),
            ("eye_level", self.eye_level),
            ("radius", self.radius),
            ("gravity", self.gravity),
            ("top_speed_run", self.top_speed_run),
            ("walk_multiplier", self.walk_multiplier),
            ("top_speed_total", self.top_speed_total),
            ("strafe_multiplier", self.strafe_multiplier),
            ("decel_time", self.decel_time),
            ("accel_time", self.accel_time),
            ("substep_safety_factor", self.substep_safety_factor),
            ("max_frame_time", self.max_frame_time),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SettingsError::NotPositive { field, value });
            }
        }

        if 2.0 * self.radius > self.height {
            return Err(SettingsError::CapsuleTooShort {
                radius: self.radius,
                height: self.height,
            });
        }

        for (field, value, min, max) in [
            ("jump_height", self.jump_height, 0.0, f32::MAX),
            ("w_rotation_rate", self.w_rotation_rate, 0.0, f32::MAX),
            ("substance_threshold", self.substance_threshold, 0.0, 1.0),
            ("ground_normal_min_y", self.ground_normal_min_y, -1.0, 1.0),
        ] {
            if !(min..=max).contains(&value) {
                return Err(SettingsError::OutOfRange {
                    field,
                    value,
                    min,
                    max,
                });
            }
        }

        Ok(())
    }
}
