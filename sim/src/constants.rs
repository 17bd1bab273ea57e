//! Default tuning values for the first-person controller.
//!
//! Units: 1 distance unit = 1 meter, time in seconds.
//! These seed [`crate::settings::ControllerSettings::default`]; runtime code
//! reads the settings struct, not these constants directly.

use std::f32::consts::FRAC_PI_2;

/// Level grid pitch; jump height is expressed in grid cells.
pub const GRID_SIZE: f32 = 2.0;

/// Standing height (meters), gender-averaged.
pub const PLAYER_HEIGHT: f32 = 1.675;

/// Eye height above the feet (meters).
pub const PLAYER_EYE_LEVEL: f32 = 1.567;

/// Capsule radius (meters).
pub const PLAYER_RADIUS: f32 = 0.25;

/// Downward acceleration. Realistic 9.8 feels floaty with the tall jump below.
pub const PLAYER_GRAVITY: f32 = 4.0 * 9.8;

/// Jump apex height (meters).
pub const PLAYER_JUMP_HEIGHT: f32 = GRID_SIZE * 1.2;

/// Sprint cap (m/s). Humans: 8 sprint, 3 jog, 1.8 walk.
pub const PLAYER_TOP_SPEED_RUN: f32 = 8.0;

/// Walking cap as a fraction of the sprint cap.
pub const PLAYER_TOP_SPEED_WALK_MULTIPLIER: f32 = 0.4;

/// Terminal speed including falling (m/s). Bounds the physics sub-step.
pub const PLAYER_TOP_SPEED_TOTAL: f32 = 64.0;

/// Strafe/backpedal intent weight relative to forward (1.0).
pub const PLAYER_STRAFE_MULTIPLIER: f32 = 0.65;

/// Seconds to coast from sprint to rest with no input.
pub const PLAYER_DECEL_TIME: f32 = 0.25;

/// Seconds to reach sprint from rest.
pub const PLAYER_ACCEL_TIME: f32 = 0.75;

/// Rate at which the rotate-in/out keys move the camera along w (rad/s).
pub const PLAYER_W_ROTATION_RATE: f32 = FRAC_PI_2;

/// Normalized w distance past which geometry fades fast and stops colliding.
pub const SUBSTANCE_THRESHOLD: f32 = 0.25;

/// Minimum `normal.y` of a resolved contact for the player to count as grounded.
pub const GROUND_NORMAL_MIN_Y: f32 = 0.7;

/// Height of the last-resort floor the feet may never sink below.
pub const FLOOR_HEIGHT: f32 = 0.0;

/// Floor-clamp dips shallower than this are rounding, not a fall-through.
pub const FLOOR_CLAMP_SLOP: f32 = 1.0e-3;

/// Sub-steps per radius-of-travel at terminal speed.
pub const SUBSTEP_SAFETY_FACTOR: f32 = 3.0;

/// Longest frame the clock will simulate; longer stalls are dropped.
pub const MAX_FRAME_TIME_S: f32 = 0.10;

/// Opacity ceiling so a 4D entity is never treated as fully opaque.
pub const ALPHA_CAP: f32 = 0.99;

/// Opacity lost per unit of normalized w distance.
pub const FADE_NEAR_SLOPE: f32 = 0.5;

/// Extra opacity lost per unit of distance once past the substance threshold.
pub const FADE_PAST_THRESHOLD_SLOPE: f32 = 1.5;
