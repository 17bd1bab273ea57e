//! Frame clock: turns wall-clock frame time into fixed physics sub-steps.

use std::time::Duration;

use crate::{camera::CameraRig, collision::StaticCollider, physics::Simulation};

/// Ratios within this of a whole number are treated as whole, so a frame that
/// is an exact multiple of the sub-step doesn't grow a near-zero tail step.
const STEP_COUNT_TOLERANCE: f32 = 1.0e-6;

/// Sub-step durations covering `delta` seconds: `ceil(delta / max_step)` steps,
/// all `max_step` long except a shorter last one.
///
/// Non-positive or non-finite inputs yield no steps.
pub fn substeps(delta: f32, max_step: f32) -> Substeps {
    if !(delta.is_finite() && max_step.is_finite()) || delta <= 0.0 || max_step <= 0.0 {
        return Substeps {
            remaining: 0,
            step: 0.0,
            last: 0.0,
        };
    }
    let count = ((delta / max_step - STEP_COUNT_TOLERANCE).ceil() as usize).max(1);
    Substeps {
        remaining: count,
        step: max_step,
        last: delta - (count - 1) as f32 * max_step,
    }
}

#[derive(Clone, Debug)]
pub struct Substeps {
    remaining: usize,
    step: f32,
    last: f32,
}

impl Iterator for Substeps {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        match self.remaining {
            0 => None,
            1 => {
                self.remaining = 0;
                Some(self.last)
            }
            _ => {
                self.remaining -= 1;
                Some(self.step)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Substeps {}

impl<C: CameraRig, S: StaticCollider> Simulation<C, S> {
    /// Run one rendered frame worth of physics. `elapsed` is clamped to
    /// `max_frame_time` so a stall doesn't trigger a catch-up burst.
    /// Returns the number of sub-steps taken.
    pub fn update(&mut self, elapsed: Duration) -> usize {
        let delta = elapsed.as_secs_f32().min(self.settings().max_frame_time);
        let steps = substeps(delta, self.settings().max_substep());
        let count = steps.len();
        for dt in steps {
            self.advance(dt);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        camera::FpsCamera, collision::Octree, scene::EntityId, settings::ControllerSettings,
    };
    use nalgebra::Point3;

    #[test]
    fn splits_into_full_steps_and_a_short_tail() {
        let steps: Vec<f32> = substeps(0.01, 0.004).collect();
        assert_eq!(steps.len(), 3);
        assert!((steps[0] - 0.004).abs() < 1.0e-7);
        assert!((steps[1] - 0.004).abs() < 1.0e-7);
        assert!((steps[2] - 0.002).abs() < 1.0e-6);
        assert!((steps.iter().sum::<f32>() - 0.01).abs() < 1.0e-6);
    }

    #[test]
    fn exact_multiple_has_no_tail() {
        let steps: Vec<f32> = substeps(0.008, 0.004).collect();
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|s| (s - 0.004).abs() < 1.0e-6));
    }

    #[test]
    fn short_and_degenerate_frames() {
        assert_eq!(substeps(0.001, 0.004).len(), 1);
        assert_eq!(substeps(0.0, 0.004).len(), 0);
        assert_eq!(substeps(-1.0, 0.004).len(), 0);
        assert_eq!(substeps(f32::NAN, 0.004).len(), 0);
        assert_eq!(substeps(0.01, 0.0).len(), 0);
    }

    #[test]
    fn update_clamps_long_frames() {
        let settings = ControllerSettings::default();
        let max_steps = substeps(settings.max_frame_time, settings.max_substep()).len();
        let mut sim = Simulation::new(
            settings,
            FpsCamera::default(),
            EntityId(1),
            Octree::default(),
            Point3::new(0.0, 10.0, 0.0),
        )
        .unwrap();

        assert_eq!(sim.update(Duration::from_secs(5)), max_steps);
        // 0.1 s at the default sub-step is 77 steps.
        assert_eq!(max_steps, 77);
        assert_eq!(sim.update(Duration::ZERO), 0);
    }
}
