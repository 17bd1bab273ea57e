//! Angle helpers for the circular `w` axis.
//!
//! Every stored angle lives in `[0, TAU)`. Reduction is a single floor-based
//! operation so huge inputs cost the same as small ones.

pub use std::f32::consts::{PI, TAU};

/// 1/π, used to normalize angular distances into `[0, 1]`.
pub const INV_PI: f32 = 1.0 / PI;

/// Returns true if `a` and `b` differ by at most `max_delta`.
#[inline]
pub fn roughly_equal(a: f32, b: f32, max_delta: f32) -> bool {
    (a - b).abs() <= max_delta
}

/// Reduce any finite angle into `[0, TAU)`.
///
/// Non-finite input stays non-finite.
#[inline]
pub fn canonicalize(angle: f32) -> f32 {
    let reduced = angle - TAU * (angle / TAU).floor();
    // `floor` can leave exactly TAU behind when `angle` is a hair below a multiple of TAU.
    if reduced >= TAU { 0.0 } else { reduced }
}

/// Shortest distance between two angles around the circle, in `[0, PI]`.
#[inline]
pub fn angular_distance(a: f32, b: f32) -> f32 {
    let delta = (canonicalize(a) - canonicalize(b)).abs();
    delta.min(TAU - delta)
}

/// [`angular_distance`] scaled into `[0, 1]` (1 = opposite side of the circle).
#[inline]
pub fn angular_distance01(a: f32, b: f32) -> f32 {
    angular_distance(a, b) * INV_PI
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1.0e-4;

    #[test]
    fn canonicalize_matches_known_values() {
        assert!(roughly_equal(canonicalize(0.0), 0.0, EPS));
        assert!(roughly_equal(canonicalize(1.0), 1.0, EPS));
        assert!(roughly_equal(canonicalize(6.0 + TAU), 6.0, EPS));
        assert!(roughly_equal(canonicalize(6.0 - TAU), 6.0, EPS));
        assert!(roughly_equal(canonicalize(6.0 + 5.0 * TAU), 6.0, EPS));
        assert!(roughly_equal(canonicalize(6.0 - 5.0 * TAU), 6.0, EPS));
    }

    #[test]
    fn canonicalize_multiples_of_tau_are_zero_or_wrap() {
        // A multiple of TAU lands on 0 (or a float hair below TAU, which is the same point).
        for k in [-5.0_f32, -1.0, 1.0, 5.0] {
            let c = canonicalize(k * TAU);
            assert!(c < EPS || TAU - c < EPS, "k={k} gave {c}");
        }
    }

    #[test]
    fn canonicalize_is_always_in_range() {
        let mut x = -1.0e4_f32;
        while x < 1.0e4 {
            let c = canonicalize(x);
            assert!((0.0..TAU).contains(&c), "{x} -> {c}");
            x += 37.123;
        }
    }

    #[test]
    fn non_finite_input_is_not_special_cased() {
        assert!(!canonicalize(f32::NAN).is_finite());
        assert!(!canonicalize(f32::INFINITY).is_finite());
    }

    #[test]
    fn angular_distance_is_symmetric_and_bounded() {
        let samples = [-7.0_f32, -1.0, 0.0, 0.5, 3.0, PI, 4.0, 6.2, 13.0];
        for &a in &samples {
            assert!(roughly_equal(angular_distance(a, a), 0.0, EPS));
            for &b in &samples {
                let ab = angular_distance(a, b);
                let ba = angular_distance(b, a);
                assert!(roughly_equal(ab, ba, EPS));
                assert!((0.0..=PI + EPS).contains(&ab));
            }
        }
    }

    #[test]
    fn angular_distance_wraps_around_zero() {
        assert!(roughly_equal(angular_distance(0.1, TAU - 0.1), 0.2, EPS));
        assert!(roughly_equal(angular_distance(0.0, PI), PI, EPS));
        assert!(roughly_equal(angular_distance01(0.0, PI), 1.0, EPS));
    }
}
