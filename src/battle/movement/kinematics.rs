//! Heading and straight-line stepping math
//!
//! Headings are radians with 0 along +x, normalised to `(-PI, PI]`.

use std::f64::consts::{PI, TAU};

use glam::DVec2;

pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle.rem_euclid(TAU);
    if a > PI {
        a -= TAU;
    }
    a
}

/// Signed shortest turn from `from` to `to`
pub fn angle_between(from: f64, to: f64) -> f64 {
    normalize_angle(to - from)
}

/// Heading that faces `to` from `from`; `None` when they coincide
pub fn bearing(from: DVec2, to: DVec2) -> Option<f64> {
    let d = to - from;
    if d.length_squared() < 1e-18 {
        return None;
    }
    Some(d.y.atan2(d.x))
}

/// Turn by at most `step` towards `target`
///
/// Returns the new heading and whether it is now aligned within `tolerance`.
pub fn rotate_towards(heading: f64, target: f64, step: f64, tolerance: f64) -> (f64, bool) {
    let diff = angle_between(heading, target);
    if diff.abs() <= step + tolerance {
        return (normalize_angle(target), true);
    }
    (normalize_angle(heading + step.copysign(diff)), false)
}

/// Move from `from` towards `to` by at most `distance`
///
/// Returns the new position and the distance budget left over once `to`
/// is reached (zero while still short of it).
pub fn step_towards(from: DVec2, to: DVec2, distance: f64, epsilon: f64) -> (DVec2, f64) {
    let remaining = from.distance(to);
    if distance + epsilon >= remaining {
        return (to, (distance - remaining).max(0.0));
    }
    let direction = (to - from) / remaining;
    (from + direction * distance, 0.0)
}
