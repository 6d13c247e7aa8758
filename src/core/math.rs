// Math utilities and helper functions

use glam::Vec2;

/// Linear interpolation
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Inverse of [`lerp`]: where `value` sits between `a` and `b`, clamped to 0..=1
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a == b {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

/// Move `current` towards `target` by at most `max_delta`
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// Move a vector towards `target` by at most `max_distance`
pub fn move_towards_vec(current: Vec2, target: Vec2, max_distance: f32) -> Vec2 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_distance || distance == 0.0 {
        target
    } else {
        current + delta / distance * max_distance
    }
}

/// Unsigned angle between two vectors in degrees
pub fn angle_between_deg(a: Vec2, b: Vec2) -> f32 {
    let denominator = (a.length_squared() * b.length_squared()).sqrt();
    if denominator < 1e-15 {
        return 0.0;
    }
    (a.dot(b) / denominator).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Critically damped spring towards `target`.
///
/// `velocity` carries the spring state between calls. Never overshoots.
pub fn smooth_damp(
    current: Vec2,
    target: Vec2,
    velocity: &mut Vec2,
    smooth_time: f32,
    dt: f32,
) -> Vec2 {
    if dt <= 0.0 {
        return current;
    }
    let smooth_time = smooth_time.max(0.0001);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let exp = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * exp;
    let mut output = target + (change + temp) * exp;

    // Clamp to target if we passed it
    if (target - current).dot(output - target) > 0.0 {
        output = target;
        *velocity = Vec2::ZERO;
    }

    output
}

/// Check if two f32 values are approximately equal
pub fn approx_equal(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() < epsilon
}
