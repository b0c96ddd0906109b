//! Ease curves and small math helpers shared by both interpreters.

use std::f32::consts::PI;

/// Interpolation ease mode used by timed position/direction moves.
///
/// Both the sprite VM and the enemy VM index into the same five curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum EaseMode {
    #[default]
    Linear = 0,
    Decel = 1,
    DecelFast = 2,
    Accel = 3,
    AccelFast = 4,
}

impl EaseMode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => EaseMode::Linear,
            1 => EaseMode::Decel,
            2 => EaseMode::DecelFast,
            3 => EaseMode::Accel,
            4 => EaseMode::AccelFast,
            _ => EaseMode::Linear,
        }
    }

    /// Evaluate the curve at normalized time `t`.
    ///
    /// `t` is clamped to [0, 1] first; every curve maps 0 → 0 and 1 → 1.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            EaseMode::Linear => t,
            EaseMode::Decel => 1.0 - (1.0 - t) * (1.0 - t),
            EaseMode::DecelFast => {
                let r = 1.0 - t;
                1.0 - r * r * r * r
            }
            EaseMode::Accel => t * t,
            EaseMode::AccelFast => t * t * t * t,
        }
    }
}

/// Add `delta` to `angle` and wrap the result into [-PI, PI).
pub fn add_normalize_angle(angle: f32, delta: f32) -> f32 {
    let mut a = angle + delta;
    while a >= PI {
        a -= 2.0 * PI;
    }
    while a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Round `x` up to the next power of two. Zero rounds to one.
pub fn next_pow2(x: u32) -> u32 {
    x.max(1).next_power_of_two()
}
