//! Brick Siege - a brick-breaking arcade simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, collisions, spawning, bosses)
//! - `tuning`: Data-driven game balance
//! - `highscores`: Run summary ranking handed to the leaderboard flow
//!
//! Rendering, audio, menus and persistence live outside this crate. They read
//! `sim::Snapshot` and drain `sim::GameEvent`s each frame.

pub mod highscores;
pub mod sim;
pub mod tuning;

pub use highscores::HighScores;
pub use tuning::{DifficultyMode, Tuning, TuningError};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Nominal frame duration. Velocities are expressed in pixels per frame.
    pub const FRAME_DT: f32 = 1.0 / 60.0;
    /// Largest dt a single tick accepts (tab switches, debugger stalls)
    pub const MAX_TICK_DT: f32 = 0.1;

    /// Playfield dimensions
    pub const CANVAS_WIDTH: f32 = 800.0;
    pub const CANVAS_HEIGHT: f32 = 600.0;

    /// Paddle sits this far above the bottom edge
    pub const PADDLE_BOTTOM_MARGIN: f32 = 40.0;
    /// Paddle horizontal speed toward the input target (px per frame)
    pub const PADDLE_MAX_SPEED: f32 = 14.0;

    /// Brick grid geometry
    pub const BRICK_WIDTH: f32 = 70.0;
    pub const BRICK_HEIGHT: f32 = 24.0;
    pub const BRICK_GAP: f32 = 4.0;
    pub const BRICK_TOP_OFFSET: f32 = 70.0;

    /// Separation pushed between a ball and whatever it bounced off
    pub const SEPARATION_EPSILON: f32 = 1.0;
}

/// Rotate a vector by `angle` radians (positive = clockwise on screen, y down)
#[inline]
pub fn rotate_vec(v: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Angle of a velocity measured from straight up, in radians.
/// Zero is straight up, positive leans right.
#[inline]
pub fn angle_from_vertical(v: Vec2) -> f32 {
    v.x.atan2(-v.y)
}

/// Velocity of the given magnitude leaving at `angle` from straight up
#[inline]
pub fn velocity_from_vertical(angle: f32, speed: f32) -> Vec2 {
    Vec2::new(angle.sin() * speed, -angle.cos() * speed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_rotate_quarter_turn() {
        let v = rotate_vec(Vec2::new(1.0, 0.0), FRAC_PI_2);
        assert!(v.x.abs() < 1e-6);
        assert!((v.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_vertical_angle_round_trip() {
        let v = velocity_from_vertical(0.3, 5.0);
        assert!((angle_from_vertical(v) - 0.3).abs() < 1e-5);
        assert!((v.length() - 5.0).abs() < 1e-5);
        assert!(v.y < 0.0, "zero-ish angles point up the screen");
    }
}
