//! Collision detection and response for axis-aligned geometry
//!
//! The tricky part of a brick breaker: a fast circular ball against rows of
//! thin rectangles. Contacts are found with a swept segment against each
//! rectangle grown by the ball radius, so a ball can never skip a brick
//! between two frames. Response picks a reflection axis from penetration
//! depth and pushes the ball clear of the collider.

use glam::Vec2;

use super::geom::{Rect, sweep_segment_rect};
use crate::consts::SEPARATION_EPSILON;
use crate::velocity_from_vertical;

/// Reflection axis for a rectangle contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Left/right face: flip the horizontal component
    Horizontal,
    /// Top/bottom face: flip the vertical component
    Vertical,
}

/// Result of a contact search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Index of the collider in the searched slice
    pub index: usize,
    /// Fraction of the step travelled before contact (0 when already overlapping)
    pub t: f32,
    /// Ball center at contact
    pub point: Vec2,
    /// Penetration depth at contact (position correction)
    pub penetration: f32,
}

/// Per-axis overlap of a circle's bounding box with `rect`
fn axis_penetrations(center: Vec2, radius: f32, rect: &Rect) -> (f32, f32) {
    let left = center.x + radius - rect.left();
    let right = rect.right() - (center.x - radius);
    let top = center.y + radius - rect.top();
    let bottom = rect.bottom() - (center.y - radius);
    (left.min(right), top.min(bottom))
}

/// Shallowest-axis test: whichever of `min(left, right)` and
/// `min(top, bottom)` is smaller is the face the ball came through.
/// Ties (corners) bounce vertically.
pub fn penetration_axis(center: Vec2, radius: f32, rect: &Rect) -> Axis {
    let (x_pen, y_pen) = axis_penetrations(center, radius, rect);
    if x_pen < y_pen {
        Axis::Horizontal
    } else {
        Axis::Vertical
    }
}

/// Depth of the shallowest axis; larger means more deeply embedded
pub fn penetration_depth(center: Vec2, radius: f32, rect: &Rect) -> f32 {
    let (x_pen, y_pen) = axis_penetrations(center, radius, rect);
    x_pen.min(y_pen).max(0.0)
}

/// Find the collider a ball moving `from -> to` touches first.
///
/// Colliders the ball already overlaps at `from` win outright, deepest
/// penetration first. Otherwise the earliest time of impact along the path
/// wins, ties going to the lower index.
pub fn first_contact<'a, I>(from: Vec2, to: Vec2, radius: f32, rects: I) -> Option<Contact>
where
    I: IntoIterator<Item = (usize, &'a Rect)>,
{
    let mut overlap: Option<Contact> = None;
    let mut swept: Option<Contact> = None;

    for (index, rect) in rects {
        if rect.overlaps_circle(from, radius) {
            let penetration = penetration_depth(from, radius, rect);
            if overlap.is_none_or(|best| penetration > best.penetration) {
                overlap = Some(Contact {
                    index,
                    t: 0.0,
                    point: from,
                    penetration,
                });
            }
            continue;
        }
        if overlap.is_some() {
            continue;
        }
        if let Some(hit) = sweep_segment_rect(from, to, &rect.expand(radius)) {
            if swept.is_none_or(|best| hit.t < best.t) {
                let point = from + (to - from) * hit.t;
                swept = Some(Contact {
                    index,
                    t: hit.t,
                    point,
                    penetration: penetration_depth(point, radius, rect),
                });
            }
        }
    }

    overlap.or(swept)
}

/// Bounce a ball off `rect` along `axis` and place it `radius + epsilon`
/// clear of the face it hit. Speed is untouched.
pub fn bounce_off_rect(pos: Vec2, vel: Vec2, radius: f32, rect: &Rect, axis: Axis) -> (Vec2, Vec2) {
    let center = rect.center();
    let mut pos = pos;
    let mut vel = vel;
    match axis {
        Axis::Horizontal => {
            if pos.x < center.x {
                vel.x = -vel.x.abs();
                pos.x = rect.left() - radius - SEPARATION_EPSILON;
            } else {
                vel.x = vel.x.abs();
                pos.x = rect.right() + radius + SEPARATION_EPSILON;
            }
        }
        Axis::Vertical => {
            if pos.y < center.y {
                vel.y = -vel.y.abs();
                pos.y = rect.top() - radius - SEPARATION_EPSILON;
            } else {
                vel.y = vel.y.abs();
                pos.y = rect.bottom() + radius + SEPARATION_EPSILON;
            }
        }
    }
    (pos, vel)
}

/// Bounce off a moving body along whichever axis has the larger
/// center-to-center offset.
pub fn bounce_off_body(pos: Vec2, vel: Vec2, radius: f32, body: &Rect) -> (Vec2, Vec2) {
    let offset = pos - body.center();
    let axis = if offset.x.abs() * body.h > offset.y.abs() * body.w {
        Axis::Horizontal
    } else {
        Axis::Vertical
    };
    bounce_off_rect(pos, vel, radius, body, axis)
}

/// Where a falling ball meets the paddle's bounce band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaddleContact {
    /// Ball center x at contact
    pub x: f32,
    /// 0 at the paddle's left edge, 1 at its right edge
    pub ratio: f32,
}

/// Swept paddle test.
///
/// Only a ball moving down whose bottom edge reaches the paddle top while it
/// is still inside the top `band` fraction of the paddle height registers.
/// A ball that is already below the band falls through untouched.
pub fn paddle_contact(from: Vec2, to: Vec2, radius: f32, vel: Vec2, paddle: &Rect, band: f32) -> Option<PaddleContact> {
    if vel.y <= 0.0 {
        return None;
    }
    let band_bottom = paddle.top() + paddle.h * band;
    let prev_bottom = from.y + radius;
    let next_bottom = to.y + radius;
    if prev_bottom > band_bottom || next_bottom < paddle.top() {
        return None;
    }

    let travel = next_bottom - prev_bottom;
    let t = if travel.abs() < f32::EPSILON {
        0.0
    } else {
        ((paddle.top() - prev_bottom) / travel).clamp(0.0, 1.0)
    };
    let x = from.x + (to.x - from.x) * t;
    if x + radius < paddle.left() || x - radius > paddle.right() {
        return None;
    }

    let ratio = if paddle.w > 0.0 {
        ((x - paddle.left()) / paddle.w).clamp(0.0, 1.0)
    } else {
        0.5
    };
    Some(PaddleContact { x, ratio })
}

/// Exit velocity off the paddle: `(ratio - 0.5) * spread` from vertical,
/// clamped to `max_angle`, keeping `speed`.
pub fn paddle_exit_velocity(ratio: f32, speed: f32, spread: f32, max_angle: f32) -> Vec2 {
    let angle = ((ratio - 0.5) * spread).clamp(-max_angle, max_angle);
    velocity_from_vertical(angle, speed)
}
