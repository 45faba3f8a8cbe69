//! Axis-aligned geometry for the playfield
//!
//! Everything in the arena (paddle, bricks, enemies, bosses, projectiles) is
//! an axis-aligned rectangle in screen space (y grows downward). Balls are
//! circles. Fast balls are handled by sweeping their center segment against
//! rectangles grown by the ball radius.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Rectangle anchored at its top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle of the given size centered on `center`
    pub fn centered(center: Vec2, w: f32, h: f32) -> Self {
        Self::new(center.x - w / 2.0, center.y - h / 2.0, w, h)
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Grow by `margin` on every side
    pub fn expand(&self, margin: f32) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            self.w + margin * 2.0,
            self.h + margin * 2.0,
        )
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }

    /// AABB overlap (touching edges do not count)
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    /// Circle overlap using the closest point on the rectangle
    pub fn overlaps_circle(&self, center: Vec2, radius: f32) -> bool {
        let closest = Vec2::new(
            center.x.clamp(self.left(), self.right()),
            center.y.clamp(self.top(), self.bottom()),
        );
        (center - closest).length_squared() < radius * radius
    }
}

/// First contact of a swept segment with a rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    /// Fraction of the segment travelled before contact, in [0, 1]
    pub t: f32,
    /// Outward face normal of the face entered
    pub normal: Vec2,
}

/// Slab test of the segment `from -> to` against `rect`.
///
/// Returns `None` when the segment misses, starts inside the rectangle, or
/// only reaches it after `to`.
pub fn sweep_segment_rect(from: Vec2, to: Vec2, rect: &Rect) -> Option<SweepHit> {
    let d = to - from;
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut normal = Vec2::ZERO;

    for axis in 0..2 {
        let (origin, delta, lo, hi) = if axis == 0 {
            (from.x, d.x, rect.left(), rect.right())
        } else {
            (from.y, d.y, rect.top(), rect.bottom())
        };

        if delta.abs() < f32::EPSILON {
            if origin < lo || origin > hi {
                return None;
            }
            continue;
        }

        let t1 = (lo - origin) / delta;
        let t2 = (hi - origin) / delta;
        let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };

        if near > t_enter {
            t_enter = near;
            normal = if axis == 0 {
                Vec2::new(-delta.signum(), 0.0)
            } else {
                Vec2::new(0.0, -delta.signum())
            };
        }
        t_exit = t_exit.min(far);
    }

    if t_enter > t_exit || t_exit < 0.0 || t_enter > 1.0 || t_enter < 0.0 {
        return None;
    }

    Some(SweepHit {
        t: t_enter,
        normal,
    })
}
