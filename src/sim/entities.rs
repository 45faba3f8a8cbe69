//! Entity records held by the world store
//!
//! Each class carries only its own fields. Enemy variants are an explicit
//! tagged enum and are dispatched with exhaustive matches.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geom::Rect;
use super::timer::Countdown;
use crate::consts::*;
use crate::tuning::{EnemyParams, EnemyTable};
use crate::velocity_from_vertical;

pub const POWERUP_SIZE: Vec2 = Vec2::new(30.0, 14.0);
pub const LETTER_SIZE: Vec2 = Vec2::new(20.0, 20.0);

/// A ball entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Speed the velocity is held at during free flight
    pub speed: f32,
    /// Accumulated per-brick speed bonus (fraction, capped)
    pub speed_bonus: f32,
    /// Passes through and destroys bricks/enemies
    pub fireball: bool,
    /// Resting on the paddle until launched
    pub waiting_to_launch: bool,
    /// Steers toward the nearest brick
    pub homing: bool,
    /// Sim time of the last brick/enemy contact (hit cooldown)
    pub last_hit_at: Option<f64>,
}

impl Ball {
    pub fn new(id: u32, radius: f32, speed: f32) -> Self {
        Self {
            id,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            radius,
            speed,
            speed_bonus: 0.0,
            fireball: false,
            waiting_to_launch: true,
            homing: false,
            last_hit_at: None,
        }
    }

    /// Sit on top of the paddle, centered
    pub fn rest_on(&mut self, paddle: &Paddle) {
        self.pos = Vec2::new(paddle.center_x(), paddle.top() - self.radius - 1.0);
        self.vel = Vec2::ZERO;
    }

    /// Leave the paddle at `angle` from vertical
    pub fn launch(&mut self, angle: f32) {
        if self.waiting_to_launch {
            self.vel = velocity_from_vertical(angle, self.speed);
            self.waiting_to_launch = false;
        }
    }

    /// Change speed keeping direction
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
        if !self.waiting_to_launch {
            self.vel = self.vel.normalize_or_zero() * speed;
        }
    }

    /// True while the hit cooldown from a previous contact is running
    pub fn in_hit_cooldown(&self, now: f64, cooldown: f32) -> bool {
        self.last_hit_at
            .is_some_and(|t| now - t < cooldown as f64)
    }

    pub fn in_flight(&self) -> bool {
        !self.waiting_to_launch
    }
}

/// The player's paddle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paddle {
    /// Horizontal center
    pub x: f32,
    /// Top edge
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Width before power-ups
    pub base_width: f32,
    /// Turret shots left; turrets are mounted while this is non-zero
    pub turret_ammo: u32,
    pub shield: bool,
}

impl Paddle {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x: CANVAS_WIDTH / 2.0,
            y: CANVAS_HEIGHT - PADDLE_BOTTOM_MARGIN - height,
            width,
            height,
            base_width: width,
            turret_ammo: 0,
            shield: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x - self.width / 2.0, self.y, self.width, self.height)
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn has_turrets(&self) -> bool {
        self.turret_ammo > 0
    }

    /// Slide toward `target_x` at most `max_step` pixels, staying on the canvas
    pub fn move_toward(&mut self, target_x: f32, max_step: f32) {
        let delta = (target_x - self.x).clamp(-max_step, max_step);
        self.x += delta;
        self.clamp_to_canvas();
    }

    /// Resize around the current center
    pub fn set_width(&mut self, width: f32) {
        self.width = width.max(0.0);
        self.clamp_to_canvas();
    }

    fn clamp_to_canvas(&mut self) {
        let half = self.width / 2.0;
        self.x = self.x.clamp(half, (CANVAS_WIDTH - half).max(half));
    }

    /// Back to level-start geometry with no power-ups
    pub fn reset(&mut self) {
        self.x = CANVAS_WIDTH / 2.0;
        self.width = self.base_width;
        self.turret_ammo = 0;
        self.shield = false;
    }
}

/// Brick classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrickClass {
    #[default]
    Normal,
    Cracked,
    Explosive,
    Metal,
}

/// What a single ball contact did to a brick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrickHitOutcome {
    /// Indestructible, nothing changes
    Deflected,
    Damaged,
    Destroyed,
}

/// A brick entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brick {
    pub id: u32,
    pub rect: Rect,
    pub color: u32,
    pub visible: bool,
    pub points: u64,
    pub has_powerup: bool,
    pub max_hits: u8,
    pub hits_remaining: u8,
    pub indestructible: bool,
    pub class: BrickClass,
}

impl Brick {
    /// Solid bricks are the only ones with a collision volume
    pub fn is_solid(&self) -> bool {
        self.visible
    }

    /// Must be destroyed to clear the level
    pub fn counts_for_clear(&self) -> bool {
        !self.indestructible
    }

    /// Apply one direct hit
    pub fn hit(&mut self) -> BrickHitOutcome {
        if !self.visible || self.indestructible {
            return BrickHitOutcome::Deflected;
        }
        self.hits_remaining = self.hits_remaining.saturating_sub(1);
        if self.hits_remaining == 0 {
            self.visible = false;
            BrickHitOutcome::Destroyed
        } else {
            BrickHitOutcome::Damaged
        }
    }

    /// Remove regardless of class (explosive blast)
    pub fn shatter(&mut self) {
        self.visible = false;
        self.hits_remaining = 0;
    }
}

/// Enemy classes, used to index the damage table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyClass {
    Cube,
    Sphere,
    Pyramid,
}

impl EnemyClass {
    pub const ALL: [EnemyClass; 3] = [EnemyClass::Cube, EnemyClass::Sphere, EnemyClass::Pyramid];

    pub fn params<'a>(&self, table: &'a EnemyTable) -> &'a EnemyParams {
        match self {
            EnemyClass::Cube => &table.cube,
            EnemyClass::Sphere => &table.sphere,
            EnemyClass::Pyramid => &table.pyramid,
        }
    }
}

/// Per-variant enemy state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Drops bombs straight down
    Cube { hits_taken: u8 },
    /// Drops bombs, speeds up when angry
    Sphere { hits_taken: u8, angry: bool },
    /// Fires rockets at the paddle, speeds up when angry
    Pyramid { hits_taken: u8, angry: bool },
}

impl EnemyKind {
    pub fn fresh(class: EnemyClass) -> Self {
        match class {
            EnemyClass::Cube => EnemyKind::Cube { hits_taken: 0 },
            EnemyClass::Sphere => EnemyKind::Sphere {
                hits_taken: 0,
                angry: false,
            },
            EnemyClass::Pyramid => EnemyKind::Pyramid {
                hits_taken: 0,
                angry: false,
            },
        }
    }

    pub fn class(&self) -> EnemyClass {
        match self {
            EnemyKind::Cube { .. } => EnemyClass::Cube,
            EnemyKind::Sphere { .. } => EnemyClass::Sphere,
            EnemyKind::Pyramid { .. } => EnemyClass::Pyramid,
        }
    }

    pub fn hits_taken(&self) -> u8 {
        match *self {
            EnemyKind::Cube { hits_taken }
            | EnemyKind::Sphere { hits_taken, .. }
            | EnemyKind::Pyramid { hits_taken, .. } => hits_taken,
        }
    }

    pub fn is_angry(&self) -> bool {
        match *self {
            EnemyKind::Cube { .. } => false,
            EnemyKind::Sphere { angry, .. } | EnemyKind::Pyramid { angry, .. } => angry,
        }
    }
}

/// What a single ball contact did to an enemy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyHitOutcome {
    Damaged { hits_taken: u8, turned_angry: bool },
    Destroyed,
}

/// An enemy entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    /// Center
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    /// Visual spin (radians)
    pub rotation: f32,
    pub spin: f32,
    /// Current cruise speed (px per frame)
    pub speed: f32,
    pub kind: EnemyKind,
    /// Counts down to the next projectile drop
    pub drop_timer: Countdown,
    /// Boss that summoned it, if any
    pub minion_of: Option<u32>,
    /// Redirected at the ball by the anti-stall rule
    pub kamikaze: bool,
}

impl Enemy {
    pub fn rect(&self) -> Rect {
        Rect::centered(self.pos, self.size, self.size)
    }

    pub fn class(&self) -> EnemyClass {
        self.kind.class()
    }

    /// Register one hit against the damage table
    pub fn take_hit(&mut self, params: &EnemyParams) -> EnemyHitOutcome {
        let hits = self.kind.hits_taken().saturating_add(1);
        if hits >= params.hits_to_destroy {
            return EnemyHitOutcome::Destroyed;
        }

        let becomes_angry = params.angry_after > 0 && hits >= params.angry_after;
        let mut turned_angry = false;
        match &mut self.kind {
            EnemyKind::Cube { hits_taken } => *hits_taken = hits,
            EnemyKind::Sphere { hits_taken, angry } | EnemyKind::Pyramid { hits_taken, angry } => {
                *hits_taken = hits;
                if becomes_angry && !*angry {
                    *angry = true;
                    turned_angry = true;
                }
            }
        }

        if turned_angry {
            self.speed *= params.angry_speed_mult;
            self.vel = self.vel.normalize_or_zero() * self.speed;
            self.spin *= 2.0;
        }

        EnemyHitOutcome::Damaged {
            hits_taken: hits,
            turned_angry,
        }
    }
}

/// Projectile types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Enemy drop, falls straight down
    Bomb,
    /// Pyramid shot aimed at the paddle
    Rocket,
    /// Paddle turret shot, travels up
    Bullet,
    /// Boss shot pattern element
    BossShot,
    /// Boss laser beam segment
    Laser,
}

impl ProjectileKind {
    pub fn size(&self) -> Vec2 {
        match self {
            ProjectileKind::Bomb => Vec2::new(8.0, 8.0),
            ProjectileKind::Rocket => Vec2::new(6.0, 14.0),
            ProjectileKind::Bullet => Vec2::new(4.0, 10.0),
            ProjectileKind::BossShot => Vec2::new(10.0, 10.0),
            ProjectileKind::Laser => Vec2::new(8.0, 40.0),
        }
    }

    /// Harms the paddle
    pub fn is_hostile(&self) -> bool {
        !matches!(self, ProjectileKind::Bullet)
    }
}

/// A projectile entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    /// Center
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    /// Enemy or boss that fired it; None for turret bullets
    pub owner: Option<u32>,
    pub kind: ProjectileKind,
}

impl Projectile {
    pub fn rect(&self) -> Rect {
        Rect::centered(self.pos, self.size.x, self.size.y)
    }

    /// Entirely outside the canvas
    pub fn off_field(&self) -> bool {
        let r = self.rect();
        r.bottom() < 0.0 || r.top() > CANVAS_HEIGHT || r.right() < 0.0 || r.left() > CANVAS_WIDTH
    }
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    MultiBall,
    Fireball,
    WidePaddle,
    Turrets,
    Shield,
    SlowBall,
    ExtraLife,
    Stun,
    Homing,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 9] = [
        PowerUpKind::MultiBall,
        PowerUpKind::Fireball,
        PowerUpKind::WidePaddle,
        PowerUpKind::Turrets,
        PowerUpKind::Shield,
        PowerUpKind::SlowBall,
        PowerUpKind::ExtraLife,
        PowerUpKind::Stun,
        PowerUpKind::Homing,
    ];

    /// Relative drop weight
    pub fn weight(&self) -> u32 {
        match self {
            PowerUpKind::MultiBall => 14,
            PowerUpKind::Fireball => 8,
            PowerUpKind::WidePaddle => 14,
            PowerUpKind::Turrets => 10,
            PowerUpKind::Shield => 12,
            PowerUpKind::SlowBall => 12,
            PowerUpKind::ExtraLife => 3,
            PowerUpKind::Stun => 6,
            PowerUpKind::Homing => 8,
        }
    }
}

/// A falling power-up capsule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: u32,
    /// Center
    pub pos: Vec2,
    pub fall_speed: f32,
    pub kind: PowerUpKind,
    pub active: bool,
}

impl PowerUp {
    pub fn rect(&self) -> Rect {
        Rect::centered(self.pos, POWERUP_SIZE.x, POWERUP_SIZE.y)
    }
}

/// Letters of the bonus word, in collection order
pub const BONUS_WORD: [char; 6] = ['S', 'U', 'P', 'E', 'R', 'B'];

/// A falling bonus letter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusLetter {
    pub id: u32,
    /// Center
    pub pos: Vec2,
    pub letter: char,
    pub fall_speed: f32,
    pub active: bool,
}

impl BonusLetter {
    pub fn rect(&self) -> Rect {
        Rect::centered(self.pos, LETTER_SIZE.x, LETTER_SIZE.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;

    fn brick(hits: u8, indestructible: bool) -> Brick {
        Brick {
            id: 1,
            rect: Rect::new(0.0, 0.0, BRICK_WIDTH, BRICK_HEIGHT),
            color: 0xff0000,
            visible: true,
            points: 50,
            has_powerup: false,
            max_hits: hits,
            hits_remaining: hits,
            indestructible,
            class: BrickClass::Normal,
        }
    }

    fn enemy(class: EnemyClass, params: &EnemyParams) -> Enemy {
        Enemy {
            id: 7,
            pos: Vec2::new(100.0, 100.0),
            vel: Vec2::new(params.base_speed, 0.0),
            size: params.size,
            rotation: 0.0,
            spin: 0.05,
            speed: params.base_speed,
            kind: EnemyKind::fresh(class),
            drop_timer: Countdown::new(3.0),
            minion_of: None,
            kamikaze: false,
        }
    }

    #[test]
    fn test_brick_multi_hit() {
        let mut b = brick(2, false);
        assert_eq!(b.hit(), BrickHitOutcome::Damaged);
        assert_eq!(b.hits_remaining, 1);
        assert_eq!(b.hit(), BrickHitOutcome::Destroyed);
        assert!(!b.is_solid());
        // Further hits never underflow
        assert_eq!(b.hit(), BrickHitOutcome::Deflected);
        assert_eq!(b.hits_remaining, 0);
    }

    #[test]
    fn test_indestructible_brick_only_shatters() {
        let mut b = brick(1, true);
        assert_eq!(b.hit(), BrickHitOutcome::Deflected);
        assert!(b.visible);
        b.shatter();
        assert!(!b.visible);
        assert!(!b.counts_for_clear());
    }

    #[test]
    fn test_pyramid_damage_table() {
        let table = Tuning::default().enemies;
        let params = EnemyClass::Pyramid.params(&table);
        let mut e = enemy(EnemyClass::Pyramid, params);
        let base = e.speed;

        assert_eq!(
            e.take_hit(params),
            EnemyHitOutcome::Damaged {
                hits_taken: 1,
                turned_angry: false
            }
        );
        assert!(!e.kind.is_angry());

        assert_eq!(
            e.take_hit(params),
            EnemyHitOutcome::Damaged {
                hits_taken: 2,
                turned_angry: true
            }
        );
        assert!(e.kind.is_angry());
        assert!((e.speed - base * 1.5).abs() < 1e-5);
        assert!((e.vel.length() - e.speed).abs() < 1e-4);

        assert_eq!(e.take_hit(params), EnemyHitOutcome::Destroyed);
    }

    #[test]
    fn test_cube_dies_in_one() {
        let table = Tuning::default().enemies;
        let params = EnemyClass::Cube.params(&table);
        let mut e = enemy(EnemyClass::Cube, params);
        assert_eq!(e.take_hit(params), EnemyHitOutcome::Destroyed);
    }

    #[test]
    fn test_paddle_stays_on_canvas() {
        let mut p = Paddle::new(100.0, 14.0);
        p.move_toward(-500.0, 10_000.0);
        assert_eq!(p.rect().left(), 0.0);
        p.set_width(150.0);
        assert_eq!(p.rect().left(), 0.0);
        p.set_width(-3.0);
        assert_eq!(p.width, 0.0);
    }

    #[test]
    fn test_ball_rests_then_launches_straight_up() {
        let paddle = Paddle::new(100.0, 14.0);
        let mut ball = Ball::new(1, 7.0, 4.0);
        ball.rest_on(&paddle);
        assert!(ball.pos.y + ball.radius < paddle.top());
        ball.launch(0.0);
        assert!(!ball.waiting_to_launch);
        assert!((ball.vel.y + 4.0).abs() < 1e-5);
        assert!(ball.vel.x.abs() < 1e-5);
    }
}
