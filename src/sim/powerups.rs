//! Power-up selection and effects

use glam::Vec2;
use rand::Rng;

use super::entities::{PowerUpKind, ProjectileKind};
use super::events::GameEvent;
use super::lifecycle;
use super::state::{ExpiredEffects, World};
use super::timer::Countdown;
use crate::{rotate_vec, velocity_from_vertical};

/// Whether `kind` would do anything right now
pub fn is_eligible(world: &World, kind: PowerUpKind) -> bool {
    match kind {
        PowerUpKind::ExtraLife => world.lives < world.tuning.max_lives,
        PowerUpKind::Stun => !world.bosses.is_empty() || !world.enemies.is_empty(),
        PowerUpKind::Turrets => world.paddle.turret_ammo < world.tuning.turret_ammo,
        _ => true,
    }
}

/// Weighted roll over every kind. Rolling an ineligible kind yields `None`;
/// callers that must produce a drop retry.
pub fn choose_powerup(world: &mut World) -> Option<PowerUpKind> {
    let total: u32 = PowerUpKind::ALL.iter().map(|k| k.weight()).sum();
    let mut roll = world.rng.random_range(0..total);
    let kind = PowerUpKind::ALL.into_iter().find(|k| {
        if roll < k.weight() {
            true
        } else {
            roll -= k.weight();
            false
        }
    })?;
    is_eligible(world, kind).then_some(kind)
}

/// Apply a collected power-up
pub fn apply_powerup(world: &mut World, kind: PowerUpKind) {
    match kind {
        PowerUpKind::MultiBall => split_balls(world),
        PowerUpKind::Fireball => {
            world.effects.fireball = Countdown::new(world.tuning.fireball_duration);
            for ball in &mut world.balls {
                ball.fireball = true;
            }
        }
        PowerUpKind::WidePaddle => {
            world.effects.wide = Countdown::new(world.tuning.wide_duration);
            let width = world.paddle.base_width * world.tuning.wide_paddle_factor;
            world.paddle.set_width(width);
        }
        PowerUpKind::Turrets => world.paddle.turret_ammo = world.tuning.turret_ammo,
        PowerUpKind::Shield => world.paddle.shield = true,
        PowerUpKind::SlowBall => {
            let speed = world.level_ball_speed() * world.tuning.slow_factor;
            for ball in &mut world.balls {
                ball.speed_bonus = 0.0;
                ball.set_speed(speed);
            }
        }
        PowerUpKind::ExtraLife => {
            world.lives = (world.lives + 1).min(world.tuning.max_lives);
        }
        PowerUpKind::Stun => stun_everything(world),
        PowerUpKind::Homing => {
            world.effects.homing = Countdown::new(world.tuning.homing_duration);
            for ball in &mut world.balls {
                ball.homing = true;
            }
        }
    }
    world.emit(GameEvent::PowerUpGranted { kind });
    log::debug!("Power-up {:?} applied", kind);
}

/// Two extra balls fanned out from the first ball
fn split_balls(world: &mut World) {
    let Some(source) = world
        .balls
        .iter()
        .find(|b| b.in_flight())
        .or_else(|| world.balls.first())
        .cloned()
    else {
        return;
    };

    let heading = if source.in_flight() {
        source.vel
    } else {
        velocity_from_vertical(world.launch_angle, source.speed)
    };
    let spread = world.tuning.multiball_spread_degrees.to_radians();
    for offset in [-spread, spread] {
        let id = world.next_ball_id();
        let mut ball = source.clone();
        ball.id = id;
        ball.vel = rotate_vec(heading, offset);
        ball.waiting_to_launch = false;
        ball.last_hit_at = None;
        world.balls.push(ball);
    }
}

/// Stun every boss and wipe out the regular enemies, scoring them
fn stun_everything(world: &mut World) {
    let duration = world.tuning.stun_duration;
    let mut stunned = Vec::new();
    for boss in &mut world.bosses {
        boss.stun(duration);
        stunned.push(boss.id);
    }
    for boss_id in stunned {
        world.emit(GameEvent::BossStunned { boss_id });
    }

    let enemies = std::mem::take(&mut world.enemies);
    for enemy in enemies {
        let class = enemy.class();
        let points = class.params(&world.tuning.enemies).points;
        world.award(points);
        world.emit(GameEvent::Explosion {
            pos: enemy.pos,
            radius: enemy.size,
        });
        world.emit(GameEvent::EnemyDestroyed {
            enemy_id: enemy.id,
            class,
            pos: enemy.pos,
        });
        // The drop pass for this tick has already run
        lifecycle::record_enemy_kill(world, enemy.pos);
    }
}

/// Undo effects whose timers ran out this tick
pub fn expire_effects(world: &mut World, expired: ExpiredEffects) {
    if expired.fireball {
        for ball in &mut world.balls {
            ball.fireball = false;
        }
    }
    if expired.wide {
        let width = world.paddle.base_width;
        world.paddle.set_width(width);
    }
    if expired.homing {
        for ball in &mut world.balls {
            ball.homing = false;
        }
    }
}

/// Fire both turrets if loaded and off cooldown
pub fn fire_turrets(world: &mut World) -> bool {
    if !world.paddle.has_turrets() || !world.turret_cooldown.is_done() {
        return false;
    }
    let rect = world.paddle.rect();
    let vel = Vec2::new(0.0, -world.tuning.bullet_speed);
    let inset = ProjectileKind::Bullet.size().x;
    for x in [rect.left() + inset, rect.right() - inset] {
        let pos = Vec2::new(x, rect.top() - ProjectileKind::Bullet.size().y / 2.0);
        lifecycle::spawn_projectile(world, ProjectileKind::Bullet, pos, vel, None);
    }
    world.paddle.turret_ammo -= 1;
    world.turret_cooldown = Countdown::new(world.tuning.turret_cooldown);
    true
}
