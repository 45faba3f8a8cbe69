//! Per-tick collision resolution
//!
//! Each ball runs walls, paddle, bottom edge, bricks, enemies and bosses in
//! that order, in sub-steps no longer than its radius. Destroyed enemies
//! and lost balls are collected and removed after iteration, never while
//! the collections are being walked. Contacts are reported as events; drops,
//! boss damage and life loss are decided by the systems that read them.

use glam::Vec2;
use rand::Rng;

use super::collision::{
    bounce_off_body, bounce_off_rect, first_contact, paddle_contact, paddle_exit_velocity,
    penetration_axis,
};
use super::entities::{Ball, BrickClass, BrickHitOutcome, EnemyHitOutcome};
use super::events::GameEvent;
use super::geom::{Rect, sweep_segment_rect};
use super::state::World;
use crate::consts::*;
use crate::rotate_vec;

/// What happened to a ball this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BallFate {
    Alive,
    Lost,
}

/// Move every in-flight ball and resolve its contacts
pub fn resolve_balls(world: &mut World, frames: f32) {
    let mut lost = Vec::new();
    let mut dead_enemies = Vec::new();

    for index in 0..world.balls.len() {
        if !world.balls[index].in_flight() {
            continue;
        }
        let mut ball = world.balls[index].clone();
        if ball.homing {
            steer_homing(world, &mut ball, frames);
        }
        let fate = step_ball(world, &mut ball, frames, &mut dead_enemies);
        if fate == BallFate::Lost {
            lost.push(ball.id);
        }
        world.balls[index] = ball;
    }

    if !dead_enemies.is_empty() {
        world.enemies.retain(|e| !dead_enemies.contains(&e.id));
    }
    if !lost.is_empty() {
        world.balls.retain(|b| !lost.contains(&b.id));
        for ball_id in lost {
            log::debug!("Ball {} lost", ball_id);
            world.emit(GameEvent::BallLost { ball_id });
        }
    }
}

fn step_ball(world: &mut World, ball: &mut Ball, frames: f32, dead_enemies: &mut Vec<u32>) -> BallFate {
    let motion = ball.vel * frames;
    let max_step = (ball.radius * 0.9).max(1.0);
    let steps = (motion.length() / max_step).ceil().max(1.0) as usize;

    for _ in 0..steps {
        let step = ball.vel * (frames / steps as f32);
        let from = ball.pos;
        let mut to = from + step;
        let r = ball.radius;

        // (a) Walls: mirror the overshoot back into the field
        if to.x - r < 0.0 {
            to.x = 2.0 * r - to.x;
            ball.vel.x = ball.vel.x.abs();
        } else if to.x + r > CANVAS_WIDTH {
            to.x = 2.0 * (CANVAS_WIDTH - r) - to.x;
            ball.vel.x = -ball.vel.x.abs();
        }
        if to.y - r < 0.0 {
            to.y = 2.0 * r - to.y;
            ball.vel.y = ball.vel.y.abs();
        }
        to.x = to.x.clamp(r, CANVAS_WIDTH - r);
        to.y = to.y.max(r);

        // (b) Paddle, top band only
        let paddle_rect = world.paddle.rect();
        if let Some(contact) =
            paddle_contact(from, to, r, ball.vel, &paddle_rect, world.tuning.paddle_hit_band)
        {
            let speed = ball.vel.length();
            ball.vel = paddle_exit_velocity(
                contact.ratio,
                speed,
                world.tuning.paddle_angle_spread,
                world.tuning.max_launch_angle_degrees.to_radians(),
            );
            ball.pos = Vec2::new(contact.x, paddle_rect.top() - r - SEPARATION_EPSILON);
            world.stall.touch(world.time);
            world.combo = 0;
            world.emit(GameEvent::PaddleHit { ball_id: ball.id });
            return BallFate::Alive;
        }

        // (c) Bottom edge
        if to.y - r > CANVAS_HEIGHT {
            ball.pos = to;
            return BallFate::Lost;
        }

        let cooling = ball.in_hit_cooldown(world.time, world.tuning.hit_cooldown);

        // (d) Bricks
        if !cooling {
            let contact = first_contact(
                from,
                to,
                r,
                world
                    .bricks
                    .iter()
                    .enumerate()
                    .filter(|(_, b)| b.is_solid())
                    .map(|(i, b)| (i, &b.rect)),
            );
            if let Some(contact) = contact {
                hit_brick(world, ball, contact.index, contact.point, &mut to);
                ball.pos = to;
                continue;
            }
        }

        // (e) Enemies, then bosses
        if !cooling {
            let enemy_rects: Vec<(usize, Rect)> = world
                .enemies
                .iter()
                .enumerate()
                .filter(|(_, e)| !dead_enemies.contains(&e.id))
                .map(|(i, e)| (i, e.rect()))
                .collect();
            if let Some(contact) = first_contact(from, to, r, enemy_rects.iter().map(|(i, rect)| (*i, rect))) {
                hit_enemy(world, ball, contact.index, contact.point, &mut to, dead_enemies);
                ball.pos = to;
                continue;
            }

            let boss_rects: Vec<(usize, Rect)> =
                world.bosses.iter().map(|b| b.rect()).enumerate().collect();
            if let Some(contact) = first_contact(from, to, r, boss_rects.iter().map(|(i, rect)| (*i, rect))) {
                let rect = boss_rects[contact.index].1;
                let (pos, vel) = bounce_off_body(contact.point, ball.vel, r, &rect);
                ball.vel = vel;
                to = pos;
                ball.last_hit_at = Some(world.time);
                let damage = if ball.fireball {
                    world.tuning.boss.fireball_damage
                } else {
                    world.tuning.boss.ball_damage
                };
                let boss_id = world.bosses[contact.index].id;
                world.emit(GameEvent::BossHit { boss_id, damage });
            }
        }

        ball.pos = to;
    }

    BallFate::Alive
}

/// Ball against brick `index`, contact center `point`
fn hit_brick(world: &mut World, ball: &mut Ball, index: usize, point: Vec2, to: &mut Vec2) {
    let rect = world.bricks[index].rect;
    ball.last_hit_at = Some(world.time);

    let passes_through = ball.fireball && !world.bricks[index].indestructible;
    if passes_through {
        world.bricks[index].shatter();
        brick_destroyed(world, index, false);
        gain_speed(world, ball);
        return;
    }

    let axis = penetration_axis(point, ball.radius, &rect);
    let (pos, vel) = bounce_off_rect(point, ball.vel, ball.radius, &rect, axis);
    let jitter = world.tuning.brick_jitter_degrees.to_radians();
    let wobble = if jitter > 0.0 {
        world.rng.random_range(-jitter..=jitter)
    } else {
        0.0
    };
    ball.vel = rotate_vec(vel, wobble);
    *to = pos;

    match world.bricks[index].hit() {
        BrickHitOutcome::Deflected => {}
        BrickHitOutcome::Damaged => {
            let brick = &world.bricks[index];
            let event = GameEvent::BrickHit {
                brick_id: brick.id,
                hits_remaining: brick.hits_remaining,
            };
            world.emit(event);
        }
        BrickHitOutcome::Destroyed => {
            brick_destroyed(world, index, false);
            gain_speed(world, ball);
        }
    }
}

/// Per-brick speed bonus, additive and capped
fn gain_speed(world: &World, ball: &mut Ball) {
    let old = ball.speed_bonus;
    let new = (old + world.tuning.speed_increment_per_brick).min(world.tuning.speed_bonus_cap);
    if new <= old {
        return;
    }
    let factor = (1.0 + new) / (1.0 + old);
    ball.speed_bonus = new;
    ball.speed *= factor;
    ball.vel *= factor;
}

/// Score, report and (for explosives) detonate a brick that just went away
pub(crate) fn brick_destroyed(world: &mut World, index: usize, by_blast: bool) {
    let brick = &world.bricks[index];
    let (brick_id, pos, points, class, destructible) = (
        brick.id,
        brick.rect.center(),
        brick.points,
        brick.class,
        !brick.indestructible,
    );

    if destructible {
        world.award(points);
        world.bump_combo();
    }
    world.emit(GameEvent::BrickDestroyed {
        brick_id,
        pos,
        by_blast,
    });

    if class == BrickClass::Explosive && destructible {
        detonate(world, pos);
    }
}

/// Remove every brick within the blast radius of `origin`; explosives
/// caught in the blast detonate in the same step.
fn detonate(world: &mut World, origin: Vec2) {
    let radius = world.tuning.blast_radius;
    let mut pending = vec![origin];

    while let Some(center) = pending.pop() {
        world.emit(GameEvent::Explosion {
            pos: center,
            radius,
        });
        let caught: Vec<usize> = world
            .bricks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.visible && b.rect.center().distance(center) <= radius)
            .map(|(i, _)| i)
            .collect();

        for index in caught {
            world.bricks[index].shatter();
            let brick = &world.bricks[index];
            let (brick_id, pos, points, chains, destructible) = (
                brick.id,
                brick.rect.center(),
                brick.points,
                brick.class == BrickClass::Explosive && !brick.indestructible,
                !brick.indestructible,
            );
            if destructible {
                world.award(points);
                world.bump_combo();
            }
            world.emit(GameEvent::BrickDestroyed {
                brick_id,
                pos,
                by_blast: true,
            });
            if chains {
                pending.push(pos);
            }
        }
        log::debug!("Explosion at ({:.0}, {:.0})", center.x, center.y);
    }
}

/// Ball against enemy `index`
fn hit_enemy(
    world: &mut World,
    ball: &mut Ball,
    index: usize,
    point: Vec2,
    to: &mut Vec2,
    dead_enemies: &mut Vec<u32>,
) {
    ball.last_hit_at = Some(world.time);
    let rect = world.enemies[index].rect();

    if ball.fireball {
        *to = point + ball.vel.normalize_or_zero() * SEPARATION_EPSILON;
        kill_enemy(world, index, dead_enemies);
        return;
    }

    let (pos, vel) = bounce_off_body(point, ball.vel, ball.radius, &rect);
    ball.vel = vel;
    *to = pos;
    damage_enemy(world, index, dead_enemies);
}

/// One hit against the damage table
fn damage_enemy(world: &mut World, index: usize, dead_enemies: &mut Vec<u32>) {
    let class = world.enemies[index].class();
    let params = class.params(&world.tuning.enemies).clone();
    match world.enemies[index].take_hit(&params) {
        EnemyHitOutcome::Damaged {
            hits_taken,
            turned_angry,
        } => {
            let enemy_id = world.enemies[index].id;
            if turned_angry {
                log::debug!("Enemy {} turned angry", enemy_id);
            }
            world.emit(GameEvent::EnemyHit {
                enemy_id,
                hits_taken,
            });
        }
        EnemyHitOutcome::Destroyed => kill_enemy(world, index, dead_enemies),
    }
}

/// Mark enemy `index` for removal, score it and report it
fn kill_enemy(world: &mut World, index: usize, dead_enemies: &mut Vec<u32>) {
    let enemy = &world.enemies[index];
    let (enemy_id, class, pos, size) = (enemy.id, enemy.class(), enemy.pos, enemy.size);
    if dead_enemies.contains(&enemy_id) {
        return;
    }
    dead_enemies.push(enemy_id);
    let points = class.params(&world.tuning.enemies).points;
    world.award(points);
    world.bump_combo();
    world.emit(GameEvent::Explosion { pos, radius: size });
    world.emit(GameEvent::EnemyDestroyed {
        enemy_id,
        class,
        pos,
    });
}

/// Bend an upward ball toward the nearest destructible brick, at most
/// `homing_turn_rate` radians per frame. Speed is unchanged.
fn steer_homing(world: &World, ball: &mut Ball, frames: f32) {
    if ball.vel.y >= 0.0 {
        return;
    }
    let Some(target) = world
        .bricks
        .iter()
        .filter(|b| b.visible && b.counts_for_clear())
        .map(|b| b.rect.center())
        .min_by(|a, b| {
            a.distance_squared(ball.pos)
                .total_cmp(&b.distance_squared(ball.pos))
        })
    else {
        return;
    };

    let heading = ball.vel.normalize_or_zero();
    let wanted = (target - ball.pos).normalize_or_zero();
    if heading == Vec2::ZERO || wanted == Vec2::ZERO {
        return;
    }
    let angle = heading.perp_dot(wanted).atan2(heading.dot(wanted));
    let max_turn = world.tuning.homing_turn_rate * frames;
    ball.vel = rotate_vec(ball.vel, angle.clamp(-max_turn, max_turn));
}

/// Move projectiles and resolve them against the shield, the paddle,
/// and (for turret bullets) bricks, enemies and bosses
pub fn resolve_projectiles(world: &mut World, frames: f32) {
    let mut spent: Vec<u32> = Vec::new();
    let mut dead_enemies: Vec<u32> = Vec::new();

    for index in 0..world.projectiles.len() {
        let from = world.projectiles[index].pos;
        let to = from + world.projectiles[index].vel * frames;
        world.projectiles[index].pos = to;
        let projectile = world.projectiles[index].clone();
        let rect = projectile.rect();

        if projectile.kind.is_hostile() {
            let paddle = world.paddle.rect();
            let shield = Rect::new(
                paddle.left() - 4.0,
                paddle.top() - 10.0,
                paddle.w + 8.0,
                paddle.h + 10.0,
            );
            if world.paddle.shield && rect.overlaps(&shield) {
                world.paddle.shield = false;
                spent.push(projectile.id);
                world.emit(GameEvent::PaddleHitShield);
                log::debug!("Shield absorbed projectile {}", projectile.id);
                continue;
            }
            if rect.overlaps(&paddle) {
                spent.push(projectile.id);
                world.pending_life_loss = true;
                world.emit(GameEvent::PaddleStruck {
                    projectile_id: projectile.id,
                });
                continue;
            }
        } else {
            let reach = projectile.size.max_element() / 2.0;
            let touches = |target: &Rect| {
                rect.overlaps(target) || sweep_segment_rect(from, to, &target.expand(reach)).is_some()
            };

            if let Some(brick_index) = world
                .bricks
                .iter()
                .position(|b| b.is_solid() && touches(&b.rect))
            {
                spent.push(projectile.id);
                match world.bricks[brick_index].hit() {
                    BrickHitOutcome::Deflected => {}
                    BrickHitOutcome::Damaged => {
                        let brick = &world.bricks[brick_index];
                        let event = GameEvent::BrickHit {
                            brick_id: brick.id,
                            hits_remaining: brick.hits_remaining,
                        };
                        world.emit(event);
                    }
                    BrickHitOutcome::Destroyed => brick_destroyed(world, brick_index, false),
                }
                continue;
            }

            if let Some(enemy_index) = world
                .enemies
                .iter()
                .position(|e| !dead_enemies.contains(&e.id) && touches(&e.rect()))
            {
                spent.push(projectile.id);
                damage_enemy(world, enemy_index, &mut dead_enemies);
                continue;
            }

            if let Some(boss_id) = world
                .bosses
                .iter()
                .find(|b| touches(&b.rect()))
                .map(|b| b.id)
            {
                spent.push(projectile.id);
                let damage = world.tuning.boss.turret_damage;
                world.emit(GameEvent::BossHit { boss_id, damage });
                continue;
            }
        }

        if projectile.off_field() {
            spent.push(projectile.id);
        }
    }

    if !dead_enemies.is_empty() {
        world.enemies.retain(|e| !dead_enemies.contains(&e.id));
    }
    if !spent.is_empty() {
        world.projectiles.retain(|p| !spent.contains(&p.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entities::{Enemy, EnemyClass, EnemyKind, Projectile, ProjectileKind};
    use crate::sim::timer::Countdown;
    use crate::tuning::{DifficultyMode, Tuning};
    use crate::{angle_from_vertical, velocity_from_vertical};

    /// Level 1 world with one ball in flight and every brick hidden
    fn open_field() -> World {
        let mut world = World::new(Tuning::default(), DifficultyMode::Normal, 11);
        for brick in &mut world.bricks {
            brick.visible = false;
            brick.hits_remaining = 0;
        }
        world.balls[0].waiting_to_launch = false;
        world.take_events();
        world
    }

    fn place_ball(world: &mut World, pos: Vec2, vel: Vec2) {
        let ball = &mut world.balls[0];
        ball.pos = pos;
        ball.vel = vel;
        ball.speed = vel.length();
    }

    fn enemy(world: &mut World, class: EnemyClass, pos: Vec2) -> u32 {
        let params = class.params(&world.tuning.enemies).clone();
        let id = world.next_enemy_id();
        world.enemies.push(Enemy {
            id,
            pos,
            vel: Vec2::ZERO,
            size: params.size,
            rotation: 0.0,
            spin: 0.0,
            speed: params.base_speed,
            kind: EnemyKind::fresh(class),
            drop_timer: Countdown::new(10.0),
            minion_of: None,
            kamikaze: false,
        });
        id
    }

    #[test]
    fn test_wall_reflection_keeps_speed() {
        let mut world = open_field();
        place_ball(&mut world, Vec2::new(10.0, 300.0), Vec2::new(-5.0, -1.0));
        resolve_balls(&mut world, 1.0);
        let ball = &world.balls[0];
        assert!(ball.vel.x > 0.0);
        assert!(ball.pos.x >= ball.radius);
        assert!((ball.vel.length() - Vec2::new(5.0, 1.0).length()).abs() < 1e-5);
    }

    #[test]
    fn test_ball_lost_below_field() {
        let mut world = open_field();
        place_ball(&mut world, Vec2::new(30.0, 595.0), Vec2::new(0.0, 20.0));
        resolve_balls(&mut world, 1.0);
        assert!(world.balls.is_empty());
        assert!(
            world
                .take_events()
                .iter()
                .any(|e| matches!(e, GameEvent::BallLost { .. }))
        );
    }

    #[test]
    fn test_paddle_bounce_angle_from_offset() {
        let mut world = open_field();
        let paddle = world.paddle.rect();
        let x = paddle.left() + paddle.w * 0.75;
        place_ball(&mut world, Vec2::new(x, paddle.top() - 9.0), Vec2::new(0.0, 4.0));
        resolve_balls(&mut world, 1.0);
        let ball = &world.balls[0];
        let expected = 0.25 * world.tuning.paddle_angle_spread;
        assert!((angle_from_vertical(ball.vel) - expected).abs() < 1e-3);
        assert!((ball.vel.length() - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_fireball_passes_through() {
        let mut world = open_field();
        world.bricks[0].visible = true;
        world.bricks[0].hits_remaining = 1;
        let rect = world.bricks[0].rect;
        world.balls[0].fireball = true;
        place_ball(&mut world, Vec2::new(rect.center().x, rect.bottom() + 9.0), Vec2::new(0.0, -4.0));
        resolve_balls(&mut world, 1.0);
        assert!(!world.bricks[0].visible);
        assert!(world.balls[0].vel.y < 0.0);
    }

    #[test]
    fn test_metal_brick_always_bounces() {
        let mut world = open_field();
        world.bricks[0].visible = true;
        world.bricks[0].indestructible = true;
        world.bricks[0].class = BrickClass::Metal;
        world.bricks[0].hits_remaining = 1;
        let rect = world.bricks[0].rect;
        world.balls[0].fireball = true;
        place_ball(&mut world, Vec2::new(rect.center().x, rect.bottom() + 9.0), Vec2::new(0.0, -4.0));
        resolve_balls(&mut world, 1.0);
        assert!(world.bricks[0].visible);
        assert!(world.balls[0].vel.y > 0.0);
    }

    #[test]
    fn test_explosive_blast_clears_neighbours_including_metal() {
        let mut world = open_field();
        let centre = world.bricks[5].rect.center();
        for brick in &mut world.bricks {
            if brick.rect.center().distance(centre) <= world.tuning.blast_radius {
                brick.visible = true;
                brick.hits_remaining = 1;
            }
        }
        world.bricks[5].class = BrickClass::Explosive;
        world.bricks[6].indestructible = true;
        world.bricks[6].class = BrickClass::Metal;
        world.bricks[5].hit();
        brick_destroyed(&mut world, 5, false);
        assert!(!world.bricks[6].visible);
        assert!(
            world
                .bricks
                .iter()
                .all(|b| !b.visible || b.rect.center().distance(centre) > world.tuning.blast_radius)
        );
    }

    #[test]
    fn test_enemy_bounce_on_larger_offset_axis() {
        let mut world = open_field();
        let id = enemy(&mut world, EnemyClass::Sphere, Vec2::new(400.0, 300.0));
        place_ball(&mut world, Vec2::new(400.0, 323.0), Vec2::new(0.0, -4.0));
        resolve_balls(&mut world, 1.0);
        assert!(world.balls[0].vel.y > 0.0);
        let e = world.enemies.iter().find(|e| e.id == id).expect("still alive");
        assert_eq!(e.kind.hits_taken(), 1);
        assert!(e.kind.is_angry());
    }

    #[test]
    fn test_shield_absorbs_exactly_one() {
        let mut world = open_field();
        world.paddle.shield = true;
        let above = Vec2::new(world.paddle.center_x(), world.paddle.top() - 2.0);
        for _ in 0..2 {
            let id = world.next_projectile_id();
            world.projectiles.push(Projectile {
                id,
                pos: above,
                vel: Vec2::new(0.0, 2.0),
                size: ProjectileKind::Bomb.size(),
                owner: None,
                kind: ProjectileKind::Bomb,
            });
        }
        resolve_projectiles(&mut world, 1.0);
        assert!(!world.paddle.shield);
        assert!(world.pending_life_loss);
        assert!(world.projectiles.is_empty());
    }

    #[test]
    fn test_bullet_damages_boss_fractionally() {
        let mut world = World::new(Tuning::default(), DifficultyMode::Normal, 3);
        crate::sim::progression::start_level(&mut world, 5);
        world.take_events();
        let boss = world.bosses[0].clone();
        let id = world.next_projectile_id();
        world.projectiles.push(Projectile {
            id,
            pos: Vec2::new(boss.pos.x, boss.rect().bottom() + 4.0),
            vel: Vec2::new(0.0, -8.0),
            size: ProjectileKind::Bullet.size(),
            owner: None,
            kind: ProjectileKind::Bullet,
        });
        resolve_projectiles(&mut world, 1.0);
        let events = world.take_events();
        assert!(events.contains(&GameEvent::BossHit {
            boss_id: boss.id,
            damage: 0.5
        }));
    }

    #[test]
    fn test_brick_speed_bonus_climbs_to_cap() {
        let mut world = open_field();
        world.bricks[0].class = BrickClass::Normal;
        world.bricks[0].indestructible = false;
        let rect = world.bricks[0].rect;
        let base = 4.0;
        let cap = world.tuning.speed_bonus_cap;
        place_ball(&mut world, Vec2::new(rect.center().x, rect.bottom() + 9.0), Vec2::new(0.0, -base));

        let mut last_bonus = 0.0;
        for _ in 0..70 {
            world.bricks[0].visible = true;
            world.bricks[0].hits_remaining = 1;
            let ball = &mut world.balls[0];
            ball.pos = Vec2::new(rect.center().x, rect.bottom() + 9.0);
            ball.vel = Vec2::new(0.0, -ball.speed);
            ball.last_hit_at = None;
            resolve_balls(&mut world, 1.0);

            assert!(!world.bricks[0].visible);
            let ball = &world.balls[0];
            assert!(ball.speed_bonus >= last_bonus);
            assert!(ball.speed_bonus <= cap);
            assert!(ball.vel.length() <= base * (1.0 + cap) + 1e-3);
            last_bonus = ball.speed_bonus;
        }

        let ball = &world.balls[0];
        assert_eq!(ball.speed_bonus, cap);
        assert!((ball.vel.length() - base * (1.0 + cap)).abs() < 1e-3);
    }

    #[test]
    fn test_high_speed_ball_cannot_tunnel() {
        let mut world = open_field();
        world.bricks[0].visible = true;
        world.bricks[0].hits_remaining = 1;
        let rect = world.bricks[0].rect;
        let vel = velocity_from_vertical(0.0, 60.0);
        place_ball(&mut world, Vec2::new(rect.center().x, rect.bottom() + 40.0), vel);
        resolve_balls(&mut world, 1.0);
        assert!(!world.bricks[0].visible);
        assert!(world.balls[0].vel.y > 0.0);
    }
}
