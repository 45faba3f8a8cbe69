//! Entity lifecycle: spawning, despawning and drops
//!
//! Timers live on the entities they belong to, so removing an entity from
//! its collection is all it takes to cancel them.

use glam::Vec2;
use rand::Rng;

use super::entities::{
    Ball, BONUS_WORD, BonusLetter, Enemy, EnemyClass, EnemyKind, PowerUp, PowerUpKind, Projectile,
    ProjectileKind,
};
use super::events::GameEvent;
use super::geom::Rect;
use super::powerups;
use super::state::{GamePhase, World};
use super::timer::Countdown;
use crate::consts::*;

/// Lowest level on which each letter of the bonus word may drop
pub const LETTER_MIN_LEVEL: [u32; 6] = [1, 2, 3, 4, 6, 7];

/// Enemies bounce inside the top part of the field
const ENEMY_FIELD_BOTTOM: f32 = CANVAS_HEIGHT * 0.65;

/// Place a new ball on the paddle, waiting for launch
pub fn spawn_ball(world: &mut World) -> u32 {
    let id = world.next_ball_id();
    let mut ball = Ball::new(id, world.tuning.ball_radius, world.level_ball_speed());
    ball.fireball = !world.effects.fireball.is_done();
    ball.homing = !world.effects.homing.is_done();
    ball.rest_on(&world.paddle);
    world.balls.push(ball);
    id
}

pub fn spawn_enemy(world: &mut World, class: EnemyClass, pos: Vec2, minion_of: Option<u32>) -> u32 {
    let params = class.params(&world.tuning.enemies).clone();
    let id = world.next_enemy_id();

    let side = if world.rng.random_bool(0.5) { 1.0 } else { -1.0 };
    let dir = Vec2::new(side * world.rng.random_range(0.5..1.0), world.rng.random_range(0.3..0.8))
        .normalize_or_zero();
    let half = params.size / 2.0;
    let pos = Vec2::new(
        pos.x.clamp(half, CANVAS_WIDTH - half),
        pos.y.clamp(half, ENEMY_FIELD_BOTTOM - half),
    );
    let drop_in = drop_interval(world);

    world.enemies.push(Enemy {
        id,
        pos,
        vel: dir * params.base_speed,
        size: params.size,
        rotation: 0.0,
        spin: world.rng.random_range(-0.08..0.08),
        speed: params.base_speed,
        kind: EnemyKind::fresh(class),
        drop_timer: Countdown::new(drop_in),
        minion_of,
        kamikaze: false,
    });
    log::debug!("Spawned {:?} enemy {} (minion of {:?})", class, id, minion_of);
    id
}

pub fn spawn_projectile(world: &mut World, kind: ProjectileKind, pos: Vec2, vel: Vec2, owner: Option<u32>) -> u32 {
    let id = world.next_projectile_id();
    world.projectiles.push(Projectile {
        id,
        pos,
        vel,
        size: kind.size(),
        owner,
        kind,
    });
    id
}

pub fn spawn_powerup(world: &mut World, kind: PowerUpKind, pos: Vec2) -> u32 {
    let id = world.next_powerup_id();
    world.powerups.push(PowerUp {
        id,
        pos,
        fall_speed: world.tuning.powerup_fall_speed,
        kind,
        active: true,
    });
    world.emit(GameEvent::PowerUpSpawned { powerup_id: id, kind });
    id
}

/// Random projectile-drop interval for the current level
pub fn drop_interval(world: &mut World) -> f32 {
    let t = &world.tuning;
    let shave = (world.level.max(1) - 1) as f32 * t.drop_interval_decay;
    let lo = (t.drop_interval_range[0] - shave).max(t.drop_interval_floor[0]);
    let hi = (t.drop_interval_range[1] - shave).max(t.drop_interval_floor[1]).max(lo);
    if hi > lo {
        world.rng.random_range(lo..=hi)
    } else {
        lo
    }
}

/// Weighted enemy class among those unlocked at the current level
pub fn choose_enemy_class(world: &mut World) -> Option<EnemyClass> {
    let level = world.level;
    let table = &world.tuning.enemies;
    let unlocked: Vec<(EnemyClass, u32)> = EnemyClass::ALL
        .iter()
        .map(|c| (*c, c.params(table)))
        .filter(|(_, p)| p.unlock_level <= level && p.spawn_weight > 0)
        .map(|(c, p)| (c, p.spawn_weight))
        .collect();
    let total: u32 = unlocked.iter().map(|(_, w)| w).sum();
    if total == 0 {
        return None;
    }
    let mut roll = world.rng.random_range(0..total);
    for (class, weight) in unlocked {
        if roll < weight {
            return Some(class);
        }
        roll -= weight;
    }
    None
}

/// Move enemies inside their band; kamikazes fly straight and leave the field
pub fn move_enemies(world: &mut World, frames: f32) {
    for enemy in &mut world.enemies {
        enemy.pos += enemy.vel * frames;
        enemy.rotation += enemy.spin * frames;
        if enemy.kamikaze {
            continue;
        }
        let half = enemy.size / 2.0;
        if enemy.pos.x - half < 0.0 {
            enemy.pos.x = half;
            enemy.vel.x = enemy.vel.x.abs();
        } else if enemy.pos.x + half > CANVAS_WIDTH {
            enemy.pos.x = CANVAS_WIDTH - half;
            enemy.vel.x = -enemy.vel.x.abs();
        }
        if enemy.pos.y - half < 0.0 {
            enemy.pos.y = half;
            enemy.vel.y = enemy.vel.y.abs();
        } else if enemy.pos.y + half > ENEMY_FIELD_BOTTOM {
            enemy.pos.y = ENEMY_FIELD_BOTTOM - half;
            enemy.vel.y = -enemy.vel.y.abs();
        }
    }

    let before = world.enemies.len();
    let field = Rect::new(0.0, 0.0, CANVAS_WIDTH, CANVAS_HEIGHT);
    world.enemies.retain(|e| !e.kamikaze || e.rect().overlaps(&field));
    if world.enemies.len() != before {
        log::debug!("{} kamikaze enemies left the field", before - world.enemies.len());
    }
}

/// Spawn and despawn pass, run after collision resolution
pub fn update(world: &mut World, dt: f32, frames: f32) {
    handle_destruction_drops(world);
    update_pickups(world, frames);
    update_enemy_spawner(world, dt);
    update_enemy_drops(world, dt);
}

/// Power-up and letter drops for everything destroyed this tick
fn handle_destruction_drops(world: &mut World) {
    let mut bricks = Vec::new();
    let mut kills = Vec::new();
    for event in world.tick_events() {
        match event {
            GameEvent::BrickDestroyed { brick_id, pos, .. } => bricks.push((*brick_id, *pos)),
            GameEvent::EnemyDestroyed { pos, .. } => kills.push(*pos),
            _ => {}
        }
    }

    let attempts = world.tuning.guaranteed_drop_attempts;
    for (brick_id, pos) in bricks {
        let carries = world
            .bricks
            .iter()
            .any(|b| b.id == brick_id && b.has_powerup);
        if carries {
            drop_powerup(world, pos, attempts);
        } else {
            let chance = world.difficulty().powerup_drop_chance.clamp(0.0, 1.0) as f64;
            if world.rng.random_bool(chance) {
                drop_powerup(world, pos, 1);
            }
        }
        maybe_drop_letter(world, pos);
    }

    for pos in kills {
        record_enemy_kill(world, pos);
    }
}

/// Count a kill toward the guaranteed drop, spawning it at `pos` when due
pub(crate) fn record_enemy_kill(world: &mut World, pos: Vec2) {
    world.enemy_kills += 1;
    let every = world.tuning.guaranteed_drop_every;
    if every > 0 && world.enemy_kills % every == 0 {
        log::debug!("Guaranteed drop after {} kills", world.enemy_kills);
        let attempts = world.tuning.guaranteed_drop_attempts;
        drop_powerup(world, pos, attempts);
    }
}

/// Roll the selector up to `attempts` times and spawn the first success
fn drop_powerup(world: &mut World, pos: Vec2, attempts: u32) -> Option<u32> {
    for _ in 0..attempts {
        if let Some(kind) = powerups::choose_powerup(world) {
            return Some(spawn_powerup(world, kind, pos));
        }
    }
    None
}

/// Next letter that may drop here, if any
pub fn eligible_letter(world: &World) -> Option<char> {
    if world.letter_dropped || !world.letters.is_empty() {
        return None;
    }
    BONUS_WORD
        .iter()
        .zip(LETTER_MIN_LEVEL)
        .find(|(letter, min_level)| world.level >= *min_level && !world.collected_letters.contains(letter))
        .map(|(letter, _)| *letter)
}

fn maybe_drop_letter(world: &mut World, pos: Vec2) {
    let Some(letter) = eligible_letter(world) else {
        return;
    };
    let chance = world.tuning.letter_drop_chance.clamp(0.0, 1.0) as f64;
    if !world.rng.random_bool(chance) {
        return;
    }
    let id = world.next_letter_id();
    world.letters.push(BonusLetter {
        id,
        pos,
        letter,
        fall_speed: world.tuning.letter_fall_speed,
        active: true,
    });
    world.letter_dropped = true;
    world.emit(GameEvent::LetterSpawned { letter });
    log::debug!("Letter {} dropped", letter);
}

/// Fall, pickup and miss handling for power-ups and letters
fn update_pickups(world: &mut World, frames: f32) {
    let paddle = world.paddle.rect();

    let mut granted = Vec::new();
    for p in &mut world.powerups {
        p.pos.y += p.fall_speed * frames;
        if p.rect().overlaps(&paddle) {
            p.active = false;
            granted.push(p.kind);
        } else if p.rect().top() > CANVAS_HEIGHT {
            p.active = false;
        }
    }
    world.powerups.retain(|p| p.active);

    let mut caught = Vec::new();
    for l in &mut world.letters {
        l.pos.y += l.fall_speed * frames;
        if l.rect().overlaps(&paddle) {
            l.active = false;
            caught.push(l.letter);
        } else if l.rect().top() > CANVAS_HEIGHT {
            l.active = false;
        }
    }
    world.letters.retain(|l| l.active);

    for kind in granted {
        powerups::apply_powerup(world, kind);
    }
    for letter in caught {
        collect_letter(world, letter);
    }
}

/// Record a caught letter; completing the word pays out once
pub fn collect_letter(world: &mut World, letter: char) {
    if world.collected_letters.contains(&letter) {
        return;
    }
    world.collected_letters.push(letter);
    world.emit(GameEvent::LetterCollected { letter });

    if BONUS_WORD.iter().all(|c| world.collected_letters.contains(c)) {
        world.award(world.tuning.letters_bonus_points);
        world.lives = (world.lives + 1).min(world.tuning.max_lives);
        world.achievements.all_letters = true;
        world.emit(GameEvent::AllLettersCollected);
        log::info!("All bonus letters collected");
    }
}

fn update_enemy_spawner(world: &mut World, dt: f32) {
    if world.boss_level || !world.enemy_spawn_timer.advance(dt) {
        return;
    }
    let regulars = world.enemies.iter().filter(|e| e.minion_of.is_none()).count();
    if regulars < world.tuning.max_enemies {
        if let Some(class) = choose_enemy_class(world) {
            let x = world.rng.random_range(40.0..CANVAS_WIDTH - 40.0);
            spawn_enemy(world, class, Vec2::new(x, 30.0), None);
        }
    }
    let interval = super::progression::spawn_interval(world.difficulty(), world.level);
    world.enemy_spawn_timer.restart(interval);
}

/// Advance every enemy's drop timer and fire the ones that ran out
fn update_enemy_drops(world: &mut World, dt: f32) {
    let target = Vec2::new(world.paddle.center_x(), world.paddle.top());
    let mut ready = Vec::new();
    for enemy in &mut world.enemies {
        if enemy.drop_timer.advance(dt) && !enemy.kamikaze {
            ready.push((enemy.id, enemy.class(), enemy.pos, enemy.size));
        }
    }

    for (id, class, pos, size) in ready {
        let muzzle = pos + Vec2::new(0.0, size / 2.0);
        match class {
            EnemyClass::Cube | EnemyClass::Sphere => {
                let vel = Vec2::new(0.0, world.tuning.bomb_speed);
                spawn_projectile(world, ProjectileKind::Bomb, muzzle, vel, Some(id));
            }
            EnemyClass::Pyramid => {
                let dir = (target - muzzle).normalize_or_zero();
                let dir = if dir == Vec2::ZERO { Vec2::Y } else { dir };
                let vel = dir * world.tuning.rocket_speed;
                spawn_projectile(world, ProjectileKind::Rocket, muzzle, vel, Some(id));
            }
        }
        let next = drop_interval(world);
        if let Some(enemy) = world.enemies.iter_mut().find(|e| e.id == id) {
            enemy.drop_timer.restart(next);
        }
    }
}

/// Lose a life: clear the field around the paddle and either respawn or end the run
pub fn lose_life(world: &mut World) {
    world.lives = world.lives.saturating_sub(1);
    world.balls.clear();
    world.projectiles.clear();
    world.powerups.clear();
    world.paddle.reset();
    world.effects = Default::default();
    world.turret_cooldown = Countdown::default();
    world.combo = 0;
    world.pending_life_loss = false;
    world.emit(GameEvent::LifeLost {
        lives_left: world.lives,
    });
    log::info!("Life lost, {} left", world.lives);

    if world.lives == 0 {
        game_over(world);
    } else {
        world.phase = GamePhase::Respawning;
        world.respawn_timer = Countdown::new(world.tuning.respawn_delay);
    }
}

fn game_over(world: &mut World) {
    world.phase = GamePhase::GameOver;
    let summary = world.summary();
    log::info!(
        "Game over: score {} at level {} ({})",
        summary.score,
        summary.level_reached,
        summary.difficulty.as_str()
    );
    world.emit(GameEvent::GameOver { summary });
    if world.score > world.leaderboard_floor {
        world.emit(GameEvent::HighScoreEligible { score: world.score });
    }
}

/// Put a fresh ball on the paddle after the respawn countdown
pub fn respawn(world: &mut World) {
    spawn_ball(world);
    world.stall.touch(world.time);
    world.phase = GamePhase::Playing;
    log::debug!("Respawned, {} lives", world.lives);
}
