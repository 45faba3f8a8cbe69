//! Difficulty and level progression
//!
//! Builds each level from its layout template, scales ball speed and enemy
//! cadence with the level number, watches for stalled rallies and decides
//! when a level is won.

use glam::Vec2;

use super::boss;
use super::entities::{Brick, BrickClass};
use super::events::GameEvent;
use super::layouts::{self, BOSS_LAYOUT, GRID_COLUMNS, decode_cell};
use super::geom::Rect;
use super::lifecycle;
use super::state::{ActiveEffects, GamePhase, World};
use super::timer::Countdown;
use crate::consts::*;
use crate::rotate_vec;
use crate::tuning::{BrickTable, DifficultyMode, DifficultyParams, Tuning};

/// Enemy spawn interval: `max(min, base - (level - 1) * decay)`
pub fn spawn_interval(params: &DifficultyParams, level: u32) -> f32 {
    let steps = (level.max(1) - 1) as f32;
    (params.enemy_base_interval - steps * params.enemy_interval_decay).max(params.enemy_min_interval)
}

/// Ball speed multiplier for a level, capped per difficulty
pub fn speed_multiplier(params: &DifficultyParams, level: u32) -> f32 {
    let steps = (level.max(1) - 1) as f32;
    (params.speed_base + steps * params.speed_per_level).min(params.speed_cap)
}

pub fn is_boss_level(tuning: &Tuning, level: u32) -> bool {
    let interval = tuning.boss.level_interval;
    interval > 0 && level > 0 && level % interval == 0
}

/// Hits a brick of `class` needs on `row` of `level`
pub fn brick_hits(table: &BrickTable, class: BrickClass, row: usize, level: u32, mode: DifficultyMode) -> u8 {
    let extra = ((level.max(1) - 1) / table.levels_per_extra_hit.max(1)).min(u8::MAX as u32) as u8;
    let hard = u8::from(mode == DifficultyMode::Hard);
    let hits = match class {
        BrickClass::Normal => table.normal.base_hits.saturating_add(u8::from(row < extra as usize)),
        BrickClass::Cracked => table.cracked.base_hits.saturating_add(extra).saturating_add(hard),
        BrickClass::Explosive => table.explosive.base_hits,
        BrickClass::Metal => table.metal.base_hits,
    };
    hits.clamp(1, table.max_hits_cap.max(1))
}

fn build_bricks(world: &mut World) {
    let template: &[&str] = if world.boss_level {
        BOSS_LAYOUT
    } else {
        layouts::layout_for_level(world.level)
    };
    let grid_width = GRID_COLUMNS as f32 * (BRICK_WIDTH + BRICK_GAP) - BRICK_GAP;
    let left = (CANVAS_WIDTH - grid_width) / 2.0;

    let mut bricks = Vec::new();
    for (row, line) in template.iter().enumerate() {
        for (col, c) in line.chars().enumerate().take(GRID_COLUMNS) {
            let Some(cell) = decode_cell(c) else {
                continue;
            };
            let table = &world.tuning.bricks;
            let params = match cell.class {
                BrickClass::Normal => &table.normal,
                BrickClass::Cracked => &table.cracked,
                BrickClass::Explosive => &table.explosive,
                BrickClass::Metal => &table.metal,
            };
            let indestructible = cell.indestructible || params.indestructible;
            let max_hits = brick_hits(table, cell.class, row, world.level, world.mode);
            let points = if indestructible {
                0
            } else {
                params.points + 10 * (max_hits as u64 - 1)
            };
            let color = match (cell.class, indestructible) {
                (BrickClass::Metal, _) => layouts::METAL_COLOR,
                (_, true) => layouts::GOLD_COLOR,
                _ => layouts::row_color(world.level, row),
            };
            let x = left + col as f32 * (BRICK_WIDTH + BRICK_GAP);
            let y = BRICK_TOP_OFFSET + row as f32 * (BRICK_HEIGHT + BRICK_GAP);
            let id = world.next_brick_id();
            bricks.push(Brick {
                id,
                rect: Rect::new(x, y, BRICK_WIDTH, BRICK_HEIGHT),
                color,
                visible: true,
                points,
                has_powerup: cell.has_powerup,
                max_hits,
                hits_remaining: max_hits,
                indestructible,
                class: cell.class,
            });
        }
    }
    world.bricks = bricks;
}

/// Tear down the field and set up `level`
pub fn start_level(world: &mut World, level: u32) {
    let level = level.max(1);
    world.level = level;
    world.boss_level = is_boss_level(&world.tuning, level);

    world.balls.clear();
    world.enemies.clear();
    world.projectiles.clear();
    world.powerups.clear();
    world.letters.clear();
    world.bosses.clear();
    world.letter_dropped = false;

    build_bricks(world);
    world.level_has_destructible = world.destructible_remaining() > 0;

    let params = world.difficulty().clone();
    world.speed_multiplier = speed_multiplier(&params, level);
    world.enemy_spawn_timer = Countdown::new(spawn_interval(&params, level));

    world.paddle.reset();
    world.effects = ActiveEffects::default();
    world.turret_cooldown = Countdown::default();
    world.respawn_timer = Countdown::default();
    world.advance_timer = Countdown::default();
    world.pending_life_loss = false;
    world.combo = 0;
    world.launch_angle = 0.0;

    lifecycle::spawn_ball(world);
    world.stall.touch(world.time);

    if world.boss_level {
        boss::spawn_boss(world);
    }

    world.phase = GamePhase::Playing;
    world.emit(GameEvent::LevelStarted { level });
    log::info!(
        "Level {} started: {} bricks, speed x{:.2}{}",
        level,
        world.bricks.len(),
        world.speed_multiplier,
        if world.boss_level { ", boss" } else { "" }
    );
}

pub fn advance_level(world: &mut World) {
    let next = world.level + 1;
    start_level(world, next);
}

/// Deflect a rally that has not touched the paddle in a while, then send
/// the nearest enemy at the ball if it keeps going.
pub fn check_anti_stall(world: &mut World) {
    if !world.ball_in_flight() {
        world.stall.touch(world.time);
        return;
    }
    // f32 frame steps accumulate a little drift into the f64 clock
    const SLACK: f64 = 1e-4;
    let idle = world.time - world.stall.last_paddle_touch + SLACK;

    if !world.stall.deflected && idle >= world.tuning.stall_deflect_after as f64 {
        world.stall.deflected = true;
        let angle = world.tuning.stall_deflect_degrees.to_radians();
        let mut deflected = Vec::new();
        for ball in world.balls.iter_mut().filter(|b| b.in_flight()) {
            ball.vel = rotate_vec(ball.vel, angle);
            deflected.push(ball.id);
        }
        for ball_id in deflected {
            world.emit(GameEvent::AntiStallDeflect { ball_id });
        }
        log::debug!("Anti-stall deflection after {:.1}s", idle);
    }

    if !world.stall.kamikaze_sent
        && idle >= world.tuning.stall_kamikaze_after as f64
        && !world.enemies.is_empty()
    {
        let Some(target) = world.balls.iter().find(|b| b.in_flight()).map(|b| b.pos) else {
            return;
        };
        let Some(index) = world
            .enemies
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.pos
                    .distance_squared(target)
                    .total_cmp(&b.pos.distance_squared(target))
            })
            .map(|(i, _)| i)
        else {
            return;
        };

        let factor = world.tuning.kamikaze_speed_factor;
        let enemy = &mut world.enemies[index];
        let base = enemy.class().params(&world.tuning.enemies).base_speed;
        let dir = (target - enemy.pos).normalize_or_zero();
        let dir = if dir == Vec2::ZERO { Vec2::Y } else { dir };
        enemy.speed = base * factor;
        enemy.vel = dir * enemy.speed;
        enemy.kamikaze = true;
        let enemy_id = enemy.id;

        world.stall.kamikaze_sent = true;
        world.emit(GameEvent::Kamikaze { enemy_id });
        log::debug!("Enemy {} sent kamikaze after {:.1}s", enemy_id, idle);
    }
}

/// Move to `LevelComplete` once the win condition holds
pub fn check_level_complete(world: &mut World) -> bool {
    if world.phase != GamePhase::Playing {
        return false;
    }
    let cleared = if world.boss_level {
        world.bosses.is_empty()
    } else {
        world.destructible_remaining() == 0
    };
    if !cleared {
        return false;
    }

    let bonus = world.tuning.level_clear_bonus;
    world.award(bonus);
    world.enemies.clear();
    world.projectiles.clear();
    world.phase = GamePhase::LevelComplete;
    if !world.level_has_destructible {
        world.advance_timer = Countdown::new(world.tuning.auto_advance_delay);
    }
    world.emit(GameEvent::LevelComplete { level: world.level });
    log::info!("Level {} complete, score {}", world.level, world.score);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(mode: DifficultyMode) -> World {
        World::new(Tuning::default(), mode, 17)
    }

    #[test]
    fn test_spawn_interval_scaling() {
        let tuning = Tuning::default();
        assert_eq!(spawn_interval(&tuning.normal, 1), 12.0);
        assert!((spawn_interval(&tuning.normal, 3) - 10.4).abs() < 1e-5);
        assert_eq!(spawn_interval(&tuning.normal, 50), 5.0);
        assert!(spawn_interval(&tuning.hard, 1) < spawn_interval(&tuning.normal, 1));
    }

    #[test]
    fn test_speed_multiplier_caps() {
        let tuning = Tuning::default();
        assert_eq!(speed_multiplier(&tuning.normal, 1), 1.0);
        assert!((speed_multiplier(&tuning.normal, 3) - 1.1).abs() < 1e-5);
        assert_eq!(speed_multiplier(&tuning.normal, 100), 1.5);
        assert_eq!(speed_multiplier(&tuning.hard, 100), 1.75);
        assert!(speed_multiplier(&tuning.hard, 1) > speed_multiplier(&tuning.normal, 1));
    }

    #[test]
    fn test_brick_hits_scale_and_cap() {
        let table = Tuning::default().bricks;
        assert_eq!(brick_hits(&table, BrickClass::Normal, 0, 1, DifficultyMode::Normal), 1);
        assert_eq!(brick_hits(&table, BrickClass::Normal, 0, 5, DifficultyMode::Normal), 2);
        assert_eq!(brick_hits(&table, BrickClass::Normal, 3, 5, DifficultyMode::Normal), 1);
        assert_eq!(brick_hits(&table, BrickClass::Cracked, 0, 1, DifficultyMode::Hard), 3);
        assert_eq!(brick_hits(&table, BrickClass::Cracked, 0, 99, DifficultyMode::Hard), 4);
        assert_eq!(brick_hits(&table, BrickClass::Explosive, 0, 99, DifficultyMode::Hard), 1);
    }

    #[test]
    fn test_level_layout_ids_and_positions() {
        let w = world(DifficultyMode::Normal);
        assert_eq!(w.bricks.len(), 40);
        assert!(w.bricks.windows(2).all(|p| p[0].id < p[1].id));
        let first = &w.bricks[0];
        assert_eq!(first.rect.x, 32.0);
        assert_eq!(first.rect.y, BRICK_TOP_OFFSET);
        assert!(w.bricks.iter().all(|b| b.rect.right() <= CANVAS_WIDTH));
    }

    #[test]
    fn test_boss_level_has_boss_and_no_destructibles() {
        let mut w = world(DifficultyMode::Normal);
        start_level(&mut w, 5);
        assert!(w.boss_level);
        assert_eq!(w.bosses.len(), 1);
        assert!(!w.level_has_destructible);
        assert!(!check_level_complete(&mut w));
        w.bosses.clear();
        assert!(check_level_complete(&mut w));
        assert!(!w.advance_timer.is_done());
    }

    #[test]
    fn test_regular_level_waits_for_continue() {
        let mut w = world(DifficultyMode::Normal);
        for b in &mut w.bricks {
            if b.counts_for_clear() {
                b.visible = false;
                b.hits_remaining = 0;
            }
        }
        assert!(check_level_complete(&mut w));
        assert_eq!(w.phase, GamePhase::LevelComplete);
        assert!(w.advance_timer.is_done());
        assert_eq!(w.score, w.tuning.level_clear_bonus);
        advance_level(&mut w);
        assert_eq!(w.level, 2);
        assert_eq!(w.phase, GamePhase::Playing);
    }

    #[test]
    fn test_waiting_ball_keeps_stall_watch_fresh() {
        let mut w = world(DifficultyMode::Normal);
        w.time = 100.0;
        check_anti_stall(&mut w);
        assert_eq!(w.stall.last_paddle_touch, 100.0);
        assert!(!w.stall.deflected);
    }
}
