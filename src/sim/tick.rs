//! Simulation tick
//!
//! Core game loop that advances the world by one animation frame. Within a
//! playing tick the order is fixed: input, enemy movement, anti-stall,
//! collision resolution, spawn/despawn, boss reactions, then win/lose checks.

use super::boss;
use super::lifecycle;
use super::physics;
use super::powerups;
use super::progression;
use super::state::{GamePhase, World};
use crate::consts::*;

/// Decoded control signal for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Where the paddle center should head (canvas x)
    pub paddle_target_x: Option<f32>,
    /// Launch-angle adjustment, in steps (negative aims left)
    pub launch_angle_delta: f32,
    /// Launch waiting balls, or fire turrets once everything is in flight
    pub fire: bool,
    /// Pause toggle
    pub pause: bool,
    /// Continue from the level-complete screen
    pub advance: bool,
}

/// Advance the world by `dt` seconds (clamped to `MAX_TICK_DT`)
pub fn tick(world: &mut World, input: &TickInput, dt: f32) {
    // Toggling pause consumes the tick either way, so no timer moves
    if input.pause {
        match world.phase {
            GamePhase::Playing | GamePhase::Respawning | GamePhase::LevelComplete => {
                world.paused_from = Some(world.phase);
                world.phase = GamePhase::Paused;
                log::debug!("Paused at t={:.2}", world.time);
                return;
            }
            GamePhase::Paused => {
                world.phase = world.paused_from.take().unwrap_or(GamePhase::Playing);
                log::debug!("Resumed at t={:.2}", world.time);
                return;
            }
            GamePhase::GameOver => {}
        }
    }

    if matches!(world.phase, GamePhase::Paused | GamePhase::GameOver) {
        return;
    }

    let dt = dt.min(MAX_TICK_DT);
    if dt <= 0.0 {
        return;
    }
    let frames = dt / FRAME_DT;
    world.begin_tick();

    match world.phase {
        GamePhase::Respawning => {
            if world.respawn_timer.advance(dt) {
                lifecycle::respawn(world);
            }
        }
        GamePhase::LevelComplete => {
            if input.advance || world.advance_timer.advance(dt) {
                progression::advance_level(world);
            }
        }
        GamePhase::Playing => play(world, input, dt, frames),
        GamePhase::Paused | GamePhase::GameOver => {}
    }

    world.normalize_order();
    world.debug_check();
}

fn play(world: &mut World, input: &TickInput, dt: f32, frames: f32) {
    world.time += dt as f64;

    // Input
    if let Some(target) = input.paddle_target_x {
        world.paddle.move_toward(target, PADDLE_MAX_SPEED * frames);
    }
    if input.launch_angle_delta != 0.0 {
        let max = world.tuning.max_launch_angle_degrees.to_radians();
        let step = world.tuning.launch_angle_step_degrees.to_radians();
        world.launch_angle = (world.launch_angle + input.launch_angle_delta * step).clamp(-max, max);
    }
    for ball in world.balls.iter_mut().filter(|b| b.waiting_to_launch) {
        ball.rest_on(&world.paddle);
    }
    if input.fire {
        if world.balls.iter().any(|b| b.waiting_to_launch) {
            let angle = world.launch_angle;
            for ball in &mut world.balls {
                ball.launch(angle);
            }
            world.stall.touch(world.time);
        } else {
            powerups::fire_turrets(world);
        }
    }

    // Timed effects
    world.turret_cooldown.advance(dt);
    let expired = world.effects.advance(dt);
    powerups::expire_effects(world, expired);

    lifecycle::move_enemies(world, frames);
    progression::check_anti_stall(world);
    physics::resolve_balls(world, frames);
    physics::resolve_projectiles(world, frames);
    lifecycle::update(world, dt, frames);
    boss::update_bosses(world, dt, frames);

    if world.pending_life_loss || world.balls.is_empty() {
        lifecycle::lose_life(world);
        return;
    }
    progression::check_level_complete(world);
}

/// Demo player: tracks the most dangerous ball, grabs pickups when safe,
/// launches and fires whenever it can.
pub fn autopilot(world: &World) -> TickInput {
    let mut input = TickInput::default();
    match world.phase {
        GamePhase::Playing => {}
        GamePhase::LevelComplete => {
            input.advance = true;
            return input;
        }
        _ => return input,
    }

    let paddle_top = world.paddle.top();
    let threat = world
        .balls
        .iter()
        .filter(|b| b.in_flight() && b.vel.y > 0.0)
        .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y));

    let target = match threat {
        Some(ball) => {
            let t = ((paddle_top - ball.radius - ball.pos.y) / ball.vel.y).max(0.0);
            let x = fold_into_field(ball.pos.x + ball.vel.x * t, ball.radius);
            // Hit slightly off-center so rallies do not repeat forever
            x + if ball.id % 2 == 0 { 8.0 } else { -8.0 }
        }
        None => world
            .powerups
            .iter()
            .map(|p| p.pos)
            .chain(world.letters.iter().map(|l| l.pos))
            .max_by(|a, b| a.y.total_cmp(&b.y))
            .map(|p| p.x)
            .unwrap_or(CANVAS_WIDTH / 2.0),
    };
    input.paddle_target_x = Some(target);
    input.fire = world.balls.iter().any(|b| b.waiting_to_launch) || world.paddle.has_turrets();
    input
}

/// Unfold a straight-line x through wall bounces
fn fold_into_field(x: f32, radius: f32) -> f32 {
    let span = (CANVAS_WIDTH - 2.0 * radius).max(1.0);
    let u = (x - radius).rem_euclid(2.0 * span);
    radius + if u > span { 2.0 * span - u } else { u }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::{DifficultyMode, Tuning};

    fn world(seed: u64) -> World {
        World::new(Tuning::default(), DifficultyMode::Normal, seed)
    }

    #[test]
    fn test_tick_launch() {
        let mut w = world(12345);
        tick(&mut w, &TickInput::default(), FRAME_DT);
        assert!(w.balls[0].waiting_to_launch);

        let input = TickInput {
            fire: true,
            ..Default::default()
        };
        tick(&mut w, &input, FRAME_DT);
        assert!(w.balls[0].in_flight());
        assert!(w.balls[0].vel.y < 0.0);
    }

    #[test]
    fn test_tick_pause() {
        let mut w = world(12345);
        let input = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut w, &input, FRAME_DT);
        assert_eq!(w.phase, GamePhase::Paused);
        let t = w.time;
        tick(&mut w, &TickInput::default(), FRAME_DT);
        assert_eq!(w.time, t);

        tick(&mut w, &input, FRAME_DT);
        assert_eq!(w.phase, GamePhase::Playing);
    }

    #[test]
    fn test_waiting_ball_follows_paddle() {
        let mut w = world(1);
        let input = TickInput {
            paddle_target_x: Some(100.0),
            ..Default::default()
        };
        for _ in 0..60 {
            tick(&mut w, &input, FRAME_DT);
        }
        assert!((w.paddle.center_x() - 100.0).abs() < 1e-3);
        assert!((w.balls[0].pos.x - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_oversized_dt_is_clamped() {
        let mut w = world(1);
        tick(&mut w, &TickInput::default(), 5.0);
        assert!((w.time - MAX_TICK_DT as f64).abs() < 1e-6);
    }

    #[test]
    fn test_level_complete_waits_for_advance() {
        let mut w = world(2);
        for b in &mut w.bricks {
            b.visible = false;
            b.hits_remaining = 0;
        }
        tick(&mut w, &TickInput::default(), FRAME_DT);
        assert_eq!(w.phase, GamePhase::LevelComplete);
        for _ in 0..600 {
            tick(&mut w, &TickInput::default(), FRAME_DT);
        }
        assert_eq!(w.phase, GamePhase::LevelComplete);
        let go = TickInput {
            advance: true,
            ..Default::default()
        };
        tick(&mut w, &go, FRAME_DT);
        assert_eq!(w.level, 2);
        assert_eq!(w.phase, GamePhase::Playing);
    }

    #[test]
    fn test_fold_into_field() {
        assert_eq!(fold_into_field(400.0, 7.0), 400.0);
        assert!((fold_into_field(-13.0, 7.0) - 27.0).abs() < 1e-4);
        assert!((fold_into_field(813.0, 7.0) - 773.0).abs() < 1e-4);
    }

    #[test]
    fn test_determinism() {
        let mut a = world(99999);
        let mut b = world(99999);
        for _ in 0..1200 {
            let ia = autopilot(&a);
            let ib = autopilot(&b);
            tick(&mut a, &ia, FRAME_DT);
            tick(&mut b, &ib, FRAME_DT);
        }
        assert_eq!(a.score, b.score);
        assert_eq!(a.balls.len(), b.balls.len());
        assert_eq!(a.take_events(), b.take_events());
        assert!((a.paddle.x - b.paddle.x).abs() < 1e-6);
    }
}
