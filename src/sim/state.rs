//! World state store
//!
//! The single authoritative, mutable snapshot of every entity for the current
//! tick. It holds no gameplay logic: systems read and write the collections
//! directly, allocate ids through it, and report what happened through
//! `emit`. Access is single-threaded; collections are kept sorted by id so
//! iteration order is stable.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::boss::Boss;
use super::entities::{Ball, BonusLetter, Brick, Enemy, Paddle, PowerUp, Projectile};
use super::events::{Achievements, GameEvent, RunSummary};
use super::progression;
use super::timer::{Countdown, TimerEntry};
use crate::tuning::{DifficultyMode, DifficultyParams, Tuning};

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    /// Active gameplay (balls may still be resting on the paddle)
    Playing,
    /// Everything frozen; resumes into the phase it was paused from
    Paused,
    /// Life lost, waiting for the respawn countdown
    Respawning,
    /// Level cleared, waiting for continue (or the auto-advance countdown)
    LevelComplete,
    /// Run ended
    GameOver,
}

/// Timed power-up effects
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActiveEffects {
    pub fireball: Countdown,
    pub wide: Countdown,
    pub homing: Countdown,
}

/// Which effects ran out this tick
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpiredEffects {
    pub fireball: bool,
    pub wide: bool,
    pub homing: bool,
}

impl ActiveEffects {
    pub fn advance(&mut self, dt: f32) -> ExpiredEffects {
        ExpiredEffects {
            fireball: self.fireball.advance(dt),
            wide: self.wide.advance(dt),
            homing: self.homing.advance(dt),
        }
    }
}

/// Bookkeeping for the anti-stall rule
#[derive(Debug, Clone, Default, Serialize)]
pub struct StallWatch {
    /// Sim time of the last paddle contact (or launch)
    pub last_paddle_touch: f64,
    pub deflected: bool,
    pub kamikaze_sent: bool,
}

impl StallWatch {
    pub fn touch(&mut self, now: f64) {
        self.last_paddle_touch = now;
        self.deflected = false;
        self.kamikaze_sent = false;
    }
}

/// Per-class id counters; ids are never reused within a run
#[derive(Debug, Clone, Default)]
struct IdCounters {
    ball: u32,
    brick: u32,
    enemy: u32,
    projectile: u32,
    powerup: u32,
    letter: u32,
    boss: u32,
}

fn bump(counter: &mut u32) -> u32 {
    *counter += 1;
    *counter
}

/// The world store
#[derive(Debug, Clone)]
pub struct World {
    pub tuning: Tuning,
    pub mode: DifficultyMode,
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,

    /// Current level (1-based)
    pub level: u32,
    pub boss_level: bool,
    /// Whether the level started with any destructible brick
    pub level_has_destructible: bool,
    pub lives: u8,
    pub score: u64,
    /// Destructions since the last paddle touch
    pub combo: u32,
    /// Simulation clock in seconds; only advances while playing
    pub time: f64,
    pub phase: GamePhase,
    /// Phase to return to when unpausing
    pub paused_from: Option<GamePhase>,

    pub paddle: Paddle,
    pub balls: Vec<Ball>,
    pub bricks: Vec<Brick>,
    pub enemies: Vec<Enemy>,
    pub projectiles: Vec<Projectile>,
    pub powerups: Vec<PowerUp>,
    pub letters: Vec<BonusLetter>,
    pub bosses: Vec<Boss>,

    pub effects: ActiveEffects,
    /// Aim for the next launch, radians from vertical
    pub launch_angle: f32,
    /// Level speed multiplier applied to every ball
    pub speed_multiplier: f32,

    pub enemy_spawn_timer: Countdown,
    pub turret_cooldown: Countdown,
    pub respawn_timer: Countdown,
    pub advance_timer: Countdown,
    pub stall: StallWatch,

    /// Enemies destroyed this run (guaranteed drop cadence)
    pub enemy_kills: u32,
    pub collected_letters: Vec<char>,
    /// A letter already dropped on this level
    pub letter_dropped: bool,
    pub achievements: Achievements,
    /// Bosses met so far (boss health scaling)
    pub boss_encounters: u32,
    /// Lowest score on the external leaderboard
    pub leaderboard_floor: u64,
    /// Set by the resolver when an unshielded projectile reaches the paddle
    pub pending_life_loss: bool,

    /// Events not yet drained by the host
    pub events: Vec<GameEvent>,
    /// Index into `events` where the current tick began
    pub(crate) tick_event_start: usize,
    ids: IdCounters,
}

impl World {
    /// Create a world and start level 1
    pub fn new(tuning: Tuning, mode: DifficultyMode, seed: u64) -> Self {
        let lives = tuning.difficulty(mode).starting_lives;
        let paddle = Paddle::new(tuning.paddle_width, tuning.paddle_height);
        let mut world = Self {
            tuning,
            mode,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            level: 1,
            boss_level: false,
            level_has_destructible: true,
            lives,
            score: 0,
            combo: 0,
            time: 0.0,
            phase: GamePhase::Playing,
            paused_from: None,
            paddle,
            balls: Vec::new(),
            bricks: Vec::new(),
            enemies: Vec::new(),
            projectiles: Vec::new(),
            powerups: Vec::new(),
            letters: Vec::new(),
            bosses: Vec::new(),
            effects: ActiveEffects::default(),
            launch_angle: 0.0,
            speed_multiplier: 1.0,
            enemy_spawn_timer: Countdown::default(),
            turret_cooldown: Countdown::default(),
            respawn_timer: Countdown::default(),
            advance_timer: Countdown::default(),
            stall: StallWatch::default(),
            enemy_kills: 0,
            collected_letters: Vec::new(),
            letter_dropped: false,
            achievements: Achievements::default(),
            boss_encounters: 0,
            leaderboard_floor: 0,
            pending_life_loss: false,
            events: Vec::new(),
            tick_event_start: 0,
            ids: IdCounters::default(),
        };

        progression::start_level(&mut world, 1);
        world
    }

    /// Tear everything down and start a fresh run with the same settings
    pub fn reset(&mut self) {
        let floor = self.leaderboard_floor;
        *self = World::new(self.tuning.clone(), self.mode, self.seed);
        self.leaderboard_floor = floor;
        log::info!("World reset (seed {})", self.seed);
    }

    pub fn difficulty(&self) -> &DifficultyParams {
        self.tuning.difficulty(self.mode)
    }

    // === Id allocation ===

    pub fn next_ball_id(&mut self) -> u32 {
        bump(&mut self.ids.ball)
    }

    pub fn next_brick_id(&mut self) -> u32 {
        bump(&mut self.ids.brick)
    }

    pub fn next_enemy_id(&mut self) -> u32 {
        bump(&mut self.ids.enemy)
    }

    pub fn next_projectile_id(&mut self) -> u32 {
        bump(&mut self.ids.projectile)
    }

    pub fn next_powerup_id(&mut self) -> u32 {
        bump(&mut self.ids.powerup)
    }

    pub fn next_letter_id(&mut self) -> u32 {
        bump(&mut self.ids.letter)
    }

    pub fn next_boss_id(&mut self) -> u32 {
        bump(&mut self.ids.boss)
    }

    // === Events ===

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Events raised since the current tick began
    pub fn tick_events(&self) -> &[GameEvent] {
        &self.events[self.tick_event_start.min(self.events.len())..]
    }

    /// Drain every pending event (host side)
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        self.tick_event_start = 0;
        std::mem::take(&mut self.events)
    }

    pub(crate) fn begin_tick(&mut self) {
        self.tick_event_start = self.events.len();
    }

    /// Add to the score and report the delta
    pub fn award(&mut self, points: u64) {
        if points == 0 {
            return;
        }
        self.score += points;
        self.emit(GameEvent::ScoreDelta {
            points,
            total: self.score,
        });
    }

    /// Count a destruction toward the combo
    pub fn bump_combo(&mut self) {
        self.combo += 1;
        self.achievements.max_combo = self.achievements.max_combo.max(self.combo);
    }

    // === Queries ===

    /// Speed every ball is held at before per-brick bonuses
    pub fn level_ball_speed(&self) -> f32 {
        self.tuning.ball_base_speed * self.speed_multiplier
    }

    pub fn destructible_remaining(&self) -> usize {
        self.bricks
            .iter()
            .filter(|b| b.visible && b.counts_for_clear())
            .count()
    }

    pub fn ball_in_flight(&self) -> bool {
        self.balls.iter().any(|b| b.in_flight())
    }

    pub fn minion_count(&self, boss_id: u32) -> usize {
        self.enemies
            .iter()
            .filter(|e| e.minion_of == Some(boss_id))
            .count()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            score: self.score,
            level_reached: self.level,
            difficulty: self.mode,
            achievements: self.achievements.clone(),
        }
    }

    /// Keep collections sorted by id for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.balls.sort_by_key(|b| b.id);
        self.bricks.sort_by_key(|b| b.id);
        self.enemies.sort_by_key(|e| e.id);
        self.projectiles.sort_by_key(|p| p.id);
        self.powerups.sort_by_key(|p| p.id);
        self.letters.sort_by_key(|l| l.id);
        self.bosses.sort_by_key(|b| b.id);
    }

    /// Every live countdown with its remaining seconds
    pub fn timer_report(&self) -> Vec<TimerEntry> {
        let mut report = Vec::new();
        let mut push = |label: String, c: &Countdown| {
            report.push(TimerEntry {
                label,
                remaining: c.remaining,
            })
        };

        push("enemy_spawn".into(), &self.enemy_spawn_timer);
        push("turret_cooldown".into(), &self.turret_cooldown);
        push("respawn".into(), &self.respawn_timer);
        push("advance".into(), &self.advance_timer);
        push("effect.fireball".into(), &self.effects.fireball);
        push("effect.wide".into(), &self.effects.wide);
        push("effect.homing".into(), &self.effects.homing);
        for enemy in &self.enemies {
            push(format!("enemy.{}.drop", enemy.id), &enemy.drop_timer);
        }
        for boss in &self.bosses {
            push(format!("boss.{}.minion", boss.id), &boss.minion_timer);
            if let Some(c) = boss.state.countdown() {
                push(format!("boss.{}.{}", boss.id, boss.state.name()), c);
            }
        }
        report
    }

    /// Describe every broken invariant (empty when healthy)
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for brick in &self.bricks {
            if brick.hits_remaining > brick.max_hits {
                problems.push(format!(
                    "brick {} has {} hits left of {}",
                    brick.id, brick.hits_remaining, brick.max_hits
                ));
            }
            if brick.visible && !brick.indestructible && brick.hits_remaining == 0 {
                problems.push(format!("brick {} is visible with no hits left", brick.id));
            }
        }

        if self.paddle.width < 0.0 || self.paddle.height < 0.0 {
            problems.push("paddle has negative dimensions".into());
        }

        for boss in &self.bosses {
            if !(0.0..=boss.max_health).contains(&boss.health) {
                problems.push(format!(
                    "boss {} health {} outside [0, {}]",
                    boss.id, boss.health, boss.max_health
                ));
            }
        }

        fn strictly_increasing(ids: impl Iterator<Item = u32>) -> bool {
            let mut last = None;
            for id in ids {
                if last.is_some_and(|l| id <= l) {
                    return false;
                }
                last = Some(id);
            }
            true
        }

        let checks = [
            ("ball", strictly_increasing(self.balls.iter().map(|b| b.id))),
            ("brick", strictly_increasing(self.bricks.iter().map(|b| b.id))),
            ("enemy", strictly_increasing(self.enemies.iter().map(|e| e.id))),
            (
                "projectile",
                strictly_increasing(self.projectiles.iter().map(|p| p.id)),
            ),
            ("powerup", strictly_increasing(self.powerups.iter().map(|p| p.id))),
            ("letter", strictly_increasing(self.letters.iter().map(|l| l.id))),
            ("boss", strictly_increasing(self.bosses.iter().map(|b| b.id))),
        ];
        for (class, ok) in checks {
            if !ok {
                problems.push(format!("duplicate or unordered {class} ids"));
            }
        }

        problems
    }

    /// Panic in debug builds if an invariant is broken; release builds log it
    pub fn debug_check(&self) {
        let problems = self.invariant_violations();
        debug_assert!(problems.is_empty(), "world invariants broken: {problems:?}");
        if !problems.is_empty() {
            log::warn!("World invariants broken at t={:.2}: {:?}", self.time, problems);
        }
    }

    /// Read-only view for the rendering layer
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            level: self.level,
            lives: self.lives,
            score: self.score,
            combo: self.combo,
            speed_multiplier: self.speed_multiplier,
            launch_angle: self.launch_angle,
            paddle: self.paddle.clone(),
            balls: self.balls.clone(),
            bricks: self.bricks.iter().filter(|b| b.visible).cloned().collect(),
            enemies: self.enemies.clone(),
            projectiles: self.projectiles.clone(),
            powerups: self.powerups.clone(),
            letters: self.letters.clone(),
            bosses: self.bosses.clone(),
            collected_letters: self.collected_letters.clone(),
        }
    }
}

/// Renderable snapshot of one tick
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub phase: GamePhase,
    pub level: u32,
    pub lives: u8,
    pub score: u64,
    pub combo: u32,
    pub speed_multiplier: f32,
    pub launch_angle: f32,
    pub paddle: Paddle,
    pub balls: Vec<Ball>,
    /// Visible bricks only
    pub bricks: Vec<Brick>,
    pub enemies: Vec<Enemy>,
    pub projectiles: Vec<Projectile>,
    pub powerups: Vec<PowerUp>,
    pub letters: Vec<BonusLetter>,
    pub bosses: Vec<Boss>,
    pub collected_letters: Vec<char>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_world_starts_level_one() {
        let world = World::new(Tuning::default(), DifficultyMode::Normal, 42);
        assert_eq!(world.level, 1);
        assert_eq!(world.phase, GamePhase::Playing);
        assert_eq!(world.balls.len(), 1);
        assert!(world.balls[0].waiting_to_launch);
        assert!(world.destructible_remaining() > 0);
        assert!(world.invariant_violations().is_empty());
    }

    #[test]
    fn test_ids_unique_per_class() {
        let mut world = World::new(Tuning::default(), DifficultyMode::Normal, 1);
        let a = world.next_enemy_id();
        let b = world.next_enemy_id();
        assert_ne!(a, b);
        // Separate counters per class
        let p = world.next_powerup_id();
        assert_eq!(p, 1);
    }

    #[test]
    fn test_award_emits_delta() {
        let mut world = World::new(Tuning::default(), DifficultyMode::Normal, 1);
        world.take_events();
        world.award(120);
        world.award(0);
        let events = world.take_events();
        assert_eq!(
            events,
            vec![GameEvent::ScoreDelta {
                points: 120,
                total: 120
            }]
        );
    }

    #[test]
    fn test_invariant_violation_detected() {
        let mut world = World::new(Tuning::default(), DifficultyMode::Normal, 1);
        world.bricks[0].hits_remaining = world.bricks[0].max_hits + 1;
        assert!(!world.invariant_violations().is_empty());
    }

    #[test]
    fn test_reset_restores_fresh_run() {
        let mut world = World::new(Tuning::default(), DifficultyMode::Hard, 9);
        world.leaderboard_floor = 1000;
        world.score = 777;
        world.level = 4;
        world.reset();
        assert_eq!(world.score, 0);
        assert_eq!(world.level, 1);
        assert_eq!(world.mode, DifficultyMode::Hard);
        assert_eq!(world.leaderboard_floor, 1000);
    }

    #[test]
    fn test_snapshot_hides_destroyed_bricks() {
        let mut world = World::new(Tuning::default(), DifficultyMode::Normal, 1);
        let total = world.bricks.iter().filter(|b| b.visible).count();
        world.bricks[0].visible = false;
        world.bricks[0].hits_remaining = 0;
        let snap = world.snapshot();
        assert_eq!(snap.bricks.len(), total - 1);
        assert!(serde_json::to_string(&snap).is_ok());
    }
}
