//! Boss encounter state machine
//!
//! A boss cycles `Idle -> Telegraphing -> Attacking -> Idle`. Crossing a
//! health threshold sends it `Angry` for a moment and shortens every later
//! cooldown. A stun wraps whatever state it was in and hands it back
//! untouched when the stun wears off. Damage arrives as `BossHit` events
//! raised by the resolver earlier in the same tick.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

use super::entities::{EnemyClass, ProjectileKind};
use super::events::GameEvent;
use super::geom::Rect;
use super::lifecycle;
use super::state::World;
use super::timer::Countdown;
use crate::consts::*;
use crate::tuning::BossTuning;

/// Attack patterns, unlocked by phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttackPattern {
    /// Aimed single shots
    Shot,
    /// Fast vertical beam
    Laser,
    /// Rotating ring
    Spiral,
    /// Alternating plus/diagonal bursts
    Cross,
    /// Ring plus aimed shot every volley
    Super,
}

const PHASE0_PATTERNS: &[AttackPattern] = &[AttackPattern::Shot, AttackPattern::Laser];
const PHASE1_PATTERNS: &[AttackPattern] = &[
    AttackPattern::Shot,
    AttackPattern::Laser,
    AttackPattern::Spiral,
    AttackPattern::Cross,
];
const PHASE2_PATTERNS: &[AttackPattern] = &[
    AttackPattern::Shot,
    AttackPattern::Laser,
    AttackPattern::Spiral,
    AttackPattern::Cross,
    AttackPattern::Super,
];

/// Patterns a boss may pick from
pub fn available_patterns(phase: u8, super_angry: bool) -> &'static [AttackPattern] {
    if super_angry || phase >= 2 {
        PHASE2_PATTERNS
    } else if phase == 1 {
        PHASE1_PATTERNS
    } else {
        PHASE0_PATTERNS
    }
}

/// Phase index for a health fraction given descending thresholds
pub fn phase_for_fraction(fraction: f32, thresholds: &[f32; 2]) -> u8 {
    if fraction <= thresholds[1] {
        2
    } else if fraction <= thresholds[0] {
        1
    } else {
        0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AttackState {
    Idle {
        cooldown: Countdown,
    },
    Telegraphing {
        pattern: AttackPattern,
        timer: Countdown,
    },
    Attacking {
        pattern: AttackPattern,
        timer: Countdown,
        volley: Countdown,
        volleys_fired: u32,
    },
    Stunned {
        timer: Countdown,
        resume: Box<AttackState>,
    },
    Angry {
        timer: Countdown,
    },
}

impl AttackState {
    pub fn name(&self) -> &'static str {
        match self {
            AttackState::Idle { .. } => "idle",
            AttackState::Telegraphing { .. } => "telegraphing",
            AttackState::Attacking { .. } => "attacking",
            AttackState::Stunned { .. } => "stunned",
            AttackState::Angry { .. } => "angry",
        }
    }

    /// The countdown driving this state
    pub fn countdown(&self) -> Option<&Countdown> {
        match self {
            AttackState::Idle { cooldown } => Some(cooldown),
            AttackState::Telegraphing { timer, .. }
            | AttackState::Attacking { timer, .. }
            | AttackState::Stunned { timer, .. }
            | AttackState::Angry { timer } => Some(timer),
        }
    }
}

/// Something the state machine did this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BossAction {
    Telegraph(AttackPattern),
    Attack(AttackPattern),
    Volley { pattern: AttackPattern, index: u32 },
}

/// Result of applying damage
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DamageOutcome {
    pub phase_changed: Option<u8>,
    pub turned_super_angry: bool,
    pub defeated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Boss {
    pub id: u32,
    /// Center
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    pub rotation: f32,
    pub health: f32,
    pub max_health: f32,
    /// 0 at full health, 1 below the first threshold, 2 below the second
    pub phase: u8,
    pub state: AttackState,
    pub minion_timer: Countdown,
    /// 0 for the original boss, 1 for resurrected children
    pub generation: u8,
    pub super_angry: bool,
    /// Ring rotation carried between spiral volleys
    pub spiral_offset: f32,
}

impl Boss {
    pub fn new(id: u32, pos: Vec2, size: Vec2, max_health: f32, generation: u8, tuning: &BossTuning) -> Self {
        let max_health = max_health.max(1.0);
        let mut boss = Self {
            id,
            pos,
            vel: Vec2::new(tuning.patrol_speed, 0.0),
            size,
            rotation: 0.0,
            health: max_health,
            max_health,
            phase: 0,
            state: AttackState::Idle {
                cooldown: Countdown::default(),
            },
            minion_timer: Countdown::default(),
            generation,
            super_angry: false,
            spiral_offset: 0.0,
        };
        boss.state = AttackState::Idle {
            cooldown: Countdown::new(boss.cooldown(tuning)),
        };
        boss.minion_timer = Countdown::new(boss.minion_interval(tuning));
        boss
    }

    pub fn rect(&self) -> Rect {
        Rect::centered(self.pos, self.size.x, self.size.y)
    }

    pub fn health_fraction(&self) -> f32 {
        self.health / self.max_health
    }

    pub fn is_stunned(&self) -> bool {
        matches!(self.state, AttackState::Stunned { .. })
    }

    /// Idle time between attacks for the current phase
    pub fn cooldown(&self, tuning: &BossTuning) -> f32 {
        let mut cooldown = tuning.attack_cooldown * tuning.phase_cadence[self.phase.min(2) as usize];
        if self.super_angry {
            cooldown *= tuning.super_angry_cadence;
        }
        cooldown
    }

    /// Seconds between minion summons for the current phase
    pub fn minion_interval(&self, tuning: &BossTuning) -> f32 {
        let mut interval =
            tuning.minion_interval * tuning.phase_minion_rate[self.phase.min(2) as usize];
        if self.super_angry {
            interval *= tuning.super_angry_cadence;
        }
        interval
    }

    /// Minion class summoned in the current phase
    pub fn minion_class(&self) -> EnemyClass {
        match self.phase {
            0 => EnemyClass::Cube,
            1 => EnemyClass::Sphere,
            _ => EnemyClass::Pyramid,
        }
    }

    /// Freeze attacks for `duration`; the interrupted state resumes afterwards
    pub fn stun(&mut self, duration: f32) {
        if let AttackState::Stunned { timer, .. } = &mut self.state {
            let longest = duration.max(timer.remaining);
            timer.restart(longest);
            return;
        }
        let interrupted = std::mem::replace(
            &mut self.state,
            AttackState::Idle {
                cooldown: Countdown::default(),
            },
        );
        self.state = AttackState::Stunned {
            timer: Countdown::new(duration),
            resume: Box::new(interrupted),
        };
    }

    /// Subtract health (clamped) and escalate on threshold crossings
    pub fn apply_damage(&mut self, amount: f32, tuning: &BossTuning) -> DamageOutcome {
        let mut outcome = DamageOutcome::default();
        self.health = (self.health - amount).clamp(0.0, self.max_health);
        if self.health <= 0.0 {
            outcome.defeated = true;
            return outcome;
        }

        let fraction = self.health_fraction();
        let phase = phase_for_fraction(fraction, &tuning.phase_thresholds);
        if phase > self.phase {
            self.phase = phase;
            outcome.phase_changed = Some(phase);
        }

        if self.generation > 0 && !self.super_angry && fraction <= tuning.super_angry_threshold {
            self.super_angry = true;
            outcome.turned_super_angry = true;
        }

        if outcome.phase_changed.is_some() || outcome.turned_super_angry {
            let interval = self.minion_interval(tuning);
            self.minion_timer.remaining = self.minion_timer.remaining.min(interval);
            self.minion_timer.duration = interval;

            let enrage = AttackState::Angry {
                timer: Countdown::new(tuning.angry_duration),
            };
            match &mut self.state {
                AttackState::Stunned { resume, .. } => **resume = enrage,
                state => *state = enrage,
            }
        }

        outcome
    }

    /// Horizontal patrol along the top of the arena
    pub fn patrol(&mut self, frames: f32) {
        if self.is_stunned() {
            return;
        }
        self.pos.x += self.vel.x * frames;
        self.rotation += 0.01 * frames;
        let half = self.size.x / 2.0;
        if self.pos.x - half < 0.0 {
            self.pos.x = half;
            self.vel.x = self.vel.x.abs();
        } else if self.pos.x + half > CANVAS_WIDTH {
            self.pos.x = CANVAS_WIDTH - half;
            self.vel.x = -self.vel.x.abs();
        }
    }

    /// Advance the attack state machine by `dt`
    pub fn step<R: Rng>(&mut self, dt: f32, tuning: &BossTuning, rng: &mut R) -> Vec<BossAction> {
        let mut actions = Vec::new();
        let cooldown = self.cooldown(tuning);

        let next = match &mut self.state {
            AttackState::Idle { cooldown: timer } => {
                if timer.advance(dt) {
                    let patterns = available_patterns(self.phase, self.super_angry);
                    let pattern = patterns[rng.random_range(0..patterns.len())];
                    actions.push(BossAction::Telegraph(pattern));
                    Some(AttackState::Telegraphing {
                        pattern,
                        timer: Countdown::new(tuning.telegraph_duration),
                    })
                } else {
                    None
                }
            }
            AttackState::Telegraphing { pattern, timer } => {
                if timer.advance(dt) {
                    let pattern = *pattern;
                    actions.push(BossAction::Attack(pattern));
                    actions.push(BossAction::Volley { pattern, index: 0 });
                    Some(AttackState::Attacking {
                        pattern,
                        timer: Countdown::new(tuning.attack_duration),
                        volley: Countdown::new(volley_interval(pattern, tuning)),
                        volleys_fired: 1,
                    })
                } else {
                    None
                }
            }
            AttackState::Attacking {
                pattern,
                timer,
                volley,
                volleys_fired,
            } => {
                let done = timer.advance(dt);
                if !done && volley.advance(dt) {
                    actions.push(BossAction::Volley {
                        pattern: *pattern,
                        index: *volleys_fired,
                    });
                    *volleys_fired += 1;
                    volley.restart(volley_interval(*pattern, tuning));
                }
                done.then(|| AttackState::Idle {
                    cooldown: Countdown::new(cooldown),
                })
            }
            AttackState::Stunned { timer, resume } => {
                if timer.advance(dt) {
                    Some((**resume).clone())
                } else {
                    None
                }
            }
            AttackState::Angry { timer } => timer.advance(dt).then(|| AttackState::Idle {
                cooldown: Countdown::new(cooldown),
            }),
        };

        if let Some(state) = next {
            self.state = state;
        }
        actions
    }

    /// Projectiles for one volley: (kind, position, velocity)
    pub fn volley(
        &mut self,
        pattern: AttackPattern,
        index: u32,
        target: Vec2,
        tuning: &BossTuning,
    ) -> Vec<(ProjectileKind, Vec2, Vec2)> {
        let origin = Vec2::new(self.pos.x, self.pos.y + self.size.y / 2.0);
        let speed = if self.super_angry {
            tuning.projectile_speed * 1.25
        } else {
            tuning.projectile_speed
        };

        let aimed = || {
            let dir = (target - origin).normalize_or_zero();
            let dir = if dir == Vec2::ZERO { Vec2::Y } else { dir };
            (ProjectileKind::BossShot, origin, dir * speed)
        };

        match pattern {
            AttackPattern::Shot => vec![aimed()],
            AttackPattern::Laser => vec![(
                ProjectileKind::Laser,
                origin + Vec2::new(0.0, ProjectileKind::Laser.size().y / 2.0),
                Vec2::new(0.0, speed * 2.0),
            )],
            AttackPattern::Spiral => self.ring(origin, speed, tuning.ring_count),
            AttackPattern::Cross => {
                let dirs: [Vec2; 4] = if index % 2 == 0 {
                    [Vec2::Y, Vec2::X, -Vec2::X, -Vec2::Y]
                } else {
                    let d = std::f32::consts::FRAC_1_SQRT_2;
                    [
                        Vec2::new(d, d),
                        Vec2::new(-d, d),
                        Vec2::new(d, -d),
                        Vec2::new(-d, -d),
                    ]
                };
                dirs.iter()
                    .map(|d| (ProjectileKind::BossShot, origin, *d * speed))
                    .collect()
            }
            AttackPattern::Super => {
                let mut shots = self.ring(origin, speed, tuning.ring_count);
                shots.push(aimed());
                shots
            }
        }
    }

    fn ring(&mut self, origin: Vec2, speed: f32, count: u32) -> Vec<(ProjectileKind, Vec2, Vec2)> {
        let count = count.max(1);
        let shots = (0..count)
            .map(|i| {
                let angle = self.spiral_offset + i as f32 * TAU / count as f32;
                let dir = Vec2::new(angle.cos(), angle.sin());
                (ProjectileKind::BossShot, origin, dir * speed)
            })
            .collect();
        self.spiral_offset = (self.spiral_offset + 0.35) % TAU;
        shots
    }
}

fn volley_interval(pattern: AttackPattern, tuning: &BossTuning) -> f32 {
    match pattern {
        AttackPattern::Shot => tuning.volley_interval,
        // One beam per attack
        AttackPattern::Laser => tuning.attack_duration * 2.0,
        AttackPattern::Spiral => tuning.volley_interval * 0.5,
        AttackPattern::Cross => tuning.volley_interval * 2.0,
        AttackPattern::Super => tuning.volley_interval,
    }
}

/// Place the level's boss at the top of the arena
pub fn spawn_boss(world: &mut World) {
    let tuning = &world.tuning.boss;
    let max_health = tuning.base_health + tuning.health_per_encounter * world.boss_encounters as f32;
    let size = Vec2::new(tuning.width, tuning.height);
    let pos = Vec2::new(CANVAS_WIDTH / 2.0, BRICK_TOP_OFFSET + size.y);
    let id = world.next_boss_id();
    let boss = Boss::new(id, pos, size, max_health, 0, &world.tuning.boss);
    world.boss_encounters += 1;
    world.bosses.push(boss);
    world.emit(GameEvent::BossSpawned { boss_id: id });
    log::info!("Boss {} spawned with {} HP", id, max_health);
}

/// React to this tick's damage, then run every boss's state machine.
/// Runs after the resolver and lifecycle passes.
pub fn update_bosses(world: &mut World, dt: f32, frames: f32) {
    if world.bosses.is_empty() {
        return;
    }
    let tuning = world.tuning.boss.clone();

    let hits: Vec<(u32, f32)> = world
        .tick_events()
        .iter()
        .filter_map(|e| match e {
            GameEvent::BossHit { boss_id, damage } => Some((*boss_id, *damage)),
            _ => None,
        })
        .collect();

    let mut raised = Vec::new();
    let mut defeated: Vec<u32> = Vec::new();
    let mut summons: Vec<(u32, EnemyClass, Vec2)> = Vec::new();

    for (boss_id, damage) in hits {
        if defeated.contains(&boss_id) {
            continue;
        }
        let Some(boss) = world.bosses.iter_mut().find(|b| b.id == boss_id) else {
            continue;
        };
        let outcome = boss.apply_damage(damage, &tuning);
        if let Some(phase) = outcome.phase_changed {
            log::info!("Boss {} enters phase {}", boss.id, phase);
            raised.push(GameEvent::BossPhaseChanged {
                boss_id: boss.id,
                phase,
            });
            summons.push((boss.id, boss.minion_class(), boss.pos));
        }
        if outcome.turned_super_angry {
            log::info!("Boss {} is super angry", boss.id);
        }
        if outcome.defeated {
            defeated.push(boss_id);
        }
    }

    let target = Vec2::new(world.paddle.center_x(), world.paddle.top());
    let mut shots: Vec<(u32, ProjectileKind, Vec2, Vec2)> = Vec::new();

    for boss in world.bosses.iter_mut() {
        if defeated.contains(&boss.id) {
            continue;
        }
        boss.patrol(frames);

        if !boss.is_stunned() && boss.minion_timer.advance(dt) {
            summons.push((boss.id, boss.minion_class(), boss.pos));
            boss.minion_timer.restart(boss.minion_interval(&tuning));
        }

        for action in boss.step(dt, &tuning, &mut world.rng) {
            match action {
                BossAction::Telegraph(pattern) => raised.push(GameEvent::BossTelegraph {
                    boss_id: boss.id,
                    pattern,
                }),
                BossAction::Attack(pattern) => raised.push(GameEvent::BossAttack {
                    boss_id: boss.id,
                    pattern,
                }),
                BossAction::Volley { pattern, index } => {
                    for (kind, pos, vel) in boss.volley(pattern, index, target, &tuning) {
                        shots.push((boss.id, kind, pos, vel));
                    }
                }
            }
        }
    }

    for event in raised {
        world.emit(event);
    }
    for (owner, kind, pos, vel) in shots {
        lifecycle::spawn_projectile(world, kind, pos, vel, Some(owner));
    }
    for (boss_id, class, pos) in summons {
        if world.minion_count(boss_id) < tuning.max_minions {
            let spawn_at = pos + Vec2::new(0.0, tuning.height * 0.5 + 20.0);
            lifecycle::spawn_enemy(world, class, spawn_at, Some(boss_id));
        }
    }

    for boss_id in defeated {
        defeat_boss(world, boss_id);
    }
}

/// Remove a beaten boss, possibly replacing it with smaller children
fn defeat_boss(world: &mut World, boss_id: u32) {
    let Some(index) = world.bosses.iter().position(|b| b.id == boss_id) else {
        return;
    };
    let boss = world.bosses.remove(index);
    let tuning = world.tuning.boss.clone();

    let children = if boss.generation == 0 && world.level >= tuning.resurrection_min_level {
        world
            .rng
            .random_range(tuning.resurrection_children_min..=tuning.resurrection_children_max)
    } else {
        0
    };

    world.award(tuning.defeat_points / (boss.generation as u64 + 1));
    world.achievements.bosses_defeated += 1;
    world.emit(GameEvent::BossDefeated { boss_id, children });
    world.emit(GameEvent::Explosion {
        pos: boss.pos,
        radius: boss.size.x,
    });
    log::info!("Boss {} defeated, {} children", boss_id, children);

    let child_size = boss.size * tuning.child_scale;
    let child_health = boss.max_health * tuning.child_health_fraction;
    let spacing = child_size.x + 20.0;
    for i in 0..children {
        let offset = (i as f32 - (children as f32 - 1.0) / 2.0) * spacing;
        let half = child_size.x / 2.0;
        let x = (boss.pos.x + offset).clamp(half, CANVAS_WIDTH - half);
        let id = world.next_boss_id();
        let mut child = Boss::new(
            id,
            Vec2::new(x, boss.pos.y),
            child_size,
            child_health,
            boss.generation + 1,
            &tuning,
        );
        if i % 2 == 1 {
            child.vel.x = -child.vel.x;
        }
        world.bosses.push(child);
        world.emit(GameEvent::BossSpawned { boss_id: id });
    }
}
