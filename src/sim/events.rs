//! Discrete game events
//!
//! Detection code never reaches into the systems that react to a contact.
//! It pushes a typed event; lifecycle, boss and UI/audio consumers read the
//! per-tick event list after the resolver has finished.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::boss::AttackPattern;
use super::entities::{EnemyClass, PowerUpKind};
use crate::tuning::DifficultyMode;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    ScoreDelta { points: u64, total: u64 },
    BrickHit { brick_id: u32, hits_remaining: u8 },
    BrickDestroyed { brick_id: u32, pos: Vec2, by_blast: bool },
    Explosion { pos: Vec2, radius: f32 },
    EnemyHit { enemy_id: u32, hits_taken: u8 },
    EnemyDestroyed { enemy_id: u32, class: EnemyClass, pos: Vec2 },
    PaddleHit { ball_id: u32 },
    PaddleHitShield,
    PaddleStruck { projectile_id: u32 },
    BallLost { ball_id: u32 },
    LifeLost { lives_left: u8 },
    PowerUpSpawned { powerup_id: u32, kind: PowerUpKind },
    PowerUpGranted { kind: PowerUpKind },
    LetterSpawned { letter: char },
    LetterCollected { letter: char },
    AllLettersCollected,
    AntiStallDeflect { ball_id: u32 },
    Kamikaze { enemy_id: u32 },
    BossSpawned { boss_id: u32 },
    BossHit { boss_id: u32, damage: f32 },
    BossPhaseChanged { boss_id: u32, phase: u8 },
    BossTelegraph { boss_id: u32, pattern: AttackPattern },
    BossAttack { boss_id: u32, pattern: AttackPattern },
    BossStunned { boss_id: u32 },
    BossDefeated { boss_id: u32, children: u32 },
    LevelStarted { level: u32 },
    LevelComplete { level: u32 },
    GameOver { summary: RunSummary },
    HighScoreEligible { score: u64 },
}

/// Special achievements carried into the run summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Achievements {
    pub all_letters: bool,
    pub bosses_defeated: u32,
    pub max_combo: u32,
}

/// Final numbers handed to the leaderboard submission flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub score: u64,
    pub level_reached: u32,
    pub difficulty: DifficultyMode,
    pub achievements: Achievements,
}
