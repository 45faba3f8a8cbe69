//! Data-driven game balance
//!
//! Every number the simulation consults lives here so difficulty can be
//! rebalanced from a JSON file without touching code. Missing fields fall
//! back to the defaults below.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Session difficulty, fixed when the run starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DifficultyMode {
    #[default]
    Normal,
    Hard,
}

impl DifficultyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyMode::Normal => "Normal",
            DifficultyMode::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Some(DifficultyMode::Normal),
            "hard" => Some(DifficultyMode::Hard),
            _ => None,
        }
    }
}

/// Per-difficulty modifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyParams {
    /// Enemy spawn interval at level 1 (seconds)
    pub enemy_base_interval: f32,
    /// Enemy spawn interval floor (seconds)
    pub enemy_min_interval: f32,
    /// Seconds shaved off the spawn interval per level
    pub enemy_interval_decay: f32,
    /// Ball speed multiplier at level 1
    pub speed_base: f32,
    /// Ball speed multiplier cap
    pub speed_cap: f32,
    /// Multiplier growth per level
    pub speed_per_level: f32,
    /// Lives at run start
    pub starting_lives: u8,
    /// Chance a destroyed brick drops a power-up
    pub powerup_drop_chance: f32,
}

impl DifficultyParams {
    fn normal() -> Self {
        Self {
            enemy_base_interval: 12.0,
            enemy_min_interval: 5.0,
            enemy_interval_decay: 0.8,
            speed_base: 1.0,
            speed_cap: 1.5,
            speed_per_level: 0.05,
            starting_lives: 3,
            powerup_drop_chance: 0.12,
        }
    }

    fn hard() -> Self {
        Self {
            enemy_base_interval: 9.0,
            enemy_min_interval: 3.0,
            enemy_interval_decay: 1.0,
            speed_base: 1.15,
            speed_cap: 1.75,
            speed_per_level: 0.05,
            starting_lives: 3,
            powerup_drop_chance: 0.09,
        }
    }
}

impl Default for DifficultyParams {
    fn default() -> Self {
        Self::normal()
    }
}

/// Damage thresholds and scoring for one enemy class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyParams {
    /// Hits needed to destroy
    pub hits_to_destroy: u8,
    /// Hit count at which the enemy turns angry (0 = never)
    pub angry_after: u8,
    /// Speed multiplier applied when turning angry
    pub angry_speed_mult: f32,
    /// Score for destroying it
    pub points: u64,
    /// Movement speed (px per frame)
    pub base_speed: f32,
    /// Edge length of its bounding square
    pub size: f32,
    /// First level this class may spawn on
    pub unlock_level: u32,
    /// Relative spawn weight once unlocked
    pub spawn_weight: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTable {
    pub cube: EnemyParams,
    pub sphere: EnemyParams,
    pub pyramid: EnemyParams,
}

impl Default for EnemyTable {
    fn default() -> Self {
        Self {
            cube: EnemyParams {
                hits_to_destroy: 1,
                angry_after: 0,
                angry_speed_mult: 1.0,
                points: 100,
                base_speed: 1.5,
                size: 26.0,
                unlock_level: 1,
                spawn_weight: 6,
            },
            sphere: EnemyParams {
                hits_to_destroy: 2,
                angry_after: 1,
                angry_speed_mult: 1.3,
                points: 200,
                base_speed: 1.7,
                size: 28.0,
                unlock_level: 3,
                spawn_weight: 3,
            },
            pyramid: EnemyParams {
                hits_to_destroy: 3,
                angry_after: 2,
                angry_speed_mult: 1.5,
                points: 300,
                base_speed: 1.4,
                size: 30.0,
                unlock_level: 5,
                spawn_weight: 2,
            },
        }
    }
}

/// Scoring and durability for one brick class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrickParams {
    pub points: u64,
    /// Hits at level 1 before level scaling
    pub base_hits: u8,
    /// Never destroyed by direct hits
    pub indestructible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrickTable {
    pub normal: BrickParams,
    pub cracked: BrickParams,
    pub explosive: BrickParams,
    pub metal: BrickParams,
    /// Highest hit count level scaling may give a brick
    pub max_hits_cap: u8,
    /// Every this many levels, multi-hit rows gain one hit
    pub levels_per_extra_hit: u32,
}

impl Default for BrickTable {
    fn default() -> Self {
        Self {
            normal: BrickParams {
                points: 50,
                base_hits: 1,
                indestructible: false,
            },
            cracked: BrickParams {
                points: 80,
                base_hits: 2,
                indestructible: false,
            },
            explosive: BrickParams {
                points: 60,
                base_hits: 1,
                indestructible: false,
            },
            metal: BrickParams {
                points: 0,
                base_hits: 1,
                indestructible: true,
            },
            max_hits_cap: 4,
            levels_per_extra_hit: 4,
        }
    }
}

/// Boss encounter tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BossTuning {
    /// Every Nth level is a boss level
    pub level_interval: u32,
    pub base_health: f32,
    /// Extra health per previous boss encounter
    pub health_per_encounter: f32,
    pub width: f32,
    pub height: f32,
    /// Horizontal patrol speed (px per frame)
    pub patrol_speed: f32,
    pub ball_damage: f32,
    pub fireball_damage: f32,
    pub turret_damage: f32,
    /// Idle time between attacks at full health (seconds)
    pub attack_cooldown: f32,
    pub telegraph_duration: f32,
    pub attack_duration: f32,
    /// Seconds between projectile volleys while attacking
    pub volley_interval: f32,
    /// Health fractions at which the boss enters its next phase
    pub phase_thresholds: [f32; 2],
    /// Cooldown multiplier for phases 0, 1, 2
    pub phase_cadence: [f32; 3],
    pub minion_interval: f32,
    /// Minion interval multiplier for phases 0, 1, 2
    pub phase_minion_rate: [f32; 3],
    pub max_minions: usize,
    /// Enrage pause after crossing a phase threshold
    pub angry_duration: f32,
    pub projectile_speed: f32,
    /// Projectiles per spiral/super ring
    pub ring_count: u32,
    /// First level whose boss resurrects when defeated
    pub resurrection_min_level: u32,
    pub resurrection_children_min: u32,
    pub resurrection_children_max: u32,
    /// Child max health as a fraction of the parent's
    pub child_health_fraction: f32,
    pub child_scale: f32,
    /// Health fraction below which a child turns super angry
    pub super_angry_threshold: f32,
    /// Cooldown multiplier while super angry
    pub super_angry_cadence: f32,
    pub defeat_points: u64,
}

impl Default for BossTuning {
    fn default() -> Self {
        Self {
            level_interval: 5,
            base_health: 30.0,
            health_per_encounter: 10.0,
            width: 120.0,
            height: 60.0,
            patrol_speed: 1.2,
            ball_damage: 1.0,
            fireball_damage: 2.0,
            turret_damage: 0.5,
            attack_cooldown: 2.5,
            telegraph_duration: 0.8,
            attack_duration: 1.2,
            volley_interval: 0.3,
            phase_thresholds: [0.5, 0.25],
            phase_cadence: [1.0, 0.7, 0.5],
            minion_interval: 8.0,
            phase_minion_rate: [1.0, 0.6, 0.4],
            max_minions: 3,
            angry_duration: 1.5,
            projectile_speed: 3.5,
            ring_count: 8,
            resurrection_min_level: 10,
            resurrection_children_min: 2,
            resurrection_children_max: 3,
            child_health_fraction: 0.4,
            child_scale: 0.6,
            super_angry_threshold: 0.3,
            super_angry_cadence: 0.6,
            defeat_points: 5000,
        }
    }
}

/// Complete balance sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Ball ===
    pub ball_radius: f32,
    /// Ball speed at multiplier 1.0 (px per frame)
    pub ball_base_speed: f32,
    /// Speed bonus gained per destroyed brick (fraction)
    pub speed_increment_per_brick: f32,
    /// Cap on the accumulated per-brick bonus (fraction)
    pub speed_bonus_cap: f32,
    /// Global per-ball cooldown between brick hits (seconds)
    pub hit_cooldown: f32,
    /// Random deflection added to brick bounces (degrees)
    pub brick_jitter_degrees: f32,
    pub max_launch_angle_degrees: f32,
    /// Launch angle change per unit of input delta (degrees)
    pub launch_angle_step_degrees: f32,

    // === Paddle ===
    pub paddle_width: f32,
    pub paddle_height: f32,
    /// Fraction of the paddle height (from the top) that bounces balls
    pub paddle_hit_band: f32,
    /// Total exit-angle spread across the paddle (radians)
    pub paddle_angle_spread: f32,
    pub wide_paddle_factor: f32,

    // === Lives & flow ===
    pub max_lives: u8,
    pub respawn_delay: f32,
    pub auto_advance_delay: f32,
    pub level_clear_bonus: u64,

    // === Anti-stall ===
    pub stall_deflect_after: f32,
    pub stall_deflect_degrees: f32,
    pub stall_kamikaze_after: f32,
    pub kamikaze_speed_factor: f32,

    // === Enemies ===
    pub max_enemies: usize,
    pub enemies: EnemyTable,
    /// Projectile-drop interval range at level 1 (seconds)
    pub drop_interval_range: [f32; 2],
    /// Floor for the drop interval range
    pub drop_interval_floor: [f32; 2],
    /// Seconds removed from both ends of the range per level
    pub drop_interval_decay: f32,
    pub bomb_speed: f32,
    pub rocket_speed: f32,

    // === Bricks ===
    pub bricks: BrickTable,
    pub blast_radius: f32,

    // === Drops ===
    pub powerup_fall_speed: f32,
    /// Every Nth enemy kill guarantees a power-up
    pub guaranteed_drop_every: u32,
    pub guaranteed_drop_attempts: u32,
    pub letter_drop_chance: f32,
    pub letter_fall_speed: f32,
    pub letters_bonus_points: u64,

    // === Power-up effects ===
    pub fireball_duration: f32,
    pub wide_duration: f32,
    pub homing_duration: f32,
    /// Max homing turn per frame (radians)
    pub homing_turn_rate: f32,
    pub stun_duration: f32,
    pub turret_ammo: u32,
    pub turret_cooldown: f32,
    pub bullet_speed: f32,
    pub slow_factor: f32,
    pub multiball_spread_degrees: f32,

    // === Bosses ===
    pub boss: BossTuning,

    // === Difficulty ===
    pub normal: DifficultyParams,
    pub hard: DifficultyParams,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            ball_radius: 7.0,
            ball_base_speed: 4.0,
            speed_increment_per_brick: 0.005,
            speed_bonus_cap: 0.30,
            hit_cooldown: 0.010,
            brick_jitter_degrees: 1.0,
            max_launch_angle_degrees: 80.0,
            launch_angle_step_degrees: 2.0,

            paddle_width: 100.0,
            paddle_height: 14.0,
            paddle_hit_band: 0.5,
            paddle_angle_spread: 0.6 * std::f32::consts::PI,
            wide_paddle_factor: 1.5,

            max_lives: 5,
            respawn_delay: 1.5,
            auto_advance_delay: 1.0,
            level_clear_bonus: 500,

            stall_deflect_after: 15.0,
            stall_deflect_degrees: 10.0,
            stall_kamikaze_after: 25.0,
            kamikaze_speed_factor: 3.0,

            max_enemies: 4,
            enemies: EnemyTable::default(),
            drop_interval_range: [2.5, 5.0],
            drop_interval_floor: [1.0, 2.0],
            drop_interval_decay: 0.15,
            bomb_speed: 2.5,
            rocket_speed: 4.5,

            bricks: BrickTable::default(),
            blast_radius: 90.0,

            powerup_fall_speed: 2.0,
            guaranteed_drop_every: 5,
            guaranteed_drop_attempts: 10,
            letter_drop_chance: 0.08,
            letter_fall_speed: 1.6,
            letters_bonus_points: 2500,

            fireball_duration: 8.0,
            wide_duration: 15.0,
            homing_duration: 10.0,
            homing_turn_rate: 0.03,
            stun_duration: 4.0,
            turret_ammo: 20,
            turret_cooldown: 0.25,
            bullet_speed: 8.0,
            slow_factor: 0.8,
            multiball_spread_degrees: 20.0,

            boss: BossTuning::default(),

            normal: DifficultyParams::normal(),
            hard: DifficultyParams::hard(),
        }
    }
}

impl Tuning {
    /// Parse and validate a JSON balance sheet
    ///
    /// The sheet is layered onto the defaults field by field, so a partial
    /// `hard` block keeps the Hard values it does not mention and a partial
    /// enemy or brick entry keeps that class's values.
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let overrides: Value = serde_json::from_str(json).map_err(TuningError::Parse)?;
        let mut merged = serde_json::to_value(Tuning::default()).map_err(TuningError::Parse)?;
        overlay(&mut merged, overrides);
        let tuning: Tuning = serde_json::from_value(merged).map_err(TuningError::Parse)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        serde_json::to_string_pretty(self).map_err(TuningError::Parse)
    }

    /// Difficulty block for the given mode
    pub fn difficulty(&self, mode: DifficultyMode) -> &DifficultyParams {
        match mode {
            DifficultyMode::Normal => &self.normal,
            DifficultyMode::Hard => &self.hard,
        }
    }

    /// Reject sheets that would break simulation invariants
    pub fn validate(&self) -> Result<(), TuningError> {
        for (name, d) in [("normal", &self.normal), ("hard", &self.hard)] {
            if d.enemy_min_interval <= 0.0 || d.enemy_min_interval > d.enemy_base_interval {
                return Err(TuningError::Invalid(format!(
                    "{name}: enemy_min_interval must be in (0, enemy_base_interval]"
                )));
            }
            if d.speed_base <= 0.0 || d.speed_cap < d.speed_base {
                return Err(TuningError::Invalid(format!(
                    "{name}: speed_cap must be >= speed_base > 0"
                )));
            }
            if d.starting_lives == 0 {
                return Err(TuningError::Invalid(format!("{name}: starting_lives must be > 0")));
            }
        }
        if self.paddle_width <= 0.0 || self.paddle_height <= 0.0 {
            return Err(TuningError::Invalid("paddle dimensions must be positive".into()));
        }
        if self.ball_radius <= 0.0 || self.ball_base_speed <= 0.0 {
            return Err(TuningError::Invalid("ball radius and speed must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.paddle_hit_band) {
            return Err(TuningError::Invalid("paddle_hit_band must be within [0, 1]".into()));
        }
        if self.drop_interval_range[0] > self.drop_interval_range[1]
            || self.drop_interval_floor[0] > self.drop_interval_floor[1]
        {
            return Err(TuningError::Invalid("drop interval ranges must be ordered".into()));
        }
        if self.stall_kamikaze_after <= self.stall_deflect_after {
            return Err(TuningError::Invalid(
                "stall_kamikaze_after must come after stall_deflect_after".into(),
            ));
        }
        let boss = &self.boss;
        if boss.phase_thresholds[0] <= boss.phase_thresholds[1] {
            return Err(TuningError::Invalid("boss phase thresholds must be descending".into()));
        }
        if boss.resurrection_children_min > boss.resurrection_children_max {
            return Err(TuningError::Invalid("boss resurrection child range is inverted".into()));
        }
        for (name, e) in [
            ("cube", &self.enemies.cube),
            ("sphere", &self.enemies.sphere),
            ("pyramid", &self.enemies.pyramid),
        ] {
            if e.hits_to_destroy == 0 {
                return Err(TuningError::Invalid(format!("{name}: hits_to_destroy must be > 0")));
            }
        }
        Ok(())
    }
}

/// Recursively copy `top` over `base`; objects merge key by key, anything
/// else replaces
fn overlay(base: &mut Value, top: Value) {
    match (base, top) {
        (Value::Object(base), Value::Object(top)) => {
            for (key, value) in top {
                match base.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Failure to load a balance sheet
#[derive(Debug)]
pub enum TuningError {
    /// Malformed JSON
    Parse(serde_json::Error),
    /// Well-formed but inconsistent values
    Invalid(String),
}

impl fmt::Display for TuningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuningError::Parse(e) => write!(f, "tuning parse error: {e}"),
            TuningError::Invalid(msg) => write!(f, "invalid tuning: {msg}"),
        }
    }
}

impl std::error::Error for TuningError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TuningError::Parse(e) => Some(e),
            TuningError::Invalid(_) => None,
        }
    }
}
