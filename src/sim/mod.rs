//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Dt-scaled steps, clamped per tick
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or platform dependencies

pub mod boss;
pub mod collision;
pub mod entities;
pub mod events;
pub mod geom;
pub mod layouts;
pub mod lifecycle;
pub mod physics;
pub mod powerups;
pub mod progression;
pub mod state;
pub mod tick;
pub mod timer;

pub use boss::{AttackPattern, AttackState, Boss};
pub use entities::{
    Ball, BonusLetter, Brick, BrickClass, Enemy, EnemyClass, EnemyKind, Paddle, PowerUp,
    PowerUpKind, Projectile, ProjectileKind, BONUS_WORD,
};
pub use events::{Achievements, GameEvent, RunSummary};
pub use geom::Rect;
pub use state::{GamePhase, Snapshot, World};
pub use tick::{TickInput, autopilot, tick};
pub use timer::{Countdown, TimerEntry};
