//! Brick Siege headless runner
//!
//! Plays a seeded run with the built-in autopilot and prints the run summary
//! as JSON. Useful for balance checks and for reproducing a run from a seed.
//!
//! Usage: brick-siege [--seed N] [--hard] [--ticks N] [--tuning FILE]

use brick_siege::consts::FRAME_DT;
use brick_siege::sim::{GameEvent, GamePhase, World, autopilot, tick};
use brick_siege::{DifficultyMode, HighScores, Tuning};

struct Args {
    seed: u64,
    mode: DifficultyMode,
    ticks: u32,
    tuning: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        seed: 12345,
        mode: DifficultyMode::Normal,
        ticks: 60 * 60 * 5,
        tuning: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--seed" => {
                let v = it.next().ok_or("--seed needs a value")?;
                args.seed = v.parse().map_err(|e| format!("bad seed {v:?}: {e}"))?;
            }
            "--ticks" => {
                let v = it.next().ok_or("--ticks needs a value")?;
                args.ticks = v.parse().map_err(|e| format!("bad tick count {v:?}: {e}"))?;
            }
            "--hard" => args.mode = DifficultyMode::Hard,
            "--tuning" => args.tuning = Some(it.next().ok_or("--tuning needs a file")?),
            other => return Err(format!("unknown argument {other:?}")),
        }
    }
    Ok(args)
}

fn load_tuning(path: Option<&str>) -> Result<Tuning, String> {
    let Some(path) = path else {
        return Ok(Tuning::default());
    };
    let json = std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?;
    Tuning::from_json(&json).map_err(|e| format!("{path}: {e}"))
}

fn run() -> Result<(), String> {
    let args = parse_args()?;
    let tuning = load_tuning(args.tuning.as_deref())?;
    log::info!(
        "Brick Siege starting: seed {}, {} mode",
        args.seed,
        args.mode.as_str()
    );

    let mut world = World::new(tuning, args.mode, args.seed);
    let mut leaderboard = HighScores::new();
    world.leaderboard_floor = leaderboard.floor();

    for _ in 0..args.ticks {
        let input = autopilot(&world);
        tick(&mut world, &input, FRAME_DT);
        for event in world.take_events() {
            match event {
                GameEvent::LevelStarted { level } => log::info!("Level {} started", level),
                GameEvent::BossDefeated { boss_id, children } => {
                    log::info!("Boss {} defeated ({} children)", boss_id, children)
                }
                GameEvent::GameOver { summary } => {
                    leaderboard.insert("autopilot", summary);
                }
                _ => {}
            }
        }
        if world.phase == GamePhase::GameOver {
            break;
        }
    }

    let summary = world.summary();
    let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("brick-siege: {e}");
        std::process::exit(2);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The wasm host drives `sim::tick` directly
}
