//! High score leaderboard
//!
//! Ranks run summaries, top 10. Storage and submission belong to the host;
//! the table serializes to JSON so the host can persist it however it likes.

use serde::{Deserialize, Serialize};

use crate::sim::RunSummary;

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A single high score entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// Name the player typed in
    pub name: String,
    pub summary: RunSummary,
}

/// High score leaderboard, sorted by descending score
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Lowest score on a full board, zero while there is room.
    /// Feed this to `World::leaderboard_floor`.
    pub fn floor(&self) -> u64 {
        if self.entries.len() < MAX_HIGH_SCORES {
            0
        } else {
            self.entries.last().map_or(0, |e| e.summary.score)
        }
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        score > self.floor()
    }

    /// Get the rank a score would achieve (1-indexed, None if it doesn't qualify)
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.summary.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Insert a finished run. Returns the rank achieved (1-indexed) or None.
    /// Ties keep the earlier run ahead.
    pub fn insert(&mut self, name: impl Into<String>, summary: RunSummary) -> Option<usize> {
        let rank = self.potential_rank(summary.score)?;
        let name = name.into();
        log::info!("High score #{}: {} ({})", rank, summary.score, name);
        self.entries.insert(rank - 1, HighScoreEntry { name, summary });
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.summary.score)
    }

    /// Parse a stored table, falling back to an empty one
    pub fn from_json(json: &str) -> Self {
        serde_json::from_str(json).unwrap_or_else(|e| {
            log::warn!("Discarding unreadable high score table: {}", e);
            Self::new()
        })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Achievements;
    use crate::tuning::DifficultyMode;

    fn run(score: u64) -> RunSummary {
        RunSummary {
            score,
            level_reached: 3,
            difficulty: DifficultyMode::Normal,
            achievements: Achievements::default(),
        }
    }

    #[test]
    fn test_empty_leaderboard() {
        let hs = HighScores::new();
        assert!(hs.is_empty());
        assert!(hs.qualifies(100));
        assert!(!hs.qualifies(0));
        assert_eq!(hs.floor(), 0);
        assert_eq!(hs.top_score(), None);
    }

    #[test]
    fn test_insert_sorted() {
        let mut hs = HighScores::new();
        assert_eq!(hs.insert("a", run(100)), Some(1));
        assert_eq!(hs.insert("b", run(300)), Some(1));
        assert_eq!(hs.insert("c", run(200)), Some(2));
        assert_eq!(hs.insert("d", run(200)), Some(3));

        let scores: Vec<u64> = hs.entries.iter().map(|e| e.summary.score).collect();
        assert_eq!(scores, vec![300, 200, 200, 100]);
        assert_eq!(hs.entries[1].name, "c");
    }

    #[test]
    fn test_full_board_floor() {
        let mut hs = HighScores::new();
        for i in 1..=MAX_HIGH_SCORES as u64 {
            hs.insert("p", run(i * 100));
        }
        assert_eq!(hs.floor(), 100);
        assert!(!hs.qualifies(100));
        assert_eq!(hs.insert("late", run(50)), None);
        assert_eq!(hs.insert("new", run(150)), Some(10));
        assert_eq!(hs.entries.len(), MAX_HIGH_SCORES);
        assert_eq!(hs.floor(), 150);
    }

    #[test]
    fn test_json_round_trip_and_garbage() {
        let mut hs = HighScores::new();
        hs.insert("x", run(42));
        let back = HighScores::from_json(&hs.to_json());
        assert_eq!(back.top_score(), Some(42));
        assert!(HighScores::from_json("not json").is_empty());
    }
}
