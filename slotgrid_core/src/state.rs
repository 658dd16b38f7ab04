use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

pub const STARTING_COINS: i64 = 1000;
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Loss => write!(f, "loss"),
        }
    }
}

/// One line of the spin log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub outcome: Outcome,
    /// Balance after the round settled.
    pub coins: i64,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} (coins: {})",
            self.at.with_timezone(&Local).format("%H:%M:%S"),
            self.outcome,
            self.coins
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerState {
    pub coins: i64,
    pub history: Vec<HistoryEntry>,
    pub wins: u64,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::with_coins(STARTING_COINS)
    }
}

impl PlayerState {
    pub fn with_coins(coins: i64) -> Self {
        Self {
            coins,
            history: Vec::new(),
            wins: 0,
        }
    }

    /// Appends to the log and drops the oldest entries past `limit`.
    pub fn push_history(&mut self, entry: HistoryEntry, limit: usize) {
        self.history.push(entry);
        if self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }
    }

    /// The last `n` entries, most recent first.
    pub fn recent_history(&self, n: usize) -> Vec<HistoryEntry> {
        self.history.iter().rev().take(n).cloned().collect()
    }
}
