use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::{Cell, Grid};
use crate::symbols::Symbol;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub struct Payline {
    pub name: &'static str,
    pub cells: [Cell; 3],
}

/// Rows, then diagonals, then columns. Win order follows this order.
pub const PAYLINES: [Payline; 8] = [
    Payline { name: "top row", cells: [(0, 0), (0, 1), (0, 2)] },
    Payline { name: "middle row", cells: [(1, 0), (1, 1), (1, 2)] },
    Payline { name: "bottom row", cells: [(2, 0), (2, 1), (2, 2)] },
    Payline { name: "diagonal down", cells: [(0, 0), (1, 1), (2, 2)] },
    Payline { name: "diagonal up", cells: [(0, 2), (1, 1), (2, 0)] },
    Payline { name: "center column", cells: [(0, 1), (1, 1), (2, 1)] },
    Payline { name: "left column", cells: [(0, 0), (1, 0), (2, 0)] },
    Payline { name: "right column", cells: [(0, 2), (1, 2), (2, 2)] },
];

pub fn all_paylines() -> &'static [Payline] {
    &PAYLINES
}

/// Multiplier applied to every winning line of a round. Never below 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(from = "i64", into = "u32")]
pub struct Leverage(u32);

impl Leverage {
    pub const ONE: Leverage = Leverage(1);

    /// Clamps non-positive values to 1.
    pub fn from_raw(raw: i64) -> Self {
        if raw < 1 {
            Self::ONE
        } else {
            Self(u32::try_from(raw).unwrap_or(u32::MAX))
        }
    }

    /// Non-numeric input plays at 1x.
    pub fn parse_lenient(input: &str) -> Self {
        input
            .trim()
            .parse::<i64>()
            .map(Self::from_raw)
            .unwrap_or(Self::ONE)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Leverage {
    fn default() -> Self {
        Self::ONE
    }
}

impl From<i64> for Leverage {
    fn from(raw: i64) -> Self {
        Self::from_raw(raw)
    }
}

impl From<Leverage> for u32 {
    fn from(l: Leverage) -> Self {
        l.0
    }
}

impl fmt::Display for Leverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineWin {
    pub payline: &'static Payline,
    pub symbol: Symbol,
    pub base_payout: u64,
}

impl LineWin {
    pub fn payout(&self, leverage: Leverage) -> u64 {
        self.base_payout.saturating_mul(u64::from(leverage.get()))
    }
}

/// Winning lines of one grid, in payline order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WinResult(pub Vec<LineWin>);

impl WinResult {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn lines(&self) -> &[LineWin] {
        &self.0
    }

    pub fn paylines(&self) -> Vec<&'static Payline> {
        self.0.iter().map(|w| w.payline).collect()
    }

    /// Sum of every line's leveraged payout. Overlapping lines each count.
    pub fn total(&self, leverage: Leverage) -> u64 {
        self.0
            .iter()
            .fold(0u64, |acc, w| acc.saturating_add(w.payout(leverage)))
    }

    /// Distinct cells covered by winning lines.
    pub fn cells(&self) -> BTreeSet<Cell> {
        self.0
            .iter()
            .flat_map(|w| w.payline.cells.iter().copied())
            .collect()
    }
}

pub fn evaluate(grid: &Grid) -> WinResult {
    let wins = PAYLINES
        .iter()
        .filter_map(|line| {
            let [a, b, c] = line.cells.map(|cell| grid.get(cell));
            (a == b && b == c).then(|| LineWin {
                payline: line,
                symbol: a,
                base_payout: a.payout(),
            })
        })
        .collect();
    WinResult(wins)
}
