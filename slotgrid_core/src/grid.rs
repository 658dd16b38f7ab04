use std::fmt;

use serde::{Deserialize, Serialize};

use crate::symbols::Symbol;

pub const ROWS: usize = 3;
pub const COLS: usize = 3;

/// A (row, col) cell position.
pub type Cell = (usize, usize);

/// A fully populated 3x3 window. Only this type is ever evaluated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Grid(pub [[Symbol; COLS]; ROWS]);

impl Grid {
    pub fn filled(symbol: Symbol) -> Self {
        Self([[symbol; COLS]; ROWS])
    }

    pub fn from_rows(rows: [[Symbol; COLS]; ROWS]) -> Self {
        Self(rows)
    }

    pub fn get(&self, (row, col): Cell) -> Symbol {
        self.0[row][col]
    }

    pub fn rows(&self) -> &[[Symbol; COLS]; ROWS] {
        &self.0
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (r, row) in self.0.iter().enumerate() {
            if r > 0 {
                writeln!(f)?;
            }
            write!(f, "{} {} {}", row[0], row[1], row[2])?;
        }
        Ok(())
    }
}

/// Reel window while the reels are still turning. Cells of reels that have
/// not been rolled yet are empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReelFrame([[Option<Symbol>; COLS]; ROWS]);

impl ReelFrame {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set_column(&mut self, col: usize, symbols: [Symbol; ROWS]) {
        for (row, symbol) in symbols.into_iter().enumerate() {
            self.0[row][col] = Some(symbol);
        }
    }

    pub fn get(&self, (row, col): Cell) -> Option<Symbol> {
        self.0[row][col]
    }

    pub fn is_complete(&self) -> bool {
        self.0.iter().flatten().all(Option::is_some)
    }

    /// Converts to a `Grid` once every cell holds a symbol.
    pub fn complete(&self) -> Option<Grid> {
        let mut rows = [[Symbol::Cherry; COLS]; ROWS];
        for (r, row) in self.0.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                rows[r][c] = (*cell)?;
            }
        }
        Some(Grid(rows))
    }
}

impl From<Grid> for ReelFrame {
    fn from(grid: Grid) -> Self {
        let mut frame = ReelFrame::empty();
        for (r, row) in grid.0.iter().enumerate() {
            for (c, symbol) in row.iter().enumerate() {
                frame.0[r][c] = Some(*symbol);
            }
        }
        frame
    }
}
