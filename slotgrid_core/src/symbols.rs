use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Symbol {
    Cherry,
    Seven,
    Lemon,
    Star,
    Watermelon,
    Bell,
}

impl Symbol {
    /// All symbols in declaration order.
    pub const ALL: [Symbol; 6] = [
        Symbol::Cherry,
        Symbol::Seven,
        Symbol::Lemon,
        Symbol::Star,
        Symbol::Watermelon,
        Symbol::Bell,
    ];

    /// The symbol with the highest line payout.
    pub const TOP: Symbol = Symbol::Star;

    /// Coins paid for three of this symbol on one payline.
    pub fn payout(self) -> u64 {
        match self {
            Symbol::Cherry => 50,
            Symbol::Seven => 100,
            Symbol::Lemon => 30,
            Symbol::Star => 200,
            Symbol::Watermelon => 80,
            Symbol::Bell => 150,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Symbol::Cherry => "🍒",
            Symbol::Seven => "7️⃣",
            Symbol::Lemon => "🍋",
            Symbol::Star => "⭐",
            Symbol::Watermelon => "🍉",
            Symbol::Bell => "🔔",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

/// Biases how often the top symbol comes up. Payouts and paylines are unaffected.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

const EASY_POOL: [Symbol; 5] = [
    Symbol::Cherry,
    Symbol::Seven,
    Symbol::Lemon,
    Symbol::Watermelon,
    Symbol::Bell,
];

const HARD_POOL: [Symbol; 8] = [
    Symbol::Cherry,
    Symbol::Seven,
    Symbol::Lemon,
    Symbol::Star,
    Symbol::Watermelon,
    Symbol::Bell,
    Symbol::Star,
    Symbol::Star,
];

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    /// Parses a selector value. Anything unrecognised plays as `Normal`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Normal,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }

    /// The resampling pool a draw picks from uniformly.
    ///
    /// Easy drops the top symbol (5 slots), normal is the plain set (6 slots),
    /// hard adds two extra copies of the top symbol (8 slots, 3/8 for it).
    pub fn pool(self) -> &'static [Symbol] {
        match self {
            Difficulty::Easy => &EASY_POOL,
            Difficulty::Normal => &Symbol::ALL,
            Difficulty::Hard => &HARD_POOL,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Draws one symbol uniformly from the difficulty's pool.
pub fn next_symbol<R: Rng + ?Sized>(rng: &mut R, difficulty: Difficulty) -> Symbol {
    let pool = difficulty.pool();
    pool[rng.gen_range(0..pool.len())]
}

/// Where the round engine gets its symbols from.
pub trait SymbolSource {
    fn next_symbol(&mut self, difficulty: Difficulty) -> Symbol;
}

/// Pool-based draws from any `rand::Rng`.
#[derive(Debug, Clone)]
pub struct SymbolGenerator<R> {
    rng: R,
}

impl<R: Rng> SymbolGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> SymbolSource for SymbolGenerator<R> {
    fn next_symbol(&mut self, difficulty: Difficulty) -> Symbol {
        next_symbol(&mut self.rng, difficulty)
    }
}

impl<F: FnMut(Difficulty) -> Symbol> SymbolSource for F {
    fn next_symbol(&mut self, difficulty: Difficulty) -> Symbol {
        self(difficulty)
    }
}
