pub mod engine;
pub mod error;
pub mod grid;
pub mod paytable;
pub mod present;
pub mod rng;
pub mod state;
pub mod store;
pub mod symbols;

pub use crate::engine::{EngineParams, Phase, RoundEngine, RoundReport, RoundRequest, Step};
pub use crate::error::{SpinRejected, StoreError, StoreResult};
pub use crate::grid::{Cell, Grid, ReelFrame};
pub use crate::paytable::{all_paylines, evaluate, Leverage, LineWin, Payline, WinResult, PAYLINES};
pub use crate::present::{NullPresenter, Presenter, Theme, Tone};
pub use crate::rng::{derive_hash_hex, ProvablyFairRng};
pub use crate::state::{HistoryEntry, Outcome, PlayerState};
pub use crate::store::{load_or_start, load_player, save_player, JsonFileStore, KeyValueStore, MemoryStore};
pub use crate::symbols::{next_symbol, Difficulty, Symbol, SymbolGenerator, SymbolSource};
