use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::SpinRejected,
    grid::{Grid, ReelFrame, COLS, ROWS},
    paytable::{evaluate, Leverage, WinResult},
    present::{Presenter, Tone},
    state::{HistoryEntry, Outcome, PlayerState, HISTORY_LIMIT, STARTING_COINS},
    store::{load_or_start, save_player, KeyValueStore},
    symbols::{Difficulty, Symbol, SymbolSource},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineParams {
    pub spin_cost: i64,
    pub starting_coins: i64,
    pub history_limit: usize,
    /// How many history entries front ends show.
    pub history_display: usize,
    /// Re-rolls per reel before it stops; the last one counts.
    pub frames_per_reel: u32,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            spin_cost: 10,
            starting_coins: STARTING_COINS,
            history_limit: HISTORY_LIMIT,
            history_display: 10,
            frames_per_reel: 15,
        }
    }
}

impl EngineParams {
    /// Clamps values that would stall or break a round.
    pub fn normalized(mut self) -> Self {
        self.spin_cost = self.spin_cost.max(0);
        self.history_limit = self.history_limit.max(1);
        self.frames_per_reel = self.frames_per_reel.max(1);
        self
    }

    /// Frames a whole round paints before settling.
    pub fn frames_per_round(&self) -> u32 {
        self.frames_per_reel * COLS as u32
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundRequest {
    pub difficulty: Difficulty,
    pub leverage: Leverage,
}

impl RoundRequest {
    pub fn new(difficulty: Difficulty, leverage: Leverage) -> Self {
        Self {
            difficulty,
            leverage,
        }
    }

    /// Builds a request from raw selector values, normalizing bad input.
    pub fn from_labels(difficulty: &str, leverage: &str) -> Self {
        Self::new(
            Difficulty::from_label(difficulty),
            Leverage::parse_lenient(leverage),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Charging,
    Resolving,
    Settling,
}

#[derive(Debug, Clone)]
pub struct RoundReport {
    pub request: RoundRequest,
    pub grid: Grid,
    pub wins: WinResult,
    /// Coins credited, after leverage. Zero on a loss.
    pub payout: u64,
    pub outcome: Outcome,
    pub entry: HistoryEntry,
    /// False when the store rejected the write. The in-memory state is settled either way.
    pub persisted: bool,
}

#[derive(Debug)]
pub enum Step {
    Frame(ReelFrame),
    Settled(RoundReport),
}

#[derive(Debug, Clone)]
enum Round {
    Idle,
    Charging(RoundRequest),
    Resolving {
        request: RoundRequest,
        frame: ReelFrame,
        reel: usize,
        frames_left: u32,
    },
    Settling {
        request: RoundRequest,
        grid: Grid,
    },
}

/// Owns the player state and runs one round at a time.
pub struct RoundEngine<S, G> {
    params: EngineParams,
    state: PlayerState,
    store: S,
    reels: G,
    round: Round,
}

impl<S: KeyValueStore, G: SymbolSource> RoundEngine<S, G> {
    /// Loads the player from `store`, or starts a fresh one if nothing was saved.
    pub fn new(params: EngineParams, store: S, reels: G) -> Self {
        let params = params.normalized();
        let mut state = load_or_start(&store, params.starting_coins);
        if state.history.len() > params.history_limit {
            let excess = state.history.len() - params.history_limit;
            state.history.drain(..excess);
        }
        Self {
            params,
            state,
            store,
            reels,
            round: Round::Idle,
        }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn phase(&self) -> Phase {
        match self.round {
            Round::Idle => Phase::Idle,
            Round::Charging(_) => Phase::Charging,
            Round::Resolving { .. } => Phase::Resolving,
            Round::Settling { .. } => Phase::Settling,
        }
    }

    pub fn into_parts(self) -> (PlayerState, S, G) {
        (self.state, self.store, self.reels)
    }

    /// Paints balance, history and ranking from the current state.
    pub fn refresh<P: Presenter + ?Sized>(&self, presenter: &mut P) {
        presenter.set_balance(self.state.coins);
        presenter.render_history(&self.state.recent_history(self.params.history_display));
        presenter.render_ranking(self.state.wins);
        presenter.set_spin_enabled(self.phase() == Phase::Idle);
    }

    /// Idle -> Charging. Checks the balance and takes the spin cost.
    ///
    /// A rejected start leaves the state untouched and writes nothing.
    pub fn start<P: Presenter + ?Sized>(
        &mut self,
        request: RoundRequest,
        presenter: &mut P,
    ) -> Result<(), SpinRejected> {
        if self.phase() != Phase::Idle {
            return Err(SpinRejected::RoundInProgress);
        }
        let cost = self.params.spin_cost;
        if self.state.coins < cost {
            presenter.set_result_message("Not enough coins!", Tone::Warning);
            return Err(SpinRejected::InsufficientCoins {
                coins: self.state.coins,
                cost,
            });
        }
        presenter.set_spin_enabled(false);
        presenter.set_result_message("", Tone::Loss);
        self.state.coins -= cost;
        presenter.set_balance(self.state.coins);
        self.round = Round::Charging(request);
        Ok(())
    }

    /// Moves the round in flight forward by one frame, or settles it once
    /// every reel has stopped. Returns `None` when idle.
    pub fn advance<P: Presenter + ?Sized>(&mut self, presenter: &mut P) -> Option<Step> {
        match std::mem::replace(&mut self.round, Round::Idle) {
            Round::Idle => None,
            Round::Charging(request) => {
                presenter.play_spin_sound();
                let frame = self.roll(request, ReelFrame::empty(), 0, self.params.frames_per_reel, presenter);
                Some(Step::Frame(frame))
            }
            Round::Resolving {
                request,
                frame,
                reel,
                frames_left,
            } => {
                let frame = self.roll(request, frame, reel, frames_left, presenter);
                Some(Step::Frame(frame))
            }
            Round::Settling { request, grid } => Some(Step::Settled(self.settle(request, grid, presenter))),
        }
    }

    /// Runs a whole round without pausing between frames.
    pub fn spin<P: Presenter + ?Sized>(
        &mut self,
        request: RoundRequest,
        presenter: &mut P,
    ) -> Result<RoundReport, SpinRejected> {
        self.start(request, presenter)?;
        loop {
            match self.advance(presenter) {
                Some(Step::Settled(report)) => return Ok(report),
                Some(Step::Frame(_)) => continue,
                None => return Err(SpinRejected::RoundInProgress),
            }
        }
    }

    fn roll<P: Presenter + ?Sized>(
        &mut self,
        request: RoundRequest,
        mut frame: ReelFrame,
        mut reel: usize,
        mut frames_left: u32,
        presenter: &mut P,
    ) -> ReelFrame {
        let mut column = [Symbol::Cherry; ROWS];
        for cell in column.iter_mut() {
            *cell = self.reels.next_symbol(request.difficulty);
        }
        frame.set_column(reel, column);
        presenter.render_frame(&frame);

        frames_left -= 1;
        if frames_left == 0 {
            reel += 1;
            frames_left = self.params.frames_per_reel;
        }
        self.round = match frame.complete() {
            Some(grid) if reel == COLS => Round::Settling { request, grid },
            _ => Round::Resolving {
                request,
                frame,
                reel,
                frames_left,
            },
        };
        frame
    }

    fn settle<P: Presenter + ?Sized>(
        &mut self,
        request: RoundRequest,
        grid: Grid,
        presenter: &mut P,
    ) -> RoundReport {
        presenter.stop_spin_sound();
        presenter.render_grid(&grid);

        let wins = evaluate(&grid);
        let (outcome, payout) = if wins.is_empty() {
            presenter.set_result_message("No luck this time.", Tone::Loss);
            (Outcome::Loss, 0)
        } else {
            let payout = wins.total(request.leverage);
            self.state.coins = self
                .state
                .coins
                .saturating_add(i64::try_from(payout).unwrap_or(i64::MAX));
            self.state.wins += 1;
            presenter.highlight_lines(&wins.paylines());
            presenter.set_result_message(
                &format!("🎉 Win! {payout} coins ({})", request.leverage),
                Tone::Win,
            );
            presenter.play_win_sound();
            (Outcome::Win, payout)
        };

        let entry = HistoryEntry {
            at: Utc::now(),
            outcome,
            coins: self.state.coins,
        };
        self.state.push_history(entry.clone(), self.params.history_limit);

        let persisted = match save_player(&mut self.store, &self.state) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to persist player state");
                false
            }
        };
        debug!(
            difficulty = %request.difficulty,
            leverage = request.leverage.get(),
            lines = wins.len(),
            payout,
            coins = self.state.coins,
            "round settled"
        );

        self.refresh(presenter);
        RoundReport {
            request,
            grid,
            wins,
            payout,
            outcome,
            entry,
            persisted,
        }
    }
}
