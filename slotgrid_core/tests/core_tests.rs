use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use slotgrid_core::{
    evaluate, load_player, next_symbol, save_player, Difficulty, EngineParams, Grid, HistoryEntry,
    KeyValueStore, Leverage, MemoryStore, Outcome, Payline, Phase, PlayerState, Presenter,
    ProvablyFairRng, ReelFrame, RoundEngine, RoundRequest, SpinRejected, Step, StoreError,
    StoreResult, Symbol, SymbolGenerator, SymbolSource, Tone,
};
use slotgrid_core::Symbol::*;

const LOSING: Grid = Grid([
    [Cherry, Seven, Lemon],
    [Star, Watermelon, Bell],
    [Cherry, Seven, Lemon],
]);

const CHERRY_TOP_ROW: Grid = Grid([
    [Cherry, Cherry, Cherry],
    [Star, Watermelon, Bell],
    [Seven, Lemon, Seven],
]);

/// Replays `grid` column by column, matching the engine's draw order.
fn scripted(grid: Grid, frames_per_reel: u32) -> impl FnMut(Difficulty) -> Symbol {
    let per_reel = frames_per_reel * 3;
    let mut draws = 0u32;
    move |_: Difficulty| {
        let i = draws % (per_reel * 3);
        draws += 1;
        grid.get(((i % 3) as usize, (i / per_reel) as usize))
    }
}

fn engine_with(store: MemoryStore, grid: Grid) -> RoundEngine<MemoryStore, impl SymbolSource> {
    let params = EngineParams::default();
    let reels = scripted(grid, params.frames_per_reel);
    RoundEngine::new(params, store, reels)
}

#[derive(Default)]
struct Recorder {
    frames: usize,
    grids: Vec<Grid>,
    highlighted: Vec<&'static str>,
    history: Vec<HistoryEntry>,
    ranking: Option<u64>,
    balance: Option<i64>,
    message: Option<(String, Tone)>,
    spin_enabled: Vec<bool>,
    spin_sound: i32,
    win_sounds: usize,
}

impl Presenter for Recorder {
    fn render_frame(&mut self, _frame: &ReelFrame) {
        self.frames += 1;
    }
    fn render_grid(&mut self, grid: &Grid) {
        self.grids.push(*grid);
    }
    fn highlight_lines(&mut self, lines: &[&Payline]) {
        self.highlighted = lines.iter().map(|l| l.name).collect();
    }
    fn render_history(&mut self, entries: &[HistoryEntry]) {
        self.history = entries.to_vec();
    }
    fn render_ranking(&mut self, wins: u64) {
        self.ranking = Some(wins);
    }
    fn play_spin_sound(&mut self) {
        self.spin_sound += 1;
    }
    fn stop_spin_sound(&mut self) {
        self.spin_sound -= 1;
    }
    fn play_win_sound(&mut self) {
        self.win_sounds += 1;
    }
    fn set_balance(&mut self, coins: i64) {
        self.balance = Some(coins);
    }
    fn set_result_message(&mut self, text: &str, tone: Tone) {
        self.message = Some((text.to_string(), tone));
    }
    fn set_spin_enabled(&mut self, enabled: bool) {
        self.spin_enabled.push(enabled);
    }
}

/// Refuses the `fail_at`-th write, counting from 1.
struct FailingStore {
    inner: MemoryStore,
    sets: usize,
    fail_at: usize,
}

impl FailingStore {
    fn new(inner: MemoryStore, fail_at: usize) -> Self {
        Self {
            inner,
            sets: 0,
            fail_at,
        }
    }
}

impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.get(key)
    }
    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.sets += 1;
        if self.sets == self.fail_at {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.inner.set(key, value)
    }
    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.inner.remove(key)
    }
}

fn top_symbol_share(difficulty: Difficulty, draws: usize) -> f64 {
    let mut rng = StdRng::seed_from_u64(0x5107);
    let hits = (0..draws)
        .filter(|_| next_symbol(&mut rng, difficulty) == Symbol::TOP)
        .count();
    hits as f64 / draws as f64
}

#[test]
fn rng_repeatable() {
    let params = EngineParams::default();
    let run = || {
        let reels = SymbolGenerator::new(ProvablyFairRng::new("s", "c", 42));
        let mut engine = RoundEngine::new(params.clone(), MemoryStore::new(), reels);
        (0..5)
            .map(|_| engine.spin(RoundRequest::default(), &mut Recorder::default()).unwrap().grid)
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn easy_never_draws_the_top_symbol() {
    assert_eq!(top_symbol_share(Difficulty::Easy, 10_000), 0.0);
}

#[test]
fn hard_draws_top_symbol_three_eighths_of_the_time() {
    let hard = top_symbol_share(Difficulty::Hard, 40_000);
    let normal = top_symbol_share(Difficulty::Normal, 40_000);
    assert!((hard - 3.0 / 8.0).abs() < 0.02, "hard share {hard}");
    assert!((normal - 1.0 / 6.0).abs() < 0.02, "normal share {normal}");
    assert!(hard > normal);
}

#[test]
fn uniform_grid_wins_every_line() {
    for symbol in Symbol::ALL {
        let wins = evaluate(&Grid::filled(symbol));
        assert_eq!(wins.len(), 8);
        assert_eq!(wins.total(Leverage::ONE), 8 * symbol.payout());
    }
}

#[test]
fn mixed_grid_wins_nothing() {
    assert!(evaluate(&LOSING).is_empty());
}

#[test]
fn leveraged_payout_sums_per_line() {
    let wins = evaluate(&CHERRY_TOP_ROW);
    assert_eq!(wins.len(), 1);
    assert_eq!(wins.total(Leverage::from_raw(4)), Cherry.payout() * 4);

    let wins = evaluate(&Grid::filled(Bell));
    assert_eq!(wins.total(Leverage::from_raw(2)), 8 * 150 * 2);
}

#[test]
fn losing_round_only_costs_the_spin() {
    let mut engine = engine_with(MemoryStore::new(), LOSING);
    let mut view = Recorder::default();
    let report = engine.spin(RoundRequest::default(), &mut view).unwrap();

    assert_eq!(report.outcome, Outcome::Loss);
    assert_eq!(report.payout, 0);
    assert!(report.persisted);
    assert_eq!(engine.state().coins, 990);
    assert_eq!(engine.state().history.len(), 1);
    assert_eq!(engine.state().wins, 0);
    assert_eq!(view.message.map(|(_, tone)| tone), Some(Tone::Loss));
    assert_eq!(view.win_sounds, 0);
    assert_eq!(view.spin_sound, 0);
    assert_eq!(view.spin_enabled, vec![false, true]);
}

#[test]
fn leveraged_win_credits_after_the_debit() {
    let mut engine = engine_with(MemoryStore::new(), CHERRY_TOP_ROW);
    let mut view = Recorder::default();
    let request = RoundRequest::new(Difficulty::Normal, Leverage::from_raw(3));
    let report = engine.spin(request, &mut view).unwrap();

    assert_eq!(report.outcome, Outcome::Win);
    assert_eq!(report.payout, 150);
    assert_eq!(engine.state().coins, 1000 - 10 + 150);
    assert_eq!(engine.state().wins, 1);
    assert_eq!(report.entry.coins, 1140);
    assert_eq!(view.highlighted, vec!["top row"]);
    assert_eq!(view.ranking, Some(1));
    assert_eq!(view.balance, Some(1140));
    assert_eq!(view.win_sounds, 1);
    let (text, tone) = view.message.unwrap();
    assert_eq!(tone, Tone::Win);
    assert!(text.contains("150"), "{text}");
}

#[test]
fn invalid_inputs_are_normalized() {
    let request = RoundRequest::from_labels("impossible", "-2");
    assert_eq!(request, RoundRequest::new(Difficulty::Normal, Leverage::ONE));

    let mut engine = engine_with(MemoryStore::new(), CHERRY_TOP_ROW);
    let report = engine.spin(request, &mut Recorder::default()).unwrap();
    assert_eq!(report.payout, 50);
}

#[test]
fn history_keeps_the_latest_fifty() {
    let mut engine = engine_with(MemoryStore::new(), LOSING);
    let mut view = Recorder::default();
    for _ in 0..60 {
        engine.spin(RoundRequest::default(), &mut view).unwrap();
    }
    let history = &engine.state().history;
    assert_eq!(history.len(), 50);
    assert_eq!(history.first().map(|e| e.coins), Some(1000 - 11 * 10));
    assert_eq!(history.last().map(|e| e.coins), Some(1000 - 60 * 10));

    assert_eq!(view.history.len(), 10);
    assert_eq!(view.history[0].coins, 400);
    assert_eq!(view.history[9].coins, 490);
}

#[test]
fn broke_player_is_turned_away() {
    let mut store = MemoryStore::new();
    store.insert("slot_coins", "5");
    store.insert("slot_wins", "2");
    let mut engine = engine_with(store, CHERRY_TOP_ROW);
    let before = engine.state().clone();
    let mut view = Recorder::default();

    let err = engine.spin(RoundRequest::default(), &mut view).unwrap_err();
    assert_eq!(err, SpinRejected::InsufficientCoins { coins: 5, cost: 10 });
    assert_eq!(engine.state(), &before);
    assert_eq!(engine.phase(), Phase::Idle);
    assert_eq!(engine.store().writes(), 0);
    assert_eq!(view.message.map(|(_, tone)| tone), Some(Tone::Warning));
    assert_eq!(view.frames, 0);
}

#[test]
fn exactly_ten_coins_is_enough() {
    let mut store = MemoryStore::new();
    store.insert("slot_coins", "10");
    let mut engine = engine_with(store, LOSING);
    engine.spin(RoundRequest::default(), &mut Recorder::default()).unwrap();
    assert_eq!(engine.state().coins, 0);
    assert!(engine.spin(RoundRequest::default(), &mut Recorder::default()).is_err());
}

#[test]
fn stepping_paints_every_frame_and_rejects_overlap() {
    let mut engine = engine_with(MemoryStore::new(), CHERRY_TOP_ROW);
    let mut view = Recorder::default();
    assert!(engine.advance(&mut view).is_none());

    engine.start(RoundRequest::default(), &mut view).unwrap();
    assert_eq!(engine.phase(), Phase::Charging);
    assert_eq!(engine.state().coins, 990);

    let mut frames = 0;
    let report = loop {
        match engine.advance(&mut view).expect("round in flight") {
            Step::Frame(_) => {
                frames += 1;
                assert_eq!(
                    engine.start(RoundRequest::default(), &mut view),
                    Err(SpinRejected::RoundInProgress)
                );
                assert_eq!(engine.state().coins, 990);
                assert_eq!(engine.store().writes(), 0);
            }
            Step::Settled(report) => break report,
        }
    };
    assert_eq!(frames, 45);
    assert_eq!(engine.params().frames_per_round(), 45);
    assert_eq!(view.frames, 45);
    assert_eq!(view.grids, vec![CHERRY_TOP_ROW]);
    assert_eq!(report.grid, CHERRY_TOP_ROW);
    assert_eq!(engine.phase(), Phase::Idle);
}

#[test]
fn saved_state_reloads_exactly() {
    let mut engine = engine_with(MemoryStore::new(), CHERRY_TOP_ROW);
    for _ in 0..3 {
        engine.spin(RoundRequest::default(), &mut Recorder::default()).unwrap();
    }
    let (state, store, _) = engine.into_parts();
    assert_eq!(load_player(&store), state);

    let engine = engine_with(store, LOSING);
    assert_eq!(engine.state(), &state);
    assert_eq!(engine.state().wins, 3);
}

#[test]
fn failed_save_keeps_settled_state() {
    let params = EngineParams::default();
    let reels = scripted(CHERRY_TOP_ROW, params.frames_per_reel);
    let mut engine = RoundEngine::new(params, FailingStore::new(MemoryStore::new(), 1), reels);
    let report = engine.spin(RoundRequest::default(), &mut Recorder::default()).unwrap();
    assert!(!report.persisted);
    assert_eq!(engine.state().coins, 1040);
    assert_eq!(engine.phase(), Phase::Idle);
}

#[test]
fn failed_save_never_stores_half_a_round() {
    let mut before = PlayerState::with_coins(500);
    before.wins = 2;
    before.history.push(HistoryEntry {
        at: Utc::now(),
        outcome: Outcome::Win,
        coins: 500,
    });
    let mut inner = MemoryStore::new();
    save_player(&mut inner, &before).unwrap();

    let params = EngineParams::default();
    let reels = scripted(LOSING, params.frames_per_reel);
    let mut engine = RoundEngine::new(params, FailingStore::new(inner, 2), reels);
    let report = engine.spin(RoundRequest::default(), &mut Recorder::default()).unwrap();
    assert!(!report.persisted);
    assert_eq!(engine.state().coins, 490);
    assert_eq!(engine.state().history.len(), 2);

    let (_, store, _) = engine.into_parts();
    assert_eq!(load_player(&store), before);
}

#[test]
fn partial_config_takes_defaults_and_clamps() {
    let params = EngineParams {
        spin_cost: -5,
        history_limit: 0,
        frames_per_reel: 0,
        ..EngineParams::default()
    }
    .normalized();
    assert_eq!(params.spin_cost, 0);
    assert_eq!(params.history_limit, 1);
    assert_eq!(params.frames_per_reel, 1);
    assert_eq!(params.starting_coins, 1000);

    let engine = RoundEngine::new(
        EngineParams {
            history_limit: 0,
            ..EngineParams::default()
        },
        MemoryStore::new(),
        scripted(LOSING, 15),
    );
    assert_eq!(engine.params().history_limit, 1);
}
