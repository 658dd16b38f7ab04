use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use slotgrid_core::{
    load_or_start, save_player, Difficulty, EngineParams, KeyValueStore, Leverage, PlayerState,
    Presenter, ProvablyFairRng, RoundEngine, RoundReport, RoundRequest, SpinRejected, Step,
    SymbolGenerator, SymbolSource,
};
use tracing_subscriber::EnvFilter;

mod store;
mod terminal;

use store::open_store;
use terminal::TerminalPresenter;

#[derive(Parser)]
#[command(name = "slotgrid", about = "3x3 slot machine in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Where the player is saved: a JSON file path or sqlite://file.db
    #[arg(long, env = "SLOTGRID_STORE", default_value = "slotgrid.json")]
    store: String,
    /// TOML file overriding engine parameters
    #[arg(long, env = "SLOTGRID_CONFIG")]
    config: Option<PathBuf>,
    /// Server seed for a replayable provably-fair session
    #[arg(long, env = "SLOTGRID_SEED")]
    seed: Option<String>,
    /// Client seed paired with --seed
    #[arg(long, default_value = "slotgrid")]
    client_seed: String,
    /// Nonce paired with --seed
    #[arg(long, default_value_t = 0)]
    nonce: u64,
    /// Delay between animation frames in milliseconds
    #[arg(long, default_value_t = 50)]
    frame_ms: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session: Enter spins, `d <mode>`, `l <n>`, `t`, `h`, `q`
    Play {
        #[arg(long, default_value = "normal")]
        difficulty: String,
        #[arg(long, default_value = "1", allow_hyphen_values = true)]
        leverage: String,
    },
    /// Spin a number of rounds and print each result
    Spin {
        #[arg(long, default_value_t = 1)]
        count: u32,
        #[arg(long, default_value = "normal")]
        difficulty: String,
        #[arg(long, default_value = "1", allow_hyphen_values = true)]
        leverage: String,
        /// Skip the reel animation
        #[arg(long)]
        quiet: bool,
    },
    /// View the last N history entries, most recent first
    History {
        #[arg(default_value_t = 10)]
        n: usize,
    },
    /// Show balance and win count
    Stats,
    /// Export the spin history to a CSV path
    ExportCsv { path: PathBuf },
    /// Start over with the starting balance and an empty history
    Reset,
}

fn load_params(path: Option<&PathBuf>) -> anyhow::Result<EngineParams> {
    let params: EngineParams = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => EngineParams::default(),
    };
    Ok(params.normalized())
}

fn session_rng(cli: &Cli) -> Box<dyn RngCore> {
    match &cli.seed {
        Some(seed) => {
            let rng = ProvablyFairRng::new(seed.as_str(), cli.client_seed.as_str(), cli.nonce);
            println!(
                "provably fair session: server_seed_hash={} client_seed={} nonce={}",
                rng.server_seed_hash_hex(),
                cli.client_seed,
                cli.nonce
            );
            Box::new(rng)
        }
        None => Box::new(StdRng::from_entropy()),
    }
}

/// Plays one round, pausing between frames so the reels visibly turn.
fn play_round<S, G, P>(
    engine: &mut RoundEngine<S, G>,
    request: RoundRequest,
    presenter: &mut P,
    frame_delay: Duration,
) -> Result<RoundReport, SpinRejected>
where
    S: KeyValueStore,
    G: SymbolSource,
    P: Presenter,
{
    engine.start(request, presenter)?;
    loop {
        match engine.advance(presenter) {
            Some(Step::Frame(_)) => {
                if !frame_delay.is_zero() {
                    thread::sleep(frame_delay);
                }
            }
            Some(Step::Settled(report)) => return Ok(report),
            None => return Err(SpinRejected::RoundInProgress),
        }
    }
}

/// What to print for a refused spin. The presenter already shows the
/// insufficient-coins message.
fn rejection_line(e: &SpinRejected) -> Option<String> {
    match e {
        SpinRejected::InsufficientCoins { .. } => None,
        other => Some(other.to_string()),
    }
}

fn print_history(state: &PlayerState, n: usize) {
    let entries = state.recent_history(n);
    if entries.is_empty() {
        println!("No spins yet.");
    }
    for entry in entries {
        println!("{entry}");
    }
}

fn interactive<S: KeyValueStore, G: SymbolSource>(
    engine: &mut RoundEngine<S, G>,
    mut request: RoundRequest,
    frame_delay: Duration,
) -> anyhow::Result<()> {
    let mut view = TerminalPresenter::new(io::stdout(), !frame_delay.is_zero());
    engine.refresh(&mut view);
    let stdin = io::stdin();
    loop {
        print!("[{} {}] spin for {} > ", request.difficulty, request.leverage, engine.params().spin_cost);
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (None, _) | (Some("s" | "spin"), _) => {
                if let Err(e) = play_round(engine, request, &mut view, frame_delay) {
                    if let Some(line) = rejection_line(&e) {
                        println!("{line}");
                    }
                }
            }
            (Some("d"), Some(mode)) => request.difficulty = Difficulty::from_label(mode),
            (Some("l"), Some(n)) => request.leverage = Leverage::parse_lenient(n),
            (Some("t"), _) => {
                let theme = view.toggle_theme();
                println!("theme: {theme:?}");
            }
            (Some("h"), n) => print_history(engine.state(), n.and_then(|n| n.parse().ok()).unwrap_or(10)),
            (Some("q" | "quit"), _) => break,
            _ => println!("commands: <enter> spin | d <easy|normal|hard> | l <n> | t theme | h [n] | q"),
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let cli = Cli::parse();
    let params = load_params(cli.config.as_ref())?;
    let mut store = open_store(&cli.store)?;
    let frame_delay = Duration::from_millis(cli.frame_ms);

    match &cli.command {
        Commands::Play {
            difficulty,
            leverage,
        } => {
            let reels = SymbolGenerator::new(session_rng(&cli));
            let mut engine = RoundEngine::new(params, store, reels);
            interactive(&mut engine, RoundRequest::from_labels(difficulty, leverage), frame_delay)?;
        }
        Commands::Spin {
            count,
            difficulty,
            leverage,
            quiet,
        } => {
            let reels = SymbolGenerator::new(session_rng(&cli));
            let mut engine = RoundEngine::new(params, store, reels);
            let delay = if *quiet { Duration::ZERO } else { frame_delay };
            let mut view = TerminalPresenter::new(io::stdout(), !delay.is_zero());
            let request = RoundRequest::from_labels(difficulty, leverage);
            for _ in 0..*count {
                if let Err(e) = play_round(&mut engine, request, &mut view, delay) {
                    println!("{e}");
                    break;
                }
            }
        }
        Commands::History { n } => print_history(&load_or_start(&store, params.starting_coins), *n),
        Commands::Stats => {
            let state = load_or_start(&store, params.starting_coins);
            println!("Coins: {}", state.coins);
            println!("Wins: {}", state.wins);
            println!("Spins logged: {}", state.history.len());
        }
        Commands::ExportCsv { path } => {
            let state = load_or_start(&store, params.starting_coins);
            let mut wtr = csv::Writer::from_path(path)?;
            wtr.write_record(["time", "outcome", "coins"])?;
            for entry in &state.history {
                wtr.write_record([
                    entry.at.to_rfc3339(),
                    entry.outcome.to_string(),
                    entry.coins.to_string(),
                ])?;
            }
            wtr.flush()?;
            println!("Exported {} rows to {}", state.history.len(), path.display());
        }
        Commands::Reset => {
            save_player(&mut store, &PlayerState::with_coins(params.starting_coins))?;
            println!("Reset to {} coins.", params.starting_coins);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotgrid_core::{MemoryStore, NullPresenter};

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slotgrid.toml");
        std::fs::write(&path, "spin_cost = 25\nhistory_display = 5\n").unwrap();
        let params = load_params(Some(&path)).unwrap();
        assert_eq!(params.spin_cost, 25);
        assert_eq!(params.starting_coins, 1000);
        assert_eq!(params.history_limit, 50);
        assert_eq!(params.frames_per_reel, 15);
    }

    #[test]
    fn out_of_range_config_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slotgrid.toml");
        std::fs::write(&path, "spin_cost = -5\nhistory_limit = 0\nframes_per_reel = 0\n").unwrap();
        let params = load_params(Some(&path)).unwrap();
        assert_eq!(params.spin_cost, 0);
        assert_eq!(params.history_limit, 1);
        assert_eq!(params.frames_per_reel, 1);
    }

    #[test]
    fn only_unexpected_rejections_are_printed() {
        assert_eq!(rejection_line(&SpinRejected::InsufficientCoins { coins: 5, cost: 10 }), None);
        assert!(rejection_line(&SpinRejected::RoundInProgress).is_some());
    }

    #[test]
    fn overlapping_round_is_reported() {
        let mut engine = RoundEngine::new(
            EngineParams::default(),
            MemoryStore::new(),
            SymbolGenerator::new(StdRng::seed_from_u64(7)),
        );
        let mut view = NullPresenter;
        engine.start(RoundRequest::default(), &mut view).unwrap();
        let err = play_round(&mut engine, RoundRequest::default(), &mut view, Duration::ZERO).unwrap_err();
        assert_eq!(err, SpinRejected::RoundInProgress);
        assert!(rejection_line(&err).is_some());
    }

    #[test]
    fn no_config_is_default() {
        assert_eq!(load_params(None).unwrap(), EngineParams::default());
    }

    #[test]
    fn unreadable_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slotgrid.toml");
        std::fs::write(&path, "spin_cost = \"ten\"").unwrap();
        assert!(load_params(Some(&path)).is_err());
        assert!(load_params(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
