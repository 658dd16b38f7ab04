use slotgrid_core::{
    Difficulty, EngineParams, Leverage, MemoryStore, NullPresenter, ProvablyFairRng, RoundEngine,
    RoundRequest, SymbolGenerator,
};

fn main() {
    // Example end-to-end spin
    let server_seed = "example-server-seed";
    let client_seed = "example-client-seed";
    let nonce = 1u64;
    let rng = ProvablyFairRng::new(server_seed, client_seed, nonce);
    println!("server_seed_hash={}", rng.server_seed_hash_hex());

    let mut engine = RoundEngine::new(EngineParams::default(), MemoryStore::new(), SymbolGenerator::new(rng));
    let request = RoundRequest::new(Difficulty::Hard, Leverage::from_raw(2));
    match engine.spin(request, &mut NullPresenter) {
        Ok(report) => println!(
            "{}\noutcome={} payout={} coins={}",
            report.grid, report.outcome, report.payout, engine.state().coins
        ),
        Err(e) => println!("spin rejected: {e}"),
    }
}
