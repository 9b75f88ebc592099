//! Collect several distinct preimages of the shipped instance and emit
//! them as JSON, ready to be stored and replayed as future seeds.

use serde::Serialize;
use spncrack::{challenge, SearchMode, Solver, SolverConfig};

#[derive(Serialize)]
struct Report {
    target: String,
    rounds: usize,
    solutions: Vec<String>,
    seeds_tried: u64,
    nodes: u64,
    dead_ends: u64,
    elapsed_ms: u128,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let spn = challenge::spn()?;
    let config = SolverConfig {
        mode: SearchMode::All { limit: 4 },
        ..SolverConfig::default()
    };
    let solved = Solver::with_config(&spn, challenge::TARGET, config).solve()?;

    for state in &solved.solutions {
        assert_eq!(spn.transform(state), challenge::TARGET);
    }
    let report = Report {
        target: hex::encode(challenge::TARGET),
        rounds: spn.rounds(),
        solutions: solved.solutions.iter().map(hex::encode).collect(),
        seeds_tried: solved.stats.seeds_tried,
        nodes: solved.stats.nodes,
        dead_ends: solved.stats.dead_ends,
        elapsed_ms: solved.stats.elapsed.as_millis(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
