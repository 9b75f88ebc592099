//! Solve the shipped 256-round instance and print the recovered input.

use spncrack::{challenge, Solver};

fn main() -> Result<(), spncrack::SolveError> {
    let spn = challenge::spn()?;
    let solver = Solver::new(&spn, challenge::TARGET);

    println!(
        "searching a preimage of {:?} over {} rounds...",
        String::from_utf8_lossy(&challenge::TARGET[..15]),
        spn.rounds()
    );
    let solved = solver.solve()?;
    let stats = &solved.stats;

    println!("input state : {}", hex::encode(solved.state()));
    println!(
        "forward     : {}",
        hex::encode(spn.transform(solved.state()))
    );
    println!(
        "work        : {} seeds, {} nodes, {} dead ends, {} branch points in {:.2?}",
        stats.seeds_tried, stats.nodes, stats.dead_ends, stats.branch_points, stats.elapsed
    );
    Ok(())
}
