//! spncrack — constrained preimage search for a small SPN
//! ======================================================
//! A 32-byte state is pushed through 256 rounds of **diffuse → substitute**
//! (a fixed 32×32 GF(2) bit matrix, then two byte tables applied to
//! even/odd positions) and finally XOR-compressed to 16 output bytes. This
//! crate recovers an *input* state producing a given 16-byte target.
//!
//! Brute force is hopeless (2^256 states) and the substitution tables are
//! not even bijective, so the engine works backwards instead:
//!
//! * **exact linear inversion** — the diffusion matrix is inverted once
//!   over GF(2) ([`BitMatrix::invert`]);
//! * **inverse relation** — every table output byte is classified as
//!   dead-end / forced / branching from its preimage set ([`SboxInverse`]);
//! * **constructive seeding** — final-round states satisfying the target
//!   compression are enumerated outright, never sampled blindly
//!   ([`SeedSpace`]);
//! * **backtracking walk** — rounds are unwound depth-first with fail-fast
//!   dead-end pruning, optional lookahead branch ranking, and explicit
//!   node/time budgets ([`Solver`]).
//!
//! ```no_run
//! use spncrack::{challenge, Solver};
//!
//! # fn main() -> Result<(), spncrack::SolveError> {
//! let spn = challenge::spn()?;
//! let solved = Solver::new(&spn, challenge::TARGET).solve()?;
//! assert_eq!(spn.transform(solved.state()), challenge::TARGET);
//! println!("preimage found after {} nodes", solved.stats.nodes);
//! # Ok(())
//! # }
//! ```
//!
//! Everything is deterministic: randomness comes only from a seedable RNG
//! in the solver configuration, and diagnostics are returned as explicit
//! counters rather than accumulated in globals. With the `parallel`
//! feature, independent seeds can be fanned out over a Rayon pool
//! (`solver::solve_parallel`).

pub mod challenge;
pub mod error;
pub mod heuristic;
pub mod matrix;
pub mod sbox;
pub mod seed;
pub mod solver;
pub mod spn;

pub use error::SolveError;
pub use matrix::BitMatrix;
pub use sbox::{Classify, SboxInverse};
pub use seed::{SeedSpace, SeedStrategy};
pub use solver::{SearchMode, SearchStats, Solved, Solver, SolverConfig};
pub use spn::Spn;

/// Bytes in one internal state.
pub const STATE_BYTES: usize = 32;
/// Bytes in the compressed output / target.
pub const TARGET_BYTES: usize = 16;

/// One round's internal state.
pub type State = [u8; STATE_BYTES];
/// The compressed output the search must hit.
pub type Output = [u8; TARGET_BYTES];
