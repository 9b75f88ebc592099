//! Error taxonomy of the search engine.
//!
//! Dead ends and failed branches are ordinary control flow inside the
//! solver and never show up here; only three things cross the boundary to
//! the caller: a non-invertible diffusion layer, a fully explored search
//! space, and an exceeded budget. The two search failures carry the
//! diagnostic counters so callers can tell "explored and empty" apart from
//! "ran out of budget".

use std::time::Duration;

use thiserror::Error;

use crate::solver::SearchStats;

#[derive(Debug, Clone, Error)]
pub enum SolveError {
    #[error("diffusion matrix is singular (no pivot in column {column})")]
    SingularMatrix { column: usize },

    #[error(
        "search exhausted: {} seeds and {} nodes explored without a solution",
        .stats.seeds_tried,
        .stats.nodes
    )]
    SearchExhausted { stats: SearchStats },

    #[error("node budget of {budget} exceeded after {} seeds", .stats.seeds_tried)]
    BudgetExceeded { budget: u64, stats: SearchStats },

    #[error("time budget of {budget:?} exceeded after {} nodes", .stats.nodes)]
    Timeout { budget: Duration, stats: SearchStats },
}

impl SolveError {
    /// Diagnostic counters of a terminated search, when the variant has any.
    pub fn stats(&self) -> Option<&SearchStats> {
        match self {
            SolveError::SingularMatrix { .. } => None,
            SolveError::SearchExhausted { stats }
            | SolveError::BudgetExceeded { stats, .. }
            | SolveError::Timeout { stats, .. } => Some(stats),
        }
    }
}
