//! Backward depth-first preimage search.
//!
//! The solver starts from a seeded final-round state (which already
//! satisfies the target compression, see [`SeedSpace`]) and walks the
//! rounds backwards. One backward step:
//!
//! 1. undo the substitution — classify every byte of the current state;
//!    a dead end anywhere kills the candidate outright, forced bytes are
//!    fixed, branching bytes fan out;
//! 2. enumerate the branch combinations (mixed-radix, lexicographic by
//!    default, ranked by the one-step lookahead when the heuristic is on);
//! 3. apply the inverse diffusion to each assembled pre-substitution
//!    vector, yielding the previous round's state candidate.
//!
//! Reaching round 0 yields a fully determined input state. The recursion is
//! an explicit stack of choice frames, so long round counts cannot overflow
//! the call stack. Preimage-list sizes over a random byte average exactly
//! one, which makes the branch tree a critical branching process: most seeds
//! die within a few rounds and a rare one explodes. The per-seed node cap
//! cuts the explosions short, the outer loop simply moves on to the next
//! seed, and the global node/time budgets bound the whole search.
//!
//! All instrumentation is threaded through [`SearchStats`] on the result;
//! there is no process-wide mutable state, so concurrent searches over the
//! same [`Spn`] cannot interfere.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, trace};

use crate::error::SolveError;
use crate::heuristic::{self, decode_combination};
use crate::seed::{SeedSpace, SeedStrategy};
use crate::spn::Spn;
use crate::{Output, State, STATE_BYTES};

/// Stop at the first accepted solution, or keep exhausting seed subtrees
/// until `limit` solutions are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    First,
    All { limit: usize },
}

#[derive(Clone)]
pub struct SolverConfig {
    pub mode: SearchMode,
    pub seed_strategy: SeedStrategy,
    /// How many seeds to draw before reporting exhaustion.
    pub seed_attempts: u64,
    /// Seed for the injected RNG; identical configurations replay the exact
    /// same search.
    pub rng_seed: u64,
    /// Rank branch combinations by one-step lookahead.
    pub use_heuristic: bool,
    /// Global cap on visited nodes across all seeds.
    pub node_budget: Option<u64>,
    /// Per-seed cap: a seed whose subtree outgrows this is abandoned (not an
    /// error) and the next seed is drawn.
    pub nodes_per_seed: Option<u64>,
    pub time_budget: Option<Duration>,
    /// Extra predicate a round-0 state must satisfy; `None` accepts any
    /// fully determined state.
    pub accept: Option<fn(&State) -> bool>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::First,
            seed_strategy: SeedStrategy::Random,
            seed_attempts: 1 << 16,
            rng_seed: 0x5eed,
            use_heuristic: false,
            node_budget: Some(1 << 24),
            nodes_per_seed: Some(1 << 20),
            time_budget: None,
            accept: None,
        }
    }
}

/// Explicit diagnostic counters, accumulated across every seed of one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Candidate states generated (one per inverse-diffusion application).
    pub nodes: u64,
    /// Candidates killed because some byte had no preimage.
    pub dead_ends: u64,
    /// Frames with more than one combination.
    pub branch_points: u64,
    pub seeds_tried: u64,
    pub solutions: u64,
    pub elapsed: Duration,
}

impl SearchStats {
    /// Fold another run's counters into this one (used when merging the
    /// per-worker stats of a parallel search).
    pub fn absorb(&mut self, other: &SearchStats) {
        self.nodes += other.nodes;
        self.dead_ends += other.dead_ends;
        self.branch_points += other.branch_points;
        self.seeds_tried += other.seeds_tried;
        self.solutions += other.solutions;
        self.elapsed = self.elapsed.max(other.elapsed);
    }
}

/// A successful search: every state forward-transforms to the target.
#[derive(Debug, Clone)]
pub struct Solved {
    pub solutions: Vec<State>,
    pub stats: SearchStats,
}

impl Solved {
    /// The first solution found.
    pub fn state(&self) -> &State {
        &self.solutions[0]
    }
}

/// One open round of the backward walk: the per-position candidate slices
/// and a cursor over their mixed-radix combination space.
struct Frame<'a> {
    sets: [&'a [u8]; STATE_BYTES],
    total: u64,
    next: u64,
    order: Option<Vec<u32>>,
}

/// Why the walk over one seed (or the whole seed loop) stopped.
enum Flow {
    /// Mode-dependent success: first solution, or the find-all limit.
    Done,
    /// Subtree exhausted or abandoned; try the next seed.
    Continue,
    NodeBudget,
    SeedBudget,
    TimeBudget,
    Cancelled,
}

pub struct Solver<'a> {
    spn: &'a Spn,
    target: Output,
    config: SolverConfig,
}

impl<'a> Solver<'a> {
    pub fn new(spn: &'a Spn, target: Output) -> Self {
        Self::with_config(spn, target, SolverConfig::default())
    }

    pub fn with_config(spn: &'a Spn, target: Output, config: SolverConfig) -> Self {
        Self { spn, target, config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Run the search to completion.
    pub fn solve(&self) -> Result<Solved, SolveError> {
        self.solve_with_cancel(None)
    }

    /// Run the search, additionally stopping as soon as `cancel` flips to
    /// true (checked between node expansions). Used by the parallel driver;
    /// also handy for embedding the solver under an external watchdog.
    pub fn solve_with_cancel(&self, cancel: Option<&AtomicBool>) -> Result<Solved, SolveError> {
        let started = Instant::now();
        let mut stats = SearchStats::default();
        let mut found = Vec::new();

        let space = SeedSpace::build(self.spn, &self.target);
        if !space.is_satisfiable() {
            stats.elapsed = started.elapsed();
            return Err(SolveError::SearchExhausted { stats });
        }

        let mut rng = StdRng::seed_from_u64(self.config.rng_seed);
        let mut flow = Flow::Continue;
        while stats.seeds_tried < self.config.seed_attempts {
            // Most seeds die within a handful of nodes, so the per-seed
            // check is the one that actually enforces the deadline.
            if let Some(budget) = self.config.time_budget {
                if started.elapsed() >= budget {
                    flow = Flow::TimeBudget;
                    break;
                }
            }
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                flow = Flow::Cancelled;
                break;
            }
            let Some(seed) = space.pick(self.config.seed_strategy, &mut rng) else {
                break;
            };
            stats.seeds_tried += 1;
            flow = self.search_seed(&seed, started, cancel, &mut stats, &mut found);
            match flow {
                Flow::Continue | Flow::SeedBudget => continue,
                _ => break,
            }
        }
        stats.elapsed = started.elapsed();
        stats.solutions = found.len() as u64;

        if matches!(flow, Flow::NodeBudget) {
            // Budgets outrank partial find-all results.
            let budget = self.config.node_budget.unwrap_or(u64::MAX);
            return Err(SolveError::BudgetExceeded { budget, stats });
        }
        if matches!(flow, Flow::TimeBudget) {
            let budget = self.config.time_budget.unwrap_or_default();
            return Err(SolveError::Timeout { budget, stats });
        }
        if found.is_empty() {
            debug!(
                seeds = stats.seeds_tried,
                nodes = stats.nodes,
                "search exhausted without a solution"
            );
            return Err(SolveError::SearchExhausted { stats });
        }

        debug_assert!(found
            .iter()
            .all(|state| self.spn.transform(state) == self.target));
        debug!(
            seeds = stats.seeds_tried,
            nodes = stats.nodes,
            solutions = found.len(),
            "search succeeded"
        );
        Ok(Solved { solutions: found, stats })
    }

    /// Exhaust (or abandon) the backward subtree of one seed.
    fn search_seed(
        &self,
        seed: &State,
        started: Instant,
        cancel: Option<&AtomicBool>,
        stats: &mut SearchStats,
        found: &mut Vec<State>,
    ) -> Flow {
        let rounds = self.spn.rounds();
        if rounds == 0 {
            // Nothing to invert; the seed itself is the input state.
            return self.emit(*seed, found);
        }

        let seed_floor = stats.nodes;
        let Some(root) = self.open_frame(seed, stats) else {
            return Flow::Continue; // seed dies on its first backward step
        };
        let mut frames: Vec<Frame<'a>> = Vec::with_capacity(rounds);
        frames.push(root);

        while let Some(top) = frames.last_mut() {
            if top.next >= top.total {
                frames.pop();
                continue;
            }
            let combo = match &top.order {
                Some(order) => order[top.next as usize] as u64,
                None => top.next,
            };
            top.next += 1;

            let presub = decode_combination(&top.sets, combo);
            let prev = self.spn.inverse_diffusion().apply(&presub);
            stats.nodes += 1;

            if let Some(budget) = self.config.node_budget {
                if stats.nodes >= budget {
                    return Flow::NodeBudget;
                }
            }
            if let Some(cap) = self.config.nodes_per_seed {
                if stats.nodes - seed_floor >= cap {
                    trace!(nodes = stats.nodes - seed_floor, "seed abandoned, subtree too large");
                    return Flow::SeedBudget;
                }
            }
            // Clock and flag reads are amortised over 1024 expansions.
            if stats.nodes % 1024 == 0 {
                if let Some(budget) = self.config.time_budget {
                    if started.elapsed() >= budget {
                        return Flow::TimeBudget;
                    }
                }
                if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                    return Flow::Cancelled;
                }
            }

            if frames.len() == rounds {
                // `prev` is a fully determined round-0 state.
                if let Flow::Done = self.emit(prev, found) {
                    return Flow::Done;
                }
                continue;
            }
            if let Some(frame) = self.open_frame(&prev, stats) {
                frames.push(frame);
            }
        }
        Flow::Continue
    }

    /// Undo the substitution of one state: collect per-position preimage
    /// slices, pruning immediately on any dead end.
    fn open_frame(&self, state: &State, stats: &mut SearchStats) -> Option<Frame<'a>> {
        let mut sets: [&'a [u8]; STATE_BYTES] = [&[]; STATE_BYTES];
        for (pos, &y) in state.iter().enumerate() {
            let pre = self.spn.preimages_at(pos, y);
            if pre.is_empty() {
                stats.dead_ends += 1;
                return None;
            }
            sets[pos] = pre;
        }
        // Saturating: degenerate tables can overflow u64 combination counts.
        let total = sets
            .iter()
            .fold(1u64, |acc, s| acc.saturating_mul(s.len() as u64));
        if total > 1 {
            stats.branch_points += 1;
        }
        let order = if self.config.use_heuristic {
            heuristic::rank_combinations(self.spn, &sets, total)
        } else {
            None
        };
        Some(Frame { sets, total, next: 0, order })
    }

    /// Record an accepted round-0 state; decide whether the search is done.
    fn emit(&self, state: State, found: &mut Vec<State>) -> Flow {
        if let Some(accept) = self.config.accept {
            if !accept(&state) {
                return Flow::Continue;
            }
        }
        found.push(state);
        match self.config.mode {
            SearchMode::First => Flow::Done,
            SearchMode::All { limit } => {
                if found.len() >= limit {
                    Flow::Done
                } else {
                    Flow::Continue
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parallel seed fan-out (feature `parallel`)
// ---------------------------------------------------------------------------

/// Distribute the seed attempts over `workers` rayon tasks.
///
/// Workers share only the immutable [`Spn`] and a cancellation flag; each
/// owns a derived RNG (`rng_seed + worker index`) and its own stats. The
/// first worker to find a solution flips the flag and the rest stand down at
/// their next check. Stats from all workers are merged into the result.
#[cfg(feature = "parallel")]
pub fn solve_parallel(
    spn: &Spn,
    target: Output,
    config: SolverConfig,
    workers: usize,
) -> Result<Solved, SolveError> {
    use rayon::prelude::*;

    let workers = workers.max(1);
    let cancel = AtomicBool::new(false);
    let per_worker = (config.seed_attempts / workers as u64).max(1);

    let results: Vec<Result<Solved, SolveError>> = (0..workers)
        .into_par_iter()
        .map(|w| {
            let mut cfg = config.clone();
            cfg.rng_seed = config.rng_seed.wrapping_add(w as u64);
            cfg.seed_attempts = per_worker;
            let outcome =
                Solver::with_config(spn, target, cfg).solve_with_cancel(Some(&cancel));
            if outcome.is_ok() {
                cancel.store(true, Ordering::Relaxed);
            }
            outcome
        })
        .collect();

    let mut merged = SearchStats::default();
    for stats in results.iter().filter_map(|r| match r {
        Ok(solved) => Some(&solved.stats),
        Err(e) => e.stats(),
    }) {
        merged.absorb(stats);
    }

    let mut best: Option<Solved> = None;
    let mut failure: Option<SolveError> = None;
    for result in results {
        match result {
            Ok(mut solved) => {
                let winner = match &best {
                    // Earliest finisher wins; keeps the outcome stable even
                    // though several workers can succeed before the flag
                    // propagates.
                    Some(current) => solved.stats.elapsed < current.stats.elapsed,
                    None => true,
                };
                if winner {
                    solved.stats = merged;
                    best = Some(solved);
                }
            }
            Err(e @ (SolveError::BudgetExceeded { .. } | SolveError::Timeout { .. })) => {
                failure.get_or_insert(e);
            }
            Err(_) => {}
        }
    }
    match best {
        Some(solved) => Ok(solved),
        None => Err(match failure {
            Some(SolveError::BudgetExceeded { budget, .. }) => {
                SolveError::BudgetExceeded { budget, stats: merged }
            }
            Some(SolveError::Timeout { budget, .. }) => {
                SolveError::Timeout { budget, stats: merged }
            }
            _ => SolveError::SearchExhausted { stats: merged },
        }),
    }
}
