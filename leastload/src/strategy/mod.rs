//! Slot ranking strategies.
//!
//! Each strategy is a total preorder over [`SlotChunk`]s where
//! [`Ordering::Less`] means "more favourable to receive work".  Strategies are
//! selected per job (or globally) through the tagged enum
//! [`StrategySelection`] and held together in a [`StrategySet`], so a
//! strategy that did not make the current decision still gets to update its
//! own bookkeeping through [`StrategySet::on_decision`].
//!
//! | Selection | Implementation | State |
//! |---|---|---|
//! | `most_idle` | [`MostIdleExecutors`] | none |
//! | `load_percentage` | [`LoadPercentage`] | none |
//! | `longest_unused` | [`LongestUnusedMachine`] | last-assigned time per host |

pub mod longest_unused;
pub mod most_idle;

pub use longest_unused::LongestUnusedMachine;
pub use most_idle::{LoadPercentage, MostIdleExecutors};

use std::cmp::Ordering;
use std::fmt;
use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

use crate::work::{Assignment, Batch, ChunkId, SlotChunk};

// ── Selection ─────────────────────────────────────────────────────────────────

/// Policy identifier, as configured per job or globally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategySelection {
    /// Never place with this balancer; always hand over to the fallback.
    Disabled,
    MostIdle,
    LongestUnused,
    LoadPercentage,
    /// Defer to the global default.  Only meaningful on a job.
    UseGlobal,
}

impl StrategySelection {
    /// Built-in default when neither the job nor the global configuration
    /// names a strategy.
    pub const BUILT_IN: StrategySelection = StrategySelection::MostIdle;

    pub fn as_str(self) -> &'static str {
        match self {
            StrategySelection::Disabled => "disabled",
            StrategySelection::MostIdle => "most_idle",
            StrategySelection::LongestUnused => "longest_unused",
            StrategySelection::LoadPercentage => "load_percentage",
            StrategySelection::UseGlobal => "use_global",
        }
    }
}

impl fmt::Display for StrategySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Strategy interface ────────────────────────────────────────────────────────

/// One slot ranking policy.
pub trait PlacementStrategy {
    fn name(&self) -> &'static str;

    /// `Less` = `a` should receive work before `b`.
    fn compare(&self, a: &SlotChunk, b: &SlotChunk) -> Ordering;

    /// Called after every decision, whichever strategy (or the fallback)
    /// produced it.
    fn on_assigned(&mut self, _batch: &Batch, _assignment: &Assignment, _at: Instant) {}
}

/// Shuffle `candidates` once (when there is more than one), then stable-sort
/// them with `strategy`.
///
/// The shuffle keeps the incoming worksheet order from biasing which of many
/// equally ranked hosts wins; the stable sort means two calls with the same
/// RNG state give the same result.
pub fn rank_candidates<R: Rng + ?Sized>(
    strategy: &dyn PlacementStrategy,
    batch: &Batch,
    mut candidates: Vec<ChunkId>,
    rng: &mut R,
) -> Vec<ChunkId> {
    if candidates.len() > 1 {
        candidates.shuffle(rng);
    }
    candidates.sort_by(|&a, &b| strategy.compare(batch.chunk(a), batch.chunk(b)));
    candidates
}

// ── StrategySet ───────────────────────────────────────────────────────────────

/// Owns one instance of every strategy.
#[derive(Debug, Default)]
pub struct StrategySet {
    most_idle: MostIdleExecutors,
    load_percentage: LoadPercentage,
    longest_unused: LongestUnusedMachine,
}

impl StrategySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The strategy implementing `selection`, or `None` for selections that
    /// do not name a ranking policy (`Disabled`, `UseGlobal`).
    pub fn get(&self, selection: StrategySelection) -> Option<&dyn PlacementStrategy> {
        match selection {
            StrategySelection::MostIdle => Some(&self.most_idle),
            StrategySelection::LoadPercentage => Some(&self.load_percentage),
            StrategySelection::LongestUnused => Some(&self.longest_unused),
            StrategySelection::Disabled | StrategySelection::UseGlobal => None,
        }
    }

    pub fn longest_unused(&self) -> &LongestUnusedMachine {
        &self.longest_unused
    }

    /// Fan a decision out to every strategy.
    pub fn on_decision(&mut self, batch: &Batch, assignment: &Assignment, at: Instant) {
        self.most_idle.on_assigned(batch, assignment, at);
        self.load_percentage.on_assigned(batch, assignment, at);
        self.longest_unused.on_assigned(batch, assignment, at);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
