/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Least-load placement balancer.
//!
//! [`LeastLoadBalancer`] is called by the host once per queued task with a
//! worksheet ([`Batch`]) of work items and candidate slot chunks.  It picks a
//! ranking policy for the task, narrows the candidates to hosts that have not
//! yet been given work in the current round, ranks them and runs a greedy
//! backtracking search validated by the host's [`CompatibilityOracle`].
//!
//! # Per-call flow
//!
//! ```text
//! START ─▶ disabled? ─yes─▶ fallback
//!            │no
//!            ▼
//!      RESOLVE_POLICY ─▶ FILTER_AVAILABLE ─▶ [REFRESH]* ─▶ RANK ─▶ SEARCH
//!                                                                   │
//!                          success: MARK_USED ─▶ RETURN assignment ◀┤
//!                     failure: DIAGNOSE ─▶ RETURN none / fallback ◀─┘
//! ```
//!
//! Failures never surface as errors: every [`PlacementError`] is logged, its
//! [`FailureDiagnostics`] are recorded and the configured [`FailurePolicy`]
//! decides between "no decision" and delegating to the fallback.
//!
//! `decide` takes `&mut self`, so one balancer serves one decision at a time.
//! Hosts that decide from several threads wrap it in a `Mutex`.

pub mod diagnostics;
pub mod error;
pub mod round;
pub mod search;

pub use diagnostics::{FailureDiagnostics, WorkAvailability};
pub use error::PlacementError;
pub use round::RoundState;
pub use search::{assign_greedily, SearchOutcome};

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{debug, debug_span, error, info, warn};

use crate::fallback::FallbackBalancer;
use crate::oracle::CompatibilityOracle;
use crate::pool::ResourcePool;
use crate::strategy::{rank_candidates, PlacementStrategy, StrategySelection, StrategySet};
use crate::work::{Assignment, Batch, ChunkId, Task};

// ── Settings ──────────────────────────────────────────────────────────────────

/// What to do when the balancer is enabled for a task but cannot place it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Return no decision; the task stays queued and is retried later.
    #[default]
    NoDecision,
    /// Hand the task to the fallback balancer.
    Delegate,
}

/// The `balancer:` section of the fleet configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BalancerSettings {
    /// Process-wide default for jobs without an override.  `None` means the
    /// built-in default ([`StrategySelection::BUILT_IN`]).
    pub global_strategy: Option<StrategySelection>,
    pub failure_policy: FailurePolicy,
    /// Seed for the candidate shuffle.  Unset → seeded from the OS.
    pub shuffle_seed: Option<u64>,
}

/// Where a task goes after policy resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Straight to the fallback, with the reason for the log line.
    Delegate(&'static str),
    /// Least-load placement with the given ranking policy.
    Place(StrategySelection),
}

// ── LeastLoadBalancer ─────────────────────────────────────────────────────────

pub struct LeastLoadBalancer {
    settings: BalancerSettings,
    pool: Arc<dyn ResourcePool>,
    fallback: Box<dyn FallbackBalancer>,
    strategies: StrategySet,
    round: RoundState,
    rng: StdRng,
    last_failure: Option<FailureDiagnostics>,
}

impl LeastLoadBalancer {
    /// Create a balancer with an empty round; the first decision refreshes
    /// it from `pool`.
    pub fn new(
        settings: BalancerSettings,
        pool: Arc<dyn ResourcePool>,
        fallback: Box<dyn FallbackBalancer>,
    ) -> Self {
        let rng = match settings.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        info!(
            global_strategy = ?settings.global_strategy,
            failure_policy = ?settings.failure_policy,
            seeded = settings.shuffle_seed.is_some(),
            "least-load balancer created"
        );
        Self {
            settings,
            pool,
            fallback,
            strategies: StrategySet::new(),
            round: RoundState::new(),
            rng,
            last_failure: None,
        }
    }

    pub fn settings(&self) -> &BalancerSettings {
        &self.settings
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.settings.failure_policy
    }

    pub fn round(&self) -> &RoundState {
        &self.round
    }

    pub fn strategies(&self) -> &StrategySet {
        &self.strategies
    }

    /// Diagnostics of the previous call, if it failed.
    pub fn last_failure(&self) -> Option<&FailureDiagnostics> {
        self.last_failure.as_ref()
    }

    /// Forget the current round; the next decision starts a new one.
    pub fn reset_round(&mut self) {
        self.round = RoundState::new();
    }

    /// Record a decision the host made without this balancer so the
    /// strategies' bookkeeping stays accurate.  Decisions returned by
    /// [`decide`](Self::decide) are recorded automatically.
    pub fn on_decision(&mut self, batch: &Batch, assignment: &Assignment) {
        self.strategies.on_decision(batch, assignment, Instant::now());
    }

    // ── Policy resolution ─────────────────────────────────────────────────────

    /// Job override → global default → built-in default.
    pub fn resolve(&self, task: &Task) -> Resolution {
        let Some(job) = &task.owner else {
            return Resolution::Delegate("task has no owning job");
        };
        if job.disabled {
            return Resolution::Delegate("disabled for job");
        }

        let selection = match job.strategy {
            Some(s) if job.is_overridden() => s,
            _ => self
                .settings
                .global_strategy
                .unwrap_or(StrategySelection::BUILT_IN),
        };

        match selection {
            StrategySelection::Disabled => Resolution::Delegate("disabled by selection"),
            other => Resolution::Place(other),
        }
    }

    // ── Public entry point ────────────────────────────────────────────────────

    /// Map every work item of `batch` to a chunk, or return `None` to leave
    /// the task queued.
    ///
    /// A returned assignment is always complete and accepted by `oracle`.
    pub fn decide(
        &mut self,
        task: &Task,
        batch: &Batch,
        oracle: &dyn CompatibilityOracle,
    ) -> Option<Assignment> {
        let trace_id = format!("{:08x}", self.rng.gen::<u32>());
        let span = debug_span!("decide", trace_id = %trace_id, task = %task.name);
        let _enter = span.enter();

        let started = Instant::now();
        self.last_failure = None;

        let (decision, outcome) = match self.resolve(task) {
            Resolution::Delegate(reason) => {
                debug!(reason, "least-load balancing not enabled, delegating to fallback");
                self.delegate(task, batch, oracle)
            }
            Resolution::Place(selection) => match self.place(task, selection, batch, oracle) {
                Ok(assignment) => (Some(assignment), "mapped"),
                Err(err) => self.handle_failure(task, batch, oracle, err),
            },
        };

        if let Some(assignment) = &decision {
            self.strategies.on_decision(batch, assignment, Instant::now());
        }

        debug!(
            elapsed_us = started.elapsed().as_micros() as u64,
            outcome,
            "decision finished"
        );
        decision
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn delegate(
        &self,
        task: &Task,
        batch: &Batch,
        oracle: &dyn CompatibilityOracle,
    ) -> (Option<Assignment>, &'static str) {
        match self.fallback.map(task, batch, oracle) {
            Some(assignment) => (Some(assignment), "fallback -> mapped"),
            None => (None, "fallback -> no decision"),
        }
    }

    fn handle_failure(
        &mut self,
        task: &Task,
        batch: &Batch,
        oracle: &dyn CompatibilityOracle,
        err: PlacementError,
    ) -> (Option<Assignment>, &'static str) {
        match &err {
            PlacementError::ConfigurationFault { .. } => {
                error!(error = %err, "balancer misconfigured")
            }
            e if e.is_expected() => debug!(error = %e, "no assignment possible now"),
            e => warn!(error = %e, "placement failed"),
        }

        let diagnostics = FailureDiagnostics::collect(batch, &self.round, &err);
        diagnostics.emit(&task.name, &err);
        self.last_failure = Some(diagnostics);

        match self.settings.failure_policy {
            FailurePolicy::NoDecision => (None, err.outcome()),
            FailurePolicy::Delegate => self.delegate(task, batch, oracle),
        }
    }

    /// The least-load path proper.  Leaves the round untouched on failure
    /// apart from refreshes, which always replace it wholesale.
    fn place(
        &mut self,
        task: &Task,
        selection: StrategySelection,
        batch: &Batch,
        oracle: &dyn CompatibilityOracle,
    ) -> Result<Assignment, PlacementError> {
        let strategy = self
            .strategies
            .get(selection)
            .ok_or(PlacementError::ConfigurationFault { selection })?;

        if batch.works.is_empty() {
            return Ok(batch.new_assignment());
        }

        if self.round.is_empty() || self.round.label_set_empty_for(batch) {
            self.round.refresh(self.pool.as_ref());
        }

        let useable: Vec<ChunkId> = batch
            .applicable_chunks()
            .into_iter()
            .filter(|&id| batch.chunk(id).is_clearly_available())
            .collect();
        if useable.is_empty() {
            return Err(PlacementError::NoCandidates {
                task: task.name.clone(),
            });
        }

        let ranked = rank_candidates(strategy, batch, useable, &mut self.rng);
        debug!(
            strategy = strategy.name(),
            ranked = ?ranked.iter().filter_map(|&id| batch.host_of(id)).collect::<Vec<_>>(),
            "candidates ranked"
        );

        let mut candidates = self.in_round(batch, &ranked);
        if candidates.is_empty() {
            debug!("every candidate host was used this round, refreshing");
            self.round.refresh(self.pool.as_ref());
            candidates = self.in_round(batch, &ranked);
        }
        if candidates.is_empty() && batch.is_label_restricted() {
            // label subset drained: any host still in the global round may
            // take the work right away
            candidates =
                RoundState::filter_available(batch, &ranked, self.round.available_hosts());
            if !candidates.is_empty() {
                debug!(
                    candidates = candidates.len(),
                    "label round exhausted, assigning from the global round"
                );
            }
        }
        if candidates.is_empty() {
            return Err(PlacementError::RoundExhausted {
                task: task.name.clone(),
                useable: ranked.len(),
            });
        }

        let outcome = assign_greedily(batch, &candidates, oracle).map_err(|source| {
            PlacementError::OracleFault {
                task: task.name.clone(),
                source,
            }
        })?;

        match outcome.assignment {
            Some(assignment) => {
                self.round.mark_used(batch, &assignment);
                debug!(
                    hosts = ?assignment.hosts(batch),
                    oracle_calls = outcome.oracle_calls,
                    "assignment found"
                );
                Ok(assignment)
            }
            None => Err(PlacementError::SearchExhausted {
                task: task.name.clone(),
                candidates: candidates.len(),
            }),
        }
    }

    fn in_round(&self, batch: &Batch, ranked: &[ChunkId]) -> Vec<ChunkId> {
        RoundState::filter_available(batch, ranked, self.round.filter_set(batch))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
