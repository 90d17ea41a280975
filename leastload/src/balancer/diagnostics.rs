/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Failure diagnostics.
//!
//! Purely observational: computed on every no-decision path, logged, and
//! returned so tests can look at it.  It lets an operator tell apart "no
//! compatible host exists", "every compatible host was already used this
//! round" and "the search failed despite available hosts".

use std::fmt;

use tracing::debug;

use super::error::PlacementError;
use super::round::RoundState;
use crate::work::Batch;

/// Per-work-item candidate counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkAvailability {
    /// Candidates the worksheet offered for the item.
    pub applicable: usize,
    /// Of those, chunks that are online and accepting work.
    pub available: usize,
    /// Of those, chunks whose host is still in the current round.
    pub in_round: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDiagnostics {
    /// Failure class, as in [`PlacementError::outcome`].
    pub outcome: &'static str,
    pub works: usize,
    pub worksheet_chunks: usize,
    pub per_work: Vec<WorkAvailability>,
    pub available_hosts: usize,
    /// Size of the host set the batch was filtered against (label subset or
    /// global round).
    pub hosts_for_filter: usize,
}

impl FailureDiagnostics {
    pub fn collect(batch: &Batch, round: &RoundState, err: &PlacementError) -> Self {
        let per_work = batch
            .works
            .iter()
            .map(|work| {
                let chunks: Vec<_> = work
                    .candidates
                    .iter()
                    .filter_map(|&id| batch.chunks.get(id))
                    .collect();
                let available: Vec<_> = chunks
                    .iter()
                    .filter(|c| c.is_clearly_available())
                    .collect();
                WorkAvailability {
                    applicable: chunks.len(),
                    available: available.len(),
                    in_round: available.iter().filter(|c| round.contains(&c.host)).count(),
                }
            })
            .collect();

        Self {
            outcome: err.outcome(),
            works: batch.works.len(),
            worksheet_chunks: batch.chunks.len(),
            per_work,
            available_hosts: round.available_hosts().len(),
            hosts_for_filter: round.filter_set(batch).len(),
        }
    }

    /// Log the diagnostics alongside the error that caused the failure.
    pub fn emit(&self, task: &str, err: &PlacementError) {
        if self.worksheet_chunks == 0 {
            debug!(
                task = %task,
                "received zero chunk candidates: the host rejected every slot for this task \
                 before asking the balancer; check that some host carries the label and may \
                 take the task"
            );
            return;
        }

        debug!(
            task = %task,
            works = self.works,
            worksheet_chunks = self.worksheet_chunks,
            available_hosts = self.available_hosts,
            hosts_for_filter = self.hosts_for_filter,
            per_work = %self,
            cause = %err,
            "unable to define mapping"
        );
    }
}

impl fmt::Display for FailureDiagnostics {
    /// `work0Applicable=3 work0Available=2 work0InRound=0 work1...`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, w) in self.per_work.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(
                f,
                "work{i}Applicable={} work{i}Available={} work{i}InRound={}",
                w.applicable, w.available, w.in_round
            )?;
        }
        Ok(())
    }
}
