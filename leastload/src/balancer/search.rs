/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Greedy backtracking assignment.
//!
//! Depth-first over the work items in batch order.  For item `i` every ranked
//! candidate is tried in turn; after each tentative assignment the oracle
//! re-validates the **entire** partial assignment (capacity is shared between
//! items, so checking only the new pair is not enough).  The first complete
//! assignment found wins: this is ranked first-fit with backtracking, not an
//! optimal matching.
//!
//! Worst case is exponential in the number of items; in practice batches are
//! small and most items accept most candidates, so the first branch usually
//! succeeds.

use tracing::trace;

use crate::oracle::{CompatibilityOracle, OracleError};
use crate::work::{Assignment, Batch, ChunkId};

/// Result of one search, with the number of oracle calls it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub assignment: Option<Assignment>,
    pub oracle_calls: usize,
}

/// Search for a complete, valid assignment of `batch` using `candidates` in
/// the given order.
///
/// * zero items → an empty assignment, without consulting the oracle
/// * zero candidates (and at least one item) → no assignment
///
/// # Errors
/// The first [`OracleError`] aborts the search and is returned as is.
pub fn assign_greedily(
    batch: &Batch,
    candidates: &[ChunkId],
    oracle: &dyn CompatibilityOracle,
) -> Result<SearchOutcome, OracleError> {
    let mut search = GreedySearch {
        batch,
        candidates,
        oracle,
        oracle_calls: 0,
    };
    let mut assignment = batch.new_assignment();
    let found = search.assign_from(&mut assignment, 0)?;

    trace!(
        found,
        oracle_calls = search.oracle_calls,
        candidates = candidates.len(),
        "greedy search finished"
    );

    Ok(SearchOutcome {
        assignment: found.then_some(assignment),
        oracle_calls: search.oracle_calls,
    })
}

struct GreedySearch<'a> {
    batch: &'a Batch,
    candidates: &'a [ChunkId],
    oracle: &'a dyn CompatibilityOracle,
    oracle_calls: usize,
}

impl GreedySearch<'_> {
    fn assign_from(&mut self, m: &mut Assignment, i: usize) -> Result<bool, OracleError> {
        // fully assigned
        if i == m.len() {
            return Ok(true);
        }

        let work = self.batch.work(i);
        for &chunk in self.candidates {
            // not offered for this item by the worksheet, no need to ask
            if !work.accepts(chunk) {
                continue;
            }

            m.assign(i, Some(chunk));
            self.oracle_calls += 1;
            if self.oracle.is_partially_valid(self.batch, m)? && self.assign_from(m, i + 1)? {
                return Ok(true);
            }
        }

        // every attempt failed
        m.assign(i, None);
        Ok(false)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::WorksheetOracle;
    use crate::work::{SlotChunk, WorkItem};
    use std::cell::Cell;

    fn batch(items: usize, chunks: Vec<SlotChunk>) -> Batch {
        let all: Vec<ChunkId> = (0..chunks.len()).collect();
        Batch::new(
            (0..items).map(|_| WorkItem::new(None, all.clone())).collect(),
            chunks,
        )
    }

    #[test]
    fn zero_items_is_an_immediate_success() {
        let b = batch(0, vec![]);
        let out = assign_greedily(&b, &[], &WorksheetOracle).unwrap();
        assert_eq!(out.assignment, Some(Assignment::unassigned(0)));
        assert_eq!(out.oracle_calls, 0);
    }

    #[test]
    fn zero_candidates_fails() {
        let b = batch(1, vec![SlotChunk::new("a", 1)]);
        let out = assign_greedily(&b, &[], &WorksheetOracle).unwrap();
        assert!(out.assignment.is_none());
    }

    #[test]
    fn first_ranked_candidate_wins() {
        let b = batch(1, vec![SlotChunk::new("a", 4), SlotChunk::new("b", 4)]);
        let out = assign_greedily(&b, &[1, 0], &WorksheetOracle).unwrap();
        assert_eq!(out.assignment.unwrap().assigned(0), Some(1));
        assert_eq!(out.oracle_calls, 1);
    }

    #[test]
    fn shared_capacity_spills_to_next_candidate() {
        // "a" only has one idle slot; the second item must move to "b"
        let b = batch(
            2,
            vec![SlotChunk::new("a", 2).with_busy(1), SlotChunk::new("b", 4)],
        );
        let m = assign_greedily(&b, &[0, 1], &WorksheetOracle)
            .unwrap()
            .assignment
            .unwrap();
        assert_eq!(m.assigned(0), Some(0));
        assert_eq!(m.assigned(1), Some(1));
    }

    #[test]
    fn backtracks_when_a_later_item_is_stuck() {
        // item 1 can only go to "a"; item 0 ranks "a" first but must yield it
        let mut b = batch(
            2,
            vec![SlotChunk::new("a", 1), SlotChunk::new("b", 1)],
        );
        b.works[1].candidates = vec![0];

        let m = assign_greedily(&b, &[0, 1], &WorksheetOracle)
            .unwrap()
            .assignment
            .unwrap();
        assert_eq!(m.assigned(0), Some(1));
        assert_eq!(m.assigned(1), Some(0));
    }

    #[test]
    fn exhausted_search_leaves_nothing_behind() {
        let b = batch(3, vec![SlotChunk::new("a", 1), SlotChunk::new("b", 1)]);
        let out = assign_greedily(&b, &[0, 1], &WorksheetOracle).unwrap();
        assert!(out.assignment.is_none());
        assert!(out.oracle_calls > 0);
    }

    #[test]
    fn oracle_sees_whole_partial_assignment() {
        let b = batch(2, vec![SlotChunk::new("a", 4)]);
        let max_seen = Cell::new(0usize);
        let oracle = |_: &Batch, m: &Assignment| -> Result<bool, OracleError> {
            max_seen.set(max_seen.get().max(m.pairs().count()));
            Ok(true)
        };
        assign_greedily(&b, &[0], &oracle).unwrap();
        assert_eq!(max_seen.get(), 2);
    }

    #[test]
    fn candidates_not_offered_to_an_item_skip_the_oracle() {
        let mut b = batch(1, vec![SlotChunk::new("a", 1), SlotChunk::new("b", 1)]);
        b.works[0].candidates = vec![1];
        let out = assign_greedily(&b, &[0, 1], &WorksheetOracle).unwrap();
        assert_eq!(out.oracle_calls, 1);
        assert_eq!(out.assignment.unwrap().assigned(0), Some(1));
    }

    #[test]
    fn oracle_error_aborts_search() {
        let b = batch(2, vec![SlotChunk::new("a", 4), SlotChunk::new("b", 4)]);
        let oracle = |_: &Batch, m: &Assignment| -> Result<bool, OracleError> {
            if m.assigned(1).is_some() {
                Err(OracleError::StaleHost {
                    host: "a".into(),
                    detail: "went away".into(),
                })
            } else {
                Ok(true)
            }
        };
        let err = assign_greedily(&b, &[0, 1], &oracle).unwrap_err();
        assert!(matches!(err, OracleError::StaleHost { .. }));
    }
}
