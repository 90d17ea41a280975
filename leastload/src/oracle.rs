/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Compatibility oracle: "is this partial assignment still jointly valid?"
//!
//! The balancer never evaluates labels, permissions or capacity itself during
//! the search; it asks the host through [`CompatibilityOracle`].  The oracle
//! always receives the **whole** assignment so far, because chunk capacity is
//! shared between work items.
//!
//! [`WorksheetOracle`] is the reference implementation used by the simulator
//! and the tests.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::work::{Assignment, Batch, ChunkId};

/// Failure raised by an oracle while evaluating an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// The assignment refers to a chunk index the worksheet does not contain.
    #[error("work {work} refers to chunk {chunk}, which is not in the worksheet")]
    UnknownChunk { work: usize, chunk: ChunkId },

    /// The host data behind a chunk changed or vanished while evaluating.
    #[error("host '{host}' has stale data: {detail}")]
    StaleHost { host: String, detail: String },
}

/// Partial-validity predicate supplied by the host.
pub trait CompatibilityOracle {
    /// Returns `Ok(true)` if every `(work, chunk)` pair assigned so far
    /// satisfies the hard constraints and no chunk is over capacity.
    fn is_partially_valid(&self, batch: &Batch, assignment: &Assignment)
        -> Result<bool, OracleError>;
}

impl<F> CompatibilityOracle for F
where
    F: Fn(&Batch, &Assignment) -> Result<bool, OracleError>,
{
    fn is_partially_valid(
        &self,
        batch: &Batch,
        assignment: &Assignment,
    ) -> Result<bool, OracleError> {
        self(batch, assignment)
    }
}

/// Checks candidate membership, labels and capacity straight off the
/// worksheet.
///
/// A chunk takes at most `size` items, and all chunks of one host together
/// take at most the host's idle slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorksheetOracle;

impl CompatibilityOracle for WorksheetOracle {
    fn is_partially_valid(
        &self,
        batch: &Batch,
        assignment: &Assignment,
    ) -> Result<bool, OracleError> {
        let mut chunk_load: BTreeMap<ChunkId, u32> = BTreeMap::new();
        let mut host_load: BTreeMap<&str, u32> = BTreeMap::new();

        for (work, chunk_id) in assignment.pairs() {
            let chunk = batch
                .chunks
                .get(chunk_id)
                .ok_or(OracleError::UnknownChunk {
                    work,
                    chunk: chunk_id,
                })?;
            let item = &batch.works[work];

            if !item.accepts(chunk_id) {
                return Ok(false);
            }
            if let Some(label) = &item.label {
                if !chunk.has_label(label) {
                    return Ok(false);
                }
            }

            let in_chunk = chunk_load.entry(chunk_id).or_insert(0);
            *in_chunk += 1;
            if *in_chunk > chunk.size {
                return Ok(false);
            }

            let on_host = host_load.entry(chunk.host.as_str()).or_insert(0);
            *on_host += 1;
            if *on_host > chunk.idle() {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::{SlotChunk, WorkItem};

    fn batch() -> Batch {
        Batch::new(
            vec![
                WorkItem::new(None, vec![0, 1]),
                WorkItem::new(None, vec![0, 1]),
                WorkItem::new(Some("arm"), vec![0, 1]),
            ],
            vec![
                SlotChunk::new("a", 1),
                SlotChunk::new("b", 4).with_busy(2).with_labels(["arm"]),
            ],
        )
    }

    #[test]
    fn empty_assignment_is_valid() {
        let b = batch();
        assert_eq!(WorksheetOracle.is_partially_valid(&b, &b.new_assignment()), Ok(true));
    }

    #[test]
    fn capacity_is_shared_between_items() {
        let b = batch();
        let mut m = b.new_assignment();
        m.assign(0, Some(0));
        assert_eq!(WorksheetOracle.is_partially_valid(&b, &m), Ok(true));
        m.assign(1, Some(0));
        assert_eq!(
            WorksheetOracle.is_partially_valid(&b, &m),
            Ok(false),
            "single-slot chunk cannot take two items"
        );
    }

    #[test]
    fn capacity_is_bounded_by_host_idle_slots() {
        let mut b = batch();
        // chunk claims 4 slots but the host only has 1 idle
        b.chunks[1].size = 4;
        b.chunks[1].busy = 3;
        let mut m = b.new_assignment();
        m.assign(0, Some(1));
        m.assign(1, Some(1));
        assert_eq!(WorksheetOracle.is_partially_valid(&b, &m), Ok(false));
    }

    #[test]
    fn chunks_of_one_host_share_its_idle_slots() {
        // "a" has one idle slot, offered as two one-slot chunks
        let b = Batch::new(
            vec![WorkItem::new(None, vec![0, 1]), WorkItem::new(None, vec![0, 1])],
            vec![
                SlotChunk {
                    size: 1,
                    ..SlotChunk::new("a", 2).with_busy(1)
                },
                SlotChunk {
                    size: 1,
                    ..SlotChunk::new("a", 2).with_busy(1)
                },
            ],
        );
        let mut m = b.new_assignment();
        m.assign(0, Some(0));
        assert_eq!(WorksheetOracle.is_partially_valid(&b, &m), Ok(true));
        m.assign(1, Some(1));
        assert_eq!(WorksheetOracle.is_partially_valid(&b, &m), Ok(false));
    }

    #[test]
    fn chunks_of_one_host_fill_its_idle_slots() {
        let b = Batch::new(
            vec![WorkItem::new(None, vec![0, 1]), WorkItem::new(None, vec![0, 1])],
            vec![
                SlotChunk {
                    size: 1,
                    ..SlotChunk::new("a", 2)
                },
                SlotChunk {
                    size: 1,
                    ..SlotChunk::new("a", 2)
                },
            ],
        );
        let mut m = b.new_assignment();
        m.assign(0, Some(0));
        m.assign(1, Some(1));
        assert_eq!(WorksheetOracle.is_partially_valid(&b, &m), Ok(true));
    }

    #[test]
    fn label_must_match() {
        let b = batch();
        let mut m = b.new_assignment();
        m.assign(2, Some(0));
        assert_eq!(WorksheetOracle.is_partially_valid(&b, &m), Ok(false));
        m.assign(2, Some(1));
        assert_eq!(WorksheetOracle.is_partially_valid(&b, &m), Ok(true));
    }

    #[test]
    fn chunk_outside_candidate_list_is_rejected() {
        let mut b = batch();
        b.works[0].candidates = vec![1];
        let mut m = b.new_assignment();
        m.assign(0, Some(0));
        assert_eq!(WorksheetOracle.is_partially_valid(&b, &m), Ok(false));
    }

    #[test]
    fn unknown_chunk_is_an_error() {
        let b = batch();
        let mut m = b.new_assignment();
        m.assign(1, Some(9));
        assert_eq!(
            WorksheetOracle.is_partially_valid(&b, &m),
            Err(OracleError::UnknownChunk { work: 1, chunk: 9 })
        );
    }

    #[test]
    fn closures_are_oracles() {
        let b = batch();
        let refuse = |_: &Batch, _: &Assignment| -> Result<bool, OracleError> { Ok(false) };
        assert_eq!(refuse.is_partially_valid(&b, &b.new_assignment()), Ok(false));
    }
}
