/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Round-robin by age: the host left unused the longest goes first.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

use tracing::trace;

use super::PlacementStrategy;
use crate::work::{Assignment, Batch, SlotChunk};

/// Prefers hosts that have gone the longest without new work, regardless of
/// how many slots they have.  Giving a host work sends it to the back.
///
/// Last-assigned times are keyed by host **name** rather than by any handle
/// to the host, so hosts that come and go over the life of the process do
/// not keep stale objects alive.  A host that reconnects under a new name
/// starts over as "never used".
#[derive(Debug, Default)]
pub struct LongestUnusedMachine {
    last_assigned: HashMap<String, Instant>,
}

impl LongestUnusedMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_assigned(&self, host: &str) -> Option<Instant> {
        self.last_assigned.get(host).copied()
    }

    /// Own record first, then whatever the worksheet builder knows.
    fn last_used(&self, chunk: &SlotChunk) -> Option<Instant> {
        self.last_assigned(&chunk.host).or(chunk.last_used)
    }
}

impl PlacementStrategy for LongestUnusedMachine {
    fn name(&self) -> &'static str {
        "longest_unused"
    }

    fn compare(&self, a: &SlotChunk, b: &SlotChunk) -> Ordering {
        match (self.last_used(a), self.last_used(b)) {
            (None, None) => Ordering::Equal,
            // never-used hosts first, otherwise they never join the rotation
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(ta), Some(tb)) => ta.cmp(&tb),
        }
    }

    fn on_assigned(&mut self, batch: &Batch, assignment: &Assignment, at: Instant) {
        for host in assignment.hosts(batch) {
            trace!(host = %host, "recording last assignment time");
            self.last_assigned.insert(host.to_string(), at);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::WorkItem;
    use std::time::Duration;

    fn batch(hosts: &[&str]) -> Batch {
        let chunks: Vec<SlotChunk> = hosts.iter().map(|h| SlotChunk::new(*h, 2)).collect();
        Batch::new(
            vec![WorkItem::new(None, (0..chunks.len()).collect())],
            chunks,
        )
    }

    fn record(strategy: &mut LongestUnusedMachine, batch: &Batch, chunk: usize, at: Instant) {
        let mut m = batch.new_assignment();
        m.assign(0, Some(chunk));
        strategy.on_assigned(batch, &m, at);
    }

    #[test]
    fn never_used_hosts_rank_first() {
        let b = batch(&["a", "b"]);
        let mut s = LongestUnusedMachine::new();
        record(&mut s, &b, 0, Instant::now());

        assert_eq!(s.compare(b.chunk(1), b.chunk(0)), Ordering::Less);
        assert_eq!(s.compare(b.chunk(0), b.chunk(1)), Ordering::Greater);
    }

    #[test]
    fn two_never_used_hosts_tie() {
        let b = batch(&["a", "b"]);
        let s = LongestUnusedMachine::new();
        assert_eq!(s.compare(b.chunk(0), b.chunk(1)), Ordering::Equal);
    }

    #[test]
    fn earlier_use_ranks_first() {
        let b = batch(&["a", "b"]);
        let mut s = LongestUnusedMachine::new();
        let t0 = Instant::now();
        record(&mut s, &b, 1, t0);
        record(&mut s, &b, 0, t0 + Duration::from_secs(5));

        assert_eq!(s.compare(b.chunk(1), b.chunk(0)), Ordering::Less);
    }

    #[test]
    fn assigning_sends_host_to_the_back() {
        let b = batch(&["a", "b", "c"]);
        let mut s = LongestUnusedMachine::new();
        let t0 = Instant::now();
        for (i, chunk) in [0usize, 1, 2].into_iter().enumerate() {
            record(&mut s, &b, chunk, t0 + Duration::from_secs(i as u64));
        }
        // a was used first, so it is next in line; reuse it and it goes last
        record(&mut s, &b, 0, t0 + Duration::from_secs(10));

        let mut order: Vec<usize> = vec![0, 1, 2];
        order.sort_by(|&x, &y| s.compare(b.chunk(x), b.chunk(y)));
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn worksheet_timestamp_used_when_host_unknown() {
        let mut b = batch(&["a", "b"]);
        let s = LongestUnusedMachine::new();
        b.chunks[0].last_used = Some(Instant::now());
        assert_eq!(s.compare(b.chunk(1), b.chunk(0)), Ordering::Less);
    }
}
