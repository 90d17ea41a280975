/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core placement data structures.
//!
//! The host hands the balancer one [`Batch`] (its worksheet) per decision:
//!
//! ```text
//! host queue ──(Task + Batch)──►  LeastLoadBalancer  ──(Assignment | None)──►  host queue
//!                                   ↑ read-only input      ↑ work index → chunk index
//! ```
//!
//! # Ownership model
//! The balancer only ever **borrows** a [`Batch`].  Chunks are referenced by
//! their index ([`ChunkId`]) into [`Batch::chunks`], so an [`Assignment`] is a
//! plain vector of indices that the host resolves against the worksheet it
//! built.  Nothing in here is retained between calls.

use std::collections::BTreeSet;
use std::time::Instant;

use crate::strategy::StrategySelection;

/// Index of a [`SlotChunk`] inside [`Batch::chunks`].
pub type ChunkId = usize;

// ── Job / task ────────────────────────────────────────────────────────────────

/// The job-like entity that owns a queued task.
///
/// Only used to resolve which placement policy applies; the search itself
/// never looks at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRef {
    pub name: String,

    /// Per-job policy override.  `None` behaves like
    /// [`StrategySelection::UseGlobal`] (the job was never configured).
    pub strategy: Option<StrategySelection>,

    /// Explicit opt-out: tasks of a disabled job always go to the fallback.
    pub disabled: bool,
}

impl JobRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategy: None,
            disabled: false,
        }
    }

    pub fn with_strategy(mut self, strategy: StrategySelection) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// `true` when the job carries its own selection instead of deferring to
    /// the global default.
    pub fn is_overridden(&self) -> bool {
        matches!(self.strategy, Some(s) if s != StrategySelection::UseGlobal)
    }
}

/// A queued task.  One task produces one [`Batch`] per scheduling pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,

    /// Owning job.  Tasks without one are never placed by the balancer.
    pub owner: Option<JobRef>,
}

impl Task {
    pub fn new(name: impl Into<String>, owner: Option<JobRef>) -> Self {
        Self {
            name: name.into(),
            owner,
        }
    }
}

// ── Work item ─────────────────────────────────────────────────────────────────

/// One unit of work that needs exactly one slot-chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkItem {
    /// Capability label the chosen host must carry, if any.
    pub label: Option<String>,

    /// Chunks the host already judged eligible for this item (coarse
    /// permission / label filtering done by the worksheet builder).
    pub candidates: Vec<ChunkId>,
}

impl WorkItem {
    pub fn new(label: Option<&str>, candidates: Vec<ChunkId>) -> Self {
        Self {
            label: label.map(str::to_string),
            candidates,
        }
    }

    /// Returns `true` if `chunk` is in this item's candidate list.
    pub fn accepts(&self, chunk: ChunkId) -> bool {
        self.candidates.contains(&chunk)
    }
}

// ── Slot chunk ────────────────────────────────────────────────────────────────

/// A group of execution slots on one host, treated as one capacity-bearing
/// unit by the search.
///
/// The busy / total counters describe the **whole host**, not just this chunk;
/// they are what the ranking comparators look at.  `size` is how many items
/// this chunk alone can absorb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotChunk {
    /// Host name – the key all fairness bookkeeping uses.
    pub host: String,

    /// Slots in this chunk.
    pub size: u32,

    /// Busy slots on the host.
    pub busy: u32,

    /// Total slots on the host.
    pub total: u32,

    /// When the host last received work, as far as the worksheet builder
    /// knows.  `None` = never (or unknown).
    pub last_used: Option<Instant>,

    pub labels: BTreeSet<String>,
    pub online: bool,
    pub accepting_tasks: bool,
}

impl SlotChunk {
    /// An online, accepting, idle chunk covering every slot of `host`.
    pub fn new(host: impl Into<String>, slots: u32) -> Self {
        Self {
            host: host.into(),
            size: slots,
            busy: 0,
            total: slots,
            last_used: None,
            labels: BTreeSet::new(),
            online: true,
            accepting_tasks: true,
        }
    }

    pub fn with_busy(mut self, busy: u32) -> Self {
        self.busy = busy;
        self.size = self.total.saturating_sub(busy);
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Idle slots on the host.
    pub fn idle(&self) -> u32 {
        self.total.saturating_sub(self.busy)
    }

    /// `true` when nothing runs on the host.
    ///
    /// Deliberately based on the busy count only: a host can report "not
    /// idle" while it merely holds a lightweight coordinating task.
    pub fn is_idle(&self) -> bool {
        self.busy == 0
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Lighter re-check applied before ranking: the chunk has a host, and the
    /// host is online and accepting work.
    pub fn is_clearly_available(&self) -> bool {
        !self.host.is_empty() && self.online && self.accepting_tasks
    }
}

// ── Batch ─────────────────────────────────────────────────────────────────────

/// The worksheet for one decision: ordered work items plus every candidate
/// chunk they refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub works: Vec<WorkItem>,
    pub chunks: Vec<SlotChunk>,
}

impl Batch {
    pub fn new(works: Vec<WorkItem>, chunks: Vec<SlotChunk>) -> Self {
        Self { works, chunks }
    }

    pub fn work(&self, index: usize) -> &WorkItem {
        &self.works[index]
    }

    pub fn chunk(&self, id: ChunkId) -> &SlotChunk {
        &self.chunks[id]
    }

    /// Host name of `id`, or `None` for an index outside the worksheet.
    pub fn host_of(&self, id: ChunkId) -> Option<&str> {
        self.chunks.get(id).map(|c| c.host.as_str())
    }

    /// Union of every item's candidate list, first-seen order, no
    /// duplicates, indices outside the worksheet dropped.
    pub fn applicable_chunks(&self) -> Vec<ChunkId> {
        let mut seen = BTreeSet::new();
        self.works
            .iter()
            .flat_map(|w| w.candidates.iter().copied())
            .filter(|&id| id < self.chunks.len() && seen.insert(id))
            .collect()
    }

    /// `true` if any item requires a label.
    pub fn is_label_restricted(&self) -> bool {
        self.works.iter().any(|w| w.label.is_some())
    }

    /// The label of a single-item, label-restricted batch.
    ///
    /// Such batches get their own per-label round so a busy label does not
    /// share one global round with unrelated work.
    pub fn single_label(&self) -> Option<&str> {
        match self.works.as_slice() {
            [only] => only.label.as_deref(),
            _ => None,
        }
    }

    /// A fresh, fully unassigned [`Assignment`] sized for this batch.
    pub fn new_assignment(&self) -> Assignment {
        Assignment::unassigned(self.works.len())
    }
}

// ── Assignment ────────────────────────────────────────────────────────────────

/// Work-item index → chunk index.
///
/// Built incrementally by the search.  The balancer only hands out complete
/// assignments; partial ones are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    slots: Vec<Option<ChunkId>>,
}

impl Assignment {
    pub fn unassigned(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    /// Number of work items covered (assigned or not).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn assign(&mut self, work: usize, chunk: Option<ChunkId>) {
        self.slots[work] = chunk;
    }

    pub fn assigned(&self, work: usize) -> Option<ChunkId> {
        self.slots.get(work).copied().flatten()
    }

    /// `true` when every work item has a chunk.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// `(work, chunk)` pairs for the assigned items.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, ChunkId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(work, chunk)| chunk.map(|c| (work, c)))
    }

    /// Distinct host names used by this assignment, resolved against `batch`.
    pub fn hosts<'b>(&self, batch: &'b Batch) -> BTreeSet<&'b str> {
        self.pairs()
            .filter_map(|(_, chunk)| batch.host_of(chunk))
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
