/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Round fairness tracker.
//!
//! A *round* is the span between two refreshes.  During a round each host
//! receives new work at most once; when the hosts run out the round is
//! rebuilt from the live [`ResourcePool`].  Alongside the global set the
//! tracker keeps one subset per label so a heavily requested label gets its
//! own rotation instead of waiting for the whole fleet to be cycled.
//!
//! Invariant: every host in any label subset is also in `available_hosts`.
//! [`RoundState::rebuild`] replaces both together and
//! [`RoundState::mark_used`] removes a host from both.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::pool::{HostStatus, ResourcePool};
use crate::work::{Assignment, Batch, ChunkId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundState {
    available_hosts: BTreeSet<String>,
    available_hosts_by_label: BTreeMap<String, BTreeSet<String>>,
}

impl RoundState {
    /// An empty round; the first decision triggers a refresh.
    pub fn new() -> Self {
        Self::default()
    }

    /// A round populated from synthetic host data, without a live pool.
    pub fn from_hosts<I>(hosts: I) -> Self
    where
        I: IntoIterator<Item = HostStatus>,
    {
        let mut round = Self::new();
        round.rebuild(hosts);
        round
    }

    /// Re-scan `pool` and start a new round.
    pub fn refresh(&mut self, pool: &dyn ResourcePool) {
        self.rebuild(pool.hosts());
        debug!(
            hosts = self.available_hosts.len(),
            labels = self.available_hosts_by_label.len(),
            "round refreshed"
        );
    }

    /// Clear and rebuild both the global set and the label subsets from
    /// `hosts`.  Only hosts that can take new work right now are admitted.
    pub fn rebuild<I>(&mut self, hosts: I)
    where
        I: IntoIterator<Item = HostStatus>,
    {
        self.available_hosts.clear();
        self.available_hosts_by_label.clear();

        for host in hosts {
            if !host.can_take_new_work() {
                continue;
            }
            for label in &host.labels {
                self.available_hosts_by_label
                    .entry(label.clone())
                    .or_default()
                    .insert(host.name.clone());
            }
            self.available_hosts.insert(host.name);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.available_hosts.is_empty()
    }

    pub fn contains(&self, host: &str) -> bool {
        self.available_hosts.contains(host)
    }

    pub fn available_hosts(&self) -> &BTreeSet<String> {
        &self.available_hosts
    }

    /// Hosts carrying `label` that are still in the round.  Empty when the
    /// label is unknown.
    pub fn hosts_for_label(&self, label: &str) -> impl Iterator<Item = &str> + '_ {
        self.available_hosts_by_label
            .get(label)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Number of labels with a subset (including subsets emptied this round).
    pub fn label_count(&self) -> usize {
        self.available_hosts_by_label.len()
    }

    /// `true` when the batch is a single label-restricted item and that
    /// label's subset is missing or drained.
    pub fn label_set_empty_for(&self, batch: &Batch) -> bool {
        match batch.single_label() {
            Some(label) => self
                .available_hosts_by_label
                .get(label)
                .map_or(true, BTreeSet::is_empty),
            None => false,
        }
    }

    /// The host set to filter `batch` against: the label subset for a
    /// single label-restricted item when that subset is non-empty, otherwise
    /// the global set.
    pub fn filter_set(&self, batch: &Batch) -> &BTreeSet<String> {
        batch
            .single_label()
            .and_then(|label| self.available_hosts_by_label.get(label))
            .filter(|hosts| !hosts.is_empty())
            .unwrap_or(&self.available_hosts)
    }

    /// Keep the candidates (in order) whose host is in `hosts`.
    pub fn filter_available(
        batch: &Batch,
        candidates: &[ChunkId],
        hosts: &BTreeSet<String>,
    ) -> Vec<ChunkId> {
        candidates
            .iter()
            .copied()
            .filter(|&id| batch.host_of(id).is_some_and(|h| hosts.contains(h)))
            .collect()
    }

    /// Remove every host used by `assignment` from the round and from every
    /// label subset.
    pub fn mark_used(&mut self, batch: &Batch, assignment: &Assignment) {
        for host in assignment.hosts(batch) {
            self.available_hosts.remove(host);
            for hosts in self.available_hosts_by_label.values_mut() {
                hosts.remove(host);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
