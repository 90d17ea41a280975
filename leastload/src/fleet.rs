/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! In-memory fleet used by the CLI simulator and the scenario tests.
//!
//! [`SimulatedFleet`] plays the host's part: it is the live
//! [`ResourcePool`], it builds worksheets the way a host queue would (one
//! chunk per host holding all of its idle slots, candidates filtered by
//! label) and it applies decisions by marking slots busy.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::config::HostConfig;
use crate::pool::{HostStatus, ResourcePool};
use crate::work::{Assignment, Batch, SlotChunk, WorkItem};

#[derive(Debug, Clone, PartialEq, Eq)]
struct SimHost {
    slots: u32,
    busy: u32,
    labels: BTreeSet<String>,
    online: bool,
    accepting_tasks: bool,
}

impl SimHost {
    fn idle(&self) -> u32 {
        self.slots.saturating_sub(self.busy)
    }
}

#[derive(Debug, Default)]
pub struct SimulatedFleet {
    hosts: Mutex<BTreeMap<String, SimHost>>,
}

impl SimulatedFleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_hosts<'a, I>(hosts: I) -> Self
    where
        I: IntoIterator<Item = &'a HostConfig>,
    {
        let fleet = Self::new();
        {
            let mut map = fleet.lock();
            for cfg in hosts {
                map.insert(
                    cfg.name.clone(),
                    SimHost {
                        slots: cfg.slots,
                        busy: cfg.busy.min(cfg.slots),
                        labels: cfg.labels.clone(),
                        online: cfg.online,
                        accepting_tasks: cfg.accepting_tasks,
                    },
                );
            }
        }
        fleet
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, SimHost>> {
        self.hosts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add (or replace) an online, idle host.
    pub fn add_host<I, S>(&self, name: &str, slots: u32, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().insert(
            name.to_string(),
            SimHost {
                slots,
                busy: 0,
                labels: labels.into_iter().map(Into::into).collect(),
                online: true,
                accepting_tasks: true,
            },
        );
    }

    pub fn set_online(&self, host: &str, online: bool) {
        if let Some(h) = self.lock().get_mut(host) {
            h.online = online;
        }
    }

    pub fn set_accepting(&self, host: &str, accepting: bool) {
        if let Some(h) = self.lock().get_mut(host) {
            h.accepting_tasks = accepting;
        }
    }

    pub fn busy(&self, host: &str) -> Option<u32> {
        self.lock().get(host).map(|h| h.busy)
    }

    /// Host name → busy slots.
    pub fn busy_counts(&self) -> BTreeMap<String, u32> {
        self.lock()
            .iter()
            .map(|(name, h)| (name.clone(), h.busy))
            .collect()
    }

    /// Build a worksheet with one work item per entry of `labels`.
    ///
    /// Hosts without idle slots contribute no chunk.  Offline or draining
    /// hosts still do, as a stale worksheet would.
    pub fn worksheet(&self, labels: &[Option<&str>]) -> Batch {
        let hosts = self.lock();
        let chunks: Vec<SlotChunk> = hosts
            .iter()
            .filter(|(_, h)| h.idle() > 0)
            .map(|(name, h)| SlotChunk {
                host: name.clone(),
                size: h.idle(),
                busy: h.busy,
                total: h.slots,
                last_used: None,
                labels: h.labels.clone(),
                online: h.online,
                accepting_tasks: h.accepting_tasks,
            })
            .collect();

        let works = labels
            .iter()
            .map(|label| {
                let candidates = chunks
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| label.map_or(true, |l| c.has_label(l)))
                    .map(|(id, _)| id)
                    .collect();
                WorkItem::new(*label, candidates)
            })
            .collect();

        Batch::new(works, chunks)
    }

    /// Occupy one slot per assigned work item.
    pub fn apply(&self, batch: &Batch, assignment: &Assignment) {
        let mut hosts = self.lock();
        for (_, chunk) in assignment.pairs() {
            let Some(name) = batch.host_of(chunk) else {
                continue;
            };
            match hosts.get_mut(name) {
                Some(h) if h.busy < h.slots => {
                    h.busy += 1;
                    debug!(host = %name, busy = h.busy, slots = h.slots, "slot occupied");
                }
                Some(_) => warn!(host = %name, "assignment exceeds host capacity"),
                None => warn!(host = %name, "assignment names an unknown host"),
            }
        }
    }

    /// Free up to `n` busy slots on `host`.
    pub fn release(&self, host: &str, n: u32) {
        if let Some(h) = self.lock().get_mut(host) {
            h.busy = h.busy.saturating_sub(n);
        }
    }

    pub fn release_all(&self) {
        for h in self.lock().values_mut() {
            h.busy = 0;
        }
    }
}

impl ResourcePool for SimulatedFleet {
    fn hosts(&self) -> Vec<HostStatus> {
        self.lock()
            .iter()
            .map(|(name, h)| HostStatus {
                name: name.clone(),
                online: h.online,
                accepting_tasks: h.accepting_tasks,
                idle_slots: h.idle(),
                labels: h.labels.clone(),
            })
            .collect()
    }
}
