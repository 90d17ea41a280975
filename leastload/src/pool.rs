/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Live view of the resource pool, consulted when a round is refreshed.

use std::collections::BTreeSet;

/// Point-in-time status of one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostStatus {
    pub name: String,
    pub online: bool,
    pub accepting_tasks: bool,
    pub idle_slots: u32,
    pub labels: BTreeSet<String>,
}

impl HostStatus {
    /// An online, accepting host with `idle_slots` free slots and no labels.
    pub fn new(name: impl Into<String>, idle_slots: u32) -> Self {
        Self {
            name: name.into(),
            online: true,
            accepting_tasks: true,
            idle_slots,
            labels: BTreeSet::new(),
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// A host may join a new round only if it is online, accepting work and
    /// has at least one idle slot right now.
    pub fn can_take_new_work(&self) -> bool {
        self.online && self.accepting_tasks && self.idle_slots > 0
    }
}

/// Source of [`HostStatus`] snapshots.
pub trait ResourcePool: Send + Sync {
    fn hosts(&self) -> Vec<HostStatus>;
}

impl ResourcePool for Vec<HostStatus> {
    fn hosts(&self) -> Vec<HostStatus> {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_without_idle_slots_cannot_take_work() {
        assert!(HostStatus::new("a", 1).can_take_new_work());
        assert!(!HostStatus::new("a", 0).can_take_new_work());

        let mut offline = HostStatus::new("a", 2);
        offline.online = false;
        assert!(!offline.can_take_new_work());

        let mut refusing = HostStatus::new("a", 2);
        refusing.accepting_tasks = false;
        assert!(!refusing.can_take_new_work());
    }
}
