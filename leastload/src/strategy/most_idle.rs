/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Least-load comparators: most idle slots first.

use std::cmp::Ordering;

use super::PlacementStrategy;
use crate::work::SlotChunk;

/// Idle hosts (nothing busy) before busy ones; within the same idle status,
/// more idle slots first.
#[derive(Debug, Clone, Copy, Default)]
pub struct MostIdleExecutors;

impl PlacementStrategy for MostIdleExecutors {
    fn name(&self) -> &'static str {
        "most_idle"
    }

    fn compare(&self, a: &SlotChunk, b: &SlotChunk) -> Ordering {
        idle_first(a, b).then_with(|| b.idle().cmp(&a.idle()))
    }
}

/// Like [`MostIdleExecutors`], but busy hosts are ordered by their busy
/// fraction (`busy / total`, lower first), so a fleet mixing 2-slot and
/// 32-slot hosts is balanced by load rather than by raw idle count.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadPercentage;

impl PlacementStrategy for LoadPercentage {
    fn name(&self) -> &'static str {
        "load_percentage"
    }

    fn compare(&self, a: &SlotChunk, b: &SlotChunk) -> Ordering {
        idle_first(a, b).then_with(|| {
            if a.is_idle() {
                // both idle
                b.idle().cmp(&a.idle())
            } else {
                busy_fraction(a, b).then_with(|| b.idle().cmp(&a.idle()))
            }
        })
    }
}

fn idle_first(a: &SlotChunk, b: &SlotChunk) -> Ordering {
    b.is_idle().cmp(&a.is_idle())
}

/// Compares `a.busy / a.total` with `b.busy / b.total` without floating
/// point.  A host reporting zero total slots counts as fully loaded.
fn busy_fraction(a: &SlotChunk, b: &SlotChunk) -> Ordering {
    match (a.total, b.total) {
        (0, 0) => Ordering::Equal,
        (0, _) => Ordering::Greater,
        (_, 0) => Ordering::Less,
        (ta, tb) => {
            let lhs = u64::from(a.busy) * u64::from(tb);
            let rhs = u64::from(b.busy) * u64::from(ta);
            lhs.cmp(&rhs)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
