/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Secondary placement strategy, used when the least-load balancer is
//! disabled for a task (and, under [`FailurePolicy::Delegate`], when it fails).
//!
//! [`FailurePolicy::Delegate`]: crate::balancer::FailurePolicy::Delegate

use tracing::warn;

use crate::balancer::search::assign_greedily;
use crate::oracle::CompatibilityOracle;
use crate::work::{Assignment, Batch, Task};

/// The host's own placement strategy.
pub trait FallbackBalancer: Send {
    fn map(
        &self,
        task: &Task,
        batch: &Batch,
        oracle: &dyn CompatibilityOracle,
    ) -> Option<Assignment>;
}

/// Worksheet order, first fit, with backtracking.  Keeps no fairness state.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFitFallback;

impl FallbackBalancer for FirstFitFallback {
    fn map(
        &self,
        task: &Task,
        batch: &Batch,
        oracle: &dyn CompatibilityOracle,
    ) -> Option<Assignment> {
        match assign_greedily(batch, &batch.applicable_chunks(), oracle) {
            Ok(outcome) => outcome.assignment,
            Err(e) => {
                warn!(task = %task.name, error = %e, "fallback placement failed");
                None
            }
        }
    }
}

/// Never places anything; leaves the task queued.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallback;

impl FallbackBalancer for NoFallback {
    fn map(&self, _: &Task, _: &Batch, _: &dyn CompatibilityOracle) -> Option<Assignment> {
        None
    }
}
