/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the least-load balancer.
//!
//! None of these ever reaches the host as an error: the dispatcher converts
//! every [`PlacementError`] into "no decision" (or a fallback delegation,
//! depending on [`FailurePolicy`](super::FailurePolicy)).  They exist so the
//! log line and the diagnostics say exactly which of the failure classes hit:
//!
//! | Variant | Meaning | Log level |
//! |---|---|---|
//! | `NoCandidates` | no clearly available chunk is applicable at all | `debug` |
//! | `RoundExhausted` | applicable chunks exist, all on hosts already used this round | `debug` |
//! | `SearchExhausted` | candidates exist but no ordering is fully valid | `debug` |
//! | `OracleFault` | the compatibility oracle failed | `warn` |
//! | `ConfigurationFault` | an internal invariant is broken | `error` |

use thiserror::Error;

use crate::oracle::OracleError;
use crate::strategy::StrategySelection;

#[derive(Debug, Error)]
pub enum PlacementError {
    /// No item has a clearly available (online, accepting) candidate chunk.
    #[error("task '{task}' has no usable candidate chunk")]
    NoCandidates { task: String },

    /// Usable chunks exist, but every one of them sits on a host that was
    /// already given work this round, even after a refresh.
    #[error("task '{task}': all {useable} usable chunk(s) are on hosts already used this round")]
    RoundExhausted { task: String, useable: usize },

    /// The backtracking search tried every ranked candidate without finding a
    /// complete valid assignment.
    #[error("task '{task}': no valid assignment among {candidates} candidate chunk(s)")]
    SearchExhausted { task: String, candidates: usize },

    /// The compatibility oracle failed while validating an assignment.
    #[error("task '{task}': compatibility oracle failed: {source}")]
    OracleFault {
        task: String,
        #[source]
        source: OracleError,
    },

    /// A selection that names no ranking policy reached strategy dispatch.
    #[error("selection '{selection}' cannot be dispatched to a strategy")]
    ConfigurationFault { selection: StrategySelection },
}

impl PlacementError {
    /// Short outcome label used in the per-call timing log line.
    pub fn outcome(&self) -> &'static str {
        match self {
            PlacementError::NoCandidates { .. } => "no decision (no usable chunks)",
            PlacementError::RoundExhausted { .. } => "no decision (no chunks for this round)",
            PlacementError::SearchExhausted { .. } => "no decision (search exhausted)",
            PlacementError::OracleFault { .. } => "no decision (oracle fault)",
            PlacementError::ConfigurationFault { .. } => "no decision (configuration fault)",
        }
    }

    /// `true` for the "normal" outcomes that only mean "try again later".
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            PlacementError::NoCandidates { .. }
                | PlacementError::RoundExhausted { .. }
                | PlacementError::SearchExhausted { .. }
        )
    }
}
