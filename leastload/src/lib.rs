/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! leastload – least-load placement for batch work queues
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── work          – tasks, work items, slot chunks, worksheets, assignments
//! ├── pool          – live host view used to refresh rounds
//! ├── oracle        – host-supplied partial-validity check (+ worksheet oracle)
//! ├── strategy/     – ranking comparators and strategy selection
//! ├── balancer/     – round tracker, greedy search, dispatcher, diagnostics
//! ├── fallback      – the host's own balancer, used when least-load is off
//! ├── config/       – YAML fleet / balancer configuration
//! └── fleet         – in-memory fleet driving the CLI simulator
//! ```

pub mod balancer;
pub mod config;
pub mod fallback;
pub mod fleet;
pub mod oracle;
pub mod pool;
pub mod strategy;
pub mod work;
