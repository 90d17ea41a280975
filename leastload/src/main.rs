/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use leastload::balancer::LeastLoadBalancer;
use leastload::config::FleetConfigManager;
use leastload::fallback::FirstFitFallback;
use leastload::fleet::SimulatedFleet;
use leastload::oracle::WorksheetOracle;
use leastload::work::Task;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Least-load placement simulator.
///
/// Example:
///   leastload --config demos/fleet.yaml --items 2 --batches 6 --job nightly
#[derive(Debug, Parser)]
#[command(
    name = "leastload",
    about = "Least-load placement simulator",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML fleet configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Work items per batch.
    #[arg(short = 'n', long, default_value_t = 1)]
    items: usize,

    /// Number of batches to place.
    #[arg(short, long, default_value_t = 4)]
    batches: usize,

    /// Label every work item requires.
    #[arg(short, long)]
    label: Option<String>,

    /// Job owning the tasks; its strategy override (if configured) applies.
    #[arg(short, long, default_value = "default")]
    job: String,

    /// Free the occupied slots again after every batch.
    #[arg(long, default_value_t = false)]
    release: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        config  = ?cli.config,
        items   = cli.items,
        batches = cli.batches,
        label   = ?cli.label,
        job     = %cli.job,
        release = cli.release,
        "Configuration"
    );

    // ── Load fleet configuration ──────────────────────────────────────────────
    let config = match &cli.config {
        Some(path) => {
            let mut mgr = FleetConfigManager::new();
            if let Err(e) = mgr.load_from_file(path) {
                error!("Failed to load fleet configuration: {:#}", e);
                process::exit(1);
            }
            mgr
        }
        None => {
            warn!("No fleet configuration file provided, using two default hosts");
            FleetConfigManager::with_default_hosts(2)
        }
    };

    // Sort by name for deterministic output
    let mut hosts: Vec<_> = config.get_all_hosts().values().collect();
    hosts.sort_by_key(|h| &h.name);
    info!("Fleet has {} host(s):", hosts.len());
    for host in &hosts {
        info!(
            "  [{name}]  slots={slots}  busy={busy}  labels={labels:?}  online={online}  accepting={accepting}",
            name = host.name,
            slots = host.slots,
            busy = host.busy,
            labels = host.labels,
            online = host.online,
            accepting = host.accepting_tasks,
        );
    }

    // ── Wire up the balancer ──────────────────────────────────────────────────
    let fleet = Arc::new(SimulatedFleet::from_hosts(hosts));
    let settings = config.balancer_settings().clone();
    let job = config.job(&cli.job);
    let mut balancer = LeastLoadBalancer::new(settings, fleet.clone(), Box::new(FirstFitFallback));

    let labels: Vec<Option<&str>> = vec![cli.label.as_deref(); cli.items];

    // ── Run ───────────────────────────────────────────────────────────────────
    let mut placed = 0usize;
    for n in 1..=cli.batches {
        let task = Task::new(format!("{}#{n}", job.name), Some(job.clone()));
        let batch = fleet.worksheet(&labels);

        match balancer.decide(&task, &batch, &WorksheetOracle) {
            Some(assignment) => {
                fleet.apply(&batch, &assignment);
                placed += 1;
                let hosts: Vec<_> = assignment
                    .pairs()
                    .filter_map(|(_, chunk)| batch.host_of(chunk))
                    .collect();
                info!(task = %task.name, hosts = ?hosts, busy = ?fleet.busy_counts(), "✓ placed");
            }
            None => {
                let detail = balancer
                    .last_failure()
                    .map(|d| d.outcome)
                    .unwrap_or("fallback -> no decision");
                warn!(task = %task.name, outcome = detail, busy = ?fleet.busy_counts(), "✗ left queued");
            }
        }

        if cli.release {
            fleet.release_all();
        }
    }

    info!(
        placed,
        total = cli.batches,
        busy = ?fleet.busy_counts(),
        "=== Simulation complete ==="
    );
}
