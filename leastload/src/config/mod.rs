//! Fleet and balancer configuration loading.
//!
//! The expected YAML structure is:
//! ```yaml
//! balancer:
//!   global_strategy: most_idle      # most_idle | longest_unused | load_percentage | disabled
//!   failure_policy: no_decision     # no_decision | delegate
//!   shuffle_seed: 42
//! hosts:
//!   agent1:
//!     slots: 4
//!     busy: 0
//!     labels: [linux, x86_64]
//!     online: true
//!     accepting_tasks: true
//! jobs:
//!   nightly:
//!     strategy: longest_unused      # any of the above, or use_global
//!     disabled: false
//! ```
//!
//! Every section is optional.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::balancer::BalancerSettings;
use crate::strategy::StrategySelection;
use crate::work::JobRef;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Deserialize)]
struct FleetConfigFile {
    #[serde(default)]
    balancer: BalancerSettings,
    #[serde(default)]
    hosts: HashMap<String, HostConfigEntry>,
    #[serde(default)]
    jobs: HashMap<String, JobConfigEntry>,
}

/// Per-host fields as they appear in the YAML file.
#[derive(Debug, Deserialize)]
struct HostConfigEntry {
    #[serde(default = "default_slots")]
    slots: u32,
    #[serde(default)]
    busy: u32,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default = "default_true")]
    online: bool,
    #[serde(default = "default_true")]
    accepting_tasks: bool,
}

#[derive(Debug, Deserialize)]
struct JobConfigEntry {
    strategy: Option<StrategySelection>,
    #[serde(default)]
    disabled: bool,
}

fn default_slots() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

// ── Public data structures ────────────────────────────────────────────────────

/// Static description of one host in the simulated fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub name: String,
    pub slots: u32,
    pub busy: u32,
    pub labels: BTreeSet<String>,
    pub online: bool,
    pub accepting_tasks: bool,
}

impl HostConfig {
    /// The host used when no configuration file is supplied.
    pub fn default_config(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: 2,
            busy: 0,
            labels: BTreeSet::new(),
            online: true,
            accepting_tasks: true,
        }
    }

    pub fn idle(&self) -> u32 {
        self.slots.saturating_sub(self.busy)
    }
}

// ── FleetConfigManager ────────────────────────────────────────────────────────

/// Loads and holds the balancer settings, host list and per-job overrides.
#[derive(Debug, Default)]
pub struct FleetConfigManager {
    hosts: HashMap<String, HostConfig>,
    jobs: HashMap<String, JobRef>,
    balancer: BalancerSettings,

    /// Set to `true` after a successful [`load_from_file`](Self::load_from_file).
    loaded: bool,
}

impl FleetConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager holding `count` default hosts (`agent1`, `agent2`, …) and
    /// default balancer settings.
    pub fn with_default_hosts(count: usize) -> Self {
        let hosts = (1..=count)
            .map(|i| {
                let cfg = HostConfig::default_config(format!("agent{i}"));
                (cfg.name.clone(), cfg)
            })
            .collect();
        Self {
            hosts,
            ..Self::default()
        }
    }

    /// Parses `path` and replaces everything previously loaded.
    ///
    /// * An empty (or missing) `hosts` section inserts a single
    ///   `"default_host"`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is invalid, or
    /// a host declares more busy slots than it has.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        info!("Loading fleet configuration from: {}", path.display());

        // Reset state before (re-)loading
        self.hosts.clear();
        self.jobs.clear();
        self.balancer = BalancerSettings::default();
        self.loaded = false;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let file: FleetConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        let mut hosts = HashMap::with_capacity(file.hosts.len());
        for (name, entry) in file.hosts {
            if entry.busy > entry.slots {
                bail!(
                    "host '{}' declares {} busy slot(s) but only has {}",
                    name,
                    entry.busy,
                    entry.slots
                );
            }
            let host = HostConfig {
                name: name.clone(),
                slots: entry.slots,
                busy: entry.busy,
                labels: entry.labels.into_iter().collect(),
                online: entry.online,
                accepting_tasks: entry.accepting_tasks,
            };
            debug!(
                "  Host: {} | slots: {} | busy: {} | labels: {:?}",
                host.name, host.slots, host.busy, host.labels,
            );
            hosts.insert(name, host);
        }

        if hosts.is_empty() {
            warn!("No hosts found in configuration file, using default host");
            hosts.insert(
                "default_host".to_string(),
                HostConfig::default_config("default_host"),
            );
        }

        let jobs = file
            .jobs
            .into_iter()
            .map(|(name, entry)| {
                let job = JobRef {
                    name: name.clone(),
                    strategy: entry.strategy,
                    disabled: entry.disabled,
                };
                (name, job)
            })
            .collect();

        if file.balancer.global_strategy == Some(StrategySelection::UseGlobal) {
            warn!("global_strategy 'use_global' names no strategy; placements will be refused");
        }

        self.hosts = hosts;
        self.jobs = jobs;
        self.balancer = file.balancer;
        self.loaded = true;

        info!(
            hosts = self.hosts.len(),
            jobs = self.jobs.len(),
            global_strategy = ?self.balancer.global_strategy,
            failure_policy = ?self.balancer.failure_policy,
            "Successfully loaded fleet configuration"
        );

        Ok(())
    }

    pub fn get_host_config(&self, name: &str) -> Option<&HostConfig> {
        self.hosts.get(name)
    }

    pub fn get_all_hosts(&self) -> &HashMap<String, HostConfig> {
        &self.hosts
    }

    /// The configured job named `name`, or an unconfigured job (global
    /// default applies) if it is not listed.
    pub fn job(&self, name: &str) -> JobRef {
        self.jobs
            .get(name)
            .cloned()
            .unwrap_or_else(|| JobRef::new(name))
    }

    pub fn balancer_settings(&self) -> &BalancerSettings {
        &self.balancer
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balancer::FailurePolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = HostConfig::default_config("default_host");
        assert_eq!(cfg.name, "default_host");
        assert_eq!(cfg.slots, 2);
        assert_eq!(cfg.idle(), 2);
        assert!(cfg.online && cfg.accepting_tasks);
        assert!(cfg.labels.is_empty());
    }

    #[test]
    fn with_default_hosts_names_agents_from_one() {
        let mgr = FleetConfigManager::with_default_hosts(2);
        assert!(mgr.get_host_config("agent1").is_some());
        assert!(mgr.get_host_config("agent2").is_some());
        assert!(mgr.get_host_config("agent3").is_none());
        assert!(!mgr.is_loaded());
    }

    #[test]
    fn load_full_yaml() {
        let yaml = r#"
balancer:
  global_strategy: longest_unused
  failure_policy: delegate
  shuffle_seed: 7
hosts:
  agent1:
    slots: 4
    labels: [linux, x86_64]
  agent2:
    slots: 8
    busy: 3
    labels: [linux]
    accepting_tasks: false
jobs:
  nightly:
    strategy: load_percentage
  legacy:
    disabled: true
"#;
        let f = yaml_tempfile(yaml);
        let mut mgr = FleetConfigManager::new();
        mgr.load_from_file(f.path()).unwrap();

        assert!(mgr.is_loaded());
        assert_eq!(mgr.get_all_hosts().len(), 2);

        let a1 = mgr.get_host_config("agent1").unwrap();
        assert_eq!(a1.slots, 4);
        assert_eq!(a1.busy, 0);
        assert!(a1.labels.contains("x86_64"));
        assert!(a1.online && a1.accepting_tasks);

        let a2 = mgr.get_host_config("agent2").unwrap();
        assert_eq!(a2.idle(), 5);
        assert!(!a2.accepting_tasks);

        let settings = mgr.balancer_settings();
        assert_eq!(settings.global_strategy, Some(StrategySelection::LongestUnused));
        assert_eq!(settings.failure_policy, FailurePolicy::Delegate);
        assert_eq!(settings.shuffle_seed, Some(7));

        assert_eq!(
            mgr.job("nightly").strategy,
            Some(StrategySelection::LoadPercentage)
        );
        assert!(mgr.job("legacy").disabled);
    }

    #[test]
    fn unknown_job_defers_to_global() {
        let mgr = FleetConfigManager::new();
        let job = mgr.job("adhoc");
        assert_eq!(job.name, "adhoc");
        assert!(!job.is_overridden());
        assert!(!job.disabled);
    }

    #[test]
    fn optional_fields_use_defaults_when_absent() {
        let f = yaml_tempfile("hosts:\n  minimal: {}\n");
        let mut mgr = FleetConfigManager::new();
        mgr.load_from_file(f.path()).unwrap();

        let host = mgr.get_host_config("minimal").unwrap();
        assert_eq!(host.slots, 1);
        assert!(host.online);
        assert_eq!(*mgr.balancer_settings(), BalancerSettings::default());
    }

    #[test]
    fn empty_hosts_section_inserts_default_host() {
        let f = yaml_tempfile("hosts: {}\n");
        let mut mgr = FleetConfigManager::new();
        mgr.load_from_file(f.path()).unwrap();

        assert!(mgr.is_loaded());
        assert!(mgr.get_host_config("default_host").is_some());
    }

    #[test]
    fn busy_above_slots_is_rejected() {
        let f = yaml_tempfile("hosts:\n  bad:\n    slots: 1\n    busy: 2\n");
        let mut mgr = FleetConfigManager::new();
        let err = mgr.load_from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("bad"));
        assert!(!mgr.is_loaded());
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let f = yaml_tempfile("balancer:\n  global_strategy: fastest\n");
        let mut mgr = FleetConfigManager::new();
        assert!(mgr.load_from_file(f.path()).is_err());
    }

    #[test]
    fn missing_file_returns_error() {
        let mut mgr = FleetConfigManager::new();
        let result = mgr.load_from_file(Path::new("/nonexistent/path/fleet.yaml"));
        assert!(result.is_err());
        assert!(!mgr.is_loaded());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        let mut mgr = FleetConfigManager::new();
        assert!(mgr.load_from_file(f.path()).is_err());
        assert!(!mgr.is_loaded());
    }

    #[test]
    fn reload_replaces_previous_content() {
        let f1 = yaml_tempfile("hosts:\n  h1: {}\njobs:\n  j1:\n    disabled: true\n");
        let f2 = yaml_tempfile("hosts:\n  h2: {}\n");

        let mut mgr = FleetConfigManager::new();
        mgr.load_from_file(f1.path()).unwrap();
        assert!(mgr.get_host_config("h1").is_some());
        assert!(mgr.job("j1").disabled);

        mgr.load_from_file(f2.path()).unwrap();
        assert!(mgr.get_host_config("h1").is_none(), "old host must be gone");
        assert!(mgr.get_host_config("h2").is_some());
        assert!(!mgr.job("j1").disabled, "old job override must be gone");
    }
}
