//! Policy configuration store.
//!
//! A [`PolicyConfig`] maps each [`PolicyKind`] to an `(enabled, mode)`
//! [`PolicyEntry`]. The [`PolicyConfigStore`] owns the live configuration of a
//! simulation session and hands out whole snapshots, so an entry's `enabled`
//! flag and mode are always observed together.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use common::{SimulatorError, SimulatorResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// Simulated security policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Content-Security-Policy.
    Csp,
    /// HTTP Strict-Transport-Security.
    Hsts,
    /// Cross-Origin Resource Sharing.
    Cors,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 3] = [PolicyKind::Csp, PolicyKind::Hsts, PolicyKind::Cors];

    pub(crate) fn index(self) -> usize {
        match self {
            PolicyKind::Csp => 0,
            PolicyKind::Hsts => 1,
            PolicyKind::Cors => 2,
        }
    }

    /// Lowercase name, as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::Csp => "csp",
            PolicyKind::Hsts => "hsts",
            PolicyKind::Cors => "cors",
        }
    }

    /// Whether the evaluator has rules for this kind in `mode`.
    pub fn supports(&self, mode: PolicyMode) -> bool {
        match mode {
            PolicyMode::Basic | PolicyMode::Strict => true,
            PolicyMode::ReportOnly => matches!(self, PolicyKind::Csp),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_uppercase())
    }
}

impl FromStr for PolicyKind {
    type Err = SimulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csp" | "content-security-policy" => Ok(PolicyKind::Csp),
            "hsts" | "strict-transport-security" => Ok(PolicyKind::Hsts),
            "cors" => Ok(PolicyKind::Cors),
            _ => Err(SimulatorError::unknown_kind(s)),
        }
    }
}

/// Simulation strictness of a policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyMode {
    #[default]
    Basic,
    Strict,
    /// Evaluate like `Basic` but never block (CSP only).
    ReportOnly,
}

impl PolicyMode {
    pub fn name(&self) -> &'static str {
        match self {
            PolicyMode::Basic => "basic",
            PolicyMode::Strict => "strict",
            PolicyMode::ReportOnly => "report-only",
        }
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyMode {
    type Err = SimulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(PolicyMode::Basic),
            "strict" => Ok(PolicyMode::Strict),
            "report-only" | "report_only" | "reportonly" => Ok(PolicyMode::ReportOnly),
            _ => Err(SimulatorError::unknown_mode(s)),
        }
    }
}

/// Toggle and mode of a single policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub enabled: bool,
    #[serde(default)]
    pub mode: PolicyMode,
}

impl PolicyEntry {
    pub fn enabled(mode: PolicyMode) -> Self {
        Self {
            enabled: true,
            mode,
        }
    }

    pub fn disabled(mode: PolicyMode) -> Self {
        Self {
            enabled: false,
            mode,
        }
    }
}

/// A policy enabled in a mode the evaluator has no rules for.
///
/// Such a policy is treated as disabled.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[error("{kind} does not support {mode} mode; policy treated as disabled")]
pub struct ConfigWarning {
    pub kind: PolicyKind,
    pub mode: PolicyMode,
}

/// Active policy set. Kinds that are absent or disabled are never evaluated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicyConfig {
    entries: [Option<PolicyEntry>; 3],
}

impl PolicyConfig {
    /// Create a configuration with no policies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`PolicyConfig::set`] that enables `kind` in `mode`.
    pub fn with_policy(mut self, kind: PolicyKind, mode: PolicyMode) -> Self {
        self.set(kind, PolicyEntry::enabled(mode));
        self
    }

    pub fn get(&self, kind: PolicyKind) -> Option<PolicyEntry> {
        self.entries[kind.index()]
    }

    pub fn set(&mut self, kind: PolicyKind, entry: PolicyEntry) {
        self.entries[kind.index()] = Some(entry);
    }

    /// Drop `kind` from the set; it is no longer evaluated.
    pub fn remove(&mut self, kind: PolicyKind) {
        self.entries[kind.index()] = None;
    }

    /// Mode `kind` is evaluated in, or `None` when it is absent, disabled or
    /// enabled in an unsupported mode.
    pub fn active_mode(&self, kind: PolicyKind) -> Option<PolicyMode> {
        self.get(kind)
            .filter(|entry| entry.enabled && kind.supports(entry.mode))
            .map(|entry| entry.mode)
    }

    /// Policies that will be evaluated, in kind order.
    pub fn active(&self) -> impl Iterator<Item = (PolicyKind, PolicyMode)> + '_ {
        PolicyKind::ALL
            .into_iter()
            .filter_map(|kind| self.active_mode(kind).map(|mode| (kind, mode)))
    }

    pub fn any_active(&self) -> bool {
        self.active().next().is_some()
    }

    /// Enabled policies whose mode the evaluator cannot honour.
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        PolicyKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let entry = self.get(kind)?;
                (entry.enabled && !kind.supports(entry.mode)).then_some(ConfigWarning {
                    kind,
                    mode: entry.mode,
                })
            })
            .collect()
    }
}

/// Lock-guarded configuration owned by a simulation session.
#[derive(Debug, Default)]
pub struct PolicyConfigStore {
    config: RwLock<PolicyConfig>,
}

impl PolicyConfigStore {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    /// Current `(enabled, mode)` of `kind`; absent kinds read as disabled.
    pub fn get(&self, kind: PolicyKind) -> PolicyEntry {
        self.config.read().get(kind).unwrap_or_default()
    }

    /// Update a policy. Takes effect for requests evaluated afterwards.
    ///
    /// Returns a warning when `mode` is not supported for `kind`.
    pub fn set(&self, kind: PolicyKind, enabled: bool, mode: PolicyMode) -> Option<ConfigWarning> {
        self.config.write().set(kind, PolicyEntry { enabled, mode });
        info!("Policy {} set to {} ({})", kind, mode, if enabled { "enabled" } else { "disabled" });

        if enabled && !kind.supports(mode) {
            let warning = ConfigWarning { kind, mode };
            warn!("{}", warning);
            return Some(warning);
        }
        None
    }

    pub fn enable(&self, kind: PolicyKind, mode: PolicyMode) -> Option<ConfigWarning> {
        self.set(kind, true, mode)
    }

    /// Disable `kind`, keeping its last mode.
    pub fn disable(&self, kind: PolicyKind) {
        let mut config = self.config.write();
        let mode = config.get(kind).map(|entry| entry.mode).unwrap_or_default();
        config.set(kind, PolicyEntry::disabled(mode));
        info!("Policy {} disabled", kind);
    }

    pub fn disable_all(&self) {
        let mut config = self.config.write();
        for kind in PolicyKind::ALL {
            let mode = config.get(kind).map(|entry| entry.mode).unwrap_or_default();
            config.set(kind, PolicyEntry::disabled(mode));
        }
        info!("All policies disabled");
    }

    /// Replace the whole configuration at once.
    pub fn replace(&self, config: PolicyConfig) {
        for warning in config.warnings() {
            warn!("{}", warning);
        }
        *self.config.write() = config;
    }

    /// Consistent copy of the current configuration.
    pub fn snapshot(&self) -> PolicyConfig {
        self.config.read().clone()
    }

    pub fn warnings(&self) -> Vec<ConfigWarning> {
        self.config.read().warnings()
    }
}

/// Serializable session settings, e.g. loaded from a JSON file.
///
/// ```json
/// { "page_url": "https://a.test/", "csp": { "enabled": true, "mode": "strict" } }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicySettings {
    /// Page the session starts on; used as initiator when a request has none.
    pub page_url: Option<String>,
    pub csp: Option<PolicyEntry>,
    pub hsts: Option<PolicyEntry>,
    pub cors: Option<PolicyEntry>,
}

impl PolicySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> SimulatorResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> SimulatorResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Enable `kind` in `mode`.
    pub fn with_policy(mut self, kind: PolicyKind, mode: PolicyMode) -> Self {
        *self.entry_mut(kind) = Some(PolicyEntry::enabled(mode));
        self
    }

    /// Set the starting page.
    pub fn with_page_url(mut self, url: &str) -> Self {
        self.page_url = Some(url.to_string());
        self
    }

    pub fn entry(&self, kind: PolicyKind) -> Option<PolicyEntry> {
        match kind {
            PolicyKind::Csp => self.csp,
            PolicyKind::Hsts => self.hsts,
            PolicyKind::Cors => self.cors,
        }
    }

    fn entry_mut(&mut self, kind: PolicyKind) -> &mut Option<PolicyEntry> {
        match kind {
            PolicyKind::Csp => &mut self.csp,
            PolicyKind::Hsts => &mut self.hsts,
            PolicyKind::Cors => &mut self.cors,
        }
    }

    /// Reject settings whose page URL does not parse.
    pub fn validate(&self) -> SimulatorResult<()> {
        if let Some(page_url) = &self.page_url {
            let url = Url::parse(page_url)?;
            if url.host_str().is_none() {
                return Err(SimulatorError::invalid(format!(
                    "page_url {} has no host",
                    page_url
                )));
            }
        }
        Ok(())
    }

    pub fn to_config(&self) -> PolicyConfig {
        let mut config = PolicyConfig::new();
        for kind in PolicyKind::ALL {
            if let Some(entry) = self.entry(kind) {
                config.set(kind, entry);
            }
        }
        config
    }
}
