use crate::discovery::{DiscoveryPlan, DiscoveryStrategy, DEFAULT_RETRY_DELAY_MS};
use crate::document::{DEFAULT_RECENT_COUNT, DEFAULT_RETENTION};
use crate::error::Result;
use crate::io;
use crate::paths;
use crate::reconcile::ReconcileSettings;
use crate::types::DocumentScope;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SLACK_BASE_URL: &str = "https://slack.com/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// HistoryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub scope: DocumentScope,
    #[serde(default = "default_retention")]
    pub retention: usize,
    #[serde(default = "default_recent_count")]
    pub recent_count: usize,
}

fn default_true() -> bool {
    true
}

fn default_retention() -> usize {
    DEFAULT_RETENTION
}

fn default_recent_count() -> usize {
    DEFAULT_RECENT_COUNT
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scope: DocumentScope::default(),
            retention: default_retention(),
            recent_count: default_recent_count(),
        }
    }
}

// ---------------------------------------------------------------------------
// DiscoveryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_strategies")]
    pub strategies: Vec<DiscoveryStrategy>,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_strategies() -> Vec<DiscoveryStrategy> {
    DiscoveryStrategy::all().to_vec()
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl DiscoveryConfig {
    pub fn plan(&self) -> DiscoveryPlan {
        DiscoveryPlan::new(
            self.strategies.clone(),
            Duration::from_millis(self.retry_delay_ms),
        )
    }
}

// ---------------------------------------------------------------------------
// SlackConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_SLACK_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// MetadataConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Relative to the project root unless absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl Config {
    /// Load `.relnote/config.yaml`; a missing file means defaults.
    pub fn load(root: &Path) -> Result<Self> {
        match io::read_optional(&paths::config_path(root))? {
            Some(data) => Ok(serde_yaml::from_str(&data)?),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(&paths::config_path(root), data.as_bytes())
    }

    pub fn reconcile_settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            scope: self.history.scope,
            retention: self.history.retention,
            recent_count: self.history.recent_count,
            plan: self.discovery.plan(),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level: WarnLevel, message: String| warnings.push(ConfigWarning { level, message });

        if self.history.retention == 0 {
            push(
                WarnLevel::Error,
                "history.retention is 0; at least one release is always kept".to_string(),
            );
        }
        if self.history.recent_count == 0 {
            push(
                WarnLevel::Warning,
                "history.recent_count is 0; the newest release is still shown as recent".to_string(),
            );
        }
        if self.history.recent_count > self.history.retention {
            push(
                WarnLevel::Warning,
                format!(
                    "history.recent_count ({}) exceeds history.retention ({}); the All Releases section will never appear",
                    self.history.recent_count, self.history.retention
                ),
            );
        }

        if self.discovery.strategies.is_empty() {
            push(
                WarnLevel::Warning,
                "discovery.strategies is empty; every run will create a new document".to_string(),
            );
        }
        // Scope mismatches are reported for hand-written lists only.
        let customized = self.discovery.strategies != default_strategies();
        let mut seen = HashSet::new();
        for strategy in &self.discovery.strategies {
            if !seen.insert(*strategy) {
                push(
                    WarnLevel::Warning,
                    format!("discovery strategy '{strategy}' is listed more than once"),
                );
            }
            if customized && !strategy.applies_to(self.history.scope) {
                push(
                    WarnLevel::Warning,
                    format!(
                        "discovery strategy '{strategy}' is ignored in {} scope",
                        self.history.scope
                    ),
                );
            }
        }
        if self.discovery.retry_delay_ms > 30_000 {
            push(
                WarnLevel::Warning,
                format!(
                    "discovery.retry_delay_ms ({}) delays every first-time publish by over 30s",
                    self.discovery.retry_delay_ms
                ),
            );
        }

        if self.slack.timeout_secs == 0 {
            push(WarnLevel::Error, "slack.timeout_secs must be greater than 0".to_string());
        }
        if !self.slack.base_url.starts_with("http://") && !self.slack.base_url.starts_with("https://") {
            push(
                WarnLevel::Error,
                format!("slack.base_url '{}' is not an http(s) URL", self.slack.base_url),
            );
        }

        warnings
    }
}
