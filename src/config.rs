//! Desk configuration.
//!
//! Loaded from a TOML file (path in `WILDGUARD_CONFIG`) or defaults.
//! Every field has a serde default so partial files are accepted.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "WILDGUARD_CONFIG";

/// Paging limits for list operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Notifications and alerts page larger by default.
    #[serde(default = "default_notification_limit")]
    pub notification_default_limit: usize,
}

fn default_limit() -> usize {
    10
}

fn default_max_limit() -> usize {
    100
}

fn default_notification_limit() -> usize {
    50
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            notification_default_limit: default_notification_limit(),
        }
    }
}

/// Workload and recommendation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentConfig {
    /// Officers at or above this open caseload are hidden from "available only" listings.
    #[serde(default = "default_busy_threshold")]
    pub busy_threshold: usize,

    /// Officer score is `max(0, base - open caseload)`.
    #[serde(default = "default_recommendation_base")]
    pub recommendation_base: usize,

    #[serde(default = "default_recommendation_top")]
    pub recommendation_top: usize,

    #[serde(default = "default_team_score_staffed")]
    pub team_score_staffed: usize,

    #[serde(default = "default_team_score_empty")]
    pub team_score_empty: usize,
}

fn default_busy_threshold() -> usize {
    5
}

fn default_recommendation_base() -> usize {
    10
}

fn default_recommendation_top() -> usize {
    5
}

fn default_team_score_staffed() -> usize {
    8
}

fn default_team_score_empty() -> usize {
    5
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            busy_threshold: default_busy_threshold(),
            recommendation_base: default_recommendation_base(),
            recommendation_top: default_recommendation_top(),
            team_score_staffed: default_team_score_staffed(),
            team_score_empty: default_team_score_empty(),
        }
    }
}

/// Alert read-side settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Radius in metres for location-based alert queries.
    #[serde(default = "default_radius_m")]
    pub default_radius_m: f64,
}

fn default_radius_m() -> f64 {
    1000.0
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            default_radius_m: default_radius_m(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeskConfig {
    #[serde(default)]
    pub pagination: PaginationConfig,

    #[serde(default)]
    pub assignment: AssignmentConfig,

    #[serde(default)]
    pub alerts: AlertConfig,
}

impl DeskConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse desk config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_toml_str(&raw)?;
        log::info!("CONFIG_LOADED path={}", path.display());
        Ok(config)
    }

    /// Load from the file named by `WILDGUARD_CONFIG`, defaults when unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load(Path::new(&path)),
            _ => {
                log::info!("CONFIG_DEFAULTS reason=no_{}", CONFIG_ENV);
                Ok(Self::default())
            }
        }
    }
}
