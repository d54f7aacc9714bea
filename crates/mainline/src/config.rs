//! Configuration for mainline.
//!
//! Settings live in a YAML file; every field has a default so an empty or
//! partial file is valid. The graph store location may additionally come
//! from the environment, which takes precedence over the file.

use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Primary environment variable naming the graph store.
pub const DATABASE_URL_ENV: &str = "MAINLINE_DATABASE_URL";

/// Fallback environment variable naming the graph store.
pub const FALLBACK_DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Store location used when nothing else is configured.
pub const DEFAULT_DATABASE: &str = "mainline.db";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MainlineConfig {
    /// Graph store connection string (`sqlite://path` or a bare path).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Graph build settings.
    pub graph: GraphConfig,

    /// Query-time analysis settings.
    pub analysis: AnalysisConfig,

    /// Batch criticality settings.
    pub criticality: CriticalityConfig,

    /// HTTP server settings.
    pub server: ServerConfig,
}

/// Graph build settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Endpoints closer than this many metres share a node.
    #[serde(rename = "snap-tolerance-m")]
    pub snap_tolerance_m: f64,

    /// Lowest dead-end share considered plausible.
    #[serde(rename = "min-dead-end-ratio")]
    pub min_dead_end_ratio: f64,

    /// Highest dead-end share considered plausible.
    #[serde(rename = "max-dead-end-ratio")]
    pub max_dead_end_ratio: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            snap_tolerance_m: 1.0,
            min_dead_end_ratio: 0.0,
            max_dead_end_ratio: 0.6,
        }
    }
}

impl GraphConfig {
    /// Expected dead-end share as a range.
    #[must_use]
    pub fn dead_end_range(&self) -> RangeInclusive<f64> {
        self.min_dead_end_ratio..=self.max_dead_end_ratio
    }
}

/// Query-time analysis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum snapping distance for point queries, in metres.
    #[serde(rename = "search-radius-m")]
    pub search_radius_m: f64,

    /// Node budget for a single traversal.
    #[serde(rename = "max-traversal-nodes")]
    pub max_traversal_nodes: usize,

    /// Disconnected share of the network above which an outage is logged as
    /// suspicious.
    #[serde(rename = "max-disconnected-fraction")]
    pub max_disconnected_fraction: f64,

    /// Hop limit for spread queries that do not give one.
    #[serde(rename = "default-spread-hops")]
    pub default_spread_hops: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            search_radius_m: 1000.0,
            max_traversal_nodes: 5_000_000,
            max_disconnected_fraction: 0.5,
            default_spread_hops: 5,
        }
    }
}

/// Batch criticality settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalityConfig {
    /// Scores at or above this are `medium`.
    #[serde(rename = "medium-threshold")]
    pub medium_threshold: u32,

    /// Scores at or above this are `high`.
    #[serde(rename = "high-threshold")]
    pub high_threshold: u32,

    /// Length of the ranking report.
    #[serde(rename = "top-n")]
    pub top_n: usize,

    /// Edges between progress reports.
    #[serde(rename = "progress-interval")]
    pub progress_interval: usize,
}

impl Default for CriticalityConfig {
    fn default() -> Self {
        Self {
            medium_threshold: 5,
            high_threshold: 20,
            top_n: 10,
            progress_interval: 100,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

impl MainlineConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read and `Error::Config` if
    /// it is not valid YAML or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` on serialization failure and `Error::Io` if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        let g = &self.graph;
        if !g.snap_tolerance_m.is_finite() || g.snap_tolerance_m < 0.0 {
            return Err(Error::Config(
                "graph.snap-tolerance-m must be a non-negative number".into(),
            ));
        }
        if g.min_dead_end_ratio > g.max_dead_end_ratio {
            return Err(Error::Config(
                "graph.min-dead-end-ratio exceeds graph.max-dead-end-ratio".into(),
            ));
        }
        let a = &self.analysis;
        if a.search_radius_m.is_nan() || a.search_radius_m < 0.0 {
            return Err(Error::Config(
                "analysis.search-radius-m must be non-negative".into(),
            ));
        }
        if a.max_traversal_nodes == 0 {
            return Err(Error::Config(
                "analysis.max-traversal-nodes must be positive".into(),
            ));
        }
        let c = &self.criticality;
        if c.medium_threshold > c.high_threshold {
            return Err(Error::Config(
                "criticality.medium-threshold exceeds criticality.high-threshold".into(),
            ));
        }
        if c.progress_interval == 0 {
            return Err(Error::Config(
                "criticality.progress-interval must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the graph store path from the process environment and this
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for connection strings with a non-SQLite scheme.
    pub fn database_path(&self) -> Result<PathBuf> {
        self.database_path_with(|key| std::env::var(key).ok())
    }

    /// Resolve the graph store path using `env` for variable lookup.
    ///
    /// Precedence: `MAINLINE_DATABASE_URL`, `DATABASE_URL`, the `database`
    /// field, then `mainline.db`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for connection strings with a non-SQLite scheme.
    pub fn database_path_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
        let set = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let location = set(DATABASE_URL_ENV)
            .or_else(|| set(FALLBACK_DATABASE_URL_ENV))
            .or_else(|| self.database.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        parse_database_url(&location)
    }
}

/// Turn a connection string into a file path.
///
/// Accepts `sqlite://path`, `sqlite:path` and bare paths.
///
/// # Errors
///
/// Returns `Error::Config` for any other `scheme://` prefix.
pub fn parse_database_url(url: &str) -> Result<PathBuf> {
    let url = url.trim();
    if let Some(rest) = url.strip_prefix("sqlite://") {
        return Ok(PathBuf::from(rest));
    }
    if let Some(rest) = url.strip_prefix("sqlite:") {
        return Ok(PathBuf::from(rest));
    }
    if let Some((scheme, _)) = url.split_once("://") {
        return Err(Error::Config(format!(
            "unsupported database scheme '{scheme}', expected sqlite"
        )));
    }
    if url.is_empty() {
        return Err(Error::Config("database location is empty".into()));
    }
    Ok(PathBuf::from(url))
}
