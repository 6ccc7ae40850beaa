/*!
 * Configuration types for Beacon
 */

use beacon_core_manifest::{LoadMode, Rule, RuleSet};
use beacon_sentinel::{Origin, ProbePolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] beacon_core_manifest::Error),

    #[error("Invalid probe policy: {0}")]
    InvalidPolicy(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// One classification rule as written in TOML
///
/// Fields left out inherit the attribute defaults, exactly like the
/// compiled rule only overriding what it names.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    pub pattern: String,
    pub critical: Option<bool>,
    pub mode: Option<LoadMode>,
    pub priority: Option<u32>,
}

impl RuleConfig {
    fn compile(&self) -> Result<Rule> {
        let mut rule = Rule::new(&self.pattern)?;
        if let Some(critical) = self.critical {
            rule = rule.critical(critical);
        }
        if let Some(mode) = self.mode {
            rule = rule.mode(mode);
        }
        if let Some(priority) = self.priority {
            rule = rule.priority(priority);
        }
        Ok(rule)
    }
}

/// Top-level configuration for the serve command
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bind address for the control plane server
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port for the control plane server
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the asset bucket
    #[serde(default = "default_bucket_dir")]
    pub bucket_dir: PathBuf,

    /// Upstream origins in failover preference order
    #[serde(default)]
    pub origins: Vec<Origin>,

    /// Probe loop timing
    #[serde(default)]
    pub probe: ProbePolicy,

    /// Classification rules; empty means the built-in defaults
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bucket_dir: default_bucket_dir(),
            origins: Vec::new(),
            probe: ProbePolicy::default(),
            rules: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// A missing file yields the defaults; a present but malformed file
    /// is a startup error.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check the values that cannot be validated by deserialization
    pub fn validate(&self) -> Result<()> {
        self.probe.validate().map_err(ConfigError::InvalidPolicy)
    }

    /// Compile the configured rules into a rule set
    ///
    /// No configured rules means the built-in defaults for scripts,
    /// stylesheets, images and pages.
    pub fn compile_rules(&self) -> Result<RuleSet> {
        if self.rules.is_empty() {
            return Ok(RuleSet::default());
        }
        let rules = self
            .rules
            .iter()
            .map(RuleConfig::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(RuleSet::new(rules))
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_bucket_dir() -> PathBuf {
    PathBuf::from("buckets")
}
