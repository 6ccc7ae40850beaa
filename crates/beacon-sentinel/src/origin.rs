//! Origin configuration and health state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors in origin configuration
#[derive(Error, Debug)]
pub enum OriginError {
    /// Probe URL failed to parse
    #[error("invalid probe URL {url:?}: {source}")]
    InvalidProbeUrl {
        url: String,
        source: url::ParseError,
    },

    /// Probe URL carries no host to connect to
    #[error("probe URL {url:?} has no host")]
    MissingHost { url: String },
}

/// A configured upstream location assets may be fetched from
///
/// Immutable for the process lifetime; the configured order of origins
/// is their failover priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Display name, unique among configured origins
    pub name: String,

    /// Base URL assets are fetched from (`{base_url}/{hashed}`)
    pub base_url: String,

    /// Well-known liveness path probed each cycle
    pub probe_url: String,
}

impl Origin {
    /// Create an origin from its three configuration values
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        probe_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            probe_url: probe_url.into(),
        }
    }

    /// Host and port the reachability check connects to
    ///
    /// Derived from the probe URL; a missing port falls back to the
    /// scheme's default (80/443).
    pub fn probe_target(&self) -> Result<(String, u16), OriginError> {
        let parsed = url::Url::parse(&self.probe_url).map_err(|source| {
            OriginError::InvalidProbeUrl {
                url: self.probe_url.clone(),
                source,
            }
        })?;
        let host = parsed
            .host_str()
            .ok_or_else(|| OriginError::MissingHost {
                url: self.probe_url.clone(),
            })?
            .to_string();
        let port = parsed.port_or_known_default().unwrap_or(80);
        Ok((host, port))
    }
}

/// Probe verdict for one origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginStatus {
    /// Reachable and the liveness check returned 2xx in time
    Healthy,
    /// Unreachable, timed out, or liveness returned non-2xx
    Unhealthy,
}

impl OriginStatus {
    /// String form used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            OriginStatus::Healthy => "healthy",
            OriginStatus::Unhealthy => "unhealthy",
        }
    }

    /// True for [`OriginStatus::Healthy`]
    pub fn is_healthy(&self) -> bool {
        matches!(self, OriginStatus::Healthy)
    }
}

/// Health record for one origin, replaced wholesale every probe cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginHealth {
    /// Verdict of the most recently completed probe
    pub status: OriginStatus,

    /// When that probe completed (updated every cycle regardless of outcome)
    #[serde(rename = "lastChecked")]
    pub last_checked: DateTime<Utc>,
}

impl OriginHealth {
    /// Record a probe verdict stamped with the current time
    pub fn now(status: OriginStatus) -> Self {
        Self {
            status,
            last_checked: Utc::now(),
        }
    }
}

/// Current health of every probed origin, keyed by origin name
///
/// An origin absent from the map has never completed a probe (unknown),
/// which the selector treats the same as unhealthy.
pub type HealthSnapshot = BTreeMap<String, OriginHealth>;
