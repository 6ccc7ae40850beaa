//! Probe policy: timing knobs for the health monitor

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing configuration for the probe loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbePolicy {
    /// Seconds between probe cycles
    ///
    /// The first cycle runs immediately at startup; subsequent cycles
    /// start on this fixed interval.
    ///
    /// **Default:** 5
    pub interval_secs: u64,

    /// Per-probe timeout in milliseconds
    ///
    /// Bounds both the TCP reachability check and the HTTP liveness
    /// check individually; an expired timeout hard-aborts the probe and
    /// counts as unhealthy.
    ///
    /// **Default:** 1000
    pub probe_timeout_ms: u64,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            probe_timeout_ms: 1000,
        }
    }
}

impl ProbePolicy {
    /// Probe interval as a [`Duration`]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Per-probe timeout as a [`Duration`]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Validate the policy configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_secs == 0 {
            return Err("interval_secs must be greater than 0".to_string());
        }

        if self.probe_timeout_ms == 0 {
            return Err("probe_timeout_ms must be greater than 0".to_string());
        }

        Ok(())
    }
}
