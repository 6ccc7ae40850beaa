//! The probe protocol: TCP reachability, then HTTP liveness
//!
//! Each probe is two short, timeout-bounded steps:
//!
//! 1. **Reachability** - a raw TCP connection to the probe URL's
//!    host:port. Failure or timeout means the origin is down at the
//!    network level; the liveness check is skipped entirely.
//! 2. **Liveness** - a cache-busted GET of the probe URL. Healthy iff
//!    the response arrives within the timeout with a 2xx status.
//!
//! Probe failures are outcomes, not errors: nothing here returns `Err`.

use crate::origin::{Origin, OriginStatus};
use chrono::Utc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Result of probing one origin once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Reachable and liveness returned 2xx within the timeout
    Healthy,
    /// TCP connection failed or timed out; liveness was never attempted
    Unreachable,
    /// Liveness request failed at the transport level or timed out
    RequestFailed(String),
    /// Liveness responded with a non-2xx status
    BadStatus(u16),
    /// Probe URL is not usable as a connection target
    BadProbeUrl(String),
}

impl ProbeOutcome {
    /// Collapse the outcome into the two-state origin status
    pub fn status(&self) -> OriginStatus {
        match self {
            ProbeOutcome::Healthy => OriginStatus::Healthy,
            _ => OriginStatus::Unhealthy,
        }
    }

    /// Short description for status logging
    pub fn describe(&self) -> String {
        match self {
            ProbeOutcome::Healthy => "alive".to_string(),
            ProbeOutcome::Unreachable => "tcp unreachable".to_string(),
            ProbeOutcome::RequestFailed(e) => format!("request failed: {}", e),
            ProbeOutcome::BadStatus(code) => format!("liveness returned {}", code),
            ProbeOutcome::BadProbeUrl(e) => format!("bad probe url: {}", e),
        }
    }
}

/// Probe one origin once
///
/// Never errors and never panics; every failure mode maps to an
/// unhealthy [`ProbeOutcome`].
pub async fn probe_origin(
    client: &reqwest::Client,
    origin: &Origin,
    probe_timeout: Duration,
) -> ProbeOutcome {
    // Step 1: reachability.
    let (host, port) = match origin.probe_target() {
        Ok(target) => target,
        Err(e) => return ProbeOutcome::BadProbeUrl(e.to_string()),
    };

    match timeout(probe_timeout, TcpStream::connect((host.as_str(), port))).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            debug!(origin = %origin.name, %host, port, "tcp connect failed: {}", e);
            return ProbeOutcome::Unreachable;
        }
        Err(_) => {
            debug!(origin = %origin.name, %host, port, "tcp connect timed out");
            return ProbeOutcome::Unreachable;
        }
    }

    // Step 2: liveness, cache-busted so intermediaries never satisfy it.
    let url = format!("{}?_={}", origin.probe_url, Utc::now().timestamp_millis());
    match client.get(&url).timeout(probe_timeout).send().await {
        Ok(response) if response.status().is_success() => ProbeOutcome::Healthy,
        Ok(response) => ProbeOutcome::BadStatus(response.status().as_u16()),
        Err(e) => ProbeOutcome::RequestFailed(e.to_string()),
    }
}
