//! Origin selection: pure failover-by-priority

use crate::origin::{HealthSnapshot, Origin};

/// Pick the preferred reachable origin
///
/// Scans `origins` in configured order and returns the first whose
/// current status is healthy. Returns `None` iff no origin is healthy -
/// origins that have never been probed count as not healthy. No
/// randomness, no load balancing.
pub fn select_origin<'a>(origins: &'a [Origin], health: &HealthSnapshot) -> Option<&'a Origin> {
    origins.iter().find(|origin| {
        health
            .get(&origin.name)
            .map(|h| h.status.is_healthy())
            .unwrap_or(false)
    })
}
