//! The monitor daemon: probe every origin forever
//!
//! Runs the probe protocol for all configured origins concurrently each
//! cycle, replaces the shared health state, and publishes one coalesced
//! snapshot per cycle to the status broadcast. The first cycle runs
//! immediately at startup for cold-start visibility; subsequent cycles
//! run on the fixed policy interval.

use crate::broadcast::StatusBroadcast;
use crate::origin::{HealthSnapshot, Origin, OriginHealth};
use crate::policy::ProbePolicy;
use crate::probe::probe_origin;
use crate::select::select_origin;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Origin health monitor
///
/// Owns the health state exclusively: every probe cycle writes a full
/// replacement record per origin, never a partial update. Readers hold
/// the shared handle from [`Monitor::health`] and the broadcast from
/// [`Monitor::broadcast`].
pub struct Monitor {
    origins: Arc<Vec<Origin>>,
    policy: ProbePolicy,
    client: reqwest::Client,
    health: Arc<RwLock<HealthSnapshot>>,
    broadcast: StatusBroadcast,
}

impl Monitor {
    /// Create a monitor for the given origins
    ///
    /// # Panics
    ///
    /// Panics if the policy fails validation; validate configuration
    /// before constructing.
    pub fn new(origins: Vec<Origin>, policy: ProbePolicy) -> Self {
        if let Err(e) = policy.validate() {
            panic!("Invalid probe policy: {}", e);
        }

        Self {
            origins: Arc::new(origins),
            policy,
            client: reqwest::Client::new(),
            health: Arc::new(RwLock::new(HealthSnapshot::new())),
            broadcast: StatusBroadcast::new(),
        }
    }

    /// Shared read handle to the current health state
    pub fn health(&self) -> Arc<RwLock<HealthSnapshot>> {
        self.health.clone()
    }

    /// Handle to the status broadcast channel
    pub fn broadcast(&self) -> StatusBroadcast {
        self.broadcast.clone()
    }

    /// The configured origins, in failover priority order
    pub fn origins(&self) -> Arc<Vec<Origin>> {
        self.origins.clone()
    }

    /// Copy of the current health state
    pub async fn snapshot(&self) -> HealthSnapshot {
        self.health.read().await.clone()
    }

    /// Base URL of the preferred healthy origin, if any
    pub async fn alive_origin(&self) -> Option<Origin> {
        let health = self.health.read().await;
        select_origin(&self.origins, &health).cloned()
    }

    /// Main event loop - runs forever
    ///
    /// Typically spawned as a background tokio task:
    ///
    /// ```no_run
    /// # use beacon_sentinel::{Monitor, ProbePolicy};
    /// # async fn example() {
    /// let monitor = Monitor::new(Vec::new(), ProbePolicy::default());
    /// tokio::spawn(async move {
    ///     monitor.run().await;
    /// });
    /// # }
    /// ```
    ///
    /// Cycles never overlap: a cycle runs to completion before the next
    /// tick is taken, and ticks missed while a slow cycle was in flight
    /// are skipped rather than stacked.
    pub async fn run(self) {
        info!(
            "🛰️  Sentinel active | {} origins | interval {}s | probe timeout {}ms",
            self.origins.len(),
            self.policy.interval_secs,
            self.policy.probe_timeout_ms
        );

        let mut interval = tokio::time::interval(self.policy.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            // First tick completes immediately: cold-start visibility.
            interval.tick().await;
            self.run_cycle().await;
        }
    }

    /// Execute a single probe cycle across all origins
    ///
    /// Probes fan out concurrently, the health map is replaced per
    /// origin, and one coalesced snapshot is published at the end.
    ///
    /// Note: public for integration testing.
    pub async fn run_cycle(&self) {
        let probes = self.origins.iter().map(|origin| {
            let client = self.client.clone();
            let probe_timeout = self.policy.probe_timeout();
            async move {
                let outcome = probe_origin(&client, origin, probe_timeout).await;
                (origin, outcome)
            }
        });

        let results = join_all(probes).await;

        let snapshot = {
            let mut health = self.health.write().await;
            for (origin, outcome) in results {
                let record = OriginHealth::now(outcome.status());
                if record.status.is_healthy() {
                    info!("✅ {} {}", origin.name, outcome.describe());
                } else {
                    warn!("❌ {} {}", origin.name, outcome.describe());
                }
                health.insert(origin.name.clone(), record);
            }
            health.clone()
        };

        self.broadcast.publish(snapshot);
    }
}
