//! Beacon Sentinel: origin health monitoring and failover selection
//!
//! The sentinel continuously probes every configured content-delivery
//! origin and maintains its current health. Consumers ask one question -
//! "which origin should assets load from right now?" - and can watch a
//! live status stream for changes.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐   probe cycle    ┌──────────────┐
//! │  Monitor  │─────────────────▶│ HealthSnapshot│──▶ select_origin()
//! └─────┬─────┘  (tcp + http)    └──────────────┘
//!       │
//!       └── publish ──▶ StatusBroadcast ──▶ subscribers (SSE, UI)
//! ```
//!
//! Each cycle runs the probe protocol for all origins concurrently:
//! a TCP reachability check, then a cache-busted HTTP liveness check,
//! both bounded by a short timeout. Probe failures only flip status -
//! the monitor itself never stops.
//!
//! # Example
//!
//! ```no_run
//! use beacon_sentinel::{Monitor, Origin, ProbePolicy};
//!
//! # async fn example() {
//! let origins = vec![
//!     Origin::new("aws", "http://dev.cdn.example", "http://dev.cdn.example/ping.txt"),
//!     Origin::new("azure", "http://stage.cdn.example", "http://stage.cdn.example/ping.txt"),
//! ];
//!
//! let monitor = Monitor::new(origins, ProbePolicy::default());
//! let health = monitor.health();
//! let status_stream = monitor.broadcast();
//!
//! tokio::spawn(async move {
//!     monitor.run().await;
//! });
//! # }
//! ```

pub mod broadcast;
pub mod monitor;
pub mod origin;
pub mod policy;
pub mod probe;
pub mod select;

// Re-export main types for convenience
pub use broadcast::StatusBroadcast;
pub use monitor::Monitor;
pub use origin::{HealthSnapshot, Origin, OriginHealth, OriginStatus};
pub use policy::ProbePolicy;
pub use probe::{probe_origin, ProbeOutcome};
pub use select::select_origin;
