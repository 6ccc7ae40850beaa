/*!
 * Beacon - Self-healing asset delivery
 *
 * The workspace splits along the system's seams:
 *
 * - `beacon-core-manifest` - content addressing, rule engine, manifest
 *   persistence
 * - `beacon-sentinel` - origin health monitoring and failover selection
 * - `beacon-server` - control plane API, asset bucket and status stream
 * - `beacon-loader` - manifest-driven asset loading with fallback
 *
 * This crate is the binary glue: configuration, logging and the CLI.
 */

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError, RuleConfig};

// Workspace crates under their domain names
pub use beacon_core_manifest as manifest;
pub use beacon_loader as loader;
pub use beacon_sentinel as sentinel;
pub use beacon_server as server;
