//! Beacon Control Plane: asset bucket, manifest API and status stream
//!
//! The server owns the asset bucket directory and the persisted
//! manifest. It exposes:
//!
//! - `POST /api/upload` - multipart upload; files are written under
//!   content-addressed names, superseded versions are deleted and the
//!   manifest is updated in the same operation
//! - `POST /api/delete` - remove an asset and its manifest entry
//! - `GET  /files/:name` - serve asset bytes from the bucket
//! - `GET  /api/manifest.json` - the current manifest
//! - `GET  /api/alive-cdn.json` - base URL of the preferred healthy
//!   origin, or null when every origin is down
//! - `GET  /sse` - live health snapshots, current state first
//! - `GET  /api/health` - service liveness
//!
//! Health data comes from the sentinel monitor running alongside the
//! server; the two share the health map and broadcast channel through
//! [`state::AppState`].

pub mod api;
pub mod error;
pub mod server;
pub mod sse;
pub mod state;

pub use error::{ServerError, ServerResult};
pub use server::{run_server, ServerConfig};
pub use state::AppState;
