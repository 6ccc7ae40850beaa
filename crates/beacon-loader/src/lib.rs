//! Beacon Loader: manifest-driven asset loading with origin failover
//!
//! The loader runs once per page/session. It discovers the currently
//! alive origin and the asset manifest from the control API, then loads
//! critical assets one at a time in manifest order (so scripts that
//! define globals run before scripts that use them) and optional assets
//! concurrently afterwards. Every load tries the preferred origin first
//! and retries exactly once against the local fallback; an asset that
//! exhausts both candidates is recorded as failed and the page moves on.
//!
//! DOM concerns are modelled explicitly: a successful load yields an
//! [`Injection`] describing what to insert where (front-of-container
//! for critical scripts, back otherwise) instead of touching any
//! document directly.
//!
//! # Example
//!
//! ```no_run
//! use beacon_loader::{AssetLoader, HttpFetcher};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let client = reqwest::Client::new();
//! let origin = beacon_loader::alive_origin(&client, "http://localhost:3000").await;
//! let manifest = beacon_loader::fetch_manifest(&client, "http://localhost:3000").await;
//!
//! let loader = AssetLoader::new(
//!     Arc::new(HttpFetcher::new(client)),
//!     "http://localhost:3000/files",
//! );
//! let report = loader.load(origin.as_deref(), &manifest).await;
//! println!("{} assets injected", report.injections.len());
//! # }
//! ```

pub mod discover;
pub mod fetch;
pub mod loader;

// Re-export main types for convenience
pub use discover::{alive_origin, fetch_manifest};
pub use fetch::{AssetFetcher, FetchError, HttpFetcher};
pub use loader::{AssetKind, AssetLoader, Injection, LoadReport, Position};
