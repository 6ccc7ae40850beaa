//! Core manifest data structures for Beacon
//!
//! This crate provides the delivery-metadata plane for Beacon assets.
//! Every asset stored in the bucket carries a manifest entry describing
//! how a page should load it (critical or opportunistic, execution mode,
//! priority). Entries are derived from an ordered rule set and persisted
//! as a single JSON document that survives process restarts.
//!
//! # Key Concepts
//!
//! - **Rule Set**: ordered filename patterns; the first match decides an
//!   asset's delivery attributes
//! - **Manifest Store**: durable mapping from content-addressed filename
//!   to delivery attributes, kept consistent with the physical asset set
//! - **Content-addressed name**: `{stem}-{hash12}{ext}`, so a new upload
//!   of the same logical asset always produces a new physical name
//!
//! # Example
//!
//! ```
//! use beacon_core_manifest::{ManifestStore, RuleSet, hashed_name};
//!
//! let rules = RuleSet::default();
//! let name = hashed_name("app.js", b"console.log(1)");
//!
//! let mut store = ManifestStore::new("manifest.json");
//! store.upsert(&name, rules.classify(&name));
//! assert_eq!(store.list().len(), 1);
//! ```

pub mod error;
pub mod rules;
pub mod store;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use rules::{Attributes, LoadMode, Rule, RuleSet};
pub use store::{hashed_name, logical_stem, stale_siblings, ManifestEntry, ManifestStore};

/// File name under which the manifest persists itself inside the bucket
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_file_name() {
        assert_eq!(MANIFEST_FILE_NAME, "manifest.json");
    }
}
