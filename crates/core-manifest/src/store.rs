//! Manifest Store: durable delivery metadata for stored assets
//!
//! The store maps content-addressed filenames to delivery attributes and
//! persists itself as a single JSON document inside the bucket. It is the
//! single source of truth for delivery metadata: entries survive process
//! restarts without re-deriving attributes, and a bulk rebuild restores
//! consistency after out-of-band file changes.
//!
//! Physical names are content-addressed (`{stem}-{hash12}{ext}`), so a
//! re-upload of the same logical asset produces a new physical name.
//! `upsert` supersedes any prior entry for the same logical asset,
//! preserving "one logical asset, one entry".

use crate::error::Result;
use crate::rules::{Attributes, LoadMode, RuleSet};
use crate::MANIFEST_FILE_NAME;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Number of hash characters embedded in a content-addressed name
const HASH_LEN: usize = 12;

/// One manifest entry: a stored asset and how to deliver it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Content-addressed filename (`{stem}-{hash12}{ext}`)
    pub hashed: String,

    /// Must be loaded, in order, before dependent page behaviour
    pub critical: bool,

    /// Script execution mode
    pub mode: LoadMode,

    /// Load priority, 1 is highest
    pub priority: u32,
}

impl ManifestEntry {
    /// Build an entry from a filename and its attributes
    pub fn new(hashed: impl Into<String>, attrs: Attributes) -> Self {
        Self {
            hashed: hashed.into(),
            critical: attrs.critical,
            mode: attrs.mode,
            priority: attrs.priority,
        }
    }

    /// The entry's delivery attributes
    pub fn attributes(&self) -> Attributes {
        Attributes {
            critical: self.critical,
            mode: self.mode,
            priority: self.priority,
        }
    }
}

/// Durable mapping from content-addressed filename to delivery attributes
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
    entries: Vec<ManifestEntry>,
}

impl ManifestStore {
    /// Create an empty store that will persist at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Load the persisted manifest from `path`
    ///
    /// A missing or malformed file loads as an empty manifest - never
    /// fatal. Any entry referencing the manifest's own file is dropped.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<Vec<ManifestEntry>>(&raw).ok())
            .unwrap_or_default()
            .into_iter()
            .filter(|e| e.hashed != MANIFEST_FILE_NAME)
            .collect();
        Self { path, entries }
    }

    /// Persist the manifest to its backing file
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Insert or replace the entry for a content-addressed filename
    ///
    /// Any prior entry for the same logical asset (same pre-hash stem and
    /// extension) is superseded and removed, even though its physical
    /// name differs.
    pub fn upsert(&mut self, hashed: &str, attrs: Attributes) {
        if hashed == MANIFEST_FILE_NAME {
            return;
        }
        let stem = logical_stem(hashed);
        let ext = extension(hashed);
        self.entries
            .retain(|e| !(logical_stem(&e.hashed) == stem && extension(&e.hashed) == ext));
        self.entries.push(ManifestEntry::new(hashed, attrs));
    }

    /// Delete the entry for `hashed`; no-op when absent
    pub fn remove(&mut self, hashed: &str) {
        self.entries.retain(|e| e.hashed != hashed);
    }

    /// Recompute the entire manifest from the current file set
    ///
    /// Every file is classified through the rule engine; entries for
    /// files that no longer exist are discarded. Applying this twice to
    /// the same file set yields identical manifests.
    pub fn rebuild_from_disk<I, S>(&mut self, files: I, rules: &RuleSet)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries = files
            .into_iter()
            .map(Into::into)
            .filter(|name| name != MANIFEST_FILE_NAME)
            .map(|name| {
                let attrs = rules.classify(&name);
                ManifestEntry::new(name, attrs)
            })
            .collect();
    }

    /// Align the manifest with the current file set, keeping stored
    /// attributes
    ///
    /// Entries whose files are gone are dropped and files with no
    /// entry are classified through the rule engine. Surviving entries
    /// keep their persisted attributes, so explicit per-upload
    /// attributes outlive a restart. Contrast with
    /// [`rebuild_from_disk`](Self::rebuild_from_disk), which
    /// re-derives everything.
    pub fn reconcile<I, S>(&mut self, files: I, rules: &RuleSet)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let files: Vec<String> = files
            .into_iter()
            .map(Into::into)
            .filter(|name| name != MANIFEST_FILE_NAME)
            .collect();
        self.entries.retain(|e| files.iter().any(|f| *f == e.hashed));
        for name in files {
            if self.get(&name).is_none() {
                let attrs = rules.classify(&name);
                self.entries.push(ManifestEntry::new(name, attrs));
            }
        }
    }

    /// Entries in insertion order, the manifest's own file excluded
    pub fn list(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Look up an entry by its content-addressed name
    pub fn get(&self, hashed: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.hashed == hashed)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the manifest has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Derive the content-addressed name for an upload
///
/// `app.js` with content hashing to `4539fe064ad4…` becomes
/// `app-4539fe064ad4.js`. The hash algorithm is an implementation
/// detail; callers only rely on the name being unique per content.
pub fn hashed_name(original: &str, content: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(content));
    let (stem, ext) = split_name(original);
    format!("{}-{}{}", stem, &digest[..HASH_LEN], ext)
}

/// Recover the logical (pre-hash) stem of a filename
///
/// `app-4539fe064ad4.js` yields `app`; a name without a hash suffix
/// yields its plain stem.
pub fn logical_stem(file_name: &str) -> &str {
    let (stem, _) = split_name(file_name);
    match stem.rfind('-') {
        Some(idx) if is_hash_suffix(&stem[idx + 1..]) => &stem[..idx],
        _ => stem,
    }
}

/// Physical files superseded by a fresh upload of `original_name`
///
/// Returns every file whose name content-addresses the same logical
/// asset (`{stem}-*{ext}`), so the caller can delete them before
/// writing the replacement.
pub fn stale_siblings<'a, I>(files: I, original_name: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let (stem, ext) = split_name(original_name);
    let prefix = format!("{}-", stem);
    files
        .into_iter()
        .filter(|f| f.starts_with(&prefix) && f.ends_with(ext))
        .map(String::from)
        .collect()
}

/// Split a filename into stem and extension (extension keeps its dot)
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

fn extension(name: &str) -> &str {
    split_name(name).1
}

fn is_hash_suffix(s: &str) -> bool {
    s.len() == HASH_LEN && s.chars().all(|c| c.is_ascii_hexdigit())
}
