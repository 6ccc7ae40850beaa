//! The load algorithm: sequential criticals, concurrent optionals
//!
//! Critical entries carry an execution-order guarantee - a script that
//! defines globals must finish before a script that uses them starts -
//! so they load strictly one at a time in manifest order. Optional
//! entries carry no such guarantee and load concurrently once the
//! critical phase is over.
//!
//! A single load tries the preferred origin, then the local fallback,
//! exactly once each. Total failure of one asset never aborts the rest
//! and never escapes as an error.

use crate::fetch::AssetFetcher;
use beacon_core_manifest::{LoadMode, ManifestEntry};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// What kind of element the asset injects as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// `.js` - script element honoring the entry's mode
    Script,
    /// `.css` - stylesheet link element
    Stylesheet,
}

impl AssetKind {
    /// Derive the kind from a filename extension
    ///
    /// Unrecognized extensions return `None`; such assets are not
    /// loaded by this component.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.ends_with(".js") {
            Some(AssetKind::Script)
        } else if name.ends_with(".css") {
            Some(AssetKind::Stylesheet)
        } else {
            None
        }
    }
}

/// Where the injected element goes in its container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Ahead of existing content - preserves relative ordering of
    /// critical scripts against everything inserted later
    Front,
    /// Appended after existing content
    Back,
}

/// One successful load, ready to be applied to a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    /// Content-addressed asset name
    pub hashed: String,
    /// Script or stylesheet
    pub kind: AssetKind,
    /// Execution mode carried from the manifest entry
    pub mode: LoadMode,
    /// Insertion position in the container
    pub position: Position,
    /// The candidate URL that actually succeeded
    pub url: String,
}

/// Outcome of one load session
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Successful loads: criticals in manifest order, then optionals
    pub injections: Vec<Injection>,
    /// Assets that exhausted every candidate
    pub failed: Vec<String>,
    /// Assets with unrecognized extensions, never attempted
    pub skipped: Vec<String>,
}

enum AssetOutcome {
    Injected(Injection),
    Failed(String),
    Skipped(String),
}

/// Manifest-driven asset loader
pub struct AssetLoader {
    fetcher: Arc<dyn AssetFetcher>,
    fallback_base: String,
}

impl AssetLoader {
    /// Create a loader fetching through `fetcher`, with local fallback
    /// URLs rooted at `fallback_base`
    pub fn new(fetcher: Arc<dyn AssetFetcher>, fallback_base: impl Into<String>) -> Self {
        Self {
            fetcher,
            fallback_base: fallback_base.into(),
        }
    }

    /// Run one load session
    ///
    /// `origin` is the preferred origin's base URL, or `None` to use the
    /// local fallback only. Critical entries are awaited one at a time
    /// in manifest order; optional entries then run concurrently.
    pub async fn load(&self, origin: Option<&str>, manifest: &[ManifestEntry]) -> LoadReport {
        let (criticals, optionals): (Vec<_>, Vec<_>) =
            manifest.iter().partition(|e| e.critical);

        let mut report = LoadReport::default();

        // Phase 1: strict sequential barrier across critical entries.
        for entry in criticals {
            let outcome = self.load_one(origin, entry).await;
            record(&mut report, outcome);
        }

        // Phase 2: optional entries, unordered and concurrent.
        let outcomes = join_all(
            optionals
                .iter()
                .map(|entry| self.load_one(origin, entry)),
        )
        .await;
        for outcome in outcomes {
            record(&mut report, outcome);
        }

        report
    }

    /// Load one entry against its candidate list
    ///
    /// Tries candidates in order; the failed attempt is discarded before
    /// the next candidate (the DOM equivalent removes the broken
    /// element). Exhaustion is an outcome, not an error.
    async fn load_one(&self, origin: Option<&str>, entry: &ManifestEntry) -> AssetOutcome {
        let Some(kind) = AssetKind::from_name(&entry.hashed) else {
            debug!("skipping {}: unrecognized extension", entry.hashed);
            return AssetOutcome::Skipped(entry.hashed.clone());
        };

        for url in self.candidates(origin, &entry.hashed) {
            match self.fetcher.fetch(&url).await {
                Ok(_) => {
                    let position = if entry.critical && kind == AssetKind::Script {
                        Position::Front
                    } else {
                        Position::Back
                    };
                    return AssetOutcome::Injected(Injection {
                        hashed: entry.hashed.clone(),
                        kind,
                        mode: entry.mode,
                        position,
                        url,
                    });
                }
                Err(e) => {
                    debug!("candidate {} failed: {}", url, e);
                }
            }
        }

        warn!("asset {} failed on every candidate", entry.hashed);
        AssetOutcome::Failed(entry.hashed.clone())
    }

    /// Ordered candidate URLs: preferred origin, then local fallback
    fn candidates(&self, origin: Option<&str>, hashed: &str) -> Vec<String> {
        let mut urls = Vec::with_capacity(2);
        if let Some(origin) = origin {
            urls.push(format!("{}/{}", origin.trim_end_matches('/'), hashed));
        }
        urls.push(format!(
            "{}/{}",
            self.fallback_base.trim_end_matches('/'),
            hashed
        ));
        urls
    }
}

fn record(report: &mut LoadReport, outcome: AssetOutcome) {
    match outcome {
        AssetOutcome::Injected(injection) => report.injections.push(injection),
        AssetOutcome::Failed(hashed) => report.failed.push(hashed),
        AssetOutcome::Skipped(hashed) => report.skipped.push(hashed),
    }
}
