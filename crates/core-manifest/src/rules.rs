//! Rule Engine: filename classification into delivery attributes
//!
//! An ordered list of filename patterns decides how each asset is loaded
//! by a page: whether it is critical (loaded synchronously, in order,
//! before anything else), which script execution mode it uses, and its
//! priority. The first matching rule wins; a filename matching no rule
//! falls back to the optional/deferred defaults.
//!
//! Classification is a pure function - it never fails and never touches
//! the filesystem.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Script execution mode for a loaded asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Inserted ahead of other content, executed in document order
    Sync,
    /// Deferred execution after document parse
    Defer,
    /// Executed as soon as fetched, order not guaranteed
    Async,
}

impl LoadMode {
    /// Convert to the wire string used in manifests
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadMode::Sync => "sync",
            LoadMode::Defer => "defer",
            LoadMode::Async => "async",
        }
    }
}

impl FromStr for LoadMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sync" => Ok(LoadMode::Sync),
            "defer" => Ok(LoadMode::Defer),
            "async" => Ok(LoadMode::Async),
            other => Err(Error::InvalidMode(other.to_string())),
        }
    }
}

/// Delivery attributes for one asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    /// Must the asset finish loading before dependent page behaviour?
    pub critical: bool,

    /// Script execution mode
    pub mode: LoadMode,

    /// Load priority, 1 is highest
    pub priority: u32,
}

impl Default for Attributes {
    /// Attributes for a filename matching no rule
    fn default() -> Self {
        Self {
            critical: false,
            mode: LoadMode::Defer,
            priority: 2,
        }
    }
}

/// One classification rule: a filename pattern plus attribute overrides
///
/// Unset fields fall back to the [`Attributes::default`] values when the
/// rule matches.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    critical: Option<bool>,
    mode: Option<LoadMode>,
    priority: Option<u32>,
}

impl Rule {
    /// Create a rule from a regex pattern with no attribute overrides
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|source| Error::invalid_pattern(pattern, source))?;
        Ok(Self {
            pattern,
            critical: None,
            mode: None,
            priority: None,
        })
    }

    /// Set the critical flag for matching filenames
    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = Some(critical);
        self
    }

    /// Set the load mode for matching filenames
    pub fn mode(mut self, mode: LoadMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set the priority for matching filenames
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Does this rule match the given filename?
    pub fn matches(&self, filename: &str) -> bool {
        self.pattern.is_match(filename)
    }

    fn attributes(&self) -> Attributes {
        let defaults = Attributes::default();
        Attributes {
            critical: self.critical.unwrap_or(defaults.critical),
            mode: self.mode.unwrap_or(defaults.mode),
            priority: self.priority.unwrap_or(defaults.priority),
        }
    }
}

/// Ordered rule list; first match wins
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Create a rule set from an ordered list of rules
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Classify a filename into delivery attributes
    ///
    /// Iterates rules in order and returns the first match's attributes
    /// with unset fields defaulted. No match yields the default triple
    /// (optional, deferred, priority 2). Total - never fails.
    pub fn classify(&self, filename: &str) -> Attributes {
        for rule in &self.rules {
            if rule.matches(filename) {
                return rule.attributes();
            }
        }
        Attributes::default()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rules are configured
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    /// The built-in rule set: scripts and stylesheets are critical,
    /// images are opportunistic
    fn default() -> Self {
        // Patterns are infallible literals; construction cannot fail.
        let rules = vec![
            Rule::new(r"\.js$")
                .unwrap()
                .critical(true)
                .mode(LoadMode::Defer)
                .priority(1),
            Rule::new(r"\.css$")
                .unwrap()
                .critical(true)
                .mode(LoadMode::Sync)
                .priority(1),
            Rule::new(r"\.(png|jpg|jpeg|gif)$")
                .unwrap()
                .critical(false)
                .mode(LoadMode::Sync)
                .priority(2),
            Rule::new(r"\.html$")
                .unwrap()
                .critical(true)
                .mode(LoadMode::Sync)
                .priority(1),
        ];
        Self { rules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        let rules = RuleSet::new(vec![
            Rule::new(r"\.js$").unwrap().priority(7),
            Rule::new(r"app").unwrap().priority(9),
        ]);

        // "app.js" matches both; the first rule decides.
        assert_eq!(rules.classify("app.js").priority, 7);
        // "app.css" only matches the second.
        assert_eq!(rules.classify("app.css").priority, 9);
    }

    #[test]
    fn test_no_match_yields_defaults() {
        let rules = RuleSet::new(vec![Rule::new(r"\.js$").unwrap().critical(true)]);

        let attrs = rules.classify("logo.svg");
        assert_eq!(attrs, Attributes::default());
        assert!(!attrs.critical);
        assert_eq!(attrs.mode, LoadMode::Defer);
        assert_eq!(attrs.priority, 2);
    }

    #[test]
    fn test_unset_fields_default() {
        let rules = RuleSet::new(vec![Rule::new(r"\.js$").unwrap().critical(true)]);

        let attrs = rules.classify("main.js");
        assert!(attrs.critical);
        // mode and priority were not set on the rule
        assert_eq!(attrs.mode, LoadMode::Defer);
        assert_eq!(attrs.priority, 2);
    }

    #[test]
    fn test_default_rule_set() {
        let rules = RuleSet::default();

        let js = rules.classify("bundle-4539fe064ad4.js");
        assert!(js.critical);
        assert_eq!(js.mode, LoadMode::Defer);
        assert_eq!(js.priority, 1);

        let css = rules.classify("theme.css");
        assert!(css.critical);
        assert_eq!(css.mode, LoadMode::Sync);

        let img = rules.classify("hero.png");
        assert!(!img.critical);
        assert_eq!(img.priority, 2);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let rules = RuleSet::default();
        assert_eq!(rules.classify("a.js"), rules.classify("a.js"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(Rule::new("[").is_err());
    }

    #[test]
    fn test_load_mode_round_trip() {
        for mode in [LoadMode::Sync, LoadMode::Defer, LoadMode::Async] {
            assert_eq!(mode.as_str().parse::<LoadMode>().unwrap(), mode);
        }
        assert!("eager".parse::<LoadMode>().is_err());
    }

    #[test]
    fn test_load_mode_serde_lowercase() {
        let json = serde_json::to_string(&LoadMode::Defer).unwrap();
        assert_eq!(json, "\"defer\"");
        let mode: LoadMode = serde_json::from_str("\"async\"").unwrap();
        assert_eq!(mode, LoadMode::Async);
    }
}
