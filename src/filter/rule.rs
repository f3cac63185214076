// src/filter/rule.rs

use std::fmt;

use regex::Regex;

use crate::errors::ScopeConfigError;

/// A single inclusion rule, matched against a POSIX-style path relative to
/// the tree root (no leading slash).
///
/// Patterns are always full-matched: `".*\\.rs"` matches `"src/lib.rs"` but
/// `"lib"` does not match `"lib/mod.rs"`.
#[derive(Clone)]
pub enum Rule {
    /// The relative path must equal this string exactly.
    Exact(String),
    /// The relative path must fully match this regular expression.
    Pattern { source: String, regex: Regex },
}

impl Rule {
    pub fn exact(path: impl Into<String>) -> Self {
        Rule::Exact(path.into())
    }

    /// Compile a regular-expression rule. The pattern is anchored on both
    /// ends before compilation.
    pub fn pattern(pattern: &str) -> Result<Self, ScopeConfigError> {
        let anchored = format!("^(?:{pattern})$");
        let regex = Regex::new(&anchored).map_err(|e| ScopeConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Rule::Pattern {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Everything strictly below `dir` (`dir/.*`).
    pub fn recursive(dir: &str) -> Result<Self, ScopeConfigError> {
        Self::pattern(&format!("{}/.*", regex::escape(dir)))
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        match self {
            Rule::Exact(path) => path == rel_path,
            Rule::Pattern { regex, .. } => regex.is_match(rel_path),
        }
    }

    /// Source form of the rule, as written in configuration.
    pub fn as_str(&self) -> &str {
        match self {
            Rule::Exact(path) => path,
            Rule::Pattern { source, .. } => source,
        }
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Rule::Exact(a), Rule::Exact(b)) => a == b,
            (Rule::Pattern { source: a, .. }, Rule::Pattern { source: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for Rule {}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Exact(path) => write!(f, "Exact({path:?})"),
            Rule::Pattern { source, .. } => write!(f, "Pattern({source:?})"),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Exact(path) => write!(f, "={path}"),
            Rule::Pattern { source, .. } => write!(f, "~{source}"),
        }
    }
}
