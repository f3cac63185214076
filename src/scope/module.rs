// src/scope/module.rs

use std::fmt;

use crate::errors::ScopeConfigError;
use crate::filter::Rule;

/// A declared source directory that a per-package scope must include.
///
/// Expands to two rules: the directory itself (exact) and everything below
/// it (`dir/.*`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Module {
    dir: String,
}

impl Module {
    /// Validate and normalise a module directory.
    ///
    /// Leading `./`, leading and trailing slashes are stripped; the result
    /// must be non-empty, relative, and free of `..` components.
    pub fn new(dir: &str) -> Result<Self, ScopeConfigError> {
        let trimmed = dir.trim();
        if trimmed.starts_with('/') {
            return Err(ScopeConfigError::AbsoluteDir(dir.to_string()));
        }
        let normalised = trimmed
            .trim_start_matches("./")
            .trim_matches('/')
            .to_string();
        if normalised.is_empty() || normalised == "." {
            return Err(ScopeConfigError::EmptyModule);
        }
        if normalised.split('/').any(|c| c == "..") {
            return Err(ScopeConfigError::ParentTraversal(dir.to_string()));
        }
        Ok(Self { dir: normalised })
    }

    pub fn dir(&self) -> &str {
        &self.dir
    }

    pub fn rules(&self) -> Result<[Rule; 2], ScopeConfigError> {
        Ok([Rule::exact(self.dir.clone()), Rule::recursive(&self.dir)?])
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dir)
    }
}
