// src/scope/mod.rs

//! Named scopes: a rule set bound to a name, applied to a [`SourceTree`].
//!
//! Scopes hold no state of their own; the same scope over the same tree
//! always yields the same snapshot.

pub mod builders;
pub mod module;

use std::fmt;
use std::path::Path;

use crate::errors::FilterError;
use crate::filter::{InputSnapshot, RuleSet, SourceTree};

pub use builders::{deps_only_scope, full_workspace_scope, manifest_rules, per_package_scope};
pub use module::Module;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    name: String,
    rules: RuleSet,
}

impl Scope {
    pub fn new(name: impl Into<String>, rules: RuleSet) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn included(&self, tree: &SourceTree, path: &Path) -> Result<bool, FilterError> {
        tree.included(path, &self.rules)
    }

    pub fn snapshot(&self, tree: &SourceTree) -> Result<InputSnapshot, FilterError> {
        InputSnapshot::capture(tree, &self.rules)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.name, self.rules.traversal())?;
        for rule in self.rules.rules() {
            write!(f, " {rule}")?;
        }
        f.write_str(")")
    }
}
