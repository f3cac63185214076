// src/filter/ruleset.rs

use crate::filter::rule::Rule;
use crate::types::TraversalMode;

/// What kind of tree entry a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// Ordered, immutable collection of rules plus a traversal mode.
///
/// Rules are OR-ed: a file is included as soon as any rule matches. Order
/// only matters for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
    traversal: TraversalMode,
}

impl RuleSet {
    pub fn new(traversal: TraversalMode) -> Self {
        Self {
            rules: Vec::new(),
            traversal,
        }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_rules<I: IntoIterator<Item = Rule>>(mut self, rules: I) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn traversal(&self) -> TraversalMode {
        self.traversal
    }

    /// Decide whether `rel_path` belongs to the snapshot (files) or should be
    /// descended into (directories).
    ///
    /// Pure and total: the answer depends on nothing but the arguments.
    pub fn included(&self, rel_path: &str, kind: EntryKind) -> bool {
        match kind {
            EntryKind::Dir => match self.traversal {
                TraversalMode::Unrestricted => true,
                TraversalMode::Shallow => is_first_level(rel_path) || self.matches_any(rel_path),
            },
            EntryKind::File => self.matches_any(rel_path),
        }
    }

    fn matches_any(&self, rel_path: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(rel_path))
    }
}

/// `^[^/]+$`: a direct child of the root.
fn is_first_level(rel_path: &str) -> bool {
    !rel_path.is_empty() && !rel_path.contains('/')
}
