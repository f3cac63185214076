// src/scope/builders.rs

//! The three scope configurations every stage draws its inputs from.

use crate::errors::ScopeConfigError;
use crate::filter::{Rule, RuleSet};
use crate::scope::{Module, Scope};
use crate::types::TraversalMode;

pub const DEPS_SCOPE: &str = "deps-only";
pub const WORKSPACE_SCOPE: &str = "full-workspace";

/// Rules matching every workspace manifest: the lock file, the root manifest
/// and member manifests at any depth.
pub fn manifest_rules() -> Vec<Rule> {
    vec![
        Rule::exact("Cargo.lock"),
        Rule::exact("Cargo.toml"),
        static_pattern(".*/Cargo.toml"),
    ]
}

/// Only the files that determine the dependency build: editing sources never
/// changes this scope's snapshot.
pub fn deps_only_scope() -> Scope {
    Scope::new(
        DEPS_SCOPE,
        RuleSet::new(TraversalMode::Unrestricted).with_rules(manifest_rules()),
    )
}

/// Everything needed to build, test, lint and document the whole workspace.
pub fn full_workspace_scope() -> Scope {
    Scope::new(
        WORKSPACE_SCOPE,
        RuleSet::new(TraversalMode::Unrestricted)
            .with_rules(manifest_rules())
            .with_rules([
                static_pattern(r".*\.rs"),
                static_pattern(r".*/doc/.*\.md"),
                static_pattern(r".*\.txt"),
            ]),
    )
}

/// Scope of a single deliverable: its own directory, the declared
/// collaborator modules, and workspace manifests.
///
/// Shallow traversal keeps unrelated siblings out: their first level is
/// visited (manifest discovery) but nothing deeper.
pub fn per_package_scope<S: AsRef<str>>(
    own_dir: &str,
    extra_dirs: &[S],
) -> Result<Scope, ScopeConfigError> {
    if own_dir.trim().is_empty() {
        return Err(ScopeConfigError::EmptyOwnDir);
    }
    let own = Module::new(own_dir)?;

    let mut rules = RuleSet::new(TraversalMode::Shallow).with_rules(manifest_rules());
    rules = rules.with_rules(own.rules()?);
    for extra in extra_dirs {
        let module = Module::new(extra.as_ref())?;
        rules = rules.with_rules(module.rules()?);
    }

    Ok(Scope::new(format!("package:{}", own.dir()), rules))
}

// Builtin patterns are literals and always compile.
fn static_pattern(pattern: &str) -> Rule {
    match Rule::pattern(pattern) {
        Ok(rule) => rule,
        Err(e) => panic!("builtin pattern {pattern:?} failed to compile: {e}"),
    }
}
