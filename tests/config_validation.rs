// tests/config_validation.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, PackageBuilder};

use scopebuild::config::parse_and_validate;
use scopebuild::errors::{ConfigError, ScopeConfigError};
use scopebuild::types::StageCommand;

#[test]
fn full_config_parses() {
    let cfg = parse_and_validate(
        r#"
[config]
jobs = 3
store = "/var/cache/scopebuild"
ignore = [".git", "target", "node_modules"]

[stage.build]
command = "cargo build --workspace --locked"
timeout_secs = 600

[stage.lint]
command = ["cargo", "clippy", "--workspace", "--", "-D", "warnings"]

[package.nautilus]
dir = "nautilus"
modules = ["lib", "nautilus_core"]
"#,
    )
    .unwrap();

    assert_eq!(cfg.config().jobs, 3);
    assert_eq!(cfg.config().store, "/var/cache/scopebuild");
    assert_eq!(cfg.config().ignore.len(), 3);

    let build = cfg.stage_override("build").unwrap();
    assert_eq!(
        build.command,
        Some(StageCommand::Shell("cargo build --workspace --locked".into()))
    );
    assert_eq!(build.timeout().map(|d| d.as_secs()), Some(600));

    let lint = cfg.stage_override("lint").unwrap();
    assert!(matches!(lint.command, Some(StageCommand::Argv(ref args)) if args.len() == 6));

    let pkg = &cfg.packages()["nautilus"];
    assert_eq!(pkg.dir, "nautilus");
    assert_eq!(pkg.modules, vec!["lib", "nautilus_core"]);
}

#[test]
fn empty_config_uses_defaults() {
    let cfg = parse_and_validate("").unwrap();
    assert!(cfg.config().jobs >= 1);
    assert_eq!(cfg.config().store, ".scopebuild/store");
    assert_eq!(cfg.config().ignore, vec![".git", "target"]);
    assert!(cfg.packages().is_empty());
}

#[test]
fn zero_jobs_is_rejected() {
    let err = ConfigFileBuilder::new().jobs(0).try_build().unwrap_err();
    assert!(matches!(err, ConfigError::ZeroJobs));
}

#[test]
fn lint_override_must_deny_warnings() {
    let err = ConfigFileBuilder::new()
        .stage_command("lint", "cargo clippy --workspace")
        .try_build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::LintNotDenyingWarnings(_)));

    for ok in [
        "cargo clippy -- -D warnings",
        "cargo clippy -- -Dwarnings",
        "cargo clippy -- --deny warnings",
        "cargo clippy -- --deny=warnings",
    ] {
        ConfigFileBuilder::new()
            .stage_command("lint", ok)
            .try_build()
            .unwrap_or_else(|e| panic!("{ok:?} rejected: {e}"));
    }
}

#[test]
fn unknown_stage_override_is_rejected() {
    let err = ConfigFileBuilder::new()
        .stage_command("bench", "cargo bench")
        .try_build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownStage(name) if name == "bench"));
}

#[test]
fn empty_command_is_rejected() {
    let err = ConfigFileBuilder::new()
        .stage_command("build", "   ")
        .try_build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::EmptyCommand(_)));

    let err = ConfigFileBuilder::new()
        .with_package("app", PackageBuilder::new("app").command("").build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::EmptyCommand(name) if name == "app"));
}

#[test]
fn package_names_cannot_shadow_tasks() {
    for reserved in ["deps", "build", "test", "lint", "doc", "clippy", "all"] {
        let err = ConfigFileBuilder::new()
            .with_package(reserved, PackageBuilder::new("app").build())
            .try_build()
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::ReservedName(ref n) if n == reserved),
            "{reserved}: {err}"
        );
    }
}

#[test]
fn package_with_empty_dir_is_a_scope_error() {
    let err = ConfigFileBuilder::new()
        .with_package("app", PackageBuilder::new("").build())
        .try_build()
        .unwrap_err();
    match err {
        ConfigError::Package { name, source } => {
            assert_eq!(name, "app");
            assert_eq!(source, ScopeConfigError::EmptyOwnDir);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_fields_are_rejected() {
    let err = parse_and_validate("[config]\nworkers = 2\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));

    let err = parse_and_validate("[package.app]\ndir = \"app\"\nwatch = []\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn cli_overrides_apply_after_validation() {
    let cfg = ConfigFileBuilder::new()
        .jobs(2)
        .build()
        .with_overrides(Some(8), Some("/tmp/store".to_string()))
        .unwrap();
    assert_eq!(cfg.config().jobs, 8);
    assert_eq!(cfg.config().store, "/tmp/store");

    let cfg = ConfigFileBuilder::new().jobs(2).build().with_overrides(None, None).unwrap();
    assert_eq!(cfg.config().jobs, 2);
}

#[test]
fn zero_jobs_override_is_rejected_like_the_file() {
    let err = ConfigFileBuilder::new()
        .jobs(2)
        .build()
        .with_overrides(Some(0), None)
        .unwrap_err();
    assert!(matches!(err, ConfigError::ZeroJobs));
}
