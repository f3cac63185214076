// tests/property/scheduler.rs

use std::collections::BTreeSet;

use proptest::prelude::*;
use scopebuild::config::model::ConfigFile;
use scopebuild::dag::{Scheduler, StageGraph, StageOutcome, StageRunState};
use scopebuild_test_utils::builders::{ConfigFileBuilder, PackageBuilder};
use scopebuild_test_utils::fake_executor::fake_artifacts;

// Builtin stages plus up to four packages.
fn config_strategy() -> impl Strategy<Value = ConfigFile> {
    (0..=4usize).prop_map(|packages| {
        let mut builder = ConfigFileBuilder::new();
        for i in 0..packages {
            builder = builder.with_package(
                &format!("bin{i}"),
                PackageBuilder::new(&format!("crates/bin{i}")).build(),
            );
        }
        builder.build()
    })
}

/// The topmost failed stage on `name`'s upstream chain, if any. It fails
/// first, so everything below it is blocked by it.
fn failed_ancestor(graph: &StageGraph, failing: &BTreeSet<String>, name: &str) -> Option<String> {
    let mut current = graph.upstream_of(name);
    let mut found = None;
    while let Some(up) = current {
        if failing.contains(up) {
            found = Some(up.to_string());
        }
        current = graph.upstream_of(up);
    }
    found
}

proptest! {
    #[test]
    fn every_run_terminates_with_consistent_states(
        cfg in config_strategy(),
        targets in proptest::collection::vec(0..9usize, 1..4),
        failing in proptest::collection::vec(0..9usize, 0..4),
        limit in 1..4usize,
    ) {
        let graph = StageGraph::from_config(&cfg).unwrap();
        let names: Vec<String> = graph.stages().map(|s| s.name().to_string()).collect();
        let targets: Vec<String> = targets.iter().map(|&i| names[i % names.len()].clone()).collect();
        let failing: BTreeSet<String> = failing.iter().map(|&i| names[i % names.len()].clone()).collect();

        let mut scheduler = Scheduler::new(graph.clone());
        scheduler.request(&targets).unwrap();

        let mut dispatched = Vec::new();
        let mut steps = 0;
        while !scheduler.is_finished() {
            steps += 1;
            prop_assert!(steps < 100, "scheduler did not terminate");

            let ready = scheduler.next_ready(limit);
            prop_assert!(!ready.is_empty(), "stalled with nothing ready");
            prop_assert!(ready.len() <= limit);

            for scheduled in ready {
                let name = scheduled.stage.name().to_string();
                prop_assert_eq!(scheduler.deps_satisfied(&name), Some(true));
                prop_assert_eq!(
                    scheduled.upstream_artifacts.is_some(),
                    scheduled.stage.upstream().is_some()
                );
                let outcome = if failing.contains(&name) {
                    StageOutcome::Failed
                } else {
                    StageOutcome::Succeeded(fake_artifacts(&name))
                };
                scheduler.complete(&name, outcome);
                dispatched.push(name);
            }
        }

        // No stage runs twice.
        let unique: BTreeSet<_> = dispatched.iter().collect();
        prop_assert_eq!(unique.len(), dispatched.len());

        for name in scheduler.stages_in_run() {
            let state = scheduler.run_state_of(&name).unwrap();
            match failed_ancestor(&graph, &failing, &name) {
                Some(root) => {
                    prop_assert_eq!(state, StageRunState::Blocked);
                    prop_assert_eq!(scheduler.blocked_by(&name), Some(root.as_str()));
                }
                None if failing.contains(&name) => {
                    prop_assert_eq!(state, StageRunState::Failed);
                }
                None => prop_assert_eq!(state, StageRunState::Succeeded),
            }
        }
    }
}
