// src/dag/graph.rs

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::config::model::ConfigFile;
use crate::dag::stage::{BuiltinStage, Stage, StageName};
use crate::errors::{ConfigError, ScopebuildError};

/// Typed stage graph. Edges point from a stage's upstream to the stage.
///
/// Every stage has at most one upstream, so the graph is a forest: siblings
/// that share an upstream have no edges between each other by construction.
#[derive(Debug, Clone)]
pub struct StageGraph {
    graph: DiGraph<Stage, ()>,
    index: HashMap<StageName, NodeIndex>,
    /// Node indices in topological order (upstreams first).
    order: Vec<NodeIndex>,
}

impl StageGraph {
    /// Build a graph from explicit stages.
    ///
    /// Fails on duplicate names, unknown upstreams and cycles.
    pub fn new(stages: Vec<Stage>) -> Result<Self, ConfigError> {
        let mut graph: DiGraph<Stage, ()> = DiGraph::new();
        let mut index = HashMap::new();

        for stage in stages {
            let name = stage.name().to_string();
            if index.contains_key(&name) {
                return Err(ConfigError::DuplicateStage(name));
            }
            let idx = graph.add_node(stage);
            index.insert(name, idx);
        }

        let edges: Vec<(NodeIndex, NodeIndex)> = graph
            .node_indices()
            .filter_map(|idx| {
                let stage = &graph[idx];
                stage.upstream().map(|up| (up.to_string(), idx))
            })
            .map(|(up, idx)| match index.get(&up) {
                Some(up_idx) => Ok((*up_idx, idx)),
                None => Err(ConfigError::UnknownUpstream {
                    stage: graph[idx].name().to_string(),
                    upstream: up,
                }),
            })
            .collect::<Result<_, _>>()?;

        for (from, to) in edges {
            graph.add_edge(from, to, ());
        }

        let order = toposort(&graph, None)
            .map_err(|cycle| ConfigError::StageCycle(graph[cycle.node_id()].name().to_string()))?;

        Ok(Self {
            graph,
            index,
            order,
        })
    }

    /// The standard workspace graph: builtin stages plus one package-build
    /// stage per declared binary.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self, ConfigError> {
        let mut stages: Vec<Stage> = BuiltinStage::ALL
            .iter()
            .map(|b| Stage::builtin(*b, cfg.stage_override(b.name())))
            .collect();

        for (binary, pkg) in cfg.packages() {
            let stage = Stage::package(binary, pkg).map_err(|source| ConfigError::Package {
                name: binary.clone(),
                source,
            })?;
            stages.push(stage);
        }

        Self::new(stages)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.index.get(name).map(|idx| &self.graph[*idx])
    }

    /// All stages, upstreams before their dependents.
    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.order.iter().map(|idx| &self.graph[*idx])
    }

    pub fn upstream_of(&self, name: &str) -> Option<&str> {
        self.stage(name).and_then(Stage::upstream)
    }

    /// Immediate dependents of a stage, sorted by name.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        let Some(idx) = self.index.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self
            .graph
            .neighbors_directed(*idx, Direction::Outgoing)
            .map(|n| self.graph[n].name())
            .collect();
        out.sort_unstable();
        out
    }

    /// The given stages plus every stage they transitively reuse, in
    /// topological order.
    pub fn upstream_closure<S: AsRef<str>>(&self, targets: &[S]) -> Result<Vec<StageName>, ScopebuildError> {
        let mut wanted: BTreeSet<&str> = BTreeSet::new();
        for target in targets {
            let mut current = Some(target.as_ref());
            while let Some(name) = current {
                let stage = self
                    .stage(name)
                    .ok_or_else(|| ScopebuildError::UnknownTask(name.to_string()))?;
                if !wanted.insert(stage.name()) {
                    break;
                }
                current = stage.upstream();
            }
        }

        Ok(self
            .stages()
            .filter(|s| wanted.contains(s.name()))
            .map(|s| s.name().to_string())
            .collect())
    }

    /// Map a CLI task name onto stage names.
    ///
    /// `all` selects every stage; `clippy` is an alias of `lint`.
    pub fn resolve_task(&self, task: &str) -> Result<Vec<StageName>, ScopebuildError> {
        match task {
            "all" => Ok(self.stages().map(|s| s.name().to_string()).collect()),
            "clippy" => self.resolve_task(BuiltinStage::Lint.name()),
            name if self.contains(name) => Ok(vec![name.to_string()]),
            other => Err(ScopebuildError::UnknownTask(other.to_string())),
        }
    }
}
