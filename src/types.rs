use std::fmt;

use serde::Deserialize;

/// How a rule set treats directories while walking a tree.
///
/// - `Unrestricted`: every directory is descended; only file rules decide what
///   ends up in a snapshot.
/// - `Shallow`: first-level directories are always descended (so manifests of
///   sibling packages can be discovered), deeper directories only when a rule
///   matches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalMode {
    Unrestricted,
    Shallow,
}

impl fmt::Display for TraversalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraversalMode::Unrestricted => f.write_str("unrestricted"),
            TraversalMode::Shallow => f.write_str("shallow"),
        }
    }
}

/// A toolchain command, either a shell line or an explicit argv.
///
/// ```toml
/// command = "cargo build --workspace"
/// command = ["cargo", "build", "--workspace"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum StageCommand {
    Shell(String),
    Argv(Vec<String>),
}

impl StageCommand {
    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StageCommand::Argv(args.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            StageCommand::Shell(line) => line.trim().is_empty(),
            StageCommand::Argv(args) => args.is_empty() || args[0].trim().is_empty(),
        }
    }

    /// Whitespace-separated tokens, used for flag inspection only.
    pub fn tokens(&self) -> Vec<String> {
        match self {
            StageCommand::Shell(line) => line.split_whitespace().map(str::to_string).collect(),
            StageCommand::Argv(args) => args.clone(),
        }
    }

    /// Whether the command promotes warnings to errors.
    pub fn denies_warnings(&self) -> bool {
        let tokens = self.tokens();
        tokens.iter().enumerate().any(|(i, tok)| match tok.as_str() {
            "-Dwarnings" | "--deny=warnings" => true,
            "-D" | "--deny" => tokens.get(i + 1).is_some_and(|next| next == "warnings"),
            _ => false,
        })
    }

    /// Stable textual identity, used when deriving cache keys.
    pub fn identity(&self) -> String {
        match self {
            StageCommand::Shell(line) => format!("sh:{line}"),
            StageCommand::Argv(args) => format!("argv:{}", args.join("\u{1f}")),
        }
    }
}

impl fmt::Display for StageCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageCommand::Shell(line) => f.write_str(line),
            StageCommand::Argv(args) => f.write_str(&args.join(" ")),
        }
    }
}
