// src/exec/mod.rs

//! Stage execution layer.
//!
//! - [`executor`] runs one stage: snapshot, cache lookup, materialize,
//!   toolchain, publish.
//! - [`toolchain`] is the seam to the external build toolchain;
//!   [`process`] implements it with `tokio::process`.
//! - [`materialize`] copies a snapshot into a private staging directory.
//! - [`cancel`] is the run-wide cancellation flag.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `RealExecutorBackend` that the runtime uses in production.

pub mod backend;
pub mod cancel;
pub mod executor;
pub mod materialize;
pub mod process;
pub mod toolchain;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use cancel::{CancelHandle, CancelSignal};
pub use executor::{ExecError, ExecOutcome, StageExecutor};
pub use process::ProcessToolchain;
pub use toolchain::{Toolchain, ToolchainOutput, ToolchainRequest};
