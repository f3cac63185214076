//! Shared fixtures for the `scopebuild` integration tests.

pub mod builders;
pub mod fake_executor;
pub mod fake_toolchain;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use scopebuild::logging::LOG_ENV;
use tracing_subscriber::{fmt, EnvFilter};

/// Upper bound for any single async test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

static INIT: Once = Once::new();

/// Install a per-test subscriber once per test binary.
///
/// Output goes through the test writer, so it only shows up for failing
/// tests (or with `--nocapture`). Filter with `SCOPEBUILD_LOG`, falling back
/// to `RUST_LOG`, e.g. `SCOPEBUILD_LOG=scopebuild::engine=debug`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("test timed out after {TEST_TIMEOUT:?}"),
    }
}
