//! Test logging setup
//!
//! Tests call [`init_test_tracing`] to route `tracing` output through the
//! libtest capture writer. `RUST_LOG` controls the filter; the default keeps
//! the reattempt crates at `debug`.

use std::sync::Once;

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

const DEFAULT_TEST_FILTER: &str = "reattempt_core=debug,reattempt_infra=debug,warn";

/// Install a global `fmt` subscriber once per test binary
///
/// Safe to call from every test; later calls are no-ops. If another
/// subscriber is already installed the error is ignored.
pub fn init_test_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_FILTER));

        let _ = fmt().with_env_filter(filter).with_test_writer().with_target(true).try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates `init_test_tracing` can be called repeatedly.
    #[test]
    fn test_init_test_tracing_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
        tracing::debug!(target: "reattempt_core", "tracing initialised twice");
    }
}
