//! Shared integration-test setup: installs a `tracing` subscriber once per
//! test binary so the `debug!`/`warn!`/`error!` events emitted by
//! `core::executor` and `core::orchestrator` are actually observable when
//! running tests with `--nocapture`, instead of being silently discarded for
//! want of a subscriber.

use std::sync::Once;

static INIT: Once = Once::new();

/// Install a `tracing-subscriber` `fmt` layer routed through the test
/// harness's writer, gated by `RUST_LOG` (defaults to `info` when unset).
/// Safe to call at the top of every `#[test]`; only the first call in a
/// given test binary actually installs the subscriber.
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init()
            .ok();
    });
}
