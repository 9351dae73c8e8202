pub mod builders;
pub mod fakes;

use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};
use watchrun::engine::SupervisorOptions;
use watchrun::exec::TerminationPolicy;
use watchrun::watch::DebounceSettings;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Supervisor options with millisecond-scale timings, so tests run fast.
pub fn fast_options() -> SupervisorOptions {
    SupervisorOptions {
        debounce: DebounceSettings {
            debounce: Duration::from_millis(200),
            step: Duration::from_millis(5),
        },
        timeout: Some(Duration::from_millis(20)),
        termination: TerminationPolicy {
            sigint_timeout: Duration::from_millis(50),
            sigkill_timeout: Duration::from_millis(50),
        },
        exit_on_child_exit: true,
    }
}
