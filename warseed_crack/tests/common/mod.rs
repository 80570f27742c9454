// Shared helpers for the integration tests.

use std::sync::Once;

use warseed_crack::{CrackConfig, Cracker};

static INIT_LOGGING: Once = Once::new();

/// Route `tracing` output through the test harness so it only shows for
/// failing tests.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .with_ansi(false)
            .try_init();
    });
}

/// A cracker that scans everything and records every hit.
pub fn exhaustive_cracker(workers: usize) -> Cracker {
    Cracker::new(CrackConfig {
        attempts: None,
        workers,
        max_recorded_candidates: usize::MAX,
        ..CrackConfig::default()
    })
    .unwrap()
}
