#![allow(dead_code)]

use std::time::Duration;

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(500);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(3);
pub const ITEMS_LOW: usize = 10;
pub const ITEMS_MEDIUM: usize = 100;
pub const ITEMS_HIGH: usize = 1000;

/// Routes `tracing` output through the test harness. Safe to call from every test.
pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

/// Yields to the runtime until `condition` holds, failing after `SHORT_TIMEOUT`.
pub async fn settle<F: Fn() -> bool>(condition: F) {
  let waited = tokio::time::timeout(SHORT_TIMEOUT, async {
    while !condition() {
      tokio::task::yield_now().await;
    }
  })
  .await;
  assert!(waited.is_ok(), "condition was not reached within {:?}", SHORT_TIMEOUT);
}
