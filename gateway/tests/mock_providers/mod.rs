//! Mock Provider Servers
//!
//! Stands in for Hume EVI so the relay can be exercised end to end without
//! network access or credentials.

// Allow dead code in test infrastructure - not every test binary uses every helper
#![allow(dead_code)]

use std::time::Duration;

pub mod hume_mock;

/// Poll `check` every 10ms until it returns true or `limit` elapses.
pub async fn wait_until<F>(limit: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
