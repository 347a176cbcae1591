//! Timeout enforcement.
//!
//! # Responsibilities
//! - Suspend the startup path between connection attempts (`Clock`)
//! - Wrap downstream calls with a deadline
//!
//! # Design Decisions
//! - Uses Tokio's timer facilities
//! - Timeout errors are distinct from other errors
//! - Timed-out downstream calls surface as 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

/// Source of suspension between retries, swappable in tests.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the Tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// The deadline elapsed before the wrapped call completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed(pub Duration);

/// Run `future` under `deadline`.
pub async fn with_deadline<F, T>(deadline: Duration, future: F) -> Result<T, Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(deadline, future)
        .await
        .map_err(|_| Elapsed(deadline))
}
