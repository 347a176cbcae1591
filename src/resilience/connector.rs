//! Broker connector with bounded, quadratically backed-off retries.
//!
//! # Responsibilities
//! - Dial the broker until it answers or the retry budget is spent
//! - Sleep `backoff(n)` after the n-th failed dial
//! - Observe shutdown between attempts
//!
//! # Design Decisions
//! - Runs on the startup path; nothing is served until it returns
//! - Every dial error counts toward the budget, transient or not
//! - `max_attempts` bounds failures, so at most `max_attempts + 1` dials

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::broker::{BrokerConnection, BrokerDialer, BrokerError, BrokerTarget};
use crate::observability::metrics;
use crate::resilience::backoff::{BackoffPolicy, QuadraticBackoff};
use crate::resilience::timeouts::{with_deadline, Clock, Elapsed, TokioClock};

/// Failure to obtain a broker connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Every permitted attempt failed.
    #[error("broker unreachable after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: BrokerError,
    },

    /// Shutdown was requested while still connecting.
    #[error("connecting cancelled by shutdown after {attempts} attempts")]
    Cancelled { attempts: u32 },

    /// `max_attempts` was zero.
    #[error("retry policy needs max_attempts greater than zero")]
    InvalidPolicy,
}

/// How many failures to tolerate and how long to wait after each.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Arc<dyn BackoffPolicy>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: impl BackoffPolicy + 'static) -> Self {
        Self {
            max_attempts,
            backoff: Arc::new(backoff),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, QuadraticBackoff::default())
    }
}

/// Progress of one connection attempt sequence.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Dials issued so far.
    pub attempts: u32,
    /// Dials that failed so far.
    pub failures: u32,
    /// Wait scheduled after the latest failure.
    pub backoff: Duration,
}

impl RetryState {
    fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    fn record_failure(&mut self) {
        self.failures += 1;
    }

    fn schedule(&mut self, policy: &dyn BackoffPolicy) -> Duration {
        self.backoff = policy.delay(self.failures);
        self.backoff
    }
}

/// Establishes the broker connection at startup.
pub struct Connector {
    dialer: Arc<dyn BrokerDialer>,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    connect_timeout: Duration,
}

impl Connector {
    pub fn new(dialer: Arc<dyn BrokerDialer>, policy: RetryPolicy) -> Self {
        Self {
            dialer,
            policy,
            clock: Arc::new(TokioClock),
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Replace the clock used between attempts.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bound a single dial.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Dial until connected, the budget is exhausted, or shutdown is signalled.
    pub async fn connect(
        &self,
        target: &BrokerTarget,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Arc<dyn BrokerConnection>, ConnectError> {
        if self.policy.max_attempts == 0 {
            return Err(ConnectError::InvalidPolicy);
        }

        let mut state = RetryState::default();

        loop {
            if *shutdown.borrow() {
                tracing::warn!(
                    attempts = state.attempts,
                    "Shutdown requested while connecting to broker"
                );
                return Err(ConnectError::Cancelled {
                    attempts: state.attempts,
                });
            }

            state.record_attempt();
            let error = match with_deadline(self.connect_timeout, self.dialer.dial(target)).await {
                Ok(Ok(connection)) => {
                    tracing::info!(
                        attempt = state.attempts,
                        broker = %target.redacted_url(),
                        "Connected to broker"
                    );
                    metrics::record_connect_attempt(true);
                    return Ok(connection);
                }
                Ok(Err(e)) => e,
                Err(Elapsed(after)) => BrokerError::DialTimeout(after),
            };

            metrics::record_connect_attempt(false);
            state.record_failure();
            tracing::warn!(
                attempt = state.attempts,
                broker = %target.redacted_url(),
                error = %error,
                "Broker not yet ready"
            );

            if state.failures > self.policy.max_attempts {
                return Err(ConnectError::Exhausted {
                    attempts: state.attempts,
                    source: error,
                });
            }

            let delay = state.schedule(self.policy.backoff.as_ref());
            tracing::info!(attempt = state.attempts, delay = ?delay, "Backing off");

            if self.pause(delay, shutdown).await {
                return Err(ConnectError::Cancelled {
                    attempts: state.attempts,
                });
            }
        }
    }

    /// Sleep for `delay`; returns true when shutdown interrupted the wait.
    async fn pause(&self, delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
        let interrupted = tokio::select! {
            _ = self.clock.sleep(delay) => return false,
            signal = shutdown.wait_for(|triggered| *triggered) => signal.is_ok(),
        };

        // No one can signal any more; finish the wait.
        if !interrupted {
            self.clock.sleep(delay).await;
        }
        interrupted
    }
}
