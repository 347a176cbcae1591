//! Shutdown coordination for the gateway.

use tokio::sync::watch;

/// Coordinator for shutdown.
///
/// Holds a latched flag that the connector, the HTTP server and the drain
/// timer subscribe to. Once triggered it stays triggered, so a subscriber
/// created after the signal still observes it.
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once shutdown is triggered, immediately if it already was.
///
/// A dropped coordinator can never trigger, so it never resolves either.
pub async fn signalled(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|triggered| *triggered).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_reaches_subscribers() {
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 1);

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), signalled(rx))
            .await
            .expect("signal should arrive");
    }

    #[tokio::test]
    async fn late_subscriber_sees_earlier_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        assert!(shutdown.is_triggered());

        tokio::time::timeout(Duration::from_secs(1), signalled(shutdown.subscribe()))
            .await
            .expect("trigger should be latched");
    }

    #[tokio::test]
    async fn dropped_coordinator_never_signals() {
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        drop(shutdown);

        let waited = tokio::time::timeout(Duration::from_millis(50), signalled(rx)).await;
        assert!(waited.is_err());
    }
}
