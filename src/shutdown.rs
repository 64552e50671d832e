use dispatch_core::{ShutdownSignal, ShutdownTrigger};
use tracing::{debug, info};

/// Process-wide graceful shutdown coordinator.
#[derive(Clone, Default)]
pub struct ShutdownManager {
    trigger: ShutdownTrigger,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self {
            trigger: ShutdownTrigger::new(),
        }
    }

    /// A signal for one task; subscribing after shutdown yields a fired signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        self.trigger.signal()
    }

    pub fn shutdown(&self) {
        if self.trigger.is_triggered() {
            debug!("shutdown already requested");
            return;
        }
        info!("shutdown requested");
        self.trigger.trigger();
    }

    pub fn is_shutdown(&self) -> bool {
        self.trigger.is_triggered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_reaches_every_subscriber() {
        let manager = ShutdownManager::new();
        let signals: Vec<_> = (0..3).map(|_| manager.subscribe()).collect();

        let waiters: Vec<_> = signals
            .into_iter()
            .map(|signal| tokio::spawn(async move { signal.cancelled().await }))
            .collect();

        manager.shutdown();

        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
        }
        assert!(manager.is_shutdown());
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_shutdown() {
        let manager = ShutdownManager::new();
        manager.shutdown();
        manager.shutdown();

        assert!(manager.subscribe().is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let manager = ShutdownManager::new();
        let clone = manager.clone();
        clone.shutdown();
        assert!(manager.is_shutdown());
    }
}
