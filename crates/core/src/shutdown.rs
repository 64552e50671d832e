use std::sync::Arc;
use tokio::sync::watch;

/// Fires a shutdown to every [`ShutdownSignal`] created from it.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownTrigger {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
            _keepalive: None,
        }
    }

    /// Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for ShutdownTrigger {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable cancellation handle observed by every long-running loop.
///
/// A signal whose trigger has been dropped counts as cancelled.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
    _keepalive: Option<Arc<watch::Sender<bool>>>,
}

impl ShutdownSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            rx,
            _keepalive: Some(Arc::new(tx)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_wakes_every_signal() {
        let trigger = ShutdownTrigger::new();
        let first = trigger.signal();
        let second = first.clone();

        let waiter = tokio::spawn(async move { second.cancelled().await });
        trigger.trigger();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("signal should fire")
            .unwrap();
        assert!(first.is_cancelled());
    }

    #[tokio::test]
    async fn test_signal_created_after_trigger_is_cancelled() {
        let trigger = ShutdownTrigger::new();
        trigger.trigger();
        let late = trigger.signal();
        assert!(late.is_cancelled());
        late.cancelled().await;
    }

    #[tokio::test]
    async fn test_never_does_not_fire() {
        let signal = ShutdownSignal::never();
        let result = tokio::time::timeout(Duration::from_millis(50), signal.cancelled()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_dropped_trigger_counts_as_cancelled() {
        let trigger = ShutdownTrigger::new();
        let signal = trigger.signal();
        drop(trigger);
        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .expect("dropped trigger should release waiters");
    }
}
