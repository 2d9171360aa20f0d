// Rust guideline compliant 2026-10-19

//! One-shot, broadcast shutdown signal.

use tokio::sync::watch;

/// Create a connected handle/signal pair.
#[must_use]
pub fn channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, ShutdownSignal { rx })
}

/// Sending side: requests shutdown.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Request shutdown. Idempotent; works with or without live signals.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving side: observed by the relay between messages.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    #[cfg(test)]
    fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested. Cancel-safe.
    ///
    /// Never resolves if the handle is dropped without triggering.
    pub async fn wait(&mut self) {
        if self.rx.wait_for(|triggered| *triggered).await.is_ok() {
            return;
        }
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::channel;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_resolves_after_trigger() {
        let (handle, mut signal) = channel();
        assert!(!signal.is_triggered());
        handle.trigger();
        assert!(signal.is_triggered());
        signal.wait().await;
    }

    #[tokio::test]
    async fn every_clone_observes_trigger() {
        let (handle, mut first) = channel();
        let mut second = first.clone();
        handle.trigger();
        first.wait().await;
        second.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_handle_never_resolves() {
        let (handle, mut signal) = channel();
        drop(handle);
        let waited = tokio::time::timeout(Duration::from_secs(60), signal.wait()).await;
        assert!(waited.is_err(), "wait must stay pending without a trigger");
    }
}
