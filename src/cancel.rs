use tokio::sync::watch;

use crate::DubError;

/// Sender side held by whoever owns the request (the CLI wires it to Ctrl-C).
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Receiver side passed down the pipeline. Clone freely.
#[derive(Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Construct a linked handle/signal pair for one request.
pub fn new_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    /// Broadcast cancellation to every outstanding [`CancelSignal`].
    pub fn cancel(&self) {
        // Errors only if every receiver is gone, nothing left to cancel then.
        let _ = self.tx.send(true);
    }
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation has been requested.
    ///
    /// Pends forever if the handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|&v| v).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Stage-boundary check.
    pub fn checkpoint(&self) -> Result<(), DubError> {
        if self.is_cancelled() {
            Err(DubError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cancel_is_observed_by_clones() {
        let (handle, signal) = new_pair();
        let clone = signal.clone();
        assert!(signal.checkpoint().is_ok());

        handle.cancel();
        assert!(signal.is_cancelled());
        assert!(matches!(clone.checkpoint(), Err(DubError::Cancelled)));
    }

    #[test]
    fn test_cancelled_resolves_after_cancel() {
        tokio_test::block_on(async {
            let (handle, signal) = new_pair();
            handle.cancel();
            signal.cancelled().await;
        });
    }

    #[tokio::test]
    async fn test_never_does_not_fire() {
        let signal = CancelSignal::never();
        let fired = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(fired.is_err());
        assert!(!signal.is_cancelled());
    }
}
