use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Counts commits that have been dispatched but not finished
///
/// The counter is published through a watch channel so waiters wake as
/// soon as it reaches zero instead of polling.
#[derive(Debug)]
pub struct CommitTracker {
    outstanding: Arc<watch::Sender<usize>>,
}

impl Default for CommitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CommitTracker {
    pub fn new() -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            outstanding: Arc::new(outstanding),
        }
    }

    /// Registers one outstanding commit until the guard is dropped
    pub fn begin(&self) -> OutstandingGuard {
        self.outstanding.send_modify(|n| *n += 1);
        OutstandingGuard {
            outstanding: Arc::clone(&self.outstanding),
        }
    }

    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Waits until no commit is outstanding
    ///
    /// Returns false when `timeout` elapsed first.
    pub async fn wait_drained(&self, timeout: Duration) -> bool {
        let mut rx = self.outstanding.subscribe();
        let settled = tokio::time::timeout(timeout, async {
            rx.wait_for(|n| *n == 0).await.map(|_| ())
        })
        .await;

        match settled {
            Ok(Ok(())) => true,
            Ok(Err(_)) => self.outstanding() == 0,
            Err(_) => {
                tracing::warn!(
                    "Timed out after {:?} with {} commits outstanding",
                    timeout,
                    self.outstanding()
                );
                false
            }
        }
    }
}

/// Decrements the outstanding count when dropped
#[derive(Debug)]
pub struct OutstandingGuard {
    outstanding: Arc<watch::Sender<usize>>,
}

impl Drop for OutstandingGuard {
    fn drop(&mut self) {
        self.outstanding.send_modify(|n| *n = n.saturating_sub(1));
    }
}
