//! Initialization barrier.
//!
//! The controlling task parks here until the driver has queried the
//! network far enough to be used, or has given up.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::types::NetworkId;

/// Outcome observed by a waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    /// Nothing signaled yet.
    Pending,
    /// At least one "nodes queried" signal arrived.
    Ready,
    /// The driver failed to initialize.
    Failed,
}

#[derive(Debug, Default)]
struct BarrierState {
    signals: u64,
    failed: bool,
    active_network: Option<NetworkId>,
}

impl BarrierState {
    const fn released(&self) -> bool {
        self.signals > 0 || self.failed
    }

    const fn state(&self) -> InitState {
        if self.failed {
            InitState::Failed
        } else if self.signals > 0 {
            InitState::Ready
        } else {
            InitState::Pending
        }
    }
}

/// Gate releasing waiters once the network is usable or has failed.
///
/// Waiters loop on the release predicate, so a waiter that arrives after
/// the signal returns at once and no wakeup is lost or spurious.
#[derive(Debug, Clone)]
pub struct InitBarrier {
    tx: Arc<watch::Sender<BarrierState>>,
}

impl Default for InitBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl InitBarrier {
    /// Creates a closed barrier.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(BarrierState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Releases every waiter.
    pub fn signal(&self) {
        self.tx.send_modify(|s| s.signals += 1);
    }

    /// Flags failure and releases every waiter.
    pub fn fail(&self) {
        self.tx.send_modify(|s| {
            s.failed = true;
            s.signals += 1;
        });
    }

    /// Records the network reported ready by the driver.
    ///
    /// Does not release waiters.
    pub fn set_active_network(&self, network_id: NetworkId) {
        self.tx.send_if_modified(|s| {
            let changed = s.active_network != Some(network_id);
            s.active_network = Some(network_id);
            changed
        });
    }

    /// Network recorded by the last ready notification.
    #[must_use]
    pub fn active_network(&self) -> Option<NetworkId> {
        self.tx.borrow().active_network
    }

    /// Current state without waiting.
    #[must_use]
    pub fn state(&self) -> InitState {
        self.tx.borrow().state()
    }

    /// Number of broadcasts so far.
    #[must_use]
    pub fn signals(&self) -> u64 {
        self.tx.borrow().signals
    }

    /// Returns true once the driver has failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.tx.borrow().failed
    }

    /// Waits until the barrier is released and returns the state seen.
    ///
    /// Blocks indefinitely if the driver never reports progress.
    pub async fn wait(&self) -> InitState {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so the channel cannot close.
        match rx.wait_for(BarrierState::released).await {
            Ok(state) => state.state(),
            Err(_) => self.state(),
        }
    }

    /// Waits like [`wait`](Self::wait) but gives up after `timeout`.
    pub async fn wait_timeout(&self, timeout: Duration) -> Result<InitState> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| Error::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })
    }
}
