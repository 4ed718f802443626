//! Single-writer state container
//!
//! The [`Store`] is owned by the sync session, which is the only writer.
//! Consumers hold a [`StoreReader`] and observe whole-state replacements
//! through a watch channel; they never see a partially applied transition.

mod state;

pub use state::DashboardState;

use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Authoritative dashboard state, mutated only through [`Store::update`]
pub struct Store {
    tx: watch::Sender<Arc<DashboardState>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(DashboardState::default()));
        Self { tx }
    }

    /// Current state
    pub fn current(&self) -> Arc<DashboardState> {
        self.tx.borrow().clone()
    }

    /// Read-only handle for consumers
    pub fn reader(&self) -> StoreReader {
        StoreReader {
            rx: self.tx.subscribe(),
        }
    }

    /// Apply a transition and publish the result as one replacement.
    ///
    /// Subscribers are only notified when the state actually changed.
    pub fn update<F>(&self, transition: F)
    where
        F: FnOnce(&DashboardState) -> DashboardState,
    {
        let current = self.current();
        let next = transition(&current);
        if next != *current {
            self.tx.send_replace(Arc::new(next));
        }
    }
}

/// Read-only subscription to the store
#[derive(Clone)]
pub struct StoreReader {
    rx: watch::Receiver<Arc<DashboardState>>,
}

impl StoreReader {
    pub fn current(&self) -> Arc<DashboardState> {
        self.rx.borrow().clone()
    }

    /// Wait for the next published state.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<DashboardState>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Stream of states, starting with the current one
    pub fn into_stream(self) -> WatchStream<Arc<DashboardState>> {
        WatchStream::new(self.rx)
    }
}
