//! Live queries over a store change signal.
//!
//! A live query is one spawned task that runs its fetch once up front and
//! again after every change signal, handing the full result set to a
//! callback whenever it differs from the last delivery. The returned
//! [`Subscription`] owns that task: dropping it or calling
//! [`Subscription::unsubscribe`] stops deliveries.

use std::future::Future;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use super::StoreError;

/// Handle to a running live query.
#[derive(Debug)]
pub struct Subscription {
    label: String,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stops deliveries and releases the listener.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Returns `true` until the subscription is released or its change
    /// source closes.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!(subscription = %self.label, "live query released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Spawns a live query.
///
/// `changes` must be obtained before calling so that no write between the
/// caller's decision to subscribe and the first fetch is missed. Fetch
/// failures are logged and the query keeps waiting for the next change. A
/// lagged receiver re-runs the fetch; a closed one ends the query.
///
/// Must be called from within a tokio runtime.
pub fn spawn_live_query<T, F, Fut, C>(
    label: impl Into<String>,
    mut changes: broadcast::Receiver<()>,
    fetch: F,
    mut deliver: C,
) -> Subscription
where
    T: Clone + PartialEq + Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<T>, StoreError>> + Send + 'static,
    C: FnMut(Vec<T>) + Send + 'static,
{
    let label = label.into();
    let task_label = label.clone();
    let handle = tokio::spawn(async move {
        let mut last: Option<Vec<T>> = None;
        loop {
            match fetch().await {
                Ok(snapshot) => {
                    if last.as_ref() != Some(&snapshot) {
                        deliver(snapshot.clone());
                        last = Some(snapshot);
                    }
                }
                Err(e) => {
                    tracing::warn!(subscription = %task_label, error = %e, "live query fetch failed");
                }
            }

            match changes.recv().await {
                Ok(()) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(subscription = %task_label, skipped, "change signal lagged");
                }
                Err(RecvError::Closed) => {
                    tracing::debug!(subscription = %task_label, "change source closed");
                    break;
                }
            }
        }
    });

    Subscription {
        label,
        handle: Some(handle),
    }
}
