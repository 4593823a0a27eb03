//! Admission gate and cancellation signal for concurrent page tasks.
//!
//! Every page gets its own task up front; the [`AdmissionGate`] decides how
//! many of them may be *active* at once. Permits are RAII guards, so a slot is
//! returned exactly once on every exit path of a task, including errors,
//! cancellation and panics.
//!
//! [`cancel_pair`] creates the shared cancellation signal: one
//! [`CancelHandle`] owned by the aggregator, any number of [`CancelSignal`]
//! clones handed to tasks.

use std::sync::Arc;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};

/// Counting gate capping the number of simultaneously active page tasks.
///
/// Admission order among waiters is whatever the semaphore provides; only the
/// upper bound is guaranteed.
#[derive(Clone, Debug)]
pub struct AdmissionGate {
    slots: Arc<Semaphore>,
}

/// A held admission slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    /// Create a gate with `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity.max(1))),
        }
    }

    /// Wait until a slot is free and take it.
    ///
    /// Returns `None` only if the gate was closed.
    pub async fn acquire(&self) -> Option<GatePermit> {
        Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .ok()
            .map(|permit| GatePermit { _permit: permit })
    }
}

/// Sending side of the cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Receiving side of the cancellation signal, cheap to clone into tasks.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Create a linked handle/signal pair in the not-cancelled state.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    /// Trigger cancellation. Returns `true` only for the call that actually
    /// flipped the signal; later calls are no-ops.
    pub fn cancel(&self) -> bool {
        self.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        })
    }
}

impl CancelSignal {
    /// Resolve once cancellation has been triggered.
    ///
    /// If the handle is dropped without cancelling, this never resolves.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
