//! Host-driven cancellation.
//!
//! The flag is polled at file boundaries; the in-flight request is aborted
//! through a registered [`AbortHandle`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::{AbortHandle, Abortable};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("analysis cancelled")]
pub struct Cancelled;

#[derive(Debug, Default)]
struct Shared {
    cancelled: AtomicBool,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl Shared {
    fn in_flight(&self) -> MutexGuard<'_, Option<AbortHandle>> {
        match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Cloneable cancellation signal shared between the host and a run.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    shared: Arc<Shared>,
}

impl CancelSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and abort whatever call is in flight.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
        if let Some(handle) = self.shared.in_flight().take() {
            handle.abort();
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Run `future` unless cancellation arrives first.
    ///
    /// Only one guarded call is tracked at a time; runs are sequential.
    pub async fn guard<F: Future>(&self, future: F) -> Result<F::Output, Cancelled> {
        if self.is_cancelled() {
            return Err(Cancelled);
        }
        let (handle, registration) = AbortHandle::new_pair();
        *self.shared.in_flight() = Some(handle.clone());
        // cancel() may have run between the first check and registration.
        if self.is_cancelled() {
            handle.abort();
        }

        let result = Abortable::new(future, registration).await;
        self.shared.in_flight().take();
        result.map_err(|_aborted| Cancelled)
    }
}
