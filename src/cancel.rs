//! A single cancellation signal shared across a long-running operation.
//!
//! Passed down through Dijkstra, Yen's outer loop, and the payment
//! attempt loop, and checked at every natural suspension point (§5,
//! §9 Design Notes "Cancellation propagation"). Cloning shares the same
//! underlying flag; cancelling any clone cancels all of them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    flag: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Synchronous check, used at loop boundaries that don't otherwise
    /// suspend (e.g. between Yen's spur iterations).
    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Resolves once cancelled; used in `tokio::select!` alongside a
    /// timer or channel receive so an in-flight `.await` can abandon at
    /// the next suspension point.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.inner.notify.notified().await;
    }
}
