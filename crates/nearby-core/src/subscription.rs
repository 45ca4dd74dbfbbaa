//! Cancellation handle for long-lived subscriptions.

use std::fmt;
use std::sync::Mutex;

type CancelFn = Box<dyn FnOnce() + Send>;

/// Handle returned by every long-lived subscription (position watcher,
/// proximity feed, document-store listener).
///
/// `cancel()` runs the teardown at most once; later calls, and calls on a
/// handle that was never active, are no-ops. Dropping the handle cancels it.
pub struct Subscription {
    on_cancel: Mutex<Option<CancelFn>>,
}

impl Subscription {
    /// Creates an active subscription that runs `on_cancel` when cancelled.
    pub fn new(on_cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_cancel: Mutex::new(Some(Box::new(on_cancel))),
        }
    }

    /// Creates a handle that is already inactive.
    pub fn inactive() -> Self {
        Self {
            on_cancel: Mutex::new(None),
        }
    }

    /// Cancels the subscription. Idempotent.
    pub fn cancel(&self) {
        let on_cancel = self
            .on_cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(on_cancel) = on_cancel {
            on_cancel();
        }
    }

    /// Returns true until the subscription has been cancelled.
    pub fn is_active(&self) -> bool {
        self.on_cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
