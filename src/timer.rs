//! A cancellable one-shot delayed-callback timer, and delayed message
//! delivery built on it.

use std::sync::{Arc, Mutex};
use tokio::time::Duration;

use crate::{mailbox::Mailbox, message::Message};

/// A one-shot timer running a callback after a delay.
///
/// The callback runs on the tokio runtime. [`Self::cancel`] stops a pending
/// fire; [`Self::reset`] cancels and restarts the full delay from now, even
/// if the timer has already fired. Dropping the handle does not cancel the
/// pending fire.
pub struct Timer {
    after: Duration,
    callback: Arc<dyn Fn() + Send + Sync>,
    handle: Mutex<tokio::task::JoinHandle<()>>,
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer").field("after", &self.after).finish()
    }
}

impl Timer {
    /// Schedule `callback` to run once, `after` from now.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(after: Duration, callback: impl Fn() + Send + Sync + 'static) -> Self {
        let callback: Arc<dyn Fn() + Send + Sync> = Arc::new(callback);
        Self {
            handle: Mutex::new(Self::schedule(after, Arc::clone(&callback))),
            after,
            callback,
        }
    }

    fn schedule(after: Duration, callback: Arc<dyn Fn() + Send + Sync>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            callback();
        })
    }

    fn handle_lock(&self) -> std::sync::MutexGuard<'_, tokio::task::JoinHandle<()>> {
        self.handle.lock().unwrap_or_else(|poison| {
            logger::warn!("Poisoned timer lock ignored.");
            self.handle.clear_poison();
            poison.into_inner()
        })
    }

    /// Cancel the pending fire, if any.
    ///
    /// A callback that has already run is unaffected.
    pub fn cancel(&self) {
        self.handle_lock().abort();
    }

    /// Cancel the pending fire and restart the full delay from now.
    pub fn reset(&self) {
        // An entirely new sleep is scheduled; the elapsed portion of the
        // old one does not carry over.
        let mut handle = self.handle_lock();
        handle.abort();
        *handle = Self::schedule(self.after, Arc::clone(&self.callback));
    }
}

/// After `after`, deliver `message` to `mailbox`.
///
/// Returns the [`Timer`], which allows the delivery to be canceled and
/// reset.
pub fn send_after(after: Duration, mailbox: &Arc<Mailbox>, message: impl Into<Message>) -> Timer {
    let mailbox = Arc::clone(mailbox);
    let message = message.into();

    Timer::new(after, move || mailbox.send(message.clone()))
}
