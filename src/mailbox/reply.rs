//! One-shot reply slots.
//!
//! Every message sent with a reply expectation carries a [`ReplySlot`]: a
//! single-write, multi-read future. The clause that consumes the message
//! writes at most one value; every reader of the matching [`ReplyHandle`]
//! observes that same value.

use std::sync::{Arc, OnceLock};
use tokio::sync::Notify;

use crate::{errors::CourierError, message::Message};

/// The resolved value of a reply slot.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// The consuming clause responded with this value.
    Value(Message),
    /// The message was consumed without an explicit response.
    NoReply,
}

impl Reply {
    /// The responded value, if one was set.
    pub fn value(self) -> Option<Message> {
        match self {
            Self::Value(message) => Some(message),
            Self::NoReply => None,
        }
    }
}

/// A single-write, multi-read one-shot value slot.
#[derive(Debug, Default)]
pub(crate) struct ReplySlot {
    value: OnceLock<Reply>,
    notify: Notify,
}

impl ReplySlot {
    /// Create a new slot, wrapped in an [`Arc`] so that the mailbox side and
    /// any number of reader handles can share it.
    pub(crate) fn new_arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fulfill the slot and wake all waiting readers.
    pub(crate) fn fulfill(&self, reply: Reply) -> Result<(), CourierError> {
        self.value
            .set(reply)
            .map_err(|_| CourierError::ReplyAlreadySet)?;
        self.notify.notify_waiters();

        Ok(())
    }

    /// Wait for the slot to be fulfilled.
    ///
    /// The waiter is registered before the value is re-checked, so a value
    /// set just before this call cannot be missed.
    async fn wait(&self) -> Reply {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(reply) = self.value.get() {
                return reply.clone();
            }

            notified.await;
        }
    }
}

/// The sender-side read handle of a reply slot.
///
/// Cloneable; all clones resolve to the same [`Reply`]. Reading after the
/// value is set returns it immediately.
#[derive(Clone, Debug)]
pub struct ReplyHandle {
    slot: Arc<ReplySlot>,
}

impl ReplyHandle {
    pub(crate) fn new(slot: Arc<ReplySlot>) -> Self {
        Self { slot }
    }

    /// Get the reply, if it has been set.
    pub fn get(&self) -> Option<Reply> {
        self.slot.value.get().cloned()
    }

    /// Wait for the reply to be set.
    pub async fn wait(&self) -> Reply {
        self.slot.wait().await
    }

    /// Wait for the reply to be set, with a timeout.
    pub async fn wait_for(&self, timeout: tokio::time::Duration) -> Result<Reply, CourierError> {
        tokio::select! {
            reply = self.slot.wait() => Ok(reply),
            _ = tokio::time::sleep(timeout) => Err(CourierError::ReplyTimedOut(timeout)),
        }
    }
}
