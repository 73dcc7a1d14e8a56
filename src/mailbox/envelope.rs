//! A queued message paired with its optional reply slot.

use std::sync::Arc;

use super::reply::{ReplyHandle, ReplySlot};
use crate::message::Message;

/// A message as held by a mailbox: the payload plus, for messages sent with
/// [`Mailbox::send_with_reply`](super::Mailbox::send_with_reply), the
/// one-shot slot the consuming clause's reply is written to.
#[derive(Debug)]
pub(crate) struct Envelope {
    message: Message,
    reply: Option<Arc<ReplySlot>>,
}

impl Envelope {
    /// Wrap a message with no reply slot.
    pub(crate) fn new(message: Message) -> Self {
        Self {
            message,
            reply: None,
        }
    }

    /// Wrap a message with a fresh reply slot, returning the read handle for
    /// the sender.
    pub(crate) fn with_reply(message: Message) -> (Self, ReplyHandle) {
        let slot = ReplySlot::new_arc();
        (
            Self {
                message,
                reply: Some(Arc::clone(&slot)),
            },
            ReplyHandle::new(slot),
        )
    }

    /// The wrapped message.
    pub(crate) fn message(&self) -> &Message {
        &self.message
    }

    /// Decompose into the message and the reply slot, if any.
    pub(crate) fn into_parts(self) -> (Message, Option<Arc<ReplySlot>>) {
        (self.message, self.reply)
    }
}
