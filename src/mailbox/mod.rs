//! Per-task inboxes with Erlang-style selective receive.
//!
//! A [`Mailbox`] accepts messages from any number of sender tasks. The
//! owning task services it by starting a receive pass ([`Mailbox::receive`])
//! and offering each candidate [`Matcher`] to its clauses in turn; messages
//! matched by no clause are saved and replayed, in order, ahead of newer
//! arrivals on the next pass. Senders that expect an answer use
//! [`Mailbox::send_with_reply`] and block on the returned [`ReplyHandle`].

mod envelope;

mod reply;
pub use reply::{Reply, ReplyHandle};

mod matcher;
pub use matcher::Matcher;

mod model;
pub use model::{Mailbox, Receive};
