//! The mailbox model: the primary queue, the save-area history, and the
//! receive cursor that drives the selective-receive protocol.
//!
//! A receive pass works through the mailbox one candidate at a time:
//!
//! 1) The oldest still-unfinished save area is drained first, oldest
//!    message first, before anything newer; the primary queue is only
//!    consulted once the history is empty.
//! 2) Each candidate is offered to the pass's clauses through a
//!    [`Matcher`]. The first clause that accepts it consumes it, removing
//!    it from the mailbox for good.
//! 3) A candidate no clause accepted is moved to *this* pass's save area,
//!    to be offered again on the next pass.
//! 4) Once no candidate is available, the pass blocks until a sender
//!    delivers one, bounded by the timeout budget if one was declared.
//!
//! A pass may be abandoned at any point (`break`, early return, drop); its
//! save area is pushed onto the history so no inspected-but-unmatched
//! message is ever lost.

use deadqueue::unlimited::Queue;
use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};
use tokio::time::Duration;

use super::{
    envelope::Envelope,
    matcher::{Matcher, Settled},
    reply::{Reply, ReplyHandle},
};
use crate::message::Message;

/// The history of save areas from earlier, still-unfinished receive passes,
/// oldest first.
type SaveHistory = VecDeque<VecDeque<Envelope>>;

/// An Erlang-style mailbox.
///
/// Senders [`Self::send`] from any number of tasks; the owning task drains
/// the mailbox through [`Self::receive`], one pass at a time.
pub struct Mailbox {
    /// Messages delivered by senders, not yet looked at by a receive pass.
    queue: Queue<Envelope>,

    /// Save areas of earlier passes that exited before draining them.
    saved: Mutex<SaveHistory>,

    /// Whether a receive pass is currently active.
    receiving: AtomicBool,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("len", &self.len())
            .field("receiving", &self.receiving)
            .finish()
    }
}

impl Mailbox {
    /// Create a new, empty mailbox.
    pub fn new() -> Self {
        Self {
            queue: Queue::new(),
            saved: Mutex::new(SaveHistory::new()),
            receiving: AtomicBool::new(false),
        }
    }

    /// Create a new mailbox, and return the atomic reference to it.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Deliver a message into this mailbox.
    ///
    /// Never blocks and always succeeds; safe to call from any number of
    /// tasks while a receive pass is in progress.
    pub fn send(&self, message: impl Into<Message>) {
        self.queue.push(Envelope::new(message.into()));
    }

    /// Deliver a message and return a handle to its one-shot reply.
    ///
    /// The handle resolves once a receive clause consumes the message: to
    /// [`Reply::Value`] if the clause responded, or [`Reply::NoReply`] if it
    /// consumed the message without responding.
    pub fn send_with_reply(&self, message: impl Into<Message>) -> ReplyHandle {
        let (envelope, handle) = Envelope::with_reply(message.into());
        self.queue.push(envelope);
        handle
    }

    /// Start a receive pass over this mailbox.
    ///
    /// # Panics
    ///
    /// Panics if a receive pass is already active on this mailbox. Receive
    /// passes must not be nested or run concurrently; finish (or drop) the
    /// previous [`Receive`] first.
    pub fn receive(self: &Arc<Self>) -> Receive {
        if self
            .receiving
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            panic!("A receive pass is already active on this mailbox.");
        }

        Receive {
            mailbox: Arc::clone(self),
            save: VecDeque::new(),
            pending: None,
            probed: false,
            declared: None,
            waited: Duration::ZERO,
            fired: false,
        }
    }

    /// The number of messages currently queued or saved.
    ///
    /// A candidate being offered to the active pass's clauses is not
    /// counted.
    pub fn len(&self) -> usize {
        self.queue.len() + self.saved_lock().iter().map(VecDeque::len).sum::<usize>()
    }

    /// Check if the mailbox holds no queued or saved messages.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock the save-area history.
    fn saved_lock(&self) -> MutexGuard<'_, SaveHistory> {
        self.saved.lock().unwrap_or_else(|poison| {
            // If the lock is poisoned, we clear the poison and print a
            // warning; the deferred messages themselves are still intact.
            logger::warn!("Poisoned save-area lock ignored on this mailbox.");
            self.saved.clear_poison();
            poison.into_inner()
        })
    }

    /// Pop the oldest saved envelope, discarding emptied save areas for
    /// good.
    fn pop_saved(&self) -> Option<Envelope> {
        let mut saved = self.saved_lock();
        while let Some(area) = saved.front_mut() {
            if let Some(envelope) = area.pop_front() {
                return Some(envelope);
            }
            saved.pop_front();
        }
        None
    }

    /// Push an abandoned pass's save area onto the history.
    fn push_saved(&self, area: VecDeque<Envelope>) {
        if !area.is_empty() {
            self.saved_lock().push_back(area);
        }
    }
}

/// One receive pass over a [`Mailbox`].
///
/// This is the cursor form of the receive protocol: [`Self::next`] produces
/// one [`Matcher`] at a time, and inspects the previous matcher's outcome
/// when control returns to it. Dropping the cursor ends the pass without
/// losing messages.
///
/// A pass with a declared timeout ends after producing the timeout-fired
/// matcher; [`Self::next`] then returns [`None`]. A pass without one blocks
/// until a message arrives, indefinitely if need be.
#[derive(Debug)]
pub struct Receive {
    mailbox: Arc<Mailbox>,

    /// Messages inspected but unmatched during this pass.
    save: VecDeque<Envelope>,

    /// The matcher currently out with clause code.
    pending: Option<Matcher>,

    /// Whether the probe has been produced this pass.
    probed: bool,

    /// The timeout budget declared through the probe, if any.
    declared: Option<Duration>,

    /// Cumulative time spent blocking this pass; the budget bounds the
    /// total, not any single wait.
    waited: Duration,

    /// Whether the timeout-fired matcher has been produced.
    fired: bool,
}

impl Receive {
    /// Produce the next matcher of this pass.
    ///
    /// Suspends while the mailbox is empty. Returns [`None`] once the pass
    /// has timed out.
    pub async fn next(&mut self) -> Option<&mut Matcher> {
        self.settle();

        if self.fired {
            return None;
        }

        // Oldest unfinished save area first, then the primary queue.
        if let Some(envelope) = self.mailbox.pop_saved() {
            return Some(self.install(Matcher::wrap(envelope)));
        }
        if let Some(envelope) = self.mailbox.queue.try_pop() {
            return Some(self.install(Matcher::wrap(envelope)));
        }

        // Nothing is available: give a timeout clause one chance to declare
        // its budget before the first blocking wait.
        if !self.probed {
            self.probed = true;
            return Some(self.install(Matcher::probe()));
        }

        match self.declared {
            None => {
                let envelope = self.mailbox.queue.pop().await;
                Some(self.install(Matcher::wrap(envelope)))
            }
            Some(declared) => {
                let remaining = declared.saturating_sub(self.waited);
                if remaining.is_zero() {
                    self.fired = true;
                    return Some(self.install(Matcher::timeout_fired()));
                }

                let start = tokio::time::Instant::now();
                match tokio::time::timeout(remaining, self.mailbox.queue.pop()).await {
                    Ok(envelope) => {
                        self.waited += start.elapsed();
                        Some(self.install(Matcher::wrap(envelope)))
                    }
                    Err(_elapsed) => {
                        self.waited = declared;
                        self.fired = true;
                        Some(self.install(Matcher::timeout_fired()))
                    }
                }
            }
        }
    }

    /// Park a matcher with clause code, keeping ownership here so its
    /// outcome can be inspected when control returns.
    fn install(&mut self, matcher: Matcher) -> &mut Matcher {
        self.pending.insert(matcher)
    }

    /// Apply the outcome of the matcher last handed to clause code.
    fn settle(&mut self) {
        let Some(matcher) = self.pending.take() else {
            return;
        };

        match matcher.settle() {
            Settled::Unmatched(envelope) => {
                // Remember for the next pass over the mailbox.
                self.save.push_back(envelope);
            }
            Settled::Consumed { slot, reply } => match (slot, reply) {
                (Some(slot), reply) => {
                    if let Err(_err) = slot.fulfill(reply.map(Reply::Value).unwrap_or(Reply::NoReply))
                    {
                        logger::warn!("Failed to fulfill a reply slot: {}", _err);
                    }
                }
                (None, Some(_reply)) => {
                    logger::warn!(
                        "A reply was staged for a message sent without a reply slot; \
                        discarding it."
                    );
                }
                (None, None) => {}
            },
            Settled::Probed(declared) => {
                // The matcher rejects a second declaration, so this cannot
                // overwrite an earlier budget.
                if let Some(after) = declared {
                    logger::trace!("Timeout declared for this pass: {:?}", after);
                    self.declared = Some(after);
                }
            }
            Settled::Finished => {}
        }
    }
}

impl Drop for Receive {
    /// End the pass: settle the outstanding matcher, hand the save area
    /// over to the mailbox, and release the single-pass guard.
    fn drop(&mut self) {
        self.settle();
        self.mailbox.push_saved(std::mem::take(&mut self.save));
        self.mailbox.receiving.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{msg, pattern, Message, TypeTag};

    /// Drain every message currently in the mailbox with a catch-all
    /// clause, without blocking.
    async fn drain(mailbox: &Arc<Mailbox>) -> Vec<Message> {
        let mut drained = Vec::new();
        let mut recv = mailbox.receive();
        while let Some(matcher) = recv.next().await {
            if matcher.matches(&pattern![]) {
                drained.push(matcher.message().expect("A real message.").clone());
            }
            if matcher.timeout(Duration::ZERO).expect("One timeout clause.") {
                break;
            }
        }
        drained
    }

    #[tokio::test]
    async fn catch_all_preserves_fifo_order() {
        let mailbox = Mailbox::new_arc();
        for value in 0..5 {
            mailbox.send(value);
        }

        let drained = drain(&mailbox).await;
        assert_eq!(
            drained,
            (0..5).map(Message::from).collect::<Vec<_>>()
        );
        assert!(mailbox.is_empty());
    }

    #[tokio::test]
    async fn unmatched_messages_replay_in_order_after_early_exit() {
        let mailbox = Mailbox::new_arc();
        mailbox.send(msg!["defer", 1]);
        mailbox.send(msg!["defer", 2]);
        mailbox.send(msg!["take", 3]);

        {
            let mut recv = mailbox.receive();
            while let Some(matcher) = recv.next().await {
                if matcher.matches(&pattern!["take", TypeTag::Int]) {
                    assert_eq!(matcher.captured(), &[Message::Int(3)]);
                    break;
                }
            }
        }

        // Both deferred messages survive, in their original order, ahead of
        // anything newer.
        mailbox.send(msg!["defer", 4]);
        assert_eq!(
            drain(&mailbox).await,
            vec![msg!["defer", 1], msg!["defer", 2], msg!["defer", 4]]
        );
    }

    #[tokio::test]
    async fn save_areas_replay_oldest_area_first() {
        let mailbox = Mailbox::new_arc();
        mailbox.send("a1");
        mailbox.send("a2");

        {
            // First pass inspects both messages and defers both.
            let mut recv = mailbox.receive();
            for _ in 0..2 {
                let matcher = recv.next().await.expect("A candidate.");
                assert!(!matcher.matches(&pattern![5]));
            }
        }
        {
            // Second pass re-inspects only the first deferred message and
            // exits; its save area is newer than the remainder of the
            // first pass's.
            let mut recv = mailbox.receive();
            let matcher = recv.next().await.expect("A candidate.");
            assert_eq!(matcher.message(), Some(&Message::from("a1")));
            assert!(!matcher.matches(&pattern![5]));
        }

        // The first pass's leftover area is served before the second
        // pass's, even though "a1" arrived first.
        assert_eq!(
            drain(&mailbox).await,
            vec![Message::from("a2"), Message::from("a1")]
        );
    }

    #[tokio::test]
    async fn zero_duration_timeout_fires_without_blocking() {
        let mailbox = Mailbox::new_arc();

        let mut fired = false;
        let mut recv = mailbox.receive();
        while let Some(matcher) = recv.next().await {
            assert!(!matcher.matches(&pattern![]));
            if matcher.timeout(Duration::ZERO).expect("One timeout clause.") {
                fired = true;
                break;
            }
        }
        assert!(fired);
    }

    #[tokio::test]
    async fn zero_duration_timeout_still_drains_available_messages() {
        let mailbox = Mailbox::new_arc();
        mailbox.send(1);
        mailbox.send(2);

        assert_eq!(
            drain(&mailbox).await,
            vec![Message::Int(1), Message::Int(2)]
        );
    }

    #[tokio::test]
    async fn replies_resolve_to_the_responded_value() {
        let mailbox = Mailbox::new_arc();
        let handle = mailbox.send_with_reply(msg!["sum", 5, 2]);

        let mut recv = mailbox.receive();
        while let Some(matcher) = recv.next().await {
            if matcher.matches(&pattern!["sum", TypeTag::Int, TypeTag::Int]) {
                let [Message::Int(a), Message::Int(b)] = matcher.captured() else {
                    panic!("Expected two captured integers.");
                };
                let total = a + b;
                matcher.respond(total).expect("Failed to respond.");
                break;
            }
        }
        drop(recv);

        assert_eq!(handle.wait().await, Reply::Value(Message::Int(7)));
    }

    #[tokio::test]
    async fn replies_without_an_explicit_response_resolve_to_no_reply() {
        let mailbox = Mailbox::new_arc();
        let handle = mailbox.send_with_reply("ping");

        let mut recv = mailbox.receive();
        while let Some(matcher) = recv.next().await {
            if matcher.matches(&pattern!["ping"]) {
                break;
            }
        }
        drop(recv);

        assert_eq!(handle.wait().await, Reply::NoReply);
    }

    #[tokio::test]
    #[should_panic(expected = "already active")]
    async fn nested_receive_passes_panic() {
        let mailbox = Mailbox::new_arc();
        let _outer = mailbox.receive();
        let _inner = mailbox.receive();
    }

    #[tokio::test]
    async fn a_finished_pass_releases_the_mailbox() {
        let mailbox = Mailbox::new_arc();
        mailbox.send(1);

        drop(mailbox.receive());

        // A new pass can start, and the uninspected message is untouched.
        assert_eq!(drain(&mailbox).await, vec![Message::Int(1)]);
    }
}
