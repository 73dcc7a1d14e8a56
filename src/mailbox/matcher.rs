//! The matcher offered to clause code during a receive pass.
//!
//! An instance of this is what a receive loop hands to its clauses, one per
//! candidate message per pass. The first clause whose pattern accepts the
//! message consumes it; later clauses in the same pass see a consumed
//! matcher and decline.
//!
//! Two internal tokens travel through the same channel as real messages:
//! the *probe*, produced once per pass before the first blocking wait so a
//! timeout clause can declare its duration, and the *timeout-fired* token,
//! produced when that duration expires. Ordinary clauses never observe
//! either token, and a timeout clause never observes an ordinary message;
//! [`Matcher::matches`] and [`Matcher::timeout`] enforce both directions.

use std::sync::Arc;
use tokio::time::Duration;

use super::{envelope::Envelope, reply::ReplySlot};
use crate::{errors::CourierError, message::Message, pattern::Pattern};

/// What a matcher wraps: a real message, or one of the two timeout-protocol
/// tokens.
#[derive(Debug)]
enum Token {
    Message(Envelope),
    Probe,
    TimeoutFired,
}

/// The outcome of a matcher once control has returned to the receive
/// cursor.
#[derive(Debug)]
pub(crate) enum Settled {
    /// A real message no clause accepted; to be saved for the next pass.
    Unmatched(Envelope),
    /// A real message a clause accepted, with any staged reply.
    Consumed {
        slot: Option<Arc<ReplySlot>>,
        reply: Option<Message>,
    },
    /// The probe came back, possibly carrying a declared timeout duration.
    Probed(Option<Duration>),
    /// The timeout-fired token came back; the pass is over.
    Finished,
}

/// Helper that matches a wrapped message against a sequence of clauses.
#[derive(Debug)]
pub struct Matcher {
    token: Token,
    consumed: bool,
    captures: Vec<Message>,
    reply: Option<Message>,
    declared: Option<Duration>,
}

impl Matcher {
    fn new(token: Token) -> Self {
        Self {
            token,
            consumed: false,
            captures: Vec::new(),
            reply: None,
            declared: None,
        }
    }

    /// Wrap a real message.
    pub(crate) fn wrap(envelope: Envelope) -> Self {
        Self::new(Token::Message(envelope))
    }

    /// The probe token, produced once per pass before the first blocking
    /// wait.
    pub(crate) fn probe() -> Self {
        Self::new(Token::Probe)
    }

    /// The timeout-fired token, the final matcher of a timed-out pass.
    pub(crate) fn timeout_fired() -> Self {
        Self::new(Token::TimeoutFired)
    }

    /// Offer a pattern clause against the wrapped message.
    ///
    /// Returns `true` iff this matcher wraps a real message, no earlier
    /// clause has consumed it, and the pattern matches. On success the
    /// captured values become available through [`Self::captured`] and the
    /// message is consumed; every later clause in this pass returns `false`.
    pub fn matches(&mut self, pattern: &Pattern) -> bool {
        // Never match two clauses.
        if self.consumed {
            return false;
        }

        // The timeout protocol tokens are not real messages.
        let Token::Message(envelope) = &self.token else {
            return false;
        };

        match pattern.matches(envelope.message()) {
            Some(captures) => {
                self.captures = captures;
                self.consumed = true;
                true
            }
            None => false,
        }
    }

    /// The timeout clause.
    ///
    /// On the probe, registers `after` as this pass's timeout budget and
    /// returns `Ok(false)`; declaring a second duration in the same pass is
    /// a usage error. Returns `Ok(true)` only on the timeout-fired token.
    /// Ordinary messages are ignored.
    pub fn timeout(&mut self, after: Duration) -> Result<bool, CourierError> {
        match &self.token {
            Token::Probe => {
                // Only one timeout clause can be used.
                if self.declared.is_some() {
                    return Err(CourierError::TimeoutAlreadyDeclared);
                }
                self.declared = Some(after);
                Ok(false)
            }
            Token::TimeoutFired => {
                self.consumed = true;
                Ok(true)
            }
            Token::Message(_) => Ok(false),
        }
    }

    /// Stage a reply value for the consumed message.
    ///
    /// The value is written into the message's reply slot once control
    /// returns to the receive cursor; a message sent without a reply slot
    /// has the staged value discarded with a warning.
    pub fn respond(&mut self, value: impl Into<Message>) -> Result<(), CourierError> {
        if !self.consumed || !matches!(self.token, Token::Message(_)) {
            return Err(CourierError::RespondWithoutMatch);
        }
        if self.reply.is_some() {
            return Err(CourierError::ReplyAlreadySet);
        }

        self.reply = Some(value.into());
        Ok(())
    }

    /// The original message, if this matcher wraps one.
    pub fn message(&self) -> Option<&Message> {
        match &self.token {
            Token::Message(envelope) => Some(envelope.message()),
            _ => None,
        }
    }

    /// The values captured by the accepting clause, in pattern-element
    /// order. Empty until a clause matches, and empty for a clause that
    /// captured nothing.
    pub fn captured(&self) -> &[Message] {
        &self.captures
    }

    /// Whether a clause has consumed the wrapped message.
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Decompose the matcher once control has returned to the cursor.
    pub(crate) fn settle(self) -> Settled {
        match self.token {
            Token::Message(envelope) => {
                if self.consumed {
                    let (_message, slot) = envelope.into_parts();
                    Settled::Consumed {
                        slot,
                        reply: self.reply,
                    }
                } else {
                    Settled::Unmatched(envelope)
                }
            }
            Token::Probe => Settled::Probed(self.declared),
            Token::TimeoutFired => Settled::Finished,
        }
    }
}
