//! A named, addressable owner of one mailbox.

use std::sync::Arc;

use crate::{
    mailbox::{Mailbox, Receive, ReplyHandle},
    message::Message,
    token::{self, IdToken},
};

/// A named concurrent entity owning exactly one [`Mailbox`].
///
/// An actor adds nothing to the mailbox beyond an addressable identity:
/// application code passes the actor around (typically as an [`Arc`]) and
/// sends to it directly, while the owning task services
/// [`Self::receive`].
#[derive(Debug)]
pub struct Actor {
    name: String,
    id: IdToken,
    mailbox: Arc<Mailbox>,
}

impl Actor {
    /// Create a new actor with its own empty mailbox.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: token::generate_token(),
            mailbox: Mailbox::new_arc(),
        }
    }

    /// Create a new actor, and return the atomic reference to it.
    pub fn new_arc(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(name))
    }

    /// Get the name of this actor.
    pub fn name(&self) -> String {
        format!("actor://{}#{}", self.name, self.id)
    }

    /// The identity token of this actor.
    pub fn id(&self) -> IdToken {
        self.id
    }

    /// The mailbox this actor owns.
    pub fn mailbox(&self) -> Arc<Mailbox> {
        Arc::clone(&self.mailbox)
    }

    /// Deliver a message to this actor.
    pub fn send(&self, message: impl Into<Message>) {
        self.mailbox.send(message);
    }

    /// Deliver a message to this actor and return a handle to its one-shot
    /// reply.
    pub fn send_with_reply(&self, message: impl Into<Message>) -> ReplyHandle {
        self.mailbox.send_with_reply(message)
    }

    /// Start a receive pass over this actor's mailbox.
    ///
    /// # Panics
    ///
    /// Panics if a receive pass is already active; see
    /// [`Mailbox::receive`].
    pub fn receive(&self) -> Receive {
        self.mailbox.receive()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{msg, pattern, TypeTag};

    #[tokio::test]
    async fn actors_forward_to_their_mailbox() {
        let actor = Actor::new_arc("adder");
        let handle = actor.send_with_reply(msg!["add", 19, 23]);

        let mut recv = actor.receive();
        while let Some(matcher) = recv.next().await {
            if matcher.matches(&pattern!["add", TypeTag::Int, TypeTag::Int]) {
                let [Message::Int(a), Message::Int(b)] = matcher.captured() else {
                    panic!("Expected two captured integers.");
                };
                let total = a + b;
                matcher.respond(total).expect("Failed to respond.");
                break;
            }
        }
        drop(recv);

        assert_eq!(
            handle.wait().await.value(),
            Some(Message::Int(42))
        );
        assert!(actor.name().starts_with("actor://adder#"));
    }
}
