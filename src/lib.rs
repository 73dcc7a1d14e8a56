//! Courier library.
//!
//! An in-process Erlang-style mailbox runtime: tasks communicate only by
//! sending messages into per-task [`Mailbox`]es, and each task services its
//! mailbox through a selective receive — offering every queued message to a
//! sequence of pattern clauses, deferring the ones nothing matched, and
//! bounding the whole pass with an optional timeout budget.
//!
//! ```no_run
//! use courier::{msg, pattern, Mailbox, TypeTag};
//! use tokio::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mailbox = Mailbox::new_arc();
//!     mailbox.send(5);
//!     mailbox.send(msg!["sum", 5, 2]);
//!
//!     let mut recv = mailbox.receive();
//!     while let Some(matcher) = recv.next().await {
//!         if matcher.matches(&pattern!["sum", TypeTag::Int, TypeTag::Int]) {
//!             println!("summands: {:?}", matcher.captured());
//!             break;
//!         }
//!         if matcher.timeout(Duration::from_secs(1)).unwrap() {
//!             panic!("Timed out.");
//!         }
//!     }
//! }
//! ```
//!
//! The message `5` above is inspected first, matches no clause, and is
//! saved; it will be offered again, ahead of newer arrivals, on the next
//! receive pass. Failures cross task boundaries through [`spawn_linked`]:
//! an unhandled error in a linked task terminates the linking task with a
//! structured [`LinkedFailure`].

mod errors;
pub use errors::CourierError;

mod message;
pub use message::*;

mod pattern;
pub use pattern::*;

pub mod mailbox;
pub use mailbox::{Mailbox, Matcher, Receive, Reply, ReplyHandle};

mod actor;
pub use actor::Actor;

pub mod scheduler;

mod links;
pub use links::*;

mod timer;
pub use timer::*;

pub mod token;
