//! Generation of identity tokens for tasks and actors.
//!

use rand::Rng;

/// An identity token.
pub type IdToken = u64;

/// Generate a random identity token.
pub fn generate_token() -> IdToken {
    rand::thread_rng().gen_range(1..u64::MAX)
}
