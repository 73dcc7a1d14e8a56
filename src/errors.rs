//! Error types.
//!

use thiserror::Error;

use crate::links::LinkedFailure;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CourierError {
    #[error("A timeout duration has already been declared for this receive pass.")]
    TimeoutAlreadyDeclared,
    #[error("respond() was called before any clause matched the message.")]
    RespondWithoutMatch,
    #[error("A reply value has already been staged for this message.")]
    ReplyAlreadySet,
    #[error("Timed out waiting for a reply after {0:?}.")]
    ReplyTimedOut(std::time::Duration),
    #[error("No task context available; not running inside a scheduler task.")]
    NoCurrentTask,
    #[error("Linked task failed: {0}")]
    Linked(#[from] LinkedFailure),
    #[error("Task panicked: {0}")]
    TaskPanicked(String),
    #[error("Task exeuction error: {0}")]
    TaskExecutionError(String),
    #[error("Tokio error: {0}")]
    Join(String),
}

impl From<tokio::task::JoinError> for CourierError {
    /// [`tokio::task::JoinError`] is not [`Clone`], so only its rendering is
    /// kept.
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err.to_string())
    }
}

macro_rules! expand_kinds {
    ($($variant:ident),*$(,)?) => {
        impl CourierError {
            /// Get the name of the kind of error, as reported in task
            /// outcomes and [`LinkedFailure`]s.
            pub const fn kind(&self) -> &'static str {
                match self {
                    $(Self::$variant { .. } => stringify!($variant),)*
                }
            }
        }
    }
}

expand_kinds!(
    TimeoutAlreadyDeclared,
    RespondWithoutMatch,
    ReplyAlreadySet,
    ReplyTimedOut,
    NoCurrentTask,
    Linked,
    TaskPanicked,
    TaskExecutionError,
    Join,
);
