//! Failure links between tasks.
//!
//! A link is a one-directional relation: once task A links to task B, an
//! abnormal end of B terminates A with a [`LinkedFailure`] wrapping B's
//! identity and error. Normal completion of B does nothing. Bidirectional
//! supervision is two links, one in each direction.

use thiserror::Error;

use crate::{
    errors::CourierError,
    scheduler::{self, Task, TaskHandle, TaskOutcome},
    token::IdToken,
};

/// The structured failure delivered to a linking task when a linked task
/// dies abnormally.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("task://{source_name}#{source_id} failed with {kind}: {message}")]
pub struct LinkedFailure {
    /// The identity token of the failed task.
    pub source_id: IdToken,
    /// The name of the failed task.
    pub source_name: String,
    /// The kind name of the original error.
    pub kind: String,
    /// The rendered original error message.
    pub message: String,
}

impl LinkedFailure {
    /// Wrap a failed task's recorded outcome.
    fn new(source: &TaskHandle, kind: &str, message: &str) -> Self {
        Self {
            source_id: source.id(),
            source_name: source.name().to_owned(),
            kind: kind.to_owned(),
            message: message.to_owned(),
        }
    }
}

/// Link the calling task to `task`: if `task` ends abnormally, the calling
/// task is terminated with a [`LinkedFailure`].
///
/// The failure is mirrored asynchronously, as soon as it is observed, even
/// if `task` has already ended by the time the link is made. Requires the
/// caller to run inside a [`scheduler::spawn`]ed task.
pub fn link_failure(task: &TaskHandle) -> Result<(), CourierError> {
    let observer = scheduler::current().ok_or(CourierError::NoCurrentTask)?;
    let watched = task.clone();

    // Watch from a detached task, so the link outlives the caller's own
    // control flow.
    tokio::spawn(async move {
        if let TaskOutcome::Failed { kind, message } = watched.finished().await {
            logger::debug!("{} failed; terminating linked {}.", watched, observer);
            scheduler::terminate(
                &observer,
                CourierError::Linked(LinkedFailure::new(&watched, kind, message)),
            );
        }
    });

    Ok(())
}

/// Spawn `body` as a new task and link the calling task to it.
///
/// # See Also
///
/// See [`scheduler::spawn`] for the task lifecycle and [`link_failure`] for
/// the link semantics.
pub fn spawn_linked<T, F>(name: impl Into<String>, body: F) -> Result<Task<T>, CourierError>
where
    T: Send + 'static,
    F: std::future::Future<Output = Result<T, CourierError>> + Send + 'static,
{
    let task = scheduler::spawn(name, body);
    link_failure(task.handle())?;

    Ok(task)
}
