//! Task handles and the spawn wrapper.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};

use futures::FutureExt;
use tokio::sync::Notify;

use crate::{
    errors::CourierError,
    token::{self, IdToken},
};

tokio::task_local! {
    /// The handle of the task the current code is running inside.
    static CURRENT_TASK: TaskHandle;
}

/// How a task ended.
#[derive(Clone, Debug, PartialEq)]
pub enum TaskOutcome {
    /// The task ran to completion.
    Completed,
    /// The task returned an error, panicked, or was terminated.
    Failed {
        /// The kind name of the error.
        kind: String,
        /// The rendered error message.
        message: String,
    },
}

impl TaskOutcome {
    fn from_result<T>(result: &Result<T, CourierError>) -> Self {
        match result {
            Ok(_) => Self::Completed,
            Err(err) => Self::Failed {
                kind: err.kind().to_owned(),
                message: err.to_string(),
            },
        }
    }
}

/// The shared lifecycle state of one task.
#[derive(Debug, Default)]
struct TaskState {
    /// An incoming termination, delivered through [`terminate`].
    killed: OnceLock<CourierError>,
    kill_flag: Notify,

    /// The recorded outcome, set exactly once when the task ends.
    outcome: OnceLock<TaskOutcome>,
    done_flag: Notify,
}

/// A cloneable handle to a task spawned through [`spawn`].
///
/// The handle outlives the task: its outcome stays observable after the
/// task has ended, so a link attached late still sees how it went.
#[derive(Clone, Debug)]
pub struct TaskHandle {
    id: IdToken,
    name: Arc<str>,
    state: Arc<TaskState>,
}

impl std::fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task://{}#{}", self.name, self.id)
    }
}

impl TaskHandle {
    fn new(name: impl Into<String>) -> Self {
        Self {
            id: token::generate_token(),
            name: name.into().into(),
            state: Arc::new(TaskState::default()),
        }
    }

    /// The identity token of this task.
    pub fn id(&self) -> IdToken {
        self.id
    }

    /// The name this task was spawned with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The recorded outcome, if the task has ended.
    pub fn outcome(&self) -> Option<&TaskOutcome> {
        self.state.outcome.get()
    }

    /// Wait until the task has ended.
    ///
    /// Returns immediately if it already has.
    pub async fn finished(&self) -> &TaskOutcome {
        loop {
            let notified = self.state.done_flag.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(outcome) = self.state.outcome.get() {
                return outcome;
            }

            notified.await;
        }
    }

    /// Wait for an incoming termination.
    async fn killed(&self) -> CourierError {
        loop {
            let notified = self.state.kill_flag.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(err) = self.state.killed.get() {
                return err.clone();
            }

            notified.await;
        }
    }

    /// Record the task's result and wake anyone waiting on [`finished`].
    ///
    /// [`finished`]: Self::finished
    fn record<T>(&self, result: &Result<T, CourierError>) {
        if self
            .state
            .outcome
            .set(TaskOutcome::from_result(result))
            .is_err()
        {
            logger::warn!("Outcome recorded twice for {}.", self);
        }
        self.state.done_flag.notify_waiters();
    }
}

/// A task spawned through [`spawn`]: its handle plus the join side.
#[derive(Debug)]
pub struct Task<T> {
    handle: TaskHandle,
    join: tokio::task::JoinHandle<Result<T, CourierError>>,
}

impl<T> Task<T> {
    /// The lifecycle handle of this task.
    pub fn handle(&self) -> &TaskHandle {
        &self.handle
    }

    /// Wait for the task and take its result.
    pub async fn join(self) -> Result<T, CourierError> {
        self.join.await.map_err(CourierError::from)?
    }
}

/// Start `body` as a new concurrently scheduled task.
///
/// Inside `body`, [`current`] returns the new task's handle. The task ends
/// with `body`'s result, with [`CourierError::TaskPanicked`] if `body`
/// panics, or with the terminating error if [`terminate`] is called on it
/// first; whichever it is, the outcome is recorded on the handle before any
/// waiter is woken.
pub fn spawn<T, F>(name: impl Into<String>, body: F) -> Task<T>
where
    T: Send + 'static,
    F: std::future::Future<Output = Result<T, CourierError>> + Send + 'static,
{
    let handle = TaskHandle::new(name);
    logger::trace!("Spawning {}...", handle);

    let join = tokio::spawn(CURRENT_TASK.scope(handle.clone(), {
        let handle = handle.clone();
        async move {
            let result = tokio::select! {
                err = handle.killed() => {
                    logger::debug!("{} terminated: {}", handle, err);
                    Err(err)
                },
                caught = AssertUnwindSafe(body).catch_unwind() => match caught {
                    Ok(result) => result,
                    Err(panic) => Err(CourierError::TaskPanicked(panic_message(&panic))),
                },
            };

            handle.record(&result);
            result
        }
    }));

    Task { handle, join }
}

/// Get the handle of the task the calling code runs inside, if it was
/// spawned through [`spawn`].
pub fn current() -> Option<TaskHandle> {
    CURRENT_TASK.try_with(TaskHandle::clone).ok()
}

/// Forcibly end a task with a structured error.
///
/// The task observes the error at its next suspension point and ends with
/// it; its body does not run further. Terminating a task that has already
/// ended, or terminating twice, has no effect.
pub fn terminate(task: &TaskHandle, err: CourierError) {
    if task.state.killed.set(err).is_ok() {
        task.state.kill_flag.notify_waiters();
    }
}

/// Render a panic payload.
fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_owned()
    }
}
