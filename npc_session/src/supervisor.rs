//! Owns a session's background tasks and shuts them down together.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A group of named tasks sharing one cancellation token.
///
/// Tasks are expected to watch the token and return promptly once it fires.
/// Anything still running when the grace period ends is aborted. Dropping
/// the supervisor cancels and aborts everything it still owns.
#[derive(Debug, Default)]
pub struct TaskSupervisor {
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token handed to every supervised task.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::debug!(task = name, "spawning supervised task");
        self.tasks.push((name, tokio::spawn(task)));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancel every task and wait up to `grace` for all of them.
    /// Returns how many had to be aborted.
    pub async fn shutdown(mut self, grace: Duration) -> usize {
        self.cancel.cancel();
        let deadline = Instant::now() + grace;
        let mut aborted = 0;

        for (name, mut handle) in std::mem::take(&mut self.tasks) {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => tracing::debug!(task = name, "task stopped"),
                Ok(Err(err)) => tracing::warn!(task = name, error = %err, "task ended abnormally"),
                Err(_) => {
                    tracing::warn!(task = name, "task did not stop within grace period, aborting");
                    handle.abort();
                    // Wait for the task to be torn down so whatever it owned is gone.
                    let _ = handle.await;
                    aborted += 1;
                }
            }
        }

        aborted
    }
}

impl Drop for TaskSupervisor {
    fn drop(&mut self) {
        self.cancel.cancel();
        for (_, handle) in &self.tasks {
            handle.abort();
        }
    }
}
