//! Completion handle returned by `run`

use crate::node::TaskNode;
use arbor_foundation::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

/// Resolves with the operation's own result.
///
/// The operation is already running when the handle is returned; dropping
/// the handle does not cancel it. The handle settles as soon as the
/// operation itself returns, independent of any children it started.
pub struct TaskHandle<T> {
    task: Arc<TaskNode>,
    join: JoinHandle<Result<T>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(task: Arc<TaskNode>, join: JoinHandle<Result<T>>) -> Self {
        Self { task, join }
    }

    /// The tracked node
    pub fn task(&self) -> &Arc<TaskNode> {
        &self.task
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.join).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) => Poll::Ready(Err(Error::Join(e.to_string()))),
        }
    }
}

impl<T> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("task", &self.task)
            .field("finished", &self.join.is_finished())
            .finish()
    }
}
