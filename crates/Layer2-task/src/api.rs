//! Public entry points
//!
//! `run` starts a tracked operation. Without an ambient task it becomes a
//! root of the (lazily created) runner; inside a tracked operation it becomes
//! a child of the ambient task. The setters act on the ambient task and do
//! nothing outside one.

use crate::capture::INTERNAL_TARGET;
use crate::context;
use crate::handle::TaskHandle;
use crate::node::TaskNode;
use crate::runner;
use crate::status::Status;
use arbor_foundation::Error;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::debug;

/// Start `operation` as a tracked task labelled `label`.
///
/// Must be called from within a tokio runtime. The returned handle resolves
/// with the operation's own result; an `Err` marks the task `Fail` and is
/// passed through to whoever awaits the handle.
pub fn run<F, T>(label: impl Into<String>, operation: F) -> TaskHandle<T>
where
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let label = label.into();

    match context::current() {
        Some(parent) => {
            let child = TaskNode::new(label, parent.runner());
            parent.add_child(Arc::clone(&child));
            spawn_tracked(child, operation)
        }
        None => {
            let (runner, root) = runner::attach_root(label);
            let handle = spawn_tracked(Arc::clone(&root), operation);
            tokio::spawn(async move {
                root.wait().await;
                runner.root_done();
            });
            handle
        }
    }
}

/// Like [`run`], but a failure (error or panic) is recorded as the task's
/// message, the task is marked `Skip`, and the handle resolves to `Ok(None)`.
pub fn run_optional<F, T>(label: impl Into<String>, operation: F) -> TaskHandle<Option<T>>
where
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    run(label, async move {
        let failure = match AssertUnwindSafe(operation).catch_unwind().await {
            Ok(Ok(value)) => return Ok(Some(value)),
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };
        set_message(&failure);
        set_status(Status::Skip);
        Ok(None)
    })
}

/// Set the ambient task's message
pub fn set_message(text: &str) {
    if let Some(task) = context::current() {
        task.set_message(text);
    }
}

/// Escalate the ambient task's status
pub fn set_status(status: Status) {
    if let Some(task) = context::current() {
        task.set_status(status);
    }
}

/// Append a line to the ambient task's transcript
pub fn add_log(line: impl Into<String>) {
    if let Some(task) = context::current() {
        task.add_log(line);
    }
}

/// The ambient task, if called inside a tracked operation
pub fn current_task() -> Option<Arc<TaskNode>> {
    context::current()
}

fn spawn_tracked<F, T>(node: Arc<TaskNode>, operation: F) -> TaskHandle<T>
where
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let tracked = Arc::clone(&node);
    let scoped = context::scope(Arc::clone(&node), operation);

    let join = tokio::spawn(async move {
        match AssertUnwindSafe(scoped).catch_unwind().await {
            Ok(Ok(value)) => {
                tracked.settle_ok();
                Ok(value)
            }
            Ok(Err(e)) => {
                let err = Error::Operation(e);
                tracked.settle_err(&err.task_message());
                Err(err)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                debug!(
                    target: INTERNAL_TARGET,
                    task = %tracked.label(),
                    "Operation panicked: {}",
                    message
                );
                tracked.settle_err(&message);
                Err(Error::Panicked(message))
            }
        }
    });

    TaskHandle::new(node, join)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "operation panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(payload.as_ref()), "operation panicked");
    }

    #[test]
    fn test_setters_noop_without_ambient_task() {
        set_message("nobody listens");
        set_status(Status::Fail);
        add_log("dropped");
        assert!(current_task().is_none());
    }
}
