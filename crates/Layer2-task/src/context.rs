//! Ambient task context
//!
//! The node of the operation currently executing is bound with a tokio
//! task-local, so it stays current across every `.await` inside that
//! operation. A bare `tokio::spawn` from inside an operation does not inherit
//! it; use [`crate::run`] to start tracked sub-work instead.

use crate::node::TaskNode;
use std::future::Future;
use std::sync::Arc;

tokio::task_local! {
    static CURRENT_TASK: Arc<TaskNode>;
}

/// The task whose operation is executing right now, if any
pub fn current() -> Option<Arc<TaskNode>> {
    CURRENT_TASK.try_with(Arc::clone).ok()
}

/// Run `future` with `node` as the ambient task for its whole extent.
///
/// The previous ambient task (or none) is visible again once the returned
/// future completes.
pub fn scope<F>(node: Arc<TaskNode>, future: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    CURRENT_TASK.scope(node, future)
}

/// Synchronous variant of [`scope`]
pub fn sync_scope<F, R>(node: Arc<TaskNode>, f: F) -> R
where
    F: FnOnce() -> R,
{
    CURRENT_TASK.sync_scope(node, f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Weak;

    #[test]
    fn test_no_ambient_task_outside_scope() {
        assert!(current().is_none());
    }

    #[test]
    fn test_nested_scopes_restore_outer() {
        let outer = TaskNode::new("outer", Weak::new());
        let inner = TaskNode::new("inner", Weak::new());

        sync_scope(outer.clone(), || {
            assert_eq!(current().unwrap().id(), outer.id());
            sync_scope(inner.clone(), || {
                assert_eq!(current().unwrap().id(), inner.id());
            });
            assert_eq!(current().unwrap().id(), outer.id());
        });
        assert!(current().is_none());
    }

    #[test]
    fn test_scope_survives_await_points() {
        let node = TaskNode::new("async", Weak::new());
        let expected = node.id();

        let seen = tokio_test::block_on(scope(node, async move {
            let before = current().map(|t| t.id());
            tokio::task::yield_now().await;
            let after = current().map(|t| t.id());
            (before, after)
        }));

        assert_eq!(seen, (Some(expected), Some(expected)));
        assert!(current().is_none());
    }
}
