//! Task node - one tracked unit of asynchronous work
//!
//! A node owns its children (append-only, creation order), its message and
//! its captured log transcript. Aggregated status is computed on demand by
//! [`TaskNode::update`], never maintained continuously.

use crate::runner::Runner;
use crate::status::Status;
use arbor_foundation::{
    longest_common_prefix, paint, strip, truncate, visual_width, Style, TerminalBackend, ELLIPSIS,
};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::io;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use uuid::Uuid;

/// Unique identifier for a task node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Layout settings shared by every line of one frame
#[derive(Debug, Clone, Copy)]
pub(crate) struct RenderOptions {
    pub indent: usize,
    pub width: usize,
    pub color: bool,
}

#[derive(Debug, Default)]
struct NodeState {
    status: Status,
    message: String,
    /// Common prefix of every message merged so far
    message_prefix: String,
    message_count: usize,
    logs: Vec<String>,
    children: Vec<Arc<TaskNode>>,
    /// The node's own operation has returned (successfully or not)
    own_settled: bool,
    settled_at: Option<DateTime<Utc>>,
}

/// A tracked unit of asynchronous work
pub struct TaskNode {
    id: TaskId,
    label: String,
    runner: Weak<Runner>,
    started_at: DateTime<Utc>,
    state: Mutex<NodeState>,
    settled: watch::Sender<bool>,
}

impl TaskNode {
    pub(crate) fn new(label: impl Into<String>, runner: Weak<Runner>) -> Arc<Self> {
        let (settled, _) = watch::channel(false);
        Arc::new(Self {
            id: TaskId::new(),
            label: label.into(),
            runner,
            started_at: Utc::now(),
            state: Mutex::new(NodeState::default()),
            settled,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn status(&self) -> Status {
        self.state.lock().status
    }

    pub fn message(&self) -> String {
        self.state.lock().message.clone()
    }

    /// Number of messages merged into [`TaskNode::message`]
    pub fn message_count(&self) -> usize {
        self.state.lock().message_count
    }

    pub fn logs(&self) -> Vec<String> {
        self.state.lock().logs.clone()
    }

    /// Snapshot of the child list, in creation order
    pub fn children(&self) -> Vec<Arc<TaskNode>> {
        self.state.lock().children.clone()
    }

    /// Whether the node's own operation has returned
    pub fn is_settled(&self) -> bool {
        self.state.lock().own_settled
    }

    pub(crate) fn runner(&self) -> Weak<Runner> {
        self.runner.clone()
    }

    fn request_rerender(&self) {
        if let Some(runner) = self.runner.upgrade() {
            runner.request_rerender();
        }
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Escalate the status. Returns whether it changed.
    pub fn set_status(&self, status: Status) -> bool {
        let changed = {
            let mut state = self.state.lock();
            let next = state.status.escalate(status);
            let changed = next != state.status;
            state.status = next;
            changed
        };
        if changed {
            self.request_rerender();
        }
        changed
    }

    /// Store a message, compressing repeats to `{common prefix}… [{count}]`.
    pub fn set_message(&self, text: &str) {
        let text = strip(text);
        {
            let mut state = self.state.lock();
            state.message_count += 1;
            if state.message_count == 1 {
                state.message_prefix = text.clone();
                state.message = text;
            } else {
                let prefix = longest_common_prefix(&state.message_prefix, &text).to_string();
                state.message = format!("{}{} [{}]", prefix, ELLIPSIS, state.message_count);
                state.message_prefix = prefix;
            }
        }
        self.request_rerender();
    }

    /// Append a line to the private transcript
    pub fn add_log(&self, line: impl Into<String>) {
        self.state.lock().logs.push(line.into());
    }

    pub(crate) fn add_child(&self, child: Arc<TaskNode>) {
        self.state.lock().children.push(child);
        self.request_rerender();
    }

    /// The node's own operation succeeded
    pub(crate) fn settle_ok(&self) {
        {
            let mut state = self.state.lock();
            state.own_settled = true;
            state.settled_at = Some(Utc::now());
        }
        self.settled.send_replace(true);
        self.refresh();
        self.request_rerender();
    }

    /// The node's own operation failed; `message` replaces any stored message
    pub(crate) fn settle_err(&self, message: &str) {
        {
            let mut state = self.state.lock();
            state.own_settled = true;
            state.settled_at = Some(Utc::now());
            state.status = state.status.escalate(Status::Fail);
            state.message = strip(message);
            state.message_prefix = state.message.clone();
            state.message_count = 1;
        }
        self.settled.send_replace(true);
        self.request_rerender();
    }

    // ========================================================================
    // Aggregation
    // ========================================================================

    /// Recompute status for the whole subtree, children first
    pub fn update(&self) {
        for child in self.children() {
            child.update();
        }
        self.refresh();
    }

    /// Recompute this node's status from its children's current statuses.
    ///
    /// Any failed child escalates to `Fail`, any warning child to `Warn`.
    /// `Done` needs the node's own operation settled and no pending child.
    fn refresh(&self) {
        let statuses: Vec<Status> = self.children().iter().map(|c| c.status()).collect();
        let any_fail = statuses.contains(&Status::Fail);
        let any_warn = statuses.contains(&Status::Warn);
        let any_pending = statuses.contains(&Status::Pending);

        let mut state = self.state.lock();
        if any_fail {
            state.status = state.status.escalate(Status::Fail);
        } else if any_warn {
            state.status = state.status.escalate(Status::Warn);
        }
        if state.own_settled && !any_pending {
            state.status = state.status.escalate(Status::Done);
        }
    }

    /// Resolves once the own operation settled and every child's `wait`
    /// resolved. Children appended while waiting are picked up too.
    pub fn wait(self: Arc<Self>) -> BoxFuture<'static, ()> {
        async move {
            let mut settled = self.settled.subscribe();
            let _ = settled.wait_for(|done| *done).await;

            let mut index = 0;
            loop {
                let child = self.state.lock().children.get(index).cloned();
                match child {
                    Some(child) => {
                        child.wait().await;
                        index += 1;
                    }
                    None => break,
                }
            }

            self.refresh();
        }
        .boxed()
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Widest indentation + label over this subtree
    pub(crate) fn compute_width(&self, depth: usize, indent: usize) -> usize {
        let own = depth * indent + visual_width(&self.label);
        self.children()
            .iter()
            .map(|child| child.compute_width(depth + 1, indent))
            .fold(own, usize::max)
    }

    /// Render this node and its subtree, one line per node
    pub(crate) fn render(
        &self,
        depth: usize,
        column_width: usize,
        options: &RenderOptions,
        out: &mut Vec<String>,
    ) {
        let (status, message) = {
            let state = self.state.lock();
            (state.status, state.message.clone())
        };

        let indent = " ".repeat(depth * options.indent);
        let used = depth * options.indent + visual_width(&self.label);
        let pad = " ".repeat(column_width.saturating_sub(used));
        let rails = "│ ".repeat(depth);

        let mut line = format!(
            "{}{}{} {}[{}]",
            indent,
            self.label,
            pad,
            paint(&rails, Style::Dim, options.color),
            status.marker(options.color)
        );
        if !message.is_empty() {
            line.push(' ');
            line.push_str(&message.replace(['\n', '\r'], " "));
        }

        out.push(truncate(&line, options.width));

        for child in self.children() {
            child.render(depth + 1, column_width, options, out);
        }
    }

    /// Replay captured logs for this subtree, depth-first
    pub(crate) fn print_logs(
        &self,
        terminal: &mut dyn TerminalBackend,
        width: usize,
        color: bool,
    ) -> io::Result<()> {
        let logs = self.logs();
        if !logs.is_empty() {
            terminal.println(&log_header(&self.label, logs.len(), width, color))?;
            for line in &logs {
                terminal.println(line)?;
            }
        }

        for child in self.children() {
            child.print_logs(terminal, width, color)?;
        }
        Ok(())
    }

    /// Serializable copy of the subtree
    pub fn snapshot(&self) -> TaskSnapshot {
        let (status, message, logs, settled_at) = {
            let state = self.state.lock();
            (
                state.status,
                state.message.clone(),
                state.logs.clone(),
                state.settled_at,
            )
        };

        TaskSnapshot {
            id: self.id,
            label: self.label.clone(),
            status,
            message,
            logs,
            started_at: self.started_at,
            elapsed_ms: settled_at.map(|end| (end - self.started_at).num_milliseconds()),
            children: self.children().iter().map(|c| c.snapshot()).collect(),
        }
    }
}

impl std::fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TaskNode")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("status", &state.status)
            .field("message", &state.message)
            .field("children", &state.children.len())
            .finish()
    }
}

/// Centered transcript header: `──── label (n lines) ────`
fn log_header(label: &str, count: usize, width: usize, color: bool) -> String {
    let noun = if count == 1 { "line" } else { "lines" };
    let title = format!(" {} ({} {}) ", label, count, noun);
    let available = width.saturating_sub(visual_width(&title));
    // odd remainders are dropped, not split
    let rule = "─".repeat(available / 2);
    format!(
        "{}{}{}",
        paint(&rule, Style::Dim, color),
        paint(&title, Style::Bold, color),
        paint(&rule, Style::Dim, color)
    )
}

/// Serializable view of a task subtree
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub label: String,
    pub status: Status,
    pub message: String,
    pub logs: Vec<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<i64>,
    pub children: Vec<TaskSnapshot>,
}
