//! # arbor-task
//!
//! Live task-tree rendering for asynchronous work.
//! Tracks a tree of in-flight operations, repaints it in place as statuses
//! change, and replays captured log output once the tree completes.
//!
//! ## Features
//!
//! - Implicit task tree: nested `run` calls become children of the ambient task
//! - Escalation-only statuses with on-demand parent aggregation
//! - Coalesced redraws (at most one paint per scheduler tick)
//! - **`tracing` capture into per-task transcripts while the tree is live**
//! - **Optional tasks whose failures never fail the parent**
//!
//! ## 사용 예시
//!
//! ```ignore
//! let result = arbor_task::run("Build", async {
//!     let compile = arbor_task::run("Compile", async { compile().await });
//!     arbor_task::run_optional("Lint", async { lint().await });
//!     arbor_task::set_message("waiting for compiler");
//!     compile.await?;
//!     Ok(())
//! })
//! .await;
//! ```

pub mod api;
pub mod capture;
pub mod context;
pub mod handle;
pub mod logging;
pub mod node;
pub mod runner;
pub mod status;

// Entry points
pub use api::{add_log, current_task, run, run_optional, set_message, set_status};
pub use handle::TaskHandle;

// Task tree
pub use node::{TaskId, TaskNode, TaskSnapshot};
pub use status::Status;

// Runner / settings
pub use runner::{configure, drained, is_active, set_backend, BackendFactory, Runner};

// Log capture
pub use capture::{is_intercepting, passthrough, CaptureLayer, InterceptGuard};

// Foundation re-exports
pub use arbor_foundation::{
    Error, MemoryBackend, Result, StdoutBackend, TerminalBackend, TreeConfig,
};
