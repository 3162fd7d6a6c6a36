//! Log capture - redirect host `tracing` output into task transcripts
//!
//! While a runner is active it holds an [`InterceptGuard`]. During that time
//! [`CaptureLayer`] appends every event emitted under an ambient task to that
//! task's transcript, and [`passthrough`] keeps the host's own output layer
//! quiet so nothing is printed over the live tree.
//!
//! Level mapping: `WARN` escalates the ambient task to `Warn`, `ERROR` to
//! `Fail`; `TRACE`/`DEBUG`/`INFO` are captured without touching status.
//! Events emitted outside any task while intercepting are discarded.

use crate::context;
use crate::status::Status;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::filter::FilterFn;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Target of the crate's own diagnostics; never captured into a task
pub const INTERNAL_TARGET: &str = "arbor";

/// Live guards; a runner draining while the next one starts briefly overlaps
static INTERCEPTING: AtomicUsize = AtomicUsize::new(0);

/// Whether host logging is currently redirected
pub fn is_intercepting() -> bool {
    INTERCEPTING.load(Ordering::SeqCst) > 0
}

// ============================================================================
// Intercept Guard (save / restore)
// ============================================================================

/// Redirects host logging for as long as it is alive.
///
/// Host output is restored when the last live guard is dropped, including
/// on failure paths.
#[derive(Debug)]
pub struct InterceptGuard {
    _private: (),
}

impl InterceptGuard {
    pub(crate) fn install() -> Self {
        INTERCEPTING.fetch_add(1, Ordering::SeqCst);
        Self { _private: () }
    }
}

impl Drop for InterceptGuard {
    fn drop(&mut self) {
        INTERCEPTING.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Host filter
// ============================================================================

fn host_output_enabled(_metadata: &Metadata<'_>) -> bool {
    !is_intercepting()
}

/// Per-layer filter for the host's output layer: silent while intercepting.
///
/// ```ignore
/// tracing_subscriber::registry()
///     .with(tracing_subscriber::fmt::layer().with_filter(arbor_task::capture::passthrough()))
///     .with(arbor_task::CaptureLayer::new())
///     .init();
/// ```
pub fn passthrough() -> FilterFn<fn(&Metadata<'_>) -> bool> {
    FilterFn::new(host_output_enabled as fn(&Metadata<'_>) -> bool)
}

// ============================================================================
// Capture Layer
// ============================================================================

/// `tracing` layer that records events into the ambient task's transcript
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureLayer;

impl CaptureLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !is_intercepting() {
            return;
        }
        let metadata = event.metadata();
        if is_internal(metadata.target()) {
            return;
        }
        let Some(task) = context::current() else {
            return;
        };

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        task.add_log(visitor.into_line());

        match *metadata.level() {
            Level::WARN => {
                task.set_status(Status::Warn);
            }
            Level::ERROR => {
                task.set_status(Status::Fail);
            }
            _ => {}
        }
    }
}

const LIBRARY_CRATES: &[&str] = &["arbor_task", "arbor_foundation"];

/// Library diagnostics: the `arbor` target and anything logged from inside
/// the library crates
fn is_internal(target: &str) -> bool {
    target == INTERNAL_TARGET
        || LIBRARY_CRATES.iter().any(|krate| {
            target
                .strip_prefix(krate)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
        })
}

/// Collects the `message` field plus any structured fields
#[derive(Debug, Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl EventVisitor {
    /// `message key=value key=value`
    fn into_line(self) -> String {
        let mut line = self.message.unwrap_or_default();
        for (key, value) in self.fields {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&key);
            line.push('=');
            line.push_str(&value);
        }
        line
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields
                .push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields
                .push((field.name().to_string(), format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visitor_line_format() {
        let visitor = EventVisitor {
            message: Some("copied".to_string()),
            fields: vec![
                ("file".to_string(), "a.txt".to_string()),
                ("bytes".to_string(), "42".to_string()),
            ],
        };
        assert_eq!(visitor.into_line(), "copied file=a.txt bytes=42");
    }

    #[test]
    fn test_internal_targets() {
        assert!(is_internal("arbor"));
        assert!(is_internal("arbor_foundation::config::tree"));
        assert!(is_internal("arbor_task::runner"));
        assert!(!is_internal("arbor_cli::demo"));
        assert!(!is_internal("arbor_taskforce"));
        assert!(!is_internal("arborist"));
        assert!(!is_internal("my_app"));
    }

    #[test]
    fn test_visitor_fields_only() {
        let visitor = EventVisitor {
            message: None,
            fields: vec![("code".to_string(), "7".to_string())],
        };
        assert_eq!(visitor.into_line(), "code=7");
    }
}
