//! Runner - render scheduler, log interception and session lifecycle
//!
//! ```text
//! idle ──first top-level run──▶ active ──last root settled──▶ draining ──▶ idle
//! ```
//!
//! Exactly one runner is active per process. A top-level `run` while one is
//! active becomes another root of that runner. Redraw requests are coalesced:
//! the first request schedules one paint on a later scheduler tick and every
//! request before that paint is absorbed by it.

use crate::capture::{InterceptGuard, INTERNAL_TARGET};
use crate::node::{RenderOptions, TaskNode};
use arbor_foundation::{StdoutBackend, TerminalBackend, TreeConfig};
use parking_lot::{Mutex, RwLock};
use std::io;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Creates the painting backend for a new runner
pub type BackendFactory = Arc<dyn Fn(&TreeConfig) -> Box<dyn TerminalBackend> + Send + Sync>;

// ============================================================================
// Settings (프로세스 전역)
// ============================================================================

#[derive(Clone)]
struct Settings {
    config: TreeConfig,
    backend: BackendFactory,
}

impl Settings {
    fn load() -> Self {
        let config = TreeConfig::load().unwrap_or_else(|e| {
            warn!(target: INTERNAL_TARGET, "Failed to load tree config: {}", e);
            TreeConfig::default()
        });
        Self {
            config,
            backend: default_backend(),
        }
    }
}

fn default_backend() -> BackendFactory {
    Arc::new(|config: &TreeConfig| {
        Box::new(StdoutBackend::new().with_width(config.width)) as Box<dyn TerminalBackend>
    })
}

static SETTINGS: RwLock<Option<Settings>> = parking_lot::const_rwlock(None);

static ACTIVE: Mutex<Option<Arc<Runner>>> = parking_lot::const_mutex(None);

fn settings() -> Settings {
    if let Some(settings) = SETTINGS.read().as_ref() {
        return settings.clone();
    }
    SETTINGS.write().get_or_insert_with(Settings::load).clone()
}

/// Replace the configuration used by runners created from now on
pub fn configure(config: TreeConfig) {
    let mut slot = SETTINGS.write();
    match slot.as_mut() {
        Some(settings) => settings.config = config,
        None => {
            *slot = Some(Settings {
                config,
                backend: default_backend(),
            })
        }
    }
}

/// Replace the painting backend used by runners created from now on
pub fn set_backend<F>(factory: F)
where
    F: Fn(&TreeConfig) -> Box<dyn TerminalBackend> + Send + Sync + 'static,
{
    let backend: BackendFactory = Arc::new(factory);
    let mut slot = SETTINGS.write();
    match slot.as_mut() {
        Some(settings) => settings.backend = backend,
        None => {
            *slot = Some(Settings {
                config: TreeConfig::load().unwrap_or_default(),
                backend,
            })
        }
    }
}

/// Whether a runner session is currently active
pub fn is_active() -> bool {
    ACTIVE.lock().is_some()
}

/// Resolves once the runner that owns `task` has painted its final frame and
/// replayed its transcripts.
pub async fn drained(task: &TaskNode) {
    let Some(runner) = task.runner().upgrade() else {
        return;
    };
    let mut done = runner.drained.subscribe();
    let _ = done.wait_for(|drained| *drained).await;
}

// ============================================================================
// Runner
// ============================================================================

struct RunnerState {
    roots: Vec<Arc<TaskNode>>,
    settled_roots: usize,
    /// Scheduled, not yet started, redraw
    redraw: Option<JoinHandle<()>>,
    draining: bool,
    intercept: Option<InterceptGuard>,
}

/// One rendering/logging session over a set of root tasks
pub struct Runner {
    config: TreeConfig,
    state: Mutex<RunnerState>,
    terminal: Mutex<Box<dyn TerminalBackend>>,
    drained: watch::Sender<bool>,
    weak_self: Weak<Runner>,
}

impl Runner {
    fn start(settings: Settings) -> Arc<Self> {
        let terminal = (settings.backend)(&settings.config);
        debug!(target: INTERNAL_TARGET, "Task runner started");

        let intercept = InterceptGuard::install();
        let (drained, _) = watch::channel(false);
        Arc::new_cyclic(|weak_self| Self {
            config: settings.config,
            state: Mutex::new(RunnerState {
                roots: Vec::new(),
                settled_roots: 0,
                redraw: None,
                draining: false,
                intercept: Some(intercept),
            }),
            terminal: Mutex::new(terminal),
            drained,
            weak_self: weak_self.clone(),
        })
    }

    /// Roots registered so far, in registration order
    pub fn roots(&self) -> Vec<Arc<TaskNode>> {
        self.state.lock().roots.clone()
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Schedule one paint for a later scheduler tick unless one is pending
    pub fn request_rerender(&self) {
        let mut state = self.state.lock();
        if state.draining || state.redraw.is_some() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let Some(runner) = self.weak_self.upgrade() else {
            return;
        };

        let interval = self.config.frame_interval();
        state.redraw = Some(handle.spawn(async move {
            if interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(interval).await;
            }
            runner.redraw();
        }));
    }

    fn redraw(&self) {
        let mut terminal = self.terminal.lock();
        let roots = {
            let mut state = self.state.lock();
            state.redraw = None;
            if state.draining {
                return;
            }
            state.roots.clone()
        };

        let frame = self.render_frame(&roots, self.width(terminal.as_ref()));
        if let Err(e) = terminal.paint(&frame) {
            warn!(target: INTERNAL_TARGET, "Failed to paint task tree: {}", e);
        }
    }

    fn width(&self, terminal: &dyn TerminalBackend) -> usize {
        self.config.width.unwrap_or_else(|| terminal.width())
    }

    /// Update every root, then render all of them against one shared column
    fn render_frame(&self, roots: &[Arc<TaskNode>], width: usize) -> String {
        for root in roots {
            root.update();
        }

        let indent = self.config.indent;
        let column = roots
            .iter()
            .map(|root| root.compute_width(0, indent))
            .max()
            .unwrap_or(0);

        let options = RenderOptions {
            indent,
            width,
            color: self.config.color,
        };
        let mut lines = Vec::new();
        for root in roots {
            root.render(0, column, &options, &mut lines);
        }
        lines.join("\n")
    }

    /// A root and its whole subtree settled
    pub(crate) fn root_done(&self) {
        let finished = {
            let mut active = ACTIVE.lock();
            let mut state = self.state.lock();
            state.settled_roots += 1;
            if state.settled_roots < state.roots.len() {
                false
            } else {
                state.draining = true;
                let is_current = active
                    .as_ref()
                    .is_some_and(|runner| std::ptr::eq(Arc::as_ptr(runner), self));
                if is_current {
                    *active = None;
                }
                true
            }
        };

        if finished {
            self.all_done();
        }
    }

    /// Final paint, restore logging, replay transcripts
    fn all_done(&self) {
        let (roots, redraw, intercept) = {
            let mut state = self.state.lock();
            (
                state.roots.clone(),
                state.redraw.take(),
                state.intercept.take(),
            )
        };
        if let Some(redraw) = redraw {
            redraw.abort();
        }

        let mut terminal = self.terminal.lock();
        let width = self.width(terminal.as_ref());

        let frame = self.render_frame(&roots, width);
        let painted = terminal.paint(&frame).and_then(|_| terminal.finish());

        // 로그 출력 전에 반드시 복구
        drop(intercept);

        if let Err(e) = painted {
            warn!(target: INTERNAL_TARGET, "Failed to paint final task tree: {}", e);
        }
        if let Err(e) = self.flush_logs(terminal.as_mut(), &roots, width) {
            warn!(target: INTERNAL_TARGET, "Failed to print task logs: {}", e);
        }

        debug!(target: INTERNAL_TARGET, roots = roots.len(), "Task runner drained");
        drop(terminal);
        self.drained.send_replace(true);
    }

    fn flush_logs(
        &self,
        terminal: &mut dyn TerminalBackend,
        roots: &[Arc<TaskNode>],
        width: usize,
    ) -> io::Result<()> {
        if self.config.print_logs {
            for root in roots {
                root.print_logs(terminal, width, self.config.color)?;
            }
        }
        terminal.println("")
    }
}

/// Register a new root, creating the runner if none is active
pub(crate) fn attach_root(label: String) -> (Arc<Runner>, Arc<TaskNode>) {
    let (runner, root) = {
        let mut active = ACTIVE.lock();
        let runner = match active.as_ref() {
            Some(runner) => Arc::clone(runner),
            None => {
                let runner = Runner::start(settings());
                *active = Some(Arc::clone(&runner));
                runner
            }
        };
        let root = TaskNode::new(label, Arc::downgrade(&runner));
        runner.state.lock().roots.push(Arc::clone(&root));
        (runner, root)
    };

    runner.request_rerender();
    (runner, root)
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Runner")
            .field("roots", &state.roots.len())
            .field("settled_roots", &state.settled_roots)
            .field("draining", &state.draining)
            .finish()
    }
}
