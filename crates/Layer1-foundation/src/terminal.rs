//! Terminal painting backends
//!
//! A backend receives whole frames and redraws them in place. After
//! [`TerminalBackend::finish`] the last frame stays on screen as ordinary
//! output and further text goes through [`TerminalBackend::println`].

use crate::config::DEFAULT_WIDTH;
use crossterm::{cursor, queue, terminal};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// In-place frame painter
pub trait TerminalBackend: Send {
    /// Replace the previously painted frame with `frame`
    fn paint(&mut self, frame: &str) -> io::Result<()>;

    /// Stop painting and leave the last frame in scrollback
    fn finish(&mut self) -> io::Result<()>;

    /// Write a permanent line below the painted region
    fn println(&mut self, line: &str) -> io::Result<()>;

    /// Current terminal width in columns
    fn width(&self) -> usize;
}

// ============================================================================
// Stdout (crossterm)
// ============================================================================

/// Paints to standard output using cursor movement
pub struct StdoutBackend {
    out: io::Stdout,
    previous_lines: usize,
    fixed_width: Option<usize>,
    cursor_hidden: bool,
}

impl StdoutBackend {
    pub fn new() -> Self {
        Self {
            out: io::stdout(),
            previous_lines: 0,
            fixed_width: None,
            cursor_hidden: false,
        }
    }

    pub fn with_width(mut self, width: Option<usize>) -> Self {
        self.fixed_width = width;
        self
    }
}

impl Default for StdoutBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalBackend for StdoutBackend {
    fn paint(&mut self, frame: &str) -> io::Result<()> {
        let mut out = self.out.lock();

        if !self.cursor_hidden {
            queue!(out, cursor::Hide)?;
            self.cursor_hidden = true;
        }
        if self.previous_lines > 0 {
            let up = u16::try_from(self.previous_lines).unwrap_or(u16::MAX);
            queue!(out, cursor::MoveToPreviousLine(up))?;
        }
        queue!(out, terminal::Clear(terminal::ClearType::FromCursorDown))?;

        for line in frame.lines() {
            out.write_all(line.as_bytes())?;
            out.write_all(b"\n")?;
        }
        out.flush()?;

        self.previous_lines = frame.lines().count();
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        let mut out = self.out.lock();
        if self.cursor_hidden {
            queue!(out, cursor::Show)?;
            self.cursor_hidden = false;
        }
        self.previous_lines = 0;
        out.flush()
    }

    fn println(&mut self, line: &str) -> io::Result<()> {
        let mut out = self.out.lock();
        writeln!(out, "{}", line)
    }

    fn width(&self) -> usize {
        self.fixed_width.unwrap_or_else(|| {
            terminal::size()
                .map(|(cols, _)| cols as usize)
                .ok()
                .filter(|cols| *cols > 0)
                .unwrap_or(DEFAULT_WIDTH)
        })
    }
}

impl Drop for StdoutBackend {
    fn drop(&mut self) {
        // 중간에 drop 되더라도 커서는 복구
        if self.cursor_hidden {
            let _ = self.finish();
        }
    }
}

// ============================================================================
// Memory (capture)
// ============================================================================

#[derive(Debug, Default)]
struct Recording {
    frames: Vec<String>,
    lines: Vec<String>,
    finished: bool,
}

/// Records frames and lines instead of writing to a terminal.
///
/// Clones share the same recording, so one clone can be handed to the runner
/// while another is kept for inspection.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    width: usize,
    recording: Arc<Mutex<Recording>>,
}

impl MemoryBackend {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            recording: Arc::new(Mutex::new(Recording::default())),
        }
    }

    /// Every painted frame, oldest first
    pub fn frames(&self) -> Vec<String> {
        self.recording.lock().frames.clone()
    }

    pub fn last_frame(&self) -> Option<String> {
        self.recording.lock().frames.last().cloned()
    }

    pub fn paint_count(&self) -> usize {
        self.recording.lock().frames.len()
    }

    /// Lines written after painting finished
    pub fn lines(&self) -> Vec<String> {
        self.recording.lock().lines.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.recording.lock().finished
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH)
    }
}

impl TerminalBackend for MemoryBackend {
    fn paint(&mut self, frame: &str) -> io::Result<()> {
        self.recording.lock().frames.push(frame.to_string());
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.recording.lock().finished = true;
        Ok(())
    }

    fn println(&mut self, line: &str) -> io::Result<()> {
        self.recording.lock().lines.push(line.to_string());
        Ok(())
    }

    fn width(&self) -> usize {
        self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_shares_recording() {
        let backend = MemoryBackend::new(40);
        let mut handle: Box<dyn TerminalBackend> = Box::new(backend.clone());

        handle.paint("a\nb").unwrap();
        handle.paint("a\nb\nc").unwrap();
        handle.finish().unwrap();
        handle.println("log line").unwrap();

        assert_eq!(backend.paint_count(), 2);
        assert_eq!(backend.last_frame().as_deref(), Some("a\nb\nc"));
        assert_eq!(backend.lines(), vec!["log line".to_string()]);
        assert!(backend.is_finished());
        assert_eq!(handle.width(), 40);
    }

    #[test]
    fn test_stdout_backend_fixed_width() {
        let backend = StdoutBackend::new().with_width(Some(123));
        assert_eq!(backend.width(), 123);
    }
}
