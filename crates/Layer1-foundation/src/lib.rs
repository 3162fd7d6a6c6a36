//! # arbor-foundation
//!
//! Foundation layer for Arbor:
//! - Error: 공통 에러 타입 (`Error`, `Result`)
//! - Config: 렌더링/세션 설정 (`TreeConfig`)
//! - Ansi: 스타일 코드 처리 (paint, strip, visual width, truncate)
//! - Terminal: 프레임 단위 터미널 페인팅 (`TerminalBackend`)

pub mod ansi;
pub mod config;
pub mod error;
pub mod terminal;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{TreeConfig, ARBOR_DIR, DEFAULT_WIDTH, TREE_CONFIG_FILE};

// ============================================================================
// Ansi (스타일)
// ============================================================================
pub use ansi::{longest_common_prefix, paint, strip, truncate, visual_width, Style, ELLIPSIS};

// ============================================================================
// Terminal (페인팅)
// ============================================================================
pub use terminal::{MemoryBackend, StdoutBackend, TerminalBackend};
