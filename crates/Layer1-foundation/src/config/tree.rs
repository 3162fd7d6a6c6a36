//! Tree Config - 렌더링/세션 설정
//!
//! defaults ← `.arbor/config.json` ← 환경 변수 순서로 병합

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// 설정 디렉토리명
pub const ARBOR_DIR: &str = ".arbor";

/// 설정 파일명
pub const TREE_CONFIG_FILE: &str = "config.json";

/// Terminal width used when nothing better is known
pub const DEFAULT_WIDTH: usize = 80;

// ============================================================================
// Tree Config
// ============================================================================

/// Rendering and session settings for a task tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeConfig {
    /// Delay between a redraw request and the paint (0 = next scheduler yield)
    #[serde(default)]
    pub frame_interval_ms: u64,

    /// Columns of indentation per depth level
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Fixed terminal width; `None` queries the terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,

    /// Emit styling codes
    #[serde(default = "default_true")]
    pub color: bool,

    /// Replay captured transcripts once the tree drains
    #[serde(default = "default_true")]
    pub print_logs: bool,
}

fn default_indent() -> usize {
    2
}

fn default_true() -> bool {
    true
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 0,
            indent: default_indent(),
            width: None,
            color: true,
            print_logs: true,
        }
    }
}

impl TreeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// defaults ← 프로젝트 설정 파일 ← 환경 변수
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        let project_file = Self::project_path();
        if project_file.exists() {
            config = Self::load_from(&project_file)?;
            debug!("Loaded tree config from {}", project_file.display());
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// 특정 파일에서 로드
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: TreeConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// `./.arbor/config.json`
    pub fn project_path() -> PathBuf {
        PathBuf::from(ARBOR_DIR).join(TREE_CONFIG_FILE)
    }

    /// Apply `ARBOR_WIDTH`, `ARBOR_FRAME_INTERVAL_MS` and `NO_COLOR`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(width) = lookup("ARBOR_WIDTH") {
            let width = width
                .trim()
                .parse::<usize>()
                .map_err(|e| Error::Config(format!("ARBOR_WIDTH '{}': {}", width, e)))?;
            self.width = Some(width);
        }

        if let Some(interval) = lookup("ARBOR_FRAME_INTERVAL_MS") {
            self.frame_interval_ms = interval.trim().parse::<u64>().map_err(|e| {
                Error::Config(format!("ARBOR_FRAME_INTERVAL_MS '{}': {}", interval, e))
            })?;
        }

        // https://no-color.org: any non-empty value disables color
        if lookup("NO_COLOR").is_some_and(|v| !v.is_empty()) {
            self.color = false;
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == Some(0) {
            return Err(Error::Config("width must be greater than zero".to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn with_print_logs(mut self, print_logs: bool) -> Self {
        self.print_logs = print_logs;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TreeConfig::default();
        assert_eq!(config.indent, 2);
        assert_eq!(config.frame_interval(), Duration::ZERO);
        assert!(config.color);
        assert!(config.print_logs);
        assert!(config.width.is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TreeConfig = serde_json::from_str(r#"{"width": 100}"#).unwrap();
        assert_eq!(config.width, Some(100));
        assert_eq!(config.indent, 2);
        assert!(config.color);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TREE_CONFIG_FILE);
        std::fs::write(&path, r#"{"frameIntervalMs": 16, "color": false, "printLogs": false}"#)
            .unwrap();

        let config = TreeConfig::load_from(&path).unwrap();
        assert_eq!(config.frame_interval(), Duration::from_millis(16));
        assert!(!config.color);
        assert!(!config.print_logs);
    }

    #[test]
    fn test_load_from_rejects_zero_width() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TREE_CONFIG_FILE);
        std::fs::write(&path, r#"{"width": 0}"#).unwrap();

        assert!(matches!(TreeConfig::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = TreeConfig::default();
        config
            .apply_env(env(&[("ARBOR_WIDTH", "120"), ("NO_COLOR", "1")]))
            .unwrap();
        assert_eq!(config.width, Some(120));
        assert!(!config.color);
    }

    #[test]
    fn test_empty_no_color_keeps_color() {
        let mut config = TreeConfig::default();
        config.apply_env(env(&[("NO_COLOR", "")])).unwrap();
        assert!(config.color);
    }

    #[test]
    fn test_env_invalid_width() {
        let mut config = TreeConfig::default();
        let result = config.apply_env(env(&[("ARBOR_WIDTH", "wide")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
