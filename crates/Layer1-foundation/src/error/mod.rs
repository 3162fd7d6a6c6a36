//! Error types for Arbor
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Arbor 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Task 관련
    // ========================================================================
    /// The tracked operation returned an error. Displays as the operation's
    /// own message so callers see exactly what the operation reported.
    #[error("{0}")]
    Operation(anyhow::Error),

    #[error("Task panicked: {0}")]
    Panicked(String),

    #[error("Task join error: {0}")]
    Join(String),

    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Operation 자체가 실패했는지 확인 (panic 포함)
    pub fn is_operation_failure(&self) -> bool {
        matches!(self, Error::Operation(_) | Error::Panicked(_))
    }

    /// Unwrap the operation's own error, converting every other variant.
    pub fn into_operation(self) -> anyhow::Error {
        match self {
            Error::Operation(e) => e,
            other => anyhow::Error::new(other),
        }
    }

    /// Message recorded on a failed task node
    pub fn task_message(&self) -> String {
        match self {
            Error::Operation(e) => e.to_string(),
            Error::Panicked(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Operation(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_displays_inner_message() {
        let err = Error::from(anyhow::anyhow!("boom"));
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.task_message(), "boom");
        assert!(err.is_operation_failure());
    }

    #[test]
    fn test_panic_is_operation_failure() {
        let err = Error::Panicked("index out of bounds".to_string());
        assert!(err.is_operation_failure());
        assert_eq!(err.task_message(), "index out of bounds");
        assert_eq!(err.to_string(), "Task panicked: index out of bounds");
    }

    #[test]
    fn test_into_operation_roundtrip() {
        let err = Error::Operation(anyhow::anyhow!("disk full"));
        assert_eq!(err.into_operation().to_string(), "disk full");

        let err = Error::Config("bad width".to_string());
        assert!(!err.is_operation_failure());
        assert_eq!(err.into_operation().to_string(), "Configuration error: bad width");
    }
}
