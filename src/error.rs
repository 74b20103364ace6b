//! Editor Error Types
//!
//! 애플리케이션 전역 에러 타입 정의

use serde::Serialize;
use thiserror::Error;

/// 에디터 코어 에러
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Paragraph not found: {0}")]
    ParagraphNotFound(String),

    #[error("Segment not found: {0}")]
    SegmentNotFound(String),

    #[error("User {user_id} is not allowed to access project {project_id}")]
    Unauthorized { user_id: i64, project_id: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("No previous segment in this paragraph: {0}")]
    NoPredecessor(String),

    #[error("Failed to acquire database lock")]
    LockPoisoned,
}

impl EditorError {
    /// 응답 코드 문자열
    pub fn code(&self) -> &'static str {
        match self {
            EditorError::Database(_) => "DB_ERROR",
            EditorError::Io(_) => "IO_ERROR",
            EditorError::Serialization(_) => "SERIALIZATION_ERROR",
            EditorError::Csv(_) => "CSV_ERROR",
            EditorError::Spreadsheet(_) => "SPREADSHEET_ERROR",
            EditorError::Http(_) => "HTTP_ERROR",
            EditorError::Document(_) => "DOCUMENT_ERROR",
            EditorError::ProjectNotFound(_) => "PROJECT_NOT_FOUND",
            EditorError::ParagraphNotFound(_) => "PARAGRAPH_NOT_FOUND",
            EditorError::SegmentNotFound(_) => "SEGMENT_NOT_FOUND",
            EditorError::Unauthorized { .. } => "UNAUTHORIZED",
            EditorError::Validation(_) => "INVALID_REQUEST",
            EditorError::NoPredecessor(_) => "NO_PREVIOUS_SEGMENT",
            EditorError::LockPoisoned => "LOCK_ERROR",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EditorError::ProjectNotFound(_)
                | EditorError::ParagraphNotFound(_)
                | EditorError::SegmentNotFound(_)
        )
    }
}

impl<T> From<std::sync::PoisonError<T>> for EditorError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        EditorError::LockPoisoned
    }
}

/// 명령 응답용 직렬화 가능한 에러
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl CommandError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    /// HTTP 상태 코드 대응값
    pub fn status(&self) -> u16 {
        match self.code.as_str() {
            "INVALID_REQUEST" | "NO_PREVIOUS_SEGMENT" | "MT_API_KEY_MISSING" => 400,
            "UNAUTHORIZED" | "MT_API_KEY_INVALID" => 403,
            "PROJECT_NOT_FOUND" | "PARAGRAPH_NOT_FOUND" | "SEGMENT_NOT_FOUND" => 404,
            _ => 500,
        }
    }
}

impl From<EditorError> for CommandError {
    fn from(error: EditorError) -> Self {
        CommandError {
            code: error.code().to_string(),
            message: error.to_string(),
            details: None,
        }
    }
}

/// 명령 결과 타입
pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_and_unauthorized_are_distinct() {
        let missing: CommandError = EditorError::SegmentNotFound("s1".into()).into();
        let denied: CommandError = EditorError::Unauthorized {
            user_id: 7,
            project_id: "p1".into(),
        }
        .into();

        assert_eq!(missing.code, "SEGMENT_NOT_FOUND");
        assert_eq!(missing.status(), 404);
        assert_eq!(denied.code, "UNAUTHORIZED");
        assert_eq!(denied.status(), 403);
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err: CommandError = EditorError::Validation("bad display id".into()).into();
        assert_eq!(err.status(), 400);
        assert!(err.message.contains("bad display id"));
    }
}
