//! Machine Translation Trait
//!
//! 기계 번역 백엔드 추상화. 자격 증명 누락(400), 백엔드 거부(403),
//! 네트워크/타임아웃 실패를 서로 다른 에러로 구분합니다.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::CommandError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MtError {
    #[error("MT API key is not configured")]
    MissingCredential,

    #[error("MT API key was rejected by the backend")]
    InvalidCredential,

    #[error("MT request timed out")]
    Timeout,

    #[error("MT network error: {0}")]
    Network(String),

    #[error("MT backend error: {0}")]
    Backend(String),

    #[error("Failed to parse MT response: {0}")]
    Parse(String),
}

impl MtError {
    /// 자격 증명 문제인지 (사용자에게 그대로 보고)
    pub fn is_credential_error(&self) -> bool {
        matches!(self, MtError::MissingCredential | MtError::InvalidCredential)
    }
}

impl From<reqwest::Error> for MtError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            MtError::Timeout
        } else if error.is_decode() {
            MtError::Parse(error.to_string())
        } else {
            MtError::Network(error.to_string())
        }
    }
}

impl From<MtError> for CommandError {
    fn from(error: MtError) -> Self {
        let code = match error {
            MtError::MissingCredential => "MT_API_KEY_MISSING",
            MtError::InvalidCredential => "MT_API_KEY_INVALID",
            MtError::Timeout | MtError::Network(_) => "MT_UNAVAILABLE",
            MtError::Backend(_) | MtError::Parse(_) => "MT_BACKEND_ERROR",
        };
        CommandError::new(code, error.to_string())
    }
}

#[async_trait]
pub trait MachineTranslator: Send + Sync {
    /// `text`를 `target_lang`으로 번역.
    /// `credential`이 주어지면 백엔드 기본 키 대신 사용합니다.
    async fn translate(
        &self,
        text: &str,
        source_lang: Option<&str>,
        target_lang: &str,
        credential: Option<&str>,
    ) -> Result<String, MtError>;

    fn provider_name(&self) -> &str;
}

/// 언어 코드 정규화 ("es-mx" → "ES-MX", "_" → "-")
pub fn normalize_lang(code: &str) -> String {
    code.trim().replace('_', "-").to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lang() {
        assert_eq!(normalize_lang(" es "), "ES");
        assert_eq!(normalize_lang("pt_br"), "PT-BR");
    }

    #[test]
    fn test_command_error_statuses() {
        assert_eq!(CommandError::from(MtError::MissingCredential).status(), 400);
        assert_eq!(CommandError::from(MtError::InvalidCredential).status(), 403);
        assert_eq!(CommandError::from(MtError::Timeout).code, "MT_UNAVAILABLE");
        assert!(MtError::InvalidCredential.is_credential_error());
        assert!(!MtError::Network("reset".into()).is_credential_error());
    }
}
