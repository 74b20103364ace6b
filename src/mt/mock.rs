//! Mock Translator
//!
//! 네트워크 없이 MT 경로를 검증하기 위한 결정적 번역기

use async_trait::async_trait;

use super::translator::{normalize_lang, MachineTranslator, MtError};

#[derive(Debug, Clone)]
pub enum MockMode {
    /// "hello" → "hello [ES]"
    Suffix,
    /// 항상 주어진 에러 반환
    Fail(MtError),
}

#[derive(Debug, Clone)]
pub struct MockTranslator {
    mode: MockMode,
    require_credential: bool,
}

impl MockTranslator {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            require_credential: false,
        }
    }

    /// 자격 증명이 없으면 `MissingCredential`
    pub fn requiring_credential(mut self) -> Self {
        self.require_credential = true;
        self
    }
}

#[async_trait]
impl MachineTranslator for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        _source_lang: Option<&str>,
        target_lang: &str,
        credential: Option<&str>,
    ) -> Result<String, MtError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        if self.require_credential && credential.map_or(true, |c| c.trim().is_empty()) {
            return Err(MtError::MissingCredential);
        }
        match &self.mode {
            MockMode::Suffix => Ok(format!("{} [{}]", text, normalize_lang(target_lang))),
            MockMode::Fail(error) => Err(error.clone()),
        }
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}
