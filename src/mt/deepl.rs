//! DeepL Backend
//!
//! DeepL v2 `/translate` 호환 백엔드. 요청마다 짧은 타임아웃이 걸려 있고,
//! 403 응답은 자격 증명 거부로 분류됩니다.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::translator::{normalize_lang, MachineTranslator, MtError};

pub const DEFAULT_DEEPL_API_URL: &str = "https://api-free.deepl.com/v2/translate";

#[derive(Debug, Deserialize)]
struct DeeplResponse {
    #[serde(default)]
    translations: Vec<DeeplTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeeplTranslation {
    text: String,
}

#[derive(Clone)]
pub struct DeeplTranslator {
    client: reqwest::Client,
    api_url: String,
    /// 요청에 키가 없을 때 사용할 기본 키
    default_key: Option<String>,
}

impl DeeplTranslator {
    pub fn new(api_url: &str, default_key: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            default_key: default_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn resolve_key<'a>(&'a self, credential: Option<&'a str>) -> Result<&'a str, MtError> {
        credential
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .or(self.default_key.as_deref())
            .ok_or(MtError::MissingCredential)
    }
}

#[async_trait]
impl MachineTranslator for DeeplTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: Option<&str>,
        target_lang: &str,
        credential: Option<&str>,
    ) -> Result<String, MtError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        let key = self.resolve_key(credential)?;

        let target = normalize_lang(target_lang);
        let mut form: Vec<(&str, String)> = vec![("text", text.to_string()), ("target_lang", target)];
        if let Some(source) = source_lang.map(normalize_lang).filter(|s| !s.is_empty()) {
            form.push(("source_lang", source));
        }

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("DeepL-Auth-Key {}", key))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(MtError::InvalidCredential);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MtError::Backend(format!("DeepL returned {}: {}", status, body)));
        }

        let parsed: DeeplResponse = response.json().await?;
        parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| MtError::Parse("response has no translations".to_string()))
    }

    fn provider_name(&self) -> &str {
        "deepl"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator(default_key: Option<&str>) -> DeeplTranslator {
        DeeplTranslator::new(
            "http://127.0.0.1:9/v2/translate",
            default_key.map(str::to_string),
            Duration::from_millis(500),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_empty_text_skips_backend() {
        let mt = translator(None);
        assert_eq!(mt.translate("   ", None, "es", None).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_missing_key_is_reported() {
        let mt = translator(Some("  "));
        assert_eq!(
            mt.translate("Hello", Some("en"), "es", None).await,
            Err(MtError::MissingCredential)
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_not_a_credential_error() {
        let mt = translator(Some("key"));
        let err = mt.translate("Hello", Some("en"), "es", None).await.unwrap_err();
        assert!(!err.is_credential_error());
    }

    #[test]
    fn test_request_key_overrides_default() {
        let mt = translator(Some("server"));
        assert_eq!(mt.resolve_key(Some("mine")).unwrap(), "mine");
        assert_eq!(mt.resolve_key(Some("")).unwrap(), "server");
        assert_eq!(mt.resolve_key(None).unwrap(), "server");
    }
}
