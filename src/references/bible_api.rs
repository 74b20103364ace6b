//! Scripture Text API
//!
//! 해석된 구절 좌표로 외부 성경 API에서 본문을 가져옵니다.
//! 모든 실패는 호출자에게 "unavailable" 결과로 전달되며 편집 세션을 막지 않습니다.

use std::time::Duration;

use serde::Serialize;

use super::VerseRef;

/// 외부 조회 결과
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupResult {
    Found { data: serde_json::Value },
    Unavailable { reason: String },
}

impl LookupResult {
    fn unavailable(reason: impl Into<String>) -> Self {
        LookupResult::Unavailable {
            reason: reason.into(),
        }
    }
}

/// bolls.life 형식 API 클라이언트
#[derive(Clone)]
pub struct BibleTextClient {
    client: reqwest::Client,
    base_url: String,
}

impl BibleTextClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 타임아웃이 설정된 전용 클라이언트 생성
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client, base_url))
    }

    pub fn verse_url(&self, translation: &str, verse: &VerseRef) -> String {
        format!(
            "{}/get-verse/{}/{}/{}/{}/",
            self.base_url, translation, verse.book_id, verse.chapter, verse.verse
        )
    }

    pub fn chapter_url(&self, translation: &str, book_id: u8, chapter: &str) -> String {
        format!("{}/get-text/{}/{}/{}/", self.base_url, translation, book_id, chapter)
    }

    /// 단일 구절 본문
    pub async fn fetch_verse(&self, translation: &str, verse: &VerseRef) -> LookupResult {
        self.fetch(&self.verse_url(translation, verse)).await
    }

    /// 장 전체 본문
    pub async fn fetch_chapter(&self, translation: &str, book_id: u8, chapter: &str) -> LookupResult {
        self.fetch(&self.chapter_url(translation, book_id, chapter)).await
    }

    async fn fetch(&self, url: &str) -> LookupResult {
        let resp = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(url, error = %e, timeout = e.is_timeout(), "scripture lookup failed");
                return LookupResult::unavailable(format!("Scripture service request failed: {}", e));
            }
        };

        if !resp.status().is_success() {
            let status = resp.status();
            tracing::warn!(url, status = status.as_u16(), "scripture lookup returned error status");
            return LookupResult::unavailable(format!("Scripture service error: {}", status.as_u16()));
        }

        match resp.json::<serde_json::Value>().await {
            Ok(data) => LookupResult::Found { data },
            Err(e) => {
                tracing::warn!(url, error = %e, "scripture lookup returned unreadable body");
                LookupResult::unavailable(format!("Failed to parse scripture response: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let client = BibleTextClient::new(reqwest::Client::new(), "https://bolls.life/");
        let verse = VerseRef {
            book_id: 43,
            chapter: "3".into(),
            verse: "16".into(),
        };
        assert_eq!(client.verse_url("RV1960", &verse), "https://bolls.life/get-verse/RV1960/43/3/16/");
        assert_eq!(client.chapter_url("KJV", 1, "1"), "https://bolls.life/get-text/KJV/1/1/");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_soft_failure() {
        let client =
            BibleTextClient::with_timeout("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let verse = VerseRef {
            book_id: 1,
            chapter: "1".into(),
            verse: "1".into(),
        };
        let result = client.fetch_verse("KJV", &verse).await;
        assert!(matches!(result, LookupResult::Unavailable { .. }));
    }
}
