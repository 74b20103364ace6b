//! Reference Resolvers
//!
//! 세그먼트 텍스트에서 성경 구절/약어 저작 인용을 찾아 외부 조회 URL로 변환합니다.
//! 두 resolver 모두 순수 함수이며, 약어 테이블만 외부에서 주입됩니다.

pub mod abbreviations;
pub mod bible_api;
pub mod scripture;
pub mod writings;

use serde::{Deserialize, Serialize};

pub use abbreviations::{AbbreviationCache, AbbreviationTable};
pub use scripture::resolve_scripture;
pub use writings::resolve_writing;

/// 인용 해석 결과 종류
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReferenceKind {
    #[serde(rename = "scripture")]
    Scripture,
    /// 약어 테이블로 해석됨
    #[serde(rename = "resolved")]
    Resolved,
    /// 알 수 없는 제목 → 일반 검색 엔진 질의
    #[serde(rename = "search-fallback")]
    SearchFallback,
    #[serde(rename = "none")]
    None,
}

/// API 기반 렌더러용 첫 구절 좌표
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerseRef {
    /// 정경 순서 1-66
    pub book_id: u8,
    pub chapter: String,
    pub verse: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceMatch {
    pub target_url: Option<String>,
    pub kind: ReferenceKind,
    pub matched_span: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_data: Option<VerseRef>,
}

impl ReferenceMatch {
    /// 매치 없음
    pub fn none() -> Self {
        Self {
            target_url: None,
            kind: ReferenceKind::None,
            matched_span: None,
            api_data: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.kind != ReferenceKind::None
    }
}
