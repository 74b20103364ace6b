//! Abbreviated-Work Reference Resolver
//!
//! 지원 형식:
//! - `Christian Education, 21.1` / `Christian Education, p. 21.1`
//! - `CE 21.1`
//! - `(Christian Education, p. 21.1)` / `{CE 21.1}`
//!
//! 참조 번호는 반드시 `숫자.숫자` (선택적으로 `숫자:숫자.숫자`) 형식입니다.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{AbbreviationTable, ReferenceKind, ReferenceMatch};

const WRITINGS_SEARCH_URL: &str = "https://m.egwwritings.org/en/search?query=";
const WEB_SEARCH_URL: &str = "https://www.google.com/search?q=";
/// 일반 검색 시 결과를 좁히기 위한 고정 키워드
const SEARCH_DISAMBIGUATOR: &str = "Ellen+White";

static WRAPPER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\(\[\{]|[\)\]\}]$").expect("wrapper regex"));

/// 약어 + 참조 (`CE 21.1`)
static ABBREVIATED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([1-9]?[A-Z][A-Za-z]*)\s+(\d+\.\d+)").expect("abbreviated regex"));

/// 전체 제목 + 참조 (`Christian Education, p. 21.1`)
static TITLED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z][a-zA-Z\s]+?)(?:,\s*|\s+)(?:p\.|pp\.|page|vol\.\s*\d+)?\s*(\d+(?::\d+)?\.\d+)")
        .expect("titled regex")
});

fn encode_words(text: &str) -> String {
    text.split_whitespace()
        .map(|word| urlencoding::encode(word).into_owned())
        .collect::<Vec<_>>()
        .join("+")
}

fn resolved(abbreviation: &str, reference: &str, span: &str) -> ReferenceMatch {
    ReferenceMatch {
        target_url: Some(format!(
            "{}{}+{}",
            WRITINGS_SEARCH_URL,
            encode_words(abbreviation),
            urlencoding::encode(reference)
        )),
        kind: ReferenceKind::Resolved,
        matched_span: Some(span.to_string()),
        api_data: None,
    }
}

/// 약어 저작 인용 해석
pub fn resolve_writing(text: &str, table: &AbbreviationTable) -> ReferenceMatch {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ReferenceMatch::none();
    }

    let clean = WRAPPER_RE.replace_all(trimmed, "");
    let clean = clean.trim();

    // 1. 이미 알려진 약어가 그대로 쓰인 경우
    if let Some(caps) = ABBREVIATED_RE.captures(clean) {
        let token = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let reference = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        if table.is_abbreviation(token) {
            let span = caps.get(0).map(|m| m.as_str()).unwrap_or("");
            return resolved(token, reference, span);
        }
    }

    // 2. 전체 제목 + 참조
    let Some(caps) = TITLED_RE.captures(clean) else {
        return ReferenceMatch::none();
    };
    let raw_title = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
    let reference = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let span = caps.get(0).map(|m| m.as_str()).unwrap_or("");

    if let Some(abbreviation) = table.abbreviation_for(raw_title) {
        return resolved(abbreviation, reference, span);
    }
    if table.is_abbreviation(raw_title) {
        return resolved(raw_title, reference, span);
    }

    // 3. 알 수 없는 제목 → 일반 검색 질의
    ReferenceMatch {
        target_url: Some(format!(
            "{}{}+{}+{}",
            WEB_SEARCH_URL,
            encode_words(raw_title),
            urlencoding::encode(reference),
            SEARCH_DISAMBIGUATOR
        )),
        kind: ReferenceKind::SearchFallback,
        matched_span: Some(span.to_string()),
        api_data: None,
    }
}
