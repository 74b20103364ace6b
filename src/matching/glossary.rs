//! Glossary Matching
//!
//! 용어집 부분 문자열 매칭과 필수 용어 QA 검사

use crate::models::GlossaryEntry;
use crate::utils::{contains_whole_word, normalize};

/// 정규화된 용어가 정규화된 원문의 부분 문자열인 엔트리 (입력 순서 유지)
pub fn find_matches<'a>(source_text: &str, entries: &'a [GlossaryEntry]) -> Vec<&'a GlossaryEntry> {
    let haystack = normalize(source_text);
    if haystack.is_empty() {
        return Vec::new();
    }
    entries
        .iter()
        .filter(|entry| {
            let term = normalize(&entry.source_term);
            !term.is_empty() && haystack.contains(&term)
        })
        .collect()
}

/// 원문에 단어 단위로 등장하는 용어 중 번역문에 대상 용어가 빠진 엔트리
pub fn check_required_terms<'a>(
    source_text: &str,
    translation: &str,
    entries: &'a [GlossaryEntry],
) -> Vec<&'a GlossaryEntry> {
    let src_norm = normalize(source_text);
    let trans_norm = normalize(translation);

    entries
        .iter()
        .filter(|entry| {
            let term = normalize(&entry.source_term);
            let required = normalize(&entry.target_term);
            contains_whole_word(&src_norm, &term) && !contains_whole_word(&trans_norm, &required)
        })
        .collect()
}
