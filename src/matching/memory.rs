//! Translation Memory Lookup
//!
//! 정규화된 원문 기준 정확/퍼지 조회. 후보 집합은 저장소가 소유자·언어쌍 범위로 공급합니다.

use serde::Serialize;

use crate::matching::sequence::SequenceMatcher;
use crate::models::TmEntry;
use crate::utils::normalize;

/// 기본 퍼지 임계값
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.75;

/// 질의 대비 길이 차이가 이 비율을 넘는 후보는 건너뜀
const MAX_LENGTH_DRIFT: f64 = 0.4;

/// 이 점수를 넘으면 즉시 탐색 종료
const NEAR_PERFECT: f64 = 0.99;

/// 퍼지 조회 결과. 매치가 없으면 `(None, 0)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FuzzyMatch {
    pub target: Option<String>,
    /// 0-100 정수 백분율 (버림)
    pub score: u8,
}

impl FuzzyMatch {
    pub fn none() -> Self {
        Self { target: None, score: 0 }
    }

    pub fn is_match(&self) -> bool {
        self.target.is_some()
    }
}

/// 정규화 원문이 정확히 일치하는 엔트리의 번역문
pub fn lookup_exact<'a>(source: &str, candidates: &'a [TmEntry]) -> Option<&'a str> {
    let key = normalize(source);
    if key.is_empty() {
        return None;
    }
    candidates
        .iter()
        .find(|entry| entry.source_norm == key)
        .map(|entry| entry.target_text.as_str())
}

/// 유사도 기반 퍼지 조회
///
/// 1. 길이 차이 40% 초과 후보 제외
/// 2. quick ratio 상한값이 임계값 미만이면 제외
/// 3. 전체 ratio 계산 후 최고점 유지, 0.99 초과 시 즉시 종료
pub fn lookup_fuzzy(source: &str, candidates: &[TmEntry], threshold: f64) -> FuzzyMatch {
    let query = normalize(source);
    if query.is_empty() {
        return FuzzyMatch::none();
    }
    let query_len = query.chars().count() as f64;

    let mut matcher = SequenceMatcher::new(&query, "");
    let mut best: Option<&TmEntry> = None;
    let mut best_score = 0.0_f64;

    for entry in candidates {
        let candidate_len = entry.source_norm.chars().count() as f64;
        if (candidate_len - query_len).abs() / query_len > MAX_LENGTH_DRIFT {
            continue;
        }

        matcher.set_second(&entry.source_norm);
        if matcher.quick_ratio() < threshold {
            continue;
        }

        let score = matcher.ratio();
        if score > best_score && score >= threshold {
            best_score = score;
            best = Some(entry);
            if best_score > NEAR_PERFECT {
                break;
            }
        }
    }

    match best {
        Some(entry) => FuzzyMatch {
            target: Some(entry.target_text.clone()),
            score: (best_score * 100.0) as u8,
        },
        None => FuzzyMatch::none(),
    }
}

/// 정확 일치 우선, 없으면 퍼지 조회
pub fn lookup_best(source: &str, candidates: &[TmEntry], threshold: f64) -> FuzzyMatch {
    match lookup_exact(source, candidates) {
        Some(target) => FuzzyMatch {
            target: Some(target.to_string()),
            score: 100,
        },
        None => lookup_fuzzy(source, candidates, threshold),
    }
}

/// 용어 검색(concordance): 정규화 원문에 질의가 포함된 엔트리
pub fn concordance<'a>(query: &str, candidates: &'a [TmEntry]) -> Vec<&'a TmEntry> {
    let needle = normalize(query);
    if needle.is_empty() {
        return Vec::new();
    }
    candidates
        .iter()
        .filter(|entry| entry.source_norm.contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str, target: &str) -> TmEntry {
        TmEntry {
            id: source.to_string(),
            owner_id: 1,
            lang_pair: "EN-ES".into(),
            source_norm: normalize(source),
            source_text: source.to_string(),
            target_text: target.to_string(),
            updated_at: 0,
        }
    }

    #[test]
    fn test_exact_lookup_uses_normalized_key() {
        let tm = vec![entry("The Lord is my shepherd", "Jehová es mi pastor")];
        assert_eq!(
            lookup_exact("  the LORD is   my shepherd ", &tm),
            Some("Jehová es mi pastor")
        );
        assert_eq!(lookup_exact("the lord", &tm), None);
        assert_eq!(lookup_exact("   ", &tm), None);
    }

    #[test]
    fn test_fuzzy_exact_match_scores_100() {
        let tm = vec![entry("In the beginning", "En el principio")];
        let m = lookup_fuzzy("in the   beginning", &tm, DEFAULT_FUZZY_THRESHOLD);
        assert_eq!(m.target.as_deref(), Some("En el principio"));
        assert_eq!(m.score, 100);
    }

    #[test]
    fn test_fuzzy_near_match_score_truncated() {
        let tm = vec![entry("the quick brown fox", "el rápido zorro marrón")];
        let m = lookup_fuzzy("the quick brown fax", &tm, DEFAULT_FUZZY_THRESHOLD);
        assert_eq!(m.target.as_deref(), Some("el rápido zorro marrón"));
        assert_eq!(m.score, 94);
    }

    #[test]
    fn test_fuzzy_below_threshold_is_none_sentinel() {
        let tm = vec![entry("completely different words", "x")];
        let m = lookup_fuzzy("nothing alike at all here", &tm, DEFAULT_FUZZY_THRESHOLD);
        assert_eq!(m, FuzzyMatch::none());
    }

    #[test]
    fn test_fuzzy_skips_candidates_with_large_length_drift() {
        // 매우 긴 후보는 포함 관계여도 길이 필터에서 제외
        let tm = vec![entry("grace and peace to you from god our father and the lord", "x")];
        let m = lookup_fuzzy("grace and peace", &tm, 0.1);
        assert!(!m.is_match());
    }

    #[test]
    fn test_fuzzy_keeps_best_and_first_on_ties() {
        let tm = vec![
            entry("blessed are the meek", "first"),
            entry("blessed are the meek", "second"),
            entry("blessed are the weak", "weaker"),
        ];
        let m = lookup_fuzzy("blessed are the meek.", &tm, 0.5);
        assert_eq!(m.target.as_deref(), Some("first"));
    }

    #[test]
    fn test_fuzzy_never_below_threshold() {
        let tm = vec![
            entry("he who has ears let him hear", "a"),
            entry("he who has eyes let him see", "b"),
            entry("let him hear", "c"),
        ];
        for threshold in [0.5, 0.6, 0.75, 0.9] {
            let m = lookup_fuzzy("he who has ears, let him hear", &tm, threshold);
            if m.is_match() {
                assert!(f64::from(m.score) + 1.0 > threshold * 100.0);
            } else {
                assert_eq!(m.score, 0);
            }
        }
    }

    #[test]
    fn test_lookup_best_prefers_exact() {
        let tm = vec![entry("Amen", "Amén")];
        let m = lookup_best("amen", &tm, DEFAULT_FUZZY_THRESHOLD);
        assert_eq!(m.score, 100);
        assert_eq!(m.target.as_deref(), Some("Amén"));
    }

    #[test]
    fn test_concordance_substring() {
        let tm = vec![entry("Grace be with you", "a"), entry("Peace be with you", "b"), entry("Amen", "c")];
        let hits = concordance("BE WITH", &tm);
        assert_eq!(hits.len(), 2);
        assert!(concordance("  ", &tm).is_empty());
    }
}
