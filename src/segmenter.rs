//! Document Segmenter
//!
//! 문단 텍스트를 문장 단위 세그먼트로 분할합니다.
//! 문장 분할기는 주입되는 capability이며, 분할 뒤에는 단독 성경 인용 문장을
//! 직전 세그먼트에 붙이는 후처리를 수행합니다.

use once_cell::sync::Lazy;
use regex::Regex;

/// 단독 인용 문장 (`John 3:16`, `1 Juan 1:9-10.`, `(Song of Solomon 2:4)`)
static STANDALONE_CITATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\(\[]?\d?\s*\p{L}+(?:\s+\p{L}+)*\s+\d+:\d+(?:-\d+)?[\)\]]?[.;,!?]?$")
        .expect("standalone citation regex")
});

/// 마침표 뒤에서 문장을 끊지 않는 약어 (소문자 비교)
const NON_TERMINAL_ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "st", "sr", "sra", "jr", "vs", "etc", "p", "pp", "vol", "cf", "ed",
    "no", "núm", "cap", "ver",
];

/// 문단 → 문장 목록
pub trait SentenceSplitter: Send + Sync {
    fn name(&self) -> &'static str;

    fn split(&self, text: &str) -> Vec<String>;
}

/// 언어 모델이 없을 때 쓰는 fallback: 문단 전체가 한 문장
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeParagraphSplitter;

impl SentenceSplitter for WholeParagraphSplitter {
    fn name(&self) -> &'static str {
        "whole-paragraph"
    }

    fn split(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        }
    }
}

/// 문장부호 규칙 기반 분할기
///
/// `.` `!` `?` `…` (뒤따르는 닫는 따옴표/괄호 포함) 다음에 공백이 오고,
/// 그 뒤가 대문자·숫자·여는 따옴표/괄호로 시작하면 문장 경계로 봅니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationSplitter;

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | '”' | '’' | ')' | ']' | '»')
}

fn starts_sentence(c: char) -> bool {
    c.is_uppercase() || c.is_ascii_digit() || matches!(c, '"' | '“' | '‘' | '\'' | '(' | '[' | '«' | '¿' | '¡')
}

/// 마침표 앞 단어가 약어나 이니셜이면 경계가 아님
fn ends_with_abbreviation(before_dot: &str) -> bool {
    let word = before_dot
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(|c: char| !c.is_alphanumeric());
    if word.is_empty() {
        return false;
    }

    let mut chars = word.chars();
    if let (Some(first), None) = (chars.next(), chars.next()) {
        if first.is_uppercase() {
            return true;
        }
    }

    NON_TERMINAL_ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

impl SentenceSplitter for PunctuationSplitter {
    fn name(&self) -> &'static str {
        "punctuation"
    }

    fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut sentences = Vec::new();
        let mut start = 0usize;
        let mut i = 0usize;

        while i < chars.len() {
            let (offset, c) = chars[i];
            if !is_terminator(c) {
                i += 1;
                continue;
            }

            // 연속 문장부호와 닫는 기호까지 문장에 포함
            let mut j = i + 1;
            while j < chars.len() && (is_terminator(chars[j].1) || is_closer(chars[j].1)) {
                j += 1;
            }

            let mut k = j;
            while k < chars.len() && chars[k].1.is_whitespace() {
                k += 1;
            }

            let boundary = k > j
                && k < chars.len()
                && starts_sentence(chars[k].1)
                && !(c == '.' && ends_with_abbreviation(&text[start..offset]));

            if boundary {
                let end = chars[j].0;
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                start = chars[k].0;
                i = k;
            } else {
                i = j;
            }
        }

        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
        sentences
    }
}

/// 단독 인용 문장 여부
pub fn is_standalone_citation(sentence: &str) -> bool {
    STANDALONE_CITATION_RE.is_match(sentence.trim())
}

/// 문단 1개를 세그먼트 원문 목록으로 분할
///
/// 빈 문단은 세그먼트 0개, 분할 결과가 없으면 문단 전체가 세그먼트 1개입니다.
pub fn segment_paragraph(raw_text: &str, splitter: &dyn SentenceSplitter) -> Vec<String> {
    let text = raw_text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let sentences: Vec<String> = splitter
        .split(text)
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if sentences.is_empty() {
        return vec![text.to_string()];
    }

    let mut merged: Vec<String> = Vec::with_capacity(sentences.len());
    for sentence in sentences {
        match merged.last_mut() {
            Some(previous) if is_standalone_citation(&sentence) => {
                previous.push(' ');
                previous.push_str(&sentence);
            }
            _ => merged.push(sentence),
        }
    }
    merged
}

/// 저장 전 문단 초안
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphDraft {
    pub original_text: String,
    pub segments: Vec<String>,
}

/// 문서 전체 분할 (문단 순서 유지, 빈 문단은 자리표시자로 유지)
pub fn segment_document(paragraphs: &[String], splitter: &dyn SentenceSplitter) -> Vec<ParagraphDraft> {
    paragraphs
        .iter()
        .map(|text| ParagraphDraft {
            original_text: text.clone(),
            segments: segment_paragraph(text, splitter),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSplitter(Vec<&'static str>);

    impl SentenceSplitter for FixedSplitter {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn split(&self, _text: &str) -> Vec<String> {
            self.0.iter().map(|s| s.to_string()).collect()
        }
    }

    #[test]
    fn test_trailing_citation_merges_into_previous() {
        let splitter = FixedSplitter(vec!["Hello world.", "John 3:16."]);
        let segments = segment_paragraph("Hello world. John 3:16.", &splitter);
        assert_eq!(segments, vec!["Hello world. John 3:16.".to_string()]);
    }

    #[test]
    fn test_first_sentence_never_merged() {
        let splitter = FixedSplitter(vec!["John 3:16", "For God so loved the world."]);
        let segments = segment_paragraph("x", &splitter);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], "John 3:16");
    }

    #[test]
    fn test_blank_paragraph_has_no_segments() {
        assert!(segment_paragraph("   \n\t", &PunctuationSplitter).is_empty());
    }

    #[test]
    fn test_empty_split_falls_back_to_whole_paragraph() {
        let splitter = FixedSplitter(vec!["", "  "]);
        assert_eq!(segment_paragraph("  Some text.  ", &splitter), vec!["Some text.".to_string()]);
    }

    #[test]
    fn test_whole_paragraph_splitter() {
        let splitter = WholeParagraphSplitter;
        assert_eq!(splitter.split(" One. Two. "), vec!["One. Two.".to_string()]);
        assert!(splitter.split("").is_empty());
    }

    #[test]
    fn test_punctuation_splitter_boundaries() {
        let splitter = PunctuationSplitter;
        assert_eq!(
            splitter.split("Hello world. John 3:16. Is it? \"Yes!\" she said."),
            vec!["Hello world.", "John 3:16.", "Is it?", "\"Yes!\" she said."]
        );
    }

    #[test]
    fn test_punctuation_splitter_keeps_abbreviations() {
        let splitter = PunctuationSplitter;
        assert_eq!(
            splitter.split("See Christian Education, p. 21.1 for more. Dr. Smith agreed."),
            vec!["See Christian Education, p. 21.1 for more.", "Dr. Smith agreed."]
        );
        assert_eq!(splitter.split("E. G. White wrote it."), vec!["E. G. White wrote it."]);
    }

    #[test]
    fn test_punctuation_splitter_with_citation_merge() {
        let segments = segment_paragraph("Love one another. Juan 13:34. Then rest.", &PunctuationSplitter);
        assert_eq!(segments, vec!["Love one another. Juan 13:34.", "Then rest."]);
    }

    #[test]
    fn test_standalone_citation_pattern() {
        assert!(is_standalone_citation("John 3:16"));
        assert!(is_standalone_citation("1 Juan 1:9-10."));
        assert!(is_standalone_citation("(Song of Solomon 2:4)"));
        assert!(is_standalone_citation("Génesis 1:1"));
        assert!(!is_standalone_citation("He read John 3:16 aloud."));
        assert!(!is_standalone_citation("Chapter 3, verse 16"));
    }

    #[test]
    fn test_segment_document_keeps_placeholders() {
        let paragraphs = vec!["Title".to_string(), String::new(), "One. Two.".to_string()];
        let drafts = segment_document(&paragraphs, &PunctuationSplitter);
        assert_eq!(drafts.len(), 3);
        assert_eq!(drafts[0].segments, vec!["Title"]);
        assert!(drafts[1].segments.is_empty());
        assert_eq!(drafts[2].segments, vec!["One.", "Two."]);
    }
}
