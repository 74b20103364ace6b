//! Scripture Reference Resolver
//!
//! `[숫자] 책이름 장:절[-절]` 형식 인용(구분자 `,` `;` `y`/`and` 연결, 괄호 가능)을 찾아
//! 영어 정경 책 이름으로 번역한 뒤 외부 성경 검색 URL과 첫 구절 좌표를 만듭니다.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ReferenceKind, ReferenceMatch, VerseRef};
use crate::utils::{normalize, title_case};

const PASSAGE_BASE_URL: &str = "https://www.biblegateway.com/passage/?search=";
const PASSAGE_VERSION: &str = "&version=RVR1960";

static CITATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)[\(\[]?(\d?\s*[a-zñáéíóúü\s\.]+\s+\d+:\d+(?:-\d+)?(?:(?:\s*,\s*|;\s*|\s+(?:y|and)\s+)\s*(?:\d?\s*[a-zñáéíóúü\s\.]+\s+)?\d+:\d+(?:-\d+)?)*)[\)\]]?",
    )
    .expect("citation regex")
});

static WRAPPER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\(\[]|[\)\]]$").expect("wrapper regex"));

static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:,\s*|;\s*|\s+(?:y|and)\s+)").expect("separator regex"));

static PART_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d?\s*[a-zñáéíóúü\s\.]*)\s*(\d+:\d+(?:-\d+)?)").expect("part regex")
});

static API_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s+(\d+):(\d+)(?:-\d+)?").expect("api regex"));

/// 정경 순서 (ID = 인덱스 + 1)
pub const CANONICAL_BOOKS: [&str; 66] = [
    "Genesis", "Exodus", "Leviticus", "Numbers", "Deuteronomy", "Joshua", "Judges", "Ruth",
    "1 Samuel", "2 Samuel", "1 Kings", "2 Kings", "1 Chronicles", "2 Chronicles", "Ezra",
    "Nehemiah", "Esther", "Job", "Psalms", "Proverbs", "Ecclesiastes", "Song of Solomon",
    "Isaiah", "Jeremiah", "Lamentations", "Ezekiel", "Daniel", "Hosea", "Joel", "Amos",
    "Obadiah", "Jonah", "Micah", "Nahum", "Habakkuk", "Zephaniah", "Haggai", "Zechariah",
    "Malachi", "Matthew", "Mark", "Luke", "John", "Acts", "Romans", "1 Corinthians",
    "2 Corinthians", "Galatians", "Ephesians", "Philippians", "Colossians", "1 Thessalonians",
    "2 Thessalonians", "1 Timothy", "2 Timothy", "Titus", "Philemon", "Hebrews", "James",
    "1 Peter", "2 Peter", "1 John", "2 John", "3 John", "Jude", "Revelation",
];

/// 스페인어 책 이름 → 영어 정경 이름
static SPANISH_BOOKS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("génesis", "Genesis"), ("éxodo", "Exodus"), ("levítico", "Leviticus"),
        ("números", "Numbers"), ("deuteronomio", "Deuteronomy"), ("josué", "Joshua"),
        ("jueces", "Judges"), ("rut", "Ruth"), ("1 samuel", "1 Samuel"), ("2 samuel", "2 Samuel"),
        ("1 reyes", "1 Kings"), ("2 reyes", "2 Kings"), ("1 crónicas", "1 Chronicles"),
        ("2 crónicas", "2 Chronicles"), ("esdras", "Ezra"), ("nehemías", "Nehemiah"),
        ("ester", "Esther"), ("job", "Job"), ("salmos", "Psalms"), ("proverbios", "Proverbs"),
        ("eclesiastés", "Ecclesiastes"), ("cantares", "Song of Solomon"), ("isaías", "Isaiah"),
        ("jeremías", "Jeremiah"), ("lamentaciones", "Lamentations"), ("ezequiel", "Ezekiel"),
        ("daniel", "Daniel"), ("oseas", "Hosea"), ("joel", "Joel"), ("amós", "Amos"),
        ("abdías", "Obadiah"), ("jonás", "Jonah"), ("miqueas", "Micah"), ("nahúm", "Nahum"),
        ("habacuc", "Habakkuk"), ("sofonías", "Zephaniah"), ("hageo", "Haggai"),
        ("zacarías", "Zechariah"), ("malaquías", "Malachi"),
        ("mateo", "Matthew"), ("marcos", "Mark"), ("lucas", "Luke"), ("juan", "John"),
        ("hechos", "Acts"), ("romanos", "Romans"), ("1 corintios", "1 Corinthians"),
        ("2 corintios", "2 Corinthians"), ("gálatas", "Galatians"), ("efesios", "Ephesians"),
        ("filipenses", "Philippians"), ("colosenses", "Colossians"),
        ("1 tesalonicenses", "1 Thessalonians"), ("2 tesalonicenses", "2 Thessalonians"),
        ("1 timoteo", "1 Timothy"), ("2 timoteo", "2 Timothy"), ("tito", "Titus"),
        ("filemón", "Philemon"), ("hebreos", "Hebrews"), ("santiago", "James"),
        ("1 pedro", "1 Peter"), ("2 pedro", "2 Peter"), ("1 juan", "1 John"),
        ("2 juan", "2 John"), ("3 juan", "3 John"), ("judas", "Jude"),
        ("apocalipsis", "Revelation"),
    ])
});

/// 영어 정경 이름 → 1-66 ID (대소문자 무시)
pub fn book_id(canonical_name: &str) -> Option<u8> {
    CANONICAL_BOOKS
        .iter()
        .position(|name| name.eq_ignore_ascii_case(canonical_name))
        .map(|idx| (idx + 1) as u8)
}

fn known_book(name: &str) -> Option<&'static str> {
    if let Some(english) = SPANISH_BOOKS.get(name) {
        return Some(english);
    }
    CANONICAL_BOOKS
        .iter()
        .find(|canonical| canonical.eq_ignore_ascii_case(name))
        .copied()
}

/// 책 이름 번역. 앞쪽에 문장 텍스트가 붙은 경우 가장 긴 알려진 접미 단어열을 사용하고,
/// 끝내 모르는 이름은 title-case로 그대로 통과시킵니다.
fn translate_book(raw: &str) -> String {
    let cleaned = normalize(&raw.replace('.', ""));
    let words: Vec<&str> = cleaned.split(' ').filter(|w| !w.is_empty()).collect();

    for start in 0..words.len() {
        let candidate = words[start..].join(" ");
        if let Some(english) = known_book(&candidate) {
            return english.to_string();
        }
    }

    title_case(&cleaned)
}

/// 성경 인용 해석
pub fn resolve_scripture(text: &str) -> ReferenceMatch {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ReferenceMatch::none();
    }

    let Some(captures) = CITATION_RE.captures(trimmed) else {
        return ReferenceMatch::none();
    };
    let Some(span) = captures.get(1) else {
        return ReferenceMatch::none();
    };

    let citation = WRAPPER_RE.replace_all(span.as_str().trim(), "").trim().to_string();
    let joined = SEPARATOR_RE.replace_all(&citation, ";");

    let mut translated: Vec<String> = Vec::new();
    let mut last_book: Option<String> = None;

    for part in joined.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let Some(part_caps) = PART_RE.captures(part) else {
            continue;
        };
        let book_raw = part_caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let reference = part_caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");

        let mut book = translate_book(book_raw);
        if book.is_empty() {
            // "Juan 3:16; 4:2" 처럼 책 이름이 생략되면 앞 인용의 책을 이어받음
            book = last_book.clone().unwrap_or_default();
        }

        if book.is_empty() {
            translated.push(reference.to_string());
        } else {
            translated.push(format!("{} {}", book, reference));
            last_book = Some(book);
        }
    }

    if translated.is_empty() {
        return ReferenceMatch::none();
    }

    // 공백·콜론 외에 악센트 등 비ASCII 문자도 퍼센트 인코딩 (UTF-8 바이트 단위)
    let query = translated
        .iter()
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join(";");

    let api_data = API_RE.captures(&translated[0]).and_then(|caps| {
        let book = caps.get(1)?.as_str().trim();
        Some(VerseRef {
            book_id: book_id(book)?,
            chapter: caps.get(2)?.as_str().to_string(),
            verse: caps.get(3)?.as_str().to_string(),
        })
    });

    ReferenceMatch {
        target_url: Some(format!("{}{}{}", PASSAGE_BASE_URL, query, PASSAGE_VERSION)),
        kind: ReferenceKind::Scripture,
        matched_span: Some(citation),
        api_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spanish_book_resolves_to_canonical() {
        let m = resolve_scripture("Juan 3:16");
        assert_eq!(m.kind, ReferenceKind::Scripture);
        let url = m.target_url.unwrap();
        assert!(url.contains("John%203%3A16"));
        assert!(url.starts_with(PASSAGE_BASE_URL));
        assert_eq!(
            m.api_data,
            Some(VerseRef {
                book_id: 43,
                chapter: "3".into(),
                verse: "16".into()
            })
        );
        assert_eq!(m.matched_span.as_deref(), Some("Juan 3:16"));
    }

    #[test]
    fn test_numbered_book_and_verse_range() {
        let m = resolve_scripture("(1 Juan 1:9-10)");
        let url = m.target_url.unwrap();
        assert!(url.contains("1%20John%201%3A9-10"));
        assert_eq!(m.api_data.unwrap().book_id, 62);
    }

    #[test]
    fn test_chained_citations_joined_with_semicolon() {
        let m = resolve_scripture("Romanos 3:23; 6:23 y Efesios 2:8");
        let url = m.target_url.unwrap();
        assert!(url.contains("Romans%203%3A23;Romans%206%3A23;Ephesians%202%3A8"));
        assert_eq!(m.api_data.unwrap().book_id, 45);
    }

    #[test]
    fn test_english_names_pass_through() {
        let m = resolve_scripture("see Song of Solomon 2:4");
        assert!(m.target_url.unwrap().contains("Song%20of%20Solomon%202%3A4"));
        assert_eq!(m.api_data.unwrap().book_id, 22);
    }

    #[test]
    fn test_citation_after_sentence_text() {
        let m = resolve_scripture("Hello world. John 3:16.");
        assert!(m.target_url.unwrap().contains("search=John%203%3A16"));
        assert_eq!(m.api_data.unwrap().book_id, 43);
    }

    #[test]
    fn test_unknown_book_is_title_cased_without_api_data() {
        let m = resolve_scripture("libro raro 4:5");
        assert!(m.target_url.unwrap().contains("Libro%20Raro%204%3A5"));
        assert!(m.api_data.is_none());
    }

    #[test]
    fn test_unknown_accented_book_is_percent_encoded() {
        let m = resolve_scripture("libro añejo 4:5");
        assert!(m.target_url.unwrap().contains("search=Libro%20A%C3%B1ejo%204%3A5&"));
    }

    #[test]
    fn test_no_citation() {
        assert_eq!(resolve_scripture("Nothing to see here."), ReferenceMatch::none());
        assert_eq!(resolve_scripture(""), ReferenceMatch::none());
        assert_eq!(resolve_scripture("Chapter 3, verse 16"), ReferenceMatch::none());
    }

    #[test]
    fn test_book_id_table() {
        assert_eq!(book_id("Genesis"), Some(1));
        assert_eq!(book_id("revelation"), Some(66));
        assert_eq!(book_id("Hezekiah"), None);
    }
}
