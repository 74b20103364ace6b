//! Text Utilities
//!
//! 매칭용 텍스트 정규화와 공용 문자열/경로 헬퍼

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::EditorError;

/// 매칭용 정규화: 연속 공백을 한 칸으로, 양끝 trim, 소문자화
///
/// 멱등 함수이며 빈 입력은 빈 문자열을 반환합니다.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 단어 경계(`\b`) 기준 포함 여부
pub fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    match Regex::new(&format!(r"\b{}\b", regex::escape(needle))) {
        Ok(re) => re.is_match(haystack),
        Err(_) => haystack.contains(needle),
    }
}

/// 단어 첫 글자만 대문자로 ("1 samuel" -> "1 Samuel")
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// 미리보기 문자열 (문자 단위 절단)
pub fn preview(text: &str, max_chars: usize) -> String {
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

/// epoch 밀리초 → RFC 3339 (UTC). 범위를 벗어나면 빈 문자열
pub fn rfc3339(millis: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

/// 시스템 중요 디렉토리 접근을 차단하는 경로 검증
/// - 파일이 존재하면 canonicalize, 없으면 부모 디렉토리 기준으로 정규화합니다.
pub fn validate_path(path_str: &str) -> Result<PathBuf, EditorError> {
    let path = Path::new(path_str);

    let canonical_path = if path.exists() {
        path.canonicalize()?
    } else {
        match path.parent() {
            Some(parent) if parent.exists() => {
                let canonical_parent = parent.canonicalize()?;
                canonical_parent.join(path.file_name().unwrap_or_default())
            }
            Some(_) => {
                return Err(EditorError::Validation(
                    "Parent directory does not exist".to_string(),
                ))
            }
            None => PathBuf::from(path_str),
        }
    };

    if is_blocked_path(&canonical_path) {
        return Err(EditorError::Validation(
            "Access to system directory is blocked.".to_string(),
        ));
    }

    Ok(canonical_path)
}

fn is_blocked_path(path: &Path) -> bool {
    let path_str = path.to_string_lossy();

    #[cfg(target_os = "windows")]
    {
        let lower = path_str.to_lowercase();
        if lower.contains(r"c:\windows") || lower.contains(r"c:\program files") {
            return true;
        }
    }

    #[cfg(not(target_os = "windows"))]
    {
        const BLOCKED: [&str; 7] = ["/etc", "/proc", "/sys", "/bin", "/sbin", "/usr/bin", "/usr/sbin"];
        if BLOCKED.iter().any(|prefix| path_str.starts_with(prefix)) {
            return true;
        }
    }

    false
}
