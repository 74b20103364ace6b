//! Application Configuration
//!
//! `.env.local` / `.env` 를 읽은 뒤 프로세스 환경 변수에서 설정을 구성합니다.
//! strict 파서(dotenvy)가 실패하면 `KEY=VALUE` 라인만 읽는 lenient 로더로 보강합니다.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::matching::memory::DEFAULT_FUZZY_THRESHOLD;
use crate::mt::DEFAULT_DEEPL_API_URL;

pub const DEFAULT_DATABASE_PATH: &str = "collab-cat.db";
pub const DEFAULT_ABBREVIATIONS_DIR: &str = "data";
pub const DEFAULT_BIBLE_API_URL: &str = "https://bolls.life";
const DEFAULT_PRESENCE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub abbreviations_dir: PathBuf,
    pub deepl_api_key: Option<String>,
    pub deepl_api_url: String,
    pub fuzzy_threshold: f64,
    pub presence_timeout: Duration,
    pub http_timeout: Duration,
    pub bible_api_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            abbreviations_dir: PathBuf::from(DEFAULT_ABBREVIATIONS_DIR),
            deepl_api_key: None,
            deepl_api_url: DEFAULT_DEEPL_API_URL.to_string(),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            presence_timeout: Duration::from_secs(DEFAULT_PRESENCE_TIMEOUT_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            bible_api_url: DEFAULT_BIBLE_API_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// env 파일 로드 후 프로세스 환경에서 구성
    pub fn load() -> Self {
        load_env_files();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로부터 구성. 빈 값은 미설정으로 취급
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let fuzzy_threshold = parse_or(get("CAT_FUZZY_THRESHOLD"), "CAT_FUZZY_THRESHOLD", defaults.fuzzy_threshold)
            .clamp(0.0, 1.0);
        let presence_secs = parse_or(
            get("CAT_PRESENCE_TIMEOUT_SECS"),
            "CAT_PRESENCE_TIMEOUT_SECS",
            DEFAULT_PRESENCE_TIMEOUT_SECS,
        );
        let http_secs = parse_or(get("CAT_HTTP_TIMEOUT_SECS"), "CAT_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS);

        Self {
            database_path: get("CAT_DATABASE_PATH").map(PathBuf::from).unwrap_or(defaults.database_path),
            abbreviations_dir: get("CAT_ABBREVIATIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.abbreviations_dir),
            deepl_api_key: get("DEEPL_API_KEY"),
            deepl_api_url: get("DEEPL_API_URL").unwrap_or(defaults.deepl_api_url),
            fuzzy_threshold,
            presence_timeout: Duration::from_secs(presence_secs),
            http_timeout: Duration::from_secs(http_secs),
            bible_api_url: get("CAT_BIBLE_API_URL").unwrap_or(defaults.bible_api_url),
        }
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> T {
    match raw {
        None => default,
        Some(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %value, "unparseable config value, using default");
            default
        }),
    }
}

fn is_valid_env_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// `KEY=VALUE` 라인만 추출. 주석, 코드펜스, 설명 문장은 무시
pub fn parse_env_text(text: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("```") {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line).trim();
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        let key = k.trim();
        if !is_valid_env_key(key) {
            continue;
        }

        let mut value = v.trim();
        let quoted = value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')));
        if quoted {
            value = &value[1..value.len() - 1];
        }
        pairs.push((key.to_string(), value.to_string()));
    }
    pairs
}

fn try_load_env_lenient(path: &Path) -> std::io::Result<usize> {
    let text = std::fs::read_to_string(path)?;
    let mut loaded = 0usize;
    for (key, value) in parse_env_text(&text) {
        // 비어 있지 않은 기존 값은 유지
        if std::env::var(&key).map(|v| !v.trim().is_empty()).unwrap_or(false) {
            continue;
        }
        std::env::set_var(&key, value);
        loaded += 1;
    }
    Ok(loaded)
}

pub fn find_upwards(start: PathBuf, filename: &str, max_hops: usize) -> Option<PathBuf> {
    let mut cur = start;
    for _ in 0..=max_hops {
        let candidate = cur.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        if !cur.pop() {
            break;
        }
    }
    None
}

fn load_env_files() {
    let Ok(cwd) = std::env::current_dir() else {
        return;
    };

    for filename in [".env.local", ".env"] {
        let Some(path) = find_upwards(cwd.clone(), filename, 6) else {
            continue;
        };
        if dotenvy::from_path(&path).is_ok() {
            tracing::debug!(path = %path.display(), "loaded env file");
            continue;
        }
        match try_load_env_lenient(&path) {
            Ok(loaded) => tracing::debug!(path = %path.display(), loaded, "loaded env file leniently"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to read env file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.presence_timeout, Duration::from_secs(300));
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert!(config.deepl_api_key.is_none());
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let config = config_from(&[
            ("CAT_DATABASE_PATH", "/tmp/cat.db"),
            ("DEEPL_API_KEY", "  "),
            ("CAT_FUZZY_THRESHOLD", "0.9"),
            ("CAT_PRESENCE_TIMEOUT_SECS", "five minutes"),
        ]);
        assert_eq!(config.database_path, PathBuf::from("/tmp/cat.db"));
        assert!(config.deepl_api_key.is_none());
        assert_eq!(config.fuzzy_threshold, 0.9);
        assert_eq!(config.presence_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_parse_env_text_skips_prose() {
        let text = "# Keys\n```\nexport DEEPL_API_KEY=\"abc:fx\"\nthis line is prose\nlower=1\nCAT_HTTP_TIMEOUT_SECS = 5\n```";
        assert_eq!(
            parse_env_text(text),
            vec![
                ("DEEPL_API_KEY".to_string(), "abc:fx".to_string()),
                ("CAT_HTTP_TIMEOUT_SECS".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn test_find_upwards() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(".env.local"), "X=1").unwrap();

        let found = find_upwards(nested, ".env.local", 4).unwrap();
        assert_eq!(found, dir.path().join(".env.local"));
    }
}
