//! Abbreviation Tables
//!
//! 언어별 `abb_<LANG>.csv` (제목,약어) 로더와 언어 코드별 캐시.
//! 파일이 없으면 빈 테이블을 반환하며, resolver는 검색 fallback 경로로 동작합니다.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// 제목 → 약어 매핑
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbbreviationTable {
    by_title: HashMap<String, String>,
    abbreviations: HashSet<String>,
}

impl AbbreviationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, title: &str, abbreviation: &str) {
        let title = title.trim().trim_start_matches('\u{feff}').trim();
        let abbreviation = abbreviation.trim();
        if title.is_empty() || abbreviation.is_empty() {
            return;
        }
        self.by_title.insert(title.to_string(), abbreviation.to_string());
        self.abbreviations.insert(abbreviation.to_string());
    }

    /// 전체 제목의 약어
    pub fn abbreviation_for(&self, title: &str) -> Option<&str> {
        self.by_title.get(title).map(String::as_str)
    }

    /// 이미 약어 값인지 여부
    pub fn is_abbreviation(&self, token: &str) -> bool {
        self.abbreviations.contains(token)
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }

    /// 헤더 없는 CSV에서 로드 (열이 2개 미만인 행은 무시)
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut table = Self::new();
        for record in csv_reader.records() {
            let record = record?;
            if let (Some(title), Some(abbr)) = (record.get(0), record.get(1)) {
                table.insert(title, abbr);
            }
        }
        Ok(table)
    }

    /// `<dir>/abb_<LANG>.csv` 로드. 없거나 읽기 실패 시 빈 테이블
    pub fn load(dir: &Path, language_code: &str) -> Self {
        let path = table_path(dir, language_code);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "abbreviation table not found, using empty table");
            return Self::new();
        }

        let result = std::fs::File::open(&path)
            .map_err(csv::Error::from)
            .and_then(Self::from_reader);

        match result {
            Ok(table) => {
                tracing::info!(path = %path.display(), entries = table.len(), "abbreviation table loaded");
                table
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read abbreviation table");
                Self::new()
            }
        }
    }
}

fn table_path(dir: &Path, language_code: &str) -> PathBuf {
    dir.join(format!("abb_{}.csv", language_code.trim().to_uppercase()))
}

/// 언어 코드별 약어 테이블 캐시
#[derive(Debug)]
pub struct AbbreviationCache {
    dir: PathBuf,
    tables: RwLock<HashMap<String, Arc<AbbreviationTable>>>,
}

impl AbbreviationCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// 캐시된 테이블 반환 (최초 요청 시 로드)
    pub fn get(&self, language_code: &str) -> Arc<AbbreviationTable> {
        let key = language_code.trim().to_uppercase();

        if let Ok(tables) = self.tables.read() {
            if let Some(table) = tables.get(&key) {
                return Arc::clone(table);
            }
        }

        let table = Arc::new(AbbreviationTable::load(&self.dir, &key));
        if let Ok(mut tables) = self.tables.write() {
            return Arc::clone(tables.entry(key).or_insert(table));
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_reader_skips_short_rows_and_bom() {
        let data = "\u{feff}Christian Education,CE\nlonely\nThe Desire of Ages , DA \n";
        let table = AbbreviationTable::from_reader(data.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.abbreviation_for("Christian Education"), Some("CE"));
        assert_eq!(table.abbreviation_for("The Desire of Ages"), Some("DA"));
        assert!(table.is_abbreviation("DA"));
        assert!(!table.is_abbreviation("lonely"));
    }

    #[test]
    fn test_missing_file_yields_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = AbbreviationTable::load(dir.path(), "xx");
        assert!(table.is_empty());
    }

    #[test]
    fn test_cache_loads_per_language() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abb_EN.csv"), "Steps to Christ,SC\n").unwrap();

        let cache = AbbreviationCache::new(dir.path());
        let en = cache.get("en");
        assert_eq!(en.abbreviation_for("Steps to Christ"), Some("SC"));
        assert!(cache.get("ES").is_empty());
        assert!(Arc::ptr_eq(&en, &cache.get("EN")));
    }
}
