//! Translation Memory & Glossary Storage
//!
//! 번역 메모리는 (소유자, 언어쌍, 정규화 원문)당 1건 upsert,
//! 용어집은 소유자별 입력 순서(rowid) 보존.

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::{new_id, now_millis, Database};
use crate::error::EditorError;
use crate::models::{GlossaryEntry, TmEntry, UserId};
use crate::utils::normalize;

/// 일괄 가져오기 결과
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

/// 용어집 가져오기 행
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlossaryRow {
    pub source_term: String,
    pub target_term: String,
    pub description: Option<String>,
}

/// 번역 메모리 upsert. 원문/번역문이 비어 있으면 no-op (false)
pub(super) fn upsert_tm(
    conn: &Connection,
    owner_id: UserId,
    lang_pair: &str,
    source: &str,
    target: &str,
    now: i64,
) -> Result<bool, EditorError> {
    let source_norm = normalize(source);
    if source_norm.is_empty() || target.trim().is_empty() {
        return Ok(false);
    }

    conn.execute(
        "INSERT INTO translation_memory
             (id, owner_id, lang_pair, source_norm, source_text, target_text, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
         ON CONFLICT(owner_id, lang_pair, source_norm) DO UPDATE SET
             source_text = excluded.source_text,
             target_text = excluded.target_text,
             updated_at = excluded.updated_at",
        (new_id(), owner_id, lang_pair, &source_norm, source.trim(), target, now),
    )?;
    Ok(true)
}

impl Database {
    /// 번역 메모리 upsert
    pub fn tm_upsert(&self, owner_id: UserId, lang_pair: &str, source: &str, target: &str) -> Result<bool, EditorError> {
        upsert_tm(&self.conn, owner_id, lang_pair, source, target, now_millis())
    }

    /// 소유자·언어쌍 범위의 전체 엔트리 (퍼지 조회 후보)
    pub fn tm_entries(&self, owner_id: UserId, lang_pair: &str) -> Result<Vec<TmEntry>, EditorError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, lang_pair, source_norm, source_text, target_text, updated_at
             FROM translation_memory WHERE owner_id = ?1 AND lang_pair = ?2 ORDER BY rowid",
        )?;
        let iter = stmt.query_map((owner_id, lang_pair), |row| {
            Ok(TmEntry {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                lang_pair: row.get(2)?,
                source_norm: row.get(3)?,
                source_text: row.get(4)?,
                target_text: row.get(5)?,
                updated_at: row.get(6)?,
            })
        })?;
        let mut out = Vec::new();
        for entry in iter {
            out.push(entry?);
        }
        Ok(out)
    }

    /// 정규화 원문 정확 일치 조회
    pub fn tm_lookup_exact(&self, owner_id: UserId, lang_pair: &str, source: &str) -> Result<Option<String>, EditorError> {
        let key = normalize(source);
        if key.is_empty() {
            return Ok(None);
        }
        let target = self
            .conn
            .query_row(
                "SELECT target_text FROM translation_memory
                 WHERE owner_id = ?1 AND lang_pair = ?2 AND source_norm = ?3",
                (owner_id, lang_pair, &key),
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(target)
    }

    /// 원문→번역문 쌍 가져오기. 이미 있는 원문은 덮어쓰지 않음
    pub fn import_tm(
        &self,
        owner_id: UserId,
        lang_pair: &str,
        pairs: &[(String, String)],
    ) -> Result<ImportReport, EditorError> {
        let now = now_millis();
        let tx = self.conn.unchecked_transaction()?;
        let mut report = ImportReport::default();

        for (source, target) in pairs {
            let source_norm = normalize(source);
            let target = target.trim();
            if source_norm.is_empty() || target.is_empty() {
                report.skipped += 1;
                continue;
            }
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO translation_memory
                     (id, owner_id, lang_pair, source_norm, source_text, target_text, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                (new_id(), owner_id, lang_pair, &source_norm, source.trim(), target, now),
            )?;
            if inserted > 0 {
                report.imported += 1;
            } else {
                report.skipped += 1;
            }
        }

        tx.commit()?;
        Ok(report)
    }

    /// 용어 추가
    pub fn glossary_add(
        &self,
        owner_id: UserId,
        lang_pair: Option<&str>,
        source_term: &str,
        target_term: &str,
        description: Option<&str>,
    ) -> Result<GlossaryEntry, EditorError> {
        let source_term = source_term.trim();
        let target_term = target_term.trim();
        if source_term.is_empty() || target_term.is_empty() {
            return Err(EditorError::Validation(
                "Glossary source and target terms are required".to_string(),
            ));
        }

        let entry = GlossaryEntry {
            id: new_id(),
            owner_id,
            lang_pair: lang_pair.map(str::to_string),
            source_term: source_term.to_string(),
            target_term: target_term.to_string(),
            description: description.map(str::trim).filter(|d| !d.is_empty()).map(str::to_string),
        };
        self.conn.execute(
            "INSERT INTO glossary_entries (id, owner_id, lang_pair, source_term, target_term, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (
                &entry.id,
                entry.owner_id,
                &entry.lang_pair,
                &entry.source_term,
                &entry.target_term,
                &entry.description,
                now_millis(),
            ),
        )?;
        Ok(entry)
    }

    /// 소유자 용어집 (입력 순서)
    pub fn glossary_entries(&self, owner_id: UserId) -> Result<Vec<GlossaryEntry>, EditorError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, lang_pair, source_term, target_term, description
             FROM glossary_entries WHERE owner_id = ?1 ORDER BY rowid",
        )?;
        let iter = stmt.query_map([owner_id], |row| {
            Ok(GlossaryEntry {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                lang_pair: row.get(2)?,
                source_term: row.get(3)?,
                target_term: row.get(4)?,
                description: row.get(5)?,
            })
        })?;
        let mut out = Vec::new();
        for entry in iter {
            out.push(entry?);
        }
        Ok(out)
    }

    /// 용어 삭제 (소유자 본인 것만)
    pub fn glossary_delete(&self, owner_id: UserId, entry_id: &str) -> Result<bool, EditorError> {
        let removed = self.conn.execute(
            "DELETE FROM glossary_entries WHERE id = ?1 AND owner_id = ?2",
            (entry_id, owner_id),
        )?;
        Ok(removed > 0)
    }

    /// 용어집 일괄 가져오기 (원문/대상 용어가 빈 행은 건너뜀)
    pub fn import_glossary(
        &self,
        owner_id: UserId,
        lang_pair: Option<&str>,
        rows: &[GlossaryRow],
    ) -> Result<ImportReport, EditorError> {
        let now = now_millis();
        let tx = self.conn.unchecked_transaction()?;
        let mut report = ImportReport::default();

        for row in rows {
            let source = row.source_term.trim();
            let target = row.target_term.trim();
            if source.is_empty() || target.is_empty() {
                report.skipped += 1;
                continue;
            }
            let description = row.description.as_deref().map(str::trim).filter(|d| !d.is_empty());
            tx.execute(
                "INSERT INTO glossary_entries (id, owner_id, lang_pair, source_term, target_term, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                (new_id(), owner_id, lang_pair, source, target, description, now),
            )?;
            report.imported += 1;
        }

        tx.commit()?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_db;

    #[test]
    fn test_upsert_keeps_single_entry_per_normalized_source() {
        let db = test_db();
        assert!(db.tm_upsert(1, "EN-ES", "Good  morning", "Buenos días").unwrap());
        assert!(db.tm_upsert(1, "EN-ES", "good morning ", "Buen día").unwrap());
        assert!(db.tm_upsert(1, "EN-FR", "Good morning", "Bonjour").unwrap());

        let entries = db.tm_entries(1, "EN-ES").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target_text, "Buen día");
        assert_eq!(entries[0].source_norm, "good morning");
        assert_eq!(db.tm_lookup_exact(1, "EN-FR", "GOOD MORNING").unwrap().as_deref(), Some("Bonjour"));
        assert!(db.tm_lookup_exact(2, "EN-ES", "good morning").unwrap().is_none());
    }

    #[test]
    fn test_upsert_ignores_empty_values() {
        let db = test_db();
        assert!(!db.tm_upsert(1, "EN-ES", "  ", "x").unwrap());
        assert!(!db.tm_upsert(1, "EN-ES", "Hello", "   ").unwrap());
        assert!(db.tm_entries(1, "EN-ES").unwrap().is_empty());
    }

    #[test]
    fn test_upsert_stores_target_verbatim() {
        let db = test_db();
        assert!(db.tm_upsert(1, "EN-ES", "Hello", "  Hola, hermano.\n").unwrap());
        assert_eq!(
            db.tm_lookup_exact(1, "EN-ES", "hello").unwrap().as_deref(),
            Some("  Hola, hermano.\n")
        );
    }

    #[test]
    fn test_import_never_overwrites() {
        let db = test_db();
        db.tm_upsert(1, "EN-ES", "Hello", "Hola").unwrap();
        let report = db
            .import_tm(
                1,
                "EN-ES",
                &[
                    ("hello".to_string(), "Qué tal".to_string()),
                    ("Goodbye".to_string(), "Adiós".to_string()),
                    ("".to_string(), "nada".to_string()),
                ],
            )
            .unwrap();
        assert_eq!(report, ImportReport { imported: 1, skipped: 2 });
        assert_eq!(db.tm_lookup_exact(1, "EN-ES", "Hello").unwrap().as_deref(), Some("Hola"));
        assert_eq!(db.tm_lookup_exact(1, "EN-ES", "goodbye").unwrap().as_deref(), Some("Adiós"));
    }

    #[test]
    fn test_glossary_preserves_insertion_order() {
        let db = test_db();
        db.glossary_add(1, Some("EN-ES"), "grace", "gracia", None).unwrap();
        db.glossary_add(1, None, "faith", "fe", Some("  ")).unwrap();
        db.glossary_add(2, None, "hope", "esperanza", None).unwrap();

        let entries = db.glossary_entries(1).unwrap();
        let terms: Vec<_> = entries.iter().map(|e| e.source_term.as_str()).collect();
        assert_eq!(terms, vec!["grace", "faith"]);
        assert_eq!(entries[1].description, None);

        assert!(matches!(
            db.glossary_add(1, None, "", "x", None),
            Err(EditorError::Validation(_))
        ));
        assert!(db.glossary_delete(1, &entries[0].id).unwrap());
        assert!(!db.glossary_delete(2, &entries[1].id).unwrap());
    }

    #[test]
    fn test_import_glossary_skips_incomplete_rows() {
        let db = test_db();
        let rows = vec![
            GlossaryRow {
                source_term: "Sabbath".into(),
                target_term: "sábado".into(),
                description: Some("día de reposo".into()),
            },
            GlossaryRow {
                source_term: "orphan".into(),
                ..Default::default()
            },
        ];
        let report = db.import_glossary(1, Some("EN-ES"), &rows).unwrap();
        assert_eq!(report, ImportReport { imported: 1, skipped: 1 });
        let entries = db.glossary_entries(1).unwrap();
        assert_eq!(entries[0].description.as_deref(), Some("día de reposo"));
        assert_eq!(entries[0].lang_pair.as_deref(), Some("EN-ES"));
    }
}
