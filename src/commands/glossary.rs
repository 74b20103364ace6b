//! Glossary Commands
//!
//! 사용자 용어집 추가/삭제/목록, CSV·Excel 임포트, 원문 기준 용어 검색

use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use serde::{Deserialize, Serialize};

use crate::db::{GlossaryRow, ImportReport};
use crate::error::{CommandResult, EditorError};
use crate::matching::glossary::find_matches;
use crate::models::{language_pair, GlossaryEntry, TermMatch, UserIdentity};
use crate::utils::validate_path;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTermArgs {
    pub source_term: String,
    pub target_term: String,
    pub description: Option<String>,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportGlossaryArgs {
    /// 로컬 파일 경로 (.csv / .xlsx / .xls)
    pub path: String,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportGlossaryResult {
    pub imported: usize,
    pub skipped: usize,
}

impl From<ImportReport> for ImportGlossaryResult {
    fn from(report: ImportReport) -> Self {
        Self {
            imported: report.imported,
            skipped: report.skipped,
        }
    }
}

fn scope(source_lang: Option<&str>, target_lang: Option<&str>) -> Option<String> {
    match (source_lang, target_lang) {
        (Some(s), Some(t)) if !s.trim().is_empty() && !t.trim().is_empty() => Some(language_pair(s, t)),
        _ => None,
    }
}

/// 용어 추가
pub fn add_term(state: &AppState, user: &UserIdentity, args: AddTermArgs) -> CommandResult<GlossaryEntry> {
    let lang_pair = scope(args.source_lang.as_deref(), args.target_lang.as_deref());
    Ok(state.db.with(|db| {
        db.glossary_add(
            user.id,
            lang_pair.as_deref(),
            &args.source_term,
            &args.target_term,
            args.description.as_deref(),
        )
    })?)
}

/// 용어 삭제. 없거나 다른 사용자 것이면 `false`
pub fn delete_term(state: &AppState, user: &UserIdentity, entry_id: &str) -> CommandResult<bool> {
    Ok(state.db.with(|db| db.glossary_delete(user.id, entry_id))?)
}

pub fn list_terms(state: &AppState, user: &UserIdentity) -> CommandResult<Vec<GlossaryEntry>> {
    Ok(state.db.with(|db| db.glossary_entries(user.id))?)
}

/// 원문에 등장하는 용어 (입력 순서)
pub fn find_terms(state: &AppState, user: &UserIdentity, text: &str) -> CommandResult<Vec<TermMatch>> {
    let entries = state.db.with(|db| db.glossary_entries(user.id))?;
    Ok(find_matches(text, &entries).into_iter().map(TermMatch::from).collect())
}

/// CSV 행 읽기: `source,target[,description]`, 헤더 없음
pub fn parse_glossary_csv<R: Read>(reader: R) -> Result<Vec<GlossaryRow>, EditorError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        rows.push(GlossaryRow {
            source_term: record.get(0).unwrap_or_default().to_string(),
            target_term: record.get(1).unwrap_or_default().to_string(),
            description: record.get(2).map(str::to_string),
        });
    }
    Ok(rows)
}

fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

/// 스프레드시트 첫 시트의 앞 2~3열
pub fn parse_glossary_sheet(path: &Path) -> Result<Vec<GlossaryRow>, EditorError> {
    let mut workbook = open_workbook_auto(path)?;
    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Ok(Vec::new());
    };
    let range = workbook.worksheet_range(&sheet_name)?;

    Ok(range
        .rows()
        .map(|row| GlossaryRow {
            source_term: cell_text(row.first()),
            target_term: cell_text(row.get(1)),
            description: Some(cell_text(row.get(2))).filter(|d| !d.is_empty()),
        })
        .collect())
}

/// 용어집 파일 임포트 (확장자로 형식 판별). 원문/대상 용어가 빈 행은 건너뜀
pub fn import_glossary(state: &AppState, user: &UserIdentity, args: ImportGlossaryArgs) -> CommandResult<ImportGlossaryResult> {
    let path = validate_path(&args.path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let rows = match extension.as_str() {
        "csv" => parse_glossary_csv(std::fs::File::open(&path).map_err(EditorError::from)?)?,
        "xlsx" | "xls" | "xlsm" | "ods" => parse_glossary_sheet(&path)?,
        other => {
            return Err(EditorError::Validation(format!("Unsupported glossary file type: {}", other)).into());
        }
    };

    let lang_pair = scope(args.source_lang.as_deref(), args.target_lang.as_deref());
    let report = state
        .db
        .with(|db| db.import_glossary(user.id, lang_pair.as_deref(), &rows))?;
    tracing::info!(
        user_id = user.id,
        imported = report.imported,
        skipped = report.skipped,
        "glossary imported"
    );
    Ok(report.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{owner, reviewer, test_state};

    #[test]
    fn test_parse_csv_with_optional_description() {
        let rows = parse_glossary_csv("Sabbath, sábado\nGrace,gracia,favor inmerecido\n,vacío\n".as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].target_term, "sábado");
        assert_eq!(rows[0].description, None);
        assert_eq!(rows[1].description.as_deref(), Some("favor inmerecido"));
        assert!(rows[2].source_term.is_empty());
    }

    #[test]
    fn test_import_csv_file_skips_incomplete_rows() {
        let state = test_state();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terms.csv");
        std::fs::write(&path, "Sabbath,sábado\nGrace,\nArk,arca,Noah\n").unwrap();

        let result = import_glossary(
            &state,
            &owner(),
            ImportGlossaryArgs {
                path: path.to_string_lossy().into_owned(),
                source_lang: Some("en".into()),
                target_lang: Some("es".into()),
            },
        )
        .unwrap();
        assert_eq!((result.imported, result.skipped), (2, 1));

        let terms = list_terms(&state, &owner()).unwrap();
        assert_eq!(terms[0].lang_pair.as_deref(), Some("EN-ES"));
        assert_eq!(terms[1].description.as_deref(), Some("Noah"));
        assert!(list_terms(&state, &reviewer()).unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_extension() {
        let state = test_state();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terms.txt");
        std::fs::write(&path, "a,b").unwrap();

        let err = import_glossary(
            &state,
            &owner(),
            ImportGlossaryArgs {
                path: path.to_string_lossy().into_owned(),
                source_lang: None,
                target_lang: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_add_find_delete() {
        let state = test_state();
        let entry = add_term(
            &state,
            &owner(),
            AddTermArgs {
                source_term: "Holy Spirit".into(),
                target_term: "Espíritu Santo".into(),
                description: Some(" ".into()),
                source_lang: None,
                target_lang: None,
            },
        )
        .unwrap();
        assert!(entry.description.is_none());

        let found = find_terms(&state, &owner(), "The  holy spirit descended").unwrap();
        assert_eq!(found[0].target_term, "Espíritu Santo");

        assert!(!delete_term(&state, &reviewer(), &entry.id).unwrap());
        assert!(delete_term(&state, &owner(), &entry.id).unwrap());
        assert!(find_terms(&state, &owner(), "holy spirit").unwrap().is_empty());
    }

    #[test]
    fn test_add_requires_both_terms() {
        let state = test_state();
        let err = add_term(
            &state,
            &owner(),
            AddTermArgs {
                source_term: "Grace".into(),
                target_term: "  ".into(),
                description: None,
                source_lang: None,
                target_lang: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.code, "INVALID_REQUEST");
    }
}
