//! Translation Memory Commands
//!
//! JSON 임포트, concordance 검색, 임의 텍스트 조회. 모두 (사용자, 언어쌍) 범위입니다.

use serde::{Deserialize, Serialize};

use crate::error::{CommandResult, EditorError};
use crate::matching::memory::{concordance, lookup_best, FuzzyMatch};
use crate::models::{language_pair, TmEntry, UserIdentity};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TmScope {
    pub source_lang: String,
    pub target_lang: String,
}

impl TmScope {
    fn lang_pair(&self) -> Result<String, EditorError> {
        if self.source_lang.trim().is_empty() || self.target_lang.trim().is_empty() {
            return Err(EditorError::Validation(
                "Source and target languages are required".to_string(),
            ));
        }
        Ok(language_pair(&self.source_lang, &self.target_lang))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportTmArgs {
    #[serde(flatten)]
    pub scope: TmScope,
    /// `{"원문": "번역문", ...}` 형식 JSON
    pub json: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportTmResult {
    pub imported: usize,
    pub skipped: usize,
}

/// JSON 객체 임포트. 이미 있는 원문은 덮어쓰지 않고, 문자열이 아닌 값은 건너뜀
pub fn import_tm_json(state: &AppState, user: &UserIdentity, args: ImportTmArgs) -> CommandResult<ImportTmResult> {
    let lang_pair = args.scope.lang_pair()?;
    let value: serde_json::Value = serde_json::from_str(&args.json).map_err(EditorError::from)?;
    let Some(object) = value.as_object() else {
        return Err(EditorError::Validation("Translation memory JSON must be an object".to_string()).into());
    };

    let mut pairs = Vec::with_capacity(object.len());
    let mut invalid = 0usize;
    for (source, target) in object {
        match target.as_str() {
            Some(target) => pairs.push((source.clone(), target.to_string())),
            None => invalid += 1,
        }
    }

    let report = state.db.with(|db| db.import_tm(user.id, &lang_pair, &pairs))?;
    tracing::info!(
        user_id = user.id,
        lang_pair = %lang_pair,
        imported = report.imported,
        skipped = report.skipped + invalid,
        "translation memory imported"
    );
    Ok(ImportTmResult {
        imported: report.imported,
        skipped: report.skipped + invalid,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TmQueryArgs {
    #[serde(flatten)]
    pub scope: TmScope,
    pub query: String,
}

/// 정규화 원문에 질의가 포함된 엔트리
pub fn search_concordance(state: &AppState, user: &UserIdentity, args: TmQueryArgs) -> CommandResult<Vec<TmEntry>> {
    let lang_pair = args.scope.lang_pair()?;
    let entries = state.db.with(|db| db.tm_entries(user.id, &lang_pair))?;
    Ok(concordance(&args.query, &entries).into_iter().cloned().collect())
}

/// 임의 텍스트의 최적 매치 (정확 → 퍼지)
pub async fn lookup(state: &AppState, user: &UserIdentity, args: TmQueryArgs) -> CommandResult<FuzzyMatch> {
    let lang_pair = args.scope.lang_pair()?;
    let entries = state.db.with(|db| db.tm_entries(user.id, &lang_pair))?;
    let threshold = state.config.fuzzy_threshold;
    let query = args.query;

    let found = tokio::task::spawn_blocking(move || lookup_best(&query, &entries, threshold))
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "fuzzy lookup task failed");
            FuzzyMatch::none()
        });
    Ok(found)
}
