//! External Lookup Commands
//!
//! 기계 번역과 성경 본문 조회. 자격 증명 문제를 제외한 외부 실패는
//! 에러가 아니라 "결과 없음" 응답으로 돌려줍니다.

use serde::{Deserialize, Serialize};

use crate::error::{CommandError, CommandResult};
use crate::models::UserIdentity;
use crate::references::bible_api::LookupResult;
use crate::references::resolve_scripture;
use crate::AppState;

const DEFAULT_TARGET_LANG: &str = "ES";
const DEFAULT_BIBLE_TRANSLATION: &str = "RV1960";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateArgs {
    pub text: String,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    /// 사용자 제공 키 (없으면 서버 설정 키)
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResult {
    pub translation: Option<String>,
    pub error: Option<String>,
}

/// 기계 번역
pub async fn translate_mt(state: &AppState, user: &UserIdentity, args: TranslateArgs) -> CommandResult<TranslateResult> {
    let target_lang = args
        .target_lang
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TARGET_LANG);

    let result = state
        .translator
        .translate(&args.text, args.source_lang.as_deref(), target_lang, args.api_key.as_deref())
        .await;

    match result {
        Ok(translation) => Ok(TranslateResult {
            translation: Some(translation),
            error: None,
        }),
        Err(e) if e.is_credential_error() => Err(CommandError::from(e)),
        Err(e) => {
            tracing::warn!(
                user_id = user.id,
                provider = state.translator.provider_name(),
                error = %e,
                "machine translation unavailable"
            );
            Ok(TranslateResult {
                translation: None,
                error: Some(e.to_string()),
            })
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerseTextArgs {
    /// 인용이 포함된 텍스트 (예: "Juan 3:16")
    pub text: String,
    pub translation: Option<String>,
}

/// 텍스트의 첫 성경 인용 구절 본문
pub async fn fetch_verse_text(state: &AppState, args: VerseTextArgs) -> CommandResult<LookupResult> {
    let Some(verse) = resolve_scripture(&args.text).api_data else {
        return Ok(LookupResult::Unavailable {
            reason: "No scripture reference found".to_string(),
        });
    };
    let translation = args
        .translation
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_BIBLE_TRANSLATION);

    Ok(state.bible.fetch_verse(translation, &verse).await)
}
