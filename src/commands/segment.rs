//! Segment Commands
//!
//! 세그먼트 상세 조회(번역 메모리/용어집/인용 정보 포함), 저장, 표시 ID 이동,
//! 프로젝트 검색, 병합, 용어 QA

use serde::{Deserialize, Serialize};

use crate::collab::SegmentLock;
use crate::db::{PreviousMerge, SearchField, SearchHit};
use crate::document::{DisplayId, MergeOutcome};
use crate::error::{CommandError, CommandResult, EditorError};
use crate::matching::{glossary, memory};
use crate::models::{TermMatch, UserIdentity};
use crate::references::{resolve_scripture, resolve_writing, ReferenceMatch};
use crate::utils::rfc3339;
use crate::AppState;

/// 에디터 패널용 세그먼트 상세
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDetail {
    pub id: String,
    pub paragraph_id: String,
    pub project_id: String,
    pub display_id: String,
    pub source_text: String,
    pub target_text: String,
    pub note: String,
    pub paragraph_context: String,
    pub tm_match: Option<String>,
    pub tm_score: u8,
    pub glossary_matches: Vec<TermMatch>,
    pub scripture: ReferenceMatch,
    pub writing: ReferenceMatch,
    pub last_modified_by_name: Option<String>,
    pub last_modified_at: Option<String>,
    pub lock: Option<SegmentLock>,
}

/// 세그먼트 상세 조회
///
/// 번역 메모리는 조회 사용자 소유 + 프로젝트 언어쌍 범위에서 정확 일치 우선, 없으면 퍼지.
pub async fn get_segment(state: &AppState, user: &UserIdentity, segment_id: &str) -> CommandResult<SegmentDetail> {
    let (context, tm_entries, glossary_entries, modified_by) = state.db.with(|db| {
        let context = db.segment_context(segment_id)?;
        db.ensure_access(&context.project.id, user.id)?;
        let tm_entries = db.tm_entries(user.id, &context.project.language_pair())?;
        let glossary_entries = db.glossary_entries(user.id)?;
        let modified_by = match context.segment.last_modified_by {
            Some(editor_id) => db.user_display_name(editor_id)?,
            None => None,
        };
        Ok((context, tm_entries, glossary_entries, modified_by))
    })?;

    let source = context.segment.source_text.clone();
    let threshold = state.config.fuzzy_threshold;
    let tm = tokio::task::spawn_blocking(move || memory::lookup_best(&source, &tm_entries, threshold))
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(segment_id, error = %e, "fuzzy lookup task failed");
            memory::FuzzyMatch::none()
        });

    let glossary_matches = glossary::find_matches(&context.segment.source_text, &glossary_entries)
        .into_iter()
        .map(TermMatch::from)
        .collect();
    let abbreviations = state.abbreviations.get(&context.project.source_lang);
    let scripture = resolve_scripture(&context.segment.source_text);
    let writing = resolve_writing(&context.segment.source_text, &abbreviations);
    let lock = state.engine.lock_holder(&context.project.id, segment_id).await;

    let segment = context.segment;
    Ok(SegmentDetail {
        display_id: DisplayId::from_positions(context.paragraph.position, segment.position).to_string(),
        paragraph_id: context.paragraph.id,
        project_id: context.project.id,
        paragraph_context: context.paragraph.original_text,
        tm_match: tm.target,
        tm_score: tm.score,
        glossary_matches,
        scripture,
        writing,
        last_modified_by_name: modified_by,
        last_modified_at: segment.last_modified_at.map(rfc3339),
        lock,
        id: segment.id,
        source_text: segment.source_text,
        target_text: segment.target_text,
        note: segment.note,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSegmentArgs {
    pub segment_id: String,
    #[serde(default)]
    pub target_text: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSegmentResult {
    pub segment_id: String,
    /// 전파되어 함께 채워진 세그먼트 ID
    pub propagated_segment_ids: Vec<String>,
    pub last_modified_at: Option<String>,
}

/// 번역 저장 (잠금 보유 여부와 무관)
pub async fn save_segment(
    state: &AppState,
    user: &UserIdentity,
    args: SaveSegmentArgs,
) -> CommandResult<SaveSegmentResult> {
    let outcome = state
        .engine
        .apply_edit(&args.segment_id, &args.target_text, &args.note, user)
        .await?;

    Ok(SaveSegmentResult {
        segment_id: outcome.segment.id,
        propagated_segment_ids: outcome.propagated.into_iter().map(|s| s.id).collect(),
        last_modified_at: outcome.segment.last_modified_at.map(rfc3339),
    })
}

/// 표시 ID(`"3.2"`)로 세그먼트 ID 찾기
pub fn find_by_display_id(
    state: &AppState,
    user: &UserIdentity,
    project_id: &str,
    display_id: &str,
) -> CommandResult<String> {
    if project_id.trim().is_empty() || display_id.trim().is_empty() {
        return Err(EditorError::Validation("Missing project id or display id".to_string()).into());
    }
    let parsed: DisplayId = display_id.parse()?;
    let segment = state.db.with(|db| {
        db.ensure_access(project_id, user.id)?;
        db.find_segment_by_display_id(project_id, parsed)
    })?;
    Ok(segment.id)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchProjectArgs {
    pub project_id: String,
    pub query: String,
    #[serde(default)]
    pub field: SearchField,
}

/// 원문/번역문 부분 문자열 검색
pub fn search_project(state: &AppState, user: &UserIdentity, args: SearchProjectArgs) -> CommandResult<Vec<SearchHit>> {
    Ok(state.db.with(|db| {
        db.ensure_access(&args.project_id, user.id)?;
        db.search_segments(&args.project_id, &args.query, args.field)
    })?)
}

/// 문단 전체를 첫 세그먼트로 병합
pub async fn merge_paragraph(state: &AppState, user: &UserIdentity, paragraph_id: &str) -> CommandResult<MergeOutcome> {
    Ok(state.engine.merge_paragraph(paragraph_id, user).await?)
}

/// 직전 세그먼트로 병합
pub async fn merge_with_previous(
    state: &AppState,
    user: &UserIdentity,
    segment_id: &str,
) -> CommandResult<PreviousMerge> {
    state
        .engine
        .merge_with_previous(segment_id, user)
        .await
        .map_err(CommandError::from)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckTermsArgs {
    pub segment_id: String,
    /// 없으면 저장된 번역문 검사
    pub translation: Option<String>,
}

/// 번역문에 빠진 필수 용어
pub fn check_segment_terms(state: &AppState, user: &UserIdentity, args: CheckTermsArgs) -> CommandResult<Vec<TermMatch>> {
    let (segment, entries) = state.db.with(|db| {
        let context = db.segment_context(&args.segment_id)?;
        db.ensure_access(&context.project.id, user.id)?;
        Ok((context.segment, db.glossary_entries(user.id)?))
    })?;

    let translation = args.translation.as_deref().unwrap_or(&segment.target_text);
    Ok(glossary::check_required_terms(&segment.source_text, translation, &entries)
        .into_iter()
        .map(TermMatch::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::project::{create_project, CreateProjectArgs};
    use crate::commands::tests::{owner, reviewer, test_state};
    use crate::references::ReferenceKind;

    fn setup(state: &AppState, paragraphs: &[&str]) -> String {
        let summary = create_project(
            state,
            &owner(),
            CreateProjectArgs {
                filename: "doc.docx".into(),
                source_lang: "es".into(),
                target_lang: "en".into(),
                paragraphs: paragraphs.iter().map(|p| p.to_string()).collect(),
            },
        )
        .unwrap();
        summary.project.id
    }

    fn segment_id(state: &AppState, project_id: &str, display_id: &str) -> String {
        find_by_display_id(state, &owner(), project_id, display_id).unwrap()
    }

    #[tokio::test]
    async fn test_detail_includes_memory_glossary_and_scripture() {
        let state = test_state();
        let project_id = setup(&state, &["Porque de tal manera amó Dios al mundo. Juan 3:16 lo dice."]);
        state
            .db
            .with(|db| {
                db.tm_upsert(1, "ES-EN", "Porque de tal manera amó Dios al mundo.", "For God so loved the world.")?;
                db.glossary_add(1, None, "Dios", "God", None)
            })
            .unwrap();

        let first = segment_id(&state, &project_id, "1.1");
        let detail = get_segment(&state, &owner(), &first).await.unwrap();
        assert_eq!(detail.display_id, "1.1");
        assert_eq!(detail.tm_score, 100);
        assert_eq!(detail.tm_match.as_deref(), Some("For God so loved the world."));
        assert_eq!(detail.glossary_matches.len(), 1);
        assert!(detail.lock.is_none());
        assert!(detail.last_modified_by_name.is_none());

        let second = segment_id(&state, &project_id, "1.2");
        let detail = get_segment(&state, &owner(), &second).await.unwrap();
        assert_eq!(detail.scripture.kind, ReferenceKind::Scripture);
        assert_eq!(detail.tm_score, 0);
    }

    #[tokio::test]
    async fn test_outsider_cannot_read_segment() {
        let state = test_state();
        let project_id = setup(&state, &["Hola."]);
        let first = segment_id(&state, &project_id, "1.1");

        let err = get_segment(&state, &reviewer(), &first).await.unwrap_err();
        assert_eq!(err.code, "UNAUTHORIZED");
        let err = get_segment(&state, &owner(), "missing").await.unwrap_err();
        assert_eq!(err.code, "SEGMENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_save_propagates_and_records_editor() {
        let state = test_state();
        let project_id = setup(&state, &["Amén.", "Amén."]);
        let first = segment_id(&state, &project_id, "1.1");
        let second = segment_id(&state, &project_id, "2.1");

        let result = save_segment(
            &state,
            &owner(),
            SaveSegmentArgs {
                segment_id: first.clone(),
                target_text: "Amen.".into(),
                note: String::new(),
            },
        )
        .await
        .unwrap();
        assert_eq!(result.propagated_segment_ids, vec![second.clone()]);
        assert!(result.last_modified_at.is_some());

        let detail = get_segment(&state, &owner(), &second).await.unwrap();
        assert_eq!(detail.target_text, "Amen.");
        assert_eq!(detail.last_modified_by_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_display_id_validation() {
        let state = test_state();
        let project_id = setup(&state, &["Uno. Dos."]);

        assert_eq!(find_by_display_id(&state, &owner(), &project_id, "1.x").unwrap_err().status(), 400);
        assert_eq!(find_by_display_id(&state, &owner(), &project_id, "").unwrap_err().status(), 400);
        assert_eq!(
            find_by_display_id(&state, &owner(), &project_id, "4.1").unwrap_err().code,
            "PARAGRAPH_NOT_FOUND"
        );
        assert_eq!(
            find_by_display_id(&state, &owner(), &project_id, "1.3").unwrap_err().code,
            "SEGMENT_NOT_FOUND"
        );
    }

    #[test]
    fn test_search_project_preview() {
        let state = test_state();
        let project_id = setup(&state, &["La gracia de Dios. Otra frase."]);
        let hits = search_project(
            &state,
            &owner(),
            SearchProjectArgs {
                project_id,
                query: "GRACIA".into(),
                field: SearchField::Source,
            },
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].display_id, "1.1");
        assert_eq!(hits[0].preview, "La gracia de Dios....");
    }

    #[tokio::test]
    async fn test_merges() {
        let state = test_state();
        let project_id = setup(&state, &["Uno. Dos. Tres."]);
        let first = segment_id(&state, &project_id, "1.1");
        let second = segment_id(&state, &project_id, "1.2");

        let err = merge_with_previous(&state, &owner(), &first).await.unwrap_err();
        assert_eq!(err.code, "NO_PREVIOUS_SEGMENT");
        assert_eq!(err.status(), 400);

        let merged = merge_with_previous(&state, &owner(), &second).await.unwrap();
        assert_eq!(merged.segment.source_text, "Uno. Dos.");

        let paragraph_id = merged.segment.paragraph_id.clone();
        match merge_paragraph(&state, &owner(), &paragraph_id).await.unwrap() {
            MergeOutcome::Merged { segment_id, .. } => assert_eq!(segment_id, first),
            MergeOutcome::NoChange => panic!("expected merge"),
        }
        assert_eq!(
            merge_paragraph(&state, &owner(), &paragraph_id).await.unwrap(),
            MergeOutcome::NoChange
        );
    }

    #[test]
    fn test_check_terms_uses_saved_or_given_translation() {
        let state = test_state();
        let project_id = setup(&state, &["La gracia basta."]);
        state
            .db
            .with(|db| db.glossary_add(1, None, "gracia", "grace", None))
            .unwrap();
        let first = segment_id(&state, &project_id, "1.1");

        let missing = check_segment_terms(
            &state,
            &owner(),
            CheckTermsArgs {
                segment_id: first.clone(),
                translation: None,
            },
        )
        .unwrap();
        assert_eq!(missing.len(), 1);

        let ok = check_segment_terms(
            &state,
            &owner(),
            CheckTermsArgs {
                segment_id: first,
                translation: Some("Grace is enough.".into()),
            },
        )
        .unwrap();
        assert!(ok.is_empty());
    }
}
