//! Project Commands
//!
//! 프로젝트 생성(문서 분할 + 저장), 조회, 삭제, 협업자 배정, 내보내기

use serde::{Deserialize, Serialize};

use crate::db::DocumentStats;
use crate::docx;
use crate::document::DisplayId;
use crate::error::{CommandError, CommandResult, EditorError};
use crate::models::{AuditEvent, Project, UserIdentity};
use crate::segmenter::segment_document;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectArgs {
    pub filename: String,
    pub source_lang: String,
    pub target_lang: String,
    /// 문서 순서의 문단 원문 (빈 문단 포함)
    pub paragraphs: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDocxArgs {
    pub filename: String,
    pub source_lang: String,
    pub target_lang: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignUserArgs {
    pub project_id: String,
    pub email: String,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub project: Project,
    pub stats: DocumentStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRowDto {
    pub id: String,
    pub display_id: String,
    pub source_text: String,
    pub target_text: String,
    pub note: String,
    pub locked_by: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphDto {
    pub id: String,
    pub position: i64,
    pub original_text: String,
    pub segments: Vec<SegmentRowDto>,
}

/// 에디터 화면용 전체 문서
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    pub project: Project,
    pub role: String,
    pub stats: DocumentStats,
    pub paragraphs: Vec<ParagraphDto>,
}

fn validate_languages(source_lang: &str, target_lang: &str) -> Result<(), EditorError> {
    if source_lang.trim().is_empty() || target_lang.trim().is_empty() {
        return Err(EditorError::Validation(
            "Source and target languages are required".to_string(),
        ));
    }
    Ok(())
}

/// 문단 목록으로 프로젝트 생성
pub fn create_project(
    state: &AppState,
    user: &UserIdentity,
    args: CreateProjectArgs,
) -> CommandResult<ProjectSummary> {
    validate_languages(&args.source_lang, &args.target_lang)?;
    if args.filename.trim().is_empty() {
        return Err(EditorError::Validation("Filename is required".to_string()).into());
    }

    let drafts = segment_document(&args.paragraphs, state.splitter.as_ref());
    let summary = state.db.with(|db| {
        db.upsert_user(user)?;
        let project = db.create_project(user.id, args.filename.trim(), &args.source_lang, &args.target_lang, &drafts)?;
        let stats = db.document_stats(&project.id)?;
        Ok(ProjectSummary { project, stats })
    })?;

    tracing::info!(
        project_id = %summary.project.id,
        user_id = user.id,
        splitter = state.splitter.name(),
        paragraphs = summary.stats.paragraphs,
        segments = summary.stats.segments,
        "project created"
    );
    Ok(summary)
}

/// .docx 업로드로 프로젝트 생성
pub fn create_project_from_docx(
    state: &AppState,
    user: &UserIdentity,
    args: ImportDocxArgs,
) -> CommandResult<ProjectSummary> {
    let paragraphs = docx::read_paragraphs(&args.bytes)?;
    create_project(
        state,
        user,
        CreateProjectArgs {
            filename: args.filename,
            source_lang: args.source_lang,
            target_lang: args.target_lang,
            paragraphs,
        },
    )
}

/// 사용자가 소유하거나 배정된 프로젝트
pub fn list_projects(state: &AppState, user: &UserIdentity) -> CommandResult<Vec<Project>> {
    Ok(state.db.with(|db| db.list_projects_for_user(user.id))?)
}

/// 프로젝트 전체 문서 로드
pub fn load_project(state: &AppState, user: &UserIdentity, project_id: &str) -> CommandResult<ProjectDocument> {
    let document = state.db.with(|db| {
        let project = db.ensure_access(project_id, user.id)?;
        let role = db.project_role(&project, user.id)?.unwrap_or_default();
        let stats = db.document_stats(project_id)?;

        let paragraphs = db
            .project_outline(project_id)?
            .into_iter()
            .map(|(paragraph, segments)| ParagraphDto {
                segments: segments
                    .into_iter()
                    .map(|s| SegmentRowDto {
                        display_id: DisplayId::from_positions(paragraph.position, s.position).to_string(),
                        id: s.id,
                        source_text: s.source_text,
                        target_text: s.target_text,
                        note: s.note,
                        locked_by: s.locked_by,
                    })
                    .collect(),
                id: paragraph.id,
                position: paragraph.position,
                original_text: paragraph.original_text,
            })
            .collect();

        Ok(ProjectDocument {
            project,
            role,
            stats,
            paragraphs,
        })
    })?;
    Ok(document)
}

/// 프로젝트 삭제 (소유자 전용)
pub fn delete_project(state: &AppState, user: &UserIdentity, project_id: &str) -> CommandResult<()> {
    state.db.with(|db| {
        db.ensure_owner(project_id, user.id)?;
        db.delete_project(project_id)
    })?;
    tracing::info!(project_id, user_id = user.id, "project deleted");
    Ok(())
}

/// 이메일로 협업자 배정 (소유자 전용). 이미 배정돼 있으면 `false`
pub fn assign_user(state: &AppState, user: &UserIdentity, args: AssignUserArgs) -> CommandResult<bool> {
    let role = args
        .role
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("reviewer");

    let assigned = state.db.with(|db| {
        db.ensure_owner(&args.project_id, user.id)?;
        let assignee = db
            .find_user_by_email(args.email.trim())?
            .ok_or_else(|| EditorError::Validation(format!("User not found: {}", args.email.trim())))?;
        if assignee.id == user.id {
            return Err(EditorError::Validation("Owner cannot be assigned to own project".to_string()));
        }
        db.assign_user(&args.project_id, assignee.id, role)
    })?;
    Ok(assigned)
}

/// 번역문(없으면 원문)으로 재구성한 문단 목록
pub fn export_paragraphs(state: &AppState, user: &UserIdentity, project_id: &str) -> CommandResult<Vec<String>> {
    Ok(state.db.with(|db| {
        db.ensure_access(project_id, user.id)?;
        db.export_paragraphs(project_id)
    })?)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedDocx {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// 번역 문서 .docx 내보내기
pub fn export_docx(state: &AppState, user: &UserIdentity, project_id: &str) -> CommandResult<ExportedDocx> {
    let (project, paragraphs) = state.db.with(|db| {
        let project = db.ensure_access(project_id, user.id)?;
        let paragraphs = db.export_paragraphs(project_id)?;
        Ok((project, paragraphs))
    })?;

    let bytes = docx::write_paragraphs(&paragraphs).map_err(CommandError::from)?;
    Ok(ExportedDocx {
        filename: format!("translated_{}", project.filename),
        bytes,
    })
}

/// 감사 로그 (기록 순서)
pub fn audit_log(state: &AppState, user: &UserIdentity, project_id: &str) -> CommandResult<Vec<AuditEvent>> {
    Ok(state.db.with(|db| {
        db.ensure_access(project_id, user.id)?;
        db.audit_events(project_id)
    })?)
}
