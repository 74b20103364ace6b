//! Document Model Storage
//!
//! 프로젝트 → 문단 → 세그먼트 저장/조회, 편집 커밋(번역 메모리 갱신 + 동일 원문 전파),
//! 병합, 내보내기. 여러 단계로 이루어진 쓰기는 모두 하나의 트랜잭션입니다.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{memory, new_id, now_millis, project_from_row, Database, PROJECT_COLUMNS};
use crate::document::{self, DisplayId, MergeOutcome};
use crate::error::EditorError;
use crate::models::{Paragraph, Project, Segment, UserId};
use crate::segmenter::ParagraphDraft;
use crate::utils::preview;

const SEGMENT_COLUMNS: &str = "s.id, s.paragraph_id, s.position, s.source_text, s.target_text, s.note, \
                               s.last_modified_by, s.last_modified_at, s.locked_by, s.locked_at";

const PARAGRAPH_COLUMNS: &str = "p.id, p.project_id, p.position, p.original_text";

/// 검색 미리보기 길이 (문자)
const PREVIEW_CHARS: usize = 60;

fn segment_from_row(row: &Row<'_>) -> rusqlite::Result<Segment> {
    Ok(Segment {
        id: row.get(0)?,
        paragraph_id: row.get(1)?,
        position: row.get(2)?,
        source_text: row.get(3)?,
        target_text: row.get(4)?,
        note: row.get(5)?,
        last_modified_by: row.get(6)?,
        last_modified_at: row.get(7)?,
        locked_by: row.get(8)?,
        locked_at: row.get(9)?,
    })
}

fn paragraph_from_row(row: &Row<'_>) -> rusqlite::Result<Paragraph> {
    Ok(Paragraph {
        id: row.get(0)?,
        project_id: row.get(1)?,
        position: row.get(2)?,
        original_text: row.get(3)?,
    })
}

fn load_segment(conn: &Connection, segment_id: &str) -> Result<Segment, EditorError> {
    conn.query_row(
        &format!("SELECT {} FROM segments s WHERE s.id = ?1", SEGMENT_COLUMNS),
        [segment_id],
        segment_from_row,
    )
    .optional()?
    .ok_or_else(|| EditorError::SegmentNotFound(segment_id.to_string()))
}

fn load_paragraph(conn: &Connection, paragraph_id: &str) -> Result<Paragraph, EditorError> {
    conn.query_row(
        &format!("SELECT {} FROM paragraphs p WHERE p.id = ?1", PARAGRAPH_COLUMNS),
        [paragraph_id],
        paragraph_from_row,
    )
    .optional()?
    .ok_or_else(|| EditorError::ParagraphNotFound(paragraph_id.to_string()))
}

fn load_paragraph_segments(conn: &Connection, paragraph_id: &str) -> Result<Vec<Segment>, EditorError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM segments s WHERE s.paragraph_id = ?1 ORDER BY s.position",
        SEGMENT_COLUMNS
    ))?;
    let iter = stmt.query_map([paragraph_id], segment_from_row)?;
    let mut out = Vec::new();
    for segment in iter {
        out.push(segment?);
    }
    Ok(out)
}

fn load_context(conn: &Connection, segment_id: &str) -> Result<SegmentContext, EditorError> {
    let segment = load_segment(conn, segment_id)?;
    let paragraph = load_paragraph(conn, &segment.paragraph_id)?;
    let project = conn
        .query_row(
            &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS),
            [&paragraph.project_id],
            project_from_row,
        )
        .optional()?
        .ok_or_else(|| EditorError::ProjectNotFound(paragraph.project_id.clone()))?;
    Ok(SegmentContext {
        segment,
        paragraph,
        project,
    })
}

/// 세그먼트 + 소속 문단 + 프로젝트
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentContext {
    pub segment: Segment,
    pub paragraph: Paragraph,
    pub project: Project,
}

/// 문서 통계
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentStats {
    pub paragraphs: usize,
    pub segments: usize,
    pub translated: usize,
}

/// 편집 커밋 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub project_id: String,
    pub segment: Segment,
    /// 동일 원문으로 전파되어 갱신된 다른 세그먼트
    pub propagated: Vec<Segment>,
}

/// 이전 세그먼트 병합 결과
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PreviousMerge {
    pub segment: Segment,
    pub removed_segment_id: String,
}

/// 검색 대상 필드
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    #[default]
    Source,
    Target,
}

/// 프로젝트 검색 결과
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchHit {
    pub segment_id: String,
    pub display_id: String,
    pub preview: String,
    pub match_text: String,
}

impl Database {
    /// 프로젝트 생성 + 분할된 문서 저장 (단일 트랜잭션)
    pub fn create_project(
        &self,
        owner_id: UserId,
        filename: &str,
        source_lang: &str,
        target_lang: &str,
        drafts: &[ParagraphDraft],
    ) -> Result<Project, EditorError> {
        let project = Project {
            id: new_id(),
            owner_id,
            filename: filename.to_string(),
            source_lang: source_lang.trim().to_string(),
            target_lang: target_lang.trim().to_string(),
            created_at: now_millis(),
        };

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO projects (id, owner_id, filename, source_lang, target_lang, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                &project.id,
                project.owner_id,
                &project.filename,
                &project.source_lang,
                &project.target_lang,
                project.created_at,
            ),
        )?;

        for (p_idx, draft) in drafts.iter().enumerate() {
            let paragraph_id = new_id();
            tx.execute(
                "INSERT INTO paragraphs (id, project_id, position, original_text) VALUES (?1, ?2, ?3, ?4)",
                (&paragraph_id, &project.id, p_idx as i64, &draft.original_text),
            )?;
            for (s_idx, source) in draft.segments.iter().enumerate() {
                tx.execute(
                    "INSERT INTO segments (id, paragraph_id, position, source_text) VALUES (?1, ?2, ?3, ?4)",
                    (new_id(), &paragraph_id, s_idx as i64, source),
                )?;
            }
        }

        tx.commit()?;
        Ok(project)
    }

    pub fn get_paragraph(&self, paragraph_id: &str) -> Result<Paragraph, EditorError> {
        load_paragraph(&self.conn, paragraph_id)
    }

    /// 프로젝트 문단 목록 (문서 순서)
    pub fn paragraphs(&self, project_id: &str) -> Result<Vec<Paragraph>, EditorError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM paragraphs p WHERE p.project_id = ?1 ORDER BY p.position",
            PARAGRAPH_COLUMNS
        ))?;
        let iter = stmt.query_map([project_id], paragraph_from_row)?;
        let mut out = Vec::new();
        for paragraph in iter {
            out.push(paragraph?);
        }
        Ok(out)
    }

    pub fn segments_of_paragraph(&self, paragraph_id: &str) -> Result<Vec<Segment>, EditorError> {
        load_paragraph_segments(&self.conn, paragraph_id)
    }

    /// 문단별로 묶은 전체 문서 (세그먼트는 한 번의 쿼리로 로드)
    pub fn project_outline(&self, project_id: &str) -> Result<Vec<(Paragraph, Vec<Segment>)>, EditorError> {
        let paragraphs = self.paragraphs(project_id)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM segments s JOIN paragraphs p ON p.id = s.paragraph_id
             WHERE p.project_id = ?1 ORDER BY p.position, s.position",
            SEGMENT_COLUMNS
        ))?;
        let iter = stmt.query_map([project_id], segment_from_row)?;

        let mut by_paragraph: std::collections::HashMap<String, Vec<Segment>> = std::collections::HashMap::new();
        for segment in iter {
            let segment = segment?;
            by_paragraph.entry(segment.paragraph_id.clone()).or_default().push(segment);
        }

        Ok(paragraphs
            .into_iter()
            .map(|p| {
                let segments = by_paragraph.remove(&p.id).unwrap_or_default();
                (p, segments)
            })
            .collect())
    }

    pub fn document_stats(&self, project_id: &str) -> Result<DocumentStats, EditorError> {
        let outline = self.project_outline(project_id)?;
        let mut stats = DocumentStats {
            paragraphs: outline.len(),
            ..Default::default()
        };
        for (_, segments) in &outline {
            stats.segments += segments.len();
            stats.translated += segments.iter().filter(|s| !s.target_text.trim().is_empty()).count();
        }
        Ok(stats)
    }

    pub fn get_segment(&self, segment_id: &str) -> Result<Segment, EditorError> {
        load_segment(&self.conn, segment_id)
    }

    /// 세그먼트와 상위 문단/프로젝트
    pub fn segment_context(&self, segment_id: &str) -> Result<SegmentContext, EditorError> {
        load_context(&self.conn, segment_id)
    }

    /// 표시 ID로 세그먼트 찾기
    pub fn find_segment_by_display_id(&self, project_id: &str, display_id: DisplayId) -> Result<Segment, EditorError> {
        let paragraph_id: String = self
            .conn
            .query_row(
                "SELECT id FROM paragraphs WHERE project_id = ?1 AND position = ?2",
                (project_id, display_id.paragraph_position()),
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| EditorError::ParagraphNotFound(display_id.to_string()))?;

        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM segments s WHERE s.paragraph_id = ?1 AND s.position = ?2",
                    SEGMENT_COLUMNS
                ),
                (&paragraph_id, display_id.segment_position()),
                segment_from_row,
            )
            .optional()?
            .ok_or_else(|| EditorError::SegmentNotFound(display_id.to_string()))
    }

    /// 원문 또는 번역문 부분 문자열 검색 (대소문자 무시)
    pub fn search_segments(
        &self,
        project_id: &str,
        query: &str,
        field: SearchField,
    ) -> Result<Vec<SearchHit>, EditorError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits = Vec::new();
        for (paragraph, segments) in self.project_outline(project_id)? {
            for segment in segments {
                let haystack = match field {
                    SearchField::Source => &segment.source_text,
                    SearchField::Target => &segment.target_text,
                };
                if !haystack.to_lowercase().contains(&needle) {
                    continue;
                }
                hits.push(SearchHit {
                    display_id: DisplayId::from_positions(paragraph.position, segment.position).to_string(),
                    preview: preview(&segment.source_text, PREVIEW_CHARS),
                    match_text: haystack.clone(),
                    segment_id: segment.id,
                });
            }
        }
        Ok(hits)
    }

    /// 번역 저장 커밋
    ///
    /// 번역문/메모 갱신, 번역 메모리 upsert (편집자 소유), 같은 프로젝트에서 원문이 동일하고
    /// 번역문이 비어 있는 다른 세그먼트로 전파. 잠금 소유 여부는 확인하지 않습니다.
    pub fn commit_edit(
        &self,
        segment_id: &str,
        target_text: &str,
        note: &str,
        editor: UserId,
        now: i64,
    ) -> Result<EditOutcome, EditorError> {
        let tx = self.conn.unchecked_transaction()?;
        let context = load_context(&tx, segment_id)?;

        tx.execute(
            "UPDATE segments SET target_text = ?1, note = ?2, last_modified_by = ?3, last_modified_at = ?4
             WHERE id = ?5",
            (target_text, note, editor, now, segment_id),
        )?;

        if !target_text.trim().is_empty() {
            memory::upsert_tm(
                &tx,
                editor,
                &context.project.language_pair(),
                &context.segment.source_text,
                target_text,
                now,
            )?;
        }

        let mut propagated = Vec::new();
        if !target_text.is_empty() {
            let ids: Vec<String> = {
                let mut stmt = tx.prepare(
                    "SELECT s.id FROM segments s JOIN paragraphs p ON p.id = s.paragraph_id
                     WHERE p.project_id = ?1 AND s.source_text = ?2 AND s.id != ?3 AND s.target_text = ''
                     ORDER BY p.position, s.position",
                )?;
                let iter = stmt.query_map(
                    (&context.project.id, &context.segment.source_text, segment_id),
                    |row| row.get::<_, String>(0),
                )?;
                let mut ids = Vec::new();
                for id in iter {
                    ids.push(id?);
                }
                ids
            };

            for id in &ids {
                tx.execute(
                    "UPDATE segments SET target_text = ?1, last_modified_by = ?2, last_modified_at = ?3
                     WHERE id = ?4",
                    (target_text, editor, now, id),
                )?;
                propagated.push(load_segment(&tx, id)?);
            }
        }

        let segment = load_segment(&tx, segment_id)?;
        tx.commit()?;

        Ok(EditOutcome {
            project_id: context.project.id,
            segment,
            propagated,
        })
    }

    /// 문단의 모든 세그먼트를 첫 세그먼트로 병합 (all-or-nothing)
    pub fn merge_paragraph(&self, paragraph_id: &str) -> Result<MergeOutcome, EditorError> {
        let tx = self.conn.unchecked_transaction()?;
        load_paragraph(&tx, paragraph_id)?;
        let segments = load_paragraph_segments(&tx, paragraph_id)?;

        if segments.len() <= 1 {
            return Ok(MergeOutcome::NoChange);
        }
        let Some(merged) = document::combine(&segments) else {
            return Ok(MergeOutcome::NoChange);
        };

        let first = &segments[0];
        tx.execute(
            "UPDATE segments SET source_text = ?1, target_text = ?2, note = ?3 WHERE id = ?4",
            (&merged.source, &merged.target, &merged.note, &first.id),
        )?;

        let mut removed = Vec::with_capacity(segments.len() - 1);
        for segment in &segments[1..] {
            tx.execute("DELETE FROM segments WHERE id = ?1", [&segment.id])?;
            removed.push(segment.id.clone());
        }

        tx.commit()?;
        Ok(MergeOutcome::Merged {
            segment_id: first.id.clone(),
            removed_segment_ids: removed,
        })
    }

    /// 세그먼트를 같은 문단의 직전 세그먼트(위치 기준)로 병합
    pub fn merge_with_previous(&self, segment_id: &str) -> Result<PreviousMerge, EditorError> {
        let tx = self.conn.unchecked_transaction()?;
        let current = load_segment(&tx, segment_id)?;

        let previous = tx
            .query_row(
                &format!(
                    "SELECT {} FROM segments s WHERE s.paragraph_id = ?1 AND s.position < ?2
                     ORDER BY s.position DESC LIMIT 1",
                    SEGMENT_COLUMNS
                ),
                (&current.paragraph_id, current.position),
                segment_from_row,
            )
            .optional()?
            .ok_or_else(|| EditorError::NoPredecessor(segment_id.to_string()))?;

        let Some(merged) = document::combine([&previous, &current]) else {
            return Err(EditorError::NoPredecessor(segment_id.to_string()));
        };

        tx.execute(
            "UPDATE segments SET source_text = ?1, target_text = ?2, note = ?3 WHERE id = ?4",
            (&merged.source, &merged.target, &merged.note, &previous.id),
        )?;
        tx.execute("DELETE FROM segments WHERE id = ?1", [segment_id])?;

        let segment = load_segment(&tx, &previous.id)?;
        tx.commit()?;

        Ok(PreviousMerge {
            segment,
            removed_segment_id: current.id,
        })
    }

    /// 내보내기용 문단 텍스트 목록
    pub fn export_paragraphs(&self, project_id: &str) -> Result<Vec<String>, EditorError> {
        Ok(self
            .project_outline(project_id)?
            .iter()
            .map(|(paragraph, segments)| document::paragraph_export_text(paragraph, segments))
            .collect())
    }

    /// 잠금 상태 미러링 (None이면 해제)
    pub fn set_segment_lock(&self, segment_id: &str, holder: Option<(UserId, i64)>) -> Result<(), EditorError> {
        let (locked_by, locked_at) = match holder {
            Some((user_id, at)) => (Some(user_id), Some(at)),
            None => (None, None),
        };
        self.conn.execute(
            "UPDATE segments SET locked_by = ?1, locked_at = ?2 WHERE id = ?3",
            (locked_by, locked_at, segment_id),
        )?;
        Ok(())
    }

    /// 모든 잠금 미러 초기화 (재시작 시 전부 Unlocked)
    pub fn clear_all_segment_locks(&self) -> Result<usize, EditorError> {
        let cleared = self.conn.execute(
            "UPDATE segments SET locked_by = NULL, locked_at = NULL WHERE locked_by IS NOT NULL",
            [],
        )?;
        Ok(cleared)
    }
}
