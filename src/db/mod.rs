//! Database Module
//!
//! SQLite 데이터베이스 관리 (프로젝트/문서 모델/번역 메모리/용어집/감사 로그)

mod document;
mod memory;
mod schema;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::EditorError;
use crate::models::{AuditAction, AuditEvent, Project, UserId, UserIdentity};

pub use document::{DocumentStats, EditOutcome, PreviousMerge, SearchField, SearchHit, SegmentContext};
pub use memory::{GlossaryRow, ImportReport};

/// 데이터베이스 상태 (명령 계층과 협업 엔진이 공유)
pub struct DbState(pub Mutex<Database>);

impl DbState {
    pub fn new(db: Database) -> Self {
        Self(Mutex::new(db))
    }

    /// 잠금을 잡고 클로저 실행
    pub fn with<T>(&self, f: impl FnOnce(&Database) -> Result<T, EditorError>) -> Result<T, EditorError> {
        let db = self.0.lock()?;
        f(&db)
    }
}

/// 데이터베이스 래퍼
pub struct Database {
    conn: Connection,
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

const PROJECT_COLUMNS: &str = "id, owner_id, filename, source_lang, target_lang, created_at";

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        filename: row.get(2)?,
        source_lang: row.get(3)?,
        target_lang: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl Database {
    /// 새 데이터베이스 연결 생성
    pub fn new(path: &Path) -> Result<Self, EditorError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// 메모리 DB (테스트/임시 세션용)
    pub fn open_in_memory() -> Result<Self, EditorError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// 데이터베이스 스키마 초기화
    pub fn initialize(&self) -> Result<(), EditorError> {
        self.conn.execute_batch(schema::CREATE_SCHEMA)?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // 사용자
    // ---------------------------------------------------------------------

    /// 사용자 레지스트리 갱신 (표시 이름 조회용)
    pub fn upsert_user(&self, user: &UserIdentity) -> Result<(), EditorError> {
        self.conn.execute(
            "INSERT INTO users (id, email, name, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET email = excluded.email, name = excluded.name,
                                           updated_at = excluded.updated_at",
            (user.id, &user.email, &user.name, now_millis()),
        )?;
        Ok(())
    }

    pub fn get_user(&self, user_id: UserId) -> Result<Option<UserIdentity>, EditorError> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name, email FROM users WHERE id = ?1",
                [user_id],
                |row| {
                    Ok(UserIdentity {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserIdentity>, EditorError> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name, email FROM users WHERE lower(email) = lower(?1)",
                [email.trim()],
                |row| {
                    Ok(UserIdentity {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// 표시 이름 (미등록 사용자는 None)
    pub fn user_display_name(&self, user_id: UserId) -> Result<Option<String>, EditorError> {
        Ok(self.get_user(user_id)?.map(|u| u.display_name()))
    }

    // ---------------------------------------------------------------------
    // 프로젝트
    // ---------------------------------------------------------------------

    pub fn get_project(&self, project_id: &str) -> Result<Project, EditorError> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS),
                [project_id],
                project_from_row,
            )
            .optional()?
            .ok_or_else(|| EditorError::ProjectNotFound(project_id.to_string()))
    }

    /// 사용자가 소유하거나 배정된 프로젝트 목록 (최신순)
    pub fn list_projects_for_user(&self, user_id: UserId) -> Result<Vec<Project>, EditorError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM projects
             WHERE owner_id = ?1
                OR id IN (SELECT project_id FROM project_assignments WHERE user_id = ?1)
             ORDER BY created_at DESC",
            PROJECT_COLUMNS
        ))?;
        let iter = stmt.query_map([user_id], project_from_row)?;
        let mut out = Vec::new();
        for project in iter {
            out.push(project?);
        }
        Ok(out)
    }

    /// 프로젝트 삭제 (문단/세그먼트/배정은 cascade)
    pub fn delete_project(&self, project_id: &str) -> Result<(), EditorError> {
        let affected = self.conn.execute("DELETE FROM projects WHERE id = ?1", [project_id])?;
        if affected == 0 {
            return Err(EditorError::ProjectNotFound(project_id.to_string()));
        }
        Ok(())
    }

    /// 협업자 배정. 이미 배정되어 있으면 false
    pub fn assign_user(&self, project_id: &str, user_id: UserId, role: &str) -> Result<bool, EditorError> {
        self.get_project(project_id)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO project_assignments (project_id, user_id, role, assigned_at)
             VALUES (?1, ?2, ?3, ?4)",
            (project_id, user_id, role, now_millis()),
        )?;
        Ok(inserted > 0)
    }

    /// 배정 해제. 배정이 없었으면 false
    pub fn unassign_user(&self, project_id: &str, user_id: UserId) -> Result<bool, EditorError> {
        let removed = self.conn.execute(
            "DELETE FROM project_assignments WHERE project_id = ?1 AND user_id = ?2",
            (project_id, user_id),
        )?;
        Ok(removed > 0)
    }

    /// 사용자의 프로젝트 역할 ("owner" / 배정 역할 / None)
    pub fn project_role(&self, project: &Project, user_id: UserId) -> Result<Option<String>, EditorError> {
        if project.owner_id == user_id {
            return Ok(Some("owner".to_string()));
        }
        let role = self
            .conn
            .query_row(
                "SELECT role FROM project_assignments WHERE project_id = ?1 AND user_id = ?2",
                (&project.id, user_id),
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(role)
    }

    /// 접근 권한 확인. 프로젝트가 없으면 NotFound, 권한이 없으면 Unauthorized
    pub fn ensure_access(&self, project_id: &str, user_id: UserId) -> Result<Project, EditorError> {
        let project = self.get_project(project_id)?;
        if self.project_role(&project, user_id)?.is_none() {
            return Err(EditorError::Unauthorized {
                user_id,
                project_id: project_id.to_string(),
            });
        }
        Ok(project)
    }

    /// 소유자 전용 작업 확인
    pub fn ensure_owner(&self, project_id: &str, user_id: UserId) -> Result<Project, EditorError> {
        let project = self.get_project(project_id)?;
        if project.owner_id != user_id {
            return Err(EditorError::Unauthorized {
                user_id,
                project_id: project_id.to_string(),
            });
        }
        Ok(project)
    }

    // ---------------------------------------------------------------------
    // 감사 로그
    // ---------------------------------------------------------------------

    /// 감사 로그 추가 (추가 전용)
    pub fn append_audit(
        &self,
        project_id: &str,
        user_id: Option<UserId>,
        segment_id: Option<&str>,
        action: AuditAction,
        details: Option<&str>,
        timestamp: i64,
    ) -> Result<String, EditorError> {
        let id = new_id();
        self.conn.execute(
            "INSERT INTO audit_log (id, project_id, user_id, segment_id, action, timestamp, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (&id, project_id, user_id, segment_id, action.as_str(), timestamp, details),
        )?;
        Ok(id)
    }

    /// 프로젝트 감사 로그 (기록 순서)
    pub fn audit_events(&self, project_id: &str) -> Result<Vec<AuditEvent>, EditorError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, user_id, segment_id, action, timestamp, details
             FROM audit_log WHERE project_id = ?1 ORDER BY timestamp, rowid",
        )?;
        let iter = stmt.query_map([project_id], |row| {
            let raw_action: String = row.get(4)?;
            let action = AuditAction::parse(&raw_action).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    format!("unknown audit action: {}", raw_action).into(),
                )
            })?;
            Ok(AuditEvent {
                id: row.get(0)?,
                project_id: row.get(1)?,
                user_id: row.get(2)?,
                segment_id: row.get(3)?,
                action,
                timestamp: row.get(5)?,
                details: row.get(6)?,
            })
        })?;

        let mut out = Vec::new();
        for event in iter {
            out.push(event?);
        }
        Ok(out)
    }
}
