//! Database Schema
//!
//! SQLite 테이블 스키마 정의

/// 데이터베이스 스키마 생성 SQL
pub const CREATE_SCHEMA: &str = r#"
-- 사용자 레지스트리 (인증은 외부, 표시 이름 조회용)
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    email TEXT NOT NULL,
    name TEXT,
    updated_at INTEGER NOT NULL
);

-- 프로젝트 테이블
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    owner_id INTEGER NOT NULL,
    filename TEXT NOT NULL,
    source_lang TEXT NOT NULL,
    target_lang TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_projects_owner ON projects(owner_id);

-- 협업자 배정
CREATE TABLE IF NOT EXISTS project_assignments (
    project_id TEXT NOT NULL,
    user_id INTEGER NOT NULL,
    role TEXT NOT NULL DEFAULT 'reviewer',
    assigned_at INTEGER NOT NULL,
    PRIMARY KEY (project_id, user_id),
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

-- 문단 테이블 (빈 문단도 자리표시자로 저장)
CREATE TABLE IF NOT EXISTS paragraphs (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    original_text TEXT NOT NULL,
    UNIQUE (project_id, position),
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

-- 세그먼트 테이블 (병합 후 position 간격 허용)
CREATE TABLE IF NOT EXISTS segments (
    id TEXT PRIMARY KEY,
    paragraph_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    source_text TEXT NOT NULL,
    target_text TEXT NOT NULL DEFAULT '',
    note TEXT NOT NULL DEFAULT '',
    last_modified_by INTEGER,
    last_modified_at INTEGER,
    locked_by INTEGER,
    locked_at INTEGER,
    UNIQUE (paragraph_id, position),
    FOREIGN KEY (paragraph_id) REFERENCES paragraphs(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_segments_source ON segments(source_text);

-- 번역 메모리 ((소유자, 언어쌍, 정규화 원문)당 1건)
CREATE TABLE IF NOT EXISTS translation_memory (
    id TEXT PRIMARY KEY,
    owner_id INTEGER NOT NULL,
    lang_pair TEXT NOT NULL,
    source_norm TEXT NOT NULL,
    source_text TEXT NOT NULL,
    target_text TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (owner_id, lang_pair, source_norm)
);

-- 용어집 (입력 순서 = rowid 순서)
CREATE TABLE IF NOT EXISTS glossary_entries (
    id TEXT PRIMARY KEY,
    owner_id INTEGER NOT NULL,
    lang_pair TEXT,
    source_term TEXT NOT NULL,
    target_term TEXT NOT NULL,
    description TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_glossary_owner ON glossary_entries(owner_id);

-- 감사 로그 (추가 전용, 프로젝트 삭제 후에도 유지)
CREATE TABLE IF NOT EXISTS audit_log (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    user_id INTEGER,
    segment_id TEXT,
    action TEXT NOT NULL CHECK (action IN ('join', 'leave', 'edit', 'merge')),
    timestamp INTEGER NOT NULL,
    details TEXT
);

CREATE INDEX IF NOT EXISTS idx_audit_project ON audit_log(project_id);
CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
"#;
