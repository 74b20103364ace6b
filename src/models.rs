//! Editor Data Models
//!
//! 프로젝트 → 문단 → 세그먼트 문서 모델과 번역 메모리/용어집/감사 로그 레코드

use serde::{Deserialize, Serialize};

/// 외부 인증 시스템이 발급한 사용자 ID
pub type UserId = i64;

/// 현재 요청을 수행하는 사용자
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: UserId,
    pub name: Option<String>,
    pub email: String,
}

impl UserIdentity {
    pub fn new(id: UserId, name: Option<&str>, email: &str) -> Self {
        Self {
            id,
            name: name.map(str::to_string),
            email: email.to_string(),
        }
    }

    /// 표시 이름 (이름이 없으면 이메일의 로컬 파트)
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or(&self.email)
                .to_string(),
        }
    }
}

/// 번역 프로젝트 (문서 1건)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub owner_id: UserId,
    pub filename: String,
    pub source_lang: String,
    pub target_lang: String,
    pub created_at: i64,
}

impl Project {
    /// 번역 메모리 범위 키 (예: "EN-ES")
    pub fn language_pair(&self) -> String {
        language_pair(&self.source_lang, &self.target_lang)
    }
}

pub fn language_pair(source_lang: &str, target_lang: &str) -> String {
    format!(
        "{}-{}",
        source_lang.trim().to_uppercase(),
        target_lang.trim().to_uppercase()
    )
}

/// 문서의 구조적 문단
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Paragraph {
    pub id: String,
    pub project_id: String,
    /// 문서 내 위치 (0-based, 빈 문단 포함)
    pub position: i64,
    /// 원문 전체 (컨텍스트 표시용)
    pub original_text: String,
}

/// 편집 가능한 최소 번역 단위
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Segment {
    pub id: String,
    pub paragraph_id: String,
    /// 문단 내 위치. 병합 후 빈 번호가 생길 수 있음
    pub position: i64,
    pub source_text: String,
    pub target_text: String,
    pub note: String,
    pub last_modified_by: Option<UserId>,
    pub last_modified_at: Option<i64>,
    pub locked_by: Option<UserId>,
    pub locked_at: Option<i64>,
}

impl Segment {
    /// 내보내기 텍스트: 번역문이 비어 있으면 원문
    pub fn export_text(&self) -> &str {
        if self.target_text.is_empty() {
            &self.source_text
        } else {
            &self.target_text
        }
    }
}

/// 번역 메모리 엔트리
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TmEntry {
    pub id: String,
    pub owner_id: UserId,
    pub lang_pair: String,
    /// 정규화된 원문 (조회 키)
    pub source_norm: String,
    pub source_text: String,
    pub target_text: String,
    pub updated_at: i64,
}

/// 용어집 엔트리
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlossaryEntry {
    pub id: String,
    pub owner_id: UserId,
    pub lang_pair: Option<String>,
    pub source_term: String,
    pub target_term: String,
    pub description: Option<String>,
}

/// 용어 매칭 결과 (원문 용어, 대상 용어)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TermMatch {
    pub source_term: String,
    pub target_term: String,
}

impl From<&GlossaryEntry> for TermMatch {
    fn from(entry: &GlossaryEntry) -> Self {
        Self {
            source_term: entry.source_term.clone(),
            target_term: entry.target_term.clone(),
        }
    }
}

/// 감사 로그 액션
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Join,
    Leave,
    Edit,
    Merge,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Join => "join",
            AuditAction::Leave => "leave",
            AuditAction::Edit => "edit",
            AuditAction::Merge => "merge",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "join" => Some(AuditAction::Join),
            "leave" => Some(AuditAction::Leave),
            "edit" => Some(AuditAction::Edit),
            "merge" => Some(AuditAction::Merge),
            _ => None,
        }
    }
}

/// 추가 전용 감사 로그 레코드
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEvent {
    pub id: String,
    pub project_id: String,
    pub user_id: Option<UserId>,
    pub segment_id: Option<String>,
    pub action: AuditAction,
    pub timestamp: i64,
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_email_local_part() {
        let named = UserIdentity::new(1, Some("Ana"), "ana@example.org");
        let unnamed = UserIdentity::new(2, None, "luis@example.org");
        let blank = UserIdentity::new(3, Some("  "), "eva@example.org");

        assert_eq!(named.display_name(), "Ana");
        assert_eq!(unnamed.display_name(), "luis");
        assert_eq!(blank.display_name(), "eva");
    }

    #[test]
    fn test_language_pair_is_uppercased() {
        assert_eq!(language_pair("en", " es "), "EN-ES");
    }

    #[test]
    fn test_export_text_prefers_target() {
        let mut seg = Segment {
            id: "s".into(),
            paragraph_id: "p".into(),
            position: 0,
            source_text: "Hello".into(),
            target_text: String::new(),
            note: String::new(),
            last_modified_by: None,
            last_modified_at: None,
            locked_by: None,
            locked_at: None,
        };
        assert_eq!(seg.export_text(), "Hello");
        seg.target_text = "Hola".into();
        assert_eq!(seg.export_text(), "Hola");
    }
}
