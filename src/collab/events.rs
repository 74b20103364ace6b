//! Collaboration Events
//!
//! 프로젝트 룸 참가자에게 전달되는 알림 이벤트.
//! 직렬화 형태: `{"event": "<이름>", "data": {...}}`

use serde::{Deserialize, Serialize};

use crate::models::{UserId, UserIdentity};

/// 참가자 요약 (user_joined / current_users 페이로드)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&UserIdentity> for ParticipantInfo {
    fn from(user: &UserIdentity) -> Self {
        Self {
            user_id: user.id,
            name: user.display_name(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum CollabEvent {
    UserJoined(ParticipantInfo),
    CurrentUsers(Vec<ParticipantInfo>),
    UserLeft {
        user_id: UserId,
    },
    SegmentUpdated {
        segment_id: String,
        target_text: String,
        note: String,
        user_id: UserId,
        user_name: String,
        last_modified_by_name: String,
        /// RFC 3339
        last_modified_at: String,
    },
    UserTyping {
        user_id: UserId,
        name: String,
        segment_id: Option<String>,
    },
    SegmentLocked {
        segment_id: String,
        user_id: UserId,
        user_name: String,
    },
    SegmentUnlocked {
        segment_id: String,
    },
}

impl CollabEvent {
    /// 와이어 이벤트 이름
    pub fn event_name(&self) -> &'static str {
        match self {
            CollabEvent::UserJoined(_) => "user_joined",
            CollabEvent::CurrentUsers(_) => "current_users",
            CollabEvent::UserLeft { .. } => "user_left",
            CollabEvent::SegmentUpdated { .. } => "segment_updated",
            CollabEvent::UserTyping { .. } => "user_typing",
            CollabEvent::SegmentLocked { .. } => "segment_locked",
            CollabEvent::SegmentUnlocked { .. } => "segment_unlocked",
        }
    }
}
