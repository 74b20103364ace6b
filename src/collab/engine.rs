//! Collaboration Engine
//!
//! 프로젝트별 참가자(presence), 세그먼트 advisory 잠금, 편집/타이핑/잠금 상태 브로드캐스트.
//! 편집 커밋은 번역 메모리 갱신과 동일 원문 전파까지 포함합니다.
//!
//! 같은 프로젝트의 상태 변경과 브로드캐스트는 룸 `Mutex` 안에서 수행되므로
//! 커밋된 순서대로 참가자에게 전달됩니다. DB 잠금은 await 지점을 넘어 보유하지 않습니다.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::events::{CollabEvent, ParticipantInfo};
use super::hub::{Audience, Broadcaster};
use super::session::{LockAttempt, ProjectRoom, SegmentLock, SessionRegistry};
use crate::db::{DbState, EditOutcome, PreviousMerge};
use crate::document::MergeOutcome;
use crate::error::EditorError;
use crate::models::{AuditAction, Segment, UserId, UserIdentity};
use crate::utils::rfc3339;

/// 기본 presence 만료 (5분)
pub const DEFAULT_PRESENCE_TIMEOUT: Duration = Duration::from_secs(300);

/// 밀리초 시계
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// 수동 시계 (시뮬레이션/테스트용)
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self(AtomicI64::new(start))
    }

    pub fn advance(&self, by: Duration) {
        self.0.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct CollabEngine {
    db: Arc<DbState>,
    sessions: SessionRegistry,
    hub: Arc<dyn Broadcaster>,
    clock: Arc<dyn Clock>,
    presence_timeout_ms: i64,
}

impl CollabEngine {
    /// 엔진 생성. 저장된 잠금 미러를 모두 지워 재시작 직후 전 세그먼트가 Unlocked 상태가 됩니다.
    pub fn new(
        db: Arc<DbState>,
        hub: Arc<dyn Broadcaster>,
        clock: Arc<dyn Clock>,
        presence_timeout: Duration,
    ) -> Result<Self, EditorError> {
        let cleared = db.with(|db| db.clear_all_segment_locks())?;
        if cleared > 0 {
            tracing::info!(cleared, "cleared stale segment locks from previous run");
        }
        Ok(Self {
            db,
            sessions: SessionRegistry::new(),
            hub,
            clock,
            presence_timeout_ms: presence_timeout.as_millis() as i64,
        })
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// 감사 로그 추가. 실패해도 주 작업은 계속
    fn audit(
        &self,
        project_id: &str,
        user_id: UserId,
        segment_id: Option<&str>,
        action: AuditAction,
        details: Option<&str>,
    ) {
        let now = self.clock.now_millis();
        let result = self
            .db
            .with(|db| db.append_audit(project_id, Some(user_id), segment_id, action, details, now));
        if let Err(e) = result {
            tracing::warn!(project_id, user_id, action = action.as_str(), error = %e, "audit append failed");
        }
    }

    fn mirror_lock(&self, segment_id: &str, holder: Option<(UserId, i64)>) {
        if let Err(e) = self.db.with(|db| db.set_segment_lock(segment_id, holder)) {
            tracing::warn!(segment_id, error = %e, "failed to persist lock state");
        }
    }

    /// 참가자 제거 + 보유 잠금 해제 + 알림 (leave/disconnect/eviction 공통)
    fn remove_participant(&self, project_id: &str, room: &mut ProjectRoom, user_id: UserId) -> bool {
        self.hub.leave(project_id, user_id);
        let present = room.remove(user_id).is_some();
        if present {
            self.hub.emit(project_id, Audience::Room, &CollabEvent::UserLeft { user_id });
        }

        for segment_id in room.release_all(user_id) {
            self.mirror_lock(&segment_id, None);
            self.hub
                .emit(project_id, Audience::Room, &CollabEvent::SegmentUnlocked { segment_id });
        }
        present
    }

    // ---------------------------------------------------------------------
    // Presence
    // ---------------------------------------------------------------------

    /// 입장. 나머지 참가자에게 user_joined, 입장한 사용자에게 current_users 스냅샷
    pub async fn join(&self, project_id: &str, user: &UserIdentity) -> Result<Vec<ParticipantInfo>, EditorError> {
        self.db.with(|db| {
            db.ensure_access(project_id, user.id)?;
            db.upsert_user(user)
        })?;

        let room = self.sessions.room(project_id).await;
        let mut room = room.lock().await;
        room.join(user, self.clock.now_millis());

        self.hub.emit(
            project_id,
            Audience::RoomExcept(user.id),
            &CollabEvent::UserJoined(ParticipantInfo::from(user)),
        );
        let snapshot = room.participants();
        self.hub
            .emit(project_id, Audience::User(user.id), &CollabEvent::CurrentUsers(snapshot.clone()));
        drop(room);

        let details = format!("User {} joined the session.", user.email);
        self.audit(project_id, user.id, None, AuditAction::Join, Some(&details));
        tracing::info!(project_id, user_id = user.id, "participant joined");
        Ok(snapshot)
    }

    /// 명시적 퇴장
    pub async fn leave(&self, project_id: &str, user_id: UserId) {
        let Some(room) = self.sessions.existing(project_id).await else {
            self.hub.leave(project_id, user_id);
            return;
        };
        let removed = {
            let mut room = room.lock().await;
            self.remove_participant(project_id, &mut room, user_id)
        };
        drop(room);
        self.sessions.remove_if_empty(project_id).await;
        if removed {
            self.audit(project_id, user_id, None, AuditAction::Leave, Some("left the session"));
            tracing::info!(project_id, user_id, "participant left");
        }
    }

    /// 연결 끊김: 사용자가 참가 중인 모든 프로젝트에서 퇴장. 퇴장한 프로젝트 ID 반환
    pub async fn disconnect(&self, user_id: UserId) -> Vec<String> {
        let mut left = Vec::new();
        for (project_id, room) in self.sessions.rooms().await {
            let removed = {
                let mut room = room.lock().await;
                if !room.contains(user_id) {
                    continue;
                }
                self.remove_participant(&project_id, &mut room, user_id)
            };
            if removed {
                self.audit(&project_id, user_id, None, AuditAction::Leave, Some("disconnected"));
                tracing::info!(project_id = %project_id, user_id, "participant disconnected");
                left.push(project_id);
            }
        }
        for project_id in &left {
            self.sessions.remove_if_empty(project_id).await;
        }
        left
    }

    /// heartbeat 갱신 후 만료된 참가자 축출. 축출된 사용자 ID 반환
    pub async fn heartbeat(&self, project_id: &str, user_id: UserId) -> Vec<UserId> {
        let Some(room) = self.sessions.existing(project_id).await else {
            return Vec::new();
        };
        let now = self.clock.now_millis();

        let evicted = {
            let mut room = room.lock().await;
            room.touch(user_id, now);
            let stale = room.stale_participants(now, self.presence_timeout_ms);
            for &stale_user in &stale {
                self.remove_participant(project_id, &mut room, stale_user);
            }
            stale
        };
        drop(room);
        if !evicted.is_empty() {
            self.sessions.remove_if_empty(project_id).await;
        }

        for &stale_user in &evicted {
            self.audit(project_id, stale_user, None, AuditAction::Leave, Some("presence timeout"));
            tracing::info!(project_id, user_id = stale_user, "participant evicted after heartbeat timeout");
        }
        evicted
    }

    pub async fn participants(&self, project_id: &str) -> Vec<ParticipantInfo> {
        let Some(room) = self.sessions.existing(project_id).await else {
            return Vec::new();
        };
        let participants = room.lock().await.participants();
        participants
    }

    // ---------------------------------------------------------------------
    // Locks
    // ---------------------------------------------------------------------

    /// 잠금 획득. 다른 사용자가 보유 중이면 상태 변화/알림 없이 `Ok(false)`
    pub async fn acquire_lock(&self, project_id: &str, segment_id: &str, user: &UserIdentity) -> Result<bool, EditorError> {
        self.ensure_segment_in_project(project_id, segment_id, user.id)?;

        let room = self.sessions.room(project_id).await;
        let mut room = room.lock().await;
        let now = self.clock.now_millis();

        match room.try_lock(segment_id, user.id, &user.display_name(), now) {
            LockAttempt::Acquired => {
                self.mirror_lock(segment_id, Some((user.id, now)));
                self.hub.emit(
                    project_id,
                    Audience::RoomExcept(user.id),
                    &CollabEvent::SegmentLocked {
                        segment_id: segment_id.to_string(),
                        user_id: user.id,
                        user_name: user.display_name(),
                    },
                );
                tracing::debug!(project_id, segment_id, user_id = user.id, "segment locked");
                Ok(true)
            }
            LockAttempt::AlreadyHeld => Ok(true),
            LockAttempt::Contended { holder } => {
                tracing::debug!(project_id, segment_id, user_id = user.id, holder, "lock contended");
                Ok(false)
            }
        }
    }

    /// 보유자 본인의 잠금 해제. 보유하지 않았으면 no-op (`false`)
    pub async fn release_lock(&self, project_id: &str, segment_id: &str, user_id: UserId) -> bool {
        let Some(room) = self.sessions.existing(project_id).await else {
            return false;
        };
        let mut room = room.lock().await;
        if !room.unlock(segment_id, user_id) {
            return false;
        }
        self.mirror_lock(segment_id, None);
        self.hub.emit(
            project_id,
            Audience::RoomExcept(user_id),
            &CollabEvent::SegmentUnlocked {
                segment_id: segment_id.to_string(),
            },
        );
        tracing::debug!(project_id, segment_id, user_id, "segment unlocked");
        true
    }

    pub async fn lock_holder(&self, project_id: &str, segment_id: &str) -> Option<SegmentLock> {
        let room = self.sessions.existing(project_id).await?;
        let holder = room.lock().await.lock_holder(segment_id).cloned();
        holder
    }

    fn ensure_segment_in_project(&self, project_id: &str, segment_id: &str, user_id: UserId) -> Result<(), EditorError> {
        self.db.with(|db| {
            db.ensure_access(project_id, user_id)?;
            let context = db.segment_context(segment_id)?;
            if context.project.id != project_id {
                return Err(EditorError::SegmentNotFound(segment_id.to_string()));
            }
            Ok(())
        })
    }

    // ---------------------------------------------------------------------
    // Edits
    // ---------------------------------------------------------------------

    fn updated_event(&self, segment: &Segment, editor: &UserIdentity) -> CollabEvent {
        let name = editor.display_name();
        CollabEvent::SegmentUpdated {
            segment_id: segment.id.clone(),
            target_text: segment.target_text.clone(),
            note: segment.note.clone(),
            user_id: editor.id,
            user_name: name.clone(),
            last_modified_by_name: name,
            last_modified_at: rfc3339(segment.last_modified_at.unwrap_or_else(|| self.clock.now_millis())),
        }
    }

    /// 번역 저장 + 번역 메모리 갱신 + 전파 + 브로드캐스트
    ///
    /// 편집자 본인에게는 해당 세그먼트 알림을 보내지 않고, 전파된 세그먼트는 룸 전체에 알립니다.
    /// 잠금 보유 여부는 확인하지 않습니다 (advisory lock).
    pub async fn apply_edit(
        &self,
        segment_id: &str,
        target_text: &str,
        note: &str,
        editor: &UserIdentity,
    ) -> Result<EditOutcome, EditorError> {
        let project_id = self.db.with(|db| {
            let context = db.segment_context(segment_id)?;
            db.ensure_access(&context.project.id, editor.id)?;
            db.upsert_user(editor)?;
            Ok(context.project.id)
        })?;

        let room = self.sessions.room(&project_id).await;
        let _ordering = room.lock().await;

        let now = self.clock.now_millis();
        let outcome = self
            .db
            .with(|db| db.commit_edit(segment_id, target_text, note, editor.id, now))?;

        self.audit(&project_id, editor.id, Some(segment_id), AuditAction::Edit, Some(target_text));

        self.hub.emit(
            &project_id,
            Audience::RoomExcept(editor.id),
            &self.updated_event(&outcome.segment, editor),
        );
        for segment in &outcome.propagated {
            self.hub
                .emit(&project_id, Audience::Room, &self.updated_event(segment, editor));
        }

        tracing::info!(
            project_id = %project_id,
            segment_id,
            user_id = editor.id,
            propagated = outcome.propagated.len(),
            "segment edit committed"
        );
        Ok(outcome)
    }

    /// 타이핑 표시 (저장/잠금 영향 없음)
    pub fn notify_typing(&self, project_id: &str, segment_id: Option<&str>, user: &UserIdentity) {
        self.hub.emit(
            project_id,
            Audience::RoomExcept(user.id),
            &CollabEvent::UserTyping {
                user_id: user.id,
                name: user.display_name(),
                segment_id: segment_id.map(str::to_string),
            },
        );
    }

    // ---------------------------------------------------------------------
    // Merges
    // ---------------------------------------------------------------------

    fn drop_removed_locks(&self, project_id: &str, room: &mut ProjectRoom, removed: &[String]) {
        for segment_id in room.drop_locks(removed) {
            self.hub
                .emit(project_id, Audience::Room, &CollabEvent::SegmentUnlocked { segment_id });
        }
    }

    /// 문단 전체 병합
    pub async fn merge_paragraph(&self, paragraph_id: &str, user: &UserIdentity) -> Result<MergeOutcome, EditorError> {
        let project_id = self.db.with(|db| {
            let paragraph = db.get_paragraph(paragraph_id)?;
            db.ensure_access(&paragraph.project_id, user.id)?;
            Ok(paragraph.project_id)
        })?;

        let room = self.sessions.room(&project_id).await;
        let mut room = room.lock().await;

        let outcome = self.db.with(|db| db.merge_paragraph(paragraph_id))?;
        if let MergeOutcome::Merged {
            segment_id,
            removed_segment_ids,
        } = &outcome
        {
            self.drop_removed_locks(&project_id, &mut room, removed_segment_ids);
            let details = format!("merged {} segments into paragraph head", removed_segment_ids.len() + 1);
            self.audit(&project_id, user.id, Some(segment_id), AuditAction::Merge, Some(&details));
        }
        Ok(outcome)
    }

    /// 직전 세그먼트로 병합
    pub async fn merge_with_previous(&self, segment_id: &str, user: &UserIdentity) -> Result<PreviousMerge, EditorError> {
        let project_id = self.db.with(|db| {
            let context = db.segment_context(segment_id)?;
            db.ensure_access(&context.project.id, user.id)?;
            Ok(context.project.id)
        })?;

        let room = self.sessions.room(&project_id).await;
        let mut room = room.lock().await;

        let merged = self.db.with(|db| db.merge_with_previous(segment_id))?;
        self.drop_removed_locks(&project_id, &mut room, std::slice::from_ref(&merged.removed_segment_id));
        self.audit(
            &project_id,
            user.id,
            Some(&merged.segment.id),
            AuditAction::Merge,
            Some(&format!("merged segment {} into previous", merged.removed_segment_id)),
        );
        Ok(merged)
    }
}
