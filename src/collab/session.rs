//! Presence & Lock State
//!
//! 프로세스 전역 세션 레지스트리. 시작 시 비어 있고, join 시 항목이 생기며
//! leave/eviction 시 제거됩니다. 재시작하면 모든 참가자/잠금 상태가 사라집니다.
//! 프로젝트별 `Mutex`로 잠금 획득/해제/축출이 같은 프로젝트의 heartbeat·disconnect와
//! 원자적으로 직렬화되며, 서로 다른 프로젝트는 경합하지 않습니다.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use super::events::ParticipantInfo;
use crate::models::{UserId, UserIdentity};

/// 접속 중인 참가자
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub info: ParticipantInfo,
    pub last_heartbeat: i64,
}

/// 세그먼트 잠금
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SegmentLock {
    pub holder: UserId,
    pub holder_name: String,
    pub acquired_at: i64,
}

/// 잠금 시도 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAttempt {
    Acquired,
    /// 이미 같은 사용자가 보유 (상태 변화 없음)
    AlreadyHeld,
    /// 다른 사용자가 보유 (상태 변화 없음)
    Contended { holder: UserId },
}

/// 프로젝트 하나의 세션 상태
#[derive(Debug, Default)]
pub struct ProjectRoom {
    /// 입장 순서 유지
    participants: Vec<Participant>,
    locks: HashMap<String, SegmentLock>,
}

impl ProjectRoom {
    /// 참가자 추가. 이미 있으면 정보와 heartbeat를 덮어씀
    pub fn join(&mut self, user: &UserIdentity, now: i64) {
        let participant = Participant {
            info: ParticipantInfo::from(user),
            last_heartbeat: now,
        };
        match self.participants.iter_mut().find(|p| p.info.user_id == user.id) {
            Some(existing) => *existing = participant,
            None => self.participants.push(participant),
        }
    }

    pub fn remove(&mut self, user_id: UserId) -> Option<Participant> {
        let idx = self.participants.iter().position(|p| p.info.user_id == user_id)?;
        Some(self.participants.remove(idx))
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.participants.iter().any(|p| p.info.user_id == user_id)
    }

    /// heartbeat 갱신. 참가자가 아니면 false
    pub fn touch(&mut self, user_id: UserId, now: i64) -> bool {
        match self.participants.iter_mut().find(|p| p.info.user_id == user_id) {
            Some(p) => {
                p.last_heartbeat = now;
                true
            }
            None => false,
        }
    }

    /// 마지막 heartbeat가 `timeout_ms`보다 오래된 참가자
    pub fn stale_participants(&self, now: i64, timeout_ms: i64) -> Vec<UserId> {
        self.participants
            .iter()
            .filter(|p| now - p.last_heartbeat > timeout_ms)
            .map(|p| p.info.user_id)
            .collect()
    }

    pub fn participants(&self) -> Vec<ParticipantInfo> {
        self.participants.iter().map(|p| p.info.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty() && self.locks.is_empty()
    }

    pub fn try_lock(&mut self, segment_id: &str, user_id: UserId, user_name: &str, now: i64) -> LockAttempt {
        match self.locks.get(segment_id) {
            Some(lock) if lock.holder == user_id => LockAttempt::AlreadyHeld,
            Some(lock) => LockAttempt::Contended { holder: lock.holder },
            None => {
                self.locks.insert(
                    segment_id.to_string(),
                    SegmentLock {
                        holder: user_id,
                        holder_name: user_name.to_string(),
                        acquired_at: now,
                    },
                );
                LockAttempt::Acquired
            }
        }
    }

    /// 보유자 본인만 해제 가능
    pub fn unlock(&mut self, segment_id: &str, user_id: UserId) -> bool {
        match self.locks.get(segment_id) {
            Some(lock) if lock.holder == user_id => {
                self.locks.remove(segment_id);
                true
            }
            _ => false,
        }
    }

    /// 사용자가 보유한 모든 잠금 해제. 해제된 세그먼트 ID (정렬됨)
    pub fn release_all(&mut self, user_id: UserId) -> Vec<String> {
        let mut released: Vec<String> = self
            .locks
            .iter()
            .filter(|(_, lock)| lock.holder == user_id)
            .map(|(id, _)| id.clone())
            .collect();
        released.sort();
        for id in &released {
            self.locks.remove(id);
        }
        released
    }

    /// 삭제된 세그먼트의 잠금 제거. 실제로 잠겨 있던 ID만 반환
    pub fn drop_locks(&mut self, segment_ids: &[String]) -> Vec<String> {
        segment_ids
            .iter()
            .filter(|id| self.locks.remove(id.as_str()).is_some())
            .cloned()
            .collect()
    }

    pub fn lock_holder(&self, segment_id: &str) -> Option<&SegmentLock> {
        self.locks.get(segment_id)
    }
}

/// 프로젝트 ID → 세션 상태
#[derive(Default)]
pub struct SessionRegistry {
    rooms: RwLock<HashMap<String, Arc<Mutex<ProjectRoom>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 룸 반환 (없으면 생성)
    pub async fn room(&self, project_id: &str) -> Arc<Mutex<ProjectRoom>> {
        if let Some(room) = self.rooms.read().await.get(project_id) {
            return Arc::clone(room);
        }
        let mut rooms = self.rooms.write().await;
        Arc::clone(rooms.entry(project_id.to_string()).or_default())
    }

    pub async fn existing(&self, project_id: &str) -> Option<Arc<Mutex<ProjectRoom>>> {
        self.rooms.read().await.get(project_id).cloned()
    }

    /// 모든 룸 스냅샷 (project_id, room)
    pub async fn rooms(&self) -> Vec<(String, Arc<Mutex<ProjectRoom>>)> {
        self.rooms
            .read()
            .await
            .iter()
            .map(|(id, room)| (id.clone(), Arc::clone(room)))
            .collect()
    }

    /// 참가자와 잠금이 모두 없는 룸 제거. 다른 곳에서 룸 핸들을 보유 중이면 유지
    pub async fn remove_if_empty(&self, project_id: &str) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get(project_id) else {
            return false;
        };
        if Arc::strong_count(room) > 1 {
            return false;
        }
        let empty = match room.try_lock() {
            Ok(room) => room.is_empty(),
            Err(_) => false,
        };
        if empty {
            rooms.remove(project_id);
        }
        empty
    }
}
