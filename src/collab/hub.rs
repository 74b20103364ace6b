//! Broadcast Hub
//!
//! 협업 엔진이 참가자에게 상태를 푸시하는 유일한 통로.
//! 룸 = 프로젝트 하나의 참가자 집합, 연결마다 unbounded 채널 1개.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::mpsc;

use super::events::CollabEvent;
use crate::models::UserId;

/// 이벤트 수신 대상
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// 룸 전체
    Room,
    /// 발신자를 제외한 룸 전체
    RoomExcept(UserId),
    /// 특정 참가자 한 명
    User(UserId),
}

impl Audience {
    fn includes(&self, user_id: UserId) -> bool {
        match *self {
            Audience::Room => true,
            Audience::RoomExcept(excluded) => excluded != user_id,
            Audience::User(target) => target == user_id,
        }
    }
}

pub trait Broadcaster: Send + Sync {
    fn emit(&self, project_id: &str, audience: Audience, event: &CollabEvent);

    /// 룸 구독 해제. 이후 이 룸의 이벤트를 받지 않음
    fn leave(&self, project_id: &str, user_id: UserId);
}

/// 메모리 내 룸 허브
#[derive(Default)]
pub struct RoomHub {
    rooms: RwLock<HashMap<String, HashMap<UserId, mpsc::UnboundedSender<CollabEvent>>>>,
}

impl RoomHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 연결 등록. 같은 사용자의 기존 연결은 대체됩니다.
    pub fn connect(&self, project_id: &str, user_id: UserId) -> mpsc::UnboundedReceiver<CollabEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.rooms.write() {
            Ok(mut rooms) => {
                rooms.entry(project_id.to_string()).or_default().insert(user_id, tx);
            }
            Err(_) => tracing::error!(project_id, user_id, "room hub lock poisoned on connect"),
        }
        rx
    }

    pub fn disconnect(&self, project_id: &str, user_id: UserId) {
        if let Ok(mut rooms) = self.rooms.write() {
            if let Some(room) = rooms.get_mut(project_id) {
                room.remove(&user_id);
                if room.is_empty() {
                    rooms.remove(project_id);
                }
            }
        }
    }

    /// 룸의 연결 수
    pub fn connection_count(&self, project_id: &str) -> usize {
        self.rooms
            .read()
            .ok()
            .and_then(|rooms| rooms.get(project_id).map(HashMap::len))
            .unwrap_or(0)
    }
}

impl Broadcaster for RoomHub {
    fn emit(&self, project_id: &str, audience: Audience, event: &CollabEvent) {
        let Ok(rooms) = self.rooms.read() else {
            tracing::error!(project_id, "room hub lock poisoned on emit");
            return;
        };
        let Some(room) = rooms.get(project_id) else {
            return;
        };

        for (&user_id, tx) in room {
            if !audience.includes(user_id) {
                continue;
            }
            if tx.send(event.clone()).is_err() {
                tracing::debug!(project_id, user_id, event = event.event_name(), "receiver dropped");
            }
        }
    }

    fn leave(&self, project_id: &str, user_id: UserId) {
        self.disconnect(project_id, user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unlocked(id: &str) -> CollabEvent {
        CollabEvent::SegmentUnlocked { segment_id: id.into() }
    }

    #[test]
    fn test_audiences() {
        let hub = RoomHub::new();
        let mut a = hub.connect("p1", 1);
        let mut b = hub.connect("p1", 2);
        let mut other = hub.connect("p2", 3);

        hub.emit("p1", Audience::Room, &unlocked("s1"));
        hub.emit("p1", Audience::RoomExcept(1), &unlocked("s2"));
        hub.emit("p1", Audience::User(1), &unlocked("s3"));

        assert_eq!(a.try_recv().unwrap(), unlocked("s1"));
        assert_eq!(a.try_recv().unwrap(), unlocked("s3"));
        assert!(a.try_recv().is_err());

        assert_eq!(b.try_recv().unwrap(), unlocked("s1"));
        assert_eq!(b.try_recv().unwrap(), unlocked("s2"));
        assert!(b.try_recv().is_err());

        assert!(other.try_recv().is_err());
    }

    #[test]
    fn test_disconnect_removes_empty_room() {
        let hub = RoomHub::new();
        let _rx = hub.connect("p1", 1);
        assert_eq!(hub.connection_count("p1"), 1);
        hub.disconnect("p1", 1);
        assert_eq!(hub.connection_count("p1"), 0);
        hub.emit("p1", Audience::Room, &unlocked("s1"));
    }

    #[test]
    fn test_leave_stops_delivery() {
        let hub = RoomHub::new();
        let mut a = hub.connect("p1", 1);
        let mut b = hub.connect("p1", 2);

        Broadcaster::leave(&hub, "p1", 1);
        hub.emit("p1", Audience::Room, &unlocked("s1"));

        assert!(a.try_recv().is_err());
        assert_eq!(b.try_recv().unwrap(), unlocked("s1"));
        assert_eq!(hub.connection_count("p1"), 1);
    }
}
