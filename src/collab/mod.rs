//! Collaboration Module
//!
//! 프로젝트 룸 단위 실시간 공동 편집 (presence, advisory lock, 편집 브로드캐스트)

pub mod engine;
pub mod events;
pub mod hub;
pub mod session;

pub use engine::{Clock, CollabEngine, ManualClock, SystemClock, DEFAULT_PRESENCE_TIMEOUT};
pub use events::{CollabEvent, ParticipantInfo};
pub use hub::{Audience, Broadcaster, RoomHub};
pub use session::{LockAttempt, SegmentLock, SessionRegistry};
