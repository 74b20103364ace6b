//! Commands Module
//!
//! 전송 계층에서 호출하는 명령 함수. 모두 직렬화 가능한 `CommandResult`를 반환합니다.

pub mod glossary;
pub mod memory;
pub mod mt;
pub mod project;
pub mod segment;
