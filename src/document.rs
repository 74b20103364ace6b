//! Document Model Rules
//!
//! 세그먼트 병합 시 텍스트 결합 규칙, 문단 내보내기 텍스트 재구성,
//! `"<문단>.<세그먼트>"` 형식의 표시 ID 파싱.
//! 저장소 접근 없는 순수 로직이며 트랜잭션 처리는 `db::document`가 담당합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EditorError;
use crate::models::{Paragraph, Segment};

const NOTE_SEPARATOR: &str = " | ";

/// 병합 누적값 (원문, 번역문, 메모)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentText {
    pub source: String,
    pub target: String,
    pub note: String,
}

impl From<&Segment> for SegmentText {
    fn from(segment: &Segment) -> Self {
        Self {
            source: segment.source_text.clone(),
            target: segment.target_text.clone(),
            note: segment.note.clone(),
        }
    }
}

impl SegmentText {
    /// 뒤 세그먼트 내용을 이어 붙임
    ///
    /// - 원문: 누적값이 공백으로 끝나지 않으면 한 칸 띄움
    /// - 번역문: 들어오는 값이 있을 때만, 누적값이 비어 있지 않고 공백으로 끝나지 않으면 한 칸 띄움
    /// - 메모: 양쪽 모두 비어 있지 않을 때만 `" | "` 로 연결
    pub fn absorb(&mut self, next: &SegmentText) {
        if !ends_with_whitespace(&self.source) {
            self.source.push(' ');
        }
        self.source.push_str(&next.source);

        if !next.target.is_empty() {
            if !self.target.is_empty() && !ends_with_whitespace(&self.target) {
                self.target.push(' ');
            }
            self.target.push_str(&next.target);
        }

        if !next.note.is_empty() {
            if !self.note.is_empty() {
                self.note.push_str(NOTE_SEPARATOR);
            }
            self.note.push_str(&next.note);
        }
    }
}

fn ends_with_whitespace(text: &str) -> bool {
    text.chars().last().map(char::is_whitespace).unwrap_or(false)
}

/// 여러 세그먼트를 순서대로 하나로 결합
pub fn combine<'a, I>(segments: I) -> Option<SegmentText>
where
    I: IntoIterator<Item = &'a Segment>,
{
    let mut iter = segments.into_iter();
    let mut acc = SegmentText::from(iter.next()?);
    for segment in iter {
        acc.absorb(&SegmentText::from(segment));
    }
    Some(acc)
}

/// 문단 병합 결과
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// 세그먼트가 1개 이하
    NoChange,
    Merged {
        segment_id: String,
        removed_segment_ids: Vec<String>,
    },
}

/// 내보내기용 문단 텍스트
///
/// 세그먼트가 없으면 저장된 원문을 그대로, 있으면 각 세그먼트의 번역문(없으면 원문)을 이어 붙입니다.
pub fn paragraph_export_text(paragraph: &Paragraph, segments: &[Segment]) -> String {
    if segments.is_empty() {
        return paragraph.original_text.clone();
    }
    let mut text = String::new();
    for segment in segments {
        text.push_str(segment.export_text());
        text.push(' ');
    }
    text.trim().to_string()
}

/// 1-based 표시 ID (`"3.2"` = 세 번째 문단의 두 번째 세그먼트)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayId {
    pub paragraph: u32,
    pub segment: u32,
}

impl DisplayId {
    /// 저장소 위치(0-based)에서 생성
    pub fn from_positions(paragraph_position: i64, segment_position: i64) -> Self {
        Self {
            paragraph: (paragraph_position.max(0) + 1) as u32,
            segment: (segment_position.max(0) + 1) as u32,
        }
    }

    pub fn paragraph_position(&self) -> i64 {
        i64::from(self.paragraph) - 1
    }

    pub fn segment_position(&self) -> i64 {
        i64::from(self.segment) - 1
    }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.paragraph, self.segment)
    }
}

impl FromStr for DisplayId {
    type Err = EditorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || EditorError::Validation(format!("Invalid display id: {:?}", value));

        let mut parts = value.trim().split('.');
        let (Some(p), Some(s), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        let paragraph: u32 = p.trim().parse().map_err(|_| invalid())?;
        let segment: u32 = s.trim().parse().map_err(|_| invalid())?;
        if paragraph == 0 || segment == 0 {
            return Err(invalid());
        }
        Ok(Self { paragraph, segment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(position: i64, source: &str, target: &str, note: &str) -> Segment {
        Segment {
            id: format!("s{}", position),
            paragraph_id: "p".into(),
            position,
            source_text: source.into(),
            target_text: target.into(),
            note: note.into(),
            last_modified_by: None,
            last_modified_at: None,
            locked_by: None,
            locked_at: None,
        }
    }

    #[test]
    fn test_combine_two_segments() {
        let segments = vec![segment(0, "A", "a", ""), segment(1, "B", "b", "")];
        let merged = combine(&segments).unwrap();
        assert_eq!(merged.source, "A B");
        assert_eq!(merged.target, "a b");
        assert_eq!(merged.note, "");
    }

    #[test]
    fn test_target_and_note_join_rules() {
        let segments = vec![
            segment(0, "A ", "", "first"),
            segment(1, "B", "b", ""),
            segment(3, "C", "", "third"),
            segment(4, "D", "d", "fourth"),
        ];
        let merged = combine(&segments).unwrap();
        assert_eq!(merged.source, "A B C D");
        assert_eq!(merged.target, "b d");
        assert_eq!(merged.note, "first | third | fourth");
    }

    #[test]
    fn test_target_accumulator_trailing_space_not_doubled() {
        let mut acc = SegmentText {
            source: "A".into(),
            target: "a ".into(),
            note: String::new(),
        };
        acc.absorb(&SegmentText {
            source: "B".into(),
            target: "b".into(),
            note: String::new(),
        });
        assert_eq!(acc.target, "a b");
    }

    #[test]
    fn test_combine_empty_is_none() {
        let segments: Vec<Segment> = Vec::new();
        assert!(combine(&segments).is_none());
    }

    #[test]
    fn test_paragraph_export_text() {
        let paragraph = Paragraph {
            id: "p".into(),
            project_id: "proj".into(),
            position: 0,
            original_text: "  Original  ".into(),
        };
        assert_eq!(paragraph_export_text(&paragraph, &[]), "  Original  ");

        let segments = vec![segment(0, "Hello.", "Hola.", ""), segment(1, "World.", "", "")];
        assert_eq!(paragraph_export_text(&paragraph, &segments), "Hola. World.");
    }

    #[test]
    fn test_display_id_parse() {
        let id: DisplayId = "3.2".parse().unwrap();
        assert_eq!(id, DisplayId { paragraph: 3, segment: 2 });
        assert_eq!(id.paragraph_position(), 2);
        assert_eq!(id.segment_position(), 1);
        assert_eq!(id.to_string(), "3.2");
        assert_eq!(DisplayId::from_positions(2, 1), id);
    }

    #[test]
    fn test_display_id_rejects_malformed() {
        for bad in ["", "3", "3.", "a.b", "1.2.3", "0.1", "1.0", "-1.2"] {
            let err = bad.parse::<DisplayId>().unwrap_err();
            assert_eq!(err.code(), "INVALID_REQUEST", "{bad}");
        }
    }
}
