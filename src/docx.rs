//! DOCX Codec
//!
//! .docx 바이트 ↔ 문단 문자열 목록. 빈 문단도 위치를 유지하기 위해 그대로 남깁니다.

use std::io::Cursor;

use docx_rs::{DocumentChild, Docx, Paragraph, ParagraphChild, Run, RunChild};

use crate::error::EditorError;

/// 문서 본문의 최상위 문단 텍스트 (문서 순서)
pub fn read_paragraphs(bytes: &[u8]) -> Result<Vec<String>, EditorError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| EditorError::Document(e.to_string()))?;

    let mut paragraphs = Vec::new();
    for child in docx.document.children {
        if let DocumentChild::Paragraph(p) = child {
            let mut text = String::new();
            collect_text(&p.children, &mut text);
            paragraphs.push(text);
        }
    }
    Ok(paragraphs)
}

fn collect_text(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for rc in &run.children {
                    match rc {
                        RunChild::Text(t) => out.push_str(&t.text),
                        RunChild::Tab(_) => out.push('\t'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => collect_text(&link.children, out),
            _ => {}
        }
    }
}

/// 문단 목록으로 새 .docx 생성
pub fn write_paragraphs(paragraphs: &[String]) -> Result<Vec<u8>, EditorError> {
    let doc = paragraphs.iter().fold(Docx::new(), |doc, text| {
        let paragraph = if text.is_empty() {
            Paragraph::new()
        } else {
            Paragraph::new().add_run(Run::new().add_text(text.as_str()))
        };
        doc.add_paragraph(paragraph)
    });

    let mut cursor = Cursor::new(Vec::new());
    doc.build()
        .pack(&mut cursor)
        .map_err(|e| EditorError::Document(e.to_string()))?;
    Ok(cursor.into_inner())
}
