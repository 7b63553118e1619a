//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트를 사용하여 PDF 전체 텍스트를 추출합니다.

use std::path::Path;

use crate::errors::{BotError, Result};

/// PDF에서 전체 텍스트 추출
///
/// 페이지 구분 없이 문서 전체를 하나의 문자열로 반환합니다.
/// 폼피드 문자(\x0c)는 섹션 분할을 위해 빈 줄로 치환합니다.
pub fn extract_text_from_pdf(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| BotError::Extraction(format!("failed to read PDF {:?}: {}", path, e)))?;

    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| BotError::Extraction(format!("failed to extract PDF {:?}: {}", path, e)))?;

    if text.trim().is_empty() {
        tracing::warn!(
            "No text extracted from PDF: {:?}. It might be a scanned document.",
            path
        );
    }

    // 페이지 경계(폼피드)를 문단 경계로 변환
    Ok(normalize_page_breaks(&text))
}

/// 폼피드 문자를 빈 줄로 치환
fn normalize_page_breaks(text: &str) -> String {
    text.replace('\x0c', "\n\n")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_page_breaks() {
        let text = "Page 1 content\x0cPage 2 content";
        let normalized = normalize_page_breaks(text);
        assert_eq!(normalized, "Page 1 content\n\nPage 2 content");
    }

    #[test]
    fn test_normalize_no_formfeed() {
        let text = "Just some text";
        assert_eq!(normalize_page_breaks(text), text);
    }

    #[test]
    fn test_extract_missing_pdf() {
        let err = extract_text_from_pdf(Path::new("/nonexistent/doc.pdf")).unwrap_err();
        assert!(matches!(err, BotError::Extraction(_)));
    }
}
