//! 텍스트 추출 모듈
//!
//! 업로드된 문서 파일에서 원문 텍스트를 추출합니다.
//! - TXT: 직접 읽기
//! - PDF: pdf-extract로 텍스트 추출
//!
//! 그 외 형식은 `BotError::UnsupportedFormat`으로 거부합니다.

pub mod pdf;

use std::path::Path;

use crate::errors::{BotError, Result};
use crate::eventlog::{Actor, EventLog, LogEvent};

// ============================================================================
// File Type
// ============================================================================

/// 지원하는 파일 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Text,
    Pdf,
}

impl FileType {
    /// 확장자로 파일 형식 판별
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "txt" => Ok(FileType::Text),
            "pdf" => Ok(FileType::Pdf),
            other => Err(BotError::UnsupportedFormat(if other.is_empty() {
                format!("{:?}", path)
            } else {
                other.to_string()
            })),
        }
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// 파일에서 원문 텍스트 추출
///
/// 문서 업로드 시 한 번 호출됩니다. 실패하면 `Extraction` 에러로
/// 해당 업로드 전체가 실패하며, 이후 단계(분할기)는 호출되지 않습니다.
pub async fn extract_text(path: &Path, log: &EventLog) -> Result<String> {
    let file_type = FileType::from_path(path).map_err(|e| {
        log.log(LogEvent::new(
            Actor::Extractor,
            "unsupported_format",
            format!("{:?}", path),
        ));
        e
    })?;

    let text = match file_type {
        FileType::Text => read_text_file(path).await?,
        FileType::Pdf => extract_pdf_file(path).await?,
    };

    log.log(LogEvent::new(
        Actor::Extractor,
        "extracted",
        format!("{:?} ({:?}, {} chars)", path, file_type, text.chars().count()),
    ));
    tracing::info!("Extracted {:?} file: {:?}", file_type, path);

    Ok(text)
}

/// TXT 파일 읽기
async fn read_text_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BotError::Extraction(format!("failed to read {:?}: {}", path, e)))
}

/// PDF 파일에서 추출
///
/// PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
async fn extract_pdf_file(path: &Path) -> Result<String> {
    let path_buf = path.to_path_buf();
    tokio::task::spawn_blocking(move || pdf::extract_text_from_pdf(&path_buf))
        .await
        .map_err(|e| BotError::Extraction(format!("PDF extraction task failed: {}", e)))?
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_type_from_path() {
        assert_eq!(
            FileType::from_path(Path::new("faq.txt")).unwrap(),
            FileType::Text
        );
        assert_eq!(
            FileType::from_path(Path::new("manual.PDF")).unwrap(),
            FileType::Pdf
        );
    }

    #[test]
    fn test_file_type_unsupported() {
        let err = FileType::from_path(Path::new("notes.docx")).unwrap_err();
        assert!(matches!(err, BotError::UnsupportedFormat(_)));

        let err = FileType::from_path(Path::new("noext")).unwrap_err();
        assert!(matches!(err, BotError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_extract_txt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("faq.txt");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(file, "Q: What are your hours?\nA: 9-5 Mon-Fri.").expect("write");

        let log = EventLog::sink();
        let text = extract_text(&path, &log).await.expect("extract");
        assert!(text.contains("9-5 Mon-Fri."));
    }

    #[tokio::test]
    async fn test_extract_missing_file() {
        let log = EventLog::sink();
        let err = extract_text(Path::new("/nonexistent/faq.txt"), &log)
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_extract_unsupported() {
        let log = EventLog::sink();
        let err = extract_text(Path::new("image.png"), &log).await.unwrap_err();
        assert!(matches!(err, BotError::UnsupportedFormat(_)));
    }
}
