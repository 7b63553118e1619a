//! 에러 타입 정의
//!
//! 치명 에러(빈 문서, 인덱스 빌드 실패, 추출 실패)와
//! 복구 가능 에러(모델 호출 실패)를 구분합니다.
//! 모델 호출 실패는 호출자가 1회 재시도 후 degraded 답변으로 처리합니다.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    /// 문서에 사용 가능한 섹션이 없음 (치명 - 쿼리 불가)
    #[error("document contains no usable sections")]
    EmptyDocument,

    /// 임베딩 인덱스 빌드 실패 (치명 - 부분 인덱스는 사용 불가)
    #[error("embedding index build failed: {0}")]
    Embedding(String),

    /// 파일에서 텍스트 추출 실패 (해당 업로드에 대해 치명)
    #[error("failed to extract text: {0}")]
    Extraction(String),

    /// 지원하지 않는 파일 형식 (TXT/PDF만 지원)
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// 쿼리 시점 모델 호출 실패 (복구 가능 - 1회 재시도 후 degrade)
    #[error("model invocation failed: {0}")]
    ModelInvocation(String),
}

pub type Result<T> = std::result::Result<T, BotError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BotError::EmptyDocument;
        assert_eq!(err.to_string(), "document contains no usable sections");

        let err = BotError::UnsupportedFormat("docx".to_string());
        assert!(err.to_string().contains("docx"));
    }
}
