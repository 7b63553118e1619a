//! 섹션 분할기
//!
//! 원문 텍스트를 빈 줄 경계로 잘라 순서 있는 섹션 목록을 만듭니다.
//! 빈 조각과 공백만 있는 조각은 버리고, 남은 순서대로 0부터
//! 인덱스를 부여합니다. 부수효과 없는 순수 함수입니다.

use regex::Regex;

use crate::errors::{BotError, Result};

// ============================================================================
// Types
// ============================================================================

/// 문서 섹션 - 빈 줄로 구분된 검색 단위
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// 유지된 섹션 순서상의 0-based 위치
    pub index: usize,
    /// 섹션 텍스트 (앞뒤 공백 제거됨)
    pub text: String,
}

// ============================================================================
// Segmentation
// ============================================================================

/// 원문을 섹션으로 분할
///
/// 연속된 2개 이상의 줄바꿈(사이 공백 허용)을 경계로 자릅니다.
/// 사용 가능한 섹션이 하나도 없으면 `EmptyDocument` 에러입니다.
pub fn segment(raw_text: &str) -> Result<Vec<Section>> {
    // 빈 줄 경계: 줄바꿈 + (공백 줄)* + 줄바꿈
    let boundary = Regex::new(r"\n[ \t\r]*\n[\s]*").expect("valid regex");

    let sections: Vec<Section> = boundary
        .split(raw_text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(index, text)| Section {
            index,
            text: text.to_string(),
        })
        .collect();

    if sections.is_empty() {
        return Err(BotError::EmptyDocument);
    }

    Ok(sections)
}

// ============================================================================
// Tests
// ============================================================================
