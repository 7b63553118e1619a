//! 답변기 - 추출형 QA로 답변 구간 추출
//!
//! 선택된 섹션을 컨텍스트로 QA 모델을 호출합니다. 모델이 빈 구간을
//! 반환하거나 신뢰도가 임계값 미만이면 섹션 전문으로 폴백하여
//! 사용자에게 빈 답변이 나가는 일이 없도록 합니다.

use crate::errors::BotError;
use crate::eventlog::{Actor, EventLog, LogEvent};
use crate::qa::Extractor;

use super::retriever::Query;
use super::segmenter::Section;

/// 답변 구간 채택 최소 신뢰도
pub const CONFIDENCE_THRESHOLD: f32 = 0.1;

// ============================================================================
// Answering
// ============================================================================

/// 섹션에서 쿼리에 대한 답변 추출
///
/// QA 호출이 실패하면 1회 재시도하고, 그래도 실패하면 섹션 전문을
/// degraded 답변으로 반환합니다. 절대 빈 문자열을 반환하지 않습니다.
pub async fn answer(
    query: &Query,
    section: &Section,
    extractor: &dyn Extractor,
    log: &EventLog,
) -> String {
    let span = match extract_with_retry(query, section, extractor, log).await {
        Some(span) => span,
        None => {
            // 모델 호출 불가 → 섹션 전문으로 degrade
            log.log(LogEvent::new(
                Actor::Answerer,
                "degraded",
                format!("QA unavailable, returning section {} text", section.index),
            ));
            return section.text.clone();
        }
    };

    if span.text.is_empty() || span.confidence < CONFIDENCE_THRESHOLD {
        log.log(LogEvent::new(
            Actor::Answerer,
            "fallback_full_section",
            format!(
                "span confidence {:.2} below threshold, section {}",
                span.confidence, section.index
            ),
        ));
        tracing::info!(
            "QA span rejected (confidence {:.2}), returning full section text",
            span.confidence
        );
        return section.text.clone();
    }

    log.log(LogEvent::new(
        Actor::Answerer,
        "answered",
        format!(
            "section {}, confidence {:.2}: {}",
            section.index, span.confidence, span.text
        ),
    ));
    tracing::info!("Answer for query '{}': {}", query.raw_text, span.text);

    span.text
}

/// QA 호출 (1회 재시도 포함)
async fn extract_with_retry(
    query: &Query,
    section: &Section,
    extractor: &dyn Extractor,
    log: &EventLog,
) -> Option<crate::qa::AnswerSpan> {
    for attempt in 0..2 {
        match extractor.extract_answer(&query.raw_text, &section.text).await {
            Ok(span) => return Some(span),
            Err(BotError::ModelInvocation(msg)) if attempt == 0 => {
                tracing::warn!("QA call failed, retrying once: {}", msg);
            }
            Err(e) => {
                log.log(LogEvent::new(
                    Actor::Answerer,
                    "qa_failed",
                    format!("QA call failed twice: {}", e),
                ));
                tracing::warn!("QA call failed twice: {}", e);
                return None;
            }
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::testing::{FlakyExtractor, StubExtractor};
    use super::*;

    fn section(text: &str) -> Section {
        Section {
            index: 0,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_confident_span_returned() {
        let extractor = StubExtractor::new().with("Refund policy?", "30 days with receipt.", 0.9);
        let query = Query::new("Refund policy?");
        let sec = section("Q: Refund policy?\nA: 30 days with receipt.");

        let result = answer(&query, &sec, &extractor, &EventLog::sink()).await;
        assert_eq!(result, "30 days with receipt.");
    }

    #[tokio::test]
    async fn test_empty_span_falls_back_to_section() {
        let extractor = StubExtractor::new().with("Refund policy?", "", 0.9);
        let query = Query::new("Refund policy?");
        let sec = section("Q: Refund policy?\nA: 30 days with receipt.");

        let result = answer(&query, &sec, &extractor, &EventLog::sink()).await;
        assert_eq!(result, sec.text);
    }

    #[tokio::test]
    async fn test_low_confidence_falls_back_to_section() {
        let extractor = StubExtractor::new().with("Refund policy?", "maybe this", 0.05);
        let query = Query::new("Refund policy?");
        let sec = section("Q: Refund policy?\nA: 30 days with receipt.");

        let result = answer(&query, &sec, &extractor, &EventLog::sink()).await;
        assert_eq!(result, sec.text);
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        // 첫 호출만 실패, 재시도에서 성공
        let extractor = FlakyExtractor::new(1, "9-5 Mon-Fri.", 0.8);
        let query = Query::new("What are your hours?");
        let sec = section("Q: What are your hours?\nA: 9-5 Mon-Fri.");

        let result = answer(&query, &sec, &extractor, &EventLog::sink()).await;
        assert_eq!(result, "9-5 Mon-Fri.");
        assert_eq!(extractor.calls(), 2);
    }

    #[tokio::test]
    async fn test_double_failure_degrades_to_section() {
        let extractor = FlakyExtractor::new(5, "never returned", 0.9);
        let query = Query::new("What are your hours?");
        let sec = section("Q: What are your hours?\nA: 9-5 Mon-Fri.");

        let result = answer(&query, &sec, &extractor, &EventLog::sink()).await;
        assert_eq!(result, sec.text);
        // 즉시 호출 1회 + 재시도 1회, 그 이상은 없음
        assert_eq!(extractor.calls(), 2);
    }

    #[tokio::test]
    async fn test_never_returns_empty_string() {
        let extractor = StubExtractor::new(); // 미등록 질문 → 빈 span, 신뢰도 0
        let query = Query::new("unknown question");
        let sec = section("Some section text.");

        let result = answer(&query, &sec, &extractor, &EventLog::sink()).await;
        assert!(!result.is_empty());
        assert_eq!(result, sec.text);
    }
}
