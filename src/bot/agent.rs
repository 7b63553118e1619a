//! 문서 세션 오케스트레이터
//!
//! 업로드된 문서 하나에 대해 추출 → 분할 → 인덱스 빌드를 수행하고,
//! 이후 턴마다 검색 → 답변 → 피드백 루프를 구동합니다.
//! 인덱스는 빌드 후 읽기 전용이며, 턴 사이에 공유되는 가변 상태는
//! 없습니다.

use std::path::Path;
use std::sync::Arc;

use crate::embedding::Embedder;
use crate::errors::Result;
use crate::eventlog::{Actor, EventLog, LogEvent};
use crate::extractor::extract_text;
use crate::qa::Extractor;

use super::answerer::answer;
use super::feedback::{AnswerState, Feedback, FeedbackController, TurnState};
use super::index::EmbeddingIndex;
use super::retriever::{retrieve, Query};
use super::segmenter::segment;

// ============================================================================
// SupportBot
// ============================================================================

/// 문서 기반 QA 세션
///
/// 문서당 하나씩 생성합니다. 임베딩/QA 모델은 트레이트로 주입되어
/// 테스트에서 결정적 더블로 대체할 수 있습니다.
pub struct SupportBot {
    index: EmbeddingIndex,
    extractor: Arc<dyn Extractor>,
    log: EventLog,
}

impl SupportBot {
    /// 파일에서 문서 로드 (추출 → 분할 → 인덱스 빌드)
    ///
    /// 추출/분할/빌드 중 하나라도 실패하면 세션은 생성되지 않습니다.
    pub async fn load(
        path: &Path,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn Extractor>,
        log: EventLog,
    ) -> Result<Self> {
        let raw_text = extract_text(path, &log).await?;
        let bot = Self::from_text(&raw_text, embedder, extractor, log).await?;

        tracing::info!("Loaded document: {:?}", path);
        Ok(bot)
    }

    /// 원문 텍스트에서 직접 세션 생성
    pub async fn from_text(
        raw_text: &str,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn Extractor>,
        log: EventLog,
    ) -> Result<Self> {
        let sections = segment(raw_text)?;

        log.log(LogEvent::new(
            Actor::Segmenter,
            "segmented",
            format!("{} sections", sections.len()),
        ));

        let index = EmbeddingIndex::build(sections, embedder, &log).await?;

        log.log(LogEvent::new(
            Actor::Session,
            "loaded",
            format!("{} sections indexed", index.len()),
        ));

        Ok(Self {
            index,
            extractor,
            log,
        })
    }

    /// 쿼리에 대한 최초 답변 생성 (iteration 0)
    pub async fn answer_query(&self, raw_text: &str) -> AnswerState {
        let query = Query::new(raw_text);
        let result = retrieve(&query, &self.index, &self.log).await;

        // 검색 결과 인덱스는 항상 유효하지만, 방어적으로 섹션 0으로 수렴
        let section = self
            .index
            .section(result.section_index)
            .unwrap_or_else(|| &self.index.sections()[0]);

        let answer_text = answer(&query, section, self.extractor.as_ref(), &self.log).await;

        AnswerState {
            query,
            answer_text,
            source_section: section.index,
            iteration: 0,
            feedback: Feedback::None,
        }
    }

    /// 턴 개시: 최초 답변으로 컨트롤러를 `Answered`로 전이
    pub fn begin_turn(&self, state: &AnswerState) -> FeedbackController {
        let mut controller = FeedbackController::new();
        controller.begin(state, &self.log);
        controller
    }

    /// 피드백 적용 (보정 필요 시 검색/답변 재수행)
    pub async fn apply_feedback(
        &self,
        controller: &mut FeedbackController,
        state: &mut AnswerState,
        feedback: Feedback,
    ) -> TurnState {
        controller
            .apply(state, feedback, &self.index, self.extractor.as_ref(), &self.log)
            .await
    }

    /// 세션 종료 기록 + 로그 플러시
    pub fn finish(&self) {
        self.log.log(LogEvent::new(
            Actor::Session,
            "closed",
            "session ended".to_string(),
        ));
        self.log.flush();
    }

    /// 인덱스된 섹션 개수
    pub fn section_count(&self) -> usize {
        self.index.len()
    }

    /// 섹션 원문 조회
    pub fn section_text(&self, index: usize) -> Option<&str> {
        self.index.section(index).map(|s| s.text.as_str())
    }

    /// 세션 이벤트 로그 핸들
    pub fn log(&self) -> &EventLog {
        &self.log
    }
}

// ============================================================================
// Tests
// ============================================================================
