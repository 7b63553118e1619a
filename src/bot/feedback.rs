//! 피드백 컨트롤러 - 유한 상태 기계로 모델링한 답변 보정 루프
//!
//! 한 턴은 `Initial`에서 시작해 최초 검색+답변으로 `Answered`가 되고,
//! 피드백에 따라 최대 `MAX_ITER`회 보정을 거쳐 `Done`으로 끝납니다.
//! 피드백은 자유 문자열 매칭이 아니라 열거형으로 구분합니다.
//!
//! - `Good`: 현재 답변을 그대로 확정
//! - `Vague`: 같은 섹션에서 아직 포함되지 않은 텍스트를 덧붙임
//! - `NotHelpful`: 쿼리를 다시 써서 검색+답변을 재수행
//!
//! 보정 단계가 실패하면 마지막 정상 답변을 유지한 채 턴을 종료합니다.
//! iteration은 보정마다 정확히 1씩 증가하며 [0, MAX_ITER]를 벗어나지
//! 않습니다.

use crate::eventlog::{Actor, EventLog, LogEvent};
use crate::qa::Extractor;

use super::answerer::answer;
use super::index::EmbeddingIndex;
use super::retriever::{retrieve, Query};

// ============================================================================
// Constants
// ============================================================================

/// 턴당 최대 보정 횟수
pub const MAX_ITER: u32 = 2;

/// 재검색 시 쿼리에 덧붙이는 상세 요청
const DETAIL_SUFFIX: &str = " Please provide more detailed information with examples.";

// ============================================================================
// Types
// ============================================================================

/// 사용자 피드백
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    /// 아직 피드백 없음 / 인식할 수 없는 입력
    None,
    /// 만족 - 답변 확정
    Good,
    /// 너무 모호함 - 컨텍스트 보강 요청
    Vague,
    /// 도움 안 됨 - 재검색 요청
    NotHelpful,
}

impl Feedback {
    /// 사용자 입력 토큰 파싱
    ///
    /// `good` / `too vague` / `not helpful`만 인식하며
    /// 그 외 입력은 `None`으로 돌려 재입력을 유도합니다.
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "good" => Feedback::Good,
            "too vague" | "vague" => Feedback::Vague,
            "not helpful" => Feedback::NotHelpful,
            _ => Feedback::None,
        }
    }

    /// 로그용 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Feedback::None => "none",
            Feedback::Good => "good",
            Feedback::Vague => "too vague",
            Feedback::NotHelpful => "not helpful",
        }
    }
}

/// 턴 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// 턴 시작 전
    Initial,
    /// 답변이 나와 피드백 대기 중
    Answered,
    /// 보정 수행 중 (일시 상태)
    Adjusted,
    /// 턴 종료
    Done,
}

/// 한 턴의 답변 상태 - 피드백 반복 동안 제자리에서 변경됨
#[derive(Debug, Clone)]
pub struct AnswerState {
    /// 현재 쿼리 (재검색 시 파생 쿼리로 교체)
    pub query: Query,
    /// 현재 답변 텍스트
    pub answer_text: String,
    /// 답변의 출처 섹션 인덱스
    pub source_section: usize,
    /// 보정 횟수 [0, MAX_ITER]
    pub iteration: u32,
    /// 마지막 피드백
    pub feedback: Feedback,
}

// ============================================================================
// FeedbackController
// ============================================================================

/// 피드백 상태 기계
pub struct FeedbackController {
    state: TurnState,
}

impl Default for FeedbackController {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackController {
    /// 새 턴 시작 (`Initial` 상태)
    pub fn new() -> Self {
        Self {
            state: TurnState::Initial,
        }
    }

    /// 현재 상태
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// 최초 답변으로 턴 개시: `Initial` -> `Answered`
    pub fn begin(&mut self, answer: &AnswerState, log: &EventLog) {
        debug_assert_eq!(self.state, TurnState::Initial);
        self.state = TurnState::Answered;

        log.log(LogEvent::new(
            Actor::Controller,
            "answered",
            format!(
                "iteration {}, section {}: {}",
                answer.iteration, answer.source_section, answer.answer_text
            ),
        ));
    }

    /// 피드백 적용
    ///
    /// `Answered`에서 피드백에 따라 전이하고 결과 상태를 반환합니다.
    /// 인식할 수 없는 피드백(`None`)은 iteration을 소모하지 않고
    /// `Answered`에 머뭅니다.
    pub async fn apply(
        &mut self,
        state: &mut AnswerState,
        feedback: Feedback,
        index: &EmbeddingIndex,
        extractor: &dyn Extractor,
        log: &EventLog,
    ) -> TurnState {
        if self.state != TurnState::Answered {
            return self.state;
        }

        match feedback {
            Feedback::None => {
                log.log(LogEvent::new(
                    Actor::Controller,
                    "invalid_feedback",
                    "unrecognized feedback, awaiting valid input".to_string(),
                ));
                self.state
            }
            Feedback::Good => {
                state.feedback = Feedback::Good;
                self.state = TurnState::Done;

                log.log(LogEvent::new(
                    Actor::Controller,
                    "done",
                    format!("feedback good, final answer: {}", state.answer_text),
                ));
                self.state
            }
            Feedback::Vague | Feedback::NotHelpful => {
                // 반복 상한 도달 → 현재 답변으로 종료
                if state.iteration >= MAX_ITER {
                    state.feedback = feedback;
                    self.state = TurnState::Done;

                    log.log(LogEvent::new(
                        Actor::Controller,
                        "done",
                        format!(
                            "iteration cap {} reached on '{}', final answer: {}",
                            MAX_ITER,
                            feedback.as_str(),
                            state.answer_text
                        ),
                    ));
                    return self.state;
                }

                self.state = TurnState::Adjusted;

                let adjusted = match feedback {
                    Feedback::Vague => self.adjust_vague(state, index, log),
                    Feedback::NotHelpful => {
                        self.adjust_not_helpful(state, index, extractor, log).await
                    }
                    _ => unreachable!(),
                };

                if !adjusted {
                    // 보정 실패 → 마지막 정상 답변 유지, 턴 종료
                    self.state = TurnState::Done;
                    log.log(LogEvent::new(
                        Actor::Controller,
                        "adjust_failed",
                        format!("keeping last known-good answer: {}", state.answer_text),
                    ));
                    return self.state;
                }

                state.iteration += 1;
                state.feedback = feedback;
                self.state = TurnState::Answered;

                log.log(LogEvent::new(
                    Actor::Controller,
                    "adjusted",
                    format!(
                        "feedback '{}', iteration {}, section {}: {}",
                        feedback.as_str(),
                        state.iteration,
                        state.source_section,
                        state.answer_text
                    ),
                ));
                self.state
            }
        }
    }

    /// `Vague` 보정: 출처 섹션에서 아직 포함되지 않은 텍스트를 덧붙임
    ///
    /// 답변에 섹션 전문이 이미 들어 있으면 텍스트 변경 없는 no-op입니다
    /// (중복 덧붙임 금지). iteration은 호출자가 증가시킵니다.
    fn adjust_vague(&self, state: &mut AnswerState, index: &EmbeddingIndex, log: &EventLog) -> bool {
        let section = match index.section(state.source_section) {
            Some(section) => section,
            None => return false,
        };

        if state.answer_text.contains(&section.text) {
            log.log(LogEvent::new(
                Actor::Controller,
                "context_exhausted",
                format!("section {} already fully included", state.source_section),
            ));
            return true;
        }

        state.answer_text = format!(
            "{}\n\n(More details:\n{})",
            state.answer_text, section.text
        );
        true
    }

    /// `NotHelpful` 보정: 쿼리를 다시 써서 검색+답변 재수행
    ///
    /// 새 검색이므로 다른 섹션이 선택될 수 있습니다.
    async fn adjust_not_helpful(
        &self,
        state: &mut AnswerState,
        index: &EmbeddingIndex,
        extractor: &dyn Extractor,
        log: &EventLog,
    ) -> bool {
        let rewritten = Query::new(&format!("{}{}", state.query.raw_text, DETAIL_SUFFIX));

        let result = retrieve(&rewritten, index, log).await;
        let section = match index.section(result.section_index) {
            Some(section) => section,
            None => return false,
        };

        state.answer_text = answer(&rewritten, section, extractor, log).await;
        state.source_section = result.section_index;
        state.query = rewritten;
        true
    }
}

// ============================================================================
// Tests
// ============================================================================
