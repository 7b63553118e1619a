//! 지원 봇 코어 파이프라인
//!
//! 문서 분할(segmenter) → 임베딩 인덱스(index) → 하이브리드 검색
//! (retriever) → 추출형 답변(answerer) → 피드백 루프(feedback)를
//! 세션(agent)이 묶어서 구동합니다.

pub mod agent;
pub mod answerer;
pub mod feedback;
pub mod index;
pub mod retriever;
pub mod segmenter;

pub use agent::SupportBot;
pub use answerer::{answer, CONFIDENCE_THRESHOLD};
pub use feedback::{AnswerState, Feedback, FeedbackController, TurnState, MAX_ITER};
pub use index::{cosine_similarity, EmbeddingIndex};
pub use retriever::{retrieve, Query, RetrievalResult, SearchMethod, SIMILARITY_THRESHOLD};
pub use segmenter::{segment, Section};

// ============================================================================
// Test Doubles
// ============================================================================
