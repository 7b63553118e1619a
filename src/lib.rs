//! support-bot - 문서 기반 고객 지원 QA 봇
//!
//! 업로드된 문서를 단락 단위 섹션으로 분할하고, 임베딩 유사도
//! (키워드 폴백 포함)로 섹션을 검색한 뒤 추출형 QA로 답변을
//! 생성합니다. 사용자 피드백(good / too vague / not helpful)에 따라
//! 답변을 유한 횟수만큼 보정하며, 모든 단계는 append-only 이벤트
//! 로그에 기록됩니다.

pub mod bot;
pub mod cli;
pub mod embedding;
pub mod errors;
pub mod eventlog;
pub mod extractor;
pub mod qa;

// Re-exports
pub use bot::{
    answer, cosine_similarity, retrieve, segment, AnswerState, EmbeddingIndex, Feedback,
    FeedbackController, Query, RetrievalResult, SearchMethod, Section, SupportBot, TurnState,
    CONFIDENCE_THRESHOLD, MAX_ITER, SIMILARITY_THRESHOLD,
};
pub use embedding::{get_api_key, has_api_key, Embedder, GeminiEmbedder};
pub use errors::{BotError, Result};
pub use eventlog::{Actor, EventLog, LogEvent};
pub use extractor::{extract_text, FileType};
pub use qa::{AnswerSpan, Extractor, GeminiExtractor};
