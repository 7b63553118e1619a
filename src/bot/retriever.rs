//! 검색기 - 시맨틱 검색 + 키워드 폴백
//!
//! 쿼리 임베딩과 캐시된 섹션 임베딩의 코사인 유사도로 최적 섹션을
//! 고르고, 임계값 미달이면 불용어를 거른 키워드 중첩으로 폴백합니다.
//! 시맨틱 검색은 패러프레이즈를 처리하고, 키워드 폴백은 짧은
//! FAQ 텍스트에서 유사도가 평평하게 나오는 사각지대를 보완합니다.
//!
//! 검색은 절대 실패하지 않습니다. 임베딩 호출이 두 번 실패하면
//! 키워드 전용으로 degrade하고, 중첩마저 전무하면 섹션 0을
//! 결정적 기본값으로 반환합니다.

use std::collections::HashSet;

use crate::errors::BotError;
use crate::eventlog::{Actor, EventLog, LogEvent};

use super::index::{cosine_similarity, EmbeddingIndex};

// ============================================================================
// Constants
// ============================================================================

/// 시맨틱 검색 신뢰 임계값
pub const SIMILARITY_THRESHOLD: f32 = 0.4;

/// 키워드 폴백용 불용어 목록
const STOPWORDS: &[&str] = &[
    "and", "the", "is", "for", "to", "a", "an", "of", "in", "on", "at", "with", "by", "it", "as",
    "so", "what",
];

// ============================================================================
// Types
// ============================================================================

/// 사용자 쿼리 - 한 턴에 하나 (피드백 반복마다 파생 쿼리 추가)
#[derive(Debug, Clone)]
pub struct Query {
    /// 원문 쿼리
    pub raw_text: String,
    /// 소문자/불용어 제거된 토큰 집합
    pub normalized_tokens: HashSet<String>,
}

impl Query {
    /// 원문에서 쿼리 생성
    pub fn new(raw_text: &str) -> Self {
        Self {
            normalized_tokens: normalize_tokens(raw_text),
            raw_text: raw_text.to_string(),
        }
    }
}

/// 섹션 선택에 사용된 검색 방법
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMethod {
    /// 코사인 유사도 (임계값 이상)
    Semantic,
    /// 키워드 중첩 폴백
    Keyword,
}

/// 검색 결과 - 쿼리마다 새로 생성, 영속화하지 않음
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    /// 선택된 섹션 인덱스
    pub section_index: usize,
    /// 검색 방법
    pub method: SearchMethod,
    /// 스코어 (시맨틱: 코사인 유사도, 키워드: 정규화된 중첩 비율)
    pub score: f32,
}

// ============================================================================
// Retrieval
// ============================================================================

/// 쿼리에 가장 관련 있는 섹션 검색
///
/// 1. 쿼리 임베딩 (실패 시 1회 재시도, 그래도 실패하면 키워드 전용)
/// 2. 전 섹션 코사인 유사도 → 최대값, 동점이면 낮은 인덱스
/// 3. 임계값 이상이면 `Semantic`, 미만이면 키워드 폴백
pub async fn retrieve(query: &Query, index: &EmbeddingIndex, log: &EventLog) -> RetrievalResult {
    if let Some(query_vector) = embed_with_retry(query, index, log).await {
        let (best_index, best_score) = best_by_similarity(&query_vector, index);

        if best_score >= SIMILARITY_THRESHOLD {
            log.log(LogEvent::new(
                Actor::Retriever,
                "semantic_hit",
                format!("section {}, score {:.4}", best_index, best_score),
            ));
            tracing::info!(
                "Found relevant section {} using embeddings (score {:.4})",
                best_index,
                best_score
            );

            return RetrievalResult {
                section_index: best_index,
                method: SearchMethod::Semantic,
                score: best_score,
            };
        }

        log.log(LogEvent::new(
            Actor::Retriever,
            "low_similarity",
            format!("best {:.4} < threshold {}", best_score, SIMILARITY_THRESHOLD),
        ));
        tracing::info!(
            "Low similarity ({:.4}). Falling back to keyword search.",
            best_score
        );
    }

    keyword_fallback(query, index, log)
}

/// 쿼리 임베딩 (1회 재시도 포함)
///
/// 두 번 모두 실패하면 None을 반환하여 키워드 전용으로 degrade합니다.
async fn embed_with_retry(
    query: &Query,
    index: &EmbeddingIndex,
    log: &EventLog,
) -> Option<Vec<f32>> {
    for attempt in 0..2 {
        match index.embed_query(&query.raw_text).await {
            Ok(vector) => return Some(vector),
            Err(BotError::ModelInvocation(msg)) if attempt == 0 => {
                tracing::warn!("Query embedding failed, retrying once: {}", msg);
            }
            Err(e) => {
                log.log(LogEvent::new(
                    Actor::Retriever,
                    "embedding_degraded",
                    format!("query embedding failed twice, keyword-only: {}", e),
                ));
                tracing::warn!("Query embedding failed twice, degrading to keyword-only: {}", e);
                return None;
            }
        }
    }
    None
}

/// 코사인 유사도 최대 섹션 선택 (동점 → 낮은 인덱스)
fn best_by_similarity(query_vector: &[f32], index: &EmbeddingIndex) -> (usize, f32) {
    let mut best_index = 0usize;
    let mut best_score = f32::NEG_INFINITY;

    for (i, embedding) in index.embeddings().iter().enumerate() {
        let score = cosine_similarity(query_vector, embedding);
        // 엄격한 초과 비교로 동점 시 낮은 인덱스 유지
        if score > best_score {
            best_index = i;
            best_score = score;
        }
    }

    (best_index, best_score)
}

/// 키워드 중첩 폴백
///
/// 불용어를 제거한 토큰 집합의 교집합 크기가 가장 큰 섹션을
/// 고릅니다 (동점 → 낮은 인덱스). 모든 섹션의 중첩이 0이면
/// 섹션 0을 스코어 0으로 반환합니다.
fn keyword_fallback(query: &Query, index: &EmbeddingIndex, log: &EventLog) -> RetrievalResult {
    let mut best_index = 0usize;
    let mut best_overlap = 0usize;

    for section in index.sections() {
        let section_tokens = normalize_tokens(&section.text);
        let overlap = query.normalized_tokens.intersection(&section_tokens).count();

        if overlap > best_overlap {
            best_index = section.index;
            best_overlap = overlap;
        }
    }

    if best_overlap == 0 {
        // 결정적 기본값: 검색은 실패하는 대신 섹션 0으로 degrade
        log.log(LogEvent::new(
            Actor::Retriever,
            "keyword_default",
            "no keyword overlap, returning section 0".to_string(),
        ));
        tracing::info!("No keyword match found. Returning default section 0.");

        return RetrievalResult {
            section_index: 0,
            method: SearchMethod::Keyword,
            score: 0.0,
        };
    }

    let score = best_overlap as f32 / query.normalized_tokens.len().max(1) as f32;

    log.log(LogEvent::new(
        Actor::Retriever,
        "keyword_hit",
        format!("section {}, overlap {}", best_index, best_overlap),
    ));
    tracing::info!(
        "Keyword match: section {} with {} common words",
        best_index,
        best_overlap
    );

    RetrievalResult {
        section_index: best_index,
        method: SearchMethod::Keyword,
        score,
    }
}

/// 소문자 토큰화 + 구두점 트리밍 + 불용어 제거
fn normalize_tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| !word.is_empty() && !STOPWORDS.contains(word))
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::testing::StubEmbedder;
    use super::*;
    use crate::bot::index::EmbeddingIndex;
    use crate::bot::segmenter::segment;
    use std::sync::Arc;

    async fn build_index(text: &str, embedder: StubEmbedder) -> EmbeddingIndex {
        let sections = segment(text).expect("segment");
        EmbeddingIndex::build(sections, Arc::new(embedder), &EventLog::sink())
            .await
            .expect("build")
    }

    #[test]
    fn test_normalize_tokens_filters_stopwords() {
        let tokens = normalize_tokens("What is the refund policy?");
        assert!(tokens.contains("refund"));
        assert!(tokens.contains("policy"));
        assert!(!tokens.contains("what"));
        assert!(!tokens.contains("the"));
        assert!(!tokens.contains("is"));
    }

    #[test]
    fn test_normalize_tokens_trims_punctuation() {
        let tokens = normalize_tokens("policy? Policy. (policy)");
        assert_eq!(tokens.len(), 1);
        assert!(tokens.contains("policy"));
    }

    #[tokio::test]
    async fn test_semantic_above_threshold() {
        let embedder = StubEmbedder::new(3)
            .with("hours section", vec![1.0, 0.0, 0.0])
            .with("refund section", vec![0.0, 1.0, 0.0])
            .with("query", vec![0.1, 0.9, 0.0]);
        let index = build_index("hours section\n\nrefund section", embedder).await;

        let query = Query::new("query");
        let result = retrieve(&query, &index, &EventLog::sink()).await;

        assert_eq!(result.section_index, 1);
        assert_eq!(result.method, SearchMethod::Semantic);
        assert!(result.score >= SIMILARITY_THRESHOLD);
    }

    #[tokio::test]
    async fn test_tie_break_lowest_index() {
        // 두 섹션이 같은 임베딩 → 동일 유사도 → 낮은 인덱스
        let embedder = StubEmbedder::new(3)
            .with("alpha one", vec![1.0, 0.0, 0.0])
            .with("beta two", vec![1.0, 0.0, 0.0])
            .with("query", vec![1.0, 0.0, 0.0]);
        let index = build_index("alpha one\n\nbeta two", embedder).await;

        let query = Query::new("query");
        for _ in 0..3 {
            let result = retrieve(&query, &index, &EventLog::sink()).await;
            assert_eq!(result.section_index, 0);
            assert_eq!(result.method, SearchMethod::Semantic);
        }
    }

    #[tokio::test]
    async fn test_keyword_fallback_selects_overlap() {
        // 쿼리 임베딩이 제로 벡터 → 전 섹션 유사도 0 → 폴백
        let embedder = StubEmbedder::new(3)
            .with("shipping takes five days", vec![1.0, 0.0, 0.0])
            .with("warranty covers two years", vec![0.0, 1.0, 0.0]);
        let index =
            build_index("shipping takes five days\n\nwarranty covers two years", embedder).await;

        let query = Query::new("zzxqv warranty covers?");
        let result = retrieve(&query, &index, &EventLog::sink()).await;

        assert_eq!(result.section_index, 1);
        assert_eq!(result.method, SearchMethod::Keyword);
        assert!(result.score > 0.0);
    }

    #[tokio::test]
    async fn test_flat_similarity_zero_overlap_defaults_to_first() {
        // 유사도 전부 0 + 키워드 중첩 0 → 섹션 0, 스코어 0
        let embedder = StubEmbedder::new(3)
            .with("alpha", vec![1.0, 0.0, 0.0])
            .with("beta", vec![0.0, 1.0, 0.0])
            .with("gamma", vec![0.0, 0.0, 1.0]);
        let index = build_index("alpha\n\nbeta\n\ngamma", embedder).await;

        let query = Query::new("zzxqv wwyxk");
        let result = retrieve(&query, &index, &EventLog::sink()).await;

        assert_eq!(result.section_index, 0);
        assert_eq!(result.method, SearchMethod::Keyword);
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn test_keyword_tie_break_lowest_index() {
        let embedder = StubEmbedder::new(3)
            .with("blue widget parts", vec![1.0, 0.0, 0.0])
            .with("blue widget manual", vec![0.0, 1.0, 0.0]);
        let index = build_index("blue widget parts\n\nblue widget manual", embedder).await;

        // "blue widget"는 두 섹션 모두 2개 중첩 → 섹션 0
        let query = Query::new("blue widget");
        let result = retrieve(&query, &index, &EventLog::sink()).await;
        assert_eq!(result.section_index, 0);
        assert_eq!(result.method, SearchMethod::Keyword);
    }

    #[tokio::test]
    async fn test_degrades_to_keyword_on_embed_failure() {
        let embedder = StubEmbedder::new(3)
            .with("shipping takes five days", vec![1.0, 0.0, 0.0])
            .with("warranty covers two years", vec![0.0, 1.0, 0.0])
            .failing_queries();
        let index =
            build_index("shipping takes five days\n\nwarranty covers two years", embedder).await;

        let query = Query::new("how long does shipping take");
        let result = retrieve(&query, &index, &EventLog::sink()).await;

        // 임베딩 실패 후에도 턴은 계속됨 (키워드 전용)
        assert_eq!(result.method, SearchMethod::Keyword);
        assert_eq!(result.section_index, 0);
    }
}
