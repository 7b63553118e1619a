//! 임베딩 인덱스
//!
//! 문서 로드 시 섹션별 임베딩을 한 번 계산해 캐시합니다.
//! 빌드 이후에는 절대 변경되지 않으며, 쿼리 시점에는 이 캐시와
//! `embed_query`만 사용합니다. 빌드 중 임베딩 호출이 실패하거나
//! 차원이 어긋나면 전체 빌드가 실패합니다 (부분 인덱스 사용 불가).

use std::sync::Arc;

use crate::embedding::Embedder;
use crate::errors::{BotError, Result};
use crate::eventlog::{Actor, EventLog, LogEvent};

use super::segmenter::Section;

// ============================================================================
// EmbeddingIndex
// ============================================================================

/// 섹션 인덱스 -> 임베딩 벡터 매핑을 보관하는 읽기 전용 인덱스
pub struct EmbeddingIndex {
    sections: Vec<Section>,
    embeddings: Vec<Vec<f32>>,
    dimension: usize,
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingIndex {
    /// 섹션 목록으로 인덱스 빌드
    ///
    /// 섹션 순서대로 임베딩을 계산합니다. 어떤 섹션이든 임베딩에
    /// 실패하거나 차원이 일치하지 않으면 `Embedding` 에러로
    /// 전체 빌드가 실패합니다.
    pub async fn build(
        sections: Vec<Section>,
        embedder: Arc<dyn Embedder>,
        log: &EventLog,
    ) -> Result<Self> {
        let mut embeddings = Vec::with_capacity(sections.len());
        let mut dimension = 0usize;

        for section in &sections {
            let embedding = embedder.embed(&section.text).await.map_err(|e| {
                BotError::Embedding(format!("section {}: {}", section.index, e))
            })?;

            // 첫 섹션의 차원을 기준으로 일관성 검사
            if dimension == 0 {
                dimension = embedding.len();
            } else if embedding.len() != dimension {
                return Err(BotError::Embedding(format!(
                    "dimension mismatch at section {}: expected {}, got {}",
                    section.index,
                    dimension,
                    embedding.len()
                )));
            }

            embeddings.push(embedding);
        }

        if dimension == 0 {
            return Err(BotError::Embedding("empty embedding vectors".to_string()));
        }

        log.log(LogEvent::new(
            Actor::Index,
            "built",
            format!(
                "{} sections, dimension {}, model {}",
                sections.len(),
                dimension,
                embedder.name()
            ),
        ));
        tracing::info!(
            "Embedding index built: {} sections, dimension {}",
            sections.len(),
            dimension
        );

        Ok(Self {
            sections,
            embeddings,
            dimension,
            embedder,
        })
    }

    /// 쿼리 텍스트 임베딩 (섹션과 같은 모델 사용)
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder.embed(text).await
    }

    /// 섹션 목록 (인덱스 순서)
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// 인덱스로 섹션 조회
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    /// 캐시된 임베딩 (섹션 인덱스 순서)
    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    /// 임베딩 차원
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// 섹션 개수
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// 섹션이 없는지 여부 (빌드 성공 시 항상 false)
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

// ============================================================================
// Cosine Similarity
// ============================================================================

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위입니다. 길이가 다르거나 한쪽이
/// 제로 벡터이면 0.0을 반환합니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================
