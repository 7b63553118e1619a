//! 임베딩 모듈 - Gemini API를 통한 텍스트 벡터화
//!
//! 텍스트를 고정 길이 벡터로 변환하는 `Embedder` 트레이트와
//! Gemini 구현체를 제공합니다. 동일 입력에 대해 결정적인 벡터를
//! 반환하는 것을 전제로 합니다 (temperature 없는 임베딩 모델).
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = GeminiEmbedder::from_env()?;
//! let vector = embedder.embed("Hello, world!").await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{BotError, Result};

// ============================================================================
// Embedder Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 외부 임베딩 모델에 대한 좁은 능력 인터페이스입니다.
/// 테스트에서는 고정 출력을 내는 더블로 대체합니다.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// 단일 텍스트 임베딩 (실패 시 `ModelInvocation`)
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Google Gemini Embedder
// ============================================================================

/// Gemini 임베딩 API 엔드포인트 (gemini-embedding-001)
/// source: https://ai.google.dev/gemini-api/docs/embeddings
const GEMINI_EMBED_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-embedding-001:embedContent";

/// 기본 임베딩 차원
pub const DEFAULT_DIMENSION: usize = 768;

/// HTTP 타임아웃
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Google Gemini 임베딩 구현체
///
/// 쿼리와 섹션을 같은 모델로 임베딩해야 유사도 비교가 유효하므로
/// task type은 대칭 비교용 SEMANTIC_SIMILARITY로 고정합니다.
#[derive(Debug)]
pub struct GeminiEmbedder {
    api_key: String,
    client: reqwest::Client,
    dimension: usize,
}

impl GeminiEmbedder {
    /// 새 Gemini 임베더 생성
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_dimension(api_key, DEFAULT_DIMENSION)
    }

    /// 차원을 지정하여 생성 (768, 1536, 3072 중 선택)
    pub fn with_dimension(api_key: String, dimension: usize) -> Result<Self> {
        if ![768, 1536, 3072].contains(&dimension) {
            return Err(BotError::Embedding(format!(
                "invalid dimension: {}. Must be 768, 1536, or 3072",
                dimension
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BotError::Embedding(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            client,
            dimension,
        })
    }

    /// 환경변수에서 API 키를 읽어 생성
    pub fn from_env() -> Result<Self> {
        let api_key = get_api_key()?;
        Self::new(api_key)
    }
}

/// Gemini API 요청 본문
/// source: https://ai.google.dev/gemini-api/docs/embeddings
#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: EmbedContent,
    #[serde(rename = "taskType")]
    task_type: String,
    #[serde(rename = "outputDimensionality")]
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct EmbedContent {
    parts: Vec<EmbedPart>,
}

#[derive(Debug, Serialize)]
struct EmbedPart {
    text: String,
}

/// Gemini API 응답
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // 빈 텍스트는 API 호출 없이 제로 벡터
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }

        let request = EmbedRequest {
            model: "models/gemini-embedding-001".to_string(),
            content: EmbedContent {
                parts: vec![EmbedPart {
                    text: text.to_string(),
                }],
            },
            task_type: "SEMANTIC_SIMILARITY".to_string(),
            output_dimensionality: self.dimension,
        };

        // API 키는 URL이 아닌 헤더로 전송
        let response = self
            .client
            .post(GEMINI_EMBED_URL)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BotError::ModelInvocation(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BotError::ModelInvocation(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(BotError::ModelInvocation(format!(
                "Gemini API error ({}): {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = serde_json::from_str(&body)
            .map_err(|e| BotError::ModelInvocation(format!("invalid embedding response: {}", e)))?;

        let values = embed_response.embedding.values;

        // 차원 불일치는 인덱스를 오염시키므로 즉시 실패
        if values.len() != self.dimension {
            return Err(BotError::ModelInvocation(format!(
                "dimension mismatch: expected {}, got {}",
                self.dimension,
                values.len()
            )));
        }

        Ok(values)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "gemini-embedding-001"
    }
}

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 로드 (환경변수에서)
///
/// 우선순위:
/// 1. `GEMINI_API_KEY` 환경변수
/// 2. `GOOGLE_AI_API_KEY` 환경변수
pub fn get_api_key() -> Result<String> {
    for var in ["GEMINI_API_KEY", "GOOGLE_AI_API_KEY"] {
        if let Ok(key) = std::env::var(var) {
            if !key.is_empty() {
                tracing::debug!("Using API key from {}", var);
                return Ok(key);
            }
        }
    }

    Err(BotError::ModelInvocation(
        "API key not found. Set GEMINI_API_KEY or GOOGLE_AI_API_KEY environment variable."
            .to_string(),
    ))
}

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    get_api_key().is_ok()
}

// ============================================================================
// Tests
// ============================================================================
