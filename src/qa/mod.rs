//! QA 모듈 - 추출형 질의응답 모델 인터페이스
//!
//! 질문과 컨텍스트를 받아 컨텍스트 내의 답변 구간(span)과
//! 신뢰도를 반환하는 `Extractor` 트레이트와 Gemini 구현체입니다.
//! 모델은 불투명한 추론 함수로 취급하며, 테스트에서는
//! 고정 출력 더블로 대체합니다.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{BotError, Result};

// ============================================================================
// Extractor Trait
// ============================================================================

/// 추출된 답변 구간
#[derive(Debug, Clone)]
pub struct AnswerSpan {
    /// 컨텍스트에서 추출된 답변 텍스트
    pub text: String,
    /// 모델 신뢰도 (0.0 ~ 1.0)
    pub confidence: f32,
}

/// 추출형 QA 트레이트
///
/// `extract_answer(question, context) -> (span, confidence)` 하나만 갖는
/// 좁은 능력 인터페이스입니다.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// 컨텍스트에서 질문에 대한 답변 구간 추출 (실패 시 `ModelInvocation`)
    async fn extract_answer(&self, question: &str, context: &str) -> Result<AnswerSpan>;

    /// 모델 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Google Gemini Extractor
// ============================================================================

/// Gemini 생성 API 엔드포인트
/// source: https://ai.google.dev/gemini-api/docs/text-generation
const GEMINI_GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

/// HTTP 타임아웃
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Gemini 기반 추출형 QA 구현체
///
/// 생성 모델에 JSON 형식의 추출 결과를 요구하여
/// (span, confidence) 쌍으로 변환합니다. temperature 0으로
/// 같은 입력에 같은 출력을 유도합니다.
#[derive(Debug)]
pub struct GeminiExtractor {
    api_key: String,
    client: reqwest::Client,
}

impl GeminiExtractor {
    /// 새 Gemini QA 인스턴스 생성
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BotError::ModelInvocation(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { api_key, client })
    }

    /// 환경변수에서 API 키를 읽어 생성
    pub fn from_env() -> Result<Self> {
        let api_key = crate::embedding::get_api_key()?;
        Self::new(api_key)
    }

    /// QA 프롬프트 구성
    fn build_prompt(question: &str, context: &str) -> String {
        format!(
            "You are an extractive question answering system.\n\
             Answer the question using ONLY a short verbatim span copied from the context.\n\
             Respond with a single JSON object: {{\"answer\": \"<span>\", \"confidence\": <0.0-1.0>}}.\n\
             If the context does not contain an answer, use an empty answer and confidence 0.0.\n\n\
             Question: {}\n\nContext:\n{}",
            question, context
        )
    }
}

/// Gemini 생성 API 요청 본문
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<GenerateContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerateContent {
    parts: Vec<GeneratePart>,
}

#[derive(Debug, Serialize)]
struct GeneratePart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

/// Gemini 생성 API 응답
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}

/// 모델이 반환하는 JSON 형식
#[derive(Debug, Deserialize)]
struct SpanJson {
    answer: String,
    #[serde(default)]
    confidence: f32,
}

#[async_trait]
impl Extractor for GeminiExtractor {
    async fn extract_answer(&self, question: &str, context: &str) -> Result<AnswerSpan> {
        let request = GenerateRequest {
            contents: vec![GenerateContent {
                parts: vec![GeneratePart {
                    text: Self::build_prompt(question, context),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        };

        let response = self
            .client
            .post(GEMINI_GENERATE_URL)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BotError::ModelInvocation(format!("QA request failed: {}", e)))?;

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

        let generate_response: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| BotError::ModelInvocation(format!("invalid QA response: {}", e)))?;

        let text = generate_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| BotError::ModelInvocation("empty QA response".to_string()))?;

        Ok(parse_span(text))
    }

    fn name(&self) -> &str {
        "gemini-2.0-flash"
    }
}

/// 모델 출력에서 (span, confidence) 파싱
///
/// JSON 파싱에 실패하면 원문을 그대로 span으로 사용하고
/// 신뢰도는 보수적으로 0.5를 부여합니다.
fn parse_span(text: &str) -> AnswerSpan {
    let cleaned = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    match serde_json::from_str::<SpanJson>(cleaned) {
        Ok(span) => AnswerSpan {
            text: span.answer.trim().to_string(),
            confidence: span.confidence.clamp(0.0, 1.0),
        },
        Err(_) => AnswerSpan {
            text: cleaned.to_string(),
            confidence: 0.5,
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
