//! CLI 모듈
//!
//! support-bot CLI 명령어 정의 및 구현

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::bot::{Feedback, SupportBot, TurnState, MAX_ITER};
use crate::embedding::{has_api_key, GeminiEmbedder};
use crate::eventlog::EventLog;
use crate::qa::GeminiExtractor;

/// 기본 이벤트 로그 파일
pub const DEFAULT_LOG_PATH: &str = "support_bot_log.txt";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "support-bot")]
#[command(version, about = "문서 기반 고객 지원 QA 봇", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 문서를 로드하고 대화형 QA 세션 시작
    Chat {
        /// 로드할 문서 경로 (.txt 또는 .pdf)
        file: PathBuf,

        /// 이벤트 로그 파일 경로
        #[arg(short, long, default_value = DEFAULT_LOG_PATH)]
        log: PathBuf,
    },

    /// 단일 질문에 대한 답변 출력 (피드백 루프 없음)
    Ask {
        /// 로드할 문서 경로 (.txt 또는 .pdf)
        file: PathBuf,

        /// 질문
        query: String,

        /// 이벤트 로그 파일 경로
        #[arg(short, long, default_value = DEFAULT_LOG_PATH)]
        log: PathBuf,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Chat { file, log } => cmd_chat(&file, &log).await,
        Commands::Ask { file, query, log } => cmd_ask(&file, &query, &log).await,
        Commands::Status => cmd_status(),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 세션 생성 (API 키 확인 + 문서 로드)
async fn load_bot(file: &Path, log_path: &Path) -> Result<SupportBot> {
    if !has_api_key() {
        bail!(
            "API 키가 설정되지 않았습니다.\n\n\
             설정 방법:\n  \
             export GEMINI_API_KEY=your-api-key\n  \
             또는\n  \
             export GOOGLE_AI_API_KEY=your-api-key\n\n\
             API 키 발급: https://aistudio.google.com/app/apikey"
        );
    }

    let embedder = GeminiEmbedder::from_env().context("임베더 초기화 실패")?;
    let extractor = GeminiExtractor::from_env().context("QA 모델 초기화 실패")?;
    let log = EventLog::open(log_path).context("이벤트 로그 열기 실패")?;

    println!("[*] 문서 로드 중: {}", file.display());

    let bot = SupportBot::load(file, Arc::new(embedder), Arc::new(extractor), log)
        .await
        .context("문서 로드 실패")?;

    println!("[OK] {} 섹션 인덱스 완료", bot.section_count());

    Ok(bot)
}

/// 대화형 QA 명령어 (chat)
///
/// 질문 → 답변 → 피드백 루프를 반복합니다. 빈 줄 입력으로
/// 현재 턴을 건너뛰고, `quit`으로 세션을 종료합니다.
async fn cmd_chat(file: &Path, log_path: &Path) -> Result<()> {
    let bot = load_bot(file, log_path).await?;

    println!();
    println!("질문을 입력하세요 (종료: quit)");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("\n질문> ");
        std::io::stdout().flush()?;

        let query = match lines.next() {
            Some(line) => line?,
            None => break, // EOF
        };
        let query = query.trim();

        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("quit") || query.eq_ignore_ascii_case("exit") {
            break;
        }

        let mut state = bot.answer_query(query).await;
        let mut controller = bot.begin_turn(&state);

        println!("\n답변: {}", state.answer_text);

        // 피드백 루프 (최대 MAX_ITER회 보정)
        while controller.state() == TurnState::Answered {
            print!(
                "\n피드백 (good / too vague / not helpful, 건너뛰기: 빈 줄)> "
            );
            std::io::stdout().flush()?;

            let input = match lines.next() {
                Some(line) => line?,
                None => return finish(&bot), // EOF
            };
            let input = input.trim();

            if input.is_empty() {
                // 턴 건너뛰기: 다음 질문으로
                break;
            }

            let feedback = Feedback::parse(input);
            if feedback == Feedback::None {
                println!("[!] 인식할 수 없는 피드백입니다: {}", input);
                continue;
            }

            let previous_answer = state.answer_text.clone();
            let result = bot
                .apply_feedback(&mut controller, &mut state, feedback)
                .await;

            match result {
                TurnState::Answered if state.answer_text != previous_answer => {
                    println!("\n답변 (보정 {}/{}): {}", state.iteration, MAX_ITER, state.answer_text);
                }
                TurnState::Answered => {
                    println!("[*] 답변이 변경되지 않았습니다.");
                }
                TurnState::Done => {
                    println!("[OK] 턴 종료");
                }
                _ => {}
            }
        }
    }

    finish(&bot)
}

fn finish(bot: &SupportBot) -> Result<()> {
    bot.finish();
    println!("\n[*] 세션 종료");
    Ok(())
}

/// 단발 질문 명령어 (ask)
async fn cmd_ask(file: &Path, query: &str, log_path: &Path) -> Result<()> {
    let bot = load_bot(file, log_path).await?;

    println!("[*] 검색 중: \"{}\"", query);

    let state = bot.answer_query(query).await;

    println!();
    println!("답변: {}", state.answer_text);
    if let Some(text) = bot.section_text(state.source_section) {
        println!(
            "      (섹션 #{}: {})",
            state.source_section,
            truncate_text(text, 120)
        );
    }

    bot.finish();
    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status() -> Result<()> {
    println!("support-bot v{}", env!("CARGO_PKG_VERSION"));
    println!();

    if has_api_key() {
        println!("[OK] API 키: 설정됨");
    } else {
        println!("[!] API 키: 미설정");
        println!("    설정: export GEMINI_API_KEY=your-key");
    }

    println!("[*] 기본 이벤트 로그: {}", DEFAULT_LOG_PATH);

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================
