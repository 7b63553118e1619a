//! Event Log - 세션별 추가 전용(append-only) 이벤트 기록
//!
//! 코어의 모든 결정 지점이 이벤트를 남깁니다.
//! 기록은 fire-and-forget: 쓰기 실패는 tracing 경고만 남기고
//! 절대 호출자에게 전파되지 않습니다. 코어는 기록을 읽지 않습니다.
//!
//! 한 줄 = 한 이벤트, 타임스탬프가 붙은 평문 레코드입니다.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

// ============================================================================
// Types
// ============================================================================

/// 이벤트를 발생시킨 컴포넌트
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// 문서 세션 (로드/종료)
    Session,
    /// 텍스트 추출기
    Extractor,
    /// 섹션 분할기
    Segmenter,
    /// 임베딩 인덱스
    Index,
    /// 검색기
    Retriever,
    /// 답변 추출기
    Answerer,
    /// 피드백 컨트롤러
    Controller,
}

impl Actor {
    /// 로그 라인용 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Actor::Session => "session",
            Actor::Extractor => "extractor",
            Actor::Segmenter => "segmenter",
            Actor::Index => "index",
            Actor::Retriever => "retriever",
            Actor::Answerer => "answerer",
            Actor::Controller => "controller",
        }
    }
}

/// 로그 이벤트
#[derive(Debug, Clone)]
pub struct LogEvent {
    /// 발생 시각 (UTC)
    pub timestamp: DateTime<Utc>,
    /// 발생 컴포넌트
    pub actor: Actor,
    /// 수행한 동작
    pub action: String,
    /// 상세 내용
    pub detail: String,
}

impl LogEvent {
    /// 현재 시각으로 이벤트 생성
    pub fn new(actor: Actor, action: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            actor,
            action: action.into(),
            detail: detail.into(),
        }
    }

    /// 평문 로그 라인으로 변환
    fn to_line(&self) -> String {
        format!(
            "{} - [{}] {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.actor.as_str(),
            self.action,
            self.detail.replace('\n', " ")
        )
    }
}

// ============================================================================
// EventLog
// ============================================================================

enum Sink {
    File(File),
    Null,
}

/// Event Log 핸들
///
/// 문서 세션당 하나씩 생성하여 각 컴포넌트에 명시적으로 전달합니다.
/// 프로세스 전역 싱글톤을 두지 않습니다.
pub struct EventLog {
    sink: Arc<Mutex<Sink>>,
    path: Option<PathBuf>,
}

impl EventLog {
    /// 로그 파일 열기 (append 모드, 없으면 생성)
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).context("Failed to create log directory")?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {:?}", path))?;

        Ok(Self {
            sink: Arc::new(Mutex::new(Sink::File(file))),
            path: Some(path.to_path_buf()),
        })
    }

    /// 아무것도 기록하지 않는 널 싱크 (테스트용)
    pub fn sink() -> Self {
        Self {
            sink: Arc::new(Mutex::new(Sink::Null)),
            path: None,
        }
    }

    /// 이벤트 기록 (fire-and-forget)
    ///
    /// 쓰기 실패는 경고만 남기고 무시합니다.
    pub fn log(&self, event: LogEvent) {
        let line = event.to_line();
        tracing::debug!("{}", line);

        let mut sink = match self.sink.lock() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::warn!("Event log lock poisoned: {}", e);
                return;
            }
        };

        if let Sink::File(ref mut file) = *sink {
            if let Err(e) = writeln!(file, "{}", line) {
                tracing::warn!("Failed to write log event: {}", e);
            }
        }
    }

    /// 버퍼 플러시 (세션 종료 시)
    pub fn flush(&self) {
        if let Ok(mut sink) = self.sink.lock() {
            if let Sink::File(ref mut file) = *sink {
                if let Err(e) = file.flush() {
                    tracing::warn!("Failed to flush log file: {}", e);
                }
            }
        }
    }

    /// 로그 파일 경로 (널 싱크면 None)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            path: self.path.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line_format() {
        let event = LogEvent::new(Actor::Retriever, "semantic_hit", "section 2, score 0.8123");
        let line = event.to_line();

        assert!(line.contains("[retriever]"));
        assert!(line.contains("semantic_hit: section 2, score 0.8123"));
    }

    #[test]
    fn test_log_line_strips_newlines() {
        let event = LogEvent::new(Actor::Answerer, "answer", "line one\nline two");
        let line = event.to_line();
        assert!(!line.contains('\n'));
        assert!(line.contains("line one line two"));
    }

    #[test]
    fn test_append_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bot.log");

        let log = EventLog::open(&path).expect("open log");
        log.log(LogEvent::new(Actor::Session, "load", "document loaded"));
        log.log(LogEvent::new(Actor::Segmenter, "segment", "2 sections"));
        log.flush();

        let content = std::fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[session] load"));
        assert!(lines[1].contains("[segmenter] segment"));
    }

    #[test]
    fn test_null_sink_is_noop() {
        let log = EventLog::sink();
        log.log(LogEvent::new(Actor::Controller, "done", "final answer"));
        log.flush();
        assert!(log.path().is_none());
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bot.log");

        {
            let log = EventLog::open(&path).expect("open");
            log.log(LogEvent::new(Actor::Session, "load", "first"));
            log.flush();
        }
        {
            let log = EventLog::open(&path).expect("reopen");
            log.log(LogEvent::new(Actor::Session, "load", "second"));
            log.flush();
        }

        let content = std::fs::read_to_string(&path).expect("read");
        assert_eq!(content.lines().count(), 2);
    }
}
