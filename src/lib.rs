//! Collab CAT - Collaborative Translation Editor Core
//!
//! 문서 세그먼트 분할, 번역 메모리/용어집 매칭, 인용 해석, 실시간 공동 편집을 담당하는
//! 라이브러리입니다. 전송 계층(HTTP/WebSocket)은 `commands`와 `collab::RoomHub` 위에 얹습니다.

pub mod collab;
pub mod commands;
pub mod config;
pub mod db;
pub mod docx;
pub mod document;
pub mod error;
pub mod matching;
pub mod models;
pub mod mt;
pub mod references;
pub mod segmenter;
pub mod utils;

use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use crate::collab::{Broadcaster, Clock, CollabEngine, RoomHub, SystemClock};
use crate::config::AppConfig;
use crate::db::{Database, DbState};
use crate::error::EditorError;
use crate::mt::{DeeplTranslator, MachineTranslator};
use crate::references::bible_api::BibleTextClient;
use crate::references::AbbreviationCache;
use crate::segmenter::{PunctuationSplitter, SentenceSplitter};

/// tracing 구독자 설치. `RUST_LOG`가 있으면 우선하며, 이미 설치돼 있으면 무시합니다.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 명령 계층이 공유하는 앱 상태
pub struct AppState {
    pub config: AppConfig,
    pub db: Arc<DbState>,
    pub hub: Arc<RoomHub>,
    pub engine: CollabEngine,
    pub abbreviations: AbbreviationCache,
    pub splitter: Arc<dyn SentenceSplitter>,
    pub bible: BibleTextClient,
    pub translator: Arc<dyn MachineTranslator>,
}

impl AppState {
    /// 설정대로 DB를 열고 엔진/클라이언트를 구성
    pub fn bootstrap(config: AppConfig) -> Result<Self, EditorError> {
        let db = Database::new(&config.database_path)?;
        db.initialize()?;
        tracing::info!(path = %config.database_path.display(), "database ready");

        let translator = DeeplTranslator::new(
            &config.deepl_api_url,
            config.deepl_api_key.clone(),
            config.http_timeout,
        )?;
        Self::assemble(config, db, Arc::new(translator), Arc::new(SystemClock))
    }

    /// 메모리 DB와 주어진 번역기/시계로 구성 (임베딩/테스트용)
    pub fn in_memory(
        config: AppConfig,
        translator: Arc<dyn MachineTranslator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EditorError> {
        let db = Database::open_in_memory()?;
        db.initialize()?;
        Self::assemble(config, db, translator, clock)
    }

    fn assemble(
        config: AppConfig,
        db: Database,
        translator: Arc<dyn MachineTranslator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EditorError> {
        let db = Arc::new(DbState(Mutex::new(db)));
        let hub = Arc::new(RoomHub::new());
        let broadcaster: Arc<dyn Broadcaster> = hub.clone();
        let engine = CollabEngine::new(Arc::clone(&db), broadcaster, clock, config.presence_timeout)?;
        let bible = BibleTextClient::with_timeout(&config.bible_api_url, config.http_timeout)?;

        Ok(Self {
            abbreviations: AbbreviationCache::new(config.abbreviations_dir.clone()),
            splitter: Arc::new(PunctuationSplitter),
            config,
            db,
            hub,
            engine,
            bible,
            translator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mt::{MockMode, MockTranslator};

    #[test]
    fn test_bootstrap_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            database_path: dir.path().join("nested").join("cat.db"),
            ..AppConfig::default()
        };
        let state = AppState::bootstrap(config).unwrap();
        assert!(state.config.database_path.exists());
        assert_eq!(state.translator.provider_name(), "deepl");
    }

    #[test]
    fn test_in_memory_state() {
        init_tracing("warn");
        init_tracing("warn");
        let state = AppState::in_memory(
            AppConfig::default(),
            Arc::new(MockTranslator::new(MockMode::Suffix)),
            Arc::new(SystemClock),
        )
        .unwrap();
        assert_eq!(state.splitter.name(), "punctuation");
        assert_eq!(state.hub.connection_count("none"), 0);
    }
}
