//! Shared helpers for unit and integration tests.

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::Config;
use crate::db::init_primary_database;
use crate::AppState;

/// Application state over temporary databases and a mock completion API.
pub(crate) struct TestEnv {
    pub state: AppState,
    pub server: MockServer,
    _dir: TempDir,
}

pub(crate) fn test_config(dir: &TempDir, api_url: &str, psk: Option<&str>) -> Config {
    Config {
        api_key: "test-llm-key".to_string(),
        api_url: api_url.to_string(),
        api_psk: psk.map(str::to_string),
        primary_db_path: dir.path().join("primary.sqlite"),
        staging_db_url: format!("sqlite:{}", dir.path().join("staging.sqlite").display()),
        staging_table_prefix: "stg_".to_string(),
        staging_site_url: "https://staging.example.com".to_string(),
        staging_author_id: 1,
        trends_year: 2025,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
    }
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_psk(None).await
    }

    pub async fn with_psk(psk: Option<&str>) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let server = MockServer::start().await;
        let config = test_config(
            &dir,
            &format!("{}/v1/chat/completions", server.uri()),
            psk,
        );

        let pool = init_primary_database(&config.primary_db_path)
            .await
            .expect("Failed to init primary DB");
        let state = AppState::new(config, pool).expect("Failed to build state");

        TestEnv {
            state,
            server,
            _dir: dir,
        }
    }

    /// Answer every completion request whose body contains `fragment`.
    pub async fn respond_to(&self, fragment: &str, content: &str) {
        Mock::given(method("POST"))
            .and(body_string_contains(fragment))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(content)))
            .mount(&self.server)
            .await;
    }

    /// Fail every completion request with a body the client cannot use.
    pub async fn respond_with_garbage(&self) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&self.server)
            .await;
    }
}

pub(crate) fn completion(content: &str) -> Value {
    json!({
        "id": "cmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}
