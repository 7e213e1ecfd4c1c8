#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use serde_json::{json, Value};

use prompt_news::api::{ApiClient, Navigator};
use prompt_news::session::{MemorySession, TokenStore};

/// Serves `routes` under `/api/v1` on an ephemeral local port and returns
/// the API base URL.
pub async fn spawn_backend(routes: Router) -> String {
    let app = Router::new().nest("/api/v1", routes);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/v1", addr)
}

#[derive(Default)]
pub struct RecordingNavigator {
    paths: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.paths.lock().unwrap().push(path.to_string());
    }
}

pub struct TestClient {
    pub api: ApiClient,
    pub session: Arc<MemorySession>,
    pub navigator: Arc<RecordingNavigator>,
}

pub fn client(base_url: &str, token: Option<&str>) -> TestClient {
    let session = Arc::new(match token {
        Some(t) => MemorySession::with_token(t),
        None => MemorySession::new(),
    });
    let navigator = Arc::new(RecordingNavigator::default());
    let store: Arc<dyn TokenStore> = session.clone();
    let api = ApiClient::new(base_url, store, None)
        .unwrap()
        .with_navigator(navigator.clone());
    TestClient {
        api,
        session,
        navigator,
    }
}

pub fn prompt_json(id: i64, user_id: i64, visibility: &str) -> Value {
    json!({
        "id": id,
        "name": "Daily Tech News",
        "slug": "daily-tech-news",
        "content": "Latest developments in AI and technology",
        "template_type": "summary",
        "visibility": visibility,
        "custom_template": null,
        "user_id": user_id,
        "created_at": "2024-03-14T12:00:00Z",
        "updated_at": "2024-03-14T12:00:00Z",
        "news_count": {"total": 2, "hourly": 1, "daily": 1, "last_update": "2024-03-14T11:00:00Z"}
    })
}

pub fn news_json(id: i64, prompt_id: i64, frequency: &str) -> Value {
    json!({
        "id": id,
        "title": format!("Headline {id}"),
        "content": "Summary body",
        "frequency": frequency,
        "prompt_id": prompt_id,
        "created_at": "2024-03-14T12:00:00",
        "updated_at": "2024-03-14T12:00:00"
    })
}

pub fn user_json(id: i64, username: &str) -> Value {
    json!({
        "id": id,
        "email": format!("{username}@example.com"),
        "username": username,
        "timezone": "Europe/Berlin",
        "news_generation_hour_1": 7,
        "news_generation_hour_2": 19,
        "is_active": true,
        "is_superuser": false,
        "created_at": "2024-01-01T00:00:00",
        "updated_at": "2024-01-01T00:00:00"
    })
}
