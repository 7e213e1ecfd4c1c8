mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Form, Path, RawQuery};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

use prompt_news::access::{PromptPage, Viewer};
use prompt_news::error::ApiErrorKind;
use prompt_news::models::{
    Frequency, LoginRequest, NewsCreate, PromptListParams, PromptTemplate, PromptUpdate,
    TemplateType, UserSettings, Visibility,
};
use prompt_news::routes::{guard, RouteDecision, LOGIN_PATH};
use prompt_news::services::Services;
use prompt_news::session::TokenStore;

use common::{client, news_json, prompt_json, spawn_backend, user_json, TestClient};

fn services(c: &TestClient) -> Services {
    Services::new(c.api.clone())
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[tokio::test]
async fn test_login_stores_token_used_by_later_requests() {
    let app = Router::new()
        .route(
            "/auth/login",
            post(|Form(fields): Form<HashMap<String, String>>| async move {
                if fields.get("username").map(String::as_str) == Some("ana")
                    && fields.get("password").map(String::as_str) == Some("secret")
                {
                    (
                        StatusCode::OK,
                        Json(json!({"access_token": "jwt-ana", "token_type": "bearer"})),
                    )
                } else {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"detail": "Incorrect username or password"})),
                    )
                }
            }),
        )
        .route(
            "/prompts",
            get(|headers: HeaderMap| async move {
                if bearer(&headers).as_deref() == Some("Bearer jwt-ana") {
                    (StatusCode::OK, Json(json!([prompt_json(1, 3, "private")])))
                } else {
                    (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Not authenticated"})))
                }
            }),
        );
    let base = spawn_backend(app).await;
    let c = client(&base, None);
    let svc = services(&c);

    let credentials = LoginRequest {
        username: "ana".to_string(),
        password: "secret".to_string(),
    };
    let token = assert_ok!(svc.auth.login(&credentials).await);
    assert_eq!(token.access_token, "jwt-ana");
    assert_eq!(c.session.token().as_deref(), Some("jwt-ana"));

    let prompts = assert_ok!(svc.prompts.list(&PromptListParams::default()).await);
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].visibility, Visibility::Private);
}

#[tokio::test]
async fn test_failed_login_keeps_session_empty() {
    let app = Router::new().route(
        "/auth/login",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"detail": "Incorrect username or password"})),
            )
        }),
    );
    let base = spawn_backend(app).await;
    let c = client(&base, None);
    let svc = services(&c);

    let credentials = LoginRequest {
        username: "ana".to_string(),
        password: "wrong".to_string(),
    };
    let err = assert_err!(svc.auth.login(&credentials).await);
    assert_eq!(err.status, 400);
    assert_eq!(err.message, "Incorrect username or password");
    assert!(!c.session.is_authenticated());
}

#[tokio::test]
async fn test_logout_then_protected_route_redirects_to_login() {
    let base = spawn_backend(Router::new()).await;
    let c = client(&base, Some("jwt"));
    let svc = services(&c);

    assert_eq!(guard("/prompts", svc.auth.is_authenticated()), RouteDecision::Allow);
    svc.auth.logout().await;
    assert!(!svc.auth.is_authenticated());
    assert_eq!(
        guard("/prompts", svc.auth.is_authenticated()),
        RouteDecision::Redirect(LOGIN_PATH)
    );
}

#[tokio::test]
async fn test_current_user_is_fetched_once_per_token() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/users/me",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(user_json(3, "ana"))
            }
        }),
    );
    let base = spawn_backend(app).await;
    let c = client(&base, Some("jwt"));
    let svc = services(&c);

    let first = assert_ok!(svc.auth.current_user().await);
    let second = assert_ok!(svc.auth.current_user().await);
    assert_eq!(first.id, 3);
    assert_eq!(second.username, "ana");
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    c.session.set_token("other-jwt").unwrap();
    assert_ok!(svc.auth.current_user().await);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_viewer_without_token_is_anonymous() {
    let base = spawn_backend(Router::new()).await;
    let c = client(&base, None);
    let svc = services(&c);

    assert_eq!(svc.auth.viewer().await, Viewer::anonymous());
}

#[tokio::test]
async fn test_viewer_with_rejected_token_does_not_redirect() {
    let app = Router::new().route("/users/me", get(|| async { StatusCode::UNAUTHORIZED }));
    let base = spawn_backend(app).await;
    let c = client(&base, Some("expired"));
    let svc = services(&c);

    assert_eq!(svc.auth.viewer().await, Viewer::anonymous());
    assert!(!c.session.is_authenticated());
    assert!(c.navigator.paths().is_empty());
}

fn path_backend(visibility: &'static str, news_hits: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route(
            "/prompts/by-path/:username/:slug",
            get(move |Path((_username, _slug)): Path<(String, String)>| async move {
                Json(prompt_json(1, 3, visibility))
            }),
        )
        .route(
            "/news/public/by-path/:username/:slug",
            get(move || {
                let news_hits = news_hits.clone();
                async move {
                    news_hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!([news_json(10, 1, "daily"), news_json(11, 1, "hourly")]))
                }
            }),
        )
        .route("/users/me", get(|| async { Json(user_json(3, "ana")) }))
}

#[tokio::test]
async fn test_private_prompt_is_locked_for_anonymous_viewer() {
    let news_hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_backend(path_backend("private", news_hits.clone())).await;
    let c = client(&base, None);
    let svc = services(&c);

    let view = assert_ok!(svc.prompt_page("ana", "daily-tech-news").await);
    match view.page {
        PromptPage::Locked(notice) => {
            assert_eq!(notice.visibility, Visibility::Private);
        }
        PromptPage::Visible { .. } => panic!("private prompt must not be visible"),
    }
    assert!(view.news.is_empty());
    assert_eq!(news_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_internal_prompt_is_locked_for_anonymous_viewer() {
    let news_hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_backend(path_backend("internal", news_hits.clone())).await;
    let c = client(&base, None);
    let svc = services(&c);

    let view = assert_ok!(svc.prompt_page("ana", "daily-tech-news").await);
    assert!(view.page.is_locked());
    assert_eq!(news_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_public_prompt_is_visible_anonymously_with_news() {
    let news_hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_backend(path_backend("public", news_hits.clone())).await;
    let c = client(&base, None);
    let svc = services(&c);

    let view = assert_ok!(svc.prompt_page("ana", "daily-tech-news").await);
    match &view.page {
        PromptPage::Visible { prompt, can_manage } => {
            assert_eq!(prompt.prompt.id, 1);
            assert!(!can_manage);
        }
        PromptPage::Locked(_) => panic!("public prompt must be visible"),
    }
    assert_eq!(view.news.len(), 2);
    assert_eq!(news_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_private_prompt_is_visible_to_owner() {
    let news_hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_backend(path_backend("private", news_hits.clone())).await;
    let c = client(&base, Some("jwt-ana"));
    let svc = services(&c);

    let view = assert_ok!(svc.prompt_page("ana", "daily-tech-news").await);
    match view.page {
        PromptPage::Visible { can_manage, .. } => assert!(can_manage),
        PromptPage::Locked(_) => panic!("owner must see their private prompt"),
    }
    assert_eq!(view.news.len(), 2);
}

#[tokio::test]
async fn test_private_prompt_is_locked_for_other_user() {
    let news_hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_backend(path_backend("private", news_hits.clone())).await;
    let c = client(&base, Some("jwt-bob"));
    let svc = services(&c);

    let bob = Viewer {
        authenticated: true,
        user_id: Some(99),
    };
    let view = assert_ok!(svc.prompt_page_for("ana", "daily-tech-news", &bob).await);
    assert!(view.page.is_locked());
    assert_eq!(news_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_news_failure_leaves_visible_page_with_empty_feed() {
    let app = Router::new()
        .route(
            "/prompts/by-path/:username/:slug",
            get(|| async { Json(prompt_json(1, 3, "public")) }),
        )
        .route(
            "/news/public/by-path/:username/:slug",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
    let base = spawn_backend(app).await;
    let c = client(&base, None);
    let svc = services(&c);

    let view = assert_ok!(svc.prompt_page("ana", "daily-tech-news").await);
    assert!(!view.page.is_locked());
    assert!(view.news.is_empty());
}

#[tokio::test]
async fn test_missing_prompt_page_is_an_error() {
    let app = Router::new().route(
        "/prompts/by-path/:username/:slug",
        get(|| async { (StatusCode::NOT_FOUND, Json(json!({"detail": "Prompt not found"}))) }),
    );
    let base = spawn_backend(app).await;
    let c = client(&base, None);
    let svc = services(&c);

    let err = assert_err!(svc.prompt_page("ana", "missing").await);
    assert_eq!(err.status, 404);
    assert_eq!(err.message, "Prompt not found");
}

#[tokio::test]
async fn test_prompt_detail_skips_news_when_prompt_fails() {
    let news_hits = Arc::new(AtomicUsize::new(0));
    let counter = news_hits.clone();
    let app = Router::new()
        .route(
            "/prompts/:id",
            get(|| async { (StatusCode::NOT_FOUND, Json(json!({"detail": "Prompt not found"}))) }),
        )
        .route(
            "/news",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!([]))
                }
            }),
        );
    let base = spawn_backend(app).await;
    let c = client(&base, Some("jwt"));
    let svc = services(&c);

    assert_err!(svc.prompt_detail(5).await);
    assert_eq!(news_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_prompt_detail_requests_news_for_loaded_prompt() {
    let app = Router::new()
        .route("/prompts/:id", get(|| async { Json(prompt_json(5, 3, "private")) }))
        .route(
            "/news",
            get(|RawQuery(query): RawQuery| async move {
                assert_eq!(query.as_deref(), Some("prompt_id=5&limit=100"));
                Json(json!([news_json(1, 5, "daily")]))
            }),
        );
    let base = spawn_backend(app).await;
    let c = client(&base, Some("jwt"));
    let svc = services(&c);

    let (prompt, news) = assert_ok!(svc.prompt_detail(5).await);
    assert_eq!(prompt.prompt.id, 5);
    assert_eq!(news.len(), 1);
    assert_eq!(news[0].frequency, Frequency::Daily);
}

#[tokio::test]
async fn test_prompt_detail_keeps_prompt_when_news_fails() {
    let app = Router::new()
        .route("/prompts/:id", get(|| async { Json(prompt_json(5, 3, "private")) }))
        .route(
            "/news",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"detail": "news db down"})),
                )
            }),
        );
    let base = spawn_backend(app).await;
    let c = client(&base, Some("jwt"));
    let svc = services(&c);

    let (prompt, news) = assert_ok!(svc.prompt_detail(5).await);
    assert_eq!(prompt.prompt.id, 5);
    assert!(news.is_empty());
}

#[tokio::test]
async fn test_latest_news_not_found_is_none() {
    let app = Router::new().route(
        "/news/latest/:prompt_id",
        get(|Path(prompt_id): Path<i64>| async move {
            if prompt_id == 1 {
                (StatusCode::OK, Json(news_json(100, 1, "hourly")))
            } else {
                (StatusCode::NOT_FOUND, Json(json!({"detail": "No news found"})))
            }
        }),
    );
    let base = spawn_backend(app).await;
    let c = client(&base, Some("jwt"));
    let svc = services(&c);

    let found = assert_ok!(svc.news.latest(1, Frequency::Hourly).await);
    assert_eq!(found.map(|n| n.id), Some(100));
    let missing = assert_ok!(svc.news.latest(2, Frequency::Hourly).await);
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_latest_for_prompts_keeps_input_order() {
    let app = Router::new().route(
        "/news/latest/:prompt_id",
        get(|Path(prompt_id): Path<i64>| async move {
            // Later prompts answer first.
            tokio::time::sleep(std::time::Duration::from_millis((10 - prompt_id as u64) * 5)).await;
            if prompt_id == 4 {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "boom"})))
            } else {
                (StatusCode::OK, Json(news_json(prompt_id * 10, prompt_id, "daily")))
            }
        }),
    );
    let base = spawn_backend(app).await;
    let c = client(&base, Some("jwt"));
    let svc = services(&c);

    let ids = [1, 2, 3, 4, 5, 6, 7];
    let results = svc.news.latest_for_prompts(&ids, Frequency::Daily).await;

    let order: Vec<i64> = results.iter().map(|(id, _)| *id).collect();
    assert_eq!(order, ids);
    assert!(results[3].1.is_none());
    assert_eq!(results[6].1.as_ref().map(|n| n.id), Some(70));
}

#[tokio::test]
async fn test_public_listings_send_no_token() {
    let app = Router::new()
        .route(
            "/prompts/public",
            get(|headers: HeaderMap| async move {
                assert!(bearer(&headers).is_none());
                Json(json!([prompt_json(1, 3, "public")]))
            }),
        )
        .route(
            "/news/public/latest",
            get(|headers: HeaderMap, RawQuery(query): RawQuery| async move {
                assert!(bearer(&headers).is_none());
                assert_eq!(query.as_deref(), Some("limit=10&frequency=daily"));
                Json(json!([news_json(1, 1, "daily")]))
            }),
        );
    let base = spawn_backend(app).await;
    let c = client(&base, Some("jwt"));
    let svc = services(&c);

    let prompts = assert_ok!(svc.prompts.public(&PromptListParams::default()).await);
    assert_eq!(prompts.len(), 1);
    let news = assert_ok!(svc.news.public_latest(10, Some(Frequency::Daily)).await);
    assert_eq!(news.len(), 1);
    assert!(c.session.is_authenticated());
}

#[tokio::test]
async fn test_generate_posts_prompt_and_frequency() {
    let app = Router::new().route(
        "/news",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body, json!({"prompt_id": 5, "frequency": "hourly"}));
            Json(news_json(1, 5, "hourly"))
        }),
    );
    let base = spawn_backend(app).await;
    let c = client(&base, Some("jwt"));
    let svc = services(&c);

    let request = NewsCreate::new(5, Frequency::Hourly).unwrap();
    let news = assert_ok!(svc.news.generate(&request).await);
    assert_eq!(news.prompt_id, 5);
}

#[tokio::test]
async fn test_deprecated_frequency_still_decodes() {
    let app = Router::new().route(
        "/news",
        get(|| async { Json(json!([news_json(1, 5, "30_minutes")])) }),
    );
    let base = spawn_backend(app).await;
    let c = client(&base, Some("jwt"));
    let svc = services(&c);

    let news = assert_ok!(svc.news.for_prompt(5, None).await);
    assert_eq!(news[0].frequency, Frequency::ThirtyMinutes);
    assert!(NewsCreate::new(5, Frequency::ThirtyMinutes).is_err());
}

#[tokio::test]
async fn test_empty_prompt_update_never_reaches_backend() {
    let base = spawn_backend(Router::new()).await;
    let c = client(&base, Some("jwt"));
    let svc = services(&c);

    let err = assert_err!(svc.prompts.update(1, &Default::default()).await);
    assert_eq!(err.kind, ApiErrorKind::Validation);
    assert_eq!(err.status, 422);
}

#[tokio::test]
async fn test_out_of_range_generation_hour_is_rejected_locally() {
    let base = spawn_backend(Router::new()).await;
    let c = client(&base, Some("jwt"));
    let svc = services(&c);

    let settings = UserSettings {
        news_generation_hour_1: Some(24),
        ..Default::default()
    };
    let err = assert_err!(svc.users.update_settings(&settings).await);
    assert_eq!(err.kind, ApiErrorKind::Validation);
}

#[tokio::test]
async fn test_update_settings_sends_only_given_fields() {
    let app = Router::new().route(
        "/users/me",
        put(|Json(body): Json<Value>| async move {
            assert_eq!(body, json!({"timezone": "Europe/Berlin", "news_generation_hour_1": 6}));
            Json(user_json(3, "ana"))
        }),
    );
    let base = spawn_backend(app).await;
    let c = client(&base, Some("jwt"));
    let svc = services(&c);

    let settings = UserSettings {
        timezone: Some("Europe/Berlin".to_string()),
        news_generation_hour_1: Some(6),
        news_generation_hour_2: None,
    };
    let user = assert_ok!(svc.users.update_settings(&settings).await);
    assert_eq!(user.timezone, "Europe/Berlin");
}

#[tokio::test]
async fn test_timezones_list() {
    let app = Router::new().route(
        "/users/timezones",
        get(|| async { Json(json!(["UTC", "Europe/Berlin"])) }),
    );
    let base = spawn_backend(app).await;
    let c = client(&base, Some("jwt"));
    let svc = services(&c);

    let zones = assert_ok!(svc.users.timezones().await);
    assert_eq!(zones, vec!["UTC".to_string(), "Europe/Berlin".to_string()]);
}

#[tokio::test]
async fn test_update_prompt_sends_changed_fields() {
    let app = Router::new().route(
        "/prompts/:id",
        put(|Json(body): Json<Value>| async move {
            assert_eq!(
                body,
                json!({
                    "visibility": "public",
                    "template_type": "narrative",
                    "custom_template": "Tell {topic}"
                })
            );
            Json(prompt_json(5, 3, "public"))
        }),
    );
    let base = spawn_backend(app).await;
    let c = client(&base, Some("jwt"));
    let svc = services(&c);

    let template = PromptTemplate::from_parts(TemplateType::Narrative, Some("Tell {topic}")).unwrap();
    let update = PromptUpdate {
        visibility: Some(Visibility::Public),
        ..Default::default()
    }
    .with_template(template);
    let prompt = assert_ok!(svc.prompts.update(5, &update).await);
    assert_eq!(prompt.visibility, Visibility::Public);
}

#[tokio::test]
async fn test_validate_template_reports_backend_verdict() {
    let app = Router::new().route(
        "/prompts/validate-template",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["template_type"], "narrative");
            Json(json!({"valid": false, "errors": ["missing {topic}"]}))
        }),
    );
    let base = spawn_backend(app).await;
    let c = client(&base, Some("jwt"));
    let svc = services(&c);

    let template = PromptTemplate::from_parts(TemplateType::Narrative, Some("no placeholder")).unwrap();
    let response = assert_ok!(svc.prompts.validate_template(&template).await);
    assert!(!response.valid);
    assert_eq!(response.errors, Some(json!(["missing {topic}"])));
}

