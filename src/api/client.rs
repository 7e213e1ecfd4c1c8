use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use crate::error::{ApiError, ApiErrorKind, ApiResult};
use crate::routes::LOGIN_PATH;
use crate::session::TokenStore;

use super::Query;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Performs "go to this page" on behalf of the API client.
///
/// Used for the redirect to the login entry point after a 401.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Navigator for hosts without pages: records the redirect in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str) {
        tracing::warn!("Session is no longer valid, redirecting to {}", path);
    }
}

/// How a request relates to the stored session token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// Attach the token. A 401 clears it and redirects to login.
    #[default]
    Required,
    /// Attach the token when present. A 401 clears it without redirecting.
    Optional,
    /// Public endpoint: never attach the token, never redirect.
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub auth: AuthMode,
}

impl RequestOptions {
    pub fn public() -> Self {
        Self {
            auth: AuthMode::Skip,
        }
    }

    pub fn optional_auth() -> Self {
        Self {
            auth: AuthMode::Optional,
        }
    }
}

enum Body<'a> {
    Empty,
    Json(Value),
    Form(&'a [(&'a str, String)]),
}

/// Single choke point for every call to the backend.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.session.is_authenticated())
            .finish()
    }
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        session: Arc<dyn TokenStore>,
        timeout: Option<Duration>,
    ) -> ApiResult<Self> {
        Url::parse(base_url)
            .map_err(|e| ApiError::internal("Invalid API base URL", format!("{base_url}: {e}")))?;

        let mut builder = Client::builder().cookie_store(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::internal("Failed to create HTTP client", e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            navigator: Arc::new(LogNavigator),
        })
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn session(&self) -> &Arc<dyn TokenStore> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base + endpoint + query string, with absent parameters already dropped.
    pub fn build_url(&self, endpoint: &str, query: &Query) -> ApiResult<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, endpoint))
            .map_err(|e| ApiError::internal("Invalid request URL", e.to_string()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.pairs());
        }
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &Query,
        options: RequestOptions,
    ) -> ApiResult<T> {
        self.request(Method::GET, endpoint, query, Body::Empty, options)
            .await
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: &B, options: RequestOptions) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = Body::Json(to_json(body)?);
        self.request(Method::POST, endpoint, &Query::new(), body, options)
            .await
    }

    pub async fn put<T, B>(&self, endpoint: &str, body: &B, options: RequestOptions) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = Body::Json(to_json(body)?);
        self.request(Method::PUT, endpoint, &Query::new(), body, options)
            .await
    }

    /// Deletes a resource. Whatever body the backend returns is discarded.
    pub async fn delete(&self, endpoint: &str, options: RequestOptions) -> ApiResult<()> {
        self.request::<IgnoredAny>(Method::DELETE, endpoint, &Query::new(), Body::Empty, options)
            .await
            .map(|_| ())
    }

    /// POST with an `application/x-www-form-urlencoded` body.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        fields: &[(&str, String)],
        options: RequestOptions,
    ) -> ApiResult<T> {
        self.request(Method::POST, endpoint, &Query::new(), Body::Form(fields), options)
            .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: &Query,
        body: Body<'_>,
        options: RequestOptions,
    ) -> ApiResult<T> {
        let url = self.build_url(endpoint, query)?;
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, JSON_CONTENT_TYPE);

        if options.auth != AuthMode::Skip {
            if let Some(token) = self.session.token() {
                request = request.bearer_auth(token);
            }
        }

        request = match body {
            Body::Empty => request,
            Body::Json(value) => request.json(&value),
            Body::Form(fields) => request.form(fields),
        };

        let response = request.send().await.map_err(|e| {
            let err = ApiError::from(e);
            tracing::debug!("Request to {} failed: {}", endpoint, err);
            err
        })?;

        self.handle_response(response, options).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
        options: RequestOptions,
    ) -> ApiResult<T> {
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return empty_value();
        }

        if status == StatusCode::UNAUTHORIZED {
            self.session.clear_token();
            if options.auth == AuthMode::Required {
                self.navigator.navigate(LOGIN_PATH);
            }
            tracing::warn!("Unauthorized response from {}", response.url().path());
            return Err(ApiError::unauthorized());
        }

        let data = read_body(response).await?;

        if !status.is_success() {
            let message = data
                .get("detail")
                .and_then(Value::as_str)
                .filter(|d| !d.is_empty())
                .unwrap_or("Request failed")
                .to_string();
            let detail = match &data {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            tracing::debug!("Request rejected with {}: {}", status, message);
            return Err(ApiError::new(
                ApiErrorKind::Rejected,
                status.as_u16(),
                message,
                Some(detail),
            ));
        }

        serde_json::from_value(data)
            .map_err(|e| ApiError::internal("Invalid response format", e.to_string()))
    }
}

/// JSON when the server says JSON, text otherwise.
async fn read_body(response: Response) -> ApiResult<Value> {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains(JSON_CONTENT_TYPE));

    let invalid_format = || {
        let kind = if status.is_success() {
            ApiErrorKind::Internal
        } else {
            ApiErrorKind::Rejected
        };
        ApiError::new(
            kind,
            status.as_u16(),
            "Invalid response format",
            Some("Failed to parse server response".to_string()),
        )
    };

    let text = response.text().await.map_err(|_| invalid_format())?;
    if is_json {
        serde_json::from_str(&text).map_err(|_| invalid_format())
    } else {
        Ok(Value::String(text))
    }
}

/// Success value for a response without a body: an empty object where the
/// target type accepts one, unit-like `null` otherwise.
fn empty_value<T: DeserializeOwned>() -> ApiResult<T> {
    serde_json::from_value(Value::Object(Map::new()))
        .or_else(|_| serde_json::from_value(Value::Null))
        .map_err(|e| ApiError::internal("Invalid response format", e.to_string()))
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> ApiResult<Value> {
    serde_json::to_value(body).map_err(|e| ApiError::internal("Internal error", e.to_string()))
}
