use tokio::sync::Mutex;

use crate::access::Viewer;
use crate::api::{endpoints, ApiClient, Query, RequestOptions};
use crate::error::{ApiError, ApiResult};
use crate::models::{LoginRequest, Token, User};

struct CachedUser {
    token: String,
    user: User,
}

/// Login, logout and the verified identity of the current session.
pub struct AuthService {
    api: ApiClient,
    // Keyed by the token it was fetched with, so a new login never sees the
    // previous user.
    current_user: Mutex<Option<CachedUser>>,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            current_user: Mutex::new(None),
        }
    }

    /// Exchanges credentials for a token and stores it in the session.
    pub async fn login(&self, credentials: &LoginRequest) -> ApiResult<Token> {
        let token: Token = self
            .api
            .post_form(
                endpoints::AUTH_LOGIN,
                &credentials.form_fields(),
                RequestOptions::public(),
            )
            .await?;

        if token.access_token.is_empty() {
            return Err(ApiError::internal(
                "Authentication failed",
                "No access token received",
            ));
        }

        self.api
            .session()
            .set_token(&token.access_token)
            .map_err(|e| ApiError::internal("Failed to store session token", e.to_string()))?;
        *self.current_user.lock().await = None;

        tracing::debug!("Logged in as {}", credentials.username);
        Ok(token)
    }

    pub async fn logout(&self) {
        self.api.session().clear_token();
        *self.current_user.lock().await = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.api.session().is_authenticated()
    }

    /// The user behind the current token, as reported by `GET /users/me`.
    ///
    /// Fetched once per token and cached.
    pub async fn current_user(&self) -> ApiResult<User> {
        self.fetch_current_user(RequestOptions::default()).await
    }

    async fn fetch_current_user(&self, options: RequestOptions) -> ApiResult<User> {
        let token = self.api.session().token().ok_or_else(ApiError::unauthorized)?;

        let mut cached = self.current_user.lock().await;
        if let Some(entry) = cached.as_ref() {
            if entry.token == token {
                return Ok(entry.user.clone());
            }
        }

        let user: User = self
            .api
            .get(endpoints::USERS_ME, &Query::new(), options)
            .await?;

        *cached = Some(CachedUser {
            token,
            user: user.clone(),
        });
        Ok(user)
    }

    /// Viewer for access decisions. Never fails: an unverifiable identity
    /// degrades to "signed in, owner of nothing".
    pub async fn viewer(&self) -> Viewer {
        if !self.is_authenticated() {
            return Viewer::anonymous();
        }

        match self.fetch_current_user(RequestOptions::optional_auth()).await {
            Ok(user) => Viewer::user(&user),
            Err(e) if e.is_unauthorized() => Viewer::anonymous(),
            Err(e) => {
                tracing::debug!("Could not verify current user: {}", e);
                Viewer::signed_in()
            }
        }
    }
}
