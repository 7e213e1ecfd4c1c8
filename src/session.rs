use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Name of the cookie that carries the bearer token.
pub const TOKEN_COOKIE: &str = "token";

/// Lifetime of a stored token, matching the login cookie's `max-age`.
pub const TOKEN_MAX_AGE_SECS: i64 = 86_400;

/// Holder of the session's bearer token, injected into the API client.
///
/// Reading never fails: any problem reading the token means "no token".
/// Clearing is idempotent.
pub trait TokenStore: Send + Sync {
    fn token(&self) -> Option<String>;

    fn set_token(&self, token: &str) -> Result<()>;

    fn clear_token(&self);

    /// Derived fresh from token presence on every call.
    fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}

/// In-process token store.
#[derive(Debug, Default)]
pub struct MemorySession {
    token: RwLock<Option<String>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemorySession {
    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn set_token(&self, token: &str) -> Result<()> {
        let mut guard = self
            .token
            .write()
            .map_err(|_| AppError::Other(anyhow::anyhow!("session lock poisoned")))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) {
        match self.token.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCookie {
    name: String,
    value: String,
    expires_at: DateTime<Utc>,
}

/// Token store persisted as a small cookie file between CLI invocations.
#[derive(Debug, Clone)]
pub struct CookieFileSession {
    path: PathBuf,
}

impl CookieFileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_cookie(&self) -> Option<StoredCookie> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!("Failed to read session file {:?}: {}", self.path, e);
                }
                return None;
            }
        };

        match toml::from_str::<StoredCookie>(&content) {
            Ok(cookie) => Some(cookie),
            Err(e) => {
                tracing::debug!("Ignoring unreadable session file {:?}: {}", self.path, e);
                None
            }
        }
    }
}

impl TokenStore for CookieFileSession {
    fn token(&self) -> Option<String> {
        let cookie = self.read_cookie()?;

        if cookie.name != TOKEN_COOKIE || cookie.value.is_empty() {
            return None;
        }
        if cookie.expires_at <= Utc::now() {
            tracing::debug!("Stored token expired at {}", cookie.expires_at);
            return None;
        }

        Some(cookie.value)
    }

    fn set_token(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let cookie = StoredCookie {
            name: TOKEN_COOKIE.to_string(),
            value: token.to_string(),
            expires_at: Utc::now() + Duration::seconds(TOKEN_MAX_AGE_SECS),
        };
        let content =
            toml::to_string_pretty(&cookie).map_err(|e| AppError::Config(e.to_string()))?;
        write_private(&self.path, content.as_bytes())?;
        Ok(())
    }

    fn clear_token(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Cleared session token"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to clear session file {:?}: {}", self.path, e),
        }
    }
}

/// Writes `content` readable by the owner only. A file left behind with wider
/// permissions is narrowed as well.
#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::fs::{OpenOptions, Permissions};
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(Permissions::from_mode(0o600))?;
    file.write_all(content)
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, content)
}
