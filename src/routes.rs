//! Navigation gate driven by presence of the session token.

pub const LOGIN_PATH: &str = "/login";
pub const SIGNUP_PATH: &str = "/signup";
pub const HOME_PATH: &str = "/news";

/// Prefixes that need a signed-in session.
pub const PROTECTED_PREFIXES: [&str; 3] = ["/prompts", "/news", "/settings"];

/// Pages that make no sense once signed in.
const ANONYMOUS_ONLY: [&str; 2] = [LOGIN_PATH, SIGNUP_PATH];

const PUBLIC_ROUTES: [&str; 6] = [
    LOGIN_PATH,
    SIGNUP_PATH,
    "/public",
    "/api/news/public",
    "/api/news/public/latest",
    "/api/prompts/public",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(&'static str),
}

/// A `/:username/:slug` prompt detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPath {
    pub username: String,
    pub slug: String,
}

impl PromptPath {
    /// Matches two-segment paths outside the protected sections.
    pub fn parse(path: &str) -> Option<Self> {
        if is_protected(path) {
            return None;
        }
        let mut parts = path.split('/').filter(|p| !p.is_empty());
        match (parts.next(), parts.next(), parts.next()) {
            (Some(username), Some(slug), None) => Some(Self {
                username: username.to_string(),
                slug: slug.to_string(),
            }),
            _ => None,
        }
    }
}

fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES
        .iter()
        .any(|prefix| path == *prefix || path.starts_with(&format!("{prefix}/")))
}

fn is_public_api_route(path: &str) -> bool {
    path.starts_with("/api/") && (path.contains("/public/") || path.contains("/by-path/"))
}

/// Decides whether navigation to `path` proceeds.
///
/// Prompt detail pages are reachable without a session; what they show is
/// decided per prompt by [`crate::access::PromptPage`].
pub fn guard(path: &str, has_token: bool) -> RouteDecision {
    if is_public_api_route(path) {
        return RouteDecision::Allow;
    }

    if PromptPath::parse(path).is_some() {
        return RouteDecision::Allow;
    }

    if is_protected(path) {
        return if has_token {
            RouteDecision::Allow
        } else {
            RouteDecision::Redirect(LOGIN_PATH)
        };
    }

    if path == "/" {
        return RouteDecision::Allow;
    }

    if PUBLIC_ROUTES.contains(&path) {
        if has_token && ANONYMOUS_ONLY.contains(&path) {
            return RouteDecision::Redirect(HOME_PATH);
        }
        return RouteDecision::Allow;
    }

    if has_token {
        RouteDecision::Allow
    } else {
        RouteDecision::Redirect(LOGIN_PATH)
    }
}
