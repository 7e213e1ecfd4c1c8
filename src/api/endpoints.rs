//! Backend endpoint paths, relative to the API base URL.

use urlencoding::encode;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";

pub const AUTH_LOGIN: &str = "/auth/login";

pub const USERS: &str = "/users";
pub const USERS_ME: &str = "/users/me";
pub const USERS_TIMEZONES: &str = "/users/timezones";
pub const USERS_INIT_SUPERUSER: &str = "/users/init-superuser";

pub const PROMPTS: &str = "/prompts";
pub const PROMPTS_PUBLIC: &str = "/prompts/public";
pub const PROMPTS_TEMPLATES: &str = "/prompts/templates";
pub const PROMPTS_VALIDATE_TEMPLATE: &str = "/prompts/validate-template";

pub const NEWS: &str = "/news";
pub const NEWS_PUBLIC: &str = "/news/public";
pub const NEWS_PUBLIC_LATEST: &str = "/news/public/latest";

pub fn user(id: i64) -> String {
    format!("{USERS}/{id}")
}

pub fn prompt(id: i64) -> String {
    format!("{PROMPTS}/{id}")
}

pub fn prompt_by_path(username: &str, slug: &str) -> String {
    format!("{PROMPTS}/by-path/{}/{}", encode(username), encode(slug))
}

pub fn news_item(id: i64) -> String {
    format!("{NEWS}/{id}")
}

pub fn news_latest(prompt_id: i64) -> String {
    format!("{NEWS}/latest/{prompt_id}")
}

pub fn news_by_prompt_path(username: &str, slug: &str) -> String {
    format!("{NEWS_PUBLIC}/by-path/{}/{}", encode(username), encode(slug))
}
