mod auth;
mod news;
mod prompts;
mod users;

pub use auth::AuthService;
pub use news::{NewsService, PROMPT_FEED_LIMIT};
pub use prompts::PromptService;
pub use users::UserService;

use crate::access::{PromptPage, Viewer};
use crate::api::ApiClient;
use crate::error::ApiResult;
use crate::models::{News, PromptWithStats};

/// All backend services sharing one API client and session.
pub struct Services {
    pub auth: AuthService,
    pub prompts: PromptService,
    pub news: NewsService,
    pub users: UserService,
}

/// A prompt detail page: what the viewer may see, and the feed if visible.
#[derive(Debug)]
pub struct PromptPageView {
    pub page: PromptPage,
    pub news: Vec<News>,
}

impl Services {
    pub fn new(api: ApiClient) -> Self {
        Self {
            auth: AuthService::new(api.clone()),
            prompts: PromptService::new(api.clone()),
            news: NewsService::new(api.clone()),
            users: UserService::new(api),
        }
    }

    /// Fetches an owned prompt, then its news. News is only requested once the
    /// prompt itself loaded, and a failed news request leaves the feed empty.
    pub async fn prompt_detail(&self, id: i64) -> ApiResult<(PromptWithStats, Vec<News>)> {
        let prompt = self.prompts.get(id).await?;
        let news = self
            .news
            .for_prompt(prompt.prompt.id, None)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to load news for prompt {}: {}", id, e);
                Vec::new()
            });
        Ok((prompt, news))
    }

    /// Resolves the public `/username/slug` page for the current session.
    ///
    /// A locked page never triggers the news request. A failed news request
    /// leaves the feed empty instead of failing the page.
    pub async fn prompt_page(&self, username: &str, slug: &str) -> ApiResult<PromptPageView> {
        let viewer = self.auth.viewer().await;
        self.prompt_page_for(username, slug, &viewer).await
    }

    pub async fn prompt_page_for(
        &self,
        username: &str,
        slug: &str,
        viewer: &Viewer,
    ) -> ApiResult<PromptPageView> {
        let prompt = self.prompts.get_by_path(username, slug).await?;
        let page = PromptPage::resolve(prompt, viewer);

        let news = match &page {
            PromptPage::Visible { .. } => self
                .news
                .by_prompt_path(username, slug, &Default::default())
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("Failed to load news for {}/{}: {}", username, slug, e);
                    Vec::new()
                }),
            PromptPage::Locked(_) => Vec::new(),
        };

        Ok(PromptPageView { page, news })
    }
}
