use futures::stream::{self, StreamExt};

use crate::api::{endpoints, ApiClient, Query, RequestOptions};
use crate::error::{ApiErrorKind, ApiResult};
use crate::models::{Frequency, News, NewsCreate, NewsFilter};

/// Upper bound on items requested for a single prompt's feed.
pub const PROMPT_FEED_LIMIT: u32 = 100;

/// Maximum number of concurrent requests in batch lookups.
const MAX_CONCURRENT_REQUESTS: usize = 5;

pub struct NewsService {
    api: ApiClient,
}

impl NewsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self, filter: &NewsFilter) -> ApiResult<Vec<News>> {
        self.api
            .get(endpoints::NEWS, &filter.to_query(), RequestOptions::default())
            .await
    }

    pub async fn get(&self, id: i64) -> ApiResult<News> {
        self.api
            .get(&endpoints::news_item(id), &Query::new(), RequestOptions::default())
            .await
    }

    pub async fn for_prompt(&self, prompt_id: i64, frequency: Option<Frequency>) -> ApiResult<Vec<News>> {
        let filter = NewsFilter {
            frequency,
            limit: Some(PROMPT_FEED_LIMIT),
            ..NewsFilter::for_prompt(prompt_id)
        };
        self.list(&filter).await
    }

    /// Asks the backend to generate a new item now.
    pub async fn generate(&self, request: &NewsCreate) -> ApiResult<News> {
        self.api
            .post(endpoints::NEWS, request, RequestOptions::default())
            .await
    }

    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.api
            .delete(&endpoints::news_item(id), RequestOptions::default())
            .await
    }

    /// Most recent item for a prompt, or `None` when nothing was generated yet.
    pub async fn latest(&self, prompt_id: i64, frequency: Frequency) -> ApiResult<Option<News>> {
        let query = Query::new().param("frequency", frequency);
        match self
            .api
            .get(&endpoints::news_latest(prompt_id), &query, RequestOptions::default())
            .await
        {
            Ok(news) => Ok(Some(news)),
            Err(e) if e.kind == ApiErrorKind::Rejected && e.status == 404 => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Latest item for each prompt, fetched concurrently and returned in the
    /// order of `prompt_ids`.
    ///
    /// Failures are logged and reported as `None` so one broken prompt does
    /// not blank the whole overview.
    pub async fn latest_for_prompts(
        &self,
        prompt_ids: &[i64],
        frequency: Frequency,
    ) -> Vec<(i64, Option<News>)> {
        stream::iter(prompt_ids.iter().copied())
            .map(|prompt_id| async move {
                match self.latest(prompt_id, frequency).await {
                    Ok(news) => (prompt_id, news),
                    Err(e) => {
                        tracing::debug!("Failed to fetch latest news for prompt {}: {}", prompt_id, e);
                        (prompt_id, None)
                    }
                }
            })
            .buffered(MAX_CONCURRENT_REQUESTS)
            .collect()
            .await
    }

    pub async fn public(&self, filter: &NewsFilter) -> ApiResult<Vec<News>> {
        self.api
            .get(endpoints::NEWS_PUBLIC, &filter.to_query(), RequestOptions::public())
            .await
    }

    pub async fn public_latest(&self, limit: u32, frequency: Option<Frequency>) -> ApiResult<Vec<News>> {
        let query = Query::new()
            .param("limit", limit)
            .opt_param("frequency", frequency);
        self.api
            .get(endpoints::NEWS_PUBLIC_LATEST, &query, RequestOptions::public())
            .await
    }

    /// News of the prompt at `/username/slug`. Sends the token when present.
    pub async fn by_prompt_path(
        &self,
        username: &str,
        slug: &str,
        filter: &NewsFilter,
    ) -> ApiResult<Vec<News>> {
        let filter = NewsFilter {
            prompt_id: None,
            ..filter.clone()
        };
        self.api
            .get(
                &endpoints::news_by_prompt_path(username, slug),
                &filter.to_query(),
                RequestOptions::optional_auth(),
            )
            .await
    }
}
