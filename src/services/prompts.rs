use crate::api::{endpoints, ApiClient, Query, RequestOptions};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Prompt, PromptCreate, PromptListParams, PromptTemplate, PromptUpdate, PromptWithStats,
    TemplateType, TemplateValidation, TemplateValidationResponse,
};

pub struct PromptService {
    api: ApiClient,
}

impl PromptService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Prompts owned by the current user.
    pub async fn list(&self, params: &PromptListParams) -> ApiResult<Vec<Prompt>> {
        self.api
            .get(endpoints::PROMPTS, &params.to_query(), RequestOptions::default())
            .await
    }

    pub async fn get(&self, id: i64) -> ApiResult<PromptWithStats> {
        self.api
            .get(&endpoints::prompt(id), &Query::new(), RequestOptions::default())
            .await
    }

    /// Looks a prompt up by its `/username/slug` address. The session token is
    /// sent when present so internal and private prompts can resolve.
    pub async fn get_by_path(&self, username: &str, slug: &str) -> ApiResult<PromptWithStats> {
        self.api
            .get(
                &endpoints::prompt_by_path(username, slug),
                &Query::new(),
                RequestOptions::optional_auth(),
            )
            .await
    }

    pub async fn public(&self, params: &PromptListParams) -> ApiResult<Vec<Prompt>> {
        self.api
            .get(endpoints::PROMPTS_PUBLIC, &params.to_query(), RequestOptions::public())
            .await
    }

    pub async fn create(&self, prompt: &PromptCreate) -> ApiResult<Prompt> {
        self.api
            .post(endpoints::PROMPTS, prompt, RequestOptions::default())
            .await
    }

    pub async fn update(&self, id: i64, update: &PromptUpdate) -> ApiResult<Prompt> {
        if update.is_empty() {
            return Err(ApiError::validation("Nothing to update"));
        }
        update.validate()?;

        self.api
            .put(&endpoints::prompt(id), update, RequestOptions::default())
            .await
    }

    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.api
            .delete(&endpoints::prompt(id), RequestOptions::default())
            .await
    }

    pub async fn templates(&self) -> ApiResult<Vec<TemplateType>> {
        self.api
            .get(endpoints::PROMPTS_TEMPLATES, &Query::new(), RequestOptions::default())
            .await
    }

    /// Asks the backend whether a template is usable.
    pub async fn validate_template(
        &self,
        template: &PromptTemplate,
    ) -> ApiResult<TemplateValidationResponse> {
        let request = TemplateValidation {
            template_type: template.template_type(),
            custom_template: template.custom_template().map(str::to_string),
        };
        self.api
            .post(
                endpoints::PROMPTS_VALIDATE_TEMPLATE,
                &request,
                RequestOptions::default(),
            )
            .await
    }
}
