use crate::api::{endpoints, ApiClient, Query, RequestOptions};
use crate::error::ApiResult;
use crate::models::{User, UserCreate, UserSettings, UserUpdate};

pub struct UserService {
    api: ApiClient,
}

impl UserService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn me(&self) -> ApiResult<User> {
        self.api
            .get(endpoints::USERS_ME, &Query::new(), RequestOptions::default())
            .await
    }

    pub async fn update_me(&self, update: &UserUpdate) -> ApiResult<User> {
        self.api
            .put(endpoints::USERS_ME, update, RequestOptions::default())
            .await
    }

    pub async fn update_settings(&self, settings: &UserSettings) -> ApiResult<User> {
        settings.validate()?;
        self.api
            .put(endpoints::USERS_ME, settings, RequestOptions::default())
            .await
    }

    pub async fn list(&self, skip: Option<u32>, limit: Option<u32>) -> ApiResult<Vec<User>> {
        let query = Query::new()
            .opt_param("skip", skip)
            .opt_param("limit", limit);
        self.api
            .get(endpoints::USERS, &query, RequestOptions::default())
            .await
    }

    pub async fn get(&self, id: i64) -> ApiResult<User> {
        self.api
            .get(&endpoints::user(id), &Query::new(), RequestOptions::default())
            .await
    }

    pub async fn create(&self, user: &UserCreate) -> ApiResult<User> {
        self.api
            .post(endpoints::USERS, user, RequestOptions::default())
            .await
    }

    /// Creates the first superuser on a fresh backend. Needs no session.
    pub async fn create_initial_superuser(&self, user: &UserCreate) -> ApiResult<User> {
        self.api
            .post(endpoints::USERS_INIT_SUPERUSER, user, RequestOptions::public())
            .await
    }

    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.api
            .delete(&endpoints::user(id), RequestOptions::default())
            .await
    }

    pub async fn timezones(&self) -> ApiResult<Vec<String>> {
        self.api
            .get(endpoints::USERS_TIMEZONES, &Query::new(), RequestOptions::default())
            .await
    }
}
