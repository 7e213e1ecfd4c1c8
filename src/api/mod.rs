mod client;
pub mod endpoints;
mod query;

pub use client::{ApiClient, AuthMode, LogNavigator, Navigator, RequestOptions};
pub use query::Query;
